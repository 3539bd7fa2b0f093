//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::approval::VoucherApproval;
use crate::reconciliation::BankReconciliation;
use crate::recurring::{RecurringVoucher, VoucherTemplate};
use crate::traits::VoucherStorage;
use crate::types::*;

/// In-memory storage implementation for testing and development
///
/// Ledger entries keep insertion order, which is the iteration order batch
/// operations and reconciliation snapshots observe.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    vouchers: Arc<RwLock<HashMap<String, Voucher>>>,
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
    approvals: Arc<RwLock<HashMap<Uuid, VoucherApproval>>>,
    templates: Arc<RwLock<HashMap<Uuid, VoucherTemplate>>>,
    recurring: Arc<RwLock<HashMap<Uuid, RecurringVoucher>>>,
    reconciliations: Arc<RwLock<HashMap<Uuid, BankReconciliation>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            vouchers: Arc::new(RwLock::new(HashMap::new())),
            entries: Arc::new(RwLock::new(Vec::new())),
            approvals: Arc::new(RwLock::new(HashMap::new())),
            templates: Arc::new(RwLock::new(HashMap::new())),
            recurring: Arc::new(RwLock::new(HashMap::new())),
            reconciliations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.vouchers.write().unwrap().clear();
        self.entries.write().unwrap().clear();
        self.approvals.write().unwrap().clear();
        self.templates.write().unwrap().clear();
        self.recurring.write().unwrap().clear();
        self.reconciliations.write().unwrap().clear();
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn in_range(date: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    if let Some(start) = from {
        if date < start {
            return false;
        }
    }
    if let Some(end) = to {
        if date > end {
            return false;
        }
    }
    true
}

#[async_trait]
impl VoucherStorage for MemoryStorage {
    async fn save_voucher(&mut self, voucher: &Voucher) -> VoucherResult<()> {
        self.vouchers
            .write()
            .unwrap()
            .insert(voucher.voucher_number.clone(), voucher.clone());
        Ok(())
    }

    async fn get_voucher(&self, voucher_number: &str) -> VoucherResult<Option<Voucher>> {
        Ok(self.vouchers.read().unwrap().get(voucher_number).cloned())
    }

    async fn update_voucher(&mut self, voucher: &Voucher) -> VoucherResult<()> {
        let mut vouchers = self.vouchers.write().unwrap();
        match vouchers.get(&voucher.voucher_number) {
            Some(stored) if stored.version != voucher.version => Err(VoucherError::Conflict(
                format!(
                    "Voucher {} was modified concurrently (expected version {}, found {})",
                    voucher.voucher_number, voucher.version, stored.version
                ),
            )),
            Some(_) => {
                let mut updated = voucher.clone();
                updated.version += 1;
                vouchers.insert(updated.voucher_number.clone(), updated);
                Ok(())
            }
            None => Err(VoucherError::VoucherNotFound(
                voucher.voucher_number.clone(),
            )),
        }
    }

    async fn list_vouchers(&self, status: Option<VoucherStatus>) -> VoucherResult<Vec<Voucher>> {
        let vouchers = self.vouchers.read().unwrap();
        let mut filtered: Vec<Voucher> = vouchers
            .values()
            .filter(|v| status.is_none_or(|s| v.status == s))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.voucher_number.cmp(&b.voucher_number));
        Ok(filtered)
    }

    async fn due_post_dated(&self, today: NaiveDate) -> VoucherResult<Vec<Voucher>> {
        let vouchers = self.vouchers.read().unwrap();
        let mut due: Vec<Voucher> = vouchers
            .values()
            .filter(|v| {
                v.status == VoucherStatus::Draft
                    && v.is_post_dated
                    && v.auto_post_enabled
                    && v.effective_date.is_some_and(|d| d <= today)
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.voucher_number.cmp(&b.voucher_number));
        Ok(due)
    }

    async fn save_ledger_entries(&mut self, entries: &[LedgerEntry]) -> VoucherResult<()> {
        self.entries.write().unwrap().extend_from_slice(entries);
        Ok(())
    }

    async fn delete_ledger_entries(&mut self, voucher_number: &str) -> VoucherResult<usize> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| e.voucher_number != voucher_number);
        Ok(before - entries.len())
    }

    async fn account_ledger_entries(
        &self,
        account_name: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> VoucherResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.account_name == account_name && in_range(e.voucher_date, from, to))
            .cloned()
            .collect())
    }

    async fn ledger_entries(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> VoucherResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .filter(|e| in_range(e.voucher_date, from, to))
            .cloned()
            .collect())
    }

    async fn save_approval(&mut self, approval: &VoucherApproval) -> VoucherResult<()> {
        self.approvals
            .write()
            .unwrap()
            .insert(approval.id, approval.clone());
        Ok(())
    }

    async fn get_approval(&self, approval_id: Uuid) -> VoucherResult<Option<VoucherApproval>> {
        Ok(self.approvals.read().unwrap().get(&approval_id).cloned())
    }

    async fn update_approval(&mut self, approval: &VoucherApproval) -> VoucherResult<()> {
        let mut approvals = self.approvals.write().unwrap();
        if approvals.contains_key(&approval.id) {
            approvals.insert(approval.id, approval.clone());
            Ok(())
        } else {
            Err(VoucherError::ApprovalNotFound(approval.id.to_string()))
        }
    }

    async fn voucher_approvals(
        &self,
        voucher_number: &str,
    ) -> VoucherResult<Vec<VoucherApproval>> {
        let approvals = self.approvals.read().unwrap();
        let mut records: Vec<VoucherApproval> = approvals
            .values()
            .filter(|a| a.voucher_number == voucher_number)
            .cloned()
            .collect();
        records.sort_by_key(|a| a.approval_level);
        Ok(records)
    }

    async fn save_template(&mut self, template: &VoucherTemplate) -> VoucherResult<()> {
        self.templates
            .write()
            .unwrap()
            .insert(template.id, template.clone());
        Ok(())
    }

    async fn get_template(&self, template_id: Uuid) -> VoucherResult<Option<VoucherTemplate>> {
        Ok(self.templates.read().unwrap().get(&template_id).cloned())
    }

    async fn update_template(&mut self, template: &VoucherTemplate) -> VoucherResult<()> {
        let mut templates = self.templates.write().unwrap();
        if templates.contains_key(&template.id) {
            templates.insert(template.id, template.clone());
            Ok(())
        } else {
            Err(VoucherError::TemplateNotFound(template.id.to_string()))
        }
    }

    async fn save_recurring(&mut self, recurring: &RecurringVoucher) -> VoucherResult<()> {
        self.recurring
            .write()
            .unwrap()
            .insert(recurring.id, recurring.clone());
        Ok(())
    }

    async fn get_recurring(
        &self,
        recurring_id: Uuid,
    ) -> VoucherResult<Option<RecurringVoucher>> {
        Ok(self.recurring.read().unwrap().get(&recurring_id).cloned())
    }

    async fn update_recurring(&mut self, recurring: &RecurringVoucher) -> VoucherResult<()> {
        let mut schedules = self.recurring.write().unwrap();
        if schedules.contains_key(&recurring.id) {
            schedules.insert(recurring.id, recurring.clone());
            Ok(())
        } else {
            Err(VoucherError::RecurringNotFound(recurring.id.to_string()))
        }
    }

    async fn due_recurring(&self, today: NaiveDate) -> VoucherResult<Vec<RecurringVoucher>> {
        let schedules = self.recurring.read().unwrap();
        let mut due: Vec<RecurringVoucher> = schedules
            .values()
            .filter(|r| r.is_due(today))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(due)
    }

    async fn save_reconciliation(
        &mut self,
        reconciliation: &BankReconciliation,
    ) -> VoucherResult<()> {
        self.reconciliations
            .write()
            .unwrap()
            .insert(reconciliation.id, reconciliation.clone());
        Ok(())
    }

    async fn get_reconciliation(
        &self,
        reconciliation_id: Uuid,
    ) -> VoucherResult<Option<BankReconciliation>> {
        Ok(self
            .reconciliations
            .read()
            .unwrap()
            .get(&reconciliation_id)
            .cloned())
    }

    async fn update_reconciliation(
        &mut self,
        reconciliation: &BankReconciliation,
    ) -> VoucherResult<()> {
        let mut sessions = self.reconciliations.write().unwrap();
        if sessions.contains_key(&reconciliation.id) {
            sessions.insert(reconciliation.id, reconciliation.clone());
            Ok(())
        } else {
            Err(VoucherError::ReconciliationNotFound(
                reconciliation.id.to_string(),
            ))
        }
    }
}
