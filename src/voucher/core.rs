//! Main voucher book orchestrator coordinating all accounting operations

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::approval::{ApprovalLevelDef, ApprovalManager, VoucherApproval};
use crate::reconciliation::{BankReconciliation, ReconciliationManager, StatementRow};
use crate::recurring::{
    RecurringManager, RecurringRunOutcome, RecurringVoucher, TemplateManager, VoucherTemplate,
};
use crate::traits::*;
use crate::types::*;
use crate::voucher::lifecycle::{AutoPostOutcome, VoucherDraft, VoucherManager};

/// Main voucher book that orchestrates all accounting operations
///
/// Consumed as a library by transport layers; every operation returns typed
/// errors for the caller to map. The book itself performs no logging of
/// business errors; only best-effort side effects are logged.
pub struct VoucherBook<S: VoucherStorage> {
    vouchers: VoucherManager<S>,
    approvals: ApprovalManager<S>,
    templates: TemplateManager<S>,
    recurring: RecurringManager<S>,
    reconciliation: ReconciliationManager<S>,
    notifier: Box<dyn NotificationSender>,
    storage: S,
}

impl<S: VoucherStorage + Clone> VoucherBook<S> {
    /// Create a new voucher book with the given storage and collaborators
    pub fn new(
        storage: S,
        numbering: Box<dyn VoucherNumbering>,
        resolver: Box<dyn AccountResolver>,
        notifier: Box<dyn NotificationSender>,
    ) -> Self {
        Self {
            vouchers: VoucherManager::new(storage.clone(), numbering, resolver),
            approvals: ApprovalManager::new(storage.clone()),
            templates: TemplateManager::new(storage.clone()),
            recurring: RecurringManager::new(storage.clone()),
            reconciliation: ReconciliationManager::new(storage.clone()),
            notifier,
            storage,
        }
    }

    /// Create a new voucher book with a custom voucher validator
    pub fn with_validator(
        storage: S,
        numbering: Box<dyn VoucherNumbering>,
        resolver: Box<dyn AccountResolver>,
        notifier: Box<dyn NotificationSender>,
        validator: Box<dyn VoucherValidator>,
    ) -> Self {
        Self {
            vouchers: VoucherManager::with_validator(
                storage.clone(),
                numbering,
                resolver,
                validator,
            ),
            approvals: ApprovalManager::new(storage.clone()),
            templates: TemplateManager::new(storage.clone()),
            recurring: RecurringManager::new(storage.clone()),
            reconciliation: ReconciliationManager::new(storage.clone()),
            notifier,
            storage,
        }
    }

    // Voucher lifecycle operations

    /// Create a voucher from a draft
    pub async fn create_voucher(&mut self, draft: VoucherDraft) -> VoucherResult<Voucher> {
        self.vouchers.create(draft).await
    }

    /// Get a voucher by number
    pub async fn get_voucher(&self, voucher_number: &str) -> VoucherResult<Option<Voucher>> {
        self.vouchers.get_voucher(voucher_number).await
    }

    /// Post a voucher, committing its ledger entries
    pub async fn post_voucher(&mut self, voucher_number: &str) -> VoucherResult<Voucher> {
        self.vouchers.post(voucher_number).await
    }

    /// Cancel a voucher, reversing its ledger effects
    pub async fn cancel_voucher(
        &mut self,
        voucher_number: &str,
        reason: &str,
    ) -> VoucherResult<Voucher> {
        self.vouchers.cancel(voucher_number, reason).await
    }

    /// Hold a draft voucher pending confirmation
    pub async fn mark_provisional(
        &mut self,
        voucher_number: &str,
        reason: &str,
    ) -> VoucherResult<Voucher> {
        self.vouchers.mark_provisional(voucher_number, reason).await
    }

    /// Confirm a provisional voucher, posting it
    pub async fn confirm_provisional(&mut self, voucher_number: &str) -> VoucherResult<Voucher> {
        self.vouchers.confirm_provisional(voucher_number).await
    }

    /// Schedule a draft voucher to take effect on a future date
    pub async fn schedule_post_dated(
        &mut self,
        voucher_number: &str,
        effective_date: NaiveDate,
        reason: &str,
        auto_post: bool,
    ) -> VoucherResult<Voucher> {
        self.vouchers
            .schedule_post_dated(voucher_number, effective_date, reason, auto_post)
            .await
    }

    /// Post every draft voucher whose auto-post became due
    pub async fn process_due_auto_post(
        &mut self,
        today: NaiveDate,
    ) -> VoucherResult<Vec<AutoPostOutcome>> {
        self.vouchers.process_due_auto_post(today).await
    }

    /// Replace the line items of an editable voucher
    pub async fn update_voucher_items(
        &mut self,
        voucher_number: &str,
        items: Vec<VoucherItem>,
    ) -> VoucherResult<Voucher> {
        self.vouchers.update_items(voucher_number, items).await
    }

    // Approval workflow operations

    /// Start an approval workflow for a voucher
    pub async fn create_approval_workflow(
        &mut self,
        voucher_number: &str,
        levels: &[ApprovalLevelDef],
    ) -> VoucherResult<VoucherApproval> {
        self.approvals.create_workflow(voucher_number, levels).await
    }

    /// Approve one level of a voucher's chain
    pub async fn approve(
        &mut self,
        approval_id: Uuid,
        approver_id: &str,
        comments: Option<String>,
    ) -> VoucherResult<Voucher> {
        self.approvals.approve(approval_id, approver_id, comments).await
    }

    /// Reject a voucher at the current level, halting the chain
    pub async fn reject(
        &mut self,
        approval_id: Uuid,
        approver_id: &str,
        comments: Option<String>,
    ) -> VoucherResult<Voucher> {
        self.approvals.reject(approval_id, approver_id, comments).await
    }

    /// Delegate an approval to another user
    pub async fn delegate(
        &mut self,
        approval_id: Uuid,
        approver_id: &str,
        delegate_to: &str,
        reason: Option<String>,
    ) -> VoucherResult<VoucherApproval> {
        self.approvals
            .delegate(approval_id, approver_id, delegate_to, reason)
            .await
    }

    /// Approval records for a voucher, in level order
    pub async fn approvals_for(
        &self,
        voucher_number: &str,
    ) -> VoucherResult<Vec<VoucherApproval>> {
        self.approvals.approvals_for(voucher_number).await
    }

    // Template and recurring operations

    /// Save a new voucher template
    pub async fn create_template(
        &mut self,
        template: VoucherTemplate,
    ) -> VoucherResult<VoucherTemplate> {
        self.templates.create_template(template).await
    }

    /// Deactivate a template so it can no longer be materialized
    pub async fn deactivate_template(
        &mut self,
        template_id: Uuid,
    ) -> VoucherResult<VoucherTemplate> {
        self.templates.deactivate(template_id).await
    }

    /// Materialize a voucher from a template
    ///
    /// Variable lines take their amounts from the variables bag; the
    /// narration comes from a "narration" variable when present, the
    /// template name otherwise. If the template requires approval, the
    /// level-1 approval record is created and the voucher starts its chain
    /// at level 1.
    pub async fn materialize_from_template(
        &mut self,
        template_id: Uuid,
        variables: HashMap<String, String>,
        user_id: &str,
        voucher_date: NaiveDate,
    ) -> VoucherResult<Voucher> {
        let template = self.templates.get_template_required(template_id).await?;
        if !template.is_active {
            return Err(VoucherError::TemplateInactive(template.name));
        }

        let items = template.materialize_items(&variables)?;
        let narration = variables
            .get("narration")
            .cloned()
            .unwrap_or_else(|| template.name.clone());

        let draft = VoucherDraft {
            voucher_type: template.voucher_type,
            voucher_date,
            narration,
            reference_number: None,
            reference_date: None,
            items,
            template_id: Some(template.id),
            created_by: Some(user_id.to_string()),
        };

        let voucher = self.vouchers.create(draft).await?;
        self.templates.record_use(template.id).await?;

        if template.requires_approval && !template.approval_levels.is_empty() {
            self.approvals
                .create_workflow(&voucher.voucher_number, &template.approval_levels)
                .await?;
            return self
                .vouchers
                .get_voucher_required(&voucher.voucher_number)
                .await;
        }

        Ok(voucher)
    }

    /// Save a new recurring schedule
    pub async fn create_recurring(
        &mut self,
        recurring: RecurringVoucher,
    ) -> VoucherResult<RecurringVoucher> {
        self.recurring.create_recurring(recurring).await
    }

    /// Pause a recurring schedule
    pub async fn pause_recurring(&mut self, recurring_id: Uuid) -> VoucherResult<RecurringVoucher> {
        self.recurring.pause(recurring_id).await
    }

    /// Resume a paused recurring schedule
    pub async fn resume_recurring(
        &mut self,
        recurring_id: Uuid,
    ) -> VoucherResult<RecurringVoucher> {
        self.recurring.resume(recurring_id).await
    }

    /// Recurring schedules due to run on or before the given date
    pub async fn due_recurring(&self, today: NaiveDate) -> VoucherResult<Vec<RecurringVoucher>> {
        self.recurring.due(today).await
    }

    /// Execute one recurring schedule, materializing its voucher
    ///
    /// On success the schedule's cursor advances and its retry state resets;
    /// on failure the failure is recorded and the error propagates after the
    /// state is persisted. Notifications are best-effort either way.
    pub async fn execute_recurring(
        &mut self,
        recurring_id: Uuid,
        now: NaiveDate,
    ) -> VoucherResult<Voucher> {
        let recurring = self.recurring.get_recurring_required(recurring_id).await?;

        let mut variables: HashMap<String, String> = HashMap::new();
        variables.insert(
            "narration".to_string(),
            format!("{} - {}", recurring.name, now),
        );
        // Stored values win over the per-run defaults.
        variables.extend(recurring.variable_values.clone());

        let user_id = if recurring.created_by.is_empty() {
            "scheduler".to_string()
        } else {
            recurring.created_by.clone()
        };

        match self
            .materialize_from_template(recurring.template_id, variables, &user_id, now)
            .await
        {
            Ok(mut voucher) => {
                let within_cap = recurring
                    .max_auto_approval_amount
                    .as_ref()
                    .map_or(true, |cap| voucher.total_debit <= *cap);
                if recurring.auto_approve && within_cap {
                    voucher = self
                        .approvals
                        .auto_approve(&voucher.voucher_number, "auto-approval")
                        .await?;
                }

                let updated = self.recurring.record_success(recurring, now).await?;
                if updated.notify_on_success {
                    self.notify_best_effort(
                        updated.notification_recipient.as_deref(),
                        &format!("Recurring voucher executed: {}", updated.name),
                        &format!("Created voucher {}", voucher.voucher_number),
                    )
                    .await;
                }

                Ok(voucher)
            }
            Err(err) => {
                let updated = self
                    .recurring
                    .record_failure(recurring, err.to_string())
                    .await?;
                if updated.notify_on_failure {
                    self.notify_best_effort(
                        updated.notification_recipient.as_deref(),
                        &format!("Recurring voucher failed: {}", updated.name),
                        &err.to_string(),
                    )
                    .await;
                }

                Err(err)
            }
        }
    }

    /// Execute every recurring schedule that is due
    ///
    /// Failures are captured per schedule; one failing schedule never aborts
    /// the batch.
    pub async fn execute_all_due(
        &mut self,
        now: NaiveDate,
    ) -> VoucherResult<Vec<RecurringRunOutcome>> {
        let due = self.recurring.due(now).await?;
        let mut outcomes = Vec::with_capacity(due.len());

        for schedule in due {
            match self.execute_recurring(schedule.id, now).await {
                Ok(voucher) => outcomes.push(RecurringRunOutcome {
                    recurring_id: schedule.id,
                    success: true,
                    voucher_number: Some(voucher.voucher_number),
                    error: None,
                }),
                Err(err) => {
                    tracing::warn!(
                        recurring = %schedule.id,
                        error = %err,
                        "recurring execution failed"
                    );
                    outcomes.push(RecurringRunOutcome {
                        recurring_id: schedule.id,
                        success: false,
                        voucher_number: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(outcomes)
    }

    // Bank reconciliation operations

    /// Open a new reconciliation session
    pub async fn create_reconciliation(
        &mut self,
        account_name: String,
        statement_from: NaiveDate,
        statement_to: NaiveDate,
        opening_balance: BigDecimal,
    ) -> VoucherResult<BankReconciliation> {
        self.reconciliation
            .create_session(account_name, statement_from, statement_to, opening_balance)
            .await
    }

    /// Get a reconciliation session by id
    pub async fn get_reconciliation(
        &self,
        reconciliation_id: Uuid,
    ) -> VoucherResult<BankReconciliation> {
        self.reconciliation.get_session(reconciliation_id).await
    }

    /// Replace a session's bank side from imported statement rows
    pub async fn import_statement(
        &mut self,
        reconciliation_id: Uuid,
        rows: Vec<StatementRow>,
    ) -> VoucherResult<BankReconciliation> {
        self.reconciliation
            .import_statement(reconciliation_id, rows)
            .await
    }

    /// Snapshot ledger entries into a session's book side
    pub async fn load_book_entries(
        &mut self,
        reconciliation_id: Uuid,
    ) -> VoucherResult<BankReconciliation> {
        self.reconciliation.load_book_entries(reconciliation_id).await
    }

    /// Auto-match a session's unmatched entries, returning new match count
    pub async fn auto_match(&mut self, reconciliation_id: Uuid) -> VoucherResult<usize> {
        self.reconciliation.auto_match(reconciliation_id).await
    }

    /// Manually pair one bank entry with one book entry
    pub async fn match_entries(
        &mut self,
        reconciliation_id: Uuid,
        bank_entry_id: Uuid,
        book_entry_id: Uuid,
    ) -> VoucherResult<BankReconciliation> {
        self.reconciliation
            .match_entries(reconciliation_id, bank_entry_id, book_entry_id)
            .await
    }

    /// Undo a pairing from the bank side
    pub async fn unmatch_entries(
        &mut self,
        reconciliation_id: Uuid,
        bank_entry_id: Uuid,
    ) -> VoucherResult<BankReconciliation> {
        self.reconciliation
            .unmatch_entries(reconciliation_id, bank_entry_id)
            .await
    }

    // Balance and reporting operations

    /// Derived balance of an account: debits minus credits up to a date
    pub async fn account_balance(
        &self,
        account_name: &str,
        as_of_date: Option<NaiveDate>,
    ) -> VoucherResult<BigDecimal> {
        let entries = self
            .storage
            .account_ledger_entries(account_name, None, as_of_date)
            .await?;
        let debits: BigDecimal = entries.iter().map(|e| &e.debit_amount).sum();
        let credits: BigDecimal = entries.iter().map(|e| &e.credit_amount).sum();
        Ok(debits - credits)
    }

    /// Trial balance over every account in the ledger as of a date
    pub async fn trial_balance(&self, as_of_date: NaiveDate) -> VoucherResult<TrialBalance> {
        let entries = self.storage.ledger_entries(None, Some(as_of_date)).await?;

        let mut per_account: BTreeMap<String, (BigDecimal, BigDecimal)> = BTreeMap::new();
        for entry in &entries {
            let totals = per_account
                .entry(entry.account_name.clone())
                .or_insert_with(|| (BigDecimal::from(0), BigDecimal::from(0)));
            totals.0 += &entry.debit_amount;
            totals.1 += &entry.credit_amount;
        }

        let mut rows = Vec::with_capacity(per_account.len());
        let mut total_debits = BigDecimal::from(0);
        let mut total_credits = BigDecimal::from(0);
        for (account_name, (debit, credit)) in per_account {
            total_debits += &debit;
            total_credits += &credit;
            rows.push(AccountTotals {
                account_name,
                balance: &debit - &credit,
                total_debit: debit,
                total_credit: credit,
            });
        }

        let is_balanced = within_tolerance(&total_debits, &total_credits);
        Ok(TrialBalance {
            as_of_date,
            rows,
            total_debits,
            total_credits,
            is_balanced,
        })
    }

    /// Ledger entries for a date range in (date, creation) order
    pub async fn day_book(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> VoucherResult<Vec<LedgerEntry>> {
        let mut entries = self.storage.ledger_entries(from, to).await?;
        entries.sort_by(|a, b| {
            a.voucher_date
                .cmp(&b.voucher_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(entries)
    }

    async fn notify_best_effort(&self, recipient: Option<&str>, subject: &str, body: &str) {
        let Some(recipient) = recipient else {
            return;
        };
        if let Err(err) = self.notifier.notify(recipient, subject, body).await {
            tracing::warn!(recipient, error = %err, "notification delivery failed");
        }
    }
}
