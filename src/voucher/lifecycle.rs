//! Voucher lifecycle operations: create, post, cancel, provisional hold,
//! post-dating, and the auto-post batch

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// Input for creating a voucher; the number, totals, and fiscal year are
/// assigned by the manager
#[derive(Debug, Clone)]
pub struct VoucherDraft {
    pub voucher_type: VoucherType,
    pub voucher_date: NaiveDate,
    pub narration: String,
    pub reference_number: Option<String>,
    pub reference_date: Option<NaiveDate>,
    pub items: Vec<VoucherItem>,
    pub template_id: Option<Uuid>,
    pub created_by: Option<String>,
}

/// Builder for assembling voucher drafts entry by entry
#[derive(Debug)]
pub struct VoucherBuilder {
    draft: VoucherDraft,
}

impl VoucherBuilder {
    /// Start a draft of the given type
    pub fn new(voucher_type: VoucherType, voucher_date: NaiveDate, narration: String) -> Self {
        Self {
            draft: VoucherDraft {
                voucher_type,
                voucher_date,
                narration,
                reference_number: None,
                reference_date: None,
                items: Vec::new(),
                template_id: None,
                created_by: None,
            },
        }
    }

    /// Set the external reference number
    pub fn reference(mut self, reference: String) -> Self {
        self.draft.reference_number = Some(reference);
        self
    }

    /// Set the external reference date
    pub fn reference_date(mut self, date: NaiveDate) -> Self {
        self.draft.reference_date = Some(date);
        self
    }

    /// Record who created the voucher
    pub fn created_by(mut self, user_id: String) -> Self {
        self.draft.created_by = Some(user_id);
        self
    }

    /// Add a debit line
    pub fn debit(mut self, account: AccountRef, amount: BigDecimal) -> Self {
        self.draft.items.push(VoucherItem::debit(account, amount));
        self
    }

    /// Add a credit line
    pub fn credit(mut self, account: AccountRef, amount: BigDecimal) -> Self {
        self.draft.items.push(VoucherItem::credit(account, amount));
        self
    }

    /// Add a prepared line
    pub fn item(mut self, item: VoucherItem) -> Self {
        self.draft.items.push(item);
        self
    }

    /// Finish the draft
    pub fn build(self) -> VoucherResult<VoucherDraft> {
        if self.draft.items.is_empty() {
            return Err(VoucherError::Validation(
                "Voucher must have at least one item".to_string(),
            ));
        }
        if self.draft.narration.trim().is_empty() {
            return Err(VoucherError::Validation(
                "Narration is required".to_string(),
            ));
        }
        Ok(self.draft)
    }
}

/// Per-voucher outcome of the auto-post batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPostOutcome {
    pub voucher_number: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Voucher manager owning the lifecycle state machine
///
/// Posting writes the voucher first and its ledger entries second; the
/// storage version check keeps a concurrent second post from doubling the
/// entries.
pub struct VoucherManager<S: VoucherStorage> {
    storage: S,
    validator: Box<dyn VoucherValidator>,
    numbering: Box<dyn VoucherNumbering>,
    resolver: Box<dyn AccountResolver>,
}

impl<S: VoucherStorage> VoucherManager<S> {
    /// Create a new voucher manager with the default validator
    pub fn new(
        storage: S,
        numbering: Box<dyn VoucherNumbering>,
        resolver: Box<dyn AccountResolver>,
    ) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultVoucherValidator),
            numbering,
            resolver,
        }
    }

    /// Create a new voucher manager with a custom validator
    pub fn with_validator(
        storage: S,
        numbering: Box<dyn VoucherNumbering>,
        resolver: Box<dyn AccountResolver>,
        validator: Box<dyn VoucherValidator>,
    ) -> Self {
        Self {
            storage,
            validator,
            numbering,
            resolver,
        }
    }

    /// Get a voucher by number
    pub async fn get_voucher(&self, voucher_number: &str) -> VoucherResult<Option<Voucher>> {
        self.storage.get_voucher(voucher_number).await
    }

    /// Get a voucher by number, failing if unknown
    pub async fn get_voucher_required(&self, voucher_number: &str) -> VoucherResult<Voucher> {
        self.storage
            .get_voucher(voucher_number)
            .await?
            .ok_or_else(|| VoucherError::VoucherNotFound(voucher_number.to_string()))
    }

    /// Create a voucher from a draft
    ///
    /// Resolves account display names, obtains the next sequential number,
    /// and derives totals and the fiscal year. The voucher starts in draft.
    pub async fn create(&mut self, draft: VoucherDraft) -> VoucherResult<Voucher> {
        let mut items = draft.items;
        for item in &mut items {
            item.account_name = self.resolver.resolve(&item.account).await?;
        }

        let number = self.numbering.next_number(draft.voucher_type).await?;

        let mut voucher = Voucher::new(
            number,
            draft.voucher_type,
            draft.voucher_date,
            draft.narration,
            items,
        );
        voucher.reference_number = draft.reference_number;
        voucher.reference_date = draft.reference_date;
        voucher.template_id = draft.template_id;
        voucher.created_by = draft.created_by;

        self.validator.validate_voucher(&voucher)?;
        self.storage.save_voucher(&voucher).await?;

        Ok(voucher)
    }

    /// Replace the line items of an editable voucher
    ///
    /// Vouchers are immutable once posted; this is the aggregate-level guard
    /// backing the route-layer one.
    pub async fn update_items(
        &mut self,
        voucher_number: &str,
        items: Vec<VoucherItem>,
    ) -> VoucherResult<Voucher> {
        let mut voucher = self.get_voucher_required(voucher_number).await?;
        match voucher.status {
            VoucherStatus::Posted => {
                return Err(VoucherError::AlreadyPosted(voucher_number.to_string()))
            }
            VoucherStatus::Cancelled => {
                return Err(VoucherError::AlreadyCancelled(voucher_number.to_string()))
            }
            VoucherStatus::Draft | VoucherStatus::Provisional => {}
        }

        let mut items = items;
        for item in &mut items {
            item.account_name = self.resolver.resolve(&item.account).await?;
        }

        voucher.items = items;
        voucher.recompute_totals();
        self.validator.validate_voucher(&voucher)?;
        voucher.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_voucher(&voucher).await?;

        self.get_voucher_required(voucher_number).await
    }

    async fn post_internal(
        &mut self,
        mut voucher: Voucher,
        clear_post_dating: bool,
    ) -> VoucherResult<Voucher> {
        match voucher.status {
            VoucherStatus::Posted => {
                return Err(VoucherError::AlreadyPosted(voucher.voucher_number));
            }
            VoucherStatus::Cancelled => {
                return Err(VoucherError::AlreadyCancelled(voucher.voucher_number));
            }
            VoucherStatus::Draft | VoucherStatus::Provisional => {}
        }

        voucher.recompute_totals();
        if !voucher.is_balanced() {
            return Err(VoucherError::Unbalanced {
                total_debit: voucher.total_debit,
                total_credit: voucher.total_credit,
            });
        }

        if clear_post_dating {
            voucher.is_post_dated = false;
        }

        let now = chrono::Utc::now().naive_utc();
        voucher.status = VoucherStatus::Posted;
        voucher.posted_date = Some(now);
        voucher.updated_at = now;
        self.storage.update_voucher(&voucher).await?;

        let entries = voucher.ledger_entries();
        self.storage.save_ledger_entries(&entries).await?;

        self.get_voucher_required(&voucher.voucher_number).await
    }

    /// Post a voucher, committing its ledger entries
    pub async fn post(&mut self, voucher_number: &str) -> VoucherResult<Voucher> {
        let voucher = self.get_voucher_required(voucher_number).await?;
        self.post_internal(voucher, false).await
    }

    /// Cancel a voucher, reversing its ledger effects if it was posted
    ///
    /// Reversal deletes every ledger entry carrying this voucher number.
    pub async fn cancel(&mut self, voucher_number: &str, reason: &str) -> VoucherResult<Voucher> {
        if reason.trim().is_empty() {
            return Err(VoucherError::Validation(
                "Cancellation reason is required".to_string(),
            ));
        }

        let mut voucher = self.get_voucher_required(voucher_number).await?;
        if voucher.status == VoucherStatus::Cancelled {
            return Err(VoucherError::AlreadyCancelled(voucher_number.to_string()));
        }

        let was_posted = voucher.status == VoucherStatus::Posted;
        let now = chrono::Utc::now().naive_utc();
        voucher.status = VoucherStatus::Cancelled;
        voucher.cancelled_date = Some(now);
        voucher.cancel_reason = Some(reason.to_string());
        voucher.updated_at = now;
        self.storage.update_voucher(&voucher).await?;

        if was_posted {
            self.storage.delete_ledger_entries(voucher_number).await?;
        }

        self.get_voucher_required(voucher_number).await
    }

    /// Hold a draft voucher pending confirmation
    pub async fn mark_provisional(
        &mut self,
        voucher_number: &str,
        reason: &str,
    ) -> VoucherResult<Voucher> {
        let mut voucher = self.get_voucher_required(voucher_number).await?;
        if voucher.status != VoucherStatus::Draft {
            return Err(VoucherError::NotDraft(voucher_number.to_string()));
        }

        let now = chrono::Utc::now().naive_utc();
        voucher.status = VoucherStatus::Provisional;
        voucher.provisional_reason = Some(reason.to_string());
        voucher.provisional_date = Some(now);
        voucher.updated_at = now;
        self.storage.update_voucher(&voucher).await?;

        self.get_voucher_required(voucher_number).await
    }

    /// Confirm a provisional voucher, posting it
    pub async fn confirm_provisional(&mut self, voucher_number: &str) -> VoucherResult<Voucher> {
        let mut voucher = self.get_voucher_required(voucher_number).await?;
        if voucher.status != VoucherStatus::Provisional {
            return Err(VoucherError::NotProvisional(voucher_number.to_string()));
        }

        voucher.confirmed_date = Some(chrono::Utc::now().naive_utc());
        self.post_internal(voucher, false).await
    }

    /// Schedule a draft voucher to take effect on a future date
    ///
    /// The status stays draft; the auto-post batch picks the voucher up once
    /// the effective date arrives, if auto-posting was enabled.
    pub async fn schedule_post_dated(
        &mut self,
        voucher_number: &str,
        effective_date: NaiveDate,
        reason: &str,
        auto_post: bool,
    ) -> VoucherResult<Voucher> {
        let mut voucher = self.get_voucher_required(voucher_number).await?;
        if voucher.status != VoucherStatus::Draft {
            return Err(VoucherError::NotDraft(voucher_number.to_string()));
        }

        voucher.is_post_dated = true;
        voucher.effective_date = Some(effective_date);
        voucher.post_dated_reason = Some(reason.to_string());
        voucher.auto_post_enabled = auto_post;
        voucher.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_voucher(&voucher).await?;

        self.get_voucher_required(voucher_number).await
    }

    /// Post every draft voucher whose auto-post became due
    ///
    /// Failures are captured per voucher; one failing voucher never aborts
    /// the batch.
    pub async fn process_due_auto_post(
        &mut self,
        today: NaiveDate,
    ) -> VoucherResult<Vec<AutoPostOutcome>> {
        let due = self.storage.due_post_dated(today).await?;
        let mut outcomes = Vec::with_capacity(due.len());

        for voucher in due {
            let voucher_number = voucher.voucher_number.clone();
            match self.post_internal(voucher, true).await {
                Ok(_) => outcomes.push(AutoPostOutcome {
                    voucher_number,
                    success: true,
                    error: None,
                }),
                Err(err) => {
                    tracing::warn!(voucher = %voucher_number, error = %err, "auto-post failed");
                    outcomes.push(AutoPostOutcome {
                        voucher_number,
                        success: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(outcomes)
    }
}
