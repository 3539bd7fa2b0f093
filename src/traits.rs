//! Traits for storage abstraction and external collaborators

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::approval::VoucherApproval;
use crate::reconciliation::BankReconciliation;
use crate::recurring::{RecurringVoucher, VoucherTemplate};
use crate::types::*;

/// Storage abstraction for the voucher system
///
/// This trait allows the accounting core to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these methods.
///
/// `update_voucher` must compare the incoming voucher's `version` against the
/// stored one and fail with [`VoucherError::Conflict`] on mismatch, storing
/// the voucher with the version incremented. Posting and cancellation rely on
/// this check to keep the voucher and its ledger entries consistent when two
/// callers race on the same voucher.
#[async_trait]
pub trait VoucherStorage: Send + Sync {
    /// Save a newly created voucher
    async fn save_voucher(&mut self, voucher: &Voucher) -> VoucherResult<()>;

    /// Get a voucher by its voucher number
    async fn get_voucher(&self, voucher_number: &str) -> VoucherResult<Option<Voucher>>;

    /// Update a voucher, enforcing the optimistic-concurrency version check
    async fn update_voucher(&mut self, voucher: &Voucher) -> VoucherResult<()>;

    /// List vouchers, optionally filtered by status
    async fn list_vouchers(&self, status: Option<VoucherStatus>) -> VoucherResult<Vec<Voucher>>;

    /// Draft vouchers scheduled to auto-post on or before the given date
    async fn due_post_dated(&self, today: NaiveDate) -> VoucherResult<Vec<Voucher>>;

    /// Append ledger entries produced by a posting
    async fn save_ledger_entries(&mut self, entries: &[LedgerEntry]) -> VoucherResult<()>;

    /// Delete all ledger entries carrying the given voucher number,
    /// returning how many were removed
    async fn delete_ledger_entries(&mut self, voucher_number: &str) -> VoucherResult<usize>;

    /// Ledger entries for one account name within an optional date range
    async fn account_ledger_entries(
        &self,
        account_name: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> VoucherResult<Vec<LedgerEntry>>;

    /// All ledger entries within an optional date range
    async fn ledger_entries(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> VoucherResult<Vec<LedgerEntry>>;

    /// Save an approval record
    async fn save_approval(&mut self, approval: &VoucherApproval) -> VoucherResult<()>;

    /// Get an approval record by id
    async fn get_approval(&self, approval_id: Uuid) -> VoucherResult<Option<VoucherApproval>>;

    /// Update an approval record
    async fn update_approval(&mut self, approval: &VoucherApproval) -> VoucherResult<()>;

    /// Approval records for one voucher, in level order
    async fn voucher_approvals(
        &self,
        voucher_number: &str,
    ) -> VoucherResult<Vec<VoucherApproval>>;

    /// Save a voucher template
    async fn save_template(&mut self, template: &VoucherTemplate) -> VoucherResult<()>;

    /// Get a template by id
    async fn get_template(&self, template_id: Uuid) -> VoucherResult<Option<VoucherTemplate>>;

    /// Update a template
    async fn update_template(&mut self, template: &VoucherTemplate) -> VoucherResult<()>;

    /// Save a recurring voucher schedule
    async fn save_recurring(&mut self, recurring: &RecurringVoucher) -> VoucherResult<()>;

    /// Get a recurring voucher by id
    async fn get_recurring(&self, recurring_id: Uuid)
        -> VoucherResult<Option<RecurringVoucher>>;

    /// Update a recurring voucher
    async fn update_recurring(&mut self, recurring: &RecurringVoucher) -> VoucherResult<()>;

    /// Recurring vouchers due to run on or before the given date
    async fn due_recurring(&self, today: NaiveDate) -> VoucherResult<Vec<RecurringVoucher>>;

    /// Save a reconciliation session
    async fn save_reconciliation(
        &mut self,
        reconciliation: &BankReconciliation,
    ) -> VoucherResult<()>;

    /// Get a reconciliation session by id
    async fn get_reconciliation(
        &self,
        reconciliation_id: Uuid,
    ) -> VoucherResult<Option<BankReconciliation>>;

    /// Update a reconciliation session
    async fn update_reconciliation(
        &mut self,
        reconciliation: &BankReconciliation,
    ) -> VoucherResult<()>;
}

/// Numbering service issuing the next sequential voucher number per type
///
/// Numbers take the form `<PREFIX>/<zero-padded sequence>`. The service owns
/// its own storage; the core only calls it.
#[async_trait]
pub trait VoucherNumbering: Send + Sync {
    /// Issue the next number for the given voucher type
    async fn next_number(&mut self, voucher_type: VoucherType) -> VoucherResult<String>;
}

/// Resolves an account reference to its display name
///
/// Implementations validate that the referenced customer, supplier, or
/// ledger account exists, failing with [`VoucherError::AccountNotFound`]
/// otherwise.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// Resolve the display name for an account reference
    async fn resolve(&self, account: &AccountRef) -> VoucherResult<String>;
}

/// Best-effort notification channel for scheduler outcomes
///
/// Failures are logged by the caller and never propagated as the primary
/// operation's failure.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver a notification to a recipient
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> VoucherResult<()>;
}

/// Trait for implementing custom voucher validation rules
pub trait VoucherValidator: Send + Sync {
    /// Validate a voucher before saving
    fn validate_voucher(&self, voucher: &Voucher) -> VoucherResult<()>;
}

/// Default voucher validator with the structural double-entry rules
pub struct DefaultVoucherValidator;

impl VoucherValidator for DefaultVoucherValidator {
    fn validate_voucher(&self, voucher: &Voucher) -> VoucherResult<()> {
        voucher.validate()
    }
}

/// Per-account debit/credit totals in a trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTotals {
    pub account_name: String,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    /// Net balance: debits minus credits
    pub balance: BigDecimal,
}

/// Trial balance - aggregated ledger totals per account as of a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalance {
    pub as_of_date: NaiveDate,
    /// Rows in account-name order
    pub rows: Vec<AccountTotals>,
    pub total_debits: BigDecimal,
    pub total_credits: BigDecimal,
    pub is_balanced: bool,
}
