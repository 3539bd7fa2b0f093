//! Core types and data structures for the voucher accounting system

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tax::gst::GstRate;

/// Voucher types covering the standard set of books
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherType {
    /// Sales voucher - revenue from customers
    Sales,
    /// Purchase voucher - goods or services bought from suppliers
    Purchase,
    /// Receipt voucher - money received
    Receipt,
    /// Payment voucher - money paid out
    Payment,
    /// Journal voucher - general adjustments
    Journal,
    /// Contra voucher - transfers between cash and bank accounts
    Contra,
    /// Debit note - purchase returns and supplier adjustments
    DebitNote,
    /// Credit note - sales returns and customer adjustments
    CreditNote,
}

impl VoucherType {
    /// Voucher number prefix used by the numbering service
    pub fn prefix(&self) -> &'static str {
        match self {
            VoucherType::Sales => "SAL",
            VoucherType::Purchase => "PUR",
            VoucherType::Receipt => "RCT",
            VoucherType::Payment => "PAY",
            VoucherType::Journal => "JRN",
            VoucherType::Contra => "CON",
            VoucherType::DebitNote => "DBN",
            VoucherType::CreditNote => "CRN",
        }
    }
}

/// Lifecycle states of a voucher
///
/// Transitions: draft -> {provisional, posted, cancelled};
/// provisional -> {posted, cancelled}; posted -> cancelled;
/// cancelled is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    /// Editable, not yet committed to the ledger
    Draft,
    /// Recorded but held pending confirmation
    Provisional,
    /// Committed to the ledger; immutable except for cancellation
    Posted,
    /// Reversed; terminal
    Cancelled,
}

/// Approval outcome tracked on the voucher header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    NotRequired,
    Pending,
    Approved,
    Rejected,
}

/// Reference to the account a voucher line moves money against
///
/// Customers and suppliers live in their own registries; generic ledger
/// accounts are addressed by name. The display name is resolved through an
/// [`crate::traits::AccountResolver`] and snapshotted onto items and entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AccountRef {
    Customer(String),
    Supplier(String),
    LedgerAccount(String),
}

impl AccountRef {
    /// The identifier carried by this reference
    pub fn id(&self) -> &str {
        match self {
            AccountRef::Customer(id) | AccountRef::Supplier(id) | AccountRef::LedgerAccount(id) => {
                id
            }
        }
    }
}

/// Absolute tolerance used when comparing monetary sums
///
/// Imported data may carry amounts that drifted by fractions of a unit, so
/// balance checks accept a difference of up to 0.01, applied consistently at
/// validation and posting.
pub fn money_tolerance() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Compare two amounts within the money tolerance
pub fn within_tolerance(a: &BigDecimal, b: &BigDecimal) -> bool {
    (a - b).abs() <= money_tolerance()
}

/// Derive the April-March fiscal year string ("YYYY-YY") for a date
pub fn financial_year_for(date: NaiveDate) -> String {
    let year = date.year();
    if date.month() >= 4 {
        format!("{}-{:02}", year, (year + 1) % 100)
    } else {
        format!("{}-{:02}", year - 1, year % 100)
    }
}

/// One line of a voucher
///
/// Exactly one of debit/credit is expected to be nonzero in correct usage;
/// this is not enforced structurally. GST and TDS figures are informational
/// and summed into the voucher totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherItem {
    /// Account this line moves money against
    pub account: AccountRef,
    /// Display name resolved at creation time
    pub account_name: String,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub gst_rate: BigDecimal,
    pub gst_amount: BigDecimal,
    pub tds_rate: BigDecimal,
    pub tds_amount: BigDecimal,
    /// Optional per-line narration
    pub narration: Option<String>,
}

impl VoucherItem {
    /// Create a line with the given debit and credit amounts
    pub fn new(account: AccountRef, debit_amount: BigDecimal, credit_amount: BigDecimal) -> Self {
        Self {
            account,
            account_name: String::new(),
            debit_amount,
            credit_amount,
            gst_rate: BigDecimal::from(0),
            gst_amount: BigDecimal::from(0),
            tds_rate: BigDecimal::from(0),
            tds_amount: BigDecimal::from(0),
            narration: None,
        }
    }

    /// Create a debit line
    pub fn debit(account: AccountRef, amount: BigDecimal) -> Self {
        Self::new(account, amount, BigDecimal::from(0))
    }

    /// Create a credit line
    pub fn credit(account: AccountRef, amount: BigDecimal) -> Self {
        Self::new(account, BigDecimal::from(0), amount)
    }

    /// The nonzero side of this line
    pub fn base_amount(&self) -> &BigDecimal {
        if self.debit_amount > BigDecimal::from(0) {
            &self.debit_amount
        } else {
            &self.credit_amount
        }
    }

    /// Attach a GST breakdown computed from the nonzero side
    pub fn with_gst(mut self, rate: &GstRate) -> Self {
        self.gst_amount = crate::tax::gst::gst_on(self.base_amount(), &rate.total_rate);
        self.gst_rate = rate.total_rate.clone();
        self
    }

    /// Attach a TDS deduction computed from the nonzero side
    pub fn with_tds(mut self, rate: BigDecimal) -> Self {
        self.tds_amount = crate::tax::tds_on(self.base_amount(), &rate);
        self.tds_rate = rate;
        self
    }

    /// Set the per-line narration
    pub fn narration(mut self, narration: String) -> Self {
        self.narration = Some(narration);
        self
    }
}

/// A financial transaction header with balanced debit/credit line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    /// Sequential identity in "<PREFIX>/<padded-sequence>" form
    pub voucher_number: String,
    pub voucher_type: VoucherType,
    pub voucher_date: NaiveDate,
    /// Required description of the transaction
    pub narration: String,
    /// External reference (invoice number, cheque number, ...)
    pub reference_number: Option<String>,
    pub reference_date: Option<NaiveDate>,
    /// April-March fiscal year string, derived from the voucher date
    pub financial_year: String,
    /// Ordered line items
    pub items: Vec<VoucherItem>,
    /// Derived sums over items, recomputed on every save
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub total_gst: BigDecimal,
    pub total_tds: BigDecimal,
    pub status: VoucherStatus,
    pub is_post_dated: bool,
    pub effective_date: Option<NaiveDate>,
    pub auto_post_enabled: bool,
    pub post_dated_reason: Option<String>,
    pub approval_status: ApprovalStatus,
    pub approval_level: u32,
    pub max_approval_level: u32,
    pub posted_date: Option<NaiveDateTime>,
    pub cancelled_date: Option<NaiveDateTime>,
    pub cancel_reason: Option<String>,
    pub provisional_date: Option<NaiveDateTime>,
    pub provisional_reason: Option<String>,
    pub confirmed_date: Option<NaiveDateTime>,
    pub approved_date: Option<NaiveDateTime>,
    pub final_approver_id: Option<String>,
    pub rejected_date: Option<NaiveDateTime>,
    pub rejected_by: Option<String>,
    pub rejection_reason: Option<String>,
    /// Template this voucher was materialized from, if any
    pub template_id: Option<Uuid>,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Optimistic-concurrency counter checked by storage on update
    pub version: u64,
}

impl Voucher {
    /// Create a new draft voucher; totals and fiscal year are derived
    pub fn new(
        voucher_number: String,
        voucher_type: VoucherType,
        voucher_date: NaiveDate,
        narration: String,
        items: Vec<VoucherItem>,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        let mut voucher = Self {
            voucher_number,
            voucher_type,
            voucher_date,
            narration,
            reference_number: None,
            reference_date: None,
            financial_year: financial_year_for(voucher_date),
            items,
            total_debit: BigDecimal::from(0),
            total_credit: BigDecimal::from(0),
            total_gst: BigDecimal::from(0),
            total_tds: BigDecimal::from(0),
            status: VoucherStatus::Draft,
            is_post_dated: false,
            effective_date: None,
            auto_post_enabled: false,
            post_dated_reason: None,
            approval_status: ApprovalStatus::NotRequired,
            approval_level: 0,
            max_approval_level: 0,
            posted_date: None,
            cancelled_date: None,
            cancel_reason: None,
            provisional_date: None,
            provisional_reason: None,
            confirmed_date: None,
            approved_date: None,
            final_approver_id: None,
            rejected_date: None,
            rejected_by: None,
            rejection_reason: None,
            template_id: None,
            created_by: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        voucher.recompute_totals();
        voucher
    }

    /// Recompute the derived totals from the line items
    ///
    /// Callers never supply totals; they are recomputed before every save.
    pub fn recompute_totals(&mut self) {
        self.total_debit = self.items.iter().map(|i| &i.debit_amount).sum();
        self.total_credit = self.items.iter().map(|i| &i.credit_amount).sum();
        self.total_gst = self.items.iter().map(|i| &i.gst_amount).sum();
        self.total_tds = self.items.iter().map(|i| &i.tds_amount).sum();
    }

    /// Whether debits equal credits within the money tolerance
    pub fn is_balanced(&self) -> bool {
        within_tolerance(&self.total_debit, &self.total_credit)
    }

    /// Whether items may still be edited
    pub fn is_editable(&self) -> bool {
        matches!(
            self.status,
            VoucherStatus::Draft | VoucherStatus::Provisional
        )
    }

    /// Validate the voucher structure
    pub fn validate(&self) -> VoucherResult<()> {
        if self.items.is_empty() {
            return Err(VoucherError::Validation(
                "Voucher must have at least one item".to_string(),
            ));
        }

        if self.narration.trim().is_empty() {
            return Err(VoucherError::Validation(
                "Narration is required".to_string(),
            ));
        }

        for item in &self.items {
            if item.debit_amount < BigDecimal::from(0) || item.credit_amount < BigDecimal::from(0)
            {
                return Err(VoucherError::Validation(
                    "Item amounts cannot be negative".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Build the single-sided ledger entries this voucher commits
    ///
    /// Every nonzero debit side yields one entry and every nonzero credit
    /// side yields another, so a line carrying both produces two entries.
    /// Entries snapshot the voucher header at generation time.
    pub fn ledger_entries(&self) -> Vec<LedgerEntry> {
        let mut entries = Vec::new();
        for item in &self.items {
            if item.debit_amount > BigDecimal::from(0) {
                entries.push(LedgerEntry::debit(self, item, item.debit_amount.clone()));
            }
            if item.credit_amount > BigDecimal::from(0) {
                entries.push(LedgerEntry::credit(self, item, item.credit_amount.clone()));
            }
        }
        entries
    }
}

/// One single-sided posting against an account, derived from a posted voucher
///
/// Exactly one of debit/credit is nonzero on any entry. The account name and
/// voucher header fields are denormalized snapshots taken at posting time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account: AccountRef,
    pub account_name: String,
    pub voucher_number: String,
    pub voucher_type: VoucherType,
    pub voucher_date: NaiveDate,
    pub financial_year: String,
    pub reference_number: Option<String>,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub narration: Option<String>,
    pub created_at: NaiveDateTime,
}

impl LedgerEntry {
    fn snapshot(voucher: &Voucher, item: &VoucherItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            account: item.account.clone(),
            account_name: item.account_name.clone(),
            voucher_number: voucher.voucher_number.clone(),
            voucher_type: voucher.voucher_type,
            voucher_date: voucher.voucher_date,
            financial_year: voucher.financial_year.clone(),
            reference_number: voucher.reference_number.clone(),
            debit_amount: BigDecimal::from(0),
            credit_amount: BigDecimal::from(0),
            narration: item.narration.clone(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Create a debit-side entry for a voucher line
    pub fn debit(voucher: &Voucher, item: &VoucherItem, amount: BigDecimal) -> Self {
        let mut entry = Self::snapshot(voucher, item);
        entry.debit_amount = amount;
        entry
    }

    /// Create a credit-side entry for a voucher line
    pub fn credit(voucher: &Voucher, item: &VoucherItem, amount: BigDecimal) -> Self {
        let mut entry = Self::snapshot(voucher, item);
        entry.credit_amount = amount;
        entry
    }
}

/// Errors that can occur in the voucher system
#[derive(Debug, thiserror::Error)]
pub enum VoucherError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Voucher is not balanced: debits = {total_debit}, credits = {total_credit}")]
    Unbalanced {
        total_debit: BigDecimal,
        total_credit: BigDecimal,
    },
    #[error("Voucher already posted: {0}")]
    AlreadyPosted(String),
    #[error("Voucher already cancelled: {0}")]
    AlreadyCancelled(String),
    #[error("Voucher is not provisional: {0}")]
    NotProvisional(String),
    #[error("Voucher is not a draft: {0}")]
    NotDraft(String),
    #[error("Approver '{0}' is not authorized for this approval")]
    UnauthorizedApprover(String),
    #[error("Voucher not found: {0}")]
    VoucherNotFound(String),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Template is inactive: {0}")]
    TemplateInactive(String),
    #[error("Approval record not found: {0}")]
    ApprovalNotFound(String),
    #[error("Recurring voucher not found: {0}")]
    RecurringNotFound(String),
    #[error("Reconciliation not found: {0}")]
    ReconciliationNotFound(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
}

/// Result type for voucher operations
pub type VoucherResult<T> = Result<T, VoucherError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(name: &str) -> AccountRef {
        AccountRef::LedgerAccount(name.to_string())
    }

    #[test]
    fn test_financial_year_april_rule() {
        let april = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let march = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(financial_year_for(april), "2024-25");
        assert_eq!(financial_year_for(march), "2023-24");
    }

    #[test]
    fn test_financial_year_century_padding() {
        let date = NaiveDate::from_ymd_opt(1999, 6, 15).unwrap();
        assert_eq!(financial_year_for(date), "1999-00");
    }

    #[test]
    fn test_totals_are_derived_from_items() {
        let voucher = Voucher::new(
            "JRN/0001".to_string(),
            VoucherType::Journal,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            "Adjustment".to_string(),
            vec![
                VoucherItem::debit(ledger("cash"), BigDecimal::from(1500)),
                VoucherItem::credit(ledger("sales"), BigDecimal::from(1500)),
            ],
        );

        assert_eq!(voucher.total_debit, BigDecimal::from(1500));
        assert_eq!(voucher.total_credit, BigDecimal::from(1500));
        assert!(voucher.is_balanced());
        assert_eq!(voucher.financial_year, "2024-25");
        assert_eq!(voucher.status, VoucherStatus::Draft);
    }

    #[test]
    fn test_balance_tolerance() {
        let a = BigDecimal::from(100000) / BigDecimal::from(100); // 1000.00
        let b = BigDecimal::from(100001) / BigDecimal::from(100); // 1000.01
        let c = BigDecimal::from(100002) / BigDecimal::from(100); // 1000.02
        assert!(within_tolerance(&a, &b));
        assert!(!within_tolerance(&a, &c));
    }

    #[test]
    fn test_ledger_entries_are_single_sided() {
        let voucher = Voucher::new(
            "JRN/0002".to_string(),
            VoucherType::Journal,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            "Mixed line".to_string(),
            vec![
                VoucherItem::new(
                    ledger("suspense"),
                    BigDecimal::from(200),
                    BigDecimal::from(200),
                ),
                VoucherItem::debit(ledger("cash"), BigDecimal::from(300)),
            ],
        );

        let entries = voucher.ledger_entries();
        // The both-sides line yields two entries, the debit line one.
        assert_eq!(entries.len(), 3);
        for entry in &entries {
            let debit_side = entry.debit_amount > BigDecimal::from(0);
            let credit_side = entry.credit_amount > BigDecimal::from(0);
            assert!(debit_side ^ credit_side);
        }
    }

    #[test]
    fn test_validate_rejects_empty_items_and_narration() {
        let empty = Voucher::new(
            "JRN/0003".to_string(),
            VoucherType::Journal,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            "No items".to_string(),
            vec![],
        );
        assert!(matches!(empty.validate(), Err(VoucherError::Validation(_))));

        let blank = Voucher::new(
            "JRN/0004".to_string(),
            VoucherType::Journal,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            "   ".to_string(),
            vec![VoucherItem::debit(ledger("cash"), BigDecimal::from(10))],
        );
        assert!(matches!(blank.validate(), Err(VoucherError::Validation(_))));
    }
}
