//! Bank reconciliation sessions and rule-based statement matching
//!
//! A session holds externally imported bank statement lines and a snapshot
//! of book ledger entries for one account over one statement period. Auto
//! matching is greedy and order-dependent by design: entries are scanned in
//! stored vector order and the first candidate wins. The summary is fully
//! derived and recomputed on every save.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::VoucherStorage;
use crate::types::*;

/// Days of slack allowed between bank and book dates in the amount-only pass
const DATE_MATCH_WINDOW_DAYS: i64 = 3;

/// One line imported from a bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankStatementEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    pub cheque_number: Option<String>,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub matched: bool,
    /// Id of the matched book entry, when matched
    pub matched_entry_id: Option<Uuid>,
}

/// One book-side line snapshotted from the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStatementEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub narration: Option<String>,
    pub voucher_number: String,
    pub cheque_number: Option<String>,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub matched: bool,
    /// Id of the matched bank entry, when matched
    pub matched_entry_id: Option<Uuid>,
}

/// Raw statement row accepted by the import
///
/// Field names are aliased tolerantly to absorb the common export variants;
/// missing amounts default to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRow {
    #[serde(alias = "transactionDate")]
    pub date: NaiveDate,
    #[serde(default, alias = "narration")]
    pub description: String,
    #[serde(default, alias = "chqNo")]
    pub cheque_number: Option<String>,
    #[serde(default, alias = "debit")]
    pub debit_amount: BigDecimal,
    #[serde(default, alias = "credit")]
    pub credit_amount: BigDecimal,
}

/// Derived totals over a reconciliation session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub total_bank_debits: BigDecimal,
    pub total_bank_credits: BigDecimal,
    pub total_book_debits: BigDecimal,
    pub total_book_credits: BigDecimal,
    pub matched_entries: usize,
    pub unmatched_bank_entries: usize,
    pub unmatched_book_entries: usize,
    /// Absolute difference between the bank and book closing balances
    pub reconciliation_difference: BigDecimal,
}

/// A reconciliation session for one account over one statement period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankReconciliation {
    pub id: Uuid,
    /// Ledger account name the book entries are pulled from
    pub account_name: String,
    pub statement_from: NaiveDate,
    pub statement_to: NaiveDate,
    pub opening_balance: BigDecimal,
    pub bank_entries: Vec<BankStatementEntry>,
    pub book_entries: Vec<BookStatementEntry>,
    pub summary: ReconciliationSummary,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BankReconciliation {
    /// Open a new session with no entries
    pub fn new(
        account_name: String,
        statement_from: NaiveDate,
        statement_to: NaiveDate,
        opening_balance: BigDecimal,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            account_name,
            statement_from,
            statement_to,
            opening_balance,
            bank_entries: Vec::new(),
            book_entries: Vec::new(),
            summary: ReconciliationSummary::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute the derived summary from the current entries
    ///
    /// Idempotent: recomputing with unchanged entries yields identical
    /// values, and nothing beyond the summary fields is touched.
    pub fn recompute_summary(&mut self) {
        let total_bank_debits: BigDecimal =
            self.bank_entries.iter().map(|e| &e.debit_amount).sum();
        let total_bank_credits: BigDecimal =
            self.bank_entries.iter().map(|e| &e.credit_amount).sum();
        let total_book_debits: BigDecimal =
            self.book_entries.iter().map(|e| &e.debit_amount).sum();
        let total_book_credits: BigDecimal =
            self.book_entries.iter().map(|e| &e.credit_amount).sum();

        let matched_entries = self.bank_entries.iter().filter(|e| e.matched).count();
        let unmatched_bank_entries = self.bank_entries.len() - matched_entries;
        let unmatched_book_entries = self.book_entries.iter().filter(|e| !e.matched).count();

        let bank_closing = &self.opening_balance + &total_bank_credits - &total_bank_debits;
        let book_closing = &self.opening_balance + &total_book_credits - &total_book_debits;

        self.summary = ReconciliationSummary {
            total_bank_debits,
            total_bank_credits,
            total_book_debits,
            total_book_credits,
            matched_entries,
            unmatched_bank_entries,
            unmatched_book_entries,
            reconciliation_difference: (bank_closing - book_closing).abs(),
        };
    }
}

fn amounts_match(bank: &BankStatementEntry, book: &BookStatementEntry) -> bool {
    within_tolerance(&bank.debit_amount, &book.debit_amount)
        && within_tolerance(&bank.credit_amount, &book.credit_amount)
}

fn dates_close(a: NaiveDate, b: NaiveDate) -> bool {
    (a - b).num_days().abs() <= DATE_MATCH_WINDOW_DAYS
}

/// Manager for reconciliation sessions
pub struct ReconciliationManager<S: VoucherStorage> {
    storage: S,
}

impl<S: VoucherStorage> ReconciliationManager<S> {
    /// Create a new reconciliation manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    async fn get_required(&self, reconciliation_id: Uuid) -> VoucherResult<BankReconciliation> {
        self.storage
            .get_reconciliation(reconciliation_id)
            .await?
            .ok_or_else(|| VoucherError::ReconciliationNotFound(reconciliation_id.to_string()))
    }

    async fn save_with_summary(
        &mut self,
        mut session: BankReconciliation,
    ) -> VoucherResult<BankReconciliation> {
        session.recompute_summary();
        session.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_reconciliation(&session).await?;
        Ok(session)
    }

    /// Open a new session
    pub async fn create_session(
        &mut self,
        account_name: String,
        statement_from: NaiveDate,
        statement_to: NaiveDate,
        opening_balance: BigDecimal,
    ) -> VoucherResult<BankReconciliation> {
        let session =
            BankReconciliation::new(account_name, statement_from, statement_to, opening_balance);
        self.storage.save_reconciliation(&session).await?;
        Ok(session)
    }

    /// Get a session by id, failing if unknown
    pub async fn get_session(&self, reconciliation_id: Uuid) -> VoucherResult<BankReconciliation> {
        self.get_required(reconciliation_id).await
    }

    /// Replace the bank side wholesale from imported statement rows
    pub async fn import_statement(
        &mut self,
        reconciliation_id: Uuid,
        rows: Vec<StatementRow>,
    ) -> VoucherResult<BankReconciliation> {
        let mut session = self.get_required(reconciliation_id).await?;

        session.bank_entries = rows
            .into_iter()
            .map(|row| BankStatementEntry {
                id: Uuid::new_v4(),
                date: row.date,
                description: row.description,
                cheque_number: row.cheque_number,
                debit_amount: row.debit_amount,
                credit_amount: row.credit_amount,
                matched: false,
                matched_entry_id: None,
            })
            .collect();

        self.save_with_summary(session).await
    }

    /// Snapshot the ledger entries for the session's account and period
    /// into the book side, all unmatched
    pub async fn load_book_entries(
        &mut self,
        reconciliation_id: Uuid,
    ) -> VoucherResult<BankReconciliation> {
        let mut session = self.get_required(reconciliation_id).await?;

        let entries = self
            .storage
            .account_ledger_entries(
                &session.account_name,
                Some(session.statement_from),
                Some(session.statement_to),
            )
            .await?;

        session.book_entries = entries
            .into_iter()
            .map(|entry| BookStatementEntry {
                id: entry.id,
                date: entry.voucher_date,
                narration: entry.narration,
                voucher_number: entry.voucher_number,
                cheque_number: entry.reference_number,
                debit_amount: entry.debit_amount,
                credit_amount: entry.credit_amount,
                matched: false,
                matched_entry_id: None,
            })
            .collect();

        self.save_with_summary(session).await
    }

    /// Pair unmatched bank and book entries by rule, highest confidence first
    ///
    /// Pass 1 requires an identical cheque number and equal amounts; pass 2
    /// runs over the leftovers on equal amounts and dates within three days.
    /// Scanning is greedy in stored order and the first candidate wins.
    /// Returns the number of new matches made.
    pub async fn auto_match(&mut self, reconciliation_id: Uuid) -> VoucherResult<usize> {
        let mut session = self.get_required(reconciliation_id).await?;
        let mut matches = 0;

        let (bank_entries, book_entries) =
            (&mut session.bank_entries, &mut session.book_entries);

        // Pass 1: cheque number and amounts.
        for bank in bank_entries.iter_mut().filter(|e| !e.matched) {
            let Some(cheque) = bank.cheque_number.clone() else {
                continue;
            };
            let candidate = book_entries.iter_mut().find(|book| {
                !book.matched
                    && book.cheque_number.as_deref() == Some(cheque.as_str())
                    && amounts_match(bank, book)
            });
            if let Some(book) = candidate {
                bank.matched = true;
                bank.matched_entry_id = Some(book.id);
                book.matched = true;
                book.matched_entry_id = Some(bank.id);
                matches += 1;
            }
        }

        // Pass 2: amounts and nearby dates, ignoring cheque numbers.
        for bank in bank_entries.iter_mut().filter(|e| !e.matched) {
            let candidate = book_entries.iter_mut().find(|book| {
                !book.matched && amounts_match(bank, book) && dates_close(bank.date, book.date)
            });
            if let Some(book) = candidate {
                bank.matched = true;
                bank.matched_entry_id = Some(book.id);
                book.matched = true;
                book.matched_entry_id = Some(bank.id);
                matches += 1;
            }
        }

        self.save_with_summary(session).await?;
        Ok(matches)
    }

    /// Manually pair one bank entry with one book entry
    pub async fn match_entries(
        &mut self,
        reconciliation_id: Uuid,
        bank_entry_id: Uuid,
        book_entry_id: Uuid,
    ) -> VoucherResult<BankReconciliation> {
        let mut session = self.get_required(reconciliation_id).await?;

        let bank = session
            .bank_entries
            .iter_mut()
            .find(|e| e.id == bank_entry_id)
            .ok_or_else(|| {
                VoucherError::Validation(format!("Bank entry not found: {}", bank_entry_id))
            })?;
        if bank.matched {
            return Err(VoucherError::Validation(format!(
                "Bank entry already matched: {}",
                bank_entry_id
            )));
        }

        let book = session
            .book_entries
            .iter_mut()
            .find(|e| e.id == book_entry_id)
            .ok_or_else(|| {
                VoucherError::Validation(format!("Book entry not found: {}", book_entry_id))
            })?;
        if book.matched {
            return Err(VoucherError::Validation(format!(
                "Book entry already matched: {}",
                book_entry_id
            )));
        }

        book.matched = true;
        book.matched_entry_id = Some(bank_entry_id);
        bank.matched = true;
        bank.matched_entry_id = Some(book_entry_id);

        self.save_with_summary(session).await
    }

    /// Undo a pairing from the bank side, clearing both entries
    pub async fn unmatch_entries(
        &mut self,
        reconciliation_id: Uuid,
        bank_entry_id: Uuid,
    ) -> VoucherResult<BankReconciliation> {
        let mut session = self.get_required(reconciliation_id).await?;

        let bank = session
            .bank_entries
            .iter_mut()
            .find(|e| e.id == bank_entry_id)
            .ok_or_else(|| {
                VoucherError::Validation(format!("Bank entry not found: {}", bank_entry_id))
            })?;
        if !bank.matched {
            return Err(VoucherError::Validation(format!(
                "Bank entry is not matched: {}",
                bank_entry_id
            )));
        }

        let counterpart = bank.matched_entry_id.take();
        bank.matched = false;

        if let Some(book_id) = counterpart {
            if let Some(book) = session.book_entries.iter_mut().find(|e| e.id == book_id) {
                book.matched = false;
                book.matched_entry_id = None;
            }
        }

        self.save_with_summary(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bank_row(
        d: NaiveDate,
        cheque: Option<&str>,
        debit: i64,
        credit: i64,
    ) -> StatementRow {
        StatementRow {
            date: d,
            description: "stmt".to_string(),
            cheque_number: cheque.map(|c| c.to_string()),
            debit_amount: BigDecimal::from(debit),
            credit_amount: BigDecimal::from(credit),
        }
    }

    fn book_entry(
        d: NaiveDate,
        cheque: Option<&str>,
        debit: i64,
        credit: i64,
    ) -> BookStatementEntry {
        BookStatementEntry {
            id: Uuid::new_v4(),
            date: d,
            narration: None,
            voucher_number: "PAY/0001".to_string(),
            cheque_number: cheque.map(|c| c.to_string()),
            debit_amount: BigDecimal::from(debit),
            credit_amount: BigDecimal::from(credit),
            matched: false,
            matched_entry_id: None,
        }
    }

    async fn session_with(
        manager: &mut ReconciliationManager<MemoryStorage>,
        rows: Vec<StatementRow>,
        book: Vec<BookStatementEntry>,
    ) -> BankReconciliation {
        let session = manager
            .create_session(
                "Bank".to_string(),
                date(2024, 1, 1),
                date(2024, 1, 31),
                BigDecimal::from(0),
            )
            .await
            .unwrap();
        let mut session = manager.import_statement(session.id, rows).await.unwrap();
        session.book_entries = book;
        session.recompute_summary();
        manager
            .storage
            .update_reconciliation(&session)
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_cheque_number_match_wins_pass_one() {
        let storage = MemoryStorage::new();
        let mut manager = ReconciliationManager::new(storage);

        let session = session_with(
            &mut manager,
            vec![bank_row(date(2024, 1, 10), Some("100234"), 5000, 0)],
            vec![book_entry(date(2024, 1, 12), Some("100234"), 5000, 0)],
        )
        .await;

        let matched = manager.auto_match(session.id).await.unwrap();
        assert_eq!(matched, 1);

        let session = manager.get_session(session.id).await.unwrap();
        assert!(session.bank_entries[0].matched);
        assert!(session.book_entries[0].matched);
        assert_eq!(
            session.bank_entries[0].matched_entry_id,
            Some(session.book_entries[0].id)
        );
        assert_eq!(session.summary.matched_entries, 1);
    }

    #[tokio::test]
    async fn test_amount_and_date_match_in_pass_two() {
        let storage = MemoryStorage::new();
        let mut manager = ReconciliationManager::new(storage);

        let session = session_with(
            &mut manager,
            vec![bank_row(date(2024, 1, 10), None, 0, 1200)],
            vec![book_entry(date(2024, 1, 13), None, 0, 1200)],
        )
        .await;

        assert_eq!(manager.auto_match(session.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dates_beyond_window_do_not_match() {
        let storage = MemoryStorage::new();
        let mut manager = ReconciliationManager::new(storage);

        let session = session_with(
            &mut manager,
            vec![bank_row(date(2024, 1, 10), None, 0, 1200)],
            vec![book_entry(date(2024, 1, 14), None, 0, 1200)],
        )
        .await;

        assert_eq!(manager.auto_match(session.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_greedy_tie_takes_first_in_order() {
        let storage = MemoryStorage::new();
        let mut manager = ReconciliationManager::new(storage);

        let first = book_entry(date(2024, 1, 9), None, 2500, 0);
        let second = book_entry(date(2024, 1, 11), None, 2500, 0);
        let first_id = first.id;
        let second_id = second.id;

        let session = session_with(
            &mut manager,
            vec![bank_row(date(2024, 1, 10), None, 2500, 0)],
            vec![first, second],
        )
        .await;

        assert_eq!(manager.auto_match(session.id).await.unwrap(), 1);

        let session = manager.get_session(session.id).await.unwrap();
        assert_eq!(session.bank_entries[0].matched_entry_id, Some(first_id));
        let unmatched: Vec<_> = session
            .book_entries
            .iter()
            .filter(|e| !e.matched)
            .collect();
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].id, second_id);
    }

    #[tokio::test]
    async fn test_summary_recompute_is_idempotent() {
        let storage = MemoryStorage::new();
        let mut manager = ReconciliationManager::new(storage);

        let mut session = session_with(
            &mut manager,
            vec![
                bank_row(date(2024, 1, 5), None, 1000, 0),
                bank_row(date(2024, 1, 6), None, 0, 400),
            ],
            vec![book_entry(date(2024, 1, 5), None, 1000, 0)],
        )
        .await;

        session.recompute_summary();
        let first = session.summary.clone();
        session.recompute_summary();
        assert_eq!(session.summary, first);

        assert_eq!(first.total_bank_debits, BigDecimal::from(1000));
        assert_eq!(first.total_bank_credits, BigDecimal::from(400));
        assert_eq!(first.total_book_debits, BigDecimal::from(1000));
        // Bank closing differs from book closing by the unmatched credit.
        assert_eq!(first.reconciliation_difference, BigDecimal::from(400));
    }

    #[tokio::test]
    async fn test_manual_match_and_unmatch_keep_both_sides_consistent() {
        let storage = MemoryStorage::new();
        let mut manager = ReconciliationManager::new(storage);

        let book = book_entry(date(2024, 1, 20), None, 0, 900);
        let book_id = book.id;
        let session = session_with(
            &mut manager,
            vec![bank_row(date(2024, 1, 2), None, 0, 900)],
            vec![book],
        )
        .await;
        let bank_id = session.bank_entries[0].id;

        let session = manager
            .match_entries(session.id, bank_id, book_id)
            .await
            .unwrap();
        assert!(session.bank_entries[0].matched);
        assert!(session.book_entries[0].matched);
        assert_eq!(session.summary.matched_entries, 1);

        let session = manager.unmatch_entries(session.id, bank_id).await.unwrap();
        assert!(!session.bank_entries[0].matched);
        assert!(!session.book_entries[0].matched);
        assert_eq!(session.bank_entries[0].matched_entry_id, None);
        assert_eq!(session.book_entries[0].matched_entry_id, None);
        assert_eq!(session.summary.matched_entries, 0);
    }

    #[test]
    fn test_statement_row_field_aliases() {
        let json = r#"{
            "transactionDate": "2024-01-10",
            "narration": "NEFT transfer",
            "chqNo": "100234",
            "debit": "5000"
        }"#;
        let row: StatementRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.description, "NEFT transfer");
        assert_eq!(row.cheque_number.as_deref(), Some("100234"));
        assert_eq!(row.debit_amount, BigDecimal::from(5000));
        assert_eq!(row.credit_amount, BigDecimal::from(0));
    }
}
