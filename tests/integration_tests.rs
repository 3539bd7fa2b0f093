//! Integration tests for voucher-core

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;

use voucher_core::utils::{
    MemoryStorage, RecordingNotifier, SequenceNumbering, StaticAccountDirectory,
};
use voucher_core::{
    AccountRef, ApprovalLevelDef, ApprovalStatus, Frequency, GstRate, NotificationSender,
    RecurringVoucher, StatementRow, TemplateItem, VoucherBook, VoucherBuilder, VoucherError,
    VoucherItem, VoucherResult, VoucherStatus, VoucherTemplate, VoucherType,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn directory() -> StaticAccountDirectory {
    StaticAccountDirectory::new()
        .with_ledger_account("Cash")
        .with_ledger_account("Bank")
        .with_ledger_account("Sales Revenue")
        .with_ledger_account("GST Payable")
        .with_ledger_account("Rent Expense")
        .with_customer("cust-1", "Acme Traders")
        .with_supplier("supp-1", "Steel Works")
}

fn new_book(storage: MemoryStorage) -> VoucherBook<MemoryStorage> {
    VoucherBook::new(
        storage,
        Box::new(SequenceNumbering::new()),
        Box::new(directory()),
        Box::new(RecordingNotifier::new()),
    )
}

#[tokio::test]
async fn test_complete_voucher_workflow() {
    let storage = MemoryStorage::new();
    let mut book = new_book(storage);

    // Record a GST sale to a customer.
    let gst_rate = GstRate::intra_state(BigDecimal::from(18));
    let draft = VoucherBuilder::new(
        VoucherType::Sales,
        date(2024, 6, 10),
        "Sale of goods with GST".to_string(),
    )
    .reference("INV-101".to_string())
    .created_by("clerk".to_string())
    .debit(
        AccountRef::Customer("cust-1".to_string()),
        BigDecimal::from(11800),
    )
    .item(
        VoucherItem::credit(
            AccountRef::LedgerAccount("Sales Revenue".to_string()),
            BigDecimal::from(10000),
        )
        .with_gst(&gst_rate),
    )
    .credit(
        AccountRef::LedgerAccount("GST Payable".to_string()),
        BigDecimal::from(1800),
    )
    .build()
    .unwrap();

    let voucher = book.create_voucher(draft).await.unwrap();
    assert_eq!(voucher.voucher_number, "SAL/0001");
    assert_eq!(voucher.financial_year, "2024-25");
    assert_eq!(voucher.items[0].account_name, "Acme Traders");
    assert_eq!(voucher.total_gst, BigDecimal::from(1800));

    let posted = book.post_voucher(&voucher.voucher_number).await.unwrap();
    assert_eq!(posted.status, VoucherStatus::Posted);

    // The customer balance is derived from the ledger, never stored.
    let receivable = book.account_balance("Acme Traders", None).await.unwrap();
    assert_eq!(receivable, BigDecimal::from(11800));

    let trial = book.trial_balance(date(2024, 6, 30)).await.unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.total_debits, BigDecimal::from(11800));

    // Cancelling reverses the ledger in full.
    let cancelled = book
        .cancel_voucher(&posted.voucher_number, "customer returned goods")
        .await
        .unwrap();
    assert_eq!(cancelled.status, VoucherStatus::Cancelled);

    let receivable = book.account_balance("Acme Traders", None).await.unwrap();
    assert_eq!(receivable, BigDecimal::from(0));
    let trial = book.trial_balance(date(2024, 6, 30)).await.unwrap();
    assert!(trial.rows.is_empty());
}

#[tokio::test]
async fn test_unbalanced_voucher_never_reaches_ledger() {
    let storage = MemoryStorage::new();
    let mut book = new_book(storage);

    let draft = VoucherBuilder::new(
        VoucherType::Journal,
        date(2024, 6, 1),
        "Fat-fingered entry".to_string(),
    )
    .debit(
        AccountRef::LedgerAccount("Cash".to_string()),
        BigDecimal::from(1000),
    )
    .credit(
        AccountRef::LedgerAccount("Sales Revenue".to_string()),
        BigDecimal::from(100),
    )
    .build()
    .unwrap();

    let voucher = book.create_voucher(draft).await.unwrap();
    let err = book.post_voucher(&voucher.voucher_number).await.unwrap_err();
    assert!(matches!(err, VoucherError::Unbalanced { .. }));

    let trial = book.trial_balance(date(2024, 6, 30)).await.unwrap();
    assert!(trial.rows.is_empty());
}

#[tokio::test]
async fn test_approval_chain_gates_nothing_but_status() {
    let storage = MemoryStorage::new();
    let mut book = new_book(storage);

    let mut template = VoucherTemplate::new(
        "Large Payment".to_string(),
        VoucherType::Payment,
        vec![
            TemplateItem::debit(
                AccountRef::LedgerAccount("Rent Expense".to_string()),
                "Rent Expense".to_string(),
                BigDecimal::from(60000),
            ),
            TemplateItem::credit(
                AccountRef::LedgerAccount("Bank".to_string()),
                "Bank".to_string(),
                BigDecimal::from(60000),
            ),
        ],
        "admin".to_string(),
    );
    template.requires_approval = true;
    template.approval_levels = vec![
        ApprovalLevelDef {
            level: 1,
            approver_id: "supervisor".to_string(),
            approver_role: "supervisor".to_string(),
            max_amount: Some(BigDecimal::from(50000)),
        },
        ApprovalLevelDef {
            level: 2,
            approver_id: "cfo".to_string(),
            approver_role: "finance-head".to_string(),
            max_amount: None,
        },
    ];
    let template = book.create_template(template).await.unwrap();

    let voucher = book
        .materialize_from_template(template.id, HashMap::new(), "clerk", date(2024, 6, 1))
        .await
        .unwrap();
    assert_eq!(voucher.approval_status, ApprovalStatus::Pending);
    assert_eq!(voucher.max_approval_level, 2);

    let records = book.approvals_for(&voucher.voucher_number).await.unwrap();
    // The amount exceeds the level-1 cap; the flag is informational only.
    assert!(!records[0].can_approve_amount);

    let after_first = book
        .approve(records[0].id, "supervisor", Some("forwarding up".to_string()))
        .await
        .unwrap();
    assert_eq!(after_first.approval_level, 2);
    assert_eq!(after_first.approval_status, ApprovalStatus::Pending);

    let records = book.approvals_for(&voucher.voucher_number).await.unwrap();
    let final_level = records.iter().find(|r| r.approval_level == 2).unwrap();
    let approved = book.approve(final_level.id, "cfo", None).await.unwrap();
    assert_eq!(approved.approval_status, ApprovalStatus::Approved);

    // Approval does not post; that stays an explicit call.
    assert_eq!(approved.status, VoucherStatus::Draft);
    let posted = book.post_voucher(&approved.voucher_number).await.unwrap();
    assert_eq!(posted.status, VoucherStatus::Posted);
}

#[tokio::test]
async fn test_bank_reconciliation_end_to_end() {
    let storage = MemoryStorage::new();
    let mut book = new_book(storage);

    // A cheque deposit recorded in the books.
    let draft = VoucherBuilder::new(
        VoucherType::Receipt,
        date(2024, 1, 12),
        "Cheque deposit".to_string(),
    )
    .reference("100234".to_string())
    .debit(
        AccountRef::LedgerAccount("Bank".to_string()),
        BigDecimal::from(5000),
    )
    .credit(
        AccountRef::LedgerAccount("Sales Revenue".to_string()),
        BigDecimal::from(5000),
    )
    .build()
    .unwrap();
    let voucher = book.create_voucher(draft).await.unwrap();
    book.post_voucher(&voucher.voucher_number).await.unwrap();

    let session = book
        .create_reconciliation(
            "Bank".to_string(),
            date(2024, 1, 1),
            date(2024, 1, 31),
            BigDecimal::from(20000),
        )
        .await
        .unwrap();

    let session = book.load_book_entries(session.id).await.unwrap();
    assert_eq!(session.book_entries.len(), 1);
    assert_eq!(
        session.book_entries[0].cheque_number.as_deref(),
        Some("100234")
    );

    // The statement row uses aliased field names, as real exports do.
    let rows: Vec<StatementRow> = serde_json::from_str(
        r#"[{
            "transactionDate": "2024-01-10",
            "narration": "CHQ DEP 100234",
            "chqNo": "100234",
            "debit": "5000"
        }]"#,
    )
    .unwrap();
    let session = book.import_statement(session.id, rows).await.unwrap();
    assert_eq!(session.bank_entries.len(), 1);

    let matched = book.auto_match(session.id).await.unwrap();
    assert_eq!(matched, 1);

    let session = book.get_reconciliation(session.id).await.unwrap();
    assert_eq!(session.summary.matched_entries, 1);
    assert_eq!(session.summary.unmatched_bank_entries, 0);
    assert_eq!(session.summary.unmatched_book_entries, 0);
    assert_eq!(
        session.summary.reconciliation_difference,
        BigDecimal::from(0)
    );
}

#[tokio::test]
async fn test_recurring_schedule_materializes_and_advances() {
    let storage = MemoryStorage::new();
    let mut book = new_book(storage);

    let template = book
        .create_template(VoucherTemplate::new(
            "Monthly Rent".to_string(),
            VoucherType::Payment,
            vec![
                TemplateItem::debit(
                    AccountRef::LedgerAccount("Rent Expense".to_string()),
                    "Rent Expense".to_string(),
                    BigDecimal::from(15000),
                ),
                TemplateItem::credit(
                    AccountRef::LedgerAccount("Bank".to_string()),
                    "Bank".to_string(),
                    BigDecimal::from(15000),
                ),
            ],
            "admin".to_string(),
        ))
        .await
        .unwrap();

    let mut schedule = RecurringVoucher::new(
        "Office rent".to_string(),
        template.id,
        Frequency::Monthly,
        1,
        date(2024, 1, 31),
    );
    schedule.day_of_month = Some(31);
    let schedule = book.create_recurring(schedule).await.unwrap();

    let outcomes = book.execute_all_due(date(2024, 1, 31)).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success);

    let voucher_number = outcomes[0].voucher_number.clone().unwrap();
    let voucher = book.get_voucher(&voucher_number).await.unwrap().unwrap();
    assert_eq!(voucher.status, VoucherStatus::Draft);
    assert_eq!(voucher.total_debit, BigDecimal::from(15000));

    // Day-31 schedules clamp to the end of February.
    let due = book.due_recurring(date(2024, 2, 29)).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].next_run_date, date(2024, 2, 29));

    // Nothing further is due before the cursor.
    let outcomes = book.execute_all_due(date(2024, 2, 1)).await.unwrap();
    assert!(outcomes.is_empty());
}

/// Notifier that always fails, to prove delivery is best-effort
struct FailingNotifier;

#[async_trait]
impl NotificationSender for FailingNotifier {
    async fn notify(&self, _recipient: &str, _subject: &str, _body: &str) -> VoucherResult<()> {
        Err(VoucherError::Storage("smtp unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_execution() {
    let storage = MemoryStorage::new();
    let mut book = VoucherBook::new(
        storage,
        Box::new(SequenceNumbering::new()),
        Box::new(directory()),
        Box::new(FailingNotifier),
    );

    let template = book
        .create_template(VoucherTemplate::new(
            "Monthly Rent".to_string(),
            VoucherType::Payment,
            vec![
                TemplateItem::debit(
                    AccountRef::LedgerAccount("Rent Expense".to_string()),
                    "Rent Expense".to_string(),
                    BigDecimal::from(9000),
                ),
                TemplateItem::credit(
                    AccountRef::LedgerAccount("Bank".to_string()),
                    "Bank".to_string(),
                    BigDecimal::from(9000),
                ),
            ],
            "admin".to_string(),
        ))
        .await
        .unwrap();

    let mut schedule = RecurringVoucher::new(
        "Office rent".to_string(),
        template.id,
        Frequency::Monthly,
        1,
        date(2024, 6, 1),
    );
    schedule.notify_on_success = true;
    schedule.notification_recipient = Some("accounts@example.com".to_string());
    let schedule = book.create_recurring(schedule).await.unwrap();

    // The notifier always fails; execution still succeeds.
    let voucher = book
        .execute_recurring(schedule.id, date(2024, 6, 1))
        .await
        .unwrap();
    assert_eq!(voucher.total_debit, BigDecimal::from(9000));
}
