//! Recurring voucher scheduling example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use voucher_core::utils::{
    MemoryStorage, RecordingNotifier, SequenceNumbering, StaticAccountDirectory,
};
use voucher_core::{
    AccountRef, Frequency, RecurringVoucher, TemplateItem, VoucherBook, VoucherTemplate,
    VoucherType,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔁 Voucher Core - Recurring Billing Example\n");

    let directory = StaticAccountDirectory::new()
        .with_ledger_account("Rent Expense")
        .with_ledger_account("Bank");

    let notifier = RecordingNotifier::new();
    let mut book = VoucherBook::new(
        MemoryStorage::new(),
        Box::new(SequenceNumbering::new()),
        Box::new(directory),
        Box::new(notifier.clone()),
    );

    // 1. A template with a variable rent amount
    let template = book
        .create_template(VoucherTemplate::new(
            "Monthly Rent".to_string(),
            VoucherType::Payment,
            vec![
                TemplateItem::debit(
                    AccountRef::LedgerAccount("Rent Expense".to_string()),
                    "Rent Expense".to_string(),
                    BigDecimal::from(15000),
                )
                .variable(),
                TemplateItem::credit(
                    AccountRef::LedgerAccount("Bank".to_string()),
                    "Bank".to_string(),
                    BigDecimal::from(15000),
                )
                .variable(),
            ],
            "admin".to_string(),
        ))
        .await?;
    println!("📋 Created template '{}'", template.name);

    // 2. Schedule it monthly on the 31st - short months clamp to month end
    let mut schedule = RecurringVoucher::new(
        "Office rent".to_string(),
        template.id,
        Frequency::Monthly,
        1,
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    );
    schedule.day_of_month = Some(31);
    schedule.notify_on_success = true;
    schedule.notification_recipient = Some("accounts@example.com".to_string());
    schedule
        .variable_values
        .insert("Rent Expense_amount".to_string(), "16500".to_string());
    schedule
        .variable_values
        .insert("Bank_amount".to_string(), "16500".to_string());
    let schedule = book.create_recurring(schedule).await?;
    println!(
        "📅 Scheduled '{}' starting {}\n",
        schedule.name, schedule.next_run_date
    );

    // 3. Run the scheduler for a few month ends
    for today in [
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    ] {
        let outcomes = book.execute_all_due(today).await?;
        for outcome in &outcomes {
            if outcome.success {
                println!(
                    "  ✓ {}: created {}",
                    today,
                    outcome.voucher_number.as_deref().unwrap_or("-")
                );
            } else {
                println!(
                    "  ✗ {}: {}",
                    today,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    let updated = book
        .due_recurring(NaiveDate::from_ymd_opt(2024, 4, 30).unwrap())
        .await?;
    if let Some(next) = updated.first() {
        println!(
            "\n  Next run: {} (runs so far: {})",
            next.next_run_date, next.total_runs
        );
    }

    println!("\n📧 Notifications sent: {}", notifier.sent().len());
    for notice in notifier.sent() {
        println!("  → {}: {}", notice.recipient, notice.subject);
    }

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
