//! Basic voucher lifecycle example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use voucher_core::utils::{
    MemoryStorage, RecordingNotifier, SequenceNumbering, StaticAccountDirectory,
};
use voucher_core::{AccountRef, GstRate, VoucherBook, VoucherBuilder, VoucherItem, VoucherType};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧾 Voucher Core - Basic Voucher Example\n");

    let directory = StaticAccountDirectory::new()
        .with_ledger_account("Cash")
        .with_ledger_account("Bank")
        .with_ledger_account("Sales Revenue")
        .with_ledger_account("GST Payable")
        .with_ledger_account("Rent Expense")
        .with_customer("cust-1", "Acme Traders");

    let mut book = VoucherBook::new(
        MemoryStorage::new(),
        Box::new(SequenceNumbering::new()),
        Box::new(directory),
        Box::new(RecordingNotifier::new()),
    );

    // 1. Record a credit sale with GST
    println!("💰 Recording a GST sale...");
    let gst_rate = GstRate::intra_state(BigDecimal::from(18));
    let draft = VoucherBuilder::new(
        VoucherType::Sales,
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        "Sale of goods to Acme Traders".to_string(),
    )
    .reference("INV-101".to_string())
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
    .build()?;

    let sale = book.create_voucher(draft).await?;
    println!("  ✓ Created {} ({})", sale.voucher_number, sale.financial_year);
    println!("  Debits:  ₹{}", sale.total_debit);
    println!("  Credits: ₹{}", sale.total_credit);
    println!("  GST:     ₹{}", sale.total_gst);

    let posted = book.post_voucher(&sale.voucher_number).await?;
    println!("  ✓ Posted on {:?}\n", posted.posted_date.unwrap().date());

    // 2. A provisional rent payment, confirmed later
    println!("🏠 Holding a rent payment as provisional...");
    let rent = book
        .create_voucher(
            VoucherBuilder::new(
                VoucherType::Payment,
                NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                "Office rent for June".to_string(),
            )
            .debit(
                AccountRef::LedgerAccount("Rent Expense".to_string()),
                BigDecimal::from(15000),
            )
            .credit(
                AccountRef::LedgerAccount("Bank".to_string()),
                BigDecimal::from(15000),
            )
            .build()?,
        )
        .await?;

    book.mark_provisional(&rent.voucher_number, "awaiting landlord receipt")
        .await?;
    println!("  ✓ {} held as provisional", rent.voucher_number);

    let confirmed = book.confirm_provisional(&rent.voucher_number).await?;
    println!("  ✓ Confirmed and posted ({:?})\n", confirmed.status);

    // 3. Balances and the trial balance are derived from the ledger
    println!("📈 Balances...");
    for account in ["Acme Traders", "Sales Revenue", "Bank", "Rent Expense"] {
        let balance = book.account_balance(account, None).await?;
        println!("  {}: ₹{}", account, balance);
    }

    let trial = book
        .trial_balance(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
        .await?;
    println!("\n🔍 Trial Balance as of June 30, 2024:");
    println!("  Total Debits:  ₹{}", trial.total_debits);
    println!("  Total Credits: ₹{}", trial.total_credits);
    println!(
        "  Balanced: {}",
        if trial.is_balanced { "✅ Yes" } else { "❌ No" }
    );

    // 4. Cancel the sale; the ledger reverses in full
    println!("\n↩️  Cancelling the sale...");
    book.cancel_voucher(&sale.voucher_number, "customer returned goods")
        .await?;
    let receivable = book.account_balance("Acme Traders", None).await?;
    println!("  Receivable after cancel: ₹{}", receivable);

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
