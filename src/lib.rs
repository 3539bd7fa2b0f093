//! # Voucher Core
//!
//! A double-entry voucher accounting core providing balanced transaction
//! posting, approval workflows, recurring vouchers, and bank reconciliation.
//!
//! ## Features
//!
//! - **Voucher lifecycle**: draft, provisional, posted, and cancelled states
//!   with balance validation at every posting
//! - **Ledger posting**: single-sided ledger entries mirroring voucher lines,
//!   with derived account balances and trial balance generation
//! - **Approval workflows**: lazy multi-level approval chains with
//!   delegation and per-level authorization
//! - **Recurring vouchers**: template materialization on daily through
//!   yearly schedules with end-of-month aware date math
//! - **Bank reconciliation**: rule-based greedy matching of imported
//!   statement lines against book entries
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage and injected numbering, account, and notification services
//!
//! ## Quick Start
//!
//! ```rust
//! use voucher_core::utils::{MemoryStorage, RecordingNotifier, SequenceNumbering, StaticAccountDirectory};
//! use voucher_core::{AccountRef, VoucherBook, VoucherBuilder, VoucherType};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), voucher_core::VoucherError> {
//! let directory = StaticAccountDirectory::new()
//!     .with_ledger_account("Cash")
//!     .with_ledger_account("Sales");
//! let mut book = VoucherBook::new(
//!     MemoryStorage::new(),
//!     Box::new(SequenceNumbering::new()),
//!     Box::new(directory),
//!     Box::new(RecordingNotifier::new()),
//! );
//!
//! let draft = VoucherBuilder::new(
//!     VoucherType::Sales,
//!     NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
//!     "Cash sale".to_string(),
//! )
//! .debit(AccountRef::LedgerAccount("Cash".to_string()), BigDecimal::from(1000))
//! .credit(AccountRef::LedgerAccount("Sales".to_string()), BigDecimal::from(1000))
//! .build()?;
//!
//! let voucher = book.create_voucher(draft).await?;
//! book.post_voucher(&voucher.voucher_number).await?;
//! # Ok(())
//! # }
//! ```

pub mod approval;
pub mod reconciliation;
pub mod recurring;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;
pub mod voucher;

// Re-export commonly used types
pub use approval::*;
pub use reconciliation::*;
pub use recurring::*;
pub use tax::gst::*;
pub use traits::*;
pub use types::*;
pub use voucher::*;
