//! Voucher templates and recurring schedules that materialize them

pub mod schedule;
pub mod template;

pub use schedule::*;
pub use template::*;
