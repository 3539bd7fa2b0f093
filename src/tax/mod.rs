//! Tax helpers for GST and TDS amounts on voucher lines
//!
//! Rate tables are reference data owned by the caller; this module only
//! computes amounts from supplied rates.

pub mod gst;

pub use gst::*;

use bigdecimal::BigDecimal;

/// TDS (Tax Deducted at Source) amount for a base amount and percentage rate
pub fn tds_on(base_amount: &BigDecimal, rate: &BigDecimal) -> BigDecimal {
    (base_amount * rate) / BigDecimal::from(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tds_on() {
        let tds = tds_on(&BigDecimal::from(50000), &BigDecimal::from(10));
        assert_eq!(tds, BigDecimal::from(5000));
    }
}
