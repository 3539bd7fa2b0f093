//! GST (Goods and Services Tax) calculations for Indian tax compliance

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{VoucherError, VoucherResult};

/// GST rate structure for Indian taxation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstRate {
    /// Total GST rate percentage (e.g., 18.0 for 18%)
    pub total_rate: BigDecimal,
    /// CGST rate percentage (Central GST)
    pub cgst_rate: BigDecimal,
    /// SGST rate percentage (State GST)
    pub sgst_rate: BigDecimal,
    /// IGST rate percentage (Integrated GST)
    pub igst_rate: BigDecimal,
}

impl GstRate {
    /// Create a new GST rate with intra-state rates (CGST + SGST)
    pub fn intra_state(total_rate: BigDecimal) -> Self {
        let half_rate = &total_rate / BigDecimal::from(2);
        Self {
            total_rate,
            cgst_rate: half_rate.clone(),
            sgst_rate: half_rate,
            igst_rate: BigDecimal::from(0),
        }
    }

    /// Create a new GST rate with inter-state rates (IGST)
    pub fn inter_state(total_rate: BigDecimal) -> Self {
        Self {
            total_rate: total_rate.clone(),
            cgst_rate: BigDecimal::from(0),
            sgst_rate: BigDecimal::from(0),
            igst_rate: total_rate,
        }
    }

    /// Validate that the GST rate structure is correct
    pub fn validate(&self) -> VoucherResult<()> {
        let calculated_total = &self.cgst_rate + &self.sgst_rate + &self.igst_rate;

        if calculated_total != self.total_rate {
            return Err(VoucherError::Validation(format!(
                "GST components don't add up to total rate: {} != {}",
                calculated_total, self.total_rate
            )));
        }

        // For intra-state transactions, CGST and SGST must be equal
        if self.igst_rate == BigDecimal::from(0) && self.cgst_rate != self.sgst_rate {
            return Err(VoucherError::Validation(
                "CGST and SGST rates must be equal for intra-state transactions".to_string(),
            ));
        }

        // For inter-state transactions, only IGST applies
        if self.igst_rate > BigDecimal::from(0)
            && (self.cgst_rate > BigDecimal::from(0) || self.sgst_rate > BigDecimal::from(0))
        {
            return Err(VoucherError::Validation(
                "Only IGST should be applicable for inter-state transactions".to_string(),
            ));
        }

        Ok(())
    }
}

/// GST amount for a base amount and percentage rate
pub fn gst_on(base_amount: &BigDecimal, rate: &BigDecimal) -> BigDecimal {
    (base_amount * rate) / BigDecimal::from(100)
}

/// Detailed GST breakdown for a voucher line amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstBreakup {
    /// Base amount (before GST)
    pub base_amount: BigDecimal,
    pub cgst_amount: BigDecimal,
    pub sgst_amount: BigDecimal,
    pub igst_amount: BigDecimal,
    /// Total GST amount (CGST + SGST + IGST)
    pub total_gst_amount: BigDecimal,
    /// Total amount including GST
    pub total_amount: BigDecimal,
}

impl GstBreakup {
    /// Calculate GST amounts from a base amount and GST rate
    pub fn calculate(base_amount: BigDecimal, gst_rate: &GstRate) -> VoucherResult<Self> {
        gst_rate.validate()?;

        let cgst_amount = gst_on(&base_amount, &gst_rate.cgst_rate);
        let sgst_amount = gst_on(&base_amount, &gst_rate.sgst_rate);
        let igst_amount = gst_on(&base_amount, &gst_rate.igst_rate);

        let total_gst_amount = &cgst_amount + &sgst_amount + &igst_amount;
        let total_amount = &base_amount + &total_gst_amount;

        Ok(Self {
            base_amount,
            cgst_amount,
            sgst_amount,
            igst_amount,
            total_gst_amount,
            total_amount,
        })
    }

    /// Calculate the base amount from a GST-inclusive total (reverse calculation)
    pub fn reverse_calculate(total_amount: BigDecimal, gst_rate: &GstRate) -> VoucherResult<Self> {
        gst_rate.validate()?;

        let divisor = BigDecimal::from(100) + &gst_rate.total_rate;
        let base_amount = (&total_amount * BigDecimal::from(100)) / divisor;

        Self::calculate(base_amount, gst_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gst_rate_intra_state() {
        let rate = GstRate::intra_state(BigDecimal::from(18));
        assert_eq!(rate.total_rate, BigDecimal::from(18));
        assert_eq!(rate.cgst_rate, BigDecimal::from(9));
        assert_eq!(rate.sgst_rate, BigDecimal::from(9));
        assert_eq!(rate.igst_rate, BigDecimal::from(0));
        assert!(rate.validate().is_ok());
    }

    #[test]
    fn test_gst_rate_inter_state() {
        let rate = GstRate::inter_state(BigDecimal::from(18));
        assert_eq!(rate.total_rate, BigDecimal::from(18));
        assert_eq!(rate.igst_rate, BigDecimal::from(18));
        assert!(rate.validate().is_ok());
    }

    #[test]
    fn test_gst_breakup() {
        let rate = GstRate::intra_state(BigDecimal::from(18));
        let breakup = GstBreakup::calculate(BigDecimal::from(1000), &rate).unwrap();

        assert_eq!(breakup.cgst_amount, BigDecimal::from(90));
        assert_eq!(breakup.sgst_amount, BigDecimal::from(90));
        assert_eq!(breakup.total_gst_amount, BigDecimal::from(180));
        assert_eq!(breakup.total_amount, BigDecimal::from(1180));
    }

    #[test]
    fn test_gst_reverse_calculation() {
        let rate = GstRate::intra_state(BigDecimal::from(18));
        let breakup = GstBreakup::reverse_calculate(BigDecimal::from(1180), &rate).unwrap();

        assert_eq!(breakup.base_amount, BigDecimal::from(1000));
        assert_eq!(breakup.total_gst_amount, BigDecimal::from(180));
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let rate = GstRate {
            total_rate: BigDecimal::from(18),
            cgst_rate: BigDecimal::from(9),
            sgst_rate: BigDecimal::from(6),
            igst_rate: BigDecimal::from(0),
        };
        assert!(rate.validate().is_err());
    }
}
