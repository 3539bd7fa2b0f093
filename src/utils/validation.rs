//! Validation utilities

use bigdecimal::BigDecimal;
use std::collections::HashSet;

use crate::traits::VoucherValidator;
use crate::types::*;

/// Validate that a narration is present and within length limits
pub fn validate_narration(narration: &str) -> VoucherResult<()> {
    if narration.trim().is_empty() {
        return Err(VoucherError::Validation(
            "Narration cannot be empty".to_string(),
        ));
    }

    if narration.len() > 500 {
        return Err(VoucherError::Validation(
            "Narration cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a reference number is within length limits
pub fn validate_reference_number(reference: &str) -> VoucherResult<()> {
    if reference.len() > 50 {
        return Err(VoucherError::Validation(
            "Reference number cannot exceed 50 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that an amount is not negative
pub fn validate_non_negative(amount: &BigDecimal) -> VoucherResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(VoucherError::Validation(
            "Amount cannot be negative".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Enhanced voucher validator with detailed checks
///
/// Beyond the structural rules it requires every line to carry an amount and
/// rejects the same account appearing twice on the same side.
pub struct EnhancedVoucherValidator;

impl VoucherValidator for EnhancedVoucherValidator {
    fn validate_voucher(&self, voucher: &Voucher) -> VoucherResult<()> {
        voucher.validate()?;
        validate_narration(&voucher.narration)?;
        if let Some(reference) = &voucher.reference_number {
            validate_reference_number(reference)?;
        }

        let zero = BigDecimal::from(0);
        let mut seen = HashSet::new();
        for item in &voucher.items {
            validate_non_negative(&item.debit_amount)?;
            validate_non_negative(&item.credit_amount)?;

            if item.debit_amount == zero && item.credit_amount == zero {
                return Err(VoucherError::Validation(format!(
                    "Item for account '{}' has neither a debit nor a credit amount",
                    item.account.id()
                )));
            }

            if item.debit_amount > zero && !seen.insert((item.account.clone(), true)) {
                return Err(VoucherError::Validation(format!(
                    "Account '{}' appears multiple times on the debit side",
                    item.account.id()
                )));
            }
            if item.credit_amount > zero && !seen.insert((item.account.clone(), false)) {
                return Err(VoucherError::Validation(format!(
                    "Account '{}' appears multiple times on the credit side",
                    item.account.id()
                )));
            }
        }

        Ok(())
    }
}
