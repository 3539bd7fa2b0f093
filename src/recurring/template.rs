//! Reusable voucher blueprints with variable line amounts

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::approval::ApprovalLevelDef;
use crate::tax::gst::gst_on;
use crate::traits::VoucherStorage;
use crate::types::*;

/// One line of a template
///
/// Lines flagged `is_variable` take their amount from a
/// `"<account_name>_amount"` variable at materialization time; the override
/// lands on whichever side was nonzero on the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItem {
    pub account: AccountRef,
    pub account_name: String,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub gst_rate: Option<BigDecimal>,
    pub is_variable: bool,
    pub narration: Option<String>,
}

impl TemplateItem {
    /// Fixed-amount debit line
    pub fn debit(account: AccountRef, account_name: String, amount: BigDecimal) -> Self {
        Self {
            account,
            account_name,
            debit_amount: amount,
            credit_amount: BigDecimal::from(0),
            gst_rate: None,
            is_variable: false,
            narration: None,
        }
    }

    /// Fixed-amount credit line
    pub fn credit(account: AccountRef, account_name: String, amount: BigDecimal) -> Self {
        Self {
            account,
            account_name,
            debit_amount: BigDecimal::from(0),
            credit_amount: amount,
            gst_rate: None,
            is_variable: false,
            narration: None,
        }
    }

    /// Mark this line's amount as supplied at materialization time
    pub fn variable(mut self) -> Self {
        self.is_variable = true;
        self
    }
}

/// Reusable blueprint for vouchers of one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub voucher_type: VoucherType,
    pub items: Vec<TemplateItem>,
    /// Approval chain definition applied to materialized vouchers
    pub approval_levels: Vec<ApprovalLevelDef>,
    pub requires_approval: bool,
    pub is_active: bool,
    pub usage_count: u64,
    pub last_used: Option<NaiveDateTime>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

impl VoucherTemplate {
    /// Create a new active template
    pub fn new(
        name: String,
        voucher_type: VoucherType,
        items: Vec<TemplateItem>,
        created_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            voucher_type,
            items,
            approval_levels: Vec::new(),
            requires_approval: false,
            is_active: true,
            usage_count: 0,
            last_used: None,
            created_by,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Build voucher items from the template, applying variable overrides
    ///
    /// A variable line named `Rent Expense` looks up `"Rent Expense_amount"`
    /// in the variables bag; a present value replaces the nonzero side of
    /// the line and the GST amount is recomputed from the new base.
    pub fn materialize_items(
        &self,
        variables: &HashMap<String, String>,
    ) -> VoucherResult<Vec<VoucherItem>> {
        let mut items = Vec::with_capacity(self.items.len());

        for line in &self.items {
            let mut debit = line.debit_amount.clone();
            let mut credit = line.credit_amount.clone();

            if line.is_variable {
                let key = format!("{}_amount", line.account_name);
                if let Some(raw) = variables.get(&key) {
                    let amount = BigDecimal::from_str(raw).map_err(|_| {
                        VoucherError::Validation(format!(
                            "Variable '{}' is not a valid amount: {}",
                            key, raw
                        ))
                    })?;
                    if line.debit_amount > BigDecimal::from(0) {
                        debit = amount;
                    } else {
                        credit = amount;
                    }
                }
            }

            let mut item = VoucherItem::new(line.account.clone(), debit, credit);
            item.account_name = line.account_name.clone();
            item.narration = line.narration.clone();
            if let Some(rate) = &line.gst_rate {
                item.gst_amount = gst_on(item.base_amount(), rate);
                item.gst_rate = rate.clone();
            }
            items.push(item);
        }

        Ok(items)
    }
}

/// Template manager for blueprint CRUD and usage bookkeeping
pub struct TemplateManager<S: VoucherStorage> {
    storage: S,
}

impl<S: VoucherStorage> TemplateManager<S> {
    /// Create a new template manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Save a new template
    pub async fn create_template(&mut self, template: VoucherTemplate) -> VoucherResult<VoucherTemplate> {
        self.storage.save_template(&template).await?;
        Ok(template)
    }

    /// Get a template by id, failing if unknown
    pub async fn get_template_required(&self, template_id: Uuid) -> VoucherResult<VoucherTemplate> {
        self.storage
            .get_template(template_id)
            .await?
            .ok_or_else(|| VoucherError::TemplateNotFound(template_id.to_string()))
    }

    /// Deactivate a template so it can no longer be materialized
    pub async fn deactivate(&mut self, template_id: Uuid) -> VoucherResult<VoucherTemplate> {
        let mut template = self.get_template_required(template_id).await?;
        template.is_active = false;
        self.storage.update_template(&template).await?;
        Ok(template)
    }

    /// Record one use of a template
    pub async fn record_use(&mut self, template_id: Uuid) -> VoucherResult<()> {
        let mut template = self.get_template_required(template_id).await?;
        template.usage_count += 1;
        template.last_used = Some(chrono::Utc::now().naive_utc());
        self.storage.update_template(&template).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rent_template() -> VoucherTemplate {
        VoucherTemplate::new(
            "Monthly Rent".to_string(),
            VoucherType::Payment,
            vec![
                TemplateItem::debit(
                    AccountRef::LedgerAccount("Rent Expense".to_string()),
                    "Rent Expense".to_string(),
                    BigDecimal::from(10000),
                )
                .variable(),
                TemplateItem::credit(
                    AccountRef::LedgerAccount("Bank".to_string()),
                    "Bank".to_string(),
                    BigDecimal::from(10000),
                )
                .variable(),
            ],
            "admin".to_string(),
        )
    }

    #[test]
    fn test_variable_override_lands_on_nonzero_side() {
        let template = rent_template();
        let mut variables = HashMap::new();
        variables.insert("Rent Expense_amount".to_string(), "12500".to_string());
        variables.insert("Bank_amount".to_string(), "12500".to_string());

        let items = template.materialize_items(&variables).unwrap();
        assert_eq!(items[0].debit_amount, BigDecimal::from(12500));
        assert_eq!(items[0].credit_amount, BigDecimal::from(0));
        assert_eq!(items[1].credit_amount, BigDecimal::from(12500));
    }

    #[test]
    fn test_missing_variable_keeps_template_amount() {
        let template = rent_template();
        let items = template.materialize_items(&HashMap::new()).unwrap();
        assert_eq!(items[0].debit_amount, BigDecimal::from(10000));
    }

    #[test]
    fn test_bad_variable_value_is_a_validation_error() {
        let template = rent_template();
        let mut variables = HashMap::new();
        variables.insert("Rent Expense_amount".to_string(), "lots".to_string());

        let err = template.materialize_items(&variables).unwrap_err();
        assert!(matches!(err, VoucherError::Validation(_)));
    }

    #[test]
    fn test_gst_recomputed_from_override() {
        let mut template = rent_template();
        template.items[0].gst_rate = Some(BigDecimal::from(18));

        let mut variables = HashMap::new();
        variables.insert("Rent Expense_amount".to_string(), "2000".to_string());

        let items = template.materialize_items(&variables).unwrap();
        assert_eq!(items[0].gst_amount, BigDecimal::from(360));
    }
}
