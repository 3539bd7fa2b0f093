//! Multi-level approval workflow attached to vouchers
//!
//! Approval records are created lazily: only level 1 exists at workflow
//! creation, and each subsequent level materializes when the prior level is
//! approved. A rejection at any level halts the chain. Approval never posts
//! the voucher; posting remains a separate operation gated by the caller.

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::VoucherStorage;
use crate::types::*;

/// One level in a template's approval chain definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalLevelDef {
    /// 1-based level number
    pub level: u32,
    pub approver_id: String,
    pub approver_role: String,
    /// Amount cap this approver is expected to sign off on, if any
    pub max_amount: Option<BigDecimal>,
}

/// Status of a single approval record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
    Delegated,
}

/// One approval record per level per voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherApproval {
    pub id: Uuid,
    pub voucher_number: String,
    pub approval_level: u32,
    pub max_approval_level: u32,
    /// Designated approver; only this user or their current delegate may act
    pub approver_id: String,
    pub approver_role: String,
    pub status: ApprovalState,
    pub delegated_to: Option<String>,
    pub delegation_reason: Option<String>,
    pub comments: Option<String>,
    /// Informational: whether the voucher total fits this approver's cap
    pub can_approve_amount: bool,
    pub action_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl VoucherApproval {
    fn new(
        voucher: &Voucher,
        def: &ApprovalLevelDef,
        max_approval_level: u32,
    ) -> Self {
        let can_approve_amount = match &def.max_amount {
            Some(cap) => voucher.total_debit <= *cap,
            None => true,
        };
        Self {
            id: Uuid::new_v4(),
            voucher_number: voucher.voucher_number.clone(),
            approval_level: def.level,
            max_approval_level,
            approver_id: def.approver_id.clone(),
            approver_role: def.approver_role.clone(),
            status: ApprovalState::Pending,
            delegated_to: None,
            delegation_reason: None,
            comments: None,
            can_approve_amount,
            action_date: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Whether the given user may approve or reject this record
    fn authorizes(&self, user_id: &str) -> bool {
        self.approver_id == user_id || self.delegated_to.as_deref() == Some(user_id)
    }

    fn is_actionable(&self) -> bool {
        matches!(self.status, ApprovalState::Pending | ApprovalState::Delegated)
    }
}

/// Approval manager advancing voucher approval chains
pub struct ApprovalManager<S: VoucherStorage> {
    storage: S,
}

impl<S: VoucherStorage> ApprovalManager<S> {
    /// Create a new approval manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    async fn get_voucher_required(&self, voucher_number: &str) -> VoucherResult<Voucher> {
        self.storage
            .get_voucher(voucher_number)
            .await?
            .ok_or_else(|| VoucherError::VoucherNotFound(voucher_number.to_string()))
    }

    async fn get_approval_required(&self, approval_id: Uuid) -> VoucherResult<VoucherApproval> {
        self.storage
            .get_approval(approval_id)
            .await?
            .ok_or_else(|| VoucherError::ApprovalNotFound(approval_id.to_string()))
    }

    /// Start an approval workflow for a voucher
    ///
    /// Creates only the level-1 record; later levels are created as prior
    /// levels are approved.
    pub async fn create_workflow(
        &mut self,
        voucher_number: &str,
        levels: &[ApprovalLevelDef],
    ) -> VoucherResult<VoucherApproval> {
        if levels.is_empty() {
            return Err(VoucherError::Validation(
                "Approval workflow requires at least one level".to_string(),
            ));
        }

        let mut voucher = self.get_voucher_required(voucher_number).await?;

        let first = levels
            .iter()
            .find(|def| def.level == 1)
            .ok_or_else(|| VoucherError::Validation("Approval level 1 is not defined".to_string()))?;

        let max_level = levels.len() as u32;
        let record = VoucherApproval::new(&voucher, first, max_level);

        voucher.approval_status = ApprovalStatus::Pending;
        voucher.approval_level = 1;
        voucher.max_approval_level = max_level;
        voucher.updated_at = chrono::Utc::now().naive_utc();

        self.storage.save_approval(&record).await?;
        self.storage.update_voucher(&voucher).await?;

        Ok(record)
    }

    /// Approve one level of a voucher's chain
    ///
    /// On the final level the voucher's approval status becomes approved;
    /// otherwise the next level's record is created from the originating
    /// template's definitions and the voucher's level advances.
    pub async fn approve(
        &mut self,
        approval_id: Uuid,
        approver_id: &str,
        comments: Option<String>,
    ) -> VoucherResult<Voucher> {
        let mut record = self.get_approval_required(approval_id).await?;

        if !record.authorizes(approver_id) {
            return Err(VoucherError::UnauthorizedApprover(approver_id.to_string()));
        }
        if !record.is_actionable() {
            return Err(VoucherError::Validation(format!(
                "Approval record for level {} has already been actioned",
                record.approval_level
            )));
        }

        let now = chrono::Utc::now().naive_utc();
        record.status = ApprovalState::Approved;
        record.comments = comments;
        record.action_date = Some(now);
        self.storage.update_approval(&record).await?;

        let mut voucher = self.get_voucher_required(&record.voucher_number).await?;

        if record.approval_level >= record.max_approval_level {
            voucher.approval_status = ApprovalStatus::Approved;
            voucher.approved_date = Some(now);
            voucher.final_approver_id = Some(approver_id.to_string());
        } else {
            let next_level = record.approval_level + 1;
            let template_id = voucher.template_id.ok_or_else(|| {
                VoucherError::Validation(format!(
                    "Voucher {} has no originating template to define approval level {}",
                    voucher.voucher_number, next_level
                ))
            })?;
            let template = self
                .storage
                .get_template(template_id)
                .await?
                .ok_or_else(|| VoucherError::TemplateNotFound(template_id.to_string()))?;
            let def = template
                .approval_levels
                .iter()
                .find(|def| def.level == next_level)
                .ok_or_else(|| {
                    VoucherError::Validation(format!(
                        "Approval level {} is not defined on template {}",
                        next_level, template.name
                    ))
                })?;

            let next_record = VoucherApproval::new(&voucher, def, record.max_approval_level);
            self.storage.save_approval(&next_record).await?;

            voucher.approval_level = next_level;
        }

        voucher.updated_at = now;
        self.storage.update_voucher(&voucher).await?;
        self.get_voucher_required(&record.voucher_number).await
    }

    /// Reject a voucher at the current level, halting the chain
    pub async fn reject(
        &mut self,
        approval_id: Uuid,
        approver_id: &str,
        comments: Option<String>,
    ) -> VoucherResult<Voucher> {
        let mut record = self.get_approval_required(approval_id).await?;

        if !record.authorizes(approver_id) {
            return Err(VoucherError::UnauthorizedApprover(approver_id.to_string()));
        }
        if !record.is_actionable() {
            return Err(VoucherError::Validation(format!(
                "Approval record for level {} has already been actioned",
                record.approval_level
            )));
        }

        let now = chrono::Utc::now().naive_utc();
        record.status = ApprovalState::Rejected;
        record.comments = comments.clone();
        record.action_date = Some(now);
        self.storage.update_approval(&record).await?;

        let mut voucher = self.get_voucher_required(&record.voucher_number).await?;
        voucher.approval_status = ApprovalStatus::Rejected;
        voucher.rejected_date = Some(now);
        voucher.rejected_by = Some(approver_id.to_string());
        voucher.rejection_reason = comments;
        voucher.updated_at = now;
        self.storage.update_voucher(&voucher).await?;

        self.get_voucher_required(&record.voucher_number).await
    }

    /// Delegate an approval to another user
    ///
    /// Only the original designated approver may delegate; a prior delegate
    /// cannot pass the approval along.
    pub async fn delegate(
        &mut self,
        approval_id: Uuid,
        approver_id: &str,
        delegate_to: &str,
        reason: Option<String>,
    ) -> VoucherResult<VoucherApproval> {
        let mut record = self.get_approval_required(approval_id).await?;

        if record.approver_id != approver_id {
            return Err(VoucherError::UnauthorizedApprover(approver_id.to_string()));
        }
        if !record.is_actionable() {
            return Err(VoucherError::Validation(format!(
                "Approval record for level {} has already been actioned",
                record.approval_level
            )));
        }

        record.status = ApprovalState::Delegated;
        record.delegated_to = Some(delegate_to.to_string());
        record.delegation_reason = reason;
        record.action_date = Some(chrono::Utc::now().naive_utc());
        self.storage.update_approval(&record).await?;

        Ok(record)
    }

    /// Mark a voucher approved without a workflow, used by the recurring
    /// scheduler's auto-approval path
    pub async fn auto_approve(
        &mut self,
        voucher_number: &str,
        approver_id: &str,
    ) -> VoucherResult<Voucher> {
        let mut voucher = self.get_voucher_required(voucher_number).await?;
        let now = chrono::Utc::now().naive_utc();
        voucher.approval_status = ApprovalStatus::Approved;
        voucher.approved_date = Some(now);
        voucher.final_approver_id = Some(approver_id.to_string());
        voucher.updated_at = now;
        self.storage.update_voucher(&voucher).await?;
        self.get_voucher_required(voucher_number).await
    }

    /// Approval records for a voucher, in level order
    pub async fn approvals_for(
        &self,
        voucher_number: &str,
    ) -> VoucherResult<Vec<VoucherApproval>> {
        self.storage.voucher_approvals(voucher_number).await
    }
}
