//! Purchase request DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{PurchaseRequest, PurchaseStatus};

/// Request body for `POST /purchases`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitPurchaseRequest {
    /// Plan being bought.
    pub plan_id: uuid::Uuid,
    /// Reference of the out-of-band payment.
    pub transaction_ref: String,
}

/// A purchase request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseDto {
    /// Request identifier.
    pub id: uuid::Uuid,
    /// Buyer account.
    pub account_id: uuid::Uuid,
    /// Buyer name at submission.
    pub account_name: String,
    /// Plan bought.
    pub plan_id: uuid::Uuid,
    /// Plan name at submission.
    pub plan_name: String,
    /// Payment reference supplied by the buyer.
    pub transaction_ref: String,
    /// `pending` or `approved`.
    pub status: PurchaseStatus,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Approval timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl From<PurchaseRequest> for PurchaseDto {
    fn from(request: PurchaseRequest) -> Self {
        Self {
            id: request.id.into(),
            account_id: request.account_id.into(),
            account_name: request.account_name,
            plan_id: request.plan_id.into(),
            plan_name: request.plan_name,
            transaction_ref: request.transaction_ref,
            status: request.status,
            created_at: request.created_at,
            approved_at: request.approved_at,
        }
    }
}

/// `?status=` filter for the admin purchase queue.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PurchaseFilter {
    /// Only return requests in this status.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub status: Option<PurchaseStatus>,
}

/// Response of `POST /admin/purchases/{id}/approve`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApprovalResponse {
    /// `approved`, `already_approved` or `plan_not_found`.
    pub outcome: String,
    /// The request after the call.
    pub purchase: PurchaseDto,
    /// Credits granted by this call.
    pub credits_granted: u64,
}
