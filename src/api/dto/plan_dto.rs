//! Plan catalog DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{NewPlan, Plan};

/// A purchasable plan.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlanDto {
    /// Plan identifier.
    pub id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Credits granted on approval.
    pub credits: u64,
    /// Price in BDT.
    pub price_bdt: f64,
    /// Price in USD.
    pub price_usd: f64,
    /// Where to send payment.
    pub payment_instructions: String,
}

impl From<Plan> for PlanDto {
    fn from(plan: Plan) -> Self {
        Self {
            id: plan.id.into(),
            name: plan.name,
            credits: plan.credits,
            price_bdt: plan.price_bdt,
            price_usd: plan.price_usd,
            payment_instructions: plan.payment_instructions,
        }
    }
}

/// Request body for `POST /admin/plans`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePlanRequest {
    /// Display name.
    pub name: String,
    /// Credits granted on approval; must be positive.
    pub credits: u64,
    /// Price in BDT.
    pub price_bdt: f64,
    /// Price in USD.
    pub price_usd: f64,
    /// Where to send payment.
    pub payment_instructions: String,
}

impl From<CreatePlanRequest> for NewPlan {
    fn from(req: CreatePlanRequest) -> Self {
        Self {
            name: req.name,
            credits: req.credits,
            price_bdt: req.price_bdt,
            price_usd: req.price_usd,
            payment_instructions: req.payment_instructions,
        }
    }
}
