//! Credit plans offered for manual purchase.

use serde::{Deserialize, Serialize};

use super::PlanId;
use crate::error::StorefrontError;

/// A purchasable credit bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique plan identifier.
    pub id: PlanId,
    /// Display name.
    pub name: String,
    /// Credits granted when a purchase of this plan is approved.
    pub credits: u64,
    /// List price in Bangladeshi taka.
    pub price_bdt: f64,
    /// List price in US dollars.
    pub price_usd: f64,
    /// Free-text instructions telling the buyer where to send payment.
    pub payment_instructions: String,
}

/// Fields supplied by the administrator when adding a plan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPlan {
    /// Display name.
    pub name: String,
    /// Credit grant; must be positive.
    pub credits: u64,
    /// List price in Bangladeshi taka.
    pub price_bdt: f64,
    /// List price in US dollars.
    pub price_usd: f64,
    /// Payment instructions; must be non-empty.
    pub payment_instructions: String,
}

impl NewPlan {
    /// Validates the fields and assigns a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidRequest`] if the name or
    /// instructions are blank, the credit grant is zero, or a price is
    /// negative or not finite.
    pub fn into_plan(self) -> Result<Plan, StorefrontError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StorefrontError::InvalidRequest(
                "plan name must not be empty".to_string(),
            ));
        }
        if self.credits == 0 {
            return Err(StorefrontError::InvalidRequest(
                "plan credits must be positive".to_string(),
            ));
        }
        for (label, price) in [("price_bdt", self.price_bdt), ("price_usd", self.price_usd)] {
            if !price.is_finite() || price < 0.0 {
                return Err(StorefrontError::InvalidRequest(format!(
                    "{label} must be a non-negative number"
                )));
            }
        }
        let instructions = self.payment_instructions.trim();
        if instructions.is_empty() {
            return Err(StorefrontError::InvalidRequest(
                "payment instructions must not be empty".to_string(),
            ));
        }
        Ok(Plan {
            id: PlanId::new(),
            name: name.to_string(),
            credits: self.credits,
            price_bdt: self.price_bdt,
            price_usd: self.price_usd,
            payment_instructions: instructions.to_string(),
        })
    }
}

/// Plans seeded into an empty plans slot.
#[must_use]
pub fn default_plans() -> Vec<Plan> {
    vec![
        Plan {
            id: PlanId::new(),
            name: "Starter Pack".to_string(),
            credits: 100,
            price_bdt: 200.0,
            price_usd: 2.0,
            payment_instructions: "Send 200 BDT or 2 USD to bKash number 01234567890 with your email as reference.".to_string(),
        },
        Plan {
            id: PlanId::new(),
            name: "Pro Pack".to_string(),
            credits: 500,
            price_bdt: 800.0,
            price_usd: 8.0,
            payment_instructions: "Send 800 BDT or 8 USD to bKash number 01234567890 with your email as reference.".to_string(),
        },
    ]
}
