//! Plan catalog maintenance.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{EventBus, NewPlan, Plan, PlanId, Store, StorefrontEvent};
use crate::error::StorefrontError;
use crate::persistence::Slot;

/// Lists plans for buyers and lets the administrator add or remove them.
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: Arc<Store>,
    event_bus: EventBus,
}

impl CatalogService {
    /// Creates a new `CatalogService`.
    #[must_use]
    pub fn new(store: Arc<Store>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Returns the current catalog.
    pub async fn list_plans(&self) -> Vec<Plan> {
        self.store.plans().await
    }

    /// Validates and appends a plan.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidRequest`] if validation fails, or a
    /// persistence error.
    pub async fn add_plan(&self, new_plan: NewPlan) -> Result<Plan, StorefrontError> {
        let plan = new_plan.into_plan()?;
        let plan = self
            .store
            .mutate(&[Slot::Plans], |s| {
                s.plans.push(plan.clone());
                Ok(plan)
            })
            .await?;

        let _ = self.event_bus.publish(StorefrontEvent::PlanAdded {
            plan_id: plan.id,
            name: plan.name.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(plan_id = %plan.id, name = %plan.name, credits = plan.credits, "plan added");
        Ok(plan)
    }

    /// Removes a plan. Purchase requests keep the copied plan name.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::PlanNotFound`] for an unknown id.
    pub async fn delete_plan(&self, plan_id: PlanId) -> Result<(), StorefrontError> {
        self.store
            .mutate(&[Slot::Plans], |s| {
                let before = s.plans.len();
                s.plans.retain(|p| p.id != plan_id);
                if s.plans.len() == before {
                    return Err(StorefrontError::PlanNotFound(*plan_id.as_uuid()));
                }
                Ok(())
            })
            .await?;

        let _ = self.event_bus.publish(StorefrontEvent::PlanRemoved {
            plan_id,
            timestamp: Utc::now(),
        });
        tracing::info!(%plan_id, "plan removed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;

    async fn service() -> CatalogService {
        let Ok(store) = Store::open(Arc::new(MemoryBackend::new())).await else {
            panic!("store should open");
        };
        CatalogService::new(Arc::new(store), EventBus::new(16))
    }

    #[tokio::test]
    async fn add_and_delete_plan() {
        let svc = service().await;
        let Ok(plan) = svc
            .add_plan(NewPlan {
                name: "Mega Pack".to_string(),
                credits: 1000,
                price_bdt: 1500.0,
                price_usd: 15.0,
                payment_instructions: "Send via bKash".to_string(),
            })
            .await
        else {
            panic!("valid plan should be added");
        };
        assert_eq!(svc.list_plans().await.len(), 3);

        tokio_test::assert_ok!(svc.delete_plan(plan.id).await);
        assert_eq!(svc.list_plans().await.len(), 2);
        assert!(matches!(
            svc.delete_plan(plan.id).await,
            Err(StorefrontError::PlanNotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_plan_is_not_stored() {
        let svc = service().await;
        let result = svc
            .add_plan(NewPlan {
                name: "Empty".to_string(),
                credits: 0,
                price_bdt: 0.0,
                price_usd: 0.0,
                payment_instructions: "n/a".to_string(),
            })
            .await;
        assert!(matches!(result, Err(StorefrontError::InvalidRequest(_))));
        assert_eq!(svc.list_plans().await.len(), 2);
    }
}
