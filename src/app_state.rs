//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::{EventBus, JobBoard, Store};
use crate::service::{
    CatalogService, CreditLedger, GenerationService, IdentityService, IdentitySettings,
    ImageGenerator, PurchaseService,
};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Signup, login and account moderation.
    pub identity: Arc<IdentityService>,
    /// Plan catalog.
    pub catalog: Arc<CatalogService>,
    /// Purchase workflow.
    pub purchases: Arc<PurchaseService>,
    /// Generation orchestrator and export.
    pub generations: Arc<GenerationService>,
    /// Credit ledger, kept for shutdown reporting.
    pub ledger: CreditLedger,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires every service over one store, job board and event bus.
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        generator: Arc<dyn ImageGenerator>,
        settings: IdentitySettings,
        event_bus: EventBus,
    ) -> Self {
        let jobs = Arc::new(JobBoard::new());
        let ledger = CreditLedger::new(Arc::clone(&store), event_bus.clone());

        let identity = Arc::new(IdentityService::new(
            Arc::clone(&store),
            Arc::clone(&jobs),
            event_bus.clone(),
            settings,
        ));
        let catalog = Arc::new(CatalogService::new(Arc::clone(&store), event_bus.clone()));
        let purchases = Arc::new(PurchaseService::new(
            Arc::clone(&store),
            ledger.clone(),
            event_bus.clone(),
        ));
        let generations = Arc::new(GenerationService::new(
            store,
            ledger.clone(),
            jobs,
            generator,
            event_bus.clone(),
        ));

        Self {
            identity,
            catalog,
            purchases,
            generations,
            ledger,
            event_bus,
        }
    }
}
