//! Service layer: business logic orchestration.
//!
//! Each service coordinates the [`crate::domain::Store`], the
//! [`CreditLedger`] and the in-memory job board, and emits events through
//! the [`crate::domain::EventBus`].

pub mod catalog_service;
pub mod export;
pub mod generation_service;
pub mod identity_service;
pub mod image_generator;
pub mod ledger;
pub mod purchase_service;

pub use catalog_service::CatalogService;
pub use export::{ArchiveOutput, ImageDownload};
pub use generation_service::{GENERATION_COST, GenerationService, PreparedJob};
pub use identity_service::{IdentityService, IdentitySettings, Signup};
pub use image_generator::{GeminiImageGenerator, GenerationError, ImageGenerator};
pub use ledger::{CreditLedger, CreditReservation, OutstandingReservation};
pub use purchase_service::{ApprovalOutcome, PurchaseService};
