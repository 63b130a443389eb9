//! Domain layer: entities, the persisted store, the job board and the
//! event system.
//!
//! Accounts, plans, purchase requests and sessions are persisted through
//! the [`Store`]; generation jobs live only in the in-memory [`JobBoard`].
//! Every state change is announced on the [`EventBus`].

pub mod account;
pub mod artifact;
pub mod event_bus;
pub mod ids;
pub mod job;
pub mod job_board;
pub mod plan;
pub mod purchase;
pub mod session;
pub mod store;
pub mod store_event;

pub use account::{Account, SecretHash};
pub use artifact::{ArtifactDecodeError, DecodedImage, DownloadQuality, ImageArtifact};
pub use event_bus::EventBus;
pub use ids::{AccountId, JobId, PlanId, PurchaseId, SessionToken};
pub use job::{AspectRatio, GenerationJob, JobStatus};
pub use job_board::{JobBoard, JobOutcome};
pub use plan::{NewPlan, Plan};
pub use purchase::{PurchaseRequest, PurchaseStatus};
pub use session::{Principal, Session};
pub use store::{Store, StoreState};
pub use store_event::{CreditChangeReason, EventTopic, StorefrontEvent};
