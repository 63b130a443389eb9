//! # stockpic-storefront
//!
//! REST API and WebSocket storefront for credit-metered text-to-image
//! generation.
//!
//! Customers sign up with a credit bonus, spend one credit per generated
//! image, download single images or a zip of their session's gallery, and
//! buy credit plans through purchase requests that an administrator
//! approves. Image synthesis is delegated to a remote API; this service is
//! the accounting and coordination layer around it.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── Identity / Catalog / Purchase / Generation services (service/)
//!     ├── CreditLedger (service/)
//!     ├── ImageGenerator ──► remote text-to-image API
//!     ├── EventBus (domain/)
//!     │
//!     ├── Store + JobBoard (domain/)
//!     │
//!     └── Snapshot persistence: JSON files │ PostgreSQL │ memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
