//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The endpoint at `/ws?token=` streams [`StorefrontEvent`]s to an
//! authenticated session. Customers see their own account's events and
//! catalog changes; the administrator sees everything. Clients narrow the
//! stream with `subscribe` / `unsubscribe` topic commands.
//!
//! [`StorefrontEvent`]: crate::domain::StorefrontEvent

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
