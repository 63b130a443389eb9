//! Data Transfer Objects for REST request/response serialization.
//!
//! Entity ids are exposed as plain UUIDs; secret hashes never leave the
//! domain layer.

pub mod account_dto;
pub mod auth_dto;
pub mod common_dto;
pub mod generation_dto;
pub mod plan_dto;
pub mod purchase_dto;

pub use account_dto::*;
pub use auth_dto::*;
pub use common_dto::*;
pub use generation_dto::*;
pub use plan_dto::*;
pub use purchase_dto::*;
