//! Signup, login and session DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AccountDto;

/// Request body for `POST /auth/signup`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Secret, at least six characters by default.
    pub password: String,
}

/// Request body for `POST /auth/login` and `POST /auth/admin/login`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Secret.
    pub password: String,
}

/// Session issued to a customer.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    /// The logged-in account.
    pub account: AccountDto,
}

/// Session issued to the administrator.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminAuthResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    /// Always `"admin"`.
    pub role: String,
}
