//! Signup, login, logout and current-account handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{AccountDto, AdminAuthResponse, AuthResponse, LoginRequest, SignupRequest};
use crate::api::extract::AuthSession;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, StorefrontError};
use crate::service::Signup;

/// `POST /auth/signup` — Create an account and log in.
///
/// # Errors
///
/// Returns [`StorefrontError::InvalidRequest`] on validation failure and
/// [`StorefrontError::EmailTaken`] for a registered email.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "Auth",
    summary = "Sign up",
    description = "Creates an account with the signup bonus credits and returns a session token.",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, StorefrontError> {
    let (account, session) = state
        .identity
        .signup(Signup {
            name: req.name,
            email: req.email,
            secret: req.password,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: session.token.as_str().to_string(),
            account: AccountDto::from(account),
        }),
    ))
}

/// `POST /auth/login` — Log in to an existing account.
///
/// # Errors
///
/// Returns [`StorefrontError::InvalidCredentials`] or
/// [`StorefrontError::AccountBanned`].
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    summary = "Log in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account banned", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StorefrontError> {
    let (account, session) = state.identity.login(&req.email, &req.password).await?;
    Ok(Json(AuthResponse {
        token: session.token.as_str().to_string(),
        account: AccountDto::from(account),
    }))
}

/// `POST /auth/admin/login` — Log in as the administrator.
///
/// # Errors
///
/// Returns [`StorefrontError::InvalidCredentials`].
#[utoipa::path(
    post,
    path = "/api/v1/auth/admin/login",
    tag = "Auth",
    summary = "Administrator login",
    description = "Checks the configured administrator credential. Disabled when no administrator is configured.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AdminAuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    )
)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StorefrontError> {
    let session = state.identity.admin_login(&req.email, &req.password).await?;
    Ok(Json(AdminAuthResponse {
        token: session.token.as_str().to_string(),
        role: "admin".to_string(),
    }))
}

/// `POST /auth/logout` — End the current session.
///
/// # Errors
///
/// Returns [`StorefrontError::Unauthorized`] without a valid session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    summary = "Log out",
    description = "Closes the session and discards its generation history.",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Logged out"),
        (status = 401, description = "No session", body = ErrorResponse),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<impl IntoResponse, StorefrontError> {
    state.identity.logout(&session.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /me` — Current account with balance.
///
/// # Errors
///
/// Returns [`StorefrontError::Forbidden`] for administrator sessions.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Auth",
    summary = "Current account",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account details", body = AccountDto),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 403, description = "Administrator session", body = ErrorResponse),
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<impl IntoResponse, StorefrontError> {
    let account = state.identity.account_of(&session).await?;
    Ok(Json(AccountDto::from(account)))
}

/// Authentication routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/admin/login", post(admin_login))
        .route("/auth/logout", post(logout))
        .route("/me", get(me))
}
