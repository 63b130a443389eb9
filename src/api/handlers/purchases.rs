//! Buyer-side purchase handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{PurchaseDto, SubmitPurchaseRequest};
use crate::api::extract::AuthSession;
use crate::app_state::AppState;
use crate::domain::PlanId;
use crate::error::{ErrorResponse, StorefrontError};

/// `POST /purchases` — Claim a plan payment.
///
/// # Errors
///
/// Returns [`StorefrontError::PlanNotFound`], or
/// [`StorefrontError::InvalidRequest`] for a blank transaction reference.
#[utoipa::path(
    post,
    path = "/api/v1/purchases",
    tag = "Purchases",
    summary = "Submit a purchase",
    description = "Records a pending claim that the caller paid for a plan. Credits are granted when the administrator approves it.",
    request_body = SubmitPurchaseRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Request recorded", body = PurchaseDto),
        (status = 400, description = "Blank transaction reference", body = ErrorResponse),
        (status = 404, description = "Plan not found", body = ErrorResponse),
    )
)]
pub async fn submit_purchase(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(req): Json<SubmitPurchaseRequest>,
) -> Result<impl IntoResponse, StorefrontError> {
    let account = state.identity.account_of(&session).await?;
    let request = state
        .purchases
        .submit(account.id, PlanId::from_uuid(req.plan_id), &req.transaction_ref)
        .await?;
    Ok((StatusCode::CREATED, Json(PurchaseDto::from(request))))
}

/// `GET /purchases` — The caller's requests, newest first.
///
/// # Errors
///
/// Returns [`StorefrontError::Forbidden`] for administrator sessions.
#[utoipa::path(
    get,
    path = "/api/v1/purchases",
    tag = "Purchases",
    summary = "List own purchases",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Purchase requests", body = Vec<PurchaseDto>),
    )
)]
pub async fn list_own_purchases(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<impl IntoResponse, StorefrontError> {
    let account = state.identity.account_of(&session).await?;
    let requests: Vec<PurchaseDto> = state
        .purchases
        .list_for(account.id)
        .await
        .into_iter()
        .map(PurchaseDto::from)
        .collect();
    Ok(Json(requests))
}

/// Purchase routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/purchases", post(submit_purchase).get(list_own_purchases))
}
