//! Administrator handlers: accounts, plans and the purchase queue.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AccountDto, AccountListResponse, ApprovalResponse, CreatePlanRequest, PaginationParams,
    PlanDto, PurchaseDto, PurchaseFilter,
};
use crate::api::extract::AdminSession;
use crate::app_state::AppState;
use crate::domain::{AccountId, PlanId, PurchaseId};
use crate::error::{ErrorResponse, StorefrontError};
use crate::service::ApprovalOutcome;

/// `GET /admin/accounts` — Paginated account list.
#[utoipa::path(
    get,
    path = "/api/v1/admin/accounts",
    tag = "Admin",
    summary = "List accounts",
    params(PaginationParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Paginated accounts", body = AccountListResponse),
        (status = 403, description = "Not an administrator", body = ErrorResponse),
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let accounts = state.identity.list_accounts().await;
    let (page, pagination) = params.paginate(accounts);
    Json(AccountListResponse {
        data: page.into_iter().map(AccountDto::from).collect(),
        pagination,
    })
}

/// `POST /admin/accounts/{id}/ban` — Toggle the banned flag.
///
/// # Errors
///
/// Returns [`StorefrontError::AccountNotFound`] for an unknown id.
#[utoipa::path(
    post,
    path = "/api/v1/admin/accounts/{id}/ban",
    tag = "Admin",
    summary = "Toggle ban",
    description = "Flips the banned flag. Banning also closes every session of the account.",
    params(("id" = uuid::Uuid, Path, description = "Account UUID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated account", body = AccountDto),
        (status = 404, description = "Account not found", body = ErrorResponse),
    )
)]
pub async fn toggle_ban(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, StorefrontError> {
    let account = state.identity.toggle_ban(AccountId::from_uuid(id)).await?;
    Ok(Json(AccountDto::from(account)))
}

/// `DELETE /admin/accounts/{id}` — Delete an account.
///
/// # Errors
///
/// Returns [`StorefrontError::AccountNotFound`] for an unknown id.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/accounts/{id}",
    tag = "Admin",
    summary = "Delete account",
    params(("id" = uuid::Uuid, Path, description = "Account UUID")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 404, description = "Account not found", body = ErrorResponse),
    )
)]
pub async fn delete_account(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, StorefrontError> {
    state.identity.delete_account(AccountId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/plans` — Add a plan.
///
/// # Errors
///
/// Returns [`StorefrontError::InvalidRequest`] if validation fails.
#[utoipa::path(
    post,
    path = "/api/v1/admin/plans",
    tag = "Admin",
    summary = "Add plan",
    request_body = CreatePlanRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Plan added", body = PlanDto),
        (status = 400, description = "Invalid plan", body = ErrorResponse),
    )
)]
pub async fn create_plan(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<CreatePlanRequest>,
) -> Result<impl IntoResponse, StorefrontError> {
    let plan = state.catalog.add_plan(req.into()).await?;
    Ok((StatusCode::CREATED, Json(PlanDto::from(plan))))
}

/// `DELETE /admin/plans/{id}` — Remove a plan.
///
/// # Errors
///
/// Returns [`StorefrontError::PlanNotFound`] for an unknown id.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/plans/{id}",
    tag = "Admin",
    summary = "Delete plan",
    params(("id" = uuid::Uuid, Path, description = "Plan UUID")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Plan removed"),
        (status = 404, description = "Plan not found", body = ErrorResponse),
    )
)]
pub async fn delete_plan(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, StorefrontError> {
    state.catalog.delete_plan(PlanId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/purchases` — Purchase queue, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/admin/purchases",
    tag = "Admin",
    summary = "List purchase requests",
    params(PurchaseFilter),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Purchase requests", body = Vec<PurchaseDto>),
    )
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(filter): Query<PurchaseFilter>,
) -> impl IntoResponse {
    let requests: Vec<PurchaseDto> = state
        .purchases
        .list(filter.status)
        .await
        .into_iter()
        .map(PurchaseDto::from)
        .collect();
    Json(requests)
}

/// `POST /admin/purchases/{id}/approve` — Approve a purchase.
///
/// Approving an already approved request grants nothing and reports
/// `already_approved`.
///
/// # Errors
///
/// Returns [`StorefrontError::PurchaseNotFound`] for an unknown id.
#[utoipa::path(
    post,
    path = "/api/v1/admin/purchases/{id}/approve",
    tag = "Admin",
    summary = "Approve purchase",
    params(("id" = uuid::Uuid, Path, description = "Purchase request UUID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Approval outcome", body = ApprovalResponse),
        (status = 404, description = "Purchase request not found", body = ErrorResponse),
    )
)]
pub async fn approve_purchase(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, StorefrontError> {
    let response = match state.purchases.approve(PurchaseId::from_uuid(id)).await? {
        ApprovalOutcome::Approved {
            request,
            credits_granted,
            ..
        } => ApprovalResponse {
            outcome: "approved".to_string(),
            purchase: request.into(),
            credits_granted,
        },
        ApprovalOutcome::AlreadyApproved(request) => ApprovalResponse {
            outcome: "already_approved".to_string(),
            purchase: request.into(),
            credits_granted: 0,
        },
        ApprovalOutcome::PlanNotFound(request) => ApprovalResponse {
            outcome: "plan_not_found".to_string(),
            purchase: request.into(),
            credits_granted: 0,
        },
        ApprovalOutcome::RequestNotFound => return Err(StorefrontError::PurchaseNotFound(id)),
    };
    Ok(Json(response))
}

/// Administrator routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/accounts", get(list_accounts))
        .route("/admin/accounts/{id}", delete(delete_account))
        .route("/admin/accounts/{id}/ban", post(toggle_ban))
        .route("/admin/plans", post(create_plan))
        .route("/admin/plans/{id}", delete(delete_plan))
        .route("/admin/purchases", get(list_purchases))
        .route("/admin/purchases/{id}/approve", post(approve_purchase))
}
