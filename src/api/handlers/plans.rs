//! Public plan catalog.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::PlanDto;
use crate::app_state::AppState;

/// `GET /plans` — List purchasable plans.
#[utoipa::path(
    get,
    path = "/api/v1/plans",
    tag = "Plans",
    summary = "List plans",
    responses(
        (status = 200, description = "Plan catalog", body = Vec<PlanDto>),
    )
)]
pub async fn list_plans(State(state): State<AppState>) -> impl IntoResponse {
    let plans: Vec<PlanDto> = state
        .catalog
        .list_plans()
        .await
        .into_iter()
        .map(PlanDto::from)
        .collect();
    Json(plans)
}

/// Catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/plans", get(list_plans))
}
