//! Generation handlers: submit, list, get, download and export.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{GenerateRequest, GenerationDto, QualityQuery};
use crate::api::extract::AuthSession;
use crate::app_state::AppState;
use crate::domain::{AspectRatio, JobId};
use crate::error::{ErrorResponse, StorefrontError};

fn attachment(file_name: &str) -> String {
    format!("attachment; filename=\"{file_name}\"")
}

/// `POST /generations` — Start a generation.
///
/// One credit is reserved immediately; the job finishes in the background
/// and the credit is refunded if the remote call fails.
///
/// # Errors
///
/// Returns [`StorefrontError::InsufficientCredits`] at zero balance,
/// [`StorefrontError::InvalidRequest`] for a blank prompt and
/// [`StorefrontError::InvalidAspectRatio`] for an unknown ratio.
#[utoipa::path(
    post,
    path = "/api/v1/generations",
    tag = "Generations",
    summary = "Generate an image",
    description = "Reserves one credit and starts a text-to-image job. Poll the job or listen on the WebSocket for completion.",
    request_body = GenerateRequest,
    security(("bearer" = [])),
    responses(
        (status = 202, description = "Job accepted", body = GenerationDto),
        (status = 400, description = "Invalid prompt or aspect ratio", body = ErrorResponse),
        (status = 403, description = "Administrator session", body = ErrorResponse),
        (status = 422, description = "Insufficient credits", body = ErrorResponse),
    )
)]
pub async fn create_generation(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, StorefrontError> {
    let aspect_ratio = match req.aspect_ratio.as_deref() {
        Some(tag) => tag.parse::<AspectRatio>()?,
        None => AspectRatio::default(),
    };
    let job = state
        .generations
        .submit(&session, &req.prompt, aspect_ratio)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(GenerationDto::from(job))))
}

/// `GET /generations` — The session's jobs, most recent first.
///
/// # Errors
///
/// Returns [`StorefrontError::Unauthorized`] without a session.
#[utoipa::path(
    get,
    path = "/api/v1/generations",
    tag = "Generations",
    summary = "List generations",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Jobs of this session", body = Vec<GenerationDto>),
    )
)]
pub async fn list_generations(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<impl IntoResponse, StorefrontError> {
    let jobs: Vec<GenerationDto> = state
        .generations
        .list(&session)
        .await
        .into_iter()
        .map(GenerationDto::from)
        .collect();
    Ok(Json(jobs))
}

/// `GET /generations/{id}` — One job.
///
/// # Errors
///
/// Returns [`StorefrontError::JobNotFound`] if the session has no such job.
#[utoipa::path(
    get,
    path = "/api/v1/generations/{id}",
    tag = "Generations",
    summary = "Get a generation",
    params(("id" = uuid::Uuid, Path, description = "Job UUID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Job", body = GenerationDto),
        (status = 404, description = "Job not found", body = ErrorResponse),
    )
)]
pub async fn get_generation(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, StorefrontError> {
    let job = state.generations.get(&session, JobId::from_uuid(id)).await?;
    Ok(Json(GenerationDto::from(job)))
}

/// `GET /generations/{id}/image` — Download one image.
///
/// # Errors
///
/// Returns [`StorefrontError::JobNotFound`] for unknown or unfinished jobs.
#[utoipa::path(
    get,
    path = "/api/v1/generations/{id}/image",
    tag = "Generations",
    summary = "Download an image",
    params(("id" = uuid::Uuid, Path, description = "Job UUID"), QualityQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "No completed image", body = ErrorResponse),
    )
)]
pub async fn download_image(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<uuid::Uuid>,
    Query(query): Query<QualityQuery>,
) -> Result<impl IntoResponse, StorefrontError> {
    let download = state
        .generations
        .download(&session, JobId::from_uuid(id), query.quality)
        .await?;
    Ok((
        [
            (CONTENT_TYPE, download.mime_type),
            (CONTENT_DISPOSITION, attachment(&download.file_name)),
        ],
        download.bytes,
    ))
}

/// `GET /generations/export` — Zip of every completed image.
///
/// # Errors
///
/// Returns [`StorefrontError::SubscriptionRequired`] without an approved
/// purchase and [`StorefrontError::NothingToExport`] when no image is
/// completed.
#[utoipa::path(
    get,
    path = "/api/v1/generations/export",
    tag = "Generations",
    summary = "Export images as zip",
    description = "Bundles the session's completed images. Requires an approved purchase.",
    params(QualityQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Zip archive"),
        (status = 403, description = "Subscription required", body = ErrorResponse),
        (status = 422, description = "Nothing to export", body = ErrorResponse),
    )
)]
pub async fn export_images(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(query): Query<QualityQuery>,
) -> Result<impl IntoResponse, StorefrontError> {
    let archive = state.generations.export(&session, query.quality).await?;
    Ok((
        [
            (CONTENT_TYPE, "application/zip".to_string()),
            (CONTENT_DISPOSITION, attachment(&archive.file_name)),
        ],
        archive.bytes,
    ))
}

/// Generation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/generations", post(create_generation).get(list_generations))
        .route("/generations/export", get(export_images))
        .route("/generations/{id}", get(get_generation))
        .route("/generations/{id}/image", get(download_image))
}
