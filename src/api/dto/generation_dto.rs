//! Generation request and job DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{AspectRatio, GenerationJob, JobStatus};

/// Request body for `POST /generations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Text prompt.
    pub prompt: String,
    /// One of `1:1`, `16:9`, `9:16`, `4:3`, `3:4`. Defaults to `1:1`.
    #[serde(default)]
    pub aspect_ratio: Option<String>,
}

/// A generation job as seen by its owner.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationDto {
    /// Job identifier.
    pub id: uuid::Uuid,
    /// Prompt text.
    pub prompt: String,
    /// Requested aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// `generating`, `completed` or `failed`.
    pub status: JobStatus,
    /// `data:` URL of the image once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Error message once failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Completion timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<GenerationJob> for GenerationDto {
    fn from(job: GenerationJob) -> Self {
        Self {
            id: job.id.into(),
            prompt: job.prompt,
            aspect_ratio: job.aspect_ratio,
            status: job.status,
            image_url: job.artifact.map(|a| a.as_data_url().to_string()),
            error: job.error,
            created_at: job.created_at,
            finished_at: job.finished_at,
        }
    }
}
