//! Generation jobs and their lifecycle.
//!
//! A job starts in [`JobStatus::Generating`] and moves exactly once to
//! either [`JobStatus::Completed`] (carrying an [`ImageArtifact`]) or
//! [`JobStatus::Failed`] (carrying an error message). Jobs live only in
//! process memory.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AccountId, ImageArtifact, JobId};
use crate::error::StorefrontError;

/// Aspect ratios accepted by the remote generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum AspectRatio {
    /// 1:1
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 16:9
    #[serde(rename = "16:9")]
    Widescreen,
    /// 9:16
    #[serde(rename = "9:16")]
    Vertical,
    /// 4:3
    #[serde(rename = "4:3")]
    Landscape,
    /// 3:4
    #[serde(rename = "3:4")]
    Portrait,
}

impl AspectRatio {
    /// Every supported ratio, in catalog order.
    pub const ALL: [Self; 5] = [
        Self::Square,
        Self::Widescreen,
        Self::Vertical,
        Self::Landscape,
        Self::Portrait,
    ];

    /// Returns the wire tag (e.g. `"16:9"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Widescreen => "16:9",
            Self::Vertical => "9:16",
            Self::Landscape => "4:3",
            Self::Portrait => "3:4",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s.trim())
            .ok_or_else(|| StorefrontError::InvalidAspectRatio(s.to_string()))
    }
}

/// Lifecycle state of a [`GenerationJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Remote call in flight.
    Generating,
    /// Image received.
    Completed,
    /// Remote call failed; the reserved credit was refunded.
    Failed,
}

/// One text-to-image request and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationJob {
    /// Unique job identifier.
    pub id: JobId,
    /// Account that paid for the job.
    pub account_id: AccountId,
    /// Prompt text as submitted.
    pub prompt: String,
    /// Requested aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Current status.
    pub status: JobStatus,
    /// Generated image, once completed.
    pub artifact: Option<ImageArtifact>,
    /// Failure message, once failed.
    pub error: Option<String>,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Time the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// Creates a job in the `generating` state.
    #[must_use]
    pub fn new(account_id: AccountId, prompt: String, aspect_ratio: AspectRatio) -> Self {
        Self {
            id: JobId::new(),
            account_id,
            prompt,
            aspect_ratio,
            status: JobStatus::Generating,
            artifact: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Returns `true` once the job is completed or failed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status != JobStatus::Generating
    }

    /// Moves the job to `completed`. Returns `false` (and changes nothing)
    /// if the job was already terminal.
    pub fn complete(&mut self, artifact: ImageArtifact) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.artifact = Some(artifact);
        self.finished_at = Some(Utc::now());
        true
    }

    /// Moves the job to `failed`. Returns `false` (and changes nothing)
    /// if the job was already terminal.
    pub fn fail(&mut self, error: String) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
        true
    }

    /// Returns the artifact if the job completed with a non-empty payload.
    #[must_use]
    pub fn exportable_artifact(&self) -> Option<&ImageArtifact> {
        match (&self.status, &self.artifact) {
            (JobStatus::Completed, Some(artifact)) if !artifact.is_empty() => Some(artifact),
            _ => None,
        }
    }
}
