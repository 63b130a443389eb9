//! Remote text-to-image generation.
//!
//! [`ImageGenerator`] is the seam between the orchestrator and the remote
//! model. [`GeminiImageGenerator`] calls the Generative Language `:predict`
//! endpoint of an Imagen model and returns the first image as a data URL.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ImageApiConfig;
use crate::domain::{AspectRatio, ImageArtifact};

const OUTPUT_MIME_TYPE: &str = "image/jpeg";

/// Why a remote generation failed. Every variant renders with the
/// `Failed to generate image:` prefix shown to buyers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The model returned no image, usually a safety-policy rejection.
    #[error(
        "Failed to generate image: No image was generated. The response might have been blocked due to safety policies."
    )]
    Blocked,
    /// The request never produced an HTTP response.
    #[error("Failed to generate image: {0}")]
    Transport(String),
    /// The API answered with a non-success status.
    #[error("Failed to generate image: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the API, or the raw body.
        message: String,
    },
    /// The response body could not be interpreted.
    #[error("Failed to generate image: {0}")]
    MalformedResponse(String),
}

/// Produces one image for a prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync + std::fmt::Debug {
    /// Generates a single image.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] describing the remote failure.
    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageArtifact, GenerationError>;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [PredictInstance<'a>; 1],
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: AspectRatio,
    output_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Interprets a successful `:predict` response body.
///
/// # Errors
///
/// Returns [`GenerationError::Blocked`] when no prediction carries image
/// bytes and [`GenerationError::MalformedResponse`] for invalid JSON.
pub fn parse_predict_response(body: &str) -> Result<ImageArtifact, GenerationError> {
    let response: PredictResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedResponse(format!("invalid response body: {e}")))?;
    response
        .predictions
        .into_iter()
        .find_map(|p| {
            let bytes = p.bytes_base64_encoded.filter(|b| !b.is_empty())?;
            let mime = p.mime_type.unwrap_or_else(|| OUTPUT_MIME_TYPE.to_string());
            Some(ImageArtifact::from_base64(&mime, &bytes))
        })
        .ok_or(GenerationError::Blocked)
}

fn api_error(status: u16, body: String) -> GenerationError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
    GenerationError::Api { status, message }
}

/// [`ImageGenerator`] backed by the Imagen `:predict` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiImageGenerator {
    client: reqwest::Client,
    config: ImageApiConfig,
}

impl GeminiImageGenerator {
    /// Builds the HTTP client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Transport`] if the client cannot be built.
    pub fn new(config: ImageApiConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:predict",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageArtifact, GenerationError> {
        let request = PredictRequest {
            instances: [PredictInstance { prompt }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio,
                output_mime_type: OUTPUT_MIME_TYPE,
            },
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), model = %self.config.model, "image API returned an error");
            return Err(api_error(status.as_u16(), body));
        }
        parse_predict_response(&body)
    }
}
