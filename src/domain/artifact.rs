//! Inline image payloads (`data:` URLs) and their decoding.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Why a single artifact could not be turned into image bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactDecodeError {
    /// No `,` between header and payload.
    #[error("artifact is not a data URL")]
    NotDataUrl,
    /// Header lacks a `data:<mime>;` prefix.
    #[error("artifact header has no MIME type")]
    MissingMimeType,
    /// Payload is not valid base64.
    #[error("artifact payload is not valid base64: {0}")]
    InvalidBase64(String),
    /// Payload decodes to zero bytes.
    #[error("artifact payload is empty")]
    Empty,
}

/// A generated image as a self-describing `data:<mime>;base64,<payload>` URL.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageArtifact(String);

impl ImageArtifact {
    /// Builds a data URL from a MIME type and base64 payload.
    #[must_use]
    pub fn from_base64(mime_type: &str, payload: &str) -> Self {
        Self(format!("data:{mime_type};base64,{payload}"))
    }

    /// Wraps an existing data URL without validating it.
    #[must_use]
    pub fn from_data_url(url: String) -> Self {
        Self(url)
    }

    /// Returns the data URL.
    #[must_use]
    pub fn as_data_url(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the URL is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes the payload into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactDecodeError`] if the URL is malformed or the
    /// payload is not base64.
    pub fn decode(&self) -> Result<DecodedImage, ArtifactDecodeError> {
        let (header, payload) = self
            .0
            .split_once(',')
            .ok_or(ArtifactDecodeError::NotDataUrl)?;
        let mime_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(mime, _)| mime.trim())
            .filter(|mime| !mime.is_empty())
            .ok_or(ArtifactDecodeError::MissingMimeType)?;
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| ArtifactDecodeError::InvalidBase64(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ArtifactDecodeError::Empty);
        }
        Ok(DecodedImage {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }
}

impl fmt::Debug for ImageArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.0.split(',').next().unwrap_or_default();
        write!(f, "ImageArtifact({header}, {} chars)", self.0.len())
    }
}

/// Raw image bytes recovered from an [`ImageArtifact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// MIME type from the data URL header.
    pub mime_type: String,
    /// Image bytes.
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    /// File extension for the MIME type, without the dot.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        }
    }
}

/// Download quality tag chosen by the buyer.
///
/// Only affects file names; the image bytes are the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DownloadQuality {
    /// No tag.
    #[default]
    #[serde(rename = "normal")]
    Normal,
    /// `_HD` tag.
    #[serde(rename = "hd")]
    Hd,
    /// `_2K` tag.
    #[serde(rename = "2k")]
    TwoK,
}

impl DownloadQuality {
    /// Every quality, in catalog order.
    pub const ALL: [Self; 3] = [Self::Normal, Self::Hd, Self::TwoK];

    /// Wire name (`normal`, `hd`, `2k`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Hd => "hd",
            Self::TwoK => "2k",
        }
    }

    /// Suffix appended to file names (`""`, `_HD`, `_2K`).
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Hd => "_HD",
            Self::TwoK => "_2K",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn decodes_jpeg_data_url() {
        let artifact = ImageArtifact::from_base64("image/jpeg", "/9j/4AAQ");
        let Ok(image) = artifact.decode() else {
            panic!("valid data URL");
        };
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.extension(), "jpg");
        assert_eq!(image.bytes.first(), Some(&0xFF));
    }

    #[test]
    fn rejects_missing_separator() {
        let artifact = ImageArtifact::from_data_url("data:image/png;base64".to_string());
        assert_eq!(artifact.decode(), Err(ArtifactDecodeError::NotDataUrl));
    }

    #[test]
    fn rejects_missing_mime() {
        let artifact = ImageArtifact::from_data_url("https://example.com/a,b".to_string());
        assert_eq!(artifact.decode(), Err(ArtifactDecodeError::MissingMimeType));
    }

    #[test]
    fn rejects_bad_base64() {
        let artifact = ImageArtifact::from_base64("image/png", "***not base64***");
        assert!(matches!(
            artifact.decode(),
            Err(ArtifactDecodeError::InvalidBase64(_))
        ));
    }

    #[test]
    fn quality_tags() {
        assert_eq!(DownloadQuality::Normal.tag(), "");
        assert_eq!(DownloadQuality::Hd.tag(), "_HD");
        assert_eq!(DownloadQuality::TwoK.tag(), "_2K");
        let Ok(parsed) = serde_json::from_str::<DownloadQuality>("\"2k\"") else {
            panic!("2k should deserialize");
        };
        assert_eq!(parsed, DownloadQuality::TwoK);
    }

    #[test]
    fn debug_does_not_dump_payload() {
        let artifact = ImageArtifact::from_base64("image/jpeg", "QUJDREVGR0g=");
        let rendered = format!("{artifact:?}");
        assert!(rendered.contains("image/jpeg"));
        assert!(!rendered.contains("QUJDREVGR0g="));
    }
}
