//! Zip export and single-image download naming.

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::domain::{DecodedImage, DownloadQuality, GenerationJob};
use crate::error::StorefrontError;

const ARCHIVE_PROMPT_CHARS: usize = 20;
const DOWNLOAD_PROMPT_CHARS: usize = 30;
const FALLBACK_STEM: &str = "generated_image";

/// A finished export archive.
#[derive(Debug, Clone)]
pub struct ArchiveOutput {
    /// Suggested download name, e.g. `Stock_Ai_Pic_Images_hd.zip`.
    pub file_name: String,
    /// Zip bytes.
    pub bytes: Vec<u8>,
    /// Number of images written.
    pub included: usize,
    /// Number of artifacts skipped because they could not be decoded.
    pub skipped: usize,
}

/// A decoded image ready to be served as a download.
#[derive(Debug, Clone)]
pub struct ImageDownload {
    /// Suggested file name.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Image bytes.
    pub bytes: Vec<u8>,
}

/// Archive name for a quality tag.
#[must_use]
pub fn archive_file_name(quality: DownloadQuality) -> String {
    format!("Stock_Ai_Pic_Images_{}.zip", quality.as_str())
}

/// First `max_chars` characters of `prompt`, with every whitespace run
/// collapsed to `_`. Path separators, quotes and control characters become
/// `_` so the stem is safe in a path and a `Content-Disposition` header.
fn prompt_stem(prompt: &str, max_chars: usize) -> String {
    let mut stem = String::new();
    let mut in_space = false;
    for c in prompt.chars().take(max_chars) {
        if c.is_whitespace() {
            if !in_space {
                stem.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        let unsafe_char = matches!(c, '/' | '\\' | '"') || c.is_control();
        stem.push(if unsafe_char { '_' } else { c });
    }
    stem
}

/// Name of a job's entry inside an export archive.
#[must_use]
pub fn archive_entry_name(job: &GenerationJob, image: &DecodedImage, quality: DownloadQuality) -> String {
    format!(
        "{}{}_{}.{}",
        prompt_stem(&job.prompt, ARCHIVE_PROMPT_CHARS),
        quality.tag(),
        job.id,
        image.extension()
    )
}

/// File name for a single-image download.
#[must_use]
pub fn download_file_name(prompt: &str, image: &DecodedImage, quality: DownloadQuality) -> String {
    let stem = prompt_stem(prompt.trim(), DOWNLOAD_PROMPT_CHARS);
    let stem = if stem.is_empty() { FALLBACK_STEM } else { &stem };
    format!("{stem}{}.{}", quality.tag(), image.extension())
}

/// Decodes one job's artifact for download.
///
/// # Errors
///
/// Returns [`StorefrontError::JobNotFound`] if the job has no exportable
/// artifact and [`StorefrontError::Internal`] if the artifact is corrupt.
pub fn single_download(job: &GenerationJob, quality: DownloadQuality) -> Result<ImageDownload, StorefrontError> {
    let artifact = job
        .exportable_artifact()
        .ok_or(StorefrontError::JobNotFound(*job.id.as_uuid()))?;
    let image = artifact
        .decode()
        .map_err(|e| StorefrontError::Internal(format!("stored image for job {} is unreadable: {e}", job.id)))?;
    Ok(ImageDownload {
        file_name: download_file_name(&job.prompt, &image, quality),
        mime_type: image.mime_type.clone(),
        bytes: image.bytes,
    })
}

/// Writes every exportable artifact of `jobs` into one zip archive.
///
/// Artifacts that fail to decode are logged and skipped; the archive is
/// produced from the rest.
///
/// # Errors
///
/// Returns [`StorefrontError::NothingToExport`] if no job has an artifact,
/// and [`StorefrontError::Archive`] if the zip container cannot be written.
pub fn build_archive(jobs: &[GenerationJob], quality: DownloadQuality) -> Result<ArchiveOutput, StorefrontError> {
    let exportable: Vec<_> = jobs
        .iter()
        .filter_map(|job| job.exportable_artifact().map(|artifact| (job, artifact)))
        .collect();
    if exportable.is_empty() {
        return Err(StorefrontError::NothingToExport);
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let (mut included, mut skipped) = (0_usize, 0_usize);

    for (job, artifact) in exportable {
        let image = match artifact.decode() {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "skipping undecodable artifact");
                skipped = skipped.saturating_add(1);
                continue;
            }
        };
        let name = archive_entry_name(job, &image, quality);
        writer
            .start_file(name, options)
            .map_err(|e| StorefrontError::Archive(e.to_string()))?;
        writer
            .write_all(&image.bytes)
            .map_err(|e| StorefrontError::Archive(e.to_string()))?;
        included = included.saturating_add(1);
    }

    let bytes = writer
        .finish()
        .map_err(|e| StorefrontError::Archive(e.to_string()))?
        .into_inner();
    Ok(ArchiveOutput {
        file_name: archive_file_name(quality),
        bytes,
        included,
        skipped,
    })
}
