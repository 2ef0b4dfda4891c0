//! Image uploads stored on local disk under the configured upload directory.

use std::path::Path;

use axum::{body::Bytes, extract::multipart::Field};
use chrono::Utc;

use crate::error::{AppError, AppResult};

/// Accepted image MIME types and the extension written to disk for each.
pub const FILE_TYPE_MAP: [(&str, &str); 3] = [
    ("image/png", "png"),
    ("image/jpeg", "jpeg"),
    ("image/jpg", "jpg"),
];

/// An uploaded file held in memory until every check on the request passed.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub original_name: String,
    pub extension: &'static str,
    pub bytes: Bytes,
}

pub fn extension_for(mime: &str) -> Option<&'static str> {
    FILE_TYPE_MAP
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(mime))
        .map(|(_, ext)| *ext)
}

/// `my photo.png` uploaded at `millis` becomes `my-photo.png-<millis>.<ext>`.
/// Later files of the same request get `-<index>` after the timestamp so
/// parts sharing a name cannot overwrite each other.
pub fn build_file_name(original_name: &str, extension: &str, millis: i64, index: usize) -> String {
    // Strip any client supplied directories before sanitizing.
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .split(' ')
        .collect::<Vec<_>>()
        .join("-");
    let base = if base.is_empty() { "image".to_string() } else { base };
    if index == 0 {
        format!("{base}-{millis}.{extension}")
    } else {
        format!("{base}-{millis}-{index}.{extension}")
    }
}

/// Reads a multipart file field, rejecting unsupported types before any byte
/// reaches the disk.
pub async fn read_image(field: Field<'_>) -> AppResult<PendingImage> {
    let mime = field.content_type().unwrap_or_default().to_string();
    let extension =
        extension_for(&mime).ok_or_else(|| AppError::BadRequest("Invalid image type".into()))?;
    let original_name = field.file_name().unwrap_or("image").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Upload failed: {e}")))?;

    Ok(PendingImage {
        original_name,
        extension,
        bytes,
    })
}

/// Writes the image and returns the generated file name. `index` is the
/// image's position within its request.
pub async fn store_image(
    upload_dir: &Path,
    image: &PendingImage,
    index: usize,
) -> AppResult<String> {
    tokio::fs::create_dir_all(upload_dir).await?;
    let file_name = build_file_name(
        &image.original_name,
        image.extension,
        Utc::now().timestamp_millis(),
        index,
    );
    tokio::fs::write(upload_dir.join(&file_name), &image.bytes).await?;
    tracing::debug!(file = %file_name, size = image.bytes.len(), "image stored");
    Ok(file_name)
}

/// Public URL of an uploaded file as seen through the request's `Host` header.
pub fn public_url(host: &str, file_name: &str) -> String {
    format!("http://{host}{}/{file_name}", crate::middleware::auth::UPLOADS_PATH)
}
