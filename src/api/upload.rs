use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::services::{decode_image, DisplayCoordinator, ACCEPTED_MIME};

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// Multipart form accepted by the upload endpoint
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// JPEG, PNG or WebP photo
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Result of an upload that reached the panel
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Always "ok"
    pub status: String,
    /// Hardware cycle number
    pub cycle: u64,
    /// Width of the uploaded image
    pub width: u32,
    /// Height of the uploaded image
    pub height: u32,
    /// SHA-256 of the uploaded file
    pub sha256: String,
    /// Time spent waiting for the panel
    pub queued_ms: u64,
    /// Time spent driving the panel
    pub hardware_ms: u64,
    /// Where the preview of the displayed frame can be fetched
    pub preview_url: Option<String>,
}

/// Upload a photo and show it on the panel
///
/// Blocks until the panel refresh is complete. Requests arriving while the
/// panel is busy queue in arrival order.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image displayed", body = UploadResponse),
        (status = 400, description = "Missing file or undecodable image"),
        (status = 413, description = "Upload too large"),
        (status = 415, description = "Not a JPEG, PNG or WebP upload"),
        (status = 500, description = "Panel failure"),
        (status = 503, description = "Panel busy for too long"),
    ),
    tag = "Upload"
)]
pub async fn handle_upload(
    State(coordinator): State<Arc<DisplayCoordinator>>,
    State(max_bytes): State<usize>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let mime = field
            .content_type()
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .unwrap_or_default();
        if !ACCEPTED_MIME.contains(&mime.as_str()) {
            let shown = if mime.is_empty() { "(none)".to_string() } else { mime };
            return Err(ApiError::UnsupportedMediaType(shown));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;
        if bytes.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge { max: max_bytes });
        }
        upload = Some(bytes);
        break;
    }

    let bytes = upload.ok_or(ApiError::MissingField(FILE_FIELD))?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    tracing::info!(bytes = bytes.len(), sha256 = %sha256, "Upload received");

    let image = tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Decode task failed: {e}")))??;
    let (width, height) = (image.width(), image.height());

    let report = coordinator.render(image).await?;

    Ok(Json(UploadResponse {
        status: "ok".to_string(),
        cycle: report.cycle,
        width,
        height,
        sha256,
        queued_ms: report.queued.as_millis() as u64,
        hardware_ms: report.hardware.as_millis() as u64,
        preview_url: report.preview_file.map(|f| format!("/processed/{f}")),
    }))
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { max: max_bytes }
    } else {
        ApiError::BadRequest(e.body_text())
    }
}
