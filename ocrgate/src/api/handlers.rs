//! Route handlers. Every failure leaves as [`OcrGateError`], which renders
//! `{"error": "..."}` with the matching status code.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use tracing::{error, info, warn};

use crate::api::dto::{ErrorBody, ExtractTextResponse, RootResponse, UploadForm};
use crate::api::extractors::read_upload;
use crate::api::AppState;
use crate::error::{OcrGateError, Result};

/// `GET /`
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = RootResponse),
    )
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse::default())
}

/// `POST /extract-text/`
///
/// Accepts a multipart upload with a `file` field (JPEG or PNG), normalizes it,
/// runs it through the Read API and returns the recognized lines.
#[utoipa::path(
    post,
    path = "/extract-text/",
    tag = "ocr",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Text extracted", body = ExtractTextResponse),
        (status = 400, description = "Unsupported file type or extraction failed", body = ErrorBody),
        (status = 413, description = "Upload too large", body = ErrorBody),
        (status = 422, description = "Not a valid image", body = ErrorBody),
        (status = 500, description = "Internal or provider error", body = ErrorBody),
        (status = 504, description = "Extraction timed out", body = ErrorBody),
    )
)]
pub async fn extract_text(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractTextResponse>> {
    let max_bytes = state.config.server.max_upload_bytes;

    let upload = match multipart {
        Ok(multipart) => read_upload(multipart, max_bytes).await,
        Err(rejection) => Err(rejection.into()),
    }
    .map_err(|e| {
        warn!(error = %e, "Rejected upload");
        e
    })?;

    let content_type = upload.content_type.clone().unwrap_or_default();
    info!(
        content_type = %content_type,
        file_name = ?upload.file_name,
        bytes = upload.bytes.len(),
        "Uploaded file received"
    );

    let text = state.pipeline.extract_text(upload).await.map_err(|e| {
        log_extraction_error(&e, &content_type);
        e
    })?;

    Ok(Json(ExtractTextResponse {
        extracted_text: text.into_lines(),
    }))
}

fn log_extraction_error(err: &OcrGateError, content_type: &str) {
    let status = err.status().as_u16();
    if err.status().is_server_error() {
        error!(content_type = %content_type, status, error = %err, "Text extraction failed");
    } else {
        warn!(content_type = %content_type, status, error = %err, "Text extraction rejected");
    }
}
