use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrGateError {
    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),

    #[error("Invalid image: {0}")]
    UnprocessableImage(String),

    #[error("Missing required 'file' field")]
    MissingFile,

    #[error("Invalid multipart body: {0}")]
    InvalidMultipart(String),

    #[error("File too large (max {max} bytes)")]
    PayloadTooLarge { max: usize },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("OCR provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Text extraction failed for operation {0}")]
    ExtractionFailed(String),

    #[error("OCR operation {operation_id} still pending after {attempts} polls")]
    ProviderTimeout { operation_id: String, attempts: u32 },
}

impl OcrGateError {
    pub fn status(&self) -> StatusCode {
        match self {
            OcrGateError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            OcrGateError::UnprocessableImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OcrGateError::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
            OcrGateError::InvalidMultipart(_) => StatusCode::BAD_REQUEST,
            OcrGateError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            OcrGateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OcrGateError::ProviderUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OcrGateError::ExtractionFailed(_) => StatusCode::BAD_REQUEST,
            OcrGateError::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Message safe to show to the client. Provider and decoder internals stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            OcrGateError::UnsupportedMediaType(_) => {
                "Unsupported file type. Only JPEG and PNG formats are supported.".to_string()
            }
            OcrGateError::UnprocessableImage(_) => {
                "The uploaded file is not a valid image.".to_string()
            }
            OcrGateError::MissingFile | OcrGateError::PayloadTooLarge { .. } => self.to_string(),
            OcrGateError::InvalidMultipart(_) => "Malformed multipart request.".to_string(),
            OcrGateError::Internal(_) => "An unexpected error occurred.".to_string(),
            OcrGateError::ProviderUnavailable(_) => {
                "The OCR service is currently unavailable.".to_string()
            }
            OcrGateError::ExtractionFailed(_) => "Text extraction failed.".to_string(),
            OcrGateError::ProviderTimeout { .. } => "Text extraction timed out.".to_string(),
        }
    }
}

impl IntoResponse for OcrGateError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, OcrGateError>;
