use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const ROOT_MESSAGE: &str = "API is running! Use /extract-text to upload an image.";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
}

impl Default for RootResponse {
    fn default() -> Self {
        Self {
            message: ROOT_MESSAGE.to_string(),
        }
    }
}

/// Text lines in page order, then line order within each page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExtractTextResponse {
    pub extracted_text: Vec<String>,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Multipart form accepted by `POST /extract-text/`. Only used for the OpenAPI document.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// JPEG or PNG image.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
