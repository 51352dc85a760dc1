use axum::Json;
use utoipa::OpenApi;

use super::dto;
use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "OcrGate API",
        version = "0.1.0",
        description = "Upload an image and get back the text lines recognized by the Azure Read API.",
    ),
    paths(handlers::root, handlers::extract_text),
    components(schemas(
        dto::RootResponse,
        dto::ExtractTextResponse,
        dto::ErrorBody,
        dto::UploadForm,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "ocr", description = "Text extraction"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
