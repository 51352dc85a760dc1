use axum::extract::multipart::{Field, Multipart, MultipartError, MultipartRejection};
use axum::http::StatusCode;

use crate::error::{OcrGateError, Result};
use crate::processing::UploadedImage;

impl From<MultipartRejection> for OcrGateError {
    fn from(rejection: MultipartRejection) -> Self {
        OcrGateError::InvalidMultipart(rejection.body_text())
    }
}

fn map_multipart_error(err: MultipartError, max_bytes: usize) -> OcrGateError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OcrGateError::PayloadTooLarge { max: max_bytes }
    } else {
        OcrGateError::InvalidMultipart(err.body_text())
    }
}

/// Pull the `file` field out of a multipart body. Other fields are ignored.
pub async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<UploadedImage> {
    let mut upload: Option<UploadedImage> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multipart_error(e, max_bytes))?
    {
        if field.name() != Some("file") {
            continue;
        }
        upload = Some(read_file_field(field, max_bytes).await?);
    }

    upload.ok_or(OcrGateError::MissingFile)
}

async fn read_file_field(field: Field<'_>, max_bytes: usize) -> Result<UploadedImage> {
    let content_type = field.content_type().map(String::from);
    let file_name = field.file_name().map(String::from);

    let bytes = field
        .bytes()
        .await
        .map_err(|e| map_multipart_error(e, max_bytes))?;

    if bytes.len() > max_bytes {
        return Err(OcrGateError::PayloadTooLarge { max: max_bytes });
    }

    Ok(UploadedImage {
        bytes: bytes.to_vec(),
        content_type,
        file_name,
    })
}
