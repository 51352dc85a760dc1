// Common test utilities for integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Once;

use axum::body::Body;
use axum::http::Request;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use ocrgate::config::{Config, OcrConfig, ServerConfig};

static INIT: Once = Once::new();

const BOUNDARY: &str = "----ocrgate-integration";

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn test_config(endpoint: Option<String>) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_upload_bytes: 5 * 1024 * 1024,
        },
        ocr: OcrConfig {
            endpoint,
            api_key: Some("integration-key".to_string()),
            timeout_secs: 5,
            poll_interval_ms: 5,
            max_poll_attempts: 4,
            ..OcrConfig::default()
        },
    }
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), format)
        .expect("Failed to encode test image");
    output
}

/// PNG with a transparent background and an opaque black square in the middle.
pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    let mut rgba = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for x in width / 4..width * 3 / 4 {
        for y in height / 4..height * 3 / 4 {
            rgba.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }
    encode(&DynamicImage::ImageRgba8(rgba), ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(&DynamicImage::new_rgb8(width, height), ImageFormat::Jpeg)
}

pub fn multipart_upload(uri: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"scan\"\r\n",
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("Failed to build multipart request")
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

// Re-export commonly used crates for convenience
pub use serial_test::serial;
pub use wiremock;
