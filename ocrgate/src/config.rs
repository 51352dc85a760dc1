use serde::Deserialize;
use std::env;

pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 2000;
pub const DEFAULT_MAX_DECODE_DIMENSION: u32 = 10_000;
pub const DEFAULT_MAX_DECODE_PIXELS: u64 = 40_000_000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024; // 20 MB

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
}

/// Remote Read API settings plus the normalization limits applied before submission.
#[derive(Clone, Deserialize)]
pub struct OcrConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub language: Option<String>,
    /// Timeout for each individual HTTP call to the provider.
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub max_image_dimension: u32,
    pub jpeg_quality: u8,
    /// Uploads wider or taller than this are rejected before their pixels are decoded.
    pub max_decode_dimension: u32,
    /// Pixel budget for one decoded upload. Bounds decoder allocations to four bytes per pixel.
    pub max_decode_pixels: u64,
}

// Hand-written so the subscription key never ends up in logs.
impl std::fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("language", &self.language)
            .field("timeout_secs", &self.timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("max_image_dimension", &self.max_image_dimension)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_decode_dimension", &self.max_decode_dimension)
            .field("max_decode_pixels", &self.max_decode_pixels)
            .finish()
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            language: None,
            timeout_secs: 30,
            poll_interval_ms: 1000,
            max_poll_attempts: 60,
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
            jpeg_quality: 90,
            max_decode_dimension: DEFAULT_MAX_DECODE_DIMENSION,
            max_decode_pixels: DEFAULT_MAX_DECODE_PIXELS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let defaults = OcrConfig::default();
        Self {
            server: ServerConfig {
                host: env::var("OCRGATE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("OCRGATE_PORT", 8000),
                max_upload_bytes: parse_env_or(
                    "OCRGATE_MAX_UPLOAD_BYTES",
                    DEFAULT_MAX_UPLOAD_BYTES,
                ),
            },
            ocr: OcrConfig {
                endpoint: env_non_empty("AZURE_ENDPOINT"),
                api_key: env_non_empty("AZURE_KEY"),
                language: env_non_empty("OCR_LANGUAGE"),
                timeout_secs: parse_env_or("OCR_REQUEST_TIMEOUT", defaults.timeout_secs),
                poll_interval_ms: parse_env_or("OCR_POLL_INTERVAL_MS", defaults.poll_interval_ms),
                max_poll_attempts: parse_env_or(
                    "OCR_MAX_POLL_ATTEMPTS",
                    defaults.max_poll_attempts,
                )
                .max(1),
                max_image_dimension: parse_env_or(
                    "OCR_MAX_DIMENSION",
                    defaults.max_image_dimension,
                )
                .max(1),
                jpeg_quality: parse_env_or("OCR_JPEG_QUALITY", defaults.jpeg_quality).clamp(1, 100),
                max_decode_dimension: parse_env_or(
                    "OCR_MAX_DECODE_DIMENSION",
                    defaults.max_decode_dimension,
                )
                .max(1),
                max_decode_pixels: parse_env_or(
                    "OCR_MAX_DECODE_PIXELS",
                    defaults.max_decode_pixels,
                )
                .max(1),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
