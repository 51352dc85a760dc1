//! OCR (Optical Character Recognition) Module
//!
//! Everything between an uploaded image and the remote Read service:
//!
//! - `preprocessing` turns arbitrary uploads into a [`NormalizedImage`]
//!   (8-bit gray or RGB JPEG, alpha composited over white, longer side bounded)
//! - `provider` defines the [`ReadProvider`] trait for submit / poll / fetch
//! - `api` implements it against the Azure Computer Vision Read API v3.2
//!
//! # Configuration
//!
//! Controlled via `OcrConfig` (see `config.rs`):
//! - `endpoint` / `api_key`: Azure resource endpoint and subscription key
//! - `language`: optional language hint passed to the Read API
//! - `timeout_secs`: timeout for each HTTP call
//! - `poll_interval_ms` / `max_poll_attempts`: polling cadence and bound
//! - `max_image_dimension` / `jpeg_quality`: normalization parameters
//! - `max_decode_dimension` / `max_decode_pixels`: limits applied while decoding uploads

mod api;
mod preprocessing;
mod provider;
mod types;

pub use api::AzureReadClient;
pub use preprocessing::{normalize_image, CanonicalColor, NormalizeError, NormalizedImage};
pub use provider::{build_provider, ReadProvider, UnavailableProvider};
pub use types::{ExtractedText, JobHandle, JobStatus, OcrJob, ReadPage};
