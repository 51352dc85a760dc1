//! HTTP gateway that normalizes uploaded images and extracts their text
//! through a remote Read API.

pub mod api;
pub mod config;
pub mod error;
pub mod ocr;
pub mod processing;
