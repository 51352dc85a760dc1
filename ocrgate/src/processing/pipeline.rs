use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::error::{OcrGateError, Result};
use crate::ocr::{
    normalize_image, ExtractedText, JobStatus, NormalizeError, NormalizedImage, OcrJob,
    ReadProvider,
};

/// Upload content types accepted before any decoding is attempted.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Raw upload as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

/// Stages of one extraction, in order. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    Normalizing,
    Submitted,
    Polling,
    Succeeded,
    Failed,
}

enum Stage {
    Validating(UploadedImage),
    Normalizing(Vec<u8>),
    Submitted(NormalizedImage),
    Polling(OcrJob),
    Succeeded(OcrJob),
    Failed(OcrJob),
}

impl Stage {
    fn kind(&self) -> PipelineStage {
        match self {
            Stage::Validating(_) => PipelineStage::Validating,
            Stage::Normalizing(_) => PipelineStage::Normalizing,
            Stage::Submitted(_) => PipelineStage::Submitted,
            Stage::Polling(_) => PipelineStage::Polling,
            Stage::Succeeded(_) => PipelineStage::Succeeded,
            Stage::Failed(_) => PipelineStage::Failed,
        }
    }
}

enum Transition {
    Next(Stage),
    Done(ExtractedText),
}

/// Returns true when the declared type (ignoring parameters and case) is JPEG or PNG.
pub fn is_accepted_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_CONTENT_TYPES.contains(&essence.as_str())
}

/// Drives one upload through validation, normalization, submission and polling.
///
/// Cloning is cheap; the provider and configuration are shared behind `Arc`s.
#[derive(Clone)]
pub struct ExtractionPipeline {
    provider: Arc<dyn ReadProvider>,
    config: Arc<OcrConfig>,
}

impl ExtractionPipeline {
    pub fn new(provider: Arc<dyn ReadProvider>, config: &OcrConfig) -> Self {
        Self {
            provider,
            config: Arc::new(config.clone()),
        }
    }

    pub async fn extract_text(&self, upload: UploadedImage) -> Result<ExtractedText> {
        let mut stage = Stage::Validating(upload);
        loop {
            debug!(stage = ?stage.kind(), "Advancing extraction");
            stage = match self.advance(stage).await? {
                Transition::Next(next) => next,
                Transition::Done(text) => return Ok(text),
            };
        }
    }

    async fn advance(&self, stage: Stage) -> Result<Transition> {
        match stage {
            Stage::Validating(upload) => {
                let content_type = upload.content_type.as_deref().unwrap_or_default();
                if !is_accepted_content_type(content_type) {
                    return Err(OcrGateError::UnsupportedMediaType(content_type.to_string()));
                }
                Ok(Transition::Next(Stage::Normalizing(upload.bytes)))
            }
            Stage::Normalizing(bytes) => {
                let image = self.normalize(bytes).await?;
                Ok(Transition::Next(Stage::Submitted(image)))
            }
            Stage::Submitted(image) => {
                let size = image.len();
                let handle = self.provider.submit(image).await?;
                info!(
                    operation_id = %handle,
                    provider = self.provider.name(),
                    bytes = size,
                    "Image submitted for text extraction"
                );
                Ok(Transition::Next(Stage::Polling(OcrJob::new(handle))))
            }
            Stage::Polling(mut job) => {
                let status = self.provider.poll_status(&job.handle).await?;
                job.record(status);
                debug!(operation_id = %job.handle, status = %status, polls = job.polls, "Polled read operation");

                match status {
                    JobStatus::Succeeded => Ok(Transition::Next(Stage::Succeeded(job))),
                    JobStatus::Failed => Ok(Transition::Next(Stage::Failed(job))),
                    JobStatus::Pending if job.polls >= self.config.max_poll_attempts => {
                        warn!(
                            operation_id = %job.handle,
                            polls = job.polls,
                            "Read operation did not finish in time"
                        );
                        Err(OcrGateError::ProviderTimeout {
                            operation_id: job.handle.to_string(),
                            attempts: job.polls,
                        })
                    }
                    JobStatus::Pending => {
                        tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms))
                            .await;
                        Ok(Transition::Next(Stage::Polling(job)))
                    }
                }
            }
            Stage::Succeeded(job) => {
                let pages = self.provider.get_result(&job.handle).await?;
                let text = ExtractedText::from_pages(pages);
                info!(
                    operation_id = %job.handle,
                    lines = text.len(),
                    polls = job.polls,
                    "Text extraction succeeded"
                );
                Ok(Transition::Done(text))
            }
            Stage::Failed(job) => Err(OcrGateError::ExtractionFailed(job.handle.to_string())),
        }
    }

    /// Decoding and resampling are CPU bound, so they run off the async workers.
    async fn normalize(&self, bytes: Vec<u8>) -> Result<NormalizedImage> {
        let config = Arc::clone(&self.config);
        let result = tokio::task::spawn_blocking(move || normalize_image(&bytes, &config))
            .await
            .map_err(|e| OcrGateError::Internal(format!("Normalization task panicked: {e}")))?;

        result.map_err(|e| match e {
            NormalizeError::InvalidImage(msg) => OcrGateError::UnprocessableImage(msg),
            NormalizeError::Internal(msg) => OcrGateError::Internal(msg),
        })
    }
}
