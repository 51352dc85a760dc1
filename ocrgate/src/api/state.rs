use std::sync::Arc;

use crate::config::Config;
use crate::ocr::ReadProvider;
use crate::processing::ExtractionPipeline;

/// Shared, immutable per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: ExtractionPipeline,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn ReadProvider>) -> Self {
        let pipeline = ExtractionPipeline::new(provider, &config.ocr);
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }
}
