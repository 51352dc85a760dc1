use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::error::{OcrGateError, Result};

use super::api::AzureReadClient;
use super::preprocessing::NormalizedImage;
use super::types::{JobHandle, JobStatus, ReadPage};

/// Remote OCR service driven through a submit / poll / fetch cycle.
#[async_trait]
pub trait ReadProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Upload a normalized image and return the handle of the started read job.
    async fn submit(&self, image: NormalizedImage) -> Result<JobHandle>;

    async fn poll_status(&self, job: &JobHandle) -> Result<JobStatus>;

    /// Pages of a succeeded job, each with its lines in reading order.
    async fn get_result(&self, job: &JobHandle) -> Result<Vec<ReadPage>>;
}

/// Stand-in used when no provider could be configured. Every call fails.
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl ReadProvider for UnavailableProvider {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn submit(&self, _image: NormalizedImage) -> Result<JobHandle> {
        Err(OcrGateError::ProviderUnavailable(self.reason.clone()))
    }

    async fn poll_status(&self, _job: &JobHandle) -> Result<JobStatus> {
        Err(OcrGateError::ProviderUnavailable(self.reason.clone()))
    }

    async fn get_result(&self, _job: &JobHandle) -> Result<Vec<ReadPage>> {
        Err(OcrGateError::ProviderUnavailable(self.reason.clone()))
    }
}

/// Pick the Read API client when credentials are present, otherwise degrade to
/// [`UnavailableProvider`] so the server can still start.
pub fn build_provider(config: &OcrConfig) -> Arc<dyn ReadProvider> {
    if config.endpoint.is_none() || config.api_key.is_none() {
        let reason = "AZURE_ENDPOINT and AZURE_KEY must both be set".to_string();
        warn!("OCR provider unavailable: {}", reason);
        return Arc::new(UnavailableProvider::new(reason));
    }

    match AzureReadClient::new(config) {
        Ok(client) => {
            info!(endpoint = %client.endpoint(), "Azure Read API backend initialized");
            Arc::new(client)
        }
        Err(e) => {
            let reason = format!("Azure Read API backend unavailable: {e}");
            warn!("{}", reason);
            Arc::new(UnavailableProvider::new(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(endpoint: Option<&str>, api_key: Option<&str>) -> OcrConfig {
        OcrConfig {
            endpoint: endpoint.map(String::from),
            api_key: api_key.map(String::from),
            ..OcrConfig::default()
        }
    }

    #[test]
    fn test_missing_credentials_fall_back_to_unavailable() {
        let provider = build_provider(&make_config(None, Some("key")));
        assert_eq!(provider.name(), "unavailable");

        let provider = build_provider(&make_config(Some("https://example.com"), None));
        assert_eq!(provider.name(), "unavailable");
    }

    #[test]
    fn test_invalid_endpoint_falls_back_to_unavailable() {
        let provider = build_provider(&make_config(Some("not a url"), Some("key")));
        assert_eq!(provider.name(), "unavailable");
    }

    #[test]
    fn test_valid_config_routes_to_azure() {
        let provider = build_provider(&make_config(
            Some("https://example.cognitiveservices.azure.com/"),
            Some("key"),
        ));
        assert_eq!(provider.name(), "azure-read");
    }

    #[tokio::test]
    async fn test_unavailable_provider_returns_error() {
        let provider = UnavailableProvider::new("Test unavailable");
        let result = provider.poll_status(&JobHandle::new("op")).await;
        assert!(matches!(result, Err(OcrGateError::ProviderUnavailable(_))));
        assert_eq!(provider.reason(), "Test unavailable");
    }
}
