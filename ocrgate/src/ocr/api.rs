use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::OcrConfig;
use crate::error::{OcrGateError, Result};

use super::preprocessing::NormalizedImage;
use super::provider::ReadProvider;
use super::types::{JobHandle, JobStatus, ReadPage};

const READ_API_PATH: &str = "vision/v3.2/read/";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "Operation-Location";

/// Client for the Azure Computer Vision Read API v3.2.
///
/// The poll that observes `succeeded` already carries the recognized text, so
/// those pages are kept until [`ReadProvider::get_result`] takes them.
#[derive(Clone)]
pub struct AzureReadClient {
    client: Client,
    api_key: String,
    base_url: Url,
    language: Option<String>,
    completed: Arc<Mutex<HashMap<String, Vec<ReadPage>>>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl From<OperationStatus> for JobStatus {
    fn from(status: OperationStatus) -> Self {
        match status {
            OperationStatus::Succeeded => JobStatus::Succeeded,
            OperationStatus::Failed => JobStatus::Failed,
            OperationStatus::NotStarted | OperationStatus::Running | OperationStatus::Unknown => {
                JobStatus::Pending
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadOperationResult {
    status: OperationStatus,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResult {
    #[serde(default)]
    read_results: Vec<ReadResult>,
}

#[derive(Debug, Deserialize)]
struct ReadResult {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    lines: Vec<Line>,
}

#[derive(Debug, Deserialize)]
struct Line {
    text: String,
}

impl AzureReadClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            OcrGateError::ProviderUnavailable("API key required for Azure Read".to_string())
        })?;

        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            OcrGateError::ProviderUnavailable("Endpoint required for Azure Read".to_string())
        })?;

        let base_url = parse_base_url(endpoint)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                OcrGateError::ProviderUnavailable(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_key,
            base_url,
            language: config.language.clone(),
            completed: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base_url
    }

    fn analyze_url(&self) -> Result<Url> {
        let mut url = self.read_url("analyze")?;
        if let Some(language) = &self.language {
            url.query_pairs_mut().append_pair("language", language);
        }
        Ok(url)
    }

    fn result_url(&self, job: &JobHandle) -> Result<Url> {
        self.read_url(&format!("analyzeResults/{}", job.as_str()))
    }

    fn read_url(&self, suffix: &str) -> Result<Url> {
        self.base_url
            .join(READ_API_PATH)
            .and_then(|u| u.join(suffix))
            .map_err(|e| OcrGateError::Internal(format!("Failed to build Read API URL: {e}")))
    }

    async fn fetch_operation(&self, job: &JobHandle) -> Result<ReadOperationResult> {
        let response = self
            .client
            .get(self.result_url(job)?)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| {
                OcrGateError::ProviderUnavailable(format!("Read result request failed: {e}"))
            })?;

        let response = ensure_success(response, "Read result request").await?;

        response.json::<ReadOperationResult>().await.map_err(|e| {
            OcrGateError::ProviderUnavailable(format!("Failed to parse Read result: {e}"))
        })
    }

    fn completed(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<ReadPage>>>> {
        self.completed
            .lock()
            .map_err(|_| OcrGateError::Internal("Read result cache poisoned".to_string()))
    }
}

fn pages_from(operation: ReadOperationResult) -> Vec<ReadPage> {
    operation
        .analyze_result
        .map(|r| r.read_results)
        .unwrap_or_default()
        .into_iter()
        .map(|r| ReadPage {
            page: r.page,
            lines: r.lines.into_iter().map(|l| l.text).collect(),
        })
        .collect()
}

#[async_trait]
impl ReadProvider for AzureReadClient {
    fn name(&self) -> &str {
        "azure-read"
    }

    async fn submit(&self, image: NormalizedImage) -> Result<JobHandle> {
        let response = self
            .client
            .post(self.analyze_url()?)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(image.into_bytes())
            .send()
            .await
            .map_err(|e| OcrGateError::ProviderUnavailable(format!("Read submission failed: {e}")))?;

        let response = ensure_success(response, "Read submission").await?;

        let location = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                OcrGateError::ProviderUnavailable(
                    "Read submission response has no Operation-Location header".to_string(),
                )
            })?;

        let operation_id = operation_id_from_location(location).ok_or_else(|| {
            OcrGateError::ProviderUnavailable(format!(
                "Malformed Operation-Location header: {location}"
            ))
        })?;

        Ok(JobHandle::new(operation_id))
    }

    async fn poll_status(&self, job: &JobHandle) -> Result<JobStatus> {
        let operation = self.fetch_operation(job).await?;
        debug!(operation_id = %job, status = ?operation.status, "Read operation polled");
        let status = JobStatus::from(operation.status);
        if status == JobStatus::Succeeded {
            let pages = pages_from(operation);
            self.completed()?.insert(job.as_str().to_string(), pages);
        }
        Ok(status)
    }

    async fn get_result(&self, job: &JobHandle) -> Result<Vec<ReadPage>> {
        let cached = self.completed()?.remove(job.as_str());
        if let Some(pages) = cached {
            return Ok(pages);
        }

        let operation = self.fetch_operation(job).await?;
        match operation.status {
            OperationStatus::Succeeded => Ok(pages_from(operation)),
            other => Err(OcrGateError::Internal(format!(
                "Read operation {job} has no result yet (status {other:?})"
            ))),
        }
    }
}

fn parse_base_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint.trim())
        .map_err(|e| OcrGateError::ProviderUnavailable(format!("Invalid endpoint URL: {e}")))?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(OcrGateError::ProviderUnavailable(format!(
            "Endpoint must be an http(s) URL: {endpoint}"
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// The operation id is the last path segment of the Operation-Location URL.
fn operation_id_from_location(location: &str) -> Option<String> {
    let without_query = location.split('?').next()?;
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(String::from)
}

async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(OcrGateError::ProviderUnavailable(format!(
        "{what} failed: {status} - {body}"
    )))
}
