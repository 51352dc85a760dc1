use serde::{Deserialize, Serialize};

/// Status of a remote read operation as seen by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Opaque handle for an in-flight remote read operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A submitted job plus the last status observed for it.
#[derive(Debug, Clone)]
pub struct OcrJob {
    pub handle: JobHandle,
    pub status: JobStatus,
    pub polls: u32,
}

impl OcrJob {
    pub fn new(handle: JobHandle) -> Self {
        Self {
            handle,
            status: JobStatus::Pending,
            polls: 0,
        }
    }

    pub fn record(&mut self, status: JobStatus) {
        self.polls += 1;
        self.status = status;
    }
}

/// One page of recognized lines, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadPage {
    pub page: u32,
    pub lines: Vec<String>,
}

/// Text lines of every page, flattened page by page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedText(Vec<String>);

impl ExtractedText {
    pub fn from_pages(pages: Vec<ReadPage>) -> Self {
        Self(pages.into_iter().flat_map(|p| p.lines).collect())
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.0
    }
}
