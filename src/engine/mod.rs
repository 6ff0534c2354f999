//! Processing engine boundary
//!
//! The remote engine owns documents and jobs. This module defines the
//! identifiers and status types it hands out, the [`ProcessingEngine`]
//! trait the orchestrator drives, and [`HttpEngine`], its HTTP/JSON client.

mod http;
pub mod orchestrator;
pub mod poll;

pub use http::{ClientConfig, HttpEngine};
pub use orchestrator::{Artifact, JobOrchestrator, JobPhase, OpenedDocument, TrackedJob};
pub use poll::{Backoff, PollPolicy};

use crate::error::Result;
use crate::manifest::Manifest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// Identifier the engine assigns to an uploaded document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier the engine assigns to a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "pending")]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Body of `GET /api/jobs/{jobId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub status: JobStatus,
    /// Failure reason, when the engine gives one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `POST /api/upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "fileId")]
    pub file_id: DocumentId,
}

/// Body of `GET /api/files/{fileId}/meta`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(rename = "fileId")]
    pub file_id: DocumentId,
    pub page_count: u32,
    /// `(width, height)` of each page in PDF units, in document order
    pub page_sizes: Vec<(f64, f64)>,
}

/// Body of `POST /api/files/{fileId}/apply`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResponse {
    #[serde(rename = "jobId")]
    pub job_id: JobId,
}

/// Operations the remote processing engine exposes.
///
/// Each call is one request; none of them retry.
pub trait ProcessingEngine {
    /// Upload a document and return its engine-assigned identity
    fn upload(&self, file_name: &str, data: Vec<u8>)
        -> impl Future<Output = Result<DocumentId>> + Send;

    /// Page count and page sizes of an uploaded document
    fn file_meta(&self, document_id: &DocumentId)
        -> impl Future<Output = Result<FileMeta>> + Send;

    /// Submit a manifest against an uploaded document, creating a new job
    fn submit(
        &self,
        document_id: &DocumentId,
        manifest: &Manifest,
    ) -> impl Future<Output = Result<JobId>> + Send;

    /// Query the current status of a job
    fn job_status(&self, job_id: &JobId) -> impl Future<Output = Result<JobStatusReport>> + Send;

    /// Download the artifact of a completed job
    fn download(&self, job_id: &JobId) -> impl Future<Output = Result<Vec<u8>>> + Send;
}
