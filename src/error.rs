//! Error types for the PDF edit client

use std::time::Duration;
use thiserror::Error;

/// Result type alias for the PDF edit client
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons an edit operation or session mutation is refused.
///
/// These never abort an editing interaction: the session discards the
/// attempted operation and reports the reason through [`EventOutcome`].
///
/// [`EventOutcome`]: crate::session::EventOutcome
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A point-anchored operation was requested before any point was selected
    #[error("No point selected")]
    NoSelectedPoint,

    /// Page index does not exist in the document
    #[error("Page {page} out of bounds (total: {page_count})")]
    PageOutOfBounds { page: u32, page_count: u32 },

    /// Rotation is not a multiple of 90 degrees
    #[error("Invalid rotation: {degrees} degrees (must be a multiple of 90)")]
    InvalidRotation { degrees: i32 },

    /// A size-like field must be strictly positive
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    /// A coordinate or size is NaN or infinite
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    /// Watermark opacity outside (0, 1]
    #[error("Opacity must be in (0, 1], got {value}")]
    OpacityOutOfRange { value: f64 },

    /// Empty text where content is required
    #[error("{field} must not be empty")]
    EmptyText { field: &'static str },

    /// Color is neither a known name nor a hex triplet
    #[error("Invalid color: {value}")]
    InvalidColor { value: String },

    /// Image payload is empty or not a recognizable raster format
    #[error("Unsupported image data: {reason}")]
    UnsupportedImage { reason: String },

    /// Preview scale must be a positive, finite factor
    #[error("Invalid preview scale: {scale}")]
    InvalidScale { scale: f64 },

    /// Page order is not a permutation of the document's pages
    #[error("Page order is not a permutation of {page_count} pages")]
    NotAPermutation { page_count: u32 },

    /// Drag-reorder position outside the page order
    #[error("Cannot move position {from} to {to} (length: {len})")]
    MoveOutOfRange { from: usize, to: usize, len: usize },
}

/// Error types for the PDF edit client
#[derive(Error, Debug)]
pub enum Error {
    /// Operation refused by local validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Network or connectivity failure talking to the processing engine
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Engine answered successfully but the body does not match the expected shape
    #[error("Invalid response from engine: {reason}")]
    InvalidResponse { reason: String },

    /// Engine could not describe an uploaded document
    #[error("Metadata unavailable for document {document_id} ({status}): {reason}")]
    MetadataUnavailable {
        document_id: String,
        status: u16,
        reason: String,
    },

    /// Engine refused the uploaded document
    #[error("Upload rejected ({status}): {reason}")]
    UploadRejected { status: u16, reason: String },

    /// Engine refused the submitted manifest
    #[error("Manifest rejected ({status}): {reason}")]
    SubmissionRejected { status: u16, reason: String },

    /// Engine could not report status for a job
    #[error("Status unavailable for job {job_id} ({status}): {reason}")]
    StatusUnavailable {
        job_id: String,
        status: u16,
        reason: String,
    },

    /// Engine reported the job as failed
    #[error("Job {job_id} failed: {}", reason.as_deref().unwrap_or("no reason reported"))]
    JobFailed {
        job_id: String,
        reason: Option<String>,
    },

    /// Artifact could not be downloaded
    #[error("Artifact for job {job_id} unavailable ({status}): {reason}")]
    ArtifactUnavailable {
        job_id: String,
        status: u16,
        reason: String,
    },

    /// Artifact exceeds the configured download cap
    #[error("Artifact too large: {size} bytes (max: {max_size} bytes)")]
    ArtifactTooLarge { size: u64, max_size: u64 },

    /// Upload exceeds the configured size cap
    #[error("Upload too large: {size} bytes (max: {max_size} bytes)")]
    UploadTooLarge { size: u64, max_size: u64 },

    /// Operation attempted in the wrong job phase
    #[error("Cannot {operation} job {job_id} in phase {phase}")]
    InvalidJobState {
        job_id: String,
        phase: String,
        operation: &'static str,
    },

    /// Polling gave up before the job reached a terminal status
    #[error("Job {job_id} still running after {elapsed:?}")]
    PollTimeout { job_id: String, elapsed: Duration },

    /// Base URL cannot carry path segments
    #[error("Invalid base URL: {url}")]
    InvalidBaseUrl { url: String },

    /// Page preview rendering failed
    #[error("Render error: {reason}")]
    Render { reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

}

impl Error {
    /// Whether retrying the same call unchanged may succeed.
    ///
    /// Only transport failures qualify. Rejections need a corrected request,
    /// and a failed job is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Return a sanitized error message safe to show to end users.
    /// Engine-provided reasons are kept verbatim; library internals are omitted.
    pub fn client_message(&self) -> String {
        match self {
            Error::Validation(e) => e.to_string(),
            Error::Transport(_) => "Could not reach the processing service".to_string(),
            Error::InvalidResponse { .. } => {
                "Unexpected response from the processing service".to_string()
            }
            Error::MetadataUnavailable { reason, .. } => format!("Document unavailable: {}", reason),
            Error::UploadRejected { reason, .. } => format!("Upload rejected: {}", reason),
            Error::SubmissionRejected { reason, .. } => format!("Edits rejected: {}", reason),
            Error::StatusUnavailable { reason, .. } => format!("Job status unavailable: {}", reason),
            Error::JobFailed { reason, .. } => match reason {
                Some(reason) => format!("Job failed: {}", reason),
                None => "Job failed".to_string(),
            },
            Error::ArtifactUnavailable { reason, .. } => {
                format!("Result unavailable: {}", reason)
            }
            Error::ArtifactTooLarge { max_size, .. } => {
                format!("Result exceeds maximum size of {} bytes", max_size)
            }
            Error::UploadTooLarge { max_size, .. } => {
                format!("Document exceeds maximum size of {} bytes", max_size)
            }
            Error::InvalidJobState { .. } => "Job is not ready".to_string(),
            Error::PollTimeout { .. } => "Job is taking too long".to_string(),
            Error::InvalidBaseUrl { .. } => "Invalid service address".to_string(),
            Error::Render { .. } => "Page preview failed".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
        }
    }
}
