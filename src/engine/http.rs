//! HTTP/JSON client for the processing engine

use crate::engine::{
    ApplyResponse, DocumentId, FileMeta, JobId, JobStatusReport, ProcessingEngine, UploadResponse,
};
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use futures_util::StreamExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Connection and resource configuration for [`HttpEngine`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Engine root, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Per-request timeout (default: 60s)
    pub request_timeout: Duration,
    /// Maximum artifact download size in bytes (default: 100MB)
    pub max_artifact_bytes: u64,
    /// Maximum document upload size in bytes (default: 100MB)
    pub max_upload_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(60),
            max_artifact_bytes: 100 * 1024 * 1024, // 100MB
            max_upload_bytes: 100 * 1024 * 1024,   // 100MB
        }
    }
}

/// [`ProcessingEngine`] over the engine's REST API
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: Url,
    config: Arc<ClientConfig>,
}

impl HttpEngine {
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client for the engine at `base_url`, other settings default
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig {
            base_url: base_url.into(),
            ..ClientConfig::default()
        })
    }

    /// Create a client with full configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::InvalidBaseUrl {
                url: config.base_url.clone(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(Error::Transport)?;

        Ok(Self {
            client,
            base_url,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build `{base}/api/{segments..}`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| Error::InvalidBaseUrl {
                url: self.base_url.to_string(),
            })?;
            path.pop_if_empty().push("api").extend(segments);
        }
        Ok(url)
    }
}

/// Extract the engine's reason from an error response body.
///
/// A `{"detail": ...}` body yields the detail; any other body is passed
/// through; an empty body falls back to the status text.
fn rejection_reason(status: StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(obj)) = serde_json::from_str::<serde_json::Value>(body) {
        match obj.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(detail) => return detail.to_string(),
            None => {}
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.to_string()
    }
}

async fn read_rejection(response: reqwest::Response) -> (u16, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    (status.as_u16(), rejection_reason(status, &body))
}

/// Parse a success body. A body of the wrong shape is an engine fault, not
/// a connectivity one, so it is never retried.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| Error::InvalidResponse {
        reason: e.to_string(),
    })
}

impl ProcessingEngine for HttpEngine {
    async fn upload(&self, file_name: &str, data: Vec<u8>) -> Result<DocumentId> {
        let size = data.len() as u64;
        if size > self.config.max_upload_bytes {
            return Err(Error::UploadTooLarge {
                size,
                max_size: self.config.max_upload_bytes,
            });
        }

        let url = self.endpoint(&["upload"])?;
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!(url = %url, size, "uploading document");
        let response = self.client.post(url).multipart(form).send().await?;

        if !response.status().is_success() {
            let (status, reason) = read_rejection(response).await;
            tracing::warn!(status, reason = %reason, "upload rejected");
            return Err(Error::UploadRejected { status, reason });
        }

        let body: UploadResponse = read_json(response).await?;
        tracing::info!(document_id = %body.file_id, "document uploaded");
        Ok(body.file_id)
    }

    async fn file_meta(&self, document_id: &DocumentId) -> Result<FileMeta> {
        let url = self.endpoint(&["files", document_id.as_str(), "meta"])?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let (status, reason) = read_rejection(response).await;
            return Err(Error::MetadataUnavailable {
                document_id: document_id.to_string(),
                status,
                reason,
            });
        }

        read_json(response).await
    }

    async fn submit(&self, document_id: &DocumentId, manifest: &Manifest) -> Result<JobId> {
        let url = self.endpoint(&["files", document_id.as_str(), "apply"])?;

        tracing::debug!(url = %url, keys = ?manifest.keys(), "submitting manifest");
        let response = self.client.post(url).json(manifest).send().await?;

        if !response.status().is_success() {
            let (status, reason) = read_rejection(response).await;
            tracing::warn!(document_id = %document_id, status, reason = %reason, "manifest rejected");
            return Err(Error::SubmissionRejected { status, reason });
        }

        let body: ApplyResponse = read_json(response).await?;
        Ok(body.job_id)
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport> {
        let url = self.endpoint(&["jobs", job_id.as_str()])?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let (status, reason) = read_rejection(response).await;
            return Err(Error::StatusUnavailable {
                job_id: job_id.to_string(),
                status,
                reason,
            });
        }

        read_json(response).await
    }

    async fn download(&self, job_id: &JobId) -> Result<Vec<u8>> {
        let url = self.endpoint(&["jobs", job_id.as_str(), "download"])?;
        let max_size = self.config.max_artifact_bytes;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let (status, reason) = read_rejection(response).await;
            return Err(Error::ArtifactUnavailable {
                job_id: job_id.to_string(),
                status,
                reason,
            });
        }

        // Check Content-Length header for early rejection
        if let Some(content_length) = response.content_length() {
            if content_length > max_size {
                return Err(Error::ArtifactTooLarge {
                    size: content_length,
                    max_size,
                });
            }
        }

        // Stream the body so an unannounced oversize artifact is cut off early
        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Error::Transport)?;
            data.extend_from_slice(&chunk);
            if data.len() as u64 > max_size {
                return Err(Error::ArtifactTooLarge {
                    size: data.len() as u64,
                    max_size,
                });
            }
        }

        Ok(data)
    }
}
