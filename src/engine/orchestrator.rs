//! Job orchestration
//!
//! Drives one submission through its lifecycle:
//!
//! ```text
//! submit ─▶ Submitted ─poll─▶ Processing ─poll─▶ Completed ─fetch─▶ Done
//!                  └──────────────poll────────────▶ Failed
//! ```
//!
//! The phase always mirrors the last status the engine reported; nothing
//! here advances a job on its own. Polling takes the job by `&mut`, so two
//! status queries for the same job can never be in flight at once.

use crate::engine::poll::{Backoff, PollPolicy};
use crate::engine::{DocumentId, FileMeta, JobId, JobStatus, ProcessingEngine};
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::preview::{PageRenderer, Previewer, Thumbnail};
use crate::session::Session;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Client-side view of where a job stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPhase {
    /// Accepted by the engine, not yet reported as running
    Submitted,
    Processing,
    /// Artifact ready to fetch
    Completed,
    /// Terminal; reason exactly as the engine reported it
    Failed { reason: Option<String> },
    /// Artifact retrieved
    Done,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobPhase::Completed | JobPhase::Failed { .. } | JobPhase::Done
        )
    }

    fn from_status(status: JobStatus, message: Option<String>) -> Self {
        match status {
            JobStatus::Queued => JobPhase::Submitted,
            JobStatus::Processing => JobPhase::Processing,
            JobStatus::Completed => JobPhase::Completed,
            JobStatus::Failed => JobPhase::Failed { reason: message },
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobPhase::Submitted => "submitted",
            JobPhase::Processing => "processing",
            JobPhase::Completed => "completed",
            JobPhase::Failed { .. } => "failed",
            JobPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// A submitted job being followed by this client
#[derive(Debug)]
pub struct TrackedJob {
    id: JobId,
    document_id: DocumentId,
    submitted_at: DateTime<Utc>,
    phase: JobPhase,
    last_status: Option<JobStatus>,
    polls: u32,
}

impl TrackedJob {
    fn new(id: JobId, document_id: DocumentId) -> Self {
        Self {
            id,
            document_id,
            submitted_at: Utc::now(),
            phase: JobPhase::Submitted,
            last_status: None,
            polls: 0,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn phase(&self) -> &JobPhase {
        &self.phase
    }

    /// Status from the most recent poll, if any
    pub fn last_status(&self) -> Option<JobStatus> {
        self.last_status
    }

    /// Number of status queries sent for this job
    pub fn poll_count(&self) -> u32 {
        self.polls
    }

    fn invalid_state(&self, operation: &'static str) -> Error {
        Error::InvalidJobState {
            job_id: self.id.to_string(),
            phase: self.phase.to_string(),
            operation,
        }
    }
}

/// Result file of a completed job
#[derive(Debug, Clone)]
pub struct Artifact {
    pub job_id: JobId,
    pub data: Vec<u8>,
}

/// A freshly uploaded document, ready for editing
#[derive(Debug)]
pub struct OpenedDocument {
    pub session: Session,
    /// One thumbnail per page, in document order
    pub previews: Vec<Thumbnail>,
}

/// Submits manifests and follows the resulting jobs
pub struct JobOrchestrator<E> {
    engine: E,
}

impl<E: ProcessingEngine> JobOrchestrator<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Upload a document without rendering previews
    pub async fn upload_document(&self, file_name: &str, data: Vec<u8>) -> Result<DocumentId> {
        self.engine.upload(file_name, data).await
    }

    /// Upload a document, render its previews and start a session for it
    pub async fn open_document<R>(
        &self,
        file_name: &str,
        data: Vec<u8>,
        previewer: &Previewer<R>,
    ) -> Result<OpenedDocument>
    where
        R: PageRenderer + Clone + Send + 'static,
    {
        let data: Arc<[u8]> = Arc::from(data);
        let document_id = self.engine.upload(file_name, data.to_vec()).await?;
        let previews = previewer
            .render_document(document_id.as_str(), Arc::clone(&data))
            .await?;

        tracing::info!(
            document_id = %document_id,
            pages = previews.len(),
            "document opened"
        );
        let session = Session::new(document_id, previews.len() as u32);
        Ok(OpenedDocument { session, previews })
    }

    /// [`open_document`](Self::open_document) for a file on disk
    pub async fn open_document_file<R>(
        &self,
        path: impl AsRef<Path>,
        previewer: &Previewer<R>,
    ) -> Result<OpenedDocument>
    where
        R: PageRenderer + Clone + Send + 'static,
    {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        self.open_document(&file_name, data, previewer).await
    }

    /// Start a session for a document the engine already holds, sized from
    /// the engine's own page count
    pub async fn resume_session(&self, document_id: DocumentId) -> Result<(Session, FileMeta)> {
        let meta = self.engine.file_meta(&document_id).await?;
        tracing::info!(
            document_id = %document_id,
            pages = meta.page_count,
            "session resumed"
        );
        let session = Session::new(document_id, meta.page_count);
        Ok((session, meta))
    }

    /// End a session and drop its cached previews.
    ///
    /// Returns the job the session was still waiting on, if any.
    pub fn close_document<R>(&self, session: Session, previewer: &Previewer<R>) -> Option<JobId>
    where
        R: PageRenderer + Clone + Send + 'static,
    {
        previewer.release(session.document_id().as_str());
        tracing::debug!(document_id = %session.document_id(), "document closed");
        session.current_job().cloned()
    }

    /// Submit a manifest. Every call creates a new, independent job.
    pub async fn submit(&self, document_id: &DocumentId, manifest: &Manifest) -> Result<TrackedJob> {
        let job_id = self.engine.submit(document_id, manifest).await?;
        tracing::info!(
            job_id = %job_id,
            document_id = %document_id,
            operations = manifest.operation_count(),
            "job submitted"
        );
        Ok(TrackedJob::new(job_id, document_id.clone()))
    }

    /// Submit the session's current manifest and record the job on the session
    pub async fn submit_session(&self, session: &mut Session) -> Result<TrackedJob> {
        let manifest = session.build_manifest();
        let job = self.submit(session.document_id(), &manifest).await?;
        session.record_job(job.id().clone());
        Ok(job)
    }

    /// Query the engine once and move the job to the reported phase.
    ///
    /// A job already known to be completed or failed is not queried again.
    pub async fn poll(&self, job: &mut TrackedJob) -> Result<JobPhase> {
        match &job.phase {
            JobPhase::Done => return Err(job.invalid_state("poll")),
            phase if phase.is_terminal() => return Ok(phase.clone()),
            _ => {}
        }

        let report = self.engine.job_status(&job.id).await?;
        job.polls += 1;
        job.last_status = Some(report.status);
        job.phase = JobPhase::from_status(report.status, report.message);

        tracing::debug!(
            job_id = %job.id,
            status = %report.status,
            polls = job.polls,
            "job polled"
        );
        if let JobPhase::Failed { reason } = &job.phase {
            tracing::warn!(job_id = %job.id, reason = ?reason, "job failed");
        }
        Ok(job.phase.clone())
    }

    /// Poll on `policy`'s schedule until the job completes.
    ///
    /// A failed job is returned as [`Error::JobFailed`]. Transport errors are
    /// retried up to the policy's budget; anything else ends the wait.
    pub async fn wait(&self, job: &mut TrackedJob, policy: &PollPolicy) -> Result<()> {
        let mut backoff = Backoff::new(policy);
        loop {
            match self.poll(job).await {
                Ok(JobPhase::Completed) => return Ok(()),
                Ok(JobPhase::Failed { reason }) => {
                    return Err(Error::JobFailed {
                        job_id: job.id.to_string(),
                        reason,
                    })
                }
                Ok(_) => backoff.record_success(),
                Err(e) if e.is_retryable() && backoff.record_failure() => {
                    tracing::warn!(job_id = %job.id, error = %e, "status query failed, retrying");
                }
                Err(e) => return Err(e),
            }

            if !backoff.wait().await {
                return Err(Error::PollTimeout {
                    job_id: job.id.to_string(),
                    elapsed: backoff.elapsed(),
                });
            }
        }
    }

    /// Download the artifact of a completed job.
    ///
    /// On failure the job stays completed and the fetch may be retried.
    pub async fn fetch_artifact(&self, job: &mut TrackedJob) -> Result<Artifact> {
        if job.phase != JobPhase::Completed {
            return Err(job.invalid_state("fetch"));
        }

        let data = self.engine.download(&job.id).await?;
        job.phase = JobPhase::Done;
        tracing::info!(job_id = %job.id, bytes = data.len(), "artifact retrieved");
        Ok(Artifact {
            job_id: job.id.clone(),
            data,
        })
    }

    /// Submit the session, wait for the job and fetch its artifact once.
    ///
    /// The session's job reference is cleared once the job is settled: after
    /// a successful fetch, or when the engine reports failure.
    pub async fn run(&self, session: &mut Session, policy: &PollPolicy) -> Result<Artifact> {
        let mut job = self.submit_session(session).await?;

        if let Err(e) = self.wait(&mut job, policy).await {
            if matches!(e, Error::JobFailed { .. }) {
                session.clear_job();
            }
            return Err(e);
        }

        let artifact = self.fetch_artifact(&mut job).await?;
        session.clear_job();
        Ok(artifact)
    }
}
