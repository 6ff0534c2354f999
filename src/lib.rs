//! PDF Edit Client Library
//!
//! This crate models interactive PDF edits and drives their execution on a
//! remote processing engine:
//! - `session`: page order, point selection and the editing event surface
//! - `manifest`: the operation catalog and the manifest it projects to
//! - `engine`: upload, submit, poll and download against the engine's HTTP API
//! - `preview`: page thumbnails rendered with PDFium

pub mod engine;
pub mod error;
pub mod manifest;
pub mod preview;
pub mod session;

pub use engine::{
    Artifact, ClientConfig, DocumentId, FileMeta, HttpEngine, JobId, JobOrchestrator, JobPhase,
    JobStatus, OpenedDocument, PollPolicy, ProcessingEngine, TrackedJob,
};
pub use error::{Error, Result, ValidationError};
pub use manifest::{EditOperation, Manifest};
pub use preview::{PdfiumRenderer, PreviewConfig, Previewer};
pub use session::{EditorEvent, EventOutcome, PreviewOffset, SelectedPoint, Session};
