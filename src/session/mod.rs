//! Editing session state
//!
//! The session binds a document identity, its page order, the current
//! selection and the accumulated operations. Interaction handlers mutate it
//! through [`Session::handle`]; everything else reads it.

mod coords;
mod order;
mod state;

pub use coords::{resolve_point, PreviewOffset, SelectedPoint};
pub use order::{is_permutation, PageOrder};
pub use state::{EditorEvent, EventOutcome, Session};
