//! Coordinator - the streaming session state machine
//!
//! This crate decides what each chat message means, runs at most one
//! streaming generation at a time off the UI thread, and routes the streamed
//! output to the chat transcript, the editor, or a file being created:
//! - [`SessionController`] owns the pending [`Context`] and the active session
//! - [`StreamWorker`] runs one generation on a background thread
//! - [`OutputRouter`] forwards stream events to exactly one surface

pub mod command;
pub mod context;
pub mod controller;
pub mod models;
pub mod prompts;
pub mod router;
pub mod surfaces;
pub mod worker;

#[cfg(test)]
mod testing;

pub use command::Command;
pub use context::{Context, EditorTarget, SessionId};
pub use controller::SessionController;
pub use models::ModelCatalog;
pub use router::{FileCreateBuffer, OutputRouter};
pub use surfaces::{EditorBuffer, FileBrowser, MessageStyle, Surfaces, Transcript};
pub use worker::{Completion, StreamEvent, StreamEventKind, StreamRequest, StreamWorker, WorkerState};

/// Sender label used for generated output.
pub const ASSISTANT_SENDER: &str = "Gemini";
/// Sender label used for notices produced by the application itself.
pub const SYSTEM_SENDER: &str = "GemNet";
/// Sender label used for error entries.
pub const ERROR_SENDER: &str = "Error";
