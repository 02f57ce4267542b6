//! The three UI surfaces the coordinator writes to.
//!
//! The desktop shell implements these on its panes; tests implement them
//! with recorders. All calls happen on the UI thread.

use std::path::{Path, PathBuf};

use shared::DestinationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStyle {
    Normal,
    User,
    Status,
    Warning,
    Error,
}

/// Chat transcript.
///
/// `stream_started` opens an append-only region, `stream_chunk` appends raw
/// text to it and `stream_finished` lets the transcript re-render the region.
pub trait Transcript {
    fn add_message(&mut self, sender: &str, text: &str, style: MessageStyle);
    fn stream_started(&mut self, sender: &str, destination: DestinationKind);
    fn stream_chunk(&mut self, text: &str);
    fn stream_finished(&mut self, sender: &str, destination: DestinationKind);
    fn stream_error(&mut self, message: &str, destination: DestinationKind);
}

/// Text editor with tabs.
pub trait EditorBuffer {
    fn has_open_tab(&self) -> bool;
    /// Path of the active tab, if it is backed by a file.
    fn current_path(&self) -> Option<PathBuf>;
    /// Content of the active tab, `None` when no tab is open.
    fn current_content(&self) -> Option<String>;
    fn open_file(&mut self, path: &Path) -> anyhow::Result<()>;
    /// Clears the active buffer for incoming text.
    fn stream_started(&mut self, sender: &str);
    fn stream_chunk(&mut self, text: &str);
    /// Marks the buffer modified.
    fn stream_finished(&mut self, sender: &str);
    fn stream_error(&mut self, message: &str);
}

pub trait FileBrowser {
    fn current_dir(&self) -> PathBuf;
    fn refresh(&mut self);
}

/// Borrowed view of all surfaces for one controller call.
pub struct Surfaces<'a> {
    pub transcript: &'a mut dyn Transcript,
    pub editor: &'a mut dyn EditorBuffer,
    pub files: &'a mut dyn FileBrowser,
}
