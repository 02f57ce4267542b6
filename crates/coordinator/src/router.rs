//! Forwards stream events of the active session to one surface.

use providers::ProviderError;
use services::file_create::{self, SaveLocation, SavedFile};
use shared::DestinationKind;

use crate::surfaces::{MessageStyle, Surfaces};
use crate::worker::Completion;
use crate::{ERROR_SENDER, SYSTEM_SENDER};

/// Text of a file-create stream, held until the stream ends.
#[derive(Debug, Default)]
pub struct FileCreateBuffer {
    filename: Option<String>,
    text: String,
}

impl FileCreateBuffer {
    pub fn reset(&mut self, filename: Option<&str>) {
        self.filename = filename.map(str::to_string);
        self.text.clear();
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn discard(&mut self) {
        self.reset(None);
    }

    fn take(&mut self) -> String {
        self.filename = None;
        std::mem::take(&mut self.text)
    }
}

#[derive(Debug, Default)]
pub struct OutputRouter {
    buffer: FileCreateBuffer,
}

impl OutputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &FileCreateBuffer {
        &self.buffer
    }

    pub fn on_started(
        &mut self,
        sender: &str,
        destination: DestinationKind,
        create_filename: Option<&str>,
        s: &mut Surfaces<'_>,
    ) {
        match destination {
            DestinationKind::Chat => s.transcript.stream_started(sender, destination),
            DestinationKind::Editor => s.editor.stream_started(sender),
            DestinationKind::FileCreate => {
                self.buffer.reset(create_filename);
                s.transcript.stream_started(sender, destination);
            }
        }
    }

    pub fn on_chunk(&mut self, destination: DestinationKind, text: &str, s: &mut Surfaces<'_>) {
        match destination {
            DestinationKind::Chat => s.transcript.stream_chunk(text),
            DestinationKind::Editor => s.editor.stream_chunk(text),
            DestinationKind::FileCreate => {
                s.transcript.stream_chunk(text);
                self.buffer.push(text);
            }
        }
    }

    /// Routes a successful end. For file-create streams this is where the
    /// buffered text is written to disk.
    pub fn on_finished(&mut self, sender: &str, completion: &Completion, s: &mut Surfaces<'_>) {
        match completion.destination {
            DestinationKind::Chat => s.transcript.stream_finished(sender, completion.destination),
            DestinationKind::Editor => s.editor.stream_finished(sender),
            DestinationKind::FileCreate => {
                s.transcript.stream_finished(sender, completion.destination);
                match &completion.created_file {
                    Some(name) => self.persist(name, s),
                    None => {
                        tracing::warn!("file-create stream finished without a filename");
                        self.buffer.discard();
                        s.transcript.add_message(
                            SYSTEM_SENDER,
                            "File creation did not complete; nothing was saved.",
                            MessageStyle::Warning,
                        );
                    }
                }
            }
        }
    }

    pub fn on_failed(
        &mut self,
        error: &ProviderError,
        destination: DestinationKind,
        s: &mut Surfaces<'_>,
    ) {
        let message = error.to_string();
        match destination {
            DestinationKind::Chat => s.transcript.stream_error(&message, destination),
            DestinationKind::Editor => {
                s.editor.stream_error(&message);
                s.transcript
                    .add_message(ERROR_SENDER, &format!("Edit failed: {message}"), MessageStyle::Error);
            }
            DestinationKind::FileCreate => {
                self.buffer.discard();
                s.transcript.stream_error(&message, destination);
            }
        }
    }

    /// Reports a local error (usage, missing file, internal) to `destination`.
    pub fn report_error(&mut self, destination: DestinationKind, message: &str, s: &mut Surfaces<'_>) {
        if destination == DestinationKind::Editor {
            s.editor.stream_error(message);
        }
        s.transcript
            .add_message(ERROR_SENDER, message, MessageStyle::Error);
    }

    fn persist(&mut self, requested_name: &str, s: &mut Surfaces<'_>) {
        let content = self.buffer.take();
        let browser_dir = s.files.current_dir();
        match file_create::save_generated_file(requested_name, &content, Some(&browser_dir)) {
            Ok(saved) => {
                announce_saved(requested_name, &saved, s);
                s.files.refresh();
            }
            Err(e) => {
                tracing::warn!("saving generated file failed: {}", e);
                s.transcript
                    .add_message(ERROR_SENDER, &e.to_string(), MessageStyle::Error);
            }
        }
    }
}

fn announce_saved(requested_name: &str, saved: &SavedFile, s: &mut Surfaces<'_>) {
    if saved.location == SaveLocation::WorkingDirNotWritable {
        s.transcript.add_message(
            SYSTEM_SENDER,
            &format!(
                "No write permission in the current folder. Saved '{}' to application directory.",
                saved.file_name
            ),
            MessageStyle::Warning,
        );
    }
    if saved.used_fallback_name {
        s.transcript.add_message(
            SYSTEM_SENDER,
            &format!(
                "Filename '{}' was invalid or unsafe, using '{}'.",
                requested_name, saved.sanitized_name
            ),
            MessageStyle::Warning,
        );
    }
    if saved.was_renamed() {
        s.transcript.add_message(
            SYSTEM_SENDER,
            &format!(
                "File '{}' already exists. Saved as '{}'.",
                saved.sanitized_name, saved.file_name
            ),
            MessageStyle::Warning,
        );
    }
    s.transcript.add_message(
        SYSTEM_SENDER,
        &format!("Created file: {}", saved.display_name()),
        MessageStyle::Status,
    );
}
