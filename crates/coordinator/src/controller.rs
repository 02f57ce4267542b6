//! The session controller: the single owner of [`Context`] and of the active
//! stream session.
//!
//! Everything here runs on the UI thread. Workers talk back only through the
//! event channel, which the UI drains with [`SessionController::poll_events`]
//! once per frame.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use providers::{GenerativeBackend, ProviderError};
use services::file_create::sanitize_requested_name;
use services::file_reader::{FileReader, ReadBatch, ReadFile};
use shared::settings::API_KEY_ENV;
use shared::DestinationKind;

use crate::command::Command;
use crate::context::{file_label, Context, EditorTarget, SessionId};
use crate::models;
use crate::prompts;
use crate::router::OutputRouter;
use crate::surfaces::{MessageStyle, Surfaces, Transcript};
use crate::worker::{Completion, StreamEvent, StreamEventKind, StreamRequest, StreamWorker};
use crate::{ASSISTANT_SENDER, ERROR_SENDER, SYSTEM_SENDER};

/// Routing metadata of the session whose events are currently accepted.
#[derive(Debug, Clone)]
struct ActiveSession {
    id: SessionId,
    destination: DestinationKind,
    create_filename: Option<String>,
}

pub struct SessionController {
    backend: Arc<dyn GenerativeBackend>,
    reader: FileReader,
    model: String,
    context: Context,
    /// Session that established the current context, if any.
    context_owner: Option<SessionId>,
    next_session: u64,
    active: Option<ActiveSession>,
    /// Every worker whose terminal event has not arrived yet, superseded
    /// ones included.
    workers: HashMap<SessionId, StreamWorker>,
    router: OutputRouter,
    events_tx: Sender<StreamEvent>,
    events_rx: Receiver<StreamEvent>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: impl Into<String>) -> Self {
        let (events_tx, events_rx) = channel();
        Self {
            backend,
            reader: FileReader::default(),
            model: model.into(),
            context: Context::None,
            context_owner: None,
            next_session: 1,
            active: None,
            workers: HashMap::new(),
            router: OutputRouter::new(),
            events_tx,
            events_rx,
        }
    }

    pub fn with_reader(mut self, reader: FileReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn backend(&self) -> Arc<dyn GenerativeBackend> {
        self.backend.clone()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        tracing::info!("model set to '{}'", self.model);
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_destination(&self) -> Option<DestinationKind> {
        self.active.as_ref().map(|a| a.destination)
    }

    /// Workers still expected to report a terminal event.
    pub fn pending_workers(&self) -> usize {
        self.workers.len()
    }

    /// Reports a missing API key once, without treating it as fatal.
    pub fn check_credentials(&self, transcript: &mut dyn Transcript) -> bool {
        let present = std::env::var(API_KEY_ENV)
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false);
        if !present {
            let err = ProviderError::MissingApiKey { var: API_KEY_ENV };
            tracing::warn!("{}", err);
            transcript.add_message(ERROR_SENDER, &err.to_string(), MessageStyle::Error);
        }
        present
    }

    /// Applies a freshly fetched model list and reports the outcome.
    pub fn apply_model_list(&mut self, ids: &[String], transcript: &mut dyn Transcript) {
        match models::reconcile(&self.model, ids) {
            Some(model) if model == self.model => {}
            Some(model) => {
                transcript.add_message(
                    SYSTEM_SENDER,
                    &format!("Model '{}' unavailable, using '{}'.", self.model, model),
                    MessageStyle::Status,
                );
                self.set_model(model);
            }
            None => {
                transcript.add_message(
                    SYSTEM_SENDER,
                    "No compatible models found.",
                    MessageStyle::Warning,
                );
                self.set_model("");
            }
        }
    }

    // --- user input -------------------------------------------------------

    /// Interprets one submitted chat message against the current context.
    /// Blank input is ignored.
    pub fn handle_user_message(&mut self, text: &str, s: &mut Surfaces<'_>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match std::mem::take(&mut self.context) {
            Context::AwaitingEditTargetInstruction { target_paths } => {
                self.context_owner = None;
                self.edit_files(&target_paths, text, s);
            }
            Context::AwaitingEditorInstruction { editor_target } => {
                self.context_owner = None;
                self.edit_editor(&editor_target, text, s);
            }
            Context::AwaitingCreateDescription { filename } => {
                self.context_owner = None;
                self.create_file(filename, text, s);
            }
            // A running create stream does not consume input.
            other => {
                self.context = other;
                self.handle_command(text, s);
            }
        }
    }

    /// File-pane "Explain".
    pub fn request_explanation(&mut self, paths: &[PathBuf], s: &mut Surfaces<'_>) {
        self.clear_context();
        let batch = self.read(paths, s);
        if batch.files.is_empty() {
            self.report(DestinationKind::Chat, "No files were read successfully to explain.", s);
            return;
        }
        let prompt = prompts::explain_files(&batch.files);
        self.launch(DestinationKind::Chat, prompt, None, s);
    }

    /// File-pane "Edit": opens the first path, then waits for instructions.
    pub fn request_edit(&mut self, paths: &[PathBuf], s: &mut Surfaces<'_>) {
        let Some(target) = paths.first() else {
            self.report(DestinationKind::Chat, "Cannot edit: no file selected.", s);
            self.clear_context();
            return;
        };
        self.supersede_active(s);
        if let Err(e) = s.editor.open_file(target) {
            self.report(
                DestinationKind::Chat,
                &format!("Error: Could not open '{}': {:#}", file_label(target), e),
                s,
            );
            self.clear_context();
            return;
        }
        self.set_context(
            Context::AwaitingEditTargetInstruction {
                target_paths: paths.to_vec(),
            },
            None,
        );
        s.transcript.add_message(
            SYSTEM_SENDER,
            &format!(
                "Editing '{}'. Provide instructions in next message.",
                file_label(target)
            ),
            MessageStyle::Status,
        );
    }

    /// User "Stop". The session's own `Failed(Cancelled)` event arrives later
    /// and is handled like any other terminal event.
    pub fn cancel_active(&mut self) {
        if let Some(active) = &self.active {
            if let Some(worker) = self.workers.get(&active.id) {
                tracing::info!("cancelling session {}", active.id);
                worker.cancel();
            }
        }
    }

    // --- worker events ----------------------------------------------------

    /// Drains pending events without blocking. Returns how many were handled.
    pub fn poll_events(&mut self, s: &mut Surfaces<'_>) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.process_event(event, s);
            handled += 1;
        }
        handled
    }

    /// Blocks up to `timeout` for one event. Returns false on timeout.
    pub fn wait_for_event(&mut self, timeout: Duration, s: &mut Surfaces<'_>) -> bool {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.process_event(event, s);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn process_event(&mut self, event: StreamEvent, s: &mut Surfaces<'_>) {
        let Some(active) = self.active.clone().filter(|a| a.id == event.session) else {
            tracing::debug!("dropping stale event from session {}", event.session);
            if event.kind.is_terminal() {
                self.reap(event.session);
            }
            return;
        };

        match event.kind {
            StreamEventKind::Started {
                sender,
                destination,
            } => {
                tracing::debug!("session {} started ({})", active.id, destination);
                self.router
                    .on_started(&sender, destination, active.create_filename.as_deref(), s);
            }
            StreamEventKind::Chunk(text) => self.router.on_chunk(active.destination, &text, s),
            StreamEventKind::Finished { sender, completion } => {
                self.active = None;
                self.reap(active.id);
                self.on_stream_finished(active.id, &sender, &completion, s);
            }
            StreamEventKind::Failed { error, destination } => {
                self.active = None;
                self.reap(active.id);
                self.on_stream_error(&error, destination, s);
            }
        }
    }

    fn on_stream_finished(
        &mut self,
        session: SessionId,
        sender: &str,
        completion: &Completion,
        s: &mut Surfaces<'_>,
    ) {
        self.router.on_finished(sender, completion, s);
        // A context armed after this session started belongs to someone else.
        if self.context_owner == Some(session) {
            self.clear_context();
        }
    }

    fn on_stream_error(
        &mut self,
        error: &ProviderError,
        destination: DestinationKind,
        s: &mut Surfaces<'_>,
    ) {
        self.router.on_failed(error, destination, s);
        self.clear_context();
    }

    // --- commands ---------------------------------------------------------

    fn handle_command(&mut self, text: &str, s: &mut Surfaces<'_>) {
        match Command::parse(text) {
            Command::Create(raw) => {
                let filename = sanitize_requested_name(raw);
                self.supersede_active(s);
                s.transcript.add_message(
                    SYSTEM_SENDER,
                    &format!(
                        "Creating '{filename}'. Provide description/content prompt in next message."
                    ),
                    MessageStyle::Status,
                );
                self.set_context(Context::AwaitingCreateDescription { filename }, None);
            }
            Command::Explain(name) => {
                let dir = s.files.current_dir();
                let path = dir.join(name);
                if path.is_file() {
                    self.request_explanation(&[path], s);
                } else {
                    self.report_not_found(name, &dir, s);
                }
            }
            Command::Edit(name) => {
                let dir = s.files.current_dir();
                let path = dir.join(name);
                if path.is_file() {
                    self.request_edit(&[path], s);
                } else {
                    self.report_not_found(name, &dir, s);
                }
            }
            Command::ExplainEditor => match s.editor.current_content() {
                Some(content) => {
                    self.clear_context();
                    let label = EditorTarget::from_tab_path(s.editor.current_path()).label();
                    let prompt = prompts::explain_editor(&label, &content);
                    self.launch(DestinationKind::Chat, prompt, None, s);
                }
                None => {
                    self.report(DestinationKind::Chat, "Error: No active editor tab found to explain.", s);
                    self.clear_waiting_context();
                }
            },
            Command::EditEditor => {
                if s.editor.has_open_tab() {
                    let editor_target = EditorTarget::from_tab_path(s.editor.current_path());
                    self.supersede_active(s);
                    s.transcript.add_message(
                        SYSTEM_SENDER,
                        &format!(
                            "Editing content of '{}'. Provide instructions in next message.",
                            editor_target.label()
                        ),
                        MessageStyle::Status,
                    );
                    self.set_context(Context::AwaitingEditorInstruction { editor_target }, None);
                } else {
                    self.report(DestinationKind::Chat, "Error: No active editor tab found to edit.", s);
                    self.clear_waiting_context();
                }
            }
            Command::Usage(usage) => {
                self.report(DestinationKind::Chat, usage, s);
                self.clear_waiting_context();
            }
            Command::Chat(message) => {
                self.clear_context();
                self.launch(DestinationKind::Chat, prompts::chat(message), None, s);
            }
        }
    }

    fn edit_files(&mut self, target_paths: &[PathBuf], instructions: &str, s: &mut Surfaces<'_>) {
        let Some(target) = target_paths.first() else {
            self.report(
                DestinationKind::Chat,
                "Internal Error: Edit context lost file information.",
                s,
            );
            self.clear_context();
            return;
        };

        let batch = self.read(target_paths, s);
        let Some(target_file) = batch.files.iter().find(|f| &f.path == target) else {
            self.report(
                DestinationKind::Editor,
                &format!("Could not read '{}' for editing.", file_label(target)),
                s,
            );
            self.clear_context();
            return;
        };
        let supplementary: Vec<&ReadFile> = batch
            .files
            .iter()
            .filter(|f| &f.path != target)
            .collect();
        let prompt = prompts::edit(
            &target_file.file_name(),
            &target_file.content,
            instructions,
            &supplementary,
        );
        self.launch(DestinationKind::Editor, prompt, None, s);
    }

    fn edit_editor(&mut self, target: &EditorTarget, instructions: &str, s: &mut Surfaces<'_>) {
        match s.editor.current_content() {
            Some(content) => {
                let prompt = prompts::edit(&target.label(), &content, instructions, &[]);
                self.launch(DestinationKind::Editor, prompt, None, s);
            }
            None => {
                self.report(
                    DestinationKind::Editor,
                    "Cannot edit: No active editor tab found or content is inaccessible.",
                    s,
                );
                self.clear_context();
            }
        }
    }

    fn create_file(&mut self, filename: String, description: &str, s: &mut Surfaces<'_>) {
        if filename.trim().is_empty() {
            self.report(
                DestinationKind::Chat,
                "Internal Error: Create context lost filename information.",
                s,
            );
            self.clear_context();
            return;
        }
        let prompt = prompts::create_file(&filename, description);
        self.launch(DestinationKind::FileCreate, prompt, Some(filename), s);
    }

    // --- sessions ---------------------------------------------------------

    /// Starts a session, superseding any active one. The new session owns
    /// the resulting context: `CreatingFile` for file creation, none
    /// otherwise.
    fn launch(
        &mut self,
        destination: DestinationKind,
        prompt: String,
        create_filename: Option<String>,
        s: &mut Surfaces<'_>,
    ) -> Option<SessionId> {
        self.supersede_active(s);

        if self.model.trim().is_empty() {
            self.report(destination, "Error: No model selected.", s);
            self.clear_context();
            return None;
        }

        let id = SessionId(self.next_session);
        self.next_session += 1;
        let request = StreamRequest {
            model: self.model.clone(),
            prompt,
            destination,
            sender: ASSISTANT_SENDER.to_string(),
            create_filename: create_filename.clone(),
        };

        match StreamWorker::spawn(id, request, self.backend.clone(), self.events_tx.clone()) {
            Ok(worker) => {
                tracing::info!(
                    "session {} started: {} via {}",
                    id,
                    destination,
                    self.model
                );
                self.workers.insert(id, worker);
                let context = match (&create_filename, destination) {
                    (Some(filename), DestinationKind::FileCreate) => Context::CreatingFile {
                        filename: filename.clone(),
                    },
                    _ => Context::None,
                };
                self.active = Some(ActiveSession {
                    id,
                    destination,
                    create_filename,
                });
                self.set_context(context, Some(id));
                Some(id)
            }
            Err(e) => {
                tracing::warn!("could not spawn stream worker: {}", e);
                self.report(destination, &format!("Error: Could not start request: {e}"), s);
                self.clear_context();
                None
            }
        }
    }

    /// Cancels the active session and closes its output as cancelled. Its
    /// late events are stale from here on.
    fn supersede_active(&mut self, s: &mut Surfaces<'_>) {
        let Some(active) = self.active.take() else {
            return;
        };
        if let Some(worker) = self.workers.get(&active.id) {
            worker.cancel();
        }
        tracing::info!("session {} superseded", active.id);
        self.router
            .on_failed(&ProviderError::Cancelled, active.destination, s);
    }

    fn reap(&mut self, session: SessionId) {
        if let Some(worker) = self.workers.remove(&session) {
            worker.join();
        }
    }

    // --- helpers ----------------------------------------------------------

    fn set_context(&mut self, context: Context, owner: Option<SessionId>) {
        tracing::debug!("context -> {}", context.kind_name());
        self.context = context;
        self.context_owner = owner;
    }

    fn clear_context(&mut self) {
        self.set_context(Context::None, None);
    }

    /// Clears a context that is waiting for input. A context owned by a
    /// running session (`CreatingFile`) survives local command errors and
    /// ends with its session.
    fn clear_waiting_context(&mut self) {
        if self.context_owner.is_none() {
            self.clear_context();
        }
    }

    fn report(&mut self, destination: DestinationKind, message: &str, s: &mut Surfaces<'_>) {
        self.router.report_error(destination, message, s);
    }

    fn report_not_found(&mut self, name: &str, dir: &Path, s: &mut Surfaces<'_>) {
        self.report(
            DestinationKind::Chat,
            &format!("Error: File '{}' not found in '{}'.", name, file_label(dir)),
            s,
        );
        self.clear_waiting_context();
    }

    fn read(&self, paths: &[PathBuf], s: &mut Surfaces<'_>) -> ReadBatch {
        let batch = self.reader.read_files(paths);
        for skipped in &batch.skipped {
            s.transcript
                .add_message(SYSTEM_SENDER, &skipped.describe(), MessageStyle::Warning);
        }
        batch
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        for worker in self.workers.values() {
            worker.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, Script, ScriptedBackend};
    use providers::ResponseChunk;
    use std::fs;
    use tempfile::tempdir;

    fn controller(backend: &Arc<ScriptedBackend>) -> SessionController {
        SessionController::new(backend.clone(), "gemini-test")
    }

    #[test]
    fn create_round_trip_writes_concatenated_chunks() {
        let tmp = tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![Script::chunks(&["line one\n", "line two\n"])]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "/create foo.txt");
        assert_eq!(
            c.context(),
            &Context::AwaitingCreateDescription {
                filename: "foo.txt".into()
            }
        );
        assert!(!c.is_streaming());
        assert!(h.transcript.has_message(MessageStyle::Status, "Creating 'foo.txt'"));

        h.send(&mut c, "two short lines");
        assert_eq!(
            c.context(),
            &Context::CreatingFile {
                filename: "foo.txt".into()
            }
        );
        assert_eq!(c.active_destination(), Some(DestinationKind::FileCreate));
        h.settle(&mut c);

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].1.contains("foo.txt"));
        assert!(prompts[0].1.contains("two short lines"));
        assert_eq!(
            fs::read_to_string(tmp.path().join("foo.txt")).unwrap(),
            "line one\nline two\n"
        );
        assert!(c.context().is_none());
        assert_eq!(h.files.refreshes, 1);
    }

    #[test]
    fn create_collision_keeps_existing_file() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("foo.txt"), "original").unwrap();
        let backend = ScriptedBackend::new(vec![Script::chunks(&["generated"])]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "/create foo.txt");
        h.send(&mut c, "anything");
        h.settle(&mut c);

        assert_eq!(fs::read_to_string(tmp.path().join("foo.txt")).unwrap(), "original");
        assert_eq!(fs::read_to_string(tmp.path().join("foo_1.txt")).unwrap(), "generated");
    }

    #[test]
    fn edit_flow_end_to_end() {
        let tmp = tempdir().unwrap();
        let source = "def f():\n    return 1\n";
        fs::write(tmp.path().join("a.py"), source).unwrap();
        let backend = ScriptedBackend::new(vec![Script::chunks(&["def f():\n", "    \"\"\"One.\"\"\"\n"])]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "/edit a.py");
        assert_eq!(h.editor.opened, vec![tmp.path().join("a.py")]);
        assert!(matches!(
            c.context(),
            Context::AwaitingEditTargetInstruction { target_paths } if target_paths.len() == 1
        ));

        h.send(&mut c, "add a docstring");
        assert!(c.context().is_none());
        h.settle(&mut c);

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].1.contains("add a docstring"));
        assert!(prompts[0].1.contains(source));
        assert_eq!(h.editor.content, "def f():\n    \"\"\"One.\"\"\"\n");
        assert!(h.editor.modified);
        assert!(c.context().is_none());
    }

    #[test]
    fn file_pane_edit_includes_supplementary_files() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.py");
        let b = tmp.path().join("b.py");
        fs::write(&a, "import b").unwrap();
        fs::write(&b, "VALUE = 2").unwrap();
        let backend = ScriptedBackend::new(vec![Script::chunks(&["ok"])]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        c.request_edit(&[a.clone(), b], &mut h.surfaces());
        h.send(&mut c, "use the constant");
        h.settle(&mut c);

        let prompt = &backend.prompts()[0].1;
        assert!(prompt.contains("--- Content to Edit ('a.py' or Current Tab) ---\nimport b"));
        assert!(prompt.contains("--- Context File: b.py ---\nVALUE = 2"));
    }

    #[test]
    fn failed_open_clears_context() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.py");
        fs::write(&a, "x").unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());
        h.editor.fail_open = true;

        c.request_edit(&[a], &mut h.surfaces());
        assert!(c.context().is_none());
        assert!(h.transcript.has_message(MessageStyle::Error, "Could not open 'a.py'"));
    }

    #[test]
    fn stream_error_clears_every_kind_of_context() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.py"), "x = 1").unwrap();
        let backend = ScriptedBackend::new(vec![
            Script::FailToStart(ProviderError::QuotaExceeded("quota".into())),
            Script::Items(vec![
                Ok(ResponseChunk::text("partial")),
                Err(ProviderError::ServerError("boom".into())),
            ]),
        ]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "/create notes.md");
        h.send(&mut c, "meeting notes");
        assert!(matches!(c.context(), Context::CreatingFile { .. }));
        h.settle(&mut c);
        assert!(c.context().is_none());
        assert!(!tmp.path().join("notes.md").exists());

        h.send(&mut c, "/edit a.py");
        h.send(&mut c, "rename x");
        h.settle(&mut c);
        assert!(c.context().is_none());
        assert_eq!(h.editor.errors.len(), 1);
        assert!(h.transcript.has_message(MessageStyle::Error, "API Internal Server Error"));
    }

    #[test]
    fn stale_session_never_reaches_new_buffer() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.py"), "old").unwrap();
        let (gate, first) = Script::gated();
        let backend = ScriptedBackend::new(vec![first, Script::chunks(&["b1", "b2"])]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "/edit a.py");
        h.send(&mut c, "first instructions");
        gate.unbounded_send(Ok(ResponseChunk::text("a1"))).unwrap();
        h.step(&mut c); // started
        h.step(&mut c); // a1
        assert_eq!(h.editor.content, "a1");

        // a new command supersedes session A
        h.send(&mut c, "/edit a.py");
        assert!(h.editor.errors.iter().any(|e| e == "cancelled"));
        let _ = gate.unbounded_send(Ok(ResponseChunk::text("a2")));
        h.send(&mut c, "second instructions");
        h.settle(&mut c);

        assert_eq!(h.editor.content, "b1b2");
        assert_eq!(c.pending_workers(), 0);
        assert!(c.context().is_none());
    }

    #[test]
    fn stale_terminal_event_does_not_clear_new_context() {
        let tmp = tempdir().unwrap();
        let (gate, first) = Script::gated();
        let backend = ScriptedBackend::new(vec![first]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "tell me a story");
        h.step(&mut c); // started
        h.send(&mut c, "/create later.txt");
        drop(gate);
        h.settle(&mut c);

        assert_eq!(
            c.context(),
            &Context::AwaitingCreateDescription {
                filename: "later.txt".into()
            }
        );
    }

    #[test]
    fn safety_block_reaches_chat_as_error() {
        let tmp = tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![Script::Items(vec![Ok(ResponseChunk::blocked(
            "SAFETY",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ))])]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "something dubious");
        h.settle(&mut c);
        assert_eq!(h.transcript.stream_log.len(), 2);
        assert_eq!(
            h.transcript.stream_log[1],
            "error:chat:Blocked by safety filters. Reason: SAFETY. Category: HARM_CATEGORY_DANGEROUS_CONTENT."
        );
    }

    #[test]
    fn stop_cancels_and_clears_creating_context() {
        let tmp = tempdir().unwrap();
        let (gate, script) = Script::gated();
        let backend = ScriptedBackend::new(vec![script]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "/create big.txt");
        h.send(&mut c, "a long file");
        gate.unbounded_send(Ok(ResponseChunk::text("partial"))).unwrap();
        h.step(&mut c);
        h.step(&mut c);

        c.cancel_active();
        h.settle(&mut c);
        assert!(!c.is_streaming());
        assert!(c.context().is_none());
        assert!(!tmp.path().join("big.txt").exists());
        assert_eq!(h.transcript.stream_log.last().unwrap(), "error:file_create:cancelled");
    }

    #[test]
    fn local_errors_clear_context() {
        let tmp = tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "/explain missing.py");
        let dir = file_label(tmp.path());
        assert!(h.transcript.has_message(
            MessageStyle::Error,
            &format!("Error: File 'missing.py' not found in '{dir}'.")
        ));

        h.send(&mut c, "/edit_editor");
        assert!(h.transcript.has_message(MessageStyle::Error, "No active editor tab found to edit"));

        h.send(&mut c, "/create");
        assert!(h.transcript.has_message(MessageStyle::Error, "Usage: /create <filename>"));
        assert!(c.context().is_none());
        assert!(backend.prompts().is_empty());
    }

    #[test]
    fn local_errors_leave_running_create_alone() {
        let tmp = tempdir().unwrap();
        let (gate, script) = Script::gated();
        let backend = ScriptedBackend::new(vec![script]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "/create notes.txt");
        h.send(&mut c, "some notes");
        gate.unbounded_send(Ok(ResponseChunk::text("first "))).unwrap();
        h.step(&mut c);
        h.step(&mut c);

        let creating = Context::CreatingFile {
            filename: "notes.txt".into(),
        };
        for input in ["/explain missing.py", "/edit missing.py", "/explain_editor", "/edit_editor", "/create"] {
            h.send(&mut c, input);
            assert_eq!(c.context(), &creating, "after {input}");
            assert_eq!(c.active_destination(), Some(DestinationKind::FileCreate));
        }
        assert!(h.transcript.has_message(MessageStyle::Error, "'missing.py' not found"));
        assert!(h.transcript.has_message(MessageStyle::Error, "Usage: /create <filename>"));

        gate.unbounded_send(Ok(ResponseChunk::text("second"))).unwrap();
        drop(gate);
        h.settle(&mut c);
        assert_eq!(
            fs::read_to_string(tmp.path().join("notes.txt")).unwrap(),
            "first second"
        );
        assert!(c.context().is_none());
        assert_eq!(backend.prompts().len(), 1);
    }

    #[test]
    fn edit_editor_uses_open_buffer_not_disk() {
        let tmp = tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![Script::chunks(&["rewritten"])]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());
        h.editor.tab_open = true;
        h.editor.content = "unsaved scratch".into();

        h.send(&mut c, "/edit_editor");
        assert_eq!(
            c.context(),
            &Context::AwaitingEditorInstruction {
                editor_target: EditorTarget::CurrentTab
            }
        );
        h.send(&mut c, "make it formal");
        h.settle(&mut c);

        let prompt = &backend.prompts()[0].1;
        assert!(prompt.contains("unsaved scratch"));
        assert!(prompt.contains("'current tab'"));
        assert_eq!(h.editor.content, "rewritten");
    }

    #[test]
    fn editor_closed_before_instructions_is_reported_to_editor() {
        let tmp = tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());
        h.editor.tab_open = true;

        h.send(&mut c, "/edit_editor");
        h.editor.tab_open = false;
        h.send(&mut c, "anything");
        assert!(c.context().is_none());
        assert_eq!(h.editor.errors.len(), 1);
        assert!(backend.prompts().is_empty());
    }

    #[test]
    fn unknown_slash_command_is_chat() {
        let tmp = tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![Script::chunks(&["hi"])]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "/shrug");
        h.settle(&mut c);
        assert!(backend.prompts()[0].1.contains("User: /shrug"));
        assert_eq!(h.transcript.streamed_text(), "hi");
    }

    #[test]
    fn empty_model_fails_without_spawning() {
        let tmp = tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let mut c = SessionController::new(backend.clone(), "");
        let mut h = Harness::new(tmp.path());

        h.send(&mut c, "/create x.txt");
        h.send(&mut c, "whatever");
        assert!(!c.is_streaming());
        assert!(c.context().is_none());
        assert!(h.transcript.has_message(MessageStyle::Error, "No model selected"));
        assert!(backend.prompts().is_empty());
    }

    #[test]
    fn lost_context_payloads_are_internal_errors() {
        let tmp = tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let mut c = controller(&backend);
        let mut h = Harness::new(tmp.path());

        c.set_context(
            Context::AwaitingEditTargetInstruction {
                target_paths: vec![],
            },
            None,
        );
        h.send(&mut c, "do it");
        assert!(c.context().is_none());
        assert!(h.transcript.has_message(MessageStyle::Error, "Internal Error: Edit context"));

        c.set_context(
            Context::AwaitingCreateDescription {
                filename: String::new(),
            },
            None,
        );
        h.send(&mut c, "do it");
        assert!(c.context().is_none());
        assert!(h.transcript.has_message(MessageStyle::Error, "Internal Error: Create context"));
    }

    #[test]
    fn model_list_reconciliation_reports_changes() {
        let tmp = tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let mut c = SessionController::new(backend, "gemini-1.0-pro");
        let mut h = Harness::new(tmp.path());

        let ids = vec!["gemini-1.5-pro".to_string(), "gemini-1.5-flash".to_string()];
        c.apply_model_list(&ids, &mut h.transcript);
        assert_eq!(c.model(), "gemini-1.5-flash");

        c.apply_model_list(&[], &mut h.transcript);
        assert_eq!(c.model(), "");
        assert!(h.transcript.has_message(MessageStyle::Warning, "No compatible models"));
    }
}
