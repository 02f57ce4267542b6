//! Fakes shared by the coordinator tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use providers::{ChunkStream, GenerativeBackend, ModelInfo, ProviderError, ResponseChunk};
use shared::DestinationKind;

use crate::controller::SessionController;
use crate::surfaces::{EditorBuffer, FileBrowser, MessageStyle, Surfaces, Transcript};

pub type Gate = UnboundedSender<Result<ResponseChunk, ProviderError>>;

/// What the next `stream_generate` call returns.
pub enum Script {
    Items(Vec<Result<ResponseChunk, ProviderError>>),
    /// Items arrive only when the test pushes them through the gate.
    Gated(BoxStream<'static, Result<ResponseChunk, ProviderError>>),
    FailToStart(ProviderError),
}

impl Script {
    pub fn chunks(texts: &[&str]) -> Self {
        Script::Items(texts.iter().map(|t| Ok(ResponseChunk::text(*t))).collect())
    }

    pub fn gated() -> (Gate, Self) {
        let (tx, rx) = unbounded();
        (tx, Script::Gated(rx.boxed()))
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    prompts: Mutex<Vec<(String, String)>>,
    models: Vec<ModelInfo>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            ..Default::default()
        })
    }

    pub fn with_models(models: Vec<ModelInfo>) -> Arc<Self> {
        Arc::new(Self {
            models,
            ..Default::default()
        })
    }

    /// `(model, prompt)` of every stream started so far.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<ChunkStream, ProviderError> {
        self.prompts
            .lock()
            .push((model.to_string(), prompt.to_string()));
        let script = self.scripts.lock().pop_front();
        match script {
            Some(Script::Items(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(Script::Gated(stream)) => Ok(stream),
            Some(Script::FailToStart(err)) => Err(err),
            None => Err(ProviderError::Other("no scripted response left".into())),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(self.models.clone())
    }
}

#[derive(Default)]
pub struct RecordingTranscript {
    pub messages: Vec<(String, String, MessageStyle)>,
    /// Every streaming call, e.g. `started:chat`, `chunk:abc`.
    pub stream_log: Vec<String>,
}

impl RecordingTranscript {
    pub fn has_message(&self, style: MessageStyle, needle: &str) -> bool {
        self.messages
            .iter()
            .any(|(_, text, s)| *s == style && text.contains(needle))
    }

    pub fn streamed_text(&self) -> String {
        self.stream_log
            .iter()
            .filter_map(|e| e.strip_prefix("chunk:"))
            .collect()
    }
}

impl Transcript for RecordingTranscript {
    fn add_message(&mut self, sender: &str, text: &str, style: MessageStyle) {
        self.messages.push((sender.to_string(), text.to_string(), style));
    }

    fn stream_started(&mut self, _sender: &str, destination: DestinationKind) {
        self.stream_log.push(format!("started:{destination}"));
    }

    fn stream_chunk(&mut self, text: &str) {
        self.stream_log.push(format!("chunk:{text}"));
    }

    fn stream_finished(&mut self, _sender: &str, destination: DestinationKind) {
        self.stream_log.push(format!("finished:{destination}"));
    }

    fn stream_error(&mut self, message: &str, destination: DestinationKind) {
        self.stream_log.push(format!("error:{destination}:{message}"));
    }
}

#[derive(Default)]
pub struct FakeEditor {
    pub tab_open: bool,
    pub path: Option<PathBuf>,
    pub content: String,
    pub modified: bool,
    pub fail_open: bool,
    pub opened: Vec<PathBuf>,
    pub errors: Vec<String>,
    pub starts: usize,
}

impl EditorBuffer for FakeEditor {
    fn has_open_tab(&self) -> bool {
        self.tab_open
    }

    fn current_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn current_content(&self) -> Option<String> {
        self.tab_open.then(|| self.content.clone())
    }

    fn open_file(&mut self, path: &Path) -> anyhow::Result<()> {
        if self.fail_open {
            anyhow::bail!("permission denied");
        }
        self.content = std::fs::read_to_string(path)?;
        self.path = Some(path.to_path_buf());
        self.tab_open = true;
        self.modified = false;
        self.opened.push(path.to_path_buf());
        Ok(())
    }

    fn stream_started(&mut self, _sender: &str) {
        self.starts += 1;
        self.content.clear();
    }

    fn stream_chunk(&mut self, text: &str) {
        self.content.push_str(text);
    }

    fn stream_finished(&mut self, _sender: &str) {
        self.modified = true;
    }

    fn stream_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

pub struct FakeBrowser {
    pub dir: PathBuf,
    pub refreshes: usize,
}

impl FileBrowser for FakeBrowser {
    fn current_dir(&self) -> PathBuf {
        self.dir.clone()
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }
}

pub struct Harness {
    pub transcript: RecordingTranscript,
    pub editor: FakeEditor,
    pub files: FakeBrowser,
}

impl Harness {
    pub fn new(dir: &Path) -> Self {
        Self {
            transcript: RecordingTranscript::default(),
            editor: FakeEditor::default(),
            files: FakeBrowser {
                dir: dir.to_path_buf(),
                refreshes: 0,
            },
        }
    }

    pub fn surfaces(&mut self) -> Surfaces<'_> {
        Surfaces {
            transcript: &mut self.transcript,
            editor: &mut self.editor,
            files: &mut self.files,
        }
    }

    pub fn send(&mut self, controller: &mut SessionController, text: &str) {
        controller.handle_user_message(text, &mut self.surfaces());
    }

    /// Process events until every worker, stale ones included, has reported
    /// its terminal event.
    pub fn settle(&mut self, controller: &mut SessionController) {
        while controller.pending_workers() > 0 {
            let got = controller.wait_for_event(Duration::from_secs(5), &mut self.surfaces());
            assert!(got, "timed out waiting for a stream event");
        }
    }

    /// Process exactly one event.
    pub fn step(&mut self, controller: &mut SessionController) {
        let got = controller.wait_for_event(Duration::from_secs(5), &mut self.surfaces());
        assert!(got, "timed out waiting for a stream event");
    }
}
