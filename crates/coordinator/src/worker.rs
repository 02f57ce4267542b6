//! One streaming generation on its own thread.
//!
//! The worker never touches UI state. Everything it has to say goes through
//! the event channel: `Started`, any number of `Chunk`s, then exactly one
//! `Finished` or `Failed`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use futures::StreamExt;
use parking_lot::Mutex;
use providers::{GenerativeBackend, ProviderError};
use shared::DestinationKind;

use crate::context::SessionId;

#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub model: String,
    pub prompt: String,
    pub destination: DestinationKind,
    pub sender: String,
    /// Only meaningful for [`DestinationKind::FileCreate`].
    pub create_filename: Option<String>,
}

/// Successful terminal payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub destination: DestinationKind,
    /// Set exactly when a file-create stream with a filename completed.
    pub created_file: Option<String>,
}

impl Completion {
    fn for_request(request: &StreamRequest) -> Self {
        let created_file = match request.destination {
            DestinationKind::FileCreate => request.create_filename.clone(),
            _ => None,
        };
        Self {
            destination: request.destination,
            created_file,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StreamEventKind {
    Started {
        sender: String,
        destination: DestinationKind,
    },
    Chunk(String),
    Finished {
        sender: String,
        completion: Completion,
    },
    Failed {
        error: ProviderError,
        destination: DestinationKind,
    },
}

impl StreamEventKind {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEventKind::Finished { .. } | StreamEventKind::Failed { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub session: SessionId,
    pub kind: StreamEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Finished,
    Failed,
}

/// Handle to a running stream. Dropping it does not stop the thread; call
/// [`StreamWorker::cancel`] for that.
pub struct StreamWorker {
    session: SessionId,
    cancelled: Arc<AtomicBool>,
    abort: AbortHandle,
    state: Arc<Mutex<WorkerState>>,
    thread: Option<JoinHandle<()>>,
}

impl StreamWorker {
    pub fn spawn(
        session: SessionId,
        request: StreamRequest,
        backend: Arc<dyn GenerativeBackend>,
        events: Sender<StreamEvent>,
    ) -> std::io::Result<Self> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(WorkerState::Idle));
        let (abort, abort_reg) = AbortHandle::new_pair();

        let job = Job {
            session,
            request,
            backend,
            events,
            cancelled: cancelled.clone(),
            state: state.clone(),
        };
        let thread = std::thread::Builder::new()
            .name(format!("stream-{}", session.0))
            .spawn(move || job.run(abort_reg))?;

        Ok(Self {
            session,
            cancelled,
            abort,
            state,
            thread: Some(thread),
        })
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Request cancellation. The worker still emits its own terminal
    /// `Failed(Cancelled)` event later.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.abort.abort();
    }

    /// Wait for the thread to exit. Only called once the terminal event for
    /// this session has been received, so it does not block for long.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("stream worker {} panicked", self.session);
            }
        }
    }
}

struct Job {
    session: SessionId,
    request: StreamRequest,
    backend: Arc<dyn GenerativeBackend>,
    events: Sender<StreamEvent>,
    cancelled: Arc<AtomicBool>,
    state: Arc<Mutex<WorkerState>>,
}

impl Job {
    fn send(&self, kind: StreamEventKind) {
        // The receiver only disappears when the controller is gone.
        let _ = self.events.send(StreamEvent {
            session: self.session,
            kind,
        });
    }

    fn run(self, abort_reg: AbortRegistration) {
        *self.state.lock() = WorkerState::Running;
        self.send(StreamEventKind::Started {
            sender: self.request.sender.clone(),
            destination: self.request.destination,
        });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.execute(abort_reg)
        }))
        .unwrap_or_else(|_| Err(ProviderError::Other("stream worker panicked".to_string())));

        let outcome = if self.cancelled.load(Ordering::SeqCst) {
            Err(ProviderError::Cancelled)
        } else {
            outcome
        };

        match outcome {
            Ok(()) => {
                *self.state.lock() = WorkerState::Finished;
                tracing::info!("session {} finished", self.session);
                self.send(StreamEventKind::Finished {
                    sender: self.request.sender.clone(),
                    completion: Completion::for_request(&self.request),
                });
            }
            Err(error) => {
                *self.state.lock() = WorkerState::Failed;
                if error.is_cancelled() {
                    tracing::info!("session {} cancelled", self.session);
                } else {
                    tracing::warn!("session {} failed: {}", self.session, error);
                }
                self.send(StreamEventKind::Failed {
                    error,
                    destination: self.request.destination,
                });
            }
        }
    }

    fn execute(&self, abort_reg: AbortRegistration) -> Result<(), ProviderError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to start async runtime: {e}")))?;
        rt.block_on(Abortable::new(self.consume(), abort_reg))
            .unwrap_or(Err(ProviderError::Cancelled))
    }

    async fn consume(&self) -> Result<(), ProviderError> {
        let mut stream = self
            .backend
            .stream_generate(&self.request.model, &self.request.prompt)
            .await?;

        while let Some(item) = stream.next().await {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(ProviderError::Cancelled);
            }
            let chunk = item?;
            if let Some(block) = chunk.block {
                return Err(ProviderError::SafetyBlocked {
                    reason: block.reason,
                    category: block.category,
                });
            }
            if let Some(text) = chunk.text.filter(|t| !t.is_empty()) {
                self.send(StreamEventKind::Chunk(text));
            }
        }
        Ok(())
    }
}
