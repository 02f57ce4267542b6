//! Model catalog: which models can be picked, fetched in the background.

use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;

use providers::{GenerativeBackend, ModelInfo, ProviderError};

const GENERATE_METHOD: &str = "generateContent";

/// Short ids of the models that support content generation.
pub fn chat_capable_ids(models: &[ModelInfo]) -> Vec<String> {
    models
        .iter()
        .filter(|m| m.supports(GENERATE_METHOD))
        .filter_map(|m| m.short_id().map(str::to_string))
        .collect()
}

/// Keeps `selected` when listed; otherwise the first "flash" model, else the
/// first model. `None` when there is nothing to pick.
pub fn reconcile(selected: &str, ids: &[String]) -> Option<String> {
    if ids.iter().any(|id| id == selected) {
        return Some(selected.to_string());
    }
    ids.iter()
        .find(|id| id.contains("flash"))
        .or_else(|| ids.first())
        .cloned()
}

#[derive(Default)]
pub struct ModelCatalog {
    ids: Vec<String>,
    pending: Option<Receiver<Result<Vec<ModelInfo>, ProviderError>>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts a background fetch unless one is already running.
    pub fn refresh(&mut self, backend: Arc<dyn GenerativeBackend>) {
        if self.pending.is_some() {
            return;
        }
        let (tx, rx) = channel();
        self.pending = Some(rx);
        std::thread::spawn(move || {
            let result = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt.block_on(backend.list_models()),
                Err(e) => Err(ProviderError::Other(format!(
                    "failed to start async runtime: {e}"
                ))),
            };
            let _ = tx.send(result);
        });
    }

    /// Returns the fetch outcome once it is available. On success the
    /// filtered ids are stored and returned.
    pub fn poll(&mut self) -> Option<Result<Vec<String>, ProviderError>> {
        let rx = self.pending.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                Err(ProviderError::Other("model list request was lost".into()))
            }
        };
        self.pending = None;
        match result {
            Ok(models) => {
                self.ids = chat_capable_ids(&models);
                tracing::info!("{} models available", self.ids.len());
                Some(Ok(self.ids.clone()))
            }
            Err(e) => {
                tracing::warn!("listing models failed: {}", e);
                Some(Err(e))
            }
        }
    }
}
