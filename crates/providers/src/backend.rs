use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ProviderError;

/// Incremental response items of one streaming call.
pub type ChunkStream = BoxStream<'static, Result<ResponseChunk, ProviderError>>;

/// Content-safety verdict attached to a response chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyBlock {
    pub reason: String,
    pub category: String,
}

/// One partial response, reduced to what the coordinator consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseChunk {
    /// Text payload, if the chunk carried any.
    pub text: Option<String>,
    /// Set when the API reports the response was blocked.
    pub block: Option<SafetyBlock>,
}

impl ResponseChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            block: None,
        }
    }

    pub fn blocked(reason: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: None,
            block: Some(SafetyBlock {
                reason: reason.into(),
                category: category.into(),
            }),
        }
    }
}

/// A model advertised by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Full resource name, e.g. "models/gemini-1.5-flash".
    pub name: String,
    pub display_name: Option<String>,
    pub generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Short id usable in request URLs, when the name has the `models/` prefix.
    pub fn short_id(&self) -> Option<&str> {
        self.name.strip_prefix("models/")
    }

    pub fn supports(&self, method: &str) -> bool {
        self.generation_methods.iter().any(|m| m == method)
    }
}

/// Narrow contract the session coordinator needs from a generative API.
///
/// Implementations resolve credentials on every call; nothing is cached
/// between streams.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Start a streaming generation. Errors returned here happen before any
    /// chunk was produced.
    async fn stream_generate(&self, model: &str, prompt: &str)
        -> Result<ChunkStream, ProviderError>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError>;
}
