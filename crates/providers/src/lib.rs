//! Providers - clients for the generative language API
//!
//! The coordinator only talks to [`GenerativeBackend`]; [`gemini::GeminiBackend`]
//! is the production implementation.

pub mod backend;
pub mod error;
pub mod gemini;
pub mod sse;

pub use backend::{ChunkStream, GenerativeBackend, ModelInfo, ResponseChunk, SafetyBlock};
pub use error::ProviderError;
pub use gemini::GeminiBackend;
