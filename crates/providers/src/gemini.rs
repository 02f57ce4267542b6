use std::collections::VecDeque;
use std::env;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::settings::API_KEY_ENV;

use crate::backend::{ChunkStream, GenerativeBackend, ModelInfo, ResponseChunk};
use crate::error::ProviderError;
use crate::sse::{SseEvent, SseParser};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const API_BASE_ENV: &str = "GEMNET_API_BASE";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const BLOCK_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";
const MODELS_PAGE_SIZE: &str = "1000";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Default, Deserialize)]
struct SafetyRating {
    category: String,
    #[serde(default)]
    probability: Option<String>,
    #[serde(default)]
    blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Gemini REST client. The API key is looked up from the environment on
/// every call, so exporting it after startup takes effect without a restart.
pub struct GeminiBackend {
    http: Client,
    api_base: String,
}

impl GeminiBackend {
    pub fn new() -> Result<Self, ProviderError> {
        let api_base = env::var(API_BASE_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self::with_base(api_base)
    }

    pub fn with_base(api_base: impl Into<String>) -> Result<Self, ProviderError> {
        // No total timeout: long generations stream for minutes.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn api_key() -> Result<String, ProviderError> {
        env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingApiKey { var: API_KEY_ENV })
    }

    fn models_request(&self, key: &str, page_token: Option<&str>) -> reqwest::RequestBuilder {
        let mut query = vec![("pageSize", MODELS_PAGE_SIZE)];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.http
            .get(format!("{}/v1beta/models", self.api_base))
            .header("x-goog-api-key", key)
            .query(&query)
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!("gemini request failed with HTTP {}", status);
        Err(ProviderError::from_response(status, &body))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<ChunkStream, ProviderError> {
        let key = Self::api_key()?;
        let model = model.trim();
        if model.is_empty() {
            return Err(ProviderError::InvalidArgument("No model selected".to_string()));
        }
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.api_base, model
        );
        let req = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: BLOCK_THRESHOLD,
                })
                .collect(),
        };

        tracing::debug!("POST {} ({} prompt chars)", url, prompt.chars().count());
        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&req)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;

        let body = resp
            .bytes_stream()
            .map(|r| r.map(|bytes| bytes.to_vec()))
            .boxed();
        Ok(sse_chunks(body))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let key = Self::api_key()?;
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let resp = self
                .models_request(&key, page_token.as_deref())
                .send()
                .await?;
            let page: ListModelsResponse = Self::check_status(resp).await?.json().await?;
            models.extend(page.models.into_iter().map(|m| ModelInfo {
                name: m.name,
                display_name: m.display_name,
                generation_methods: m.supported_generation_methods,
            }));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(models)
    }
}

struct SseState {
    body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    parser: SseParser,
    pending: VecDeque<Result<ResponseChunk, ProviderError>>,
    done: bool,
}

impl SseState {
    fn push_event(&mut self, event: SseEvent) {
        if let Some(item) = event_to_chunk(&event.data) {
            self.pending.push_back(item);
        }
    }
}

fn sse_chunks(body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>) -> ChunkStream {
    let state = SseState {
        body,
        parser: SseParser::new(),
        pending: VecDeque::new(),
        done: false,
    };
    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => {
                    for event in st.parser.feed(&bytes) {
                        st.push_event(event);
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    st.pending.push_back(Err(e.into()));
                }
                None => {
                    st.done = true;
                    if let Some(event) = st.parser.finish() {
                        st.push_event(event);
                    }
                }
            }
        }
    })
    .boxed()
}

/// Turn one SSE `data:` payload into a chunk. Empty payloads yield nothing.
fn event_to_chunk(data: &str) -> Option<Result<ResponseChunk, ProviderError>> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    let resp: GenerateContentResponse = match serde_json::from_str(data) {
        Ok(resp) => resp,
        Err(e) => {
            return Some(Err(ProviderError::Other(format!(
                "malformed stream payload: {e}"
            ))))
        }
    };
    if resp.error.is_some() {
        return Some(Err(ProviderError::from_response(500, data)));
    }
    convert_response(resp).map(Ok)
}

fn convert_response(resp: GenerateContentResponse) -> Option<ResponseChunk> {
    if let Some(feedback) = &resp.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            return Some(ResponseChunk::blocked(
                reason.clone(),
                blocked_category(&feedback.safety_ratings),
            ));
        }
    }

    let candidate = resp.candidates.into_iter().next()?;
    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Some(ResponseChunk::blocked(
            "SAFETY",
            blocked_category(&candidate.safety_ratings),
        ));
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        None
    } else {
        Some(ResponseChunk::text(text))
    }
}

fn blocked_category(ratings: &[SafetyRating]) -> String {
    ratings
        .iter()
        .find(|r| r.blocked)
        .or_else(|| {
            ratings
                .iter()
                .find(|r| matches!(r.probability.as_deref(), Some("HIGH") | Some("MEDIUM")))
        })
        .map(|r| r.category.clone())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}
