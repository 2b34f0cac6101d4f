//! Generative-text capability.
//!
//! The pipeline only needs "given a prompt and an optional output schema,
//! return text, optionally with web citations". [`GenerativeText`] is that
//! seam; [`OllamaClient`] and [`GeminiClient`] are the HTTP backends.

pub mod gemini;
pub mod ollama;
pub mod prompts;
pub mod schema;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use schema::OutputSchema;

use crate::config::ModelConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which backend serves generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Local Ollama server (no web search)
    #[default]
    Ollama,
    /// Google Gemini API (supports Google Search grounding)
    Gemini,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Ollama => write!(f, "ollama"),
            Backend::Gemini => write!(f, "gemini"),
        }
    }
}

impl Backend {
    /// Model used for the structured analysis when none is configured.
    pub fn default_analysis_model(&self) -> &'static str {
        match self {
            Backend::Ollama => "qwen2.5:14b",
            Backend::Gemini => "gemini-2.5-pro",
        }
    }

    /// Model used for summary revisions and suggestions when none is configured.
    pub fn default_revision_model(&self) -> &'static str {
        match self {
            Backend::Ollama => "llama3.2:latest",
            Backend::Gemini => "gemini-2.5-flash",
        }
    }
}

/// One generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
    /// Structured-output contract the reply must follow.
    pub schema: Option<OutputSchema>,
    /// Ask the backend to ground its answer with web search.
    pub web_search: bool,
    pub temperature: f32,
}

/// A citation attached to a response. Either part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Citation {
    pub uri: Option<String>,
    pub title: Option<String>,
}

/// Raw backend reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// A backend able to generate text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeText: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> Backend;

    /// Whether `web_search` requests are honoured.
    fn supports_web_search(&self) -> bool;

    /// Run one generation request.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

/// Build the configured backend.
pub fn build_client(
    config: &ModelConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn GenerativeText>, LlmError> {
    match config.backend {
        Backend::Ollama => Ok(Arc::new(OllamaClient::new(
            &config.ollama_url,
            config.timeout_seconds,
        )?)),
        Backend::Gemini => {
            let key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| LlmError::MissingApiKey {
                    backend: Backend::Gemini.to_string(),
                })?;
            Ok(Arc::new(GeminiClient::new(
                &config.gemini_url,
                key,
                config.timeout_seconds,
            )?))
        }
    }
}

/// Map a reqwest send failure to a readable [`LlmError`].
pub(crate) fn send_error(err: reqwest::Error, endpoint: &str, timeout_seconds: u64) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout {
            seconds: timeout_seconds,
        }
    } else if err.is_connect() {
        LlmError::Connect {
            endpoint: endpoint.to_string(),
        }
    } else {
        LlmError::Transport(err.to_string())
    }
}

/// Turn a non-success HTTP reply into [`LlmError::Api`].
pub(crate) async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    LlmError::Api { status, body }
}
