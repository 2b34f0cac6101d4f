//! Google Gemini `generateContent` backend.
//!
//! Structured output is requested through `generationConfig.responseSchema`.
//! Web grounding enables the `google_search` tool; its grounding chunks are
//! surfaced as citations.

use super::{
    api_error, send_error, Backend, Citation, GenerationRequest, GenerationResponse, GenerativeText,
};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Client for the Gemini REST API.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: String, timeout_seconds: u64) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_seconds,
            http_client,
        })
    }

    fn build_body(request: GenerationRequest) -> GenerateContentRequest {
        let (response_mime_type, response_schema) = match request.schema {
            Some(schema) => (
                Some("application/json".to_string()),
                Some(schema.to_gemini_schema()),
            ),
            None => (None, None),
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.prompt,
                }],
            }],
            system_instruction: request.system.map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                response_mime_type,
                response_schema,
            },
            tools: if request.web_search {
                vec![json!({ "google_search": {} })]
            } else {
                Vec::new()
            },
        }
    }
}

#[async_trait]
impl GenerativeText for GeminiClient {
    fn backend(&self) -> Backend {
        Backend::Gemini
    }

    fn supports_web_search(&self) -> bool {
        true
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );
        debug!(
            "Sending generateContent request for {} (web search: {})",
            request.model, request.web_search
        );

        let body = Self::build_body(request);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, &self.base_url, self.timeout_seconds))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Decode("response has no candidates".to_string()))?;

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let citations = candidate
            .grounding_metadata
            .map(|m| {
                m.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .map(|web| Citation {
                        uri: web.uri,
                        title: web.title,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(GenerationResponse { text, citations })
    }
}
