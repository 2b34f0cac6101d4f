//! Ollama chat backend.
//!
//! Structured output uses the `format` field with a JSON Schema. Ollama has
//! no web-search tool, so grounding requests get no citations.

use super::{api_error, send_error, Backend, GenerationRequest, GenerationResponse, GenerativeText};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Client for a local or remote Ollama server.
pub struct OllamaClient {
    base_url: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds,
            http_client,
        })
    }
}

#[async_trait]
impl GenerativeText for OllamaClient {
    fn backend(&self) -> Backend {
        Backend::Ollama
    }

    fn supports_web_search(&self) -> bool {
        false
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let url = format!("{}/api/chat", self.base_url);

        if request.web_search {
            warn!("Ollama has no web search tool; answering without grounding");
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt,
        });

        let body = OllamaChatRequest {
            model: request.model,
            messages,
            stream: false,
            format: request.schema.as_ref().map(|s| s.to_json_schema()),
            options: OllamaOptions {
                temperature: request.temperature,
            },
        };

        debug!("Sending chat request to {} with model {}", url, body.model);

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, &self.base_url, self.timeout_seconds))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        Ok(GenerationResponse {
            text: chat_response.message.content,
            citations: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::OutputSchema;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(schema: Option<OutputSchema>) -> GenerationRequest {
        GenerationRequest {
            model: "llama3.2:latest".to_string(),
            system: Some("be brief".to_string()),
            prompt: "hello".to_string(),
            schema,
            web_search: true,
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn test_generate_sends_schema_as_format() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama3.2:latest",
                "stream": false,
                "format": {"type": "object"},
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.2:latest",
                "message": {"role": "assistant", "content": "{\"ok\": true}"},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), 5).unwrap();
        let response = client
            .generate(request(Some(OutputSchema::analysis_result())))
            .await
            .unwrap();

        assert_eq!(response.text, "{\"ok\": true}");
        assert!(response.citations.is_empty());
    }

    #[tokio::test]
    async fn test_generate_maps_api_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), 5).unwrap();
        let err = client.generate(request(None)).await.unwrap_err();

        assert_eq!(
            err,
            LlmError::Api {
                status: 404,
                body: "model not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_generate_rejects_unexpected_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), 5).unwrap();
        let err = client.generate(request(None)).await.unwrap_err();
        assert!(matches!(err, LlmError::Decode(_)));
    }
}
