//! Instruction-driven summary revision, optionally web-grounded.

use crate::analysis::TextCorpus;
use crate::error::{FailureCause, PipelineError};
use crate::llm::prompts::{revision_prompt, REVISION_SYSTEM_PROMPT};
use crate::llm::{Citation, GenerationRequest, GenerativeText};
use crate::models::GroundingSource;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Inputs of one revision, captured when the revision is started.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionRequest {
    pub summary: String,
    pub instruction: String,
    pub corpus: TextCorpus,
    pub use_search: bool,
}

/// A revised summary and the sources backing it.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisedSummary {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

pub struct RevisionOrchestrator {
    client: Arc<dyn GenerativeText>,
    model: String,
    temperature: f32,
}

impl RevisionOrchestrator {
    pub fn new(client: Arc<dyn GenerativeText>, model: String, temperature: f32) -> Self {
        Self {
            client,
            model,
            temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the backend to rewrite the summary. Nothing is mutated here; the
    /// caller applies the result.
    pub async fn revise(&self, request: &RevisionRequest) -> Result<RevisedSummary, PipelineError> {
        if request.instruction.trim().is_empty() {
            return Err(PipelineError::EmptyInstruction);
        }

        let web_search = request.use_search && self.client.supports_web_search();
        if request.use_search && !web_search {
            warn!(
                "The {} backend cannot search the web; revising without grounding",
                self.client.backend()
            );
        }

        info!(
            "Revising summary with {} (web search: {})",
            self.model, web_search
        );

        let generation = GenerationRequest {
            model: self.model.clone(),
            system: Some(REVISION_SYSTEM_PROMPT.to_string()),
            prompt: revision_prompt(
                &request.summary,
                &request.instruction,
                &request.corpus,
                web_search,
            ),
            schema: None,
            web_search,
            temperature: self.temperature,
        };

        let response = self
            .client
            .generate(generation)
            .await
            .map_err(|e| PipelineError::RevisionFailed(e.into()))?;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(PipelineError::RevisionFailed(FailureCause::EmptyResponse));
        }

        let sources = if request.use_search {
            extract_sources(&response.citations)
        } else {
            Vec::new()
        };

        Ok(RevisedSummary {
            text: text.to_string(),
            sources,
        })
    }
}

/// Turn citations into grounding sources.
///
/// Citations without a usable URI are dropped, a missing title falls back
/// to the URI, and repeated URIs keep their first occurrence.
pub fn extract_sources(citations: &[Citation]) -> Vec<GroundingSource> {
    let mut seen = HashSet::new();

    citations
        .iter()
        .filter_map(|c| {
            let uri = c.uri.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
            let title = c
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(uri);
            Some(GroundingSource {
                uri: uri.to_string(),
                title: title.to_string(),
            })
        })
        .filter(|source| seen.insert(source.uri.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{Backend, GenerationResponse, MockGenerativeText};
    use mockall::predicate::function;

    fn request(use_search: bool) -> RevisionRequest {
        RevisionRequest {
            summary: "Food is often cold.".to_string(),
            instruction: "Make it more formal".to_string(),
            corpus: TextCorpus::new(vec!["the food is often cold".to_string()]),
            use_search,
        }
    }

    fn citation(uri: Option<&str>, title: Option<&str>) -> Citation {
        Citation {
            uri: uri.map(String::from),
            title: title.map(String::from),
        }
    }

    fn cited_reply() -> GenerationResponse {
        GenerationResponse {
            text: "  Respondents report that meals are frequently served cold.\n".to_string(),
            citations: vec![
                citation(Some("https://stats.example/canteens"), Some("Canteen stats")),
                citation(None, Some("orphan")),
                citation(Some("https://news.example/food"), None),
            ],
        }
    }

    fn orchestrator(mock: MockGenerativeText) -> RevisionOrchestrator {
        RevisionOrchestrator::new(Arc::new(mock), "revision-model".to_string(), 0.2)
    }

    #[tokio::test]
    async fn test_revision_with_search_extracts_sources() {
        let mut mock = MockGenerativeText::new();
        mock.expect_supports_web_search().return_const(true);
        mock.expect_generate()
            .with(function(|req: &GenerationRequest| {
                req.web_search
                    && req.schema.is_none()
                    && req.prompt.contains("Food is often cold.")
                    && req.prompt.contains("Make it more formal")
                    && req.prompt.contains("the food is often cold")
                    && req.prompt.contains("web search")
            }))
            .times(1)
            .returning(|_| Ok(cited_reply()));

        let revised = orchestrator(mock).revise(&request(true)).await.unwrap();

        assert_eq!(
            revised.text,
            "Respondents report that meals are frequently served cold."
        );
        assert_eq!(
            revised.sources,
            vec![
                GroundingSource {
                    uri: "https://stats.example/canteens".to_string(),
                    title: "Canteen stats".to_string(),
                },
                GroundingSource {
                    uri: "https://news.example/food".to_string(),
                    title: "https://news.example/food".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_revision_without_search_has_no_sources() {
        let mut mock = MockGenerativeText::new();
        mock.expect_supports_web_search().return_const(true);
        mock.expect_generate()
            .with(function(|req: &GenerationRequest| !req.web_search))
            .times(1)
            .returning(|_| Ok(cited_reply()));

        let revised = orchestrator(mock).revise(&request(false)).await.unwrap();
        assert!(revised.sources.is_empty());
    }

    #[tokio::test]
    async fn test_search_downgraded_when_unsupported() {
        let mut mock = MockGenerativeText::new();
        mock.expect_supports_web_search().return_const(false);
        mock.expect_backend().return_const(Backend::Ollama);
        mock.expect_generate()
            .with(function(|req: &GenerationRequest| {
                !req.web_search && !req.prompt.contains("web search")
            }))
            .times(1)
            .returning(|_| {
                Ok(GenerationResponse {
                    text: "Shorter.".to_string(),
                    citations: vec![],
                })
            });

        let revised = orchestrator(mock).revise(&request(true)).await.unwrap();
        assert_eq!(revised.text, "Shorter.");
        assert!(revised.sources.is_empty());
    }

    #[tokio::test]
    async fn test_blank_instruction_makes_no_call() {
        let mut mock = MockGenerativeText::new();
        mock.expect_generate().times(0);

        let mut req = request(false);
        req.instruction = "   ".to_string();
        let err = orchestrator(mock).revise(&req).await.unwrap_err();
        assert_eq!(err, PipelineError::EmptyInstruction);
    }

    #[tokio::test]
    async fn test_failures_are_revision_failures() {
        let mut mock = MockGenerativeText::new();
        mock.expect_supports_web_search().return_const(true);
        mock.expect_generate()
            .times(1)
            .returning(|_| Err(LlmError::Api {
                status: 500,
                body: "boom".to_string(),
            }));
        let err = orchestrator(mock).revise(&request(false)).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::RevisionFailed(FailureCause::Capability(LlmError::Api {
                status: 500,
                ..
            }))
        ));

        let mut mock = MockGenerativeText::new();
        mock.expect_supports_web_search().return_const(true);
        mock.expect_generate().times(1).returning(|_| {
            Ok(GenerationResponse {
                text: " \n ".to_string(),
                citations: vec![],
            })
        });
        let err = orchestrator(mock).revise(&request(false)).await.unwrap_err();
        assert_eq!(
            err,
            PipelineError::RevisionFailed(FailureCause::EmptyResponse)
        );
    }

    #[test]
    fn test_extract_sources_dedupes_and_drops_blank_uris() {
        let sources = extract_sources(&[
            citation(Some("https://a.example"), Some("A")),
            citation(Some("  "), Some("blank")),
            citation(Some("https://a.example"), Some("A again")),
            citation(Some("https://b.example"), Some("")),
        ]);

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "A");
        assert_eq!(sources[1].title, "https://b.example");
    }
}
