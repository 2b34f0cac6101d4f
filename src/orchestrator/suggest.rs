//! Survey question suggestions for a topic.

use crate::error::{FailureCause, PipelineError, SchemaError};
use crate::llm::prompts::{suggestion_prompt, SUGGESTION_SYSTEM_PROMPT};
use crate::llm::{GenerationRequest, GenerativeText, OutputSchema};
use crate::models::{Question, QuestionType};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MIN_QUESTIONS: usize = 3;
const MAX_QUESTIONS: usize = 5;

/// A question as the backend returns it, before validation.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    id: String,
    text: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    options: Option<Vec<String>>,
}

pub struct QuestionSuggester {
    client: Arc<dyn GenerativeText>,
    model: String,
    temperature: f32,
}

impl QuestionSuggester {
    pub fn new(client: Arc<dyn GenerativeText>, model: String, temperature: f32) -> Self {
        Self {
            client,
            model,
            temperature,
        }
    }

    /// Ask for a handful of mixed-type questions about `topic`.
    pub async fn suggest(&self, topic: &str) -> Result<Vec<Question>, PipelineError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::EmptyTopic);
        }

        info!("Suggesting questions for '{}' with {}", topic, self.model);

        let request = GenerationRequest {
            model: self.model.clone(),
            system: Some(SUGGESTION_SYSTEM_PROMPT.to_string()),
            prompt: suggestion_prompt(topic),
            schema: Some(OutputSchema::suggested_questions()),
            web_search: false,
            temperature: self.temperature,
        };

        let response = self
            .client
            .generate(request)
            .await
            .map_err(|e| PipelineError::SuggestionFailed(e.into()))?;

        parse_suggestions(&response.text).map_err(PipelineError::SuggestionFailed)
    }
}

/// Validate a suggestion reply and turn it into [`Question`]s.
///
/// Blank or repeated ids are replaced by `q{n}` (1-based position). Options
/// on scale and free-text questions are dropped.
pub fn parse_suggestions(text: &str) -> Result<Vec<Question>, FailureCause> {
    if text.trim().is_empty() {
        return Err(FailureCause::EmptyResponse);
    }

    let raw: Vec<RawQuestion> = OutputSchema::suggested_questions().parse(text)?;
    if raw.is_empty() {
        return Err(SchemaError::OutOfRange {
            path: "$".to_string(),
            reason: "no questions were suggested".to_string(),
        }
        .into());
    }
    if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&raw.len()) {
        warn!(
            "Expected {} to {} questions, got {}",
            MIN_QUESTIONS,
            MAX_QUESTIONS,
            raw.len()
        );
    }

    let mut ids = HashSet::new();
    let mut questions = Vec::with_capacity(raw.len());

    for (i, item) in raw.into_iter().enumerate() {
        let path = format!("$[{}]", i);

        let kind = QuestionType::from_tag(&item.kind).ok_or_else(|| SchemaError::OutOfRange {
            path: format!("{}.type", path),
            reason: format!("unknown question type '{}'", item.kind),
        })?;

        let text = item.text.trim().to_string();
        if text.is_empty() {
            return Err(SchemaError::OutOfRange {
                path: format!("{}.text", path),
                reason: "question text is empty".to_string(),
            }
            .into());
        }

        let options: Vec<String> = if kind.has_options() {
            let options: Vec<String> = item
                .options
                .unwrap_or_default()
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            if options.len() < 2 {
                return Err(SchemaError::OutOfRange {
                    path: format!("{}.options", path),
                    reason: format!("a {} question needs at least 2 options", kind),
                }
                .into());
            }
            options
        } else {
            if item.options.as_ref().is_some_and(|o| !o.is_empty()) {
                debug!("Dropping options from {} question {}", kind, path);
            }
            Vec::new()
        };

        let mut id = item.id.trim().to_string();
        if id.is_empty() || ids.contains(&id) {
            id = format!("q{}", i + 1);
        }
        // A generated id may itself collide with a later explicit one.
        while !ids.insert(id.clone()) {
            id.push('_');
        }

        questions.push(Question {
            id,
            text,
            kind,
            options,
        });
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{GenerationResponse, MockGenerativeText};
    use mockall::predicate::function;

    const REPLY: &str = r#"[
        {"id": "q1", "text": "How often do you work from home?", "type": "radio",
         "options": ["Never", "Sometimes", "Always"]},
        {"id": "q2", "text": "How satisfied are you with remote work?", "type": "scale",
         "options": ["1", "10"]},
        {"id": "q3", "text": "Which tools do you use?", "type": "checkbox",
         "options": ["Chat", "Video calls", "Wiki"]},
        {"id": "q4", "text": "What would you improve?", "type": "text"}
    ]"#;

    fn suggester(mock: MockGenerativeText) -> QuestionSuggester {
        QuestionSuggester::new(Arc::new(mock), "revision-model".to_string(), 0.7)
    }

    #[tokio::test]
    async fn test_suggest_returns_validated_questions() {
        let mut mock = MockGenerativeText::new();
        mock.expect_generate()
            .with(function(|req: &GenerationRequest| {
                req.schema == Some(OutputSchema::suggested_questions())
                    && req.prompt.contains("Remote work")
            }))
            .times(1)
            .returning(|_| {
                Ok(GenerationResponse {
                    text: REPLY.to_string(),
                    citations: vec![],
                })
            });

        let questions = suggester(mock).suggest("  Remote work ").await.unwrap();

        assert_eq!(questions.len(), 4);
        assert_eq!(questions[0].kind, QuestionType::Radio);
        assert_eq!(questions[0].options.len(), 3);
        assert_eq!(questions[1].kind, QuestionType::Scale);
        assert!(questions[1].options.is_empty());
        assert_eq!(questions[3].kind, QuestionType::Text);
    }

    #[tokio::test]
    async fn test_blank_topic_makes_no_call() {
        let mut mock = MockGenerativeText::new();
        mock.expect_generate().times(0);

        let err = suggester(mock).suggest(" \t").await.unwrap_err();
        assert_eq!(err, PipelineError::EmptyTopic);
    }

    #[tokio::test]
    async fn test_backend_failure_is_suggestion_failure() {
        let mut mock = MockGenerativeText::new();
        mock.expect_generate().times(1).returning(|_| {
            Err(LlmError::Connect {
                endpoint: "http://localhost:11434".to_string(),
            })
        });

        let err = suggester(mock).suggest("Canteen").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SuggestionFailed(FailureCause::Capability(LlmError::Connect { .. }))
        ));
    }

    #[test]
    fn test_choice_question_needs_two_options() {
        let text = r#"[{"id": "q1", "text": "Pick one", "type": "radio", "options": ["Only"]}]"#;
        let err = parse_suggestions(text).unwrap_err();
        assert!(matches!(
            err,
            FailureCause::Schema(SchemaError::OutOfRange { ref path, .. }) if path == "$[0].options"
        ));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let text = r#"[{"id": "q1", "text": "Pick", "type": "dropdown"}]"#;
        let err = parse_suggestions(text).unwrap_err();
        assert!(matches!(
            err,
            FailureCause::Schema(SchemaError::OutOfRange { ref path, .. }) if path == "$[0].type"
        ));
    }

    #[test]
    fn test_duplicate_and_blank_ids_are_renamed() {
        let text = r#"[
            {"id": "a", "text": "One?", "type": "text"},
            {"id": "a", "text": "Two?", "type": "text"},
            {"id": "", "text": "Three?", "type": "scale"}
        ]"#;
        let questions = parse_suggestions(text).unwrap();
        let ids: Vec<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "q2", "q3"]);
    }

    #[test]
    fn test_empty_list_and_empty_reply() {
        assert!(matches!(
            parse_suggestions("[]"),
            Err(FailureCause::Schema(SchemaError::OutOfRange { .. }))
        ));
        assert_eq!(parse_suggestions(""), Err(FailureCause::EmptyResponse));
    }
}
