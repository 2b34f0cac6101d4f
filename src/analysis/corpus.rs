//! Free-text corpus extraction.

use crate::models::{AnswerValue, Survey, SurveyResponse};
use serde::Serialize;

/// The ordered free-text answers handed to the analysis backend.
///
/// Equality is structural, so a recomputed corpus can be compared with the
/// one already analyzed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TextCorpus(Vec<String>);

impl TextCorpus {
    pub fn new(answers: Vec<String>) -> Self {
        Self(answers.into_iter().filter(|a| !a.trim().is_empty()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[allow(dead_code)] // Accessor for callers and tests
    pub fn answers(&self) -> &[String] {
        &self.0
    }

    /// Lossless JSON array rendering used inside prompts.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Collect every non-blank free-text answer, response by response, in the
/// survey's question order.
pub fn extract_corpus(survey: &Survey, responses: &[SurveyResponse]) -> TextCorpus {
    let text_questions: Vec<&str> = survey.text_questions().map(|q| q.id.as_str()).collect();

    let answers = responses
        .iter()
        .flat_map(|response| {
            text_questions
                .iter()
                .filter_map(move |id| match response.answers.get(*id) {
                    Some(AnswerValue::Text(text)) => Some(text.clone()),
                    _ => None,
                })
        })
        .collect();

    TextCorpus::new(answers)
}
