//! Data models for survey analytics.
//!
//! This module contains the survey/response entities supplied by the data
//! source, the AI analysis shapes exchanged with the generative-text
//! backend, and the dataset loader that checks the data-model invariants.

use crate::analysis::ThemeDetail;
use crate::error::DataError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Type tag of a survey question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Single choice among the options.
    Radio,
    /// Any subset of the options.
    Checkbox,
    /// Numeric rating.
    Scale,
    /// Free-text answer.
    Text,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Radio => write!(f, "single-choice"),
            QuestionType::Checkbox => write!(f, "multi-choice"),
            QuestionType::Scale => write!(f, "scale"),
            QuestionType::Text => write!(f, "free-text"),
        }
    }
}

impl QuestionType {
    /// Whether answers to this type are counted by the aggregator.
    pub fn is_quantitative(&self) -> bool {
        !matches!(self, QuestionType::Text)
    }

    /// Whether this type carries option labels.
    pub fn has_options(&self) -> bool {
        matches!(self, QuestionType::Radio | QuestionType::Checkbox)
    }

    /// Parse the wire tag used by the data source and the suggestion schema.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "radio" => Some(QuestionType::Radio),
            "checkbox" => Some(QuestionType::Checkbox),
            "scale" => Some(QuestionType::Scale),
            "text" => Some(QuestionType::Text),
            _ => None,
        }
    }
}

/// A single survey question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, unique within its survey.
    pub id: String,
    /// Prompt shown to respondents.
    pub text: String,
    /// Question type.
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Option labels (choice questions only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A survey definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Questions in display order.
    pub questions: Vec<Question>,
}

impl Survey {
    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Questions whose answers are aggregated, in display order.
    pub fn quantitative_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|q| q.kind.is_quantitative())
    }

    /// Free-text questions, in display order.
    pub fn text_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions
            .iter()
            .filter(|q| q.kind == QuestionType::Text)
    }
}

/// An answer value. Its meaning depends on the referenced question's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Scale rating.
    Number(f64),
    /// Single-choice label or free text.
    Text(String),
    /// Multi-choice selection.
    Labels(Vec<String>),
}

impl AnswerValue {
    /// Short name of the JSON shape, for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            AnswerValue::Number(_) => "numeric",
            AnswerValue::Text(_) => "text",
            AnswerValue::Labels(_) => "label-list",
        }
    }

    /// Whether this shape is allowed for the given question type.
    pub fn fits(&self, kind: QuestionType) -> bool {
        matches!(
            (self, kind),
            (AnswerValue::Text(_), QuestionType::Radio)
                | (AnswerValue::Text(_), QuestionType::Text)
                | (AnswerValue::Labels(_), QuestionType::Checkbox)
                | (AnswerValue::Number(_), QuestionType::Scale)
        )
    }
}

/// Render a scale value as a distribution label (`8.0` becomes `"8"`).
pub fn scale_label(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One submitted response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: String,
    pub survey_id: String,
    pub submitted_at: DateTime<Utc>,
    /// Answers keyed by question id. Unanswered questions are absent.
    #[serde(default)]
    pub answers: BTreeMap<String, AnswerValue>,
}

/// Sentiment shares as returned by the analysis backend.
///
/// The shares are meant to add up to 100 but nothing guarantees it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl SentimentBreakdown {
    /// Sum of the three shares as reported.
    pub fn total(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }

    /// Shares rescaled to percentages of their actual total.
    ///
    /// Returns all zeros when the total is zero.
    pub fn normalized(&self) -> SentimentBreakdown {
        let total = self.total();
        if total <= 0.0 {
            return SentimentBreakdown::default();
        }
        SentimentBreakdown {
            positive: self.positive / total * 100.0,
            neutral: self.neutral / total * 100.0,
            negative: self.negative / total * 100.0,
        }
    }
}

/// A theme identified by the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyTheme {
    pub theme: String,
    pub description: String,
}

/// Verbatim quotes illustrating a theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeQuotes {
    pub theme: String,
    pub quotes: Vec<String>,
}

/// The structured AI analysis of a text corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sentiment: SentimentBreakdown,
    pub key_themes: Vec<KeyTheme>,
    pub summary: String,
    pub quotes: Vec<ThemeQuotes>,
}

/// A web reference backing a revised summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

/// One bar of a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
}

/// Answer counts for one quantitative question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub question_id: String,
    pub question_text: String,
    pub kind: QuestionType,
    /// Buckets in presentation order.
    pub buckets: Vec<Bucket>,
    /// Number of responses that answered the question.
    pub respondents: usize,
}

impl Distribution {
    /// Sum of all bucket counts.
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Count for a label, if it was observed.
    #[allow(dead_code)] // Lookup helper for callers and tests
    pub fn count(&self, label: &str) -> Option<usize> {
        self.buckets
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.count)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Where the AI analysis of a survey stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// No free-text answers to analyze.
    NoCorpus,
    /// Analysis was not requested (or not started yet).
    NotRequested,
    Pending,
    Ready,
    Failed { message: String },
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisStatus::NoCorpus => write!(f, "no free-text answers to analyze"),
            AnalysisStatus::NotRequested => write!(f, "not requested"),
            AnalysisStatus::Pending => write!(f, "in progress"),
            AnalysisStatus::Ready => write!(f, "ready"),
            AnalysisStatus::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}

/// Metadata about the analytics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Survey the report covers.
    pub survey_id: String,
    pub survey_title: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Backend and model used for the analysis, if one ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Number of responses to the survey.
    pub response_count: usize,
    /// Number of non-blank free-text answers.
    pub corpus_size: usize,
    /// Wall-clock duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete survey analytics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Per-question answer counts.
    pub distributions: Vec<Distribution>,
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    /// Sources backing the current summary.
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
    /// Drill-down for the selected theme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_detail: Option<ThemeDetail>,
    /// Human-readable failures encountered during the run.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Surveys and responses as supplied by the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub surveys: Vec<Survey>,
    #[serde(default)]
    pub responses: Vec<SurveyResponse>,
}

impl Dataset {
    /// Load and validate a dataset from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Invalid dataset: {}", path.display()))
    }

    /// Parse and validate a dataset from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        let dataset: Dataset =
            serde_json::from_str(content).context("Failed to parse dataset JSON")?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Check every data-model invariant, stopping at the first violation.
    pub fn validate(&self) -> Result<(), DataError> {
        let mut surveys: HashMap<&str, &Survey> = HashMap::new();

        for survey in &self.surveys {
            if surveys.insert(survey.id.as_str(), survey).is_some() {
                return Err(DataError::DuplicateSurvey(survey.id.clone()));
            }
            validate_questions(survey)?;
        }

        for response in &self.responses {
            let survey = surveys.get(response.survey_id.as_str()).ok_or_else(|| {
                DataError::UnknownSurvey {
                    response: response.id.clone(),
                    survey: response.survey_id.clone(),
                }
            })?;
            validate_answers(survey, response)?;
        }

        Ok(())
    }

    pub fn survey(&self, id: &str) -> Option<&Survey> {
        self.surveys.iter().find(|s| s.id == id)
    }

    /// Responses belonging to one survey, in submission-list order.
    pub fn responses_for(&self, survey_id: &str) -> Vec<SurveyResponse> {
        self.responses
            .iter()
            .filter(|r| r.survey_id == survey_id)
            .cloned()
            .collect()
    }
}

fn validate_questions(survey: &Survey) -> Result<(), DataError> {
    let mut seen = HashSet::new();

    for question in &survey.questions {
        if !seen.insert(question.id.as_str()) {
            return Err(DataError::DuplicateQuestion {
                survey: survey.id.clone(),
                question: question.id.clone(),
            });
        }

        if question.kind.has_options() {
            if question.options.is_empty() {
                return Err(DataError::MissingOptions {
                    question: question.id.clone(),
                    kind: question.kind.to_string(),
                });
            }
        } else if !question.options.is_empty() {
            return Err(DataError::UnexpectedOptions {
                question: question.id.clone(),
                kind: question.kind.to_string(),
            });
        }
    }

    Ok(())
}

fn validate_answers(survey: &Survey, response: &SurveyResponse) -> Result<(), DataError> {
    for (question_id, answer) in &response.answers {
        let question = survey
            .question(question_id)
            .ok_or_else(|| DataError::UnknownQuestion {
                response: response.id.clone(),
                survey: survey.id.clone(),
                question: question_id.clone(),
            })?;

        if !answer.fits(question.kind) {
            return Err(DataError::AnswerShape {
                response: response.id.clone(),
                question: question_id.clone(),
                expected: question.kind.to_string(),
                found: answer.shape(),
            });
        }

        if let AnswerValue::Labels(labels) = answer {
            let mut seen = HashSet::new();
            for label in labels {
                if !seen.insert(label.as_str()) {
                    return Err(DataError::DuplicateSelection {
                        response: response.id.clone(),
                        question: question_id.clone(),
                        label: label.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}
