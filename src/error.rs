//! Error types for the analytics pipeline.
//!
//! - [`DataError`]: the dataset violates a data-model invariant
//! - [`LlmError`]: the generative-text backend could not be reached or answered badly
//! - [`SchemaError`]: a structured response did not match its output schema
//! - [`PipelineError`]: an analysis, revision or suggestion attempt failed
//! - [`SessionError`]: an action is not allowed in the session's current state

use thiserror::Error;

/// Dataset invariant violations, detected at load time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("duplicate survey id '{0}'")]
    DuplicateSurvey(String),

    #[error("survey '{survey}' declares question '{question}' more than once")]
    DuplicateQuestion { survey: String, question: String },

    #[error("question '{question}' is {kind} and must not carry options")]
    UnexpectedOptions { question: String, kind: String },

    #[error("question '{question}' is {kind} but declares no options")]
    MissingOptions { question: String, kind: String },

    #[error("response '{response}' references unknown survey '{survey}'")]
    UnknownSurvey { response: String, survey: String },

    #[error("response '{response}' answers question '{question}' which is not part of survey '{survey}'")]
    UnknownQuestion {
        response: String,
        survey: String,
        question: String,
    },

    #[error("response '{response}' gives a {found} answer to {expected} question '{question}'")]
    AnswerShape {
        response: String,
        question: String,
        expected: String,
        found: &'static str,
    },

    #[error("response '{response}' selects '{label}' more than once for question '{question}'")]
    DuplicateSelection {
        response: String,
        question: String,
        label: String,
    },
}

/// Failures talking to the generative-text backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("cannot connect to {endpoint}")]
    Connect { endpoint: String },

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to send request: {0}")]
    Transport(String),

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("missing API key for the {backend} backend")]
    MissingApiKey { backend: String },
}

/// A structured response that does not honour its schema contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{path}' should be {expected}, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field '{path}' is out of range: {reason}")]
    OutOfRange { path: String, reason: String },
}

/// Why a single capability call did not produce a usable result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FailureCause {
    #[error(transparent)]
    Capability(#[from] LlmError),

    #[error("response violates the output schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("the backend returned an empty response")]
    EmptyResponse,
}

/// Pipeline-level failures. None of them are fatal to a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Precondition guard: callers treat an empty corpus as a state, not a failure.
    #[error("nothing to analyze: no free-text answers")]
    EmptyCorpus,

    #[error("analysis failed: {0}")]
    AnalysisFailed(FailureCause),

    #[error("summary revision failed: {0}")]
    RevisionFailed(FailureCause),

    #[error("question suggestion failed: {0}")]
    SuggestionFailed(FailureCause),

    #[error("the edit instruction is empty")]
    EmptyInstruction,

    #[error("the survey topic is empty")]
    EmptyTopic,
}

/// Actions rejected by the analytics session.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("there is no analysis result to revise")]
    NoAnalysis,

    #[error("an analysis is still running")]
    AnalysisPending,

    #[error("a summary revision is already in flight")]
    RevisionInFlight,

    #[error("the edit instruction is empty")]
    EmptyInstruction,
}
