//! Requests to the generative-text backend.
//!
//! Each orchestrator issues exactly one capability call per invocation and
//! returns plain data. Applying results is left to the caller.

pub mod analysis;
pub mod revision;
pub mod suggest;

pub use analysis::AnalysisOrchestrator;
pub use revision::{RevisedSummary, RevisionOrchestrator, RevisionRequest};
pub use suggest::QuestionSuggester;
