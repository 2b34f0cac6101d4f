//! Analytics session state.
//!
//! An [`AnalyticsSession`] is the single owner of everything the analytics
//! view shows for one survey: the distributions, the corpus, the current
//! analysis result, the grounding sources and the theme selection.
//!
//! Capability calls are driven from outside. `begin_*` hands out a ticket
//! that snapshots the inputs of the call; `complete_*` applies the outcome
//! only when that ticket is still the latest one. Older tickets complete as
//! [`Completion::Stale`] and change nothing.

use crate::analysis::{aggregate_survey, extract_corpus, TextCorpus, ThemeDetail, ThemeSelection};
use crate::error::{PipelineError, SessionError};
use crate::models::{
    AnalysisResult, AnalysisStatus, Distribution, GroundingSource, Report, ReportMetadata, Survey,
    SurveyResponse,
};
use crate::orchestrator::{RevisedSummary, RevisionRequest};
use tracing::{debug, info, warn};

/// Lifecycle of one kind of request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Pending { id: u64 },
    Succeeded,
    Failed { message: String },
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending { .. })
    }

    fn is_pending_for(&self, ticket: u64) -> bool {
        matches!(self, RequestState::Pending { id } if *id == ticket)
    }
}

/// Inputs of an analysis call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisTicket {
    pub id: u64,
    pub corpus: TextCorpus,
}

/// Inputs of a revision call.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionTicket {
    pub id: u64,
    pub request: RevisionRequest,
}

/// What happened to a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

pub struct AnalyticsSession {
    survey: Survey,
    response_count: usize,
    distributions: Vec<Distribution>,
    corpus: TextCorpus,
    result: Option<AnalysisResult>,
    /// Ticket id of the analysis that produced `result`.
    result_generation: u64,
    sources: Vec<GroundingSource>,
    selection: ThemeSelection,
    analysis: RequestState,
    revision: RequestState,
    /// `result_generation` at the time the pending revision started.
    revision_base: u64,
    last_error: Option<String>,
    next_id: u64,
}

impl AnalyticsSession {
    pub fn new(survey: Survey, responses: &[SurveyResponse]) -> Self {
        let distributions = aggregate_survey(&survey, responses);
        let corpus = extract_corpus(&survey, responses);
        debug!(
            "Session for {}: {} distributions, {} free-text answers",
            survey.id,
            distributions.len(),
            corpus.len()
        );

        Self {
            survey,
            response_count: responses.len(),
            distributions,
            corpus,
            result: None,
            result_generation: 0,
            sources: Vec::new(),
            selection: ThemeSelection::default(),
            analysis: RequestState::Idle,
            revision: RequestState::Idle,
            revision_base: 0,
            last_error: None,
            next_id: 1,
        }
    }

    pub fn survey(&self) -> &Survey {
        &self.survey
    }

    pub fn response_count(&self) -> usize {
        self.response_count
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    pub fn corpus(&self) -> &TextCorpus {
        &self.corpus
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn sources(&self) -> &[GroundingSource] {
        &self.sources
    }

    pub fn revision_state(&self) -> &RequestState {
        &self.revision
    }

    /// The most recent analysis or revision failure, if not cleared since.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn status(&self) -> AnalysisStatus {
        if self.corpus.is_empty() {
            return AnalysisStatus::NoCorpus;
        }
        match &self.analysis {
            RequestState::Idle => AnalysisStatus::NotRequested,
            RequestState::Pending { .. } => AnalysisStatus::Pending,
            RequestState::Succeeded => AnalysisStatus::Ready,
            RequestState::Failed { message } => AnalysisStatus::Failed {
                message: message.clone(),
            },
        }
    }

    fn issue_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Start an analysis of the current corpus, superseding any pending
    /// analysis or revision.
    ///
    /// Returns `None` when there is nothing to analyze. The previous result
    /// stays visible until the new one arrives.
    pub fn begin_analysis(&mut self) -> Option<AnalysisTicket> {
        if self.corpus.is_empty() {
            debug!("Corpus is empty; no analysis started");
            return None;
        }

        let id = self.issue_id();
        self.analysis = RequestState::Pending { id };
        if self.revision.is_pending() {
            debug!("Pending revision superseded by analysis #{}", id);
            self.revision = RequestState::Idle;
        }
        self.sources.clear();
        self.selection.clear();
        self.last_error = None;

        info!("Analysis #{} started ({} answers)", id, self.corpus.len());
        Some(AnalysisTicket {
            id,
            corpus: self.corpus.clone(),
        })
    }

    /// Apply the outcome of analysis `ticket`.
    ///
    /// A failure keeps the previous result.
    pub fn complete_analysis(
        &mut self,
        ticket: u64,
        outcome: Result<AnalysisResult, PipelineError>,
    ) -> Completion {
        if !self.analysis.is_pending_for(ticket) {
            debug!("Discarding stale analysis #{}", ticket);
            return Completion::Stale;
        }

        match outcome {
            Ok(result) => {
                info!("Analysis #{} applied", ticket);
                self.result = Some(result);
                self.result_generation = ticket;
                self.selection.clear();
                self.analysis = RequestState::Succeeded;
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Analysis #{} failed: {}", ticket, message);
                self.last_error = Some(message.clone());
                self.analysis = RequestState::Failed { message };
            }
        }
        Completion::Applied
    }

    /// Replace the response set.
    ///
    /// Distributions are always recomputed. When the corpus changes a new
    /// analysis ticket is issued; when it becomes empty the analysis state
    /// is cleared instead.
    #[allow(dead_code)] // The CLI analyzes a fixed snapshot
    pub fn update_responses(&mut self, responses: &[SurveyResponse]) -> Option<AnalysisTicket> {
        self.response_count = responses.len();
        self.distributions = aggregate_survey(&self.survey, responses);

        let corpus = extract_corpus(&self.survey, responses);
        if corpus == self.corpus {
            return None;
        }
        self.corpus = corpus;

        if self.corpus.is_empty() {
            info!("No free-text answers left; clearing the analysis");
            self.result = None;
            self.sources.clear();
            self.selection.clear();
            self.last_error = None;
            self.analysis = RequestState::Idle;
            self.revision = RequestState::Idle;
            return None;
        }

        self.begin_analysis()
    }

    /// Start a revision of the current summary.
    pub fn begin_revision(
        &mut self,
        instruction: &str,
        use_search: bool,
    ) -> Result<RevisionTicket, SessionError> {
        if instruction.trim().is_empty() {
            return Err(SessionError::EmptyInstruction);
        }
        if self.analysis.is_pending() {
            return Err(SessionError::AnalysisPending);
        }
        if self.revision.is_pending() {
            return Err(SessionError::RevisionInFlight);
        }
        let summary = match &self.result {
            Some(result) => result.summary.clone(),
            None => return Err(SessionError::NoAnalysis),
        };

        let id = self.issue_id();
        self.revision = RequestState::Pending { id };
        self.revision_base = self.result_generation;

        info!("Revision #{} started (web search: {})", id, use_search);
        Ok(RevisionTicket {
            id,
            request: RevisionRequest {
                summary,
                instruction: instruction.to_string(),
                corpus: self.corpus.clone(),
                use_search,
            },
        })
    }

    /// Apply the outcome of revision `ticket`.
    ///
    /// Success replaces the summary and the source list; failure leaves both
    /// untouched.
    pub fn complete_revision(
        &mut self,
        ticket: u64,
        outcome: Result<RevisedSummary, PipelineError>,
    ) -> Completion {
        if !self.revision.is_pending_for(ticket) {
            debug!("Discarding stale revision #{}", ticket);
            return Completion::Stale;
        }
        if self.revision_base != self.result_generation {
            debug!("Revision #{} targets a superseded analysis", ticket);
            self.revision = RequestState::Idle;
            return Completion::Stale;
        }

        match (outcome, self.result.as_mut()) {
            (Ok(revised), Some(result)) => {
                info!(
                    "Revision #{} applied with {} sources",
                    ticket,
                    revised.sources.len()
                );
                result.summary = revised.text;
                self.sources = revised.sources;
                self.revision = RequestState::Succeeded;
            }
            (Ok(_), None) => {
                self.revision = RequestState::Idle;
                return Completion::Stale;
            }
            (Err(e), _) => {
                let message = e.to_string();
                warn!("Revision #{} failed: {}", ticket, message);
                self.last_error = Some(message.clone());
                self.revision = RequestState::Failed { message };
            }
        }
        Completion::Applied
    }

    /// Toggle the selected theme and return its detail when one is selected.
    pub fn toggle_theme(&mut self, theme: &str) -> Option<ThemeDetail> {
        self.selection.toggle(theme);
        self.theme_detail()
    }

    /// Detail of the selected theme against the current result.
    pub fn theme_detail(&self) -> Option<ThemeDetail> {
        self.result
            .as_ref()
            .and_then(|result| self.selection.detail(result))
    }

    /// Snapshot the consumer-facing outputs into a report.
    pub fn report(&self, metadata: ReportMetadata, errors: Vec<String>) -> Report {
        Report {
            metadata,
            distributions: self.distributions.clone(),
            status: self.status(),
            analysis: self.result.clone(),
            sources: self.sources.clone(),
            theme_detail: self.theme_detail(),
            errors,
        }
    }
}
