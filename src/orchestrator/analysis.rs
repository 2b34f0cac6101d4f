//! Corpus analysis through the generative-text backend.

use crate::analysis::{label_mismatches, TextCorpus};
use crate::config::AnalysisConfig;
use crate::error::{FailureCause, PipelineError, SchemaError};
use crate::llm::prompts::{analysis_prompt, ANALYSIS_SYSTEM_PROMPT};
use crate::llm::{GenerationRequest, GenerativeText, OutputSchema};
use crate::models::AnalysisResult;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Issues one schema-constrained analysis request per corpus.
pub struct AnalysisOrchestrator {
    client: Arc<dyn GenerativeText>,
    model: String,
    temperature: f32,
    budget: AnalysisConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        client: Arc<dyn GenerativeText>,
        model: String,
        temperature: f32,
        budget: AnalysisConfig,
    ) -> Self {
        Self {
            client,
            model,
            temperature,
            budget,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Analyze a non-empty corpus. Failures are reported, never retried.
    pub async fn analyze(&self, corpus: &TextCorpus) -> Result<AnalysisResult, PipelineError> {
        if corpus.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }

        info!(
            "Analyzing {} free-text answers with {}",
            corpus.len(),
            self.model
        );

        let schema = OutputSchema::analysis_result();
        debug!("Requesting output schema {} v{}", schema.name, schema.version);

        let request = GenerationRequest {
            model: self.model.clone(),
            system: Some(ANALYSIS_SYSTEM_PROMPT.to_string()),
            prompt: analysis_prompt(corpus, &self.budget),
            schema: Some(schema),
            web_search: false,
            temperature: self.temperature,
        };

        let response = self
            .client
            .generate(request)
            .await
            .map_err(|e| PipelineError::AnalysisFailed(e.into()))?;

        let result = parse_analysis(&response.text).map_err(PipelineError::AnalysisFailed)?;

        let mismatched = label_mismatches(&result);
        if !mismatched.is_empty() {
            warn!(
                "Themes and quotes are not label-synchronized: {}",
                mismatched.join(", ")
            );
        }

        info!(
            "Analysis produced {} themes and {} quote groups",
            result.key_themes.len(),
            result.quotes.len()
        );

        Ok(result)
    }
}

/// Validate and deserialize an analysis reply.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, FailureCause> {
    if text.trim().is_empty() {
        return Err(FailureCause::EmptyResponse);
    }

    let result: AnalysisResult = OutputSchema::analysis_result().parse(text)?;

    let sentiment = result.sentiment;
    for (name, share) in [
        ("positive", sentiment.positive),
        ("neutral", sentiment.neutral),
        ("negative", sentiment.negative),
    ] {
        if !share.is_finite() || share < 0.0 {
            return Err(SchemaError::OutOfRange {
                path: format!("$.sentiment.{}", name),
                reason: format!("share must be a non-negative number, got {}", share),
            }
            .into());
        }
    }

    Ok(result)
}
