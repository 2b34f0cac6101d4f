//! Markdown and JSON report generation.
//!
//! This module renders the consumer-facing outputs of a session: the
//! quantitative breakdown, the AI analysis, the selected theme and the
//! sources backing the summary.

use crate::analysis::{label_mismatches, most_common, respondent_shares, scale_mean, ThemeDetail};
use crate::config::ReportConfig;
use crate::models::{
    AnalysisResult, AnalysisStatus, Distribution, GroundingSource, Report, ReportMetadata,
    SentimentBreakdown,
};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!(
        "# SurveyLens Report: {}\n\n",
        report.metadata.survey_title
    ));

    output.push_str(&generate_metadata_section(&report.metadata, &report.status));
    output.push_str(&generate_table_of_contents(report, options));

    match report.analysis {
        Some(ref analysis) => {
            output.push_str(&generate_summary_section(&analysis.summary, &report.sources));
            output.push_str(&generate_sentiment_section(&analysis.sentiment));
            output.push_str(&generate_themes_section(analysis, options.include_quotes));
        }
        None => output.push_str(&generate_no_analysis_section(&report.status)),
    }

    if let Some(ref detail) = report.theme_detail {
        output.push_str(&generate_theme_detail_section(detail));
    }

    if options.include_distributions {
        output.push_str(&generate_distributions_section(&report.distributions));
    }

    output.push_str(&generate_errors_section(&report.errors));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, status: &AnalysisStatus) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Survey:** `{}`\n", metadata.survey_id));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Responses:** {}\n", metadata.response_count));
    section.push_str(&format!(
        "- **Free-text Answers:** {}\n",
        metadata.corpus_size
    ));
    if let Some(ref model) = metadata.model_used {
        section.push_str(&format!("- **Model Used:** `{}`\n", model));
    }
    section.push_str(&format!("- **AI Analysis:** {}\n", status));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report, options: &ReportConfig) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");

    if report.analysis.is_some() {
        toc.push_str("- [Summary](#summary)\n");
        toc.push_str("- [Sentiment](#sentiment)\n");
        toc.push_str("- [Key Themes](#key-themes)\n");
    } else {
        toc.push_str("- [AI Analysis](#ai-analysis)\n");
    }
    if report.theme_detail.is_some() {
        toc.push_str("- [Theme Detail](#theme-detail)\n");
    }
    if options.include_distributions {
        toc.push_str("- [Quantitative Breakdown](#quantitative-breakdown)\n");
    }
    if !report.errors.is_empty() {
        toc.push_str("- [Errors](#errors)\n");
    }

    toc.push('\n');

    toc
}

/// Generate the summary section with its grounding sources.
fn generate_summary_section(summary: &str, sources: &[GroundingSource]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(summary.trim());
    section.push_str("\n\n");

    if !sources.is_empty() {
        section.push_str("**Sources:**\n\n");
        for (i, source) in sources.iter().enumerate() {
            section.push_str(&format!("{}. [{}]({})\n", i + 1, source.title, source.uri));
        }
        section.push('\n');
    }

    section
}

fn generate_sentiment_section(sentiment: &SentimentBreakdown) -> String {
    let mut section = String::new();
    let normalized = sentiment.normalized();

    section.push_str("## Sentiment\n\n");
    section.push_str("| | Positive | Neutral | Negative | **Total** |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| Reported | {:.1}% | {:.1}% | {:.1}% | **{:.1}%** |\n",
        sentiment.positive,
        sentiment.neutral,
        sentiment.negative,
        sentiment.total()
    ));
    section.push_str(&format!(
        "| Normalized | {:.1}% | {:.1}% | {:.1}% | **{:.1}%** |\n\n",
        normalized.positive,
        normalized.neutral,
        normalized.negative,
        normalized.total()
    ));

    section
}

/// Generate the key themes section.
///
/// Quotes are looked up per theme; a theme without quotes is still listed.
fn generate_themes_section(analysis: &AnalysisResult, include_quotes: bool) -> String {
    let mut section = String::new();

    section.push_str("## Key Themes\n\n");

    if analysis.key_themes.is_empty() {
        section.push_str("No themes were identified.\n\n");
        return section;
    }

    for theme in &analysis.key_themes {
        section.push_str(&format!("### {}\n\n", theme.theme));
        if !theme.description.is_empty() {
            section.push_str(&format!("{}\n\n", theme.description));
        }

        if include_quotes {
            if let Some(group) = analysis.quotes.iter().find(|q| q.theme == theme.theme) {
                for quote in &group.quotes {
                    section.push_str(&blockquote(quote));
                }
            }
        }
    }

    let mismatched = label_mismatches(analysis);
    if !mismatched.is_empty() {
        section.push_str(&format!(
            "*Labels without both a description and quotes: {}*\n\n",
            mismatched.join(", ")
        ));
    }

    section
}

fn generate_no_analysis_section(status: &AnalysisStatus) -> String {
    let message = match status {
        AnalysisStatus::NoCorpus => "There are no free-text answers to analyze.".to_string(),
        AnalysisStatus::NotRequested => "AI analysis was not requested.".to_string(),
        AnalysisStatus::Pending => "AI analysis is still in progress.".to_string(),
        AnalysisStatus::Ready => "AI analysis returned no result.".to_string(),
        AnalysisStatus::Failed { message } => format!("AI analysis failed: {}", message),
    };

    format!("## AI Analysis\n\n{}\n\n", message)
}

/// Generate the drill-down for the selected theme.
fn generate_theme_detail_section(detail: &ThemeDetail) -> String {
    let mut section = String::new();

    section.push_str("## Theme Detail\n\n");
    section.push_str(&format!("**Theme:** {}\n\n", detail.theme));

    match detail.description {
        Some(ref description) => section.push_str(&format!("{}\n\n", description)),
        None => section.push_str("*No description for this theme.*\n\n"),
    }

    match detail.quotes {
        Some(ref quotes) if !quotes.is_empty() => {
            for quote in quotes {
                section.push_str(&blockquote(quote));
            }
        }
        _ => section.push_str("*No quotes for this theme.*\n\n"),
    }

    section
}

/// Generate the quantitative breakdown.
fn generate_distributions_section(distributions: &[Distribution]) -> String {
    let mut section = String::new();

    section.push_str("## Quantitative Breakdown\n\n");

    if distributions.is_empty() {
        section.push_str("This survey has no single-choice, multi-choice or scale questions.\n\n");
        return section;
    }

    for dist in distributions {
        section.push_str(&generate_distribution_table(dist));
    }

    section
}

fn generate_distribution_table(dist: &Distribution) -> String {
    let mut block = String::new();

    block.push_str(&format!("### {}\n\n", dist.question_text));
    block.push_str(&format!(
        "*Type: {} | Respondents: {} | Answers: {}*\n\n",
        dist.kind,
        dist.respondents,
        dist.total()
    ));

    if dist.is_empty() {
        block.push_str("No answers yet.\n\n");
        return block;
    }

    block.push_str("| Answer | Count | Share |\n");
    block.push_str("|:---|:---:|:---:|\n");
    for ((label, share), bucket) in respondent_shares(dist).into_iter().zip(&dist.buckets) {
        block.push_str(&format!(
            "| {} | {} | {:.0}% |\n",
            escape_cell(&label),
            bucket.count,
            share
        ));
    }
    block.push('\n');

    if let Some(top) = most_common(dist) {
        block.push_str(&format!("- **Most common:** {}\n", top.label));
    }
    if let Some(mean) = scale_mean(dist) {
        block.push_str(&format!("- **Mean:** {:.2}\n", mean));
    }
    block.push('\n');

    block
}

/// Quote a verbatim answer, keeping every line inside the blockquote.
fn blockquote(quote: &str) -> String {
    let quoted = format!("\"{}\"", quote);
    let mut block: String = quoted.lines().map(|line| format!("> {}\n", line)).collect();
    block.push('\n');
    block
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn generate_errors_section(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Errors\n\n");
    for error in errors {
        section.push_str(&format!("- {}\n", error));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by SurveyLens v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bucket, KeyTheme, QuestionType, ThemeQuotes};
    use chrono::Utc;

    fn create_test_metadata() -> ReportMetadata {
        ReportMetadata {
            survey_id: "survey-1".to_string(),
            survey_title: "Canteen food quality".to_string(),
            generated_at: Utc::now(),
            model_used: Some("ollama/qwen2.5:14b".to_string()),
            response_count: 3,
            corpus_size: 3,
            duration_seconds: 12.5,
        }
    }

    fn create_test_report() -> Report {
        Report {
            metadata: create_test_metadata(),
            distributions: vec![Distribution {
                question_id: "q1-2".to_string(),
                question_text: "Rate the food quality on a 10-point scale.".to_string(),
                kind: QuestionType::Scale,
                buckets: vec![
                    Bucket {
                        label: "6".to_string(),
                        count: 1,
                    },
                    Bucket {
                        label: "7".to_string(),
                        count: 1,
                    },
                    Bucket {
                        label: "8".to_string(),
                        count: 1,
                    },
                ],
                respondents: 3,
            }],
            status: AnalysisStatus::Ready,
            analysis: Some(AnalysisResult {
                sentiment: SentimentBreakdown {
                    positive: 50.0,
                    neutral: 30.0,
                    negative: 30.0,
                },
                key_themes: vec![
                    KeyTheme {
                        theme: "Food temperature".to_string(),
                        description: "Main courses are often cold".to_string(),
                    },
                    KeyTheme {
                        theme: "Pricing".to_string(),
                        description: "Prices are fair".to_string(),
                    },
                ],
                summary: "Respondents like the prices but not the cold food.".to_string(),
                quotes: vec![ThemeQuotes {
                    theme: "Food temperature".to_string(),
                    quotes: vec!["the food is often cold".to_string()],
                }],
            }),
            sources: vec![GroundingSource {
                uri: "https://example.com/canteens".to_string(),
                title: "Canteen study".to_string(),
            }],
            theme_detail: Some(ThemeDetail {
                theme: "Pricing".to_string(),
                description: Some("Prices are fair".to_string()),
                quotes: None,
            }),
            errors: vec![],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# SurveyLens Report: Canteen food quality"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("1. [Canteen study](https://example.com/canteens)"));
        assert!(markdown.contains("## Key Themes"));
        assert!(markdown.contains("> \"the food is often cold\""));
        assert!(markdown.contains("## Theme Detail"));
        assert!(markdown.contains("*No quotes for this theme.*"));
        assert!(markdown.contains("*Labels without both a description and quotes: Pricing*"));
        assert!(markdown.contains("## Quantitative Breakdown"));
        assert!(!markdown.contains("## Errors"));
    }

    #[test]
    fn test_sentiment_shows_reported_and_normalized() {
        let section = generate_sentiment_section(&SentimentBreakdown {
            positive: 50.0,
            neutral: 30.0,
            negative: 30.0,
        });

        assert!(section.contains("| Reported | 50.0% | 30.0% | 30.0% | **110.0%** |"));
        assert!(section.contains("**100.0%**"));
    }

    #[test]
    fn test_distribution_table() {
        let report = create_test_report();
        let block = generate_distribution_table(&report.distributions[0]);

        assert!(block.contains("*Type: scale | Respondents: 3 | Answers: 3*"));
        assert!(block.contains("| 6 | 1 | 33% |"));
        assert!(block.contains("- **Most common:** 6"));
        assert!(block.contains("- **Mean:** 7.00"));
    }

    #[test]
    fn test_multiline_quote_stays_quoted() {
        let block = blockquote("line\nbreak");
        assert_eq!(block, "> \"line\n> break\"\n\n");
    }

    #[test]
    fn test_pipe_in_label_is_escaped() {
        let mut report = create_test_report();
        let dist = &mut report.distributions[0];
        dist.kind = QuestionType::Radio;
        dist.buckets[0].label = "Yes | mostly".to_string();
        let block = generate_distribution_table(dist);

        assert!(block.contains("| Yes \\| mostly | 1 | 33% |"));
    }

    #[test]
    fn test_report_options() {
        let report = create_test_report();
        let options = ReportConfig {
            include_quotes: false,
            include_distributions: false,
        };
        let markdown = generate_markdown_report(&report, &options);

        assert!(!markdown.contains("> \"the food is often cold\""));
        assert!(!markdown.contains("## Quantitative Breakdown"));
    }

    #[test]
    fn test_report_without_analysis() {
        let mut report = create_test_report();
        report.analysis = None;
        report.sources.clear();
        report.theme_detail = None;
        report.status = AnalysisStatus::Failed {
            message: "request timed out after 600s".to_string(),
        };
        report.errors = vec!["analysis failed: request timed out after 600s".to_string()];

        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("## AI Analysis"));
        assert!(markdown.contains("AI analysis failed: request timed out after 600s"));
        assert!(markdown.contains("## Errors"));
        assert!(!markdown.contains("## Summary"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"survey_id\""));
        assert!(json.contains("\"keyThemes\""));
        assert!(json.contains("\"state\": \"ready\""));
        assert!(json.contains("\"distributions\""));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");

        write_report("# Title\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Title\n");
    }
}
