//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::llm::Backend;
use clap::Parser;
use std::path::PathBuf;

/// SurveyLens - LLM-powered survey analytics
///
/// Aggregates structured answers, analyzes free-text answers with an LLM
/// (sentiment, themes, quotes, summary) and writes Markdown/JSON reports.
///
/// Examples:
///   surveylens --data surveys.json --list
///   surveylens --data surveys.json --survey survey-1
///   surveylens --data surveys.json --survey survey-1 --no-ai
///   surveylens --data surveys.json --backend gemini --edit "Make it formal" --search
///   surveylens --data surveys.json --theme "Food temperature" --format json
///   surveylens --suggest "Remote work satisfaction"
///   surveylens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON dataset with `surveys` and `responses`
    #[arg(
        short,
        long,
        value_name = "FILE",
        required_unless_present_any = ["init_config", "suggest"]
    )]
    pub data: Option<PathBuf>,

    /// Survey to analyze
    ///
    /// May be omitted when the dataset holds a single survey.
    #[arg(short, long, value_name = "ID")]
    pub survey: Option<String>,

    /// List the surveys in the dataset and exit
    #[arg(long)]
    pub list: bool,

    /// Skip the AI analysis (quantitative breakdown only)
    #[arg(long)]
    pub no_ai: bool,

    /// Revise the generated summary with this instruction
    #[arg(long, value_name = "INSTRUCTION")]
    pub edit: Option<String>,

    /// Ground the summary revision with web search (requires --edit)
    #[arg(long, requires = "edit")]
    pub search: bool,

    /// Show the description and quotes of one theme
    #[arg(long, value_name = "LABEL")]
    pub theme: Option<String>,

    /// Suggest survey questions for a topic and exit
    #[arg(long, value_name = "TOPIC", conflicts_with_all = ["list", "edit", "theme"])]
    pub suggest: Option<String>,

    /// Generative-text backend
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<Backend>,

    /// Model for the analysis
    ///
    /// Can also be set via SURVEYLENS_MODEL env var or .surveylens.toml config.
    #[arg(short, long, env = "SURVEYLENS_MODEL")]
    pub model: Option<String>,

    /// Model for summary revisions and question suggestions
    #[arg(long, value_name = "MODEL")]
    pub revision_model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Gemini API endpoint URL
    #[arg(long)]
    pub gemini_url: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .surveylens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .surveylens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        for url in [&self.ollama_url, &self.gemini_url].into_iter().flatten() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("API URL must start with 'http://' or 'https://': {}", url));
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.no_ai && self.edit.is_some() {
            return Err("Cannot use --edit together with --no-ai".to_string());
        }

        if let Some(ref topic) = self.suggest {
            if topic.trim().is_empty() {
                return Err("The --suggest topic must not be empty".to_string());
            }
            return Ok(());
        }

        if let Some(ref data) = self.data {
            if !data.is_file() {
                return Err(format!("Dataset file does not exist: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
