//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.surveylens.toml` files.

use crate::llm::Backend;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".surveylens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "surveylens_report.md".to_string()
}

/// Generative-text backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Which backend to use.
    #[serde(default)]
    pub backend: Backend,

    /// Model for the structured analysis (backend default when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_model: Option<String>,

    /// Model for summary revisions and suggestions (backend default when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_model: Option<String>,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Gemini API URL.
    #[serde(default = "default_gemini_url")]
    pub gemini_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            analysis_model: None,
            revision_model: None,
            ollama_url: default_ollama_url(),
            gemini_url: default_gemini_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ModelConfig {
    pub fn effective_analysis_model(&self) -> String {
        self.analysis_model
            .clone()
            .unwrap_or_else(|| self.backend.default_analysis_model().to_string())
    }

    pub fn effective_revision_model(&self) -> String {
        self.revision_model
            .clone()
            .unwrap_or_else(|| self.backend.default_revision_model().to_string())
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> u64 {
    600 // structured analysis with large models is slow
}

/// How many themes and quotes the analysis asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_min_themes")]
    pub min_themes: usize,

    #[serde(default = "default_max_themes")]
    pub max_themes: usize,

    #[serde(default = "default_min_quotes")]
    pub min_quotes: usize,

    #[serde(default = "default_max_quotes")]
    pub max_quotes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_themes: default_min_themes(),
            max_themes: default_max_themes(),
            min_quotes: default_min_quotes(),
            max_quotes: default_max_quotes(),
        }
    }
}

fn default_min_themes() -> usize {
    5
}

fn default_max_themes() -> usize {
    7
}

fn default_min_quotes() -> usize {
    2
}

fn default_max_quotes() -> usize {
    3
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the quotes of every theme.
    #[serde(default = "default_true")]
    pub include_quotes: bool,

    /// Include the quantitative distributions.
    #[serde(default = "default_true")]
    pub include_distributions: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_quotes: true,
            include_distributions: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;
        if analysis.min_themes == 0 || analysis.min_themes > analysis.max_themes {
            bail!(
                "analysis theme range {}..={} is invalid",
                analysis.min_themes,
                analysis.max_themes
            );
        }
        if analysis.min_quotes == 0 || analysis.min_quotes > analysis.max_quotes {
            bail!(
                "analysis quote range {}..={} is invalid",
                analysis.min_quotes,
                analysis.max_quotes
            );
        }
        if !(0.0..=1.0).contains(&self.model.temperature) {
            bail!("temperature must be between 0.0 and 1.0");
        }
        if self.model.timeout_seconds == 0 {
            bail!("timeout must be at least 1 second");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(backend) = args.backend {
            // Model names are backend specific; drop file values for another backend.
            if backend != self.model.backend {
                self.model.analysis_model = None;
                self.model.revision_model = None;
            }
            self.model.backend = backend;
        }
        if let Some(ref model) = args.model {
            self.model.analysis_model = Some(model.clone());
        }
        if let Some(ref model) = args.revision_model {
            self.model.revision_model = Some(model.clone());
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(ref url) = args.gemini_url {
            self.model.gemini_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
