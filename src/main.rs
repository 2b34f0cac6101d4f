//! SurveyLens - LLM-powered survey analytics
//!
//! A CLI tool that aggregates structured survey answers, analyzes the
//! free-text answers with a generative-text backend and writes an
//! analytics report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, dataset, arguments, backend setup, etc.)
//!   2 - Report written, but the AI analysis or summary revision failed

mod analysis;
mod cli;
mod config;
mod error;
mod llm;
mod models;
mod orchestrator;
mod report;
mod session;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Dataset, ReportMetadata, Survey};
use orchestrator::{AnalysisOrchestrator, QuestionSuggester, RevisionOrchestrator};
use session::{AnalyticsSession, RequestState};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Configuration decides the default verbosity, so it is loaded first
    let config = match load_config(&args) {
        Ok(mut config) => {
            config.merge_with_args(&args);
            config
        }
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("SurveyLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .surveylens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the backend, models, theme counts and report.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` overrides the verbosity flags.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the analytics workflow. Returns the exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    if let Some(ref topic) = args.suggest {
        return handle_suggest(topic, &args, &config).await;
    }

    // Step 1: Load the dataset
    let data_path = args
        .data
        .as_ref()
        .context("A dataset is required (--data FILE)")?;
    let dataset = Dataset::load(data_path)?;
    info!(
        "Loaded {} surveys and {} responses from {}",
        dataset.surveys.len(),
        dataset.responses.len(),
        data_path.display()
    );

    if args.list {
        return Ok(handle_list(&dataset));
    }

    // Step 2: Aggregate the selected survey
    let survey = select_survey(&dataset, args.survey.as_deref())?;
    let responses = dataset.responses_for(&survey.id);

    println!("📋 Survey: {} ({})", survey.title, survey.id);
    println!("   Responses: {}", responses.len());

    let mut session = AnalyticsSession::new(survey.clone(), &responses);
    println!("   Free-text answers: {}", session.corpus().len());
    print_distributions(&session);

    let mut errors: Vec<String> = Vec::new();
    let mut model_used = None;

    // Step 3: AI analysis and optional revision
    if args.no_ai {
        info!("AI analysis skipped (--no-ai)");
    } else if session.corpus().is_empty() {
        println!("\nℹ️  No free-text answers to analyze; skipping the AI analysis.");
        if args.edit.is_some() {
            errors.push(
                "summary revision skipped: there is no analysis result to revise".to_string(),
            );
        }
    } else {
        let client = llm::build_client(&config.model, args.api_key.clone())
            .context("Failed to set up the generative-text backend")?;

        let analysis_model = config.model.effective_analysis_model();
        model_used = Some(format!("{}/{}", config.model.backend, analysis_model));

        println!("\n🤖 Running AI analysis...");
        println!("   Backend: {}", config.model.backend);
        println!("   Model: {}", analysis_model);
        println!("   Timeout: {}s", config.model.timeout_seconds);

        let orchestrator = AnalysisOrchestrator::new(
            client.clone(),
            analysis_model,
            config.model.temperature,
            config.analysis.clone(),
        );

        if let Some(ticket) = session.begin_analysis() {
            let spinner = spinner(
                &args,
                format!(
                    "Analyzing {} answers with {}...",
                    ticket.corpus.len(),
                    orchestrator.model()
                ),
            );
            let outcome = orchestrator.analyze(&ticket.corpus).await;
            finish_spinner(spinner);
            session.complete_analysis(ticket.id, outcome);
        }

        if let Some(message) = session.last_error() {
            eprintln!("   ❌ {}", message);
            errors.push(message.to_string());
        } else if let Some(result) = session.result() {
            println!(
                "   ✅ {} themes, sentiment {:.0}% positive / {:.0}% neutral / {:.0}% negative",
                result.key_themes.len(),
                result.sentiment.positive,
                result.sentiment.neutral,
                result.sentiment.negative
            );
        }

        if let Some(ref instruction) = args.edit {
            let reviser = RevisionOrchestrator::new(
                client.clone(),
                config.model.effective_revision_model(),
                config.model.temperature,
            );
            if let Err(message) = revise_summary(&mut session, &reviser, instruction, &args).await {
                eprintln!("   ❌ {}", message);
                errors.push(message);
            }
        }
    }

    // Step 4: Theme drill-down
    if let Some(ref theme) = args.theme {
        if session.result().is_none() {
            warn!("No analysis result; ignoring --theme {}", theme);
        } else if let Some(detail) = session.toggle_theme(theme) {
            println!("\n🔎 Theme: {}", detail.theme);
            match detail.description {
                Some(ref description) => println!("   {}", description),
                None => println!("   (no description)"),
            }
            match detail.quotes {
                Some(ref quotes) => {
                    for quote in quotes {
                        println!("   > \"{}\"", quote);
                    }
                }
                None => println!("   (no quotes)"),
            }
        }
    }

    // Step 5: Build and save the report
    println!("\n📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let metadata = ReportMetadata {
        survey_id: session.survey().id.clone(),
        survey_title: session.survey().title.clone(),
        generated_at: Utc::now(),
        model_used,
        response_count: session.response_count(),
        corpus_size: session.corpus().len(),
        duration_seconds: duration,
    };
    let report = session.report(metadata, errors);

    let content = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output = output_path(&args, &config);
    report::write_report(&content, &output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    // Print summary
    println!("\n📊 Summary:");
    println!("   Questions aggregated: {}", report.distributions.len());
    println!("   AI analysis: {}", report.status);
    if !report.sources.is_empty() {
        println!("   Sources: {}", report.sources.len());
    }
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Report saved to: {}", output.display());

    if !report.errors.is_empty() {
        eprintln!(
            "\n⛔ {} AI step(s) failed. See the report for details (exit code 2).",
            report.errors.len()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Run one summary revision through the session. Returns the failure message.
async fn revise_summary(
    session: &mut AnalyticsSession,
    reviser: &RevisionOrchestrator,
    instruction: &str,
    args: &Args,
) -> std::result::Result<(), String> {
    let ticket = session
        .begin_revision(instruction, args.search)
        .map_err(|e| format!("summary revision skipped: {}", e))?;

    println!("\n✏️  Revising summary...");
    println!("   Model: {}", reviser.model());
    if args.search {
        println!("   Web search: enabled");
    }

    let spinner = spinner(args, "Revising summary...".to_string());
    let outcome = reviser.revise(&ticket.request).await;
    finish_spinner(spinner);
    session.complete_revision(ticket.id, outcome);

    match session.revision_state() {
        RequestState::Failed { message } => Err(message.clone()),
        _ => {
            println!(
                "   ✅ Summary revised ({} sources)",
                session.sources().len()
            );
            Ok(())
        }
    }
}

/// Handle --suggest: print suggested questions for a topic.
async fn handle_suggest(topic: &str, args: &Args, config: &Config) -> Result<i32> {
    let client = llm::build_client(&config.model, args.api_key.clone())
        .context("Failed to set up the generative-text backend")?;
    let suggester = QuestionSuggester::new(
        client,
        config.model.effective_revision_model(),
        config.model.temperature,
    );

    println!("💡 Suggesting questions for: {}", topic.trim());

    let spinner = spinner(args, "Waiting for suggestions...".to_string());
    let result = suggester.suggest(topic).await;
    finish_spinner(spinner);
    let questions = result?;

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&questions)?;
            match args.output {
                Some(ref path) => {
                    report::write_report(&json, path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("\n✅ Questions saved to: {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        OutputFormat::Markdown => {
            println!();
            for (i, question) in questions.iter().enumerate() {
                println!("{}. [{}] {} ({})", i + 1, question.kind, question.text, question.id);
                for option in &question.options {
                    println!("     - {}", option);
                }
            }
        }
    }

    Ok(0)
}

/// Handle --list: print the surveys in the dataset.
fn handle_list(dataset: &Dataset) -> i32 {
    if dataset.surveys.is_empty() {
        println!("   The dataset contains no surveys.");
        return 0;
    }

    println!("\n📚 Surveys:\n");
    for survey in &dataset.surveys {
        println!(
            "   {}  {} ({} questions, {} responses)",
            survey.id,
            survey.title,
            survey.questions.len(),
            dataset.responses_for(&survey.id).len()
        );
    }

    0
}

/// Pick the survey to analyze.
fn select_survey<'a>(dataset: &'a Dataset, id: Option<&str>) -> Result<&'a Survey> {
    match id {
        Some(id) => dataset.survey(id).with_context(|| {
            format!(
                "Survey '{}' not found in the dataset (use --list to see available surveys)",
                id
            )
        }),
        None => match dataset.surveys.as_slice() {
            [only] => Ok(only),
            [] => bail!("The dataset contains no surveys"),
            surveys => bail!(
                "The dataset contains {} surveys; choose one with --survey (see --list)",
                surveys.len()
            ),
        },
    }
}

fn print_distributions(session: &AnalyticsSession) {
    for dist in session.distributions() {
        let top = analysis::most_common(dist)
            .map(|b| format!("{} ({})", b.label, b.count))
            .unwrap_or_else(|| "no answers".to_string());
        println!("   • {} [{}]: {}", dist.question_text, dist.kind, top);
    }
}

/// The report path. JSON output swaps the extension of the configured
/// default unless --output was given.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    let mut path = PathBuf::from(&config.general.output);
    if args.output.is_none() && args.format == OutputFormat::Json {
        path.set_extension("json");
    }
    path
}

fn spinner(args: &Args, message: String) -> Option<ProgressBar> {
    if args.quiet {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

fn finish_spinner(spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    Ok(Config::load_default()?.unwrap_or_default())
}
