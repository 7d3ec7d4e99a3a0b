//! Tutor Triage - Main Entry Point
//!
//! CLI for the homework triage assistant: run one question through the
//! guardrail/triage/tutor pipeline, or inspect configuration.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tutor_triage::config::AssistantConfig;
use tutor_triage::guardrail::HomeworkGuardrail;
use tutor_triage::llm::{
    AnthropicConfig, AnthropicProvider, LlmProvider, OpenAiConfig, OpenAiProvider,
};
use tutor_triage::observability::init_default_logging;
use tutor_triage::session::{SessionOutcome, TriageSession};
use tutor_triage::triage::LlmTriage;
use tutor_triage::tutor::TutorRegistry;
use tutor_triage::TriageError;

/// Homework triage assistant
#[derive(Parser)]
#[command(name = "tutor-triage")]
#[command(about = "Route student questions to subject tutors, behind a homework guardrail")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the answer or refusal
    Ask {
        /// The question to triage
        question: String,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    // Load configuration
    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Ask { question } => ask(config, &question).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e.user_message());
        process::exit(1);
    }
}

fn load_configuration(config_path: &Option<PathBuf>) -> Result<AssistantConfig, TriageError> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(AssistantConfig::load_from_file(path)?)
        }
        None => {
            // Try default locations
            let default_paths = vec!["triage.toml", "config/triage.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(AssistantConfig::load_from_file(&path)?);
                }
            }

            error!(
                "No configuration file found. Please provide one with -c/--config or create triage.toml"
            );
            process::exit(1);
        }
    }
}

/// Build the configured LLM provider
fn build_provider(config: &AssistantConfig) -> Result<Arc<dyn LlmProvider>, TriageError> {
    let api_key = config.resolve_api_key()?;

    let provider: Arc<dyn LlmProvider> = match config.llm.provider.as_str() {
        "openai" => Arc::new(
            OpenAiProvider::new(OpenAiConfig {
                api_key,
                ..Default::default()
            })
            .map_err(|e| TriageError::llm_error(e.to_string()))?,
        ),
        "anthropic" => Arc::new(
            AnthropicProvider::new(AnthropicConfig {
                api_key,
                ..Default::default()
            })
            .map_err(|e| TriageError::llm_error(e.to_string()))?,
        ),
        other => {
            return Err(TriageError::invalid_input(format!(
                "Unknown provider: {other}"
            )));
        }
    };

    Ok(provider)
}

/// Assemble the session from configuration
fn build_session(config: &AssistantConfig) -> Result<TriageSession, TriageError> {
    let provider = build_provider(config)?;

    let guardrail = HomeworkGuardrail::new(provider.clone(), config.guardrail_model().to_string())
        .with_temperature(config.guardrail.temperature);

    let triage = LlmTriage::new(provider.clone(), config.triage_model().to_string())
        .with_temperature(config.triage.temperature);

    let registry = TutorRegistry::from_profiles(config.tutors.clone())?;

    Ok(TriageSession::new(
        provider,
        Arc::new(guardrail),
        Arc::new(triage),
        registry,
        config.llm.model.clone(),
        config.llm.direct_system_prompt.clone(),
    )
    .with_answer_limits(config.llm.temperature, config.llm.max_tokens))
}

async fn ask(config: AssistantConfig, question: &str) -> Result<(), TriageError> {
    let session = build_session(&config)?;

    match session.ask(question).await? {
        SessionOutcome::Answered {
            tutor_id,
            reasoning,
            answer,
            ..
        } => {
            match tutor_id {
                Some(id) => info!(tutor_id = %id, reasoning = %reasoning, "Answered via tutor"),
                None => info!(reasoning = %reasoning, "Answered directly"),
            }
            println!("{answer}");
            Ok(())
        }
        SessionOutcome::Refused { reasoning, .. } => {
            println!("This question was declined: {reasoning}");
            println!("Ask about the underlying concept instead, and a tutor will help.");
            Ok(())
        }
    }
}

fn handle_config_command(config: AssistantConfig, show: bool) -> Result<(), TriageError> {
    config.validate()?;
    info!("Configuration is valid");

    if show {
        let toml = toml::to_string_pretty(&config)
            .map_err(|e| TriageError::internal_error(format!("Failed to render config: {e}")))?;
        println!("{toml}");
    }

    Ok(())
}
