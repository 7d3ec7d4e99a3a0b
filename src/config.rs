//! Configuration system for the triage assistant
//!
//! TOML-based configuration with environment-variable indirection for API
//! keys. The file names tutors as an array of tables; ids must be unique and
//! match `[a-zA-Z0-9._-]+`.

use crate::tutor::TutorProfile;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Main assistant configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantConfig {
    pub llm: LlmSection,
    #[serde(default)]
    pub guardrail: GuardrailSection,
    #[serde(default)]
    pub triage: TriageSection,
    #[serde(default)]
    pub tutors: Vec<TutorProfile>,
}

/// LLM section: the provider every step runs against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name (e.g., "anthropic", "openai")
    pub provider: String,
    /// Model identifier for answering questions
    pub model: String,
    /// Environment variable containing API key
    pub api_key_env: String,
    /// System prompt used when triage answers directly
    #[serde(default = "default_direct_prompt")]
    pub direct_system_prompt: String,
    /// Optional temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Optional max tokens
    pub max_tokens: Option<u32>,
}

/// Guardrail section: the homework classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuardrailSection {
    /// Model override for the classifier call (defaults to llm.model)
    pub model: Option<String>,
    /// Classification temperature (default: 0.0)
    #[serde(default = "default_guardrail_temperature")]
    pub temperature: f32,
}

impl Default for GuardrailSection {
    fn default() -> Self {
        Self {
            model: None,
            temperature: default_guardrail_temperature(),
        }
    }
}

/// Triage section: the handoff decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageSection {
    /// Model override for the handoff call (defaults to llm.model)
    pub model: Option<String>,
    /// Temperature for handoff decisions (default: 0.1)
    #[serde(default = "default_triage_temperature")]
    pub temperature: f32,
}

impl Default for TriageSection {
    fn default() -> Self {
        Self {
            model: None,
            temperature: default_triage_temperature(),
        }
    }
}

fn default_guardrail_temperature() -> f32 {
    0.0
}

fn default_triage_temperature() -> f32 {
    0.1
}

fn default_direct_prompt() -> String {
    "You are a study assistant. Answer the student's question clearly and \
     encourage them to work through the material themselves."
        .to_string()
}

impl AssistantConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AssistantConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the API key through the configured environment variable
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .map_err(|_| ConfigError::MissingEnvVar(self.llm.api_key_env.clone()))
    }

    /// Model to use for the guardrail classifier
    pub fn guardrail_model(&self) -> &str {
        self.guardrail.model.as_deref().unwrap_or(&self.llm.model)
    }

    /// Model to use for the triage handoff decision
    pub fn triage_model(&self) -> &str {
        self.triage.model.as_deref().unwrap_or(&self.llm.model)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.llm.provider.as_str() {
            "openai" | "anthropic" => {}
            other => {
                return Err(ConfigError::InvalidConfig(format!(
                    "Unknown provider: {other} (expected \"openai\" or \"anthropic\")"
                )));
            }
        }

        if self.llm.api_key_env.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "llm.api_key_env must not be empty".to_string(),
            ));
        }

        let id_pattern = regex::Regex::new(r"^[a-zA-Z0-9._-]+$").unwrap();
        let mut seen = std::collections::HashSet::new();

        for tutor in &self.tutors {
            if !id_pattern.is_match(&tutor.id) {
                return Err(ConfigError::InvalidConfig(format!(
                    "Tutor id '{}' must match [a-zA-Z0-9._-]+",
                    tutor.id
                )));
            }
            if !seen.insert(tutor.id.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "Duplicate tutor id: {}",
                    tutor.id
                )));
            }
            if tutor.system_prompt.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(format!(
                    "Tutor '{}' has an empty system prompt",
                    tutor.id
                )));
            }
        }

        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    MissingEnvVar(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
