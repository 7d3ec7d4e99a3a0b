//! Tutor Triage - Homework Triage Assistant
//!
//! A small educational-assistant pipeline: a student's natural-language
//! question is screened by a homework-completion guardrail, routed by a
//! triage model to one of several subject-specialist tutors, and answered
//! with that tutor's prompt configuration.
//!
//! # Overview
//!
//! This crate provides:
//! - An LLM provider abstraction with OpenAI and Anthropic backends
//! - An input guardrail with structured boolean+reasoning classification
//! - Model-driven handoff (triage) over a configurable tutor catalog
//! - A session orchestrator tying the three together
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tutor_triage::guardrail::HomeworkGuardrail;
//! use tutor_triage::llm::{OpenAiConfig, OpenAiProvider};
//! use tutor_triage::session::TriageSession;
//! use tutor_triage::triage::LlmTriage;
//! use tutor_triage::tutor::{TutorProfile, TutorRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(OpenAiProvider::new(OpenAiConfig {
//!     api_key: std::env::var("OPENAI_API_KEY")?,
//!     ..Default::default()
//! })?);
//!
//! let registry = TutorRegistry::from_profiles(vec![TutorProfile {
//!     id: "math-tutor".to_string(),
//!     display_name: "Math Tutor".to_string(),
//!     handoff_description: "Specialist for math questions".to_string(),
//!     system_prompt: "You provide help with math problems.".to_string(),
//!     temperature: None,
//!     max_tokens: None,
//! }])?;
//!
//! let session = TriageSession::new(
//!     provider.clone(),
//!     Arc::new(HomeworkGuardrail::new(provider.clone(), "gpt-4o-mini".into())),
//!     Arc::new(LlmTriage::new(provider, "gpt-4o-mini".into())),
//!     registry,
//!     "gpt-4o-mini".to_string(),
//!     "You are a study assistant.".to_string(),
//! );
//!
//! let outcome = session.ask("How do I solve 2x + 3 = 7?").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod guardrail;
pub mod llm;
pub mod observability;
pub mod session;
pub mod testing;
pub mod triage;
pub mod tutor;

pub use config::{AssistantConfig, ConfigError};
pub use error::{TriageError, TriageResult};
pub use guardrail::{GuardrailVerdict, HomeworkGuardrail, InputGuardrail};
pub use session::{SessionOutcome, TriageSession};
pub use triage::{LlmTriage, Triage, TriageDecision};
pub use tutor::{TutorProfile, TutorRegistry};
