//! Tutor profiles and registry
//!
//! A tutor is a prompt configuration, not a process: an id, a system prompt,
//! and a short handoff description the triage model reads when deciding where
//! to send a question. The registry is built once from configuration and is
//! immutable for the life of the session.

use crate::error::{TriageError, TriageResult};
use crate::llm::provider::{CompletionRequest, LlmProvider, TokenUsage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A subject-specialist prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TutorProfile {
    /// Tutor identifier (must match [a-zA-Z0-9._-]+)
    pub id: String,
    /// Human-readable name shown in answers
    pub display_name: String,
    /// One-line description the triage model uses to pick a handoff target
    pub handoff_description: String,
    /// System prompt for answering questions in this subject
    pub system_prompt: String,
    /// Optional temperature override
    pub temperature: Option<f32>,
    /// Optional max tokens override
    pub max_tokens: Option<u32>,
}

/// An answer produced by a tutor completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorAnswer {
    pub tutor_id: String,
    pub content: String,
    pub usage: TokenUsage,
}

/// Registry of tutors available for handoff, keyed by id
///
/// Insertion order is preserved so the triage catalog reads the same way the
/// config file does.
#[derive(Debug, Default)]
pub struct TutorRegistry {
    tutors: HashMap<String, TutorProfile>,
    order: Vec<String>,
}

impl TutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from config-loaded profiles, rejecting duplicate ids
    pub fn from_profiles(profiles: Vec<TutorProfile>) -> TriageResult<Self> {
        let mut registry = Self::new();
        for profile in profiles {
            registry.register(profile)?;
        }
        Ok(registry)
    }

    /// Register a tutor profile
    pub fn register(&mut self, profile: TutorProfile) -> TriageResult<()> {
        if self.tutors.contains_key(&profile.id) {
            return Err(TriageError::invalid_input(format!(
                "Duplicate tutor id: {}",
                profile.id
            )));
        }

        debug!(tutor_id = %profile.id, "Registered tutor");
        self.order.push(profile.id.clone());
        self.tutors.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Look up a tutor by id
    pub fn get(&self, id: &str) -> Option<&TutorProfile> {
        self.tutors.get(id)
    }

    /// Iterate tutors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &TutorProfile> {
        self.order.iter().filter_map(|id| self.tutors.get(id))
    }

    pub fn len(&self) -> usize {
        self.tutors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tutors.is_empty()
    }
}

/// Run one completion against a tutor's prompt configuration
pub async fn answer_with_tutor(
    provider: Arc<dyn LlmProvider>,
    model: &str,
    profile: &TutorProfile,
    question: &str,
) -> TriageResult<TutorAnswer> {
    info!(tutor_id = %profile.id, "Delegating question to tutor");

    let mut request = CompletionRequest::from_prompts(model, &profile.system_prompt, question);
    request.temperature = profile.temperature;
    request.max_tokens = profile.max_tokens;

    let response = provider
        .complete(request)
        .await
        .map_err(|e| TriageError::llm_error(e.to_string()))?;

    let content = response.content.ok_or_else(|| {
        TriageError::llm_error(format!("No content in {} tutor response", profile.id))
    })?;

    debug!(
        tutor_id = %profile.id,
        total_tokens = response.usage.total_tokens,
        "Tutor answer received"
    );

    Ok(TutorAnswer {
        tutor_id: profile.id.clone(),
        content,
        usage: response.usage,
    })
}
