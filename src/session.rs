//! Session orchestration: guardrail, then triage, then a tutor
//!
//! A session is one question moving through the pipeline:
//!
//! ```text
//! question -> InputGuardrail -> Triage -> Tutor (or direct answer)
//! ```
//!
//! A tripped guardrail is the single short-circuit point: nothing downstream
//! of it runs, and the refusal carries the classifier's reasoning.

use crate::error::{TriageError, TriageResult};
use crate::guardrail::InputGuardrail;
use crate::llm::provider::{CompletionRequest, LlmProvider, TokenUsage};
use crate::triage::{Triage, TriageDecision};
use crate::tutor::{answer_with_tutor, TutorRegistry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Outcome of one triage session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The question was answered, by a tutor or by the triage assistant
    Answered {
        session_id: Uuid,
        /// Tutor that produced the answer; None for a direct answer
        tutor_id: Option<String>,
        /// Triage reasoning behind the routing
        reasoning: String,
        answer: String,
        usage: TokenUsage,
        answered_at: DateTime<Utc>,
    },
    /// The guardrail tripped; no tutor was consulted
    Refused {
        session_id: Uuid,
        reasoning: String,
    },
}

impl SessionOutcome {
    /// Check if the session produced an answer
    pub fn is_answered(&self) -> bool {
        matches!(self, SessionOutcome::Answered { .. })
    }

    /// Convert a refusal into an error, for callers that treat it as fatal
    pub fn into_answer(self) -> TriageResult<String> {
        match self {
            SessionOutcome::Answered { answer, .. } => Ok(answer),
            SessionOutcome::Refused { reasoning, .. } => {
                Err(TriageError::GuardrailTripped { reasoning })
            }
        }
    }
}

/// One-question pipeline over a guardrail, a triage, and a tutor registry
pub struct TriageSession {
    provider: Arc<dyn LlmProvider>,
    guardrail: Arc<dyn InputGuardrail>,
    triage: Arc<dyn Triage>,
    registry: TutorRegistry,
    /// Model used for tutor and direct answers
    answer_model: String,
    /// System prompt used when triage declines to hand off
    direct_system_prompt: String,
    answer_temperature: Option<f32>,
    answer_max_tokens: Option<u32>,
}

impl TriageSession {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        guardrail: Arc<dyn InputGuardrail>,
        triage: Arc<dyn Triage>,
        registry: TutorRegistry,
        answer_model: String,
        direct_system_prompt: String,
    ) -> Self {
        Self {
            provider,
            guardrail,
            triage,
            registry,
            answer_model,
            direct_system_prompt,
            answer_temperature: None,
            answer_max_tokens: None,
        }
    }

    /// Set temperature and max tokens for answer completions
    pub fn with_answer_limits(
        mut self,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Self {
        self.answer_temperature = temperature;
        self.answer_max_tokens = max_tokens;
        self
    }

    /// Run one question through guardrail, triage, and generation
    pub async fn ask(&self, question: &str) -> TriageResult<SessionOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TriageError::invalid_input("Question must not be empty"));
        }

        let session_id = Uuid::new_v4();
        info!(session_id = %session_id, "Starting triage session");

        let verdict = self
            .guardrail
            .check(question)
            .instrument(crate::guardrail_span!(session_id = %session_id))
            .await?;

        if verdict.tripwire_triggered {
            info!(
                session_id = %session_id,
                reasoning = %verdict.reasoning,
                "Guardrail tripped, refusing question"
            );
            return Ok(SessionOutcome::Refused {
                session_id,
                reasoning: verdict.reasoning,
            });
        }

        let decision = self
            .triage
            .decide(question, &self.registry)
            .instrument(crate::triage_span!(session_id = %session_id))
            .await?;

        match decision {
            TriageDecision::Handoff { tutor_id, reasoning } => {
                // Triage validated the id against the registry; a miss here
                // means the registry changed underneath us
                let profile = self.registry.get(&tutor_id).ok_or_else(|| {
                    TriageError::UnknownTutor {
                        tutor_id: tutor_id.clone(),
                    }
                })?;

                let answer = answer_with_tutor(
                    self.provider.clone(),
                    &self.answer_model,
                    profile,
                    question,
                )
                .instrument(crate::tutor_span!(session_id = %session_id, tutor_id = %tutor_id))
                .await?;

                Ok(SessionOutcome::Answered {
                    session_id,
                    tutor_id: Some(answer.tutor_id),
                    reasoning,
                    answer: answer.content,
                    usage: answer.usage,
                    answered_at: Utc::now(),
                })
            }
            TriageDecision::Direct { reasoning } => {
                let answer = self
                    .answer_directly(question)
                    .instrument(crate::tutor_span!(session_id = %session_id, tutor_id = "direct"))
                    .await?;

                Ok(SessionOutcome::Answered {
                    session_id,
                    tutor_id: None,
                    reasoning,
                    answer: answer.0,
                    usage: answer.1,
                    answered_at: Utc::now(),
                })
            }
        }
    }

    /// Answer with the triage assistant's own general prompt
    async fn answer_directly(&self, question: &str) -> TriageResult<(String, TokenUsage)> {
        info!("Answering directly, no handoff");

        let mut request = CompletionRequest::from_prompts(
            &self.answer_model,
            &self.direct_system_prompt,
            question,
        );
        request.temperature = self.answer_temperature;
        request.max_tokens = self.answer_max_tokens;

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| TriageError::llm_error(e.to_string()))?;

        let content = response
            .content
            .ok_or_else(|| TriageError::llm_error("No content in direct answer response"))?;

        Ok((content, response.usage))
    }
}
