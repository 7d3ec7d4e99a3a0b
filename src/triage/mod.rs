//! Triage: model-driven handoff to subject tutors
//!
//! The triage model sees the student's question and a catalog of registered
//! tutors (id plus handoff description) and either hands the question to one
//! of them or declines, in which case the triage assistant answers with its
//! own general prompt. Triage never answers the question itself here; it only
//! decides.
//!
//! Structured output guarantees a parseable decision:
//! - OpenAI: JSON Schema with `response_format`
//! - Other providers: JSON mode with the field contract restated in the prompt

pub mod schema;

use crate::error::{TriageError, TriageResult};
use crate::llm::provider::{
    CompletionRequest, JsonSchemaDefinition, LlmProvider, ResponseFormat,
};
use crate::triage::schema::HandoffDecisionOutput;
use crate::tutor::TutorRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decision made for a triaged question
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriageDecision {
    /// Hand the question to a registered tutor
    Handoff { tutor_id: String, reasoning: String },
    /// No specialist fits; the triage assistant answers directly
    Direct { reasoning: String },
}

impl TriageDecision {
    /// Check if this decision hands off to a tutor
    pub fn is_handoff(&self) -> bool {
        matches!(self, TriageDecision::Handoff { .. })
    }

    /// Extract the tutor id if this is a handoff
    pub fn tutor_id(&self) -> Option<&str> {
        match self {
            TriageDecision::Handoff { tutor_id, .. } => Some(tutor_id),
            _ => None,
        }
    }
}

/// Trait for deciding where a question goes after the guardrail passes
#[async_trait::async_trait]
pub trait Triage: Send + Sync {
    /// Decide whether to hand the question to a tutor
    ///
    /// # Errors
    ///
    /// Returns error if the decision cannot be made (provider failure,
    /// unparseable output, or a handoff naming an unregistered tutor).
    async fn decide(
        &self,
        question: &str,
        registry: &TutorRegistry,
    ) -> TriageResult<TriageDecision>;
}

/// LLM-based triage that lets the model pick the handoff target
pub struct LlmTriage {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
}

impl LlmTriage {
    /// Create a new LLM-based triage
    pub fn new(provider: Arc<dyn LlmProvider>, model: String) -> Self {
        Self {
            provider,
            model,
            temperature: 0.1, // Low temperature for consistent routing
        }
    }

    /// Create triage with custom temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Format the tutor catalog for the triage prompt
    ///
    /// Only called for a non-empty registry; `decide` resolves an empty one
    /// before any prompt is built.
    fn format_tutor_catalog(registry: &TutorRegistry) -> String {
        let mut output = String::from("AVAILABLE TUTORS:\n");
        for tutor in registry.iter() {
            output.push_str(&format!("- {}: {}\n", tutor.id, tutor.handoff_description));
        }

        output
    }

    /// Build the triage prompt
    fn build_triage_prompt(question: &str, registry: &TutorRegistry) -> String {
        let catalog = Self::format_tutor_catalog(registry);

        format!(
            r#"You route student questions to subject tutors.

STUDENT QUESTION:
{question}

{catalog}

DECISION CRITERIA:
1. Does the question fall squarely in one tutor's subject?
2. If no tutor fits, leave handoff_to unset and the assistant will answer generally.

IMPORTANT:
- Set handoff_to only to a tutor id listed above, never invent one
- Be concise in your reasoning

Make your handoff decision:"#
        )
    }

    /// Build completion request with provider-specific structured output
    fn build_completion_request(
        &self,
        question: &str,
        registry: &TutorRegistry,
    ) -> CompletionRequest {
        let mut prompt = Self::build_triage_prompt(question, registry);

        if self.provider.name() != "openai" {
            prompt.push_str(
                "\n\nReturn a JSON object with fields: \"handoff_to\" \
                 (tutor id string, or omit it to answer directly) and \"reasoning\" (string).",
            );
        }

        let mut request = CompletionRequest::from_prompts(
            &self.model,
            "You are a triage assistant for a tutoring service. \
             Route each question to the best-suited tutor.",
            prompt,
        );
        request.temperature = Some(self.temperature);
        request.max_tokens = Some(300);

        request.response_format = Some(if self.provider.name() == "openai" {
            ResponseFormat::JsonSchema {
                json_schema: JsonSchemaDefinition {
                    name: "handoff_decision".to_string(),
                    strict: Some(true),
                    schema: HandoffDecisionOutput::json_schema(),
                },
            }
        } else {
            ResponseFormat::Json
        });

        request
    }

    /// Convert model output to a TriageDecision (pure function)
    fn parse_decision(
        output: &HandoffDecisionOutput,
        registry: &TutorRegistry,
    ) -> TriageResult<TriageDecision> {
        output
            .validate()
            .map_err(|e| {
                TriageError::invalid_model_output(format!("Invalid handoff decision: {e}"))
            })?;

        match &output.handoff_to {
            Some(tutor_id) => {
                if registry.get(tutor_id).is_none() {
                    return Err(TriageError::UnknownTutor {
                        tutor_id: tutor_id.clone(),
                    });
                }

                debug!(
                    tutor_id = %tutor_id,
                    reasoning = %output.reasoning,
                    "Triage decided to hand off"
                );

                Ok(TriageDecision::Handoff {
                    tutor_id: tutor_id.clone(),
                    reasoning: output.reasoning.clone(),
                })
            }
            None => {
                debug!(reasoning = %output.reasoning, "Triage decided to answer directly");

                Ok(TriageDecision::Direct {
                    reasoning: output.reasoning.clone(),
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl Triage for LlmTriage {
    async fn decide(
        &self,
        question: &str,
        registry: &TutorRegistry,
    ) -> TriageResult<TriageDecision> {
        // Nothing to route to; skip the model call entirely
        if registry.is_empty() {
            return Ok(TriageDecision::Direct {
                reasoning: "No tutors registered".to_string(),
            });
        }

        info!("LlmTriage making handoff decision");

        let request = self.build_completion_request(question, registry);

        debug!(
            "Triage prompt:\n{}",
            request
                .messages
                .last()
                .map(|m| m.content.as_str())
                .unwrap_or_default()
        );

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| TriageError::llm_error(e.to_string()))?;

        let content = response
            .content
            .ok_or_else(|| TriageError::llm_error("No content in triage response"))?;

        let output: HandoffDecisionOutput = serde_json::from_str(&content).map_err(|e| {
            warn!(
                error = %e,
                response = %content,
                "Failed to parse triage decision"
            );
            TriageError::invalid_model_output(format!("Failed to parse handoff decision: {e}"))
        })?;

        info!(
            handoff_to = ?output.handoff_to,
            reasoning = %output.reasoning,
            "Parsed triage decision"
        );

        Self::parse_decision(&output, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::{CompletionResponse, FinishReason, TokenUsage};
    use crate::testing::mocks::MockLlmProvider;
    use crate::tutor::TutorProfile;
    use serde_json::json;

    fn test_registry() -> TutorRegistry {
        TutorRegistry::from_profiles(vec![
            TutorProfile {
                id: "math-tutor".to_string(),
                display_name: "Math Tutor".to_string(),
                handoff_description: "Specialist for math questions".to_string(),
                system_prompt: "You help with math.".to_string(),
                temperature: None,
                max_tokens: None,
            },
            TutorProfile {
                id: "history-tutor".to_string(),
                display_name: "History Tutor".to_string(),
                handoff_description: "Specialist for historical questions".to_string(),
                system_prompt: "You help with history.".to_string(),
                temperature: None,
                max_tokens: None,
            },
        ])
        .unwrap()
    }

    fn decision_response(body: serde_json::Value) -> CompletionResponse {
        CompletionResponse {
            content: Some(body.to_string()),
            model: "mock-model".to_string(),
            usage: TokenUsage::default(),
            finish_reason: FinishReason::Stop,
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_format_tutor_catalog() {
        let registry = test_registry();
        let catalog = LlmTriage::format_tutor_catalog(&registry);

        assert!(catalog.contains("math-tutor"));
        assert!(catalog.contains("Specialist for math questions"));
        assert!(catalog.contains("history-tutor"));
    }

    #[test]
    fn test_parse_decision_handoff() {
        let output = HandoffDecisionOutput {
            handoff_to: Some("math-tutor".to_string()),
            reasoning: "Algebra question".to_string(),
        };

        let decision = LlmTriage::parse_decision(&output, &test_registry()).unwrap();
        assert!(decision.is_handoff());
        assert_eq!(decision.tutor_id(), Some("math-tutor"));
    }

    #[test]
    fn test_parse_decision_direct() {
        let output = HandoffDecisionOutput {
            handoff_to: None,
            reasoning: "Study skills question".to_string(),
        };

        let decision = LlmTriage::parse_decision(&output, &test_registry()).unwrap();
        assert!(!decision.is_handoff());
        assert!(decision.tutor_id().is_none());
    }

    #[test]
    fn test_parse_decision_unknown_tutor() {
        let output = HandoffDecisionOutput {
            handoff_to: Some("chemistry-tutor".to_string()),
            reasoning: "Chemistry question".to_string(),
        };

        let result = LlmTriage::parse_decision(&output, &test_registry());
        assert!(matches!(result, Err(TriageError::UnknownTutor { .. })));
    }

    #[tokio::test]
    async fn test_decide_handoff() {
        let provider = Arc::new(MockLlmProvider::new(vec![decision_response(json!({
            "handoff_to": "history-tutor",
            "reasoning": "Question about ancient Rome"
        }))]));

        let triage = LlmTriage::new(provider, "gpt-4o-mini".to_string());
        let decision = triage
            .decide("Why did the Roman Republic become an empire?", &test_registry())
            .await
            .unwrap();

        assert_eq!(decision.tutor_id(), Some("history-tutor"));
    }

    #[tokio::test]
    async fn test_decide_empty_registry_short_circuits() {
        // Provider would fail if called; empty registry must avoid the call
        let provider = Arc::new(MockLlmProvider::with_failure());
        let triage = LlmTriage::new(provider, "gpt-4o-mini".to_string());

        let decision = triage
            .decide("Anything", &TutorRegistry::new())
            .await
            .unwrap();
        assert!(!decision.is_handoff());
    }

    #[tokio::test]
    async fn test_decide_unparseable_output_is_error() {
        let provider = Arc::new(MockLlmProvider::new(vec![CompletionResponse {
            content: Some("send it to the math guy".to_string()),
            model: "mock-model".to_string(),
            usage: TokenUsage::default(),
            finish_reason: FinishReason::Stop,
            metadata: Default::default(),
        }]));

        let triage = LlmTriage::new(provider, "gpt-4o-mini".to_string());
        let result = triage.decide("What is 2+2?", &test_registry()).await;
        assert!(matches!(
            result,
            Err(TriageError::InvalidModelOutput { .. })
        ));
    }

    #[test]
    fn test_blank_handoff_target_is_model_output_error() {
        let output = HandoffDecisionOutput {
            handoff_to: Some("  ".to_string()),
            reasoning: "Unclear".to_string(),
        };

        let result = LlmTriage::parse_decision(&output, &test_registry());
        assert!(matches!(
            result,
            Err(TriageError::InvalidModelOutput { .. })
        ));
    }

    #[tokio::test]
    async fn test_catalog_reaches_the_model() {
        let provider = Arc::new(MockLlmProvider::new(vec![decision_response(json!({
            "handoff_to": "math-tutor",
            "reasoning": "Math"
        }))]));

        let triage = LlmTriage::new(provider.clone(), "gpt-4o-mini".to_string());
        triage.decide("Solve 2x+3=7", &test_registry()).await.unwrap();

        let requests = provider.get_requests().await;
        let prompt = &requests[0].messages[1].content;
        assert!(prompt.contains("math-tutor"));
        assert!(prompt.contains("history-tutor"));
        assert!(prompt.contains("Solve 2x+3=7"));
    }

    #[test]
    fn test_decision_serialization_round_trip() {
        let decision = TriageDecision::Handoff {
            tutor_id: "math-tutor".to_string(),
            reasoning: "Algebra".to_string(),
        };

        let json = serde_json::to_string(&decision).unwrap();
        let parsed: TriageDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, decision);
    }
}
