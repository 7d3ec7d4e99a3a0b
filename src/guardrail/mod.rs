//! Input guardrail: homework-completion classifier
//!
//! Before any tutor sees a question, an auxiliary model call classifies it.
//! The classifier returns a flat boolean+reasoning record; when the boolean
//! says the student is asking to have homework completed wholesale, the
//! tripwire fires and the session short-circuits with a refusal. The
//! classifier's reasoning travels with the refusal so the student sees why.

use crate::error::{TriageError, TriageResult};
use crate::llm::provider::{
    CompletionRequest, JsonSchemaDefinition, LlmProvider, ResponseFormat,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CLASSIFIER_SYSTEM_PROMPT: &str = "You screen questions sent to a tutoring assistant. \
Decide whether the user is asking the assistant to complete graded homework for them \
(produce a finished answer to submit) rather than asking for tutoring help to understand \
the material. Respond with the requested JSON only.";

/// Structured output schema for the homework classifier
///
/// Used with:
/// - OpenAI: JSON Schema with `response_format`
/// - Anthropic: JSON mode, with the field contract restated in the prompt
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HomeworkCheckOutput {
    /// Whether the question asks for homework to be completed outright
    pub is_homework_request: bool,

    /// Reasoning for the classification (shown to the student on refusal)
    pub reasoning: String,
}

impl HomeworkCheckOutput {
    /// Generate the JSON schema for this structure
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(HomeworkCheckOutput);
        serde_json::to_value(schema).expect("Schema should be serializable")
    }
}

/// Result of running an input guardrail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    /// Whether processing must stop here
    pub tripwire_triggered: bool,
    /// Classifier reasoning
    pub reasoning: String,
}

/// Pre-check run against a question before triage sees it
#[async_trait::async_trait]
pub trait InputGuardrail: Send + Sync {
    async fn check(&self, question: &str) -> TriageResult<GuardrailVerdict>;
}

/// LLM-backed guardrail using the homework-completion classifier prompt
pub struct HomeworkGuardrail {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
}

impl HomeworkGuardrail {
    /// Create a new guardrail against the given provider and model
    pub fn new(provider: Arc<dyn LlmProvider>, model: String) -> Self {
        Self {
            provider,
            model,
            temperature: 0.0, // classification should be deterministic
        }
    }

    /// Override the classification temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build the classifier request with provider-appropriate structured output
    fn build_completion_request(&self, question: &str) -> CompletionRequest {
        let user_content = if self.provider.name() == "openai" {
            question.to_string()
        } else {
            // No schema-enforced output outside OpenAI; restate the contract
            format!(
                "{question}\n\nReturn a JSON object with exactly these fields: \
                 \"is_homework_request\" (boolean) and \"reasoning\" (string)."
            )
        };

        let mut request =
            CompletionRequest::from_prompts(&self.model, CLASSIFIER_SYSTEM_PROMPT, user_content);
        request.temperature = Some(self.temperature);
        request.max_tokens = Some(300);

        request.response_format = Some(if self.provider.name() == "openai" {
            ResponseFormat::JsonSchema {
                json_schema: JsonSchemaDefinition {
                    name: "homework_check".to_string(),
                    strict: Some(true),
                    schema: HomeworkCheckOutput::json_schema(),
                },
            }
        } else {
            ResponseFormat::Json
        });

        request
    }

    /// Map classifier output to a verdict (pure function)
    fn to_verdict(output: HomeworkCheckOutput) -> GuardrailVerdict {
        GuardrailVerdict {
            tripwire_triggered: output.is_homework_request,
            reasoning: output.reasoning,
        }
    }
}

#[async_trait::async_trait]
impl InputGuardrail for HomeworkGuardrail {
    async fn check(&self, question: &str) -> TriageResult<GuardrailVerdict> {
        info!("Running homework guardrail");

        let request = self.build_completion_request(question);

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| TriageError::llm_error(e.to_string()))?;

        let content = response
            .content
            .ok_or_else(|| TriageError::llm_error("No content in guardrail response"))?;

        let output: HomeworkCheckOutput = serde_json::from_str(&content).map_err(|e| {
            warn!(
                error = %e,
                response = %content,
                "Failed to parse guardrail classification"
            );
            TriageError::invalid_model_output(format!("Failed to parse guardrail output: {e}"))
        })?;

        debug!(
            is_homework_request = output.is_homework_request,
            reasoning = %output.reasoning,
            "Parsed guardrail classification"
        );

        Ok(Self::to_verdict(output))
    }
}
