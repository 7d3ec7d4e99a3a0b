//! Structured output schema for handoff decisions
//!
//! The triage model returns this record when deciding which tutor, if any,
//! should take the question. The schema is enforced with JSON Schema on
//! OpenAI and restated in the prompt elsewhere.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured output schema for triage handoff decisions
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HandoffDecisionOutput {
    /// Tutor id to hand the question to, or null to answer directly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff_to: Option<String>,

    /// Reasoning for the decision (for observability and debugging)
    pub reasoning: String,
}

impl HandoffDecisionOutput {
    /// Validate that the decision is internally consistent
    ///
    /// # Errors
    ///
    /// Returns error if handoff_to is present but empty or whitespace.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(tutor) = &self.handoff_to {
            if tutor.trim().is_empty() {
                return Err("handoff_to must name a tutor when present".to_string());
            }
        }
        Ok(())
    }

    /// Generate the JSON schema for this structure
    ///
    /// Used for OpenAI's structured output feature
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(HandoffDecisionOutput);
        serde_json::to_value(schema).expect("Schema should be serializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handoff_decision_validation() {
        let decision = HandoffDecisionOutput {
            handoff_to: Some("math-tutor".to_string()),
            reasoning: "Algebra question".to_string(),
        };

        assert!(decision.validate().is_ok());
    }

    #[test]
    fn test_direct_decision_validation() {
        let decision = HandoffDecisionOutput {
            handoff_to: None,
            reasoning: "General study question".to_string(),
        };

        assert!(decision.validate().is_ok());
    }

    #[test]
    fn test_empty_handoff_target_is_invalid() {
        let decision = HandoffDecisionOutput {
            handoff_to: Some("   ".to_string()),
            reasoning: "Unclear".to_string(),
        };

        assert!(decision.validate().is_err());
    }

    #[test]
    fn test_serialization() {
        let decision = HandoffDecisionOutput {
            handoff_to: Some("history-tutor".to_string()),
            reasoning: "Question about the French Revolution".to_string(),
        };

        let json = serde_json::to_string(&decision).unwrap();
        let parsed: HandoffDecisionOutput = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.handoff_to, Some("history-tutor".to_string()));
        assert!(parsed.reasoning.contains("French Revolution"));
    }

    #[test]
    fn test_direct_decision_omits_handoff_field() {
        let decision = HandoffDecisionOutput {
            handoff_to: None,
            reasoning: "No specialist fits".to_string(),
        };

        let json = serde_json::to_string(&decision).unwrap();
        assert!(!json.contains("handoff_to"));
    }

    #[test]
    fn test_schema_generation() {
        let schema = HandoffDecisionOutput::json_schema();

        assert!(schema.is_object());
        assert!(schema["properties"].is_object());
        assert!(schema["properties"]["handoff_to"].is_object());
        assert!(schema["properties"]["reasoning"].is_object());
    }
}
