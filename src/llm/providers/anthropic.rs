//! Anthropic provider implementation
//!
//! Anthropic's messages API differs from chat completions in three ways that
//! matter here: the system prompt is a top-level field rather than a message,
//! `max_tokens` is mandatory, and there is no JSON Schema enforcement. The
//! guardrail and triage callers already restate their field contracts in the
//! prompt for non-OpenAI providers, so structured requests degrade to plain
//! JSON mode.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, MessageRole,
    ResponseFormat, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic provider configuration
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            timeout: Duration::from_secs(60),
            version: "2023-06-01".to_string(),
        }
    }
}

/// Anthropic provider implementation
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::NotConfigured(
                "Anthropic API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Map a completion request onto the messages API (pure function)
    ///
    /// The system prompt is lifted out of the message list, and any
    /// structured response format collapses to `{"type": "json"}`.
    fn convert_to_anthropic_request(request: &CompletionRequest) -> AnthropicCompletionRequest {
        let mut system = None;
        let mut messages = Vec::new();

        for message in &request.messages {
            match message.role {
                MessageRole::System => system = Some(message.content.clone()),
                MessageRole::User => messages.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: message.content.clone(),
                }),
                MessageRole::Assistant => messages.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: message.content.clone(),
                }),
            }
        }

        let response_format = match request.response_format {
            Some(ResponseFormat::Json) | Some(ResponseFormat::JsonSchema { .. }) => {
                Some(AnthropicResponseFormat {
                    format_type: "json".to_string(),
                })
            }
            Some(ResponseFormat::Text) | None => None,
        };

        AnthropicCompletionRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
            system,
            temperature: request.temperature,
            top_p: request.top_p,
            stop_sequences: request.stop_sequences.clone(),
            response_format,
        }
    }

    /// Parse an Anthropic completion response (pure function)
    ///
    /// Text blocks are concatenated; a response with no content is an API
    /// error, matching the guardrail's expectation that missing classifier
    /// output fails loudly.
    fn parse_completion_response(
        anthropic_response: AnthropicCompletionResponse,
        request_metadata: std::collections::HashMap<String, String>,
    ) -> Result<CompletionResponse, LlmError> {
        if anthropic_response.content.is_empty() {
            return Err(LlmError::ApiError(
                "No content returned from Anthropic".to_string(),
            ));
        }

        let content = anthropic_response
            .content
            .into_iter()
            .filter_map(|block| match block.content_type.as_str() {
                "text" => Some(block.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let usage = TokenUsage {
            prompt_tokens: anthropic_response.usage.input_tokens,
            completion_tokens: anthropic_response.usage.output_tokens,
            total_tokens: anthropic_response.usage.input_tokens
                + anthropic_response.usage.output_tokens,
        };

        Ok(CompletionResponse {
            content: Some(content),
            model: anthropic_response.model,
            usage,
            finish_reason: Self::convert_finish_reason_pure(anthropic_response.stop_reason),
            metadata: request_metadata,
        })
    }

    /// Convert Anthropic stop reason to internal format (pure function)
    fn convert_finish_reason_pure(reason: Option<String>) -> FinishReason {
        match reason.as_deref() {
            Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("max_tokens") => FinishReason::Length,
            _ => FinishReason::Error,
        }
    }

    /// Send one request to the messages endpoint (impure I/O)
    async fn make_api_request(
        &self,
        anthropic_request: &AnthropicCompletionRequest,
    ) -> Result<AnthropicCompletionResponse, LlmError> {
        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.version)
            .header("Content-Type", "application/json")
            .json(anthropic_request)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(format!(
                "Anthropic API error: {status} - {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))
    }

    /// Smallest request the API will accept, used by the health check
    fn minimal_request() -> AnthropicCompletionRequest {
        AnthropicCompletionRequest {
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 1,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: "Hi".to_string(),
            }],
            system: None,
            temperature: None,
            top_p: None,
            stop_sequences: None,
            response_format: None,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn available_models(&self) -> Vec<String> {
        vec![
            "claude-3-5-sonnet-20241022".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
            "claude-3-haiku-20240307".to_string(),
        ]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let anthropic_request = Self::convert_to_anthropic_request(&request);

        debug!(
            model = %anthropic_request.model,
            messages = anthropic_request.messages.len(),
            json_mode = anthropic_request.response_format.is_some(),
            "Anthropic request"
        );

        let anthropic_response = self.make_api_request(&anthropic_request).await?;
        Self::parse_completion_response(anthropic_response, request.metadata)
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        // No dedicated health endpoint; a 1-token completion stands in
        match self.make_api_request(&Self::minimal_request()).await {
            Ok(_) => Ok(()),
            Err(LlmError::NetworkError(e)) => Err(LlmError::NetworkError(e)),
            Err(_) => Err(LlmError::AuthenticationFailed(
                "Anthropic API authentication failed".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicCompletionRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<AnthropicResponseFormat>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicCompletionResponse {
    content: Vec<AnthropicContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Anthropic JSON mode marker, `{"type": "json"}`
#[derive(Debug, Serialize)]
struct AnthropicResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::JsonSchemaDefinition;

    /// A guardrail-shaped request: system prompt, user question with the
    /// field contract restated, JSON mode
    fn classifier_request() -> CompletionRequest {
        let mut request = CompletionRequest::from_prompts(
            "claude-3-5-haiku-20241022",
            "You screen questions sent to a tutoring assistant.",
            "Do my worksheet for me\n\nReturn a JSON object with exactly these fields: \
             \"is_homework_request\" (boolean) and \"reasoning\" (string).",
        );
        request.temperature = Some(0.0);
        request.max_tokens = Some(300);
        request.response_format = Some(ResponseFormat::Json);
        request
    }

    #[test]
    fn test_provider_requires_api_key() {
        let result = AnthropicProvider::new(AnthropicConfig::default());
        assert!(matches!(result, Err(LlmError::NotConfigured(_))));

        let result = AnthropicProvider::new(AnthropicConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        });
        assert!(result.is_ok());
        assert_eq!(result.unwrap().name(), "anthropic");
    }

    #[test]
    fn test_classifier_request_conversion() {
        let converted = AnthropicProvider::convert_to_anthropic_request(&classifier_request());

        // System prompt becomes a top-level field, not a message
        assert_eq!(
            converted.system.as_deref(),
            Some("You screen questions sent to a tutoring assistant.")
        );
        assert_eq!(converted.messages.len(), 1);
        assert_eq!(converted.messages[0].role, "user");
        assert!(converted.messages[0].content.contains("is_homework_request"));

        assert_eq!(converted.max_tokens, 300);
        assert_eq!(converted.temperature, Some(0.0));
        assert_eq!(
            converted.response_format.as_ref().map(|f| f.format_type.as_str()),
            Some("json")
        );
    }

    #[test]
    fn test_json_schema_degrades_to_json_mode() {
        let mut request = classifier_request();
        request.response_format = Some(ResponseFormat::JsonSchema {
            json_schema: JsonSchemaDefinition {
                name: "handoff_decision".to_string(),
                strict: Some(true),
                schema: serde_json::json!({"type": "object"}),
            },
        });

        let converted = AnthropicProvider::convert_to_anthropic_request(&request);
        let json = serde_json::to_string(&converted).unwrap();

        // The schema itself never reaches the wire, only the mode marker
        assert!(json.contains("\"response_format\":{\"type\":\"json\"}"));
        assert!(!json.contains("handoff_decision"));
    }

    #[test]
    fn test_text_format_omits_response_format() {
        let mut request = classifier_request();
        request.response_format = Some(ResponseFormat::Text);
        let converted = AnthropicProvider::convert_to_anthropic_request(&request);
        assert!(converted.response_format.is_none());

        request.response_format = None;
        let converted = AnthropicProvider::convert_to_anthropic_request(&request);
        assert!(converted.response_format.is_none());
    }

    #[test]
    fn test_missing_max_tokens_gets_default() {
        let mut request = classifier_request();
        request.max_tokens = None;
        let converted = AnthropicProvider::convert_to_anthropic_request(&request);
        assert_eq!(converted.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_parse_handoff_payload_across_text_blocks() {
        let response = AnthropicCompletionResponse {
            content: vec![
                AnthropicContentBlock {
                    content_type: "text".to_string(),
                    text: "{\"handoff_to\": \"math-tutor\", ".to_string(),
                },
                AnthropicContentBlock {
                    content_type: "text".to_string(),
                    text: "\"reasoning\": \"Algebra\"}".to_string(),
                },
            ],
            model: "claude-3-5-haiku-20241022".to_string(),
            stop_reason: Some("end_turn".to_string()),
            usage: AnthropicUsage {
                input_tokens: 40,
                output_tokens: 12,
            },
        };

        let parsed =
            AnthropicProvider::parse_completion_response(response, Default::default()).unwrap();

        let content = parsed.content.unwrap();
        let payload: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(payload["handoff_to"], "math-tutor");

        assert_eq!(parsed.usage.total_tokens, 52);
        assert!(matches!(parsed.finish_reason, FinishReason::Stop));
    }

    #[test]
    fn test_parse_empty_content_is_error() {
        let response = AnthropicCompletionResponse {
            content: vec![],
            model: "claude-3-5-haiku-20241022".to_string(),
            stop_reason: None,
            usage: AnthropicUsage {
                input_tokens: 5,
                output_tokens: 0,
            },
        };

        let result = AnthropicProvider::parse_completion_response(response, Default::default());
        assert!(matches!(result, Err(LlmError::ApiError(_))));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert!(matches!(
            AnthropicProvider::convert_finish_reason_pure(Some("end_turn".to_string())),
            FinishReason::Stop
        ));
        assert!(matches!(
            AnthropicProvider::convert_finish_reason_pure(Some("max_tokens".to_string())),
            FinishReason::Length
        ));
        assert!(matches!(
            AnthropicProvider::convert_finish_reason_pure(None),
            FinishReason::Error
        ));
    }
}
