//! LLM provider integrations
//!
//! Provider-agnostic completion types plus concrete OpenAI and Anthropic
//! backends.

pub mod provider;
pub mod providers;

pub use provider::{
    CompletionRequest, CompletionResponse, FinishReason, JsonSchemaDefinition, LlmError,
    LlmProvider, Message, MessageRole, ResponseFormat, TokenUsage,
};
pub use providers::{AnthropicConfig, AnthropicProvider, OpenAiConfig, OpenAiProvider};
