//! Error types for the triage assistant
//!
//! All fallible operations return `TriageResult`. Messages destined for the
//! terminal pass through sanitization so provider errors can never echo API
//! keys or credential-bearing paths back to the student.

use thiserror::Error;

/// Main error type for triage assistant operations
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Question refused by guardrail: {reasoning}")]
    GuardrailTripped { reasoning: String },

    #[error("LLM provider error: {message}")]
    LlmError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Unparseable model output: {message}")]
    InvalidModelOutput { message: String },

    #[error("Unknown tutor: {tutor_id}")]
    UnknownTutor { tutor_id: String },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl TriageError {
    /// Create LLM error
    pub fn llm_error<S: Into<String>>(message: S) -> Self {
        Self::LlmError {
            message: message.into(),
        }
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create error for model output that fails to parse or validate
    pub fn invalid_model_output<S: Into<String>>(message: S) -> Self {
        Self::InvalidModelOutput {
            message: message.into(),
        }
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Sanitized message suitable for terminal output
    pub fn user_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Sanitize error messages to prevent sensitive data leakage
fn sanitize_error_message(message: &str) -> String {
    // Remove potential sensitive patterns
    let mut sanitized = message.to_string();

    // Remove common secret patterns
    sanitized = regex::Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+")
        .unwrap()
        .replace_all(&sanitized, "${1}=***")
        .to_string();

    // Remove potential file paths that might contain sensitive info
    sanitized =
        regex::Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
            .unwrap()
            .replace_all(&sanitized, "/***REDACTED***/")
            .to_string();

    // Truncate very long messages - ensure total length is <= 500.
    // Provider errors embed model-generated text, so the cut point must be
    // walked back onto a char boundary
    if sanitized.len() > 500 {
        let truncate_suffix = "...[truncated]";
        let mut cut = 500 - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(truncate_suffix);
    }

    sanitized
}

/// Result type for triage operations
pub type TriageResult<T> = Result<T, TriageError>;
