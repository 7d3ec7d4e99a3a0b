//! Mock implementations for testing
//!
//! Provides a mock LlmProvider with scripted responses and request capture to
//! enable testing without network access.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock LLM provider that replays scripted responses in order
///
/// Every request is recorded so tests can assert on prompts, temperatures,
/// and response formats that reached the provider.
pub struct MockLlmProvider {
    responses: Arc<Mutex<Vec<CompletionResponse>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    should_fail: bool,
}

impl MockLlmProvider {
    /// Create a mock that returns the given responses in order
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    /// Create a mock whose every call fails
    pub fn with_failure() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            should_fail: true,
        }
    }

    /// Requests received so far, in call order
    pub async fn get_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["mock-model".to_string()]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().await.push(request);

        if self.should_fail {
            return Err(LlmError::RequestFailed(
                "Mock provider configured to fail".to_string(),
            ));
        }

        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            return Err(LlmError::RequestFailed(
                "Mock provider has no more scripted responses".to_string(),
            ));
        }
        Ok(responses.remove(0))
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::NotConfigured("Mock failure".to_string()))
        } else {
            Ok(())
        }
    }
}
