//! OpenAI provider behavior against a mocked API

use std::sync::Arc;
use tutor_triage::llm::{
    CompletionRequest, JsonSchemaDefinition, LlmError, LlmProvider, OpenAiConfig, OpenAiProvider,
    ResponseFormat,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_against(server_uri: &str) -> Arc<OpenAiProvider> {
    Arc::new(
        OpenAiProvider::new(OpenAiConfig {
            api_key: "test-key".to_string(),
            base_url: server_uri.to_string(),
            ..Default::default()
        })
        .unwrap(),
    )
}

fn success_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10}
    })
}

#[tokio::test]
async fn test_complete_sends_bearer_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("hello")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_against(&server.uri());
    let response = provider
        .complete(CompletionRequest::from_prompts("gpt-4o-mini", "sys", "hi"))
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("hello"));
    assert_eq!(response.usage.total_tokens, 10);
}

#[tokio::test]
async fn test_retry_on_server_error_then_success() {
    let server = MockServer::start().await;

    // First request returns 500
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // Subsequent request succeeds
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("recovered")))
        .mount(&server)
        .await;

    let provider = provider_against(&server.uri());
    let response = provider
        .complete(CompletionRequest::from_prompts("gpt-4o-mini", "sys", "hi"))
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("recovered"));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_against(&server.uri());
    let result = provider
        .complete(CompletionRequest::from_prompts("gpt-4o-mini", "sys", "hi"))
        .await;

    assert!(matches!(result, Err(LlmError::ApiError(_))));
}

#[tokio::test]
async fn test_json_schema_response_format_reaches_api() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("json_schema"))
        .and(body_string_contains("homework_check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("{}")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_against(&server.uri());

    let mut request = CompletionRequest::from_prompts("gpt-4o-mini", "sys", "classify this");
    request.response_format = Some(ResponseFormat::JsonSchema {
        json_schema: JsonSchemaDefinition {
            name: "homework_check".to_string(),
            strict: Some(true),
            schema: serde_json::json!({"type": "object"}),
        },
    });

    provider.complete(request).await.unwrap();
}

#[tokio::test]
async fn test_empty_choices_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "choices": [],
            "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0}
        })))
        .mount(&server)
        .await;

    let provider = provider_against(&server.uri());
    let result = provider
        .complete(CompletionRequest::from_prompts("gpt-4o-mini", "sys", "hi"))
        .await;

    assert!(matches!(result, Err(LlmError::ApiError(_))));
}

#[tokio::test]
async fn test_health_check_hits_models_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_against(&server.uri());
    assert!(provider.health_check().await.is_ok());
}

#[tokio::test]
async fn test_health_check_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = provider_against(&server.uri());
    assert!(matches!(
        provider.health_check().await,
        Err(LlmError::AuthenticationFailed(_))
    ));
}
