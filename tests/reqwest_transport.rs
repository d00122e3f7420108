use futures::StreamExt;
use llm_gateway::llm::stream::collect_response;
use llm_gateway::llm::transport::{HttpRequest, ReqwestTransport, Transport};
use llm_gateway::{
    Conversation, Gateway, LLMError, ProviderConfig, ProviderType, RetryConfig, TransportConfig,
    Turn, UsagePolicy,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(&TransportConfig {
        connect_timeout_secs: 5,
        request_timeout_secs: 10,
    })
    .unwrap()
}

fn sse_body(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|payload| format!("data: {}\n\n", payload))
        .collect()
}

#[tokio::test]
async fn test_streams_body_from_server() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-local"))
        .and(body_partial_json(json!({ "model": "llama3", "stream": true })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&[
                    r#"{"choices":[{"delta":{"content":"Hi"}}]}"#,
                    r#"{"choices":[{"delta":{"content":" there"}}]}"#,
                    r#"{"choices":[],"usage":{"prompt_tokens":7,"completion_tokens":2}}"#,
                    "[DONE]",
                ])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = Gateway::new(Arc::new(transport()), RetryConfig::default());
    let config = ProviderConfig {
        api_key: Some("sk-local".to_string()),
        base_url: Some(format!("{}/v1", mock_server.uri())),
        model: Some("llama3".to_string()),
        ..ProviderConfig::new(ProviderType::OpenAI)
    };
    let conversation = Conversation::new().with_turn(Turn::user("hello"));

    let response = collect_response(
        gateway.create_message("", &conversation, &config),
        UsagePolicy::LastWriteWins,
    )
    .await
    .unwrap();

    assert_eq!(response.text, "Hi there");
    let usage = response.usage.unwrap();
    assert_eq!((usage.input_tokens, usage.output_tokens), (7, 2));
}

#[tokio::test]
async fn test_status_codes_become_typed_errors() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/throttled"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "2")
                .set_body_json(json!({ "error": { "message": "Rate limit reached" } })),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/unauthorized"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/overloaded"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let transport = transport();
    let open = |route: &str| {
        transport.open(HttpRequest::post_json(
            format!("{}/{}", mock_server.uri(), route),
            json!({}),
        ))
    };

    match open("throttled").await {
        Err(LLMError::RateLimit {
            message,
            retry_after,
        }) => {
            assert_eq!(message, "Rate limit reached");
            assert_eq!(retry_after, Some(Duration::from_secs(2)));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a rate limit error"),
    }

    assert!(matches!(
        open("unauthorized").await,
        Err(LLMError::Authentication(_))
    ));
    assert!(matches!(
        open("overloaded").await,
        Err(LLMError::BackendFault { status: 529, .. })
    ));
}

#[tokio::test]
async fn test_gateway_retries_server_faults() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(sse_body(&[
                r#"{"choices":[{"delta":{"content":"recovered"}}]}"#,
                "[DONE]",
            ])),
        )
        .mount(&mock_server)
        .await;

    let retry = RetryConfig {
        base_delay_ms: 10,
        max_delay_ms: 50,
        ..RetryConfig::default()
    };
    let gateway = Gateway::new(Arc::new(transport()), retry);
    let config = ProviderConfig {
        api_key: Some("k".to_string()),
        base_url: Some(mock_server.uri()),
        ..ProviderConfig::new(ProviderType::DeepSeek)
    };

    let response = collect_response(
        gateway.create_message("", &Conversation::new().with_turn(Turn::user("hi")), &config),
        UsagePolicy::LastWriteWins,
    )
    .await
    .unwrap();

    assert_eq!(response.text, "recovered");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_chunked_body_is_delivered_incrementally() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("data: one\n\ndata: two\n\n"))
        .mount(&mock_server)
        .await;

    let bytes = transport()
        .open(HttpRequest::post_json(mock_server.uri(), json!({})))
        .await
        .unwrap();
    let body: Vec<u8> = bytes
        .map(|chunk| chunk.unwrap().to_vec())
        .concat()
        .await;

    assert_eq!(body, b"data: one\n\ndata: two\n\n");
}
