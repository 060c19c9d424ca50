use std::time::Duration;

use gptui_core::config::{ChatSettings, Config, Overrides};
use gptui_core::providers::openai::{ChatClient, StreamChunk};
use gptui_core::providers::{ChatError, Message};
use gptui_core::transport::TransportErrorKind;
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(base_url: &str, api_key: Option<&str>) -> ChatSettings {
    ChatSettings::resolve_with_env(
        &Config::default(),
        Overrides {
            base_url: Some(base_url.to_string()),
            api_key: api_key.map(str::to_string),
            model: Some("gpt-test".to_string()),
            ..Overrides::default()
        },
        |_| None,
    )
    .unwrap()
}

fn sse_delta(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        })
    )
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

async fn collect_stream(
    client: &ChatClient,
    stream_body: String,
    server: &MockServer,
) -> (Result<(), ChatError>, Vec<StreamChunk>) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(sse_response(stream_body))
        .mount(server)
        .await;

    let request = client.build_request(&[], "hello", None, true);
    let (tx, mut rx) = mpsc::channel(16);
    let result = client.stream(&request, tx).await;

    let mut chunks = Vec::new();
    while let Some(chunk) = rx.recv().await {
        chunks.push(chunk);
    }
    (result, chunks)
}

#[tokio::test]
async fn test_complete_returns_first_choice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "model": "gpt-test",
            "messages": [{"role": "user", "content": "hello"}],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Hi!"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&settings(&format!("{}/v1", server.uri()), Some("sk-test")));
    let request = client.build_request(&[], "hello", None, false);
    let response = client.complete(&request).await.unwrap();

    assert_eq!(response.choices[0].message, Message::assistant("Hi!"));
}

#[tokio::test]
async fn test_missing_api_key_fails_before_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ChatClient::new(&settings(&server.uri(), None));
    let request = client.build_request(&[], "hello", None, false);

    assert_eq!(client.complete(&request).await.unwrap_err(), ChatError::Auth);
    assert!(matches!(
        client.stream_response(&request).await,
        Err(ChatError::Auth)
    ));
}

#[tokio::test]
async fn test_non_200_reports_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string(r#"{"error":"rate limited"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&settings(&server.uri(), Some("sk-test")));
    let request = client.build_request(&[], "hello", None, false);
    let err = client.complete(&request).await.unwrap_err();

    assert_eq!(
        err,
        ChatError::HttpStatus {
            status: 429,
            body: r#"{"error":"rate limited"}"#.to_string()
        }
    );
}

#[tokio::test]
async fn test_malformed_completion_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"choices\": ["))
        .mount(&server)
        .await;

    let client = ChatClient::new(&settings(&server.uri(), Some("sk-test")));
    let request = client.build_request(&[], "hello", None, false);

    assert!(matches!(
        client.complete(&request).await,
        Err(ChatError::Decode(_))
    ));
}

#[tokio::test]
async fn test_stream_sends_sse_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("accept", "text/event-stream"))
        .and(header("cache-control", "no-cache"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(sse_response("data: [DONE]\n\n".to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&settings(&server.uri(), Some("sk-test")));
    let request = client.build_request(&[], "hello", None, true);
    let (tx, _rx) = mpsc::channel(1);

    client.stream(&request, tx).await.unwrap();
}

#[tokio::test]
async fn test_stream_delivers_deltas_in_order() {
    let server = MockServer::start().await;
    let client = ChatClient::new(&settings(&server.uri(), Some("sk-test")));

    let body = format!(
        ": ping\n\n{}{}{}data: [DONE]\n\n",
        sse_delta("Hel"),
        sse_delta("lo"),
        sse_delta("!")
    );
    let (result, chunks) = collect_stream(&client, body, &server).await;

    result.unwrap();
    let text: String = chunks.iter().map(|c| c.choices[0].content()).collect();
    assert_eq!(chunks.len(), 3);
    assert_eq!(text, "Hello!");
}

#[tokio::test]
async fn test_stream_decode_error_aborts() {
    let server = MockServer::start().await;
    let client = ChatClient::new(&settings(&server.uri(), Some("sk-test")));

    let body = format!("{}data: {{oops\n\n{}data: [DONE]\n\n", sse_delta("a"), sse_delta("b"));
    let (result, chunks) = collect_stream(&client, body, &server).await;

    assert!(matches!(result, Err(ChatError::Decode(_))));
    assert_eq!(chunks.len(), 1);
}

#[tokio::test]
async fn test_stream_dropped_receiver_is_cancelled() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(sse_response(format!("{}data: [DONE]\n\n", sse_delta("a"))))
        .mount(&server)
        .await;

    let client = ChatClient::new(&settings(&server.uri(), Some("sk-test")));
    let request = client.build_request(&[], "hello", None, true);
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    assert_eq!(
        client.stream(&request, tx).await.unwrap_err(),
        ChatError::Cancelled
    );
}

#[tokio::test]
async fn test_stream_error_event_keeps_provider_message() {
    let server = MockServer::start().await;
    let client = ChatClient::new(&settings(&server.uri(), Some("sk-test")));

    let body = format!(
        "{}data: {{\"error\":{{\"message\":\"The server is overloaded\"}}}}\n\ndata: [DONE]\n\n",
        sse_delta("a")
    );
    let (result, chunks) = collect_stream(&client, body, &server).await;

    let err = result.unwrap_err();
    assert!(matches!(err, ChatError::HttpStatus { status: 200, .. }));
    assert_eq!(
        err.to_string(),
        "status code: 200, error: The server is overloaded"
    );
    assert_eq!(chunks.len(), 1);
}

#[tokio::test]
async fn test_timeout_applies_to_complete_but_not_stream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            sse_response(format!("{}data: [DONE]\n\n", sse_delta("late")))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let mut settings = settings(&server.uri(), Some("sk-test"));
    settings.request_timeout = Some(Duration::from_secs(1));
    let client = ChatClient::new(&settings);

    let request = client.build_request(&[], "hello", None, false);
    let err = client.complete(&request).await.unwrap_err();
    assert!(matches!(
        err,
        ChatError::Transport(ref e) if e.kind == TransportErrorKind::Timeout
    ));

    let request = client.build_request(&[], "hello", None, true);
    let (tx, mut rx) = mpsc::channel(4);
    client.stream(&request, tx).await.unwrap();
    assert_eq!(rx.recv().await.unwrap().choices[0].content(), "late");
}
