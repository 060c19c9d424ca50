use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gptui_core::config::{ChatSettings, Config, Overrides};
use gptui_core::providers::{ChatError, Message};
use gptui_tui::effects::UiEffect;
use gptui_tui::events::UiEvent;
use gptui_tui::runtime::{run_turn, spawn_turn};
use gptui_tui::state::AppState;
use gptui_tui::update::update;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(server: &MockServer, stream: bool) -> AppState {
    let settings = ChatSettings::resolve_with_env(
        &Config::default(),
        Overrides {
            base_url: Some(format!("{}/v1", server.uri())),
            api_key: Some("sk-test".to_string()),
            stream: Some(stream),
            ..Overrides::default()
        },
        |_| None,
    )
    .unwrap();
    AppState::new(settings, Vec::new())
}

fn sse_event(content: &str, finish_reason: Option<&str>) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": finish_reason}]
        })
    )
}

async fn mount(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Submits `text`, runs the worker to completion and feeds its events to the reducer.
async fn send(app: &mut AppState, text: &str) -> Vec<UiEffect> {
    update(app, UiEvent::Paste(text.to_string()));
    let effects = update(
        app,
        UiEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
    );
    let Some(UiEffect::StartTurn { request }) = effects.into_iter().next() else {
        panic!("expected StartTurn");
    };

    let (tx, rx) = mpsc::channel(64);
    update(
        app,
        UiEvent::TurnSpawned {
            rx,
            cancel: CancellationToken::new(),
        },
    );
    let client = app.client.clone();
    run_turn(&client, &request, &tx).await;
    drop(tx);

    let mut effects = Vec::new();
    loop {
        let Some(rx) = app.mode.receiver() else {
            break;
        };
        let Ok(event) = rx.try_recv() else {
            break;
        };
        effects.extend(update(app, event));
    }
    effects
}

fn saved(effects: &[UiEffect]) -> bool {
    effects
        .iter()
        .any(|effect| matches!(effect, UiEffect::PersistHistory { .. }))
}

#[tokio::test]
async fn test_streamed_reply_becomes_one_message() {
    let server = MockServer::start().await;
    let body = [
        sse_event("Hel", None),
        sse_event("lo", None),
        sse_event("!", None),
        "data: [DONE]\n\n".to_string(),
    ]
    .concat();
    mount(
        &server,
        ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"),
    )
    .await;
    let mut app = app(&server, true);

    let effects = send(&mut app, "hello").await;

    assert_eq!(
        app.history,
        vec![Message::user("hello"), Message::assistant("Hello!")]
    );
    assert!(app.scratch.is_empty());
    assert!(!app.mode.is_running());
    assert!(app.last_error.is_none());
    assert!(saved(&effects));
}

#[tokio::test]
async fn test_finish_reason_ends_stream_turn() {
    let server = MockServer::start().await;
    let body = [sse_event("Hi", None), sse_event("", Some("stop"))].concat();
    mount(
        &server,
        ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"),
    )
    .await;
    let mut app = app(&server, true);

    send(&mut app, "hello").await;

    assert_eq!(app.history.last(), Some(&Message::assistant("Hi")));
    assert!(app.last_error.is_none());
}

#[tokio::test]
async fn test_non_streaming_reply() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "gpt-3.5-turbo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hi!"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        })),
    )
    .await;
    let mut app = app(&server, false);

    let effects = send(&mut app, "hello").await;

    assert_eq!(app.history.last(), Some(&Message::assistant("Hi!")));
    assert_eq!(app.last_usage.map(|usage| usage.total_tokens), Some(7));
    assert!(saved(&effects));
}

#[tokio::test]
async fn test_http_error_keeps_user_message() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(429).set_body_string(r#"{"error":{"message":"slow down"}}"#),
    )
    .await;
    let mut app = app(&server, true);

    let effects = send(&mut app, "hello").await;

    assert_eq!(app.history, vec![Message::user("hello")]);
    assert!(matches!(
        app.last_error,
        Some(ChatError::HttpStatus { status: 429, .. })
    ));
    assert!(!saved(&effects));

    let message = app.last_error.as_ref().unwrap().to_string();
    assert_eq!(message, "status code: 429, error: slow down");
}

#[tokio::test]
async fn test_malformed_event_discards_partial_reply() {
    let server = MockServer::start().await;
    let body = [sse_event("partial", None), "data: {not json\n\n".to_string()].concat();
    mount(
        &server,
        ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"),
    )
    .await;
    let mut app = app(&server, true);

    send(&mut app, "hello").await;

    assert_eq!(app.history, vec![Message::user("hello")]);
    assert!(app.scratch.is_empty());
    assert!(matches!(app.last_error, Some(ChatError::Decode(_))));
}

#[tokio::test]
async fn test_cancelled_turn_closes_channel() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200)
            .set_body_raw(sse_event("late", Some("stop")), "text/event-stream")
            .set_delay(std::time::Duration::from_secs(5)),
    )
    .await;
    let app = app(&server, true);
    let request = app.client.build_request(&[], "hello", None, true);

    let UiEvent::TurnSpawned { mut rx, cancel } = spawn_turn(app.client.clone(), request) else {
        panic!("expected TurnSpawned");
    };
    cancel.cancel();

    let next = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .expect("worker should stop promptly");
    assert!(next.is_none());
}
