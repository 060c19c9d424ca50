//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use gptui_core::providers::openai::{CompletionResponse, StreamChunk};
use gptui_core::providers::{ChatError, Message};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::input::InputAction;
use crate::layout::Layout;
use crate::state::{AppState, ChatMode};

/// Lines moved per mouse wheel step.
const WHEEL_SCROLL_LINES: usize = 3;

/// The main reducer function.
///
/// Takes the current state and an event, mutates state, and returns effects
/// for the runtime to execute.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    let effects = match event {
        UiEvent::Tick => {
            if app.mode.is_running() {
                app.spinner_frame = app.spinner_frame.wrapping_add(1);
            }
            vec![]
        }
        UiEvent::Key(key) => handle_key(app, key),
        UiEvent::Paste(text) => {
            app.input.paste(&text);
            vec![]
        }
        UiEvent::Mouse(mouse) => {
            handle_mouse(app, mouse);
            vec![]
        }
        UiEvent::Resize { width, height } => handle_resize(app, width, height),
        UiEvent::TurnSpawned { rx, cancel } => handle_turn_spawned(app, rx, cancel),
        UiEvent::Completed(response) => handle_completed(app, response),
        UiEvent::Delta(chunk) => handle_delta(app, &chunk),
        UiEvent::StreamClosed => {
            if app.mode.is_streaming() {
                finish_stream(app)
            } else {
                vec![]
            }
        }
        UiEvent::Failure(err) => {
            if app.mode.is_running() {
                fail_turn(app, err)
            } else {
                tracing::debug!(error = %err, "ignoring failure outside a turn");
                vec![]
            }
        }
    };

    app.refresh_transcript();
    effects
}

// ============================================================================
// Terminal input
// ============================================================================

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let viewport = app.viewport_height();

    match key.code {
        KeyCode::Char('c') if ctrl => {
            let mut effects = cancel_turn(app);
            app.should_quit = true;
            effects.push(UiEffect::Quit);
            return effects;
        }
        KeyCode::PageUp => {
            app.transcript.page_up(viewport);
            return vec![];
        }
        KeyCode::PageDown => {
            app.transcript.page_down(viewport);
            return vec![];
        }
        KeyCode::Home if ctrl => {
            app.transcript.scroll_to_top();
            return vec![];
        }
        KeyCode::End if ctrl => {
            app.transcript.scroll_to_bottom();
            return vec![];
        }
        KeyCode::Char('h') if ctrl => {
            app.show_help = !app.show_help;
            return vec![];
        }
        KeyCode::F(1) => {
            app.show_help = !app.show_help;
            return vec![];
        }
        KeyCode::Char('l') if ctrl => {
            app.input.toggle_multiline();
            return vec![];
        }
        KeyCode::Esc => {
            if app.show_help {
                app.show_help = false;
                return vec![];
            }
            if app.mode.is_running() {
                let effects = cancel_turn(app);
                app.last_error = Some(ChatError::Cancelled);
                return effects;
            }
            return vec![];
        }
        _ => {}
    }

    match app.input.handle_key(key) {
        InputAction::Submit => submit(app),
        InputAction::Edited | InputAction::Ignored => vec![],
    }
}

fn handle_mouse(app: &mut AppState, mouse: MouseEvent) {
    let viewport = app.viewport_height();
    match mouse.kind {
        MouseEventKind::ScrollUp => app.transcript.scroll_up(WHEEL_SCROLL_LINES, viewport),
        MouseEventKind::ScrollDown => app.transcript.scroll_down(WHEEL_SCROLL_LINES, viewport),
        _ => {}
    }
}

fn handle_resize(app: &mut AppState, width: u16, height: u16) -> Vec<UiEffect> {
    match Layout::compute(width, height) {
        Ok(layout) => {
            app.layout = Some(layout);
            vec![]
        }
        Err(err) => {
            tracing::warn!(width, height, "terminal too small");
            let mut effects = cancel_turn(app);
            app.fatal = Some(err);
            app.should_quit = true;
            effects.push(UiEffect::Quit);
            effects
        }
    }
}

// ============================================================================
// Turn lifecycle
// ============================================================================

/// Starts a turn with the editor content. Ignored unless idle.
fn submit(app: &mut AppState) -> Vec<UiEffect> {
    if app.mode.is_running() || app.input.buffer.is_blank() {
        return vec![];
    }

    let text = app.input.buffer.take().trim().to_string();
    app.last_error = None;
    app.transcript.scroll_to_bottom();

    if !app.settings.has_api_key() {
        app.history.push(Message::user(text));
        tracing::warn!("turn rejected: no API key");
        app.last_error = Some(ChatError::Auth);
        return vec![];
    }

    let request = app.client.build_request(
        &app.history,
        &text,
        app.settings.system_prompt.as_deref(),
        app.settings.stream,
    );
    app.history.push(Message::user(text));
    app.scratch.clear();

    tracing::info!(
        stream = request.stream,
        messages = request.messages.len(),
        "turn started"
    );
    vec![UiEffect::StartTurn { request }]
}

fn handle_turn_spawned(
    app: &mut AppState,
    rx: mpsc::Receiver<UiEvent>,
    cancel: CancellationToken,
) -> Vec<UiEffect> {
    if app.mode.is_running() {
        tracing::warn!("turn spawned while another is running; cancelling it");
        return vec![UiEffect::CancelTurn { token: cancel }];
    }

    app.mode = if app.settings.stream {
        ChatMode::Streaming { rx, cancel }
    } else {
        ChatMode::Waiting { rx, cancel }
    };
    vec![]
}

fn handle_completed(app: &mut AppState, response: CompletionResponse) -> Vec<UiEffect> {
    if !matches!(app.mode, ChatMode::Waiting { .. }) {
        tracing::debug!("ignoring completion outside a waiting turn");
        return vec![];
    }

    if let Some(usage) = response.usage {
        app.last_usage = Some(usage);
    }
    let Some(choice) = response.choices.into_iter().next() else {
        return fail_turn(app, ChatError::EmptyResponse);
    };

    app.history.push(choice.message);
    app.mode = ChatMode::Idle;
    tracing::info!(finish_reason = choice.finish_reason.as_deref(), "turn completed");
    persist(app)
}

fn handle_delta(app: &mut AppState, chunk: &StreamChunk) -> Vec<UiEffect> {
    if !app.mode.is_streaming() {
        tracing::debug!("ignoring delta outside a streaming turn");
        return vec![];
    }

    if let Some(usage) = chunk.usage {
        app.last_usage = Some(usage);
    }
    let Some(choice) = chunk.choices.first() else {
        return fail_turn(app, ChatError::EmptyResponse);
    };

    app.scratch.push_str(choice.content());
    if choice.is_terminal() {
        tracing::debug!(finish_reason = choice.finish_reason.as_deref(), "stream finished");
        return finish_stream(app);
    }
    vec![]
}

/// Commits the scratch buffer as one assistant message.
fn finish_stream(app: &mut AppState) -> Vec<UiEffect> {
    if app.scratch.is_empty() {
        return fail_turn(app, ChatError::EmptyResponse);
    }

    let content = std::mem::take(&mut app.scratch);
    app.history.push(Message::assistant(content));
    // The worker may still be reading the body after a terminal delta
    let mut effects = cancel_turn(app);
    tracing::info!("turn completed");
    effects.extend(persist(app));
    effects
}

/// Records the error and returns to idle. History is left as is.
fn fail_turn(app: &mut AppState, err: ChatError) -> Vec<UiEffect> {
    tracing::warn!(kind = err.kind(), error = %err, "turn failed");
    let effects = cancel_turn(app);
    app.last_error = Some(err);
    effects
}

/// Drops the running turn, if any, and asks the runtime to cancel its worker.
fn cancel_turn(app: &mut AppState) -> Vec<UiEffect> {
    app.scratch.clear();
    match std::mem::replace(&mut app.mode, ChatMode::Idle) {
        ChatMode::Idle => vec![],
        ChatMode::Waiting { cancel, .. } | ChatMode::Streaming { cancel, .. } => {
            vec![UiEffect::CancelTurn { token: cancel }]
        }
    }
}

fn persist(app: &AppState) -> Vec<UiEffect> {
    vec![UiEffect::PersistHistory {
        messages: app.history.clone(),
    }]
}
