//! UI event types.
//!
//! Every external occurrence (terminal input, timer, network result) is
//! converted to a `UiEvent` before it reaches the reducer.

use crossterm::event::{Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};
use gptui_core::providers::ChatError;
use gptui_core::providers::openai::{CompletionResponse, StreamChunk};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Unified event enum for the TUI.
#[derive(Debug)]
pub enum UiEvent {
    /// Timer tick (spinner animation).
    Tick,

    /// Key press.
    Key(KeyEvent),

    /// Bracketed paste.
    Paste(String),

    /// Mouse input (wheel scrolling).
    Mouse(MouseEvent),

    /// Terminal resized.
    Resize { width: u16, height: u16 },

    /// A turn's worker was spawned; its events arrive on `rx`.
    TurnSpawned {
        rx: mpsc::Receiver<UiEvent>,
        cancel: CancellationToken,
    },

    /// Non-streaming response received.
    Completed(CompletionResponse),

    /// One streamed event, in wire order.
    Delta(StreamChunk),

    /// Streaming body ended (`[DONE]` or end of body).
    StreamClosed,

    /// The turn failed.
    Failure(ChatError),
}

impl UiEvent {
    /// Converts a terminal event. Returns `None` for events the UI ignores.
    pub fn from_terminal(event: CrosstermEvent) -> Option<Self> {
        match event {
            CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => Some(Self::Key(key)),
            CrosstermEvent::Paste(text) => Some(Self::Paste(text)),
            CrosstermEvent::Mouse(mouse) => Some(Self::Mouse(mouse)),
            CrosstermEvent::Resize(width, height) => Some(Self::Resize { width, height }),
            _ => None,
        }
    }

    /// True for events after which a turn's channel carries nothing useful.
    pub fn ends_turn(&self) -> bool {
        match self {
            UiEvent::Completed(_) | UiEvent::StreamClosed | UiEvent::Failure(_) => true,
            UiEvent::Delta(chunk) => chunk
                .choices
                .first()
                .is_none_or(gptui_core::providers::openai::StreamChoice::is_terminal),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyModifiers};
    use gptui_core::providers::openai::{Delta, StreamChoice};

    use super::*;

    fn chunk(finish_reason: Option<&str>) -> StreamChunk {
        StreamChunk {
            choices: vec![StreamChoice {
                delta: Delta {
                    role: None,
                    content: Some("x".to_string()),
                },
                finish_reason: finish_reason.map(str::to_string),
                ..StreamChoice::default()
            }],
            ..StreamChunk::default()
        }
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert!(UiEvent::from_terminal(CrosstermEvent::Key(key)).is_none());
    }

    #[test]
    fn test_resize_conversion() {
        let event = UiEvent::from_terminal(CrosstermEvent::Resize(80, 24));
        assert!(matches!(
            event,
            Some(UiEvent::Resize {
                width: 80,
                height: 24
            })
        ));
    }

    #[test]
    fn test_ends_turn() {
        assert!(!UiEvent::Delta(chunk(None)).ends_turn());
        assert!(UiEvent::Delta(chunk(Some("stop"))).ends_turn());
        assert!(UiEvent::Delta(StreamChunk::default()).ends_turn());
        assert!(UiEvent::StreamClosed.ends_turn());
        assert!(!UiEvent::Tick.ends_turn());
    }
}
