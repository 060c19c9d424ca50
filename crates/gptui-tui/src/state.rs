//! Application state.
//!
//! ```text
//! AppState
//! ├── settings / client   (resolved once at startup)
//! ├── history             (append-only conversation)
//! ├── scratch             (deltas of the streaming turn, not yet in history)
//! ├── mode: ChatMode      (Idle / Waiting / Streaming)
//! ├── input: InputState   (editor)
//! └── transcript: ScrollState
//! ```
//!
//! Only the reducer mutates this. Network workers talk to it exclusively
//! through the turn channel held in `ChatMode`.

use gptui_core::config::ChatSettings;
use gptui_core::providers::openai::{ChatClient, Usage};
use gptui_core::providers::{ChatError, Message};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::UiEvent;
use crate::input::InputState;
use crate::layout::{Layout, LayoutError};
use crate::transcript::{self, ScrollState, TranscriptLine};

/// Wrap width used before the first resize event.
const DEFAULT_WIDTH: usize = 76;

/// Conversation mode. A network call is outstanding iff not `Idle`.
#[derive(Debug)]
pub enum ChatMode {
    /// Ready for input.
    Idle,
    /// Non-streaming call outstanding.
    Waiting {
        rx: mpsc::Receiver<UiEvent>,
        cancel: CancellationToken,
    },
    /// Deltas arriving.
    Streaming {
        rx: mpsc::Receiver<UiEvent>,
        cancel: CancellationToken,
    },
}

impl ChatMode {
    pub fn is_running(&self) -> bool {
        !matches!(self, ChatMode::Idle)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, ChatMode::Streaming { .. })
    }

    pub fn receiver(&mut self) -> Option<&mut mpsc::Receiver<UiEvent>> {
        match self {
            ChatMode::Idle => None,
            ChatMode::Waiting { rx, .. } | ChatMode::Streaming { rx, .. } => Some(rx),
        }
    }
}

pub struct AppState {
    pub settings: ChatSettings,
    pub client: ChatClient,
    pub history: Vec<Message>,
    pub scratch: String,
    pub mode: ChatMode,
    pub input: InputState,
    pub transcript: ScrollState,
    pub last_error: Option<ChatError>,
    pub last_usage: Option<Usage>,
    /// `None` until the first resize event.
    pub layout: Option<Layout>,
    /// Set when the terminal becomes too small to render.
    pub fatal: Option<LayoutError>,
    pub show_help: bool,
    pub spinner_frame: usize,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(settings: ChatSettings, history: Vec<Message>) -> Self {
        let client = ChatClient::new(&settings);
        let mut state = Self {
            settings,
            client,
            history,
            scratch: String::new(),
            mode: ChatMode::Idle,
            input: InputState::default(),
            transcript: ScrollState::default(),
            last_error: None,
            last_usage: None,
            layout: None,
            fatal: None,
            show_help: false,
            spinner_frame: 0,
            should_quit: false,
        };
        state.refresh_transcript();
        state
    }

    /// Pre-fills the editor.
    #[must_use]
    pub fn with_input(mut self, text: &str) -> Self {
        self.input = InputState::with_text(text);
        self
    }

    pub fn transcript_width(&self) -> usize {
        self.layout
            .map_or(DEFAULT_WIDTH, |layout| usize::from(layout.transcript_width))
    }

    pub fn viewport_height(&self) -> usize {
        self.layout
            .map_or(1, |layout| usize::from(layout.transcript_height))
    }

    /// Transcript at the current width, or the welcome text when empty.
    pub fn transcript_lines(&self) -> Vec<TranscriptLine> {
        let lines = transcript::render_lines(
            &self.history,
            &self.scratch,
            self.mode.is_streaming(),
            self.transcript_width(),
        );
        if lines.is_empty() {
            transcript::welcome_lines(&self.settings.model)
        } else {
            lines
        }
    }

    /// Recomputes the line count used for scrolling.
    pub fn refresh_transcript(&mut self) {
        self.transcript.line_count = self.transcript_lines().len();
    }
}
