//! Conversation transcript.
//!
//! The transcript is rebuilt from `(history, scratch, streaming)` on every
//! frame. `render_lines` is pure, so the same inputs always produce the same
//! lines in history order.

mod scroll;
mod wrap;

use gptui_core::providers::{Message, Role};
pub use scroll::{ScrollMode, ScrollState};
pub use wrap::{wrap_chars, wrap_paragraphs, wrap_text};

pub const USER_LABEL: &str = "You";
pub const ASSISTANT_LABEL: &str = "ChatGPT";

/// Visual role of a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Title,
    Hint,
    UserLabel,
    AssistantLabel,
    Body,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub kind: LineKind,
    pub text: String,
}

impl TranscriptLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::new(LineKind::Blank, "")
    }
}

/// Lines shown before the first message.
pub fn welcome_lines(model: &str) -> Vec<TranscriptLine> {
    vec![
        TranscriptLine::new(LineKind::Title, "ChatGPT Terminal UI"),
        TranscriptLine::blank(),
        TranscriptLine::new(LineKind::Hint, format!("Model: {model}")),
        TranscriptLine::blank(),
        TranscriptLine::new(LineKind::Body, "Type a message and press Enter to send."),
    ]
}

/// Builds the transcript for `history` plus, while streaming, the scratch text.
///
/// System messages are not shown.
pub fn render_lines(
    history: &[Message],
    scratch: &str,
    streaming: bool,
    width: usize,
) -> Vec<TranscriptLine> {
    let mut lines = Vec::new();

    for message in history {
        let label = match message.role {
            Role::User => TranscriptLine::new(LineKind::UserLabel, USER_LABEL),
            Role::Assistant => TranscriptLine::new(LineKind::AssistantLabel, ASSISTANT_LABEL),
            Role::System => continue,
        };
        push_block(&mut lines, label, &message.content, width);
    }

    if streaming && !scratch.is_empty() {
        let label = TranscriptLine::new(LineKind::AssistantLabel, ASSISTANT_LABEL);
        push_block(&mut lines, label, scratch, width);
    }

    // Drop the separator after the last block
    if lines.last().is_some_and(|line| line.kind == LineKind::Blank) {
        lines.pop();
    }

    lines
}

fn push_block(lines: &mut Vec<TranscriptLine>, label: TranscriptLine, content: &str, width: usize) {
    lines.push(label);
    lines.extend(
        wrap_paragraphs(content.trim_end(), width)
            .into_iter()
            .map(|text| TranscriptLine::new(LineKind::Body, text)),
    );
    lines.push(TranscriptLine::blank());
}
