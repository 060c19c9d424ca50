//! Message editor.

mod text_buffer;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
pub use text_buffer::TextBuffer;

/// What a key did to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Key not used by the editor.
    Ignored,
    /// Text or cursor changed.
    Edited,
    /// Enter pressed in single-line mode.
    Submit,
}

/// Editor state: buffer plus the multi-line toggle.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub buffer: TextBuffer,
    /// When set, Enter inserts a newline instead of sending.
    pub multiline: bool,
}

impl InputState {
    pub fn with_text(text: &str) -> Self {
        let mut state = Self::default();
        state.buffer.set_text(text);
        state
    }

    pub fn toggle_multiline(&mut self) {
        self.multiline = !self.multiline;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        if key.code == KeyCode::Enter {
            if self.multiline || key.modifiers.contains(KeyModifiers::ALT) {
                self.buffer.insert_newline();
                return InputAction::Edited;
            }
            return InputAction::Submit;
        }

        if self.buffer.input(key) {
            InputAction::Edited
        } else {
            InputAction::Ignored
        }
    }

    pub fn paste(&mut self, text: &str) {
        self.buffer.insert_str(text);
    }
}
