//! Full-screen chat TUI.

pub mod effects;
pub mod events;
pub mod features;
pub mod layout;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, Write, stderr};

use anyhow::Result;
pub use features::{input, statusline, transcript};
use gptui_core::config::ChatSettings;
use gptui_core::history::HistoryStore;
use gptui_core::providers::Message;
pub use runtime::TuiRuntime;
use state::AppState;

/// Runs the interactive chat until the user quits.
///
/// `initial_input` pre-fills the editor.
///
/// # Errors
/// Returns an error if stderr is not a terminal, on terminal I/O failure, or
/// when the terminal is too small.
pub async fn run_interactive_chat(
    settings: ChatSettings,
    history: Vec<Message>,
    store: HistoryStore,
    initial_input: Option<String>,
) -> Result<()> {
    if !stderr().is_terminal() {
        anyhow::bail!("Chat mode requires a terminal.");
    }

    // Shown until the alternate screen takes over
    let mut err = stderr();
    writeln!(err, "gptui")?;
    writeln!(err, "Model: {}", settings.model)?;
    writeln!(err, "Session: {}", store.session_id())?;
    if !history.is_empty() {
        writeln!(err, "Loaded {} previous messages", history.len())?;
    }
    err.flush()?;

    tracing::info!(
        model = %settings.model,
        stream = settings.stream,
        session = store.session_id(),
        "chat session started"
    );

    let mut state = AppState::new(settings, history);
    if let Some(text) = initial_input.as_deref() {
        state = state.with_input(text);
    }

    {
        let mut runtime = TuiRuntime::new(state, store)?;
        runtime.run()?;
    }

    // Terminal is restored once the runtime is dropped
    writeln!(stderr(), "Goodbye!")?;
    Ok(())
}
