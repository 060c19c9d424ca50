//! Chat command handler.

use std::io::{IsTerminal, Read};

use anyhow::{Context, Result};
use gptui_core::config::{self, ChatSettings};
use gptui_core::history::{self, HistoryStore};
use gptui_core::logging;

use crate::cli::ChatArgs;

pub async fn run(config: &config::Config, args: &ChatArgs) -> Result<()> {
    let _log_guard = match logging::init(&config::paths::logs_dir()) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let settings = ChatSettings::resolve(config, args.into())?;

    let (history, session_id) = match settings.history_path.as_deref() {
        Some(path) => {
            let (path, messages) = history::load_history(path)?;
            let session_id =
                history::session_id_from_path(&path).unwrap_or_else(history::new_session_id);
            (messages, session_id)
        }
        None => (Vec::new(), history::new_session_id()),
    };
    let store = HistoryStore::in_chat_dir(session_id);
    tracing::info!(
        session_id = store.session_id(),
        model = %settings.model,
        stream = settings.stream,
        resumed_messages = history.len(),
        "starting chat session"
    );

    let initial_input = match args.message.clone() {
        Some(message) => Some(message),
        None => read_piped_stdin()?,
    };

    gptui_tui::run_interactive_chat(settings, history, store, initial_input)
        .await
        .context("interactive chat failed")
}

/// Returns piped stdin, or `None` when stdin is a terminal or the pipe is empty.
fn read_piped_stdin() -> Result<Option<String>> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut text = String::new();
    stdin
        .lock()
        .read_to_string(&mut text)
        .context("read piped input")?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}
