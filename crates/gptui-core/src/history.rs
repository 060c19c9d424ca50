//! Conversation snapshots on disk.
//!
//! A snapshot is a JSON array of messages. It is read once at startup when
//! a history path is given, and rewritten wholesale after each completed turn.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{expand_home, paths};
use crate::providers::Message;

/// Format of timestamp-derived session ids, e.g. `2024-05-01_13-45-10`.
const SESSION_ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Returns a new session id derived from the local time.
pub fn new_session_id() -> String {
    chrono::Local::now().format(SESSION_ID_FORMAT).to_string()
}

/// Session id for a resumed history file: its file stem.
pub fn session_id_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

/// Reads a history snapshot. A leading `~/` is expanded.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a JSON array of messages.
pub fn load_history(path: &str) -> Result<(PathBuf, Vec<Message>)> {
    let path = expand_home(path)?;
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read history from {}", path.display()))?;
    let messages: Vec<Message> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse history from {}", path.display()))?;
    tracing::info!(path = %path.display(), messages = messages.len(), "history loaded");
    Ok((path, messages))
}

/// Writes snapshots for one session to `<dir>/<session_id>.json`.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
    session_id: String,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            session_id: session_id.into(),
        }
    }

    /// Store under the default chat directory.
    pub fn in_chat_dir(session_id: impl Into<String>) -> Self {
        Self::new(paths::chat_dir(), session_id)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.session_id))
    }

    /// Replaces the snapshot with `messages`.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, messages: &[Message]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {}", self.dir.display()))?;

        let path = self.path();
        let contents = serde_json::to_vec(messages).context("Failed to serialize history")?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write history to {}", path.display()))?;

        tracing::debug!(path = %path.display(), messages = messages.len(), "history saved");
        Ok(path)
    }
}
