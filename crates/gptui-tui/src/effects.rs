//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They cover I/O and task spawning only, so the reducer never touches the
//! network or the filesystem itself.

use gptui_core::providers::Message;
use gptui_core::providers::openai::CompletionRequest;
use tokio_util::sync::CancellationToken;

/// Effects returned by the reducer for the runtime to execute.
#[derive(Debug)]
pub enum UiEffect {
    /// Quit the application.
    Quit,

    /// Spawn the network worker for a turn.
    StartTurn { request: CompletionRequest },

    /// Cancel the running turn's worker.
    CancelTurn { token: CancellationToken },

    /// Write the conversation snapshot.
    PersistHistory { messages: Vec<Message> },
}
