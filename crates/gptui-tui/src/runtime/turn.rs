//! Network worker for one turn.

use gptui_core::providers::openai::{ChatClient, CompletionRequest};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::UiEvent;

/// Buffered events per turn before the worker waits on the UI.
const TURN_CHANNEL_CAPACITY: usize = 256;

/// Spawns the worker for `request` and returns the event that hands its
/// channel to the reducer.
pub fn spawn_turn(client: ChatClient, request: CompletionRequest) -> UiEvent {
    let (tx, rx) = mpsc::channel(TURN_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tracing::debug!(model = client.model(), stream = request.stream, "spawning turn worker");
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => tracing::debug!("turn cancelled"),
            () = run_turn(&client, &request, &tx) => {}
        }
    });

    UiEvent::TurnSpawned { rx, cancel }
}

/// Performs the call and sends its outcome as `UiEvent`s.
///
/// Streaming turns send one `Delta` per decoded event followed by
/// `StreamClosed`; non-streaming turns send one `Completed`. Any error ends
/// the turn with a single `Failure`.
pub async fn run_turn(client: &ChatClient, request: &CompletionRequest, tx: &mpsc::Sender<UiEvent>) {
    let outcome = if request.stream {
        let (chunk_tx, mut chunk_rx) = mpsc::channel(TURN_CHANNEL_CAPACITY);
        // Owns the receiver so the client sees a closed channel once the UI stops listening
        let forward = async move {
            while let Some(chunk) = chunk_rx.recv().await {
                if tx.send(UiEvent::Delta(chunk)).await.is_err() {
                    break;
                }
            }
        };
        let (result, ()) = tokio::join!(client.stream(request, chunk_tx), forward);
        result.map_or_else(UiEvent::Failure, |()| UiEvent::StreamClosed)
    } else {
        client
            .complete(request)
            .await
            .map_or_else(UiEvent::Failure, UiEvent::Completed)
    };

    if tx.send(outcome).await.is_err() {
        tracing::debug!("turn result dropped; UI no longer listening");
    }
}
