//! OpenAI-compatible Chat Completions API.

mod chat_completions;
pub mod sse;
pub mod types;

pub use chat_completions::{ChatClient, ChunkStream};
pub use types::{
    CompletionChoice, CompletionRequest, CompletionResponse, Delta, StreamChoice, StreamChunk,
    Usage,
};
