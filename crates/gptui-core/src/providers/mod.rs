//! Chat providers.

pub mod openai;
pub mod shared;

pub use shared::{ChatError, ChatResult, Message, Role};
