//! Rough token estimates.

use crate::providers::Message;

/// Counts whitespace-separated words. A cheap stand-in for a tokenizer.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated tokens across all message contents.
pub fn count_history_tokens(messages: &[Message]) -> usize {
    messages.iter().map(|m| count_tokens(&m.content)).sum()
}
