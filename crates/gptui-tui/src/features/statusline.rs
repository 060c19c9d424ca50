//! Status line below the input.

use gptui_core::config::ChatSettings;
use gptui_core::providers::Message;
use gptui_core::providers::openai::Usage;
use gptui_core::tokens::count_history_tokens;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    /// Approximate history size exceeds `max_context_length`.
    pub over_budget: bool,
}

pub fn status_line(
    settings: &ChatSettings,
    history: &[Message],
    last_usage: Option<&Usage>,
) -> StatusLine {
    let tokens = count_history_tokens(history);
    let mut parts = vec![
        settings.model.clone(),
        if settings.stream { "stream" } else { "no-stream" }.to_string(),
    ];

    let over_budget = match settings.max_context_length {
        Some(max) => {
            parts.push(format!("~{tokens}/{max} tokens"));
            tokens > max
        }
        None => {
            parts.push(format!("~{tokens} tokens"));
            false
        }
    };
    if over_budget {
        parts.push("context limit exceeded (history is not truncated)".to_string());
    }

    if let Some(usage) = last_usage {
        parts.push(format!(
            "last: {} in / {} out",
            usage.prompt_tokens, usage.completion_tokens
        ));
    }

    StatusLine {
        text: parts.join(" · "),
        over_budget,
    }
}
