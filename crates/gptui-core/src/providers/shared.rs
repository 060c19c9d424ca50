//! Provider-agnostic chat types and errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transport::TransportError;

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single chat message. Never mutated once appended to history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Errors produced while running a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatError {
    /// No API key configured. Raised before any request is made.
    Auth,
    /// Connection, timeout or body read failure
    Transport(TransportError),
    /// Non-200 response
    HttpStatus {
        status: u16,
        body: String,
    },
    /// Malformed JSON in a response or stream event
    Decode(String),
    /// Response or stream event without any choices
    EmptyResponse,
    /// Turn aborted by the user
    Cancelled,
}

impl ChatError {
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    pub fn decode(err: &serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }

    /// Short category name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Auth => "auth",
            ChatError::Transport(_) => "transport",
            ChatError::HttpStatus { .. } => "http_status",
            ChatError::Decode(_) => "decode",
            ChatError::EmptyResponse => "empty_response",
            ChatError::Cancelled => "cancelled",
        }
    }
}

/// Pulls `error.message` out of an OpenAI-style error body, if present.
fn api_error_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    let error = json.get("error")?;
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Auth => write!(
                f,
                "API key is not set. Set OPENAI_API_KEY or pass --openai-api-key"
            ),
            ChatError::Transport(err) => write!(f, "{err}"),
            ChatError::HttpStatus { status, body } => match api_error_message(body) {
                Some(message) => write!(f, "status code: {status}, error: {message}"),
                None => write!(f, "status code: {status}, body: {}", body.trim()),
            },
            ChatError::Decode(message) => write!(f, "Failed to decode response: {message}"),
            ChatError::EmptyResponse => write!(f, "Response contained no choices"),
            ChatError::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for ChatError {
    fn from(err: TransportError) -> Self {
        ChatError::Transport(err)
    }
}

/// Result type for chat operations.
pub type ChatResult<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result = serde_json::from_str::<Message>(r#"{"role":"tool","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_http_status_display_extracts_message() {
        let err = ChatError::http_status(
            401,
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        );
        assert_eq!(
            err.to_string(),
            "status code: 401, error: Incorrect API key provided"
        );
    }

    #[test]
    fn test_http_status_display_string_error() {
        let err = ChatError::http_status(429, r#"{"error":"rate limited"}"#);
        assert_eq!(err.to_string(), "status code: 429, error: rate limited");
    }

    #[test]
    fn test_http_status_display_raw_body() {
        let err = ChatError::http_status(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "status code: 502, body: Bad Gateway");
    }
}
