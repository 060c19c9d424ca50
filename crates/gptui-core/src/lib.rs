//! Core gptui library (config, transport, chat client, history).

pub mod config;
pub mod history;
pub mod logging;
pub mod providers;
pub mod tokens;
pub mod transport;
