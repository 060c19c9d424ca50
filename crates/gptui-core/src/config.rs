//! Configuration management for gptui.
//!
//! Loads configuration from `${GPTUI_HOME}/config.toml` with sensible defaults,
//! then resolves it against command-line overrides and the environment into
//! a [`ChatSettings`] value that is built once and passed down explicitly.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for gptui configuration and data directories.
    //!
    //! GPTUI_HOME resolution order:
    //! 1. GPTUI_HOME environment variable (if set)
    //! 2. ~/.config/gptui (default)

    use std::path::PathBuf;

    /// Returns the gptui home directory.
    ///
    /// Checks GPTUI_HOME env var first, falls back to ~/.config/gptui.
    /// Uses the current directory when no home directory can be determined.
    pub fn gptui_home() -> PathBuf {
        if let Ok(home) = std::env::var("GPTUI_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("gptui"))
            .unwrap_or_else(|| PathBuf::from(".gptui"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        gptui_home().join("config.toml")
    }

    /// Returns the directory where chat snapshots are written.
    pub fn chat_dir() -> PathBuf {
        gptui_home().join("chat")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        gptui_home().join("logs")
    }
}

/// Provider connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    /// API key (falls back to `OPENAI_API_KEY`).
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API.
    pub base_url: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model used for chat completions.
    pub model: String,

    /// Optional system prompt, injected on the first turn only.
    pub system_prompt: Option<String>,

    /// Whether responses are streamed.
    pub stream: bool,

    /// Approximate token budget. Never enforced; only reported.
    pub max_context_length: Option<usize>,

    /// Timeout for non-streaming requests in seconds (0 disables).
    pub request_timeout_secs: u64,

    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,

    /// Provider connection settings.
    pub openai: OpenAIConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            system_prompt: None,
            stream: true,
            max_context_length: None,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            temperature: None,
            top_p: None,
            max_tokens: None,
            openai: OpenAIConfig::default(),
        }
    }
}

impl Config {
    pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.request_timeout_secs))
        }
    }
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub history_path: Option<String>,
    pub max_context_length: Option<usize>,
    pub stream: Option<bool>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Optional sampling parameters forwarded with every request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingParams {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Fully resolved settings for one chat session.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub system_prompt: Option<String>,
    pub stream: bool,
    /// May be empty; turns then fail with an auth error before any request.
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Option<Duration>,
    pub max_context_length: Option<usize>,
    pub sampling: SamplingParams,
    pub history_path: Option<String>,
}

impl ChatSettings {
    /// Resolves settings from config, command-line overrides and the process environment.
    ///
    /// # Errors
    /// Returns an error if the resolved base URL is not a valid URL.
    pub fn resolve(config: &Config, overrides: Overrides) -> Result<Self> {
        Self::resolve_with_env(config, overrides, |name| std::env::var(name).ok())
    }

    /// Same as [`ChatSettings::resolve`] with an injectable environment lookup.
    ///
    /// # Errors
    /// Returns an error if the resolved base URL is not a valid URL.
    pub fn resolve_with_env<F>(config: &Config, overrides: Overrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = resolve_api_key(
            overrides.api_key.as_deref(),
            config.openai.api_key.as_deref(),
            env(API_KEY_ENV).as_deref(),
        );
        let base_url = resolve_base_url(
            overrides.base_url.as_deref(),
            env(BASE_URL_ENV).as_deref(),
            config.openai.base_url.as_deref(),
        )?;

        let system_prompt = overrides
            .system_prompt
            .or_else(|| config.system_prompt.clone())
            .filter(|prompt| !prompt.trim().is_empty());

        Ok(Self {
            model: overrides
                .model
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| config.model.clone()),
            system_prompt,
            stream: overrides.stream.unwrap_or(config.stream),
            api_key,
            base_url,
            request_timeout: config.request_timeout(),
            max_context_length: overrides.max_context_length.or(config.max_context_length),
            sampling: SamplingParams {
                temperature: config.temperature,
                top_p: config.top_p,
                max_tokens: config.max_tokens,
            },
            history_path: overrides.history_path.filter(|path| !path.trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Resolves an API key with precedence: flag > config > env.
///
/// Returns an empty string when no source provides a key.
fn resolve_api_key(flag: Option<&str>, config: Option<&str>, env: Option<&str>) -> String {
    [flag, config, env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Resolves a base URL with precedence: flag > env > config > default.
fn resolve_base_url(flag: Option<&str>, env: Option<&str>, config: Option<&str>) -> Result<String> {
    let Some(url) = [flag, env, config]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
    else {
        return Ok(Config::DEFAULT_BASE_URL.to_string());
    };

    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(url.to_string())
}

/// Expands a leading `~/` to the user's home directory.
///
/// # Errors
/// Returns an error if the path starts with `~/` and no home directory is known.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir().context("Could not determine home directory")?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
