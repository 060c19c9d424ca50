//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use gptui_core::config;

mod commands;

#[derive(Parser)]
#[command(name = "gptui")]
#[command(version)]
#[command(about = "Chat with OpenAI-compatible models in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    chat: ChatArgs,
}

/// Options for a chat session.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ChatArgs {
    /// Model to use (default from config, then gpt-3.5-turbo)
    #[arg(long)]
    model: Option<String>,

    /// System prompt sent with the first message
    #[arg(long = "system", value_name = "PROMPT")]
    system_prompt: Option<String>,

    /// Resume from a saved conversation (JSON array of messages)
    #[arg(long, value_name = "FILE")]
    history: Option<String>,

    /// Approximate token budget shown in the status line
    #[arg(long, value_name = "N")]
    max_context_length: Option<usize>,

    /// Stream responses as they are generated
    #[arg(long, value_name = "BOOL")]
    stream: Option<bool>,

    /// API base URL (also OPENAI_BASE_URL)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// API key (also OPENAI_API_KEY)
    #[arg(long, value_name = "KEY")]
    openai_api_key: Option<String>,

    /// Pre-fill the input with a message
    #[arg(short, long)]
    message: Option<String>,
}

impl From<&ChatArgs> for config::Overrides {
    fn from(args: &ChatArgs) -> Self {
        config::Overrides {
            model: args.model.clone(),
            system_prompt: args.system_prompt.clone(),
            history_path: args.history.clone(),
            max_context_length: args.max_context_length,
            stream: args.stream,
            base_url: args.base_url.clone(),
            api_key: args.openai_api_key.clone(),
        }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat(ChatArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
        Some(Commands::Chat(args)) => run_chat(&args),
        None => run_chat(&cli.chat),
    }
}

fn run_chat(args: &ChatArgs) -> Result<()> {
    let config = config::Config::load().context("load config")?;

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(commands::chat::run(&config, args))
}
