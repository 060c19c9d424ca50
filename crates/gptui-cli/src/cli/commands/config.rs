//! Config command handlers.

use anyhow::Result;
use gptui_core::config;

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)?;
    println!("Created config at {}", config_path.display());
    Ok(())
}
