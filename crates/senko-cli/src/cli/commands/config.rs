//! `senko config` handlers.

use anyhow::{Context, Result};
use senko_core::config::{Config, paths};

/// Prints the config file location, noting when it does not exist yet and defaults apply.
pub fn path() {
    let path = paths::config_path();
    if path.exists() {
        println!("{}", path.display());
    } else {
        println!("{} (not created yet, defaults in use)", path.display());
    }
}

/// Writes the default config, then tells the user which variable carries the API key.
pub fn init() -> Result<()> {
    let path = paths::config_path();
    Config::init(&path).with_context(|| format!("create {}", path.display()))?;

    let defaults = Config::default();
    println!("Created config at {}", path.display());
    if defaults.api_key().is_none() {
        println!(
            "Set {} to chat with {}, or pass --offline.",
            defaults.api_key_env, defaults.base_url
        );
    }
    Ok(())
}

pub fn generate() -> Result<()> {
    print!("{}", Config::generate()?);
    Ok(())
}
