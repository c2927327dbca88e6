//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use senko_core::config;

use crate::logging;

mod commands;

#[derive(Parser)]
#[command(name = "senko")]
#[command(version)]
#[command(about = "Chat with Senko, your fox companion, from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    chat: ChatArgs,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat,

    /// Render message text to display markup
    Render {
        /// File to render (reads stdin when omitted)
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,

        /// Print the text a reader sees instead of markup
        #[arg(long)]
        plain: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Options for the chat session; accepted before or after `chat`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ChatArgs {
    /// Override the model from config
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Override the API base URL from config
    #[arg(long, env = "SENKO_BASE_URL", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Answer locally without contacting any model
    #[arg(long, global = true)]
    pub offline: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Load an exported history before starting
    #[arg(long, value_name = "FILE", global = true)]
    pub import: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print the default config
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;

    let Cli { command, chat } = cli;

    // default to chat mode
    let Some(command) = command else {
        return commands::chat::run(&config, &chat).await;
    };

    match command {
        Commands::Chat => commands::chat::run(&config, &chat).await,
        Commands::Render { path, plain } => commands::render::run(path.as_deref(), plain),
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        },
    }
}
