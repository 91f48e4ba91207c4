//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use revu_core::{config, logging};

mod commands;

#[derive(Parser)]
#[command(name = "revu")]
#[command(version = "0.1")]
#[command(about = "Terminal client for a realtime review wall")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the config file (default: ${REVU_HOME}/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Submit a review without opening the wall
    Post {
        /// The review text (1-200 characters)
        #[arg(short, long)]
        text: String,

        /// Pre-verified bot-check token (skips the interactive challenge)
        #[arg(long, value_name = "TOKEN")]
        captcha_token: Option<String>,
    },

    /// Print the wall once, newest first
    Wall {
        /// Maximum number of reviews to print
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Sign in with the identity provider
    Login {
        /// Complete a pending redirect sign-in with the pasted callback URL
        #[arg(long, value_name = "URL")]
        paste: Option<String>,
    },

    /// Sign out (clear the cached session)
    Logout,

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

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .unwrap_or_else(config::paths::config_path);
    let config = config::Config::load_from(&config_path).context("load config")?;

    // Diagnostics go to the rolling file; the terminal stays quiet. A
    // failure here (read-only home) must not take the commands down.
    let _log_guard = logging::init(&config.log_filter).ok();

    // default to the interactive wall
    let Some(command) = cli.command else {
        return revu_tui::run_wall(&config);
    };

    match command {
        Commands::Post {
            text,
            captcha_token,
        } => commands::post::run(&config, &text, captcha_token.as_deref()).await,

        Commands::Wall { limit } => commands::wall::run(&config, limit).await,

        Commands::Login { paste } => commands::auth::login(&config, paste).await,

        Commands::Logout => commands::auth::logout(&config),

        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
