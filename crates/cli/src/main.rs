//! Sage CLI
//!
//! Main entry point for the `sage` command-line tool.
//! Answers questions about a directory of numbered teachings.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, SearchCommand, StatsCommand, VerifyCommand};
use sage_core::config::AppConfig;
use sage_core::logging::{self, LogOptions};
use sage_core::{AppResult, Settings};
use std::path::PathBuf;

/// Sage - question answering over your teachings
#[derive(Parser, Debug)]
#[command(name = "sage")]
#[command(about = "Question answering over a directory of teachings", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "SAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the teaching markdown files
    #[arg(long, global = true, env = "SAGE_CORPUS")]
    corpus: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single question
    Ask(AskCommand),

    /// Show the passages closest to a question, without generating
    Search(SearchCommand),

    /// Answer questions read line by line from stdin
    Chat(ChatCommand),

    /// Check configuration, credentials, and the teachings directory
    Verify(VerifyCommand),

    /// Build the index and show corpus statistics
    Stats(StatsCommand),
}

fn log_options(config: &AppConfig, settings: Option<&Settings>) -> LogOptions {
    let logging = settings.map(|s| &s.logging);
    LogOptions {
        level: config
            .log_level
            .clone()
            .or_else(|| logging.and_then(|l| l.level.clone())),
        format: logging.map(|l| l.format).unwrap_or_default(),
        no_color: config.no_color || logging.and_then(|l| l.color) == Some(false),
    }
}

/// Route to the command handler.
async fn run(
    command: Commands,
    config: &AppConfig,
    settings: AppResult<Settings>,
) -> anyhow::Result<()> {
    if let Commands::Verify(cmd) = &command {
        return cmd.execute(config, settings.as_ref());
    }

    let settings = settings
        .with_context(|| format!("Failed to load configuration from {:?}", config.config_file))?;

    match command {
        Commands::Ask(cmd) => cmd.execute(config, &settings).await,
        Commands::Search(cmd) => cmd.execute(config, &settings).await,
        Commands::Chat(cmd) => cmd.execute(config, &settings).await,
        Commands::Stats(cmd) => cmd.execute(config, &settings).await,
        Commands::Verify(cmd) => cmd.execute(config, Ok(&settings)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load().with_overrides(
        cli.config,
        cli.corpus,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Settings errors are reported by the command, after logging is up
    let settings = config.load_settings();

    logging::init_logging(&log_options(&config, settings.as_ref().ok()))
        .context("Failed to initialize logging")?;

    tracing::info!("Sage CLI starting");
    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("Corpus directory: {:?}", config.corpus_dir);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Search(_) => "search",
        Commands::Chat(_) => "chat",
        Commands::Verify(_) => "verify",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = run(cli.command, &config, settings).await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
