use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notegrab_common::observability::{LogConfig, LogFormat, init_logging};
use notegrab_config::{NotegrabConfig, NotegrabConfigLoader};
use std::path::PathBuf;

mod commands;

/// Collect a Misskey user's notes and play with them.
#[derive(Parser)]
#[command(name = "notegrab")]
#[command(version)]
struct Cli {
    /// Settings file; defaults to ./notegrab.yaml and the user config dir
    #[arg(long, global = true, env = "NOTEGRAB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Download every local note of the configured user (default)
    Collect {
        /// Account to collect instead of the configured one
        #[arg(long)]
        username: Option<String>,

        /// Output file instead of the configured one
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Build a Markov model from collected notes
    Train {
        /// Notes file written by `collect`
        #[arg(long)]
        input: Option<PathBuf>,

        /// Where the model is written
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate one note from a trained model
    Simulate {
        #[arg(long)]
        model: Option<PathBuf>,

        /// Maximum `$[...]` nesting
        #[arg(long)]
        depth: Option<usize>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl Command {
    fn needs_api_key(&self) -> bool {
        matches!(self, Command::Collect { .. })
    }
}

fn load_config(path: Option<PathBuf>, require_api_key: bool) -> Result<NotegrabConfig> {
    let loader = match path {
        Some(p) => NotegrabConfigLoader::new().with_file(p),
        None => NotegrabConfigLoader::new().with_default_files(),
    };
    loader
        .require_api_key(require_api_key)
        .load()
        .context("loading notegrab configuration")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Collect {
        username: None,
        output: None,
    });

    // 1) Config (env wins over files)
    let cfg = load_config(cli.config, command.needs_api_key())?;

    // 2) Logging
    let format: LogFormat = cfg
        .log
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("log.format")?;
    let log_path = init_logging(LogConfig {
        log_dir: cfg.log.dir.clone(),
        format,
        ..LogConfig::default()
    })?;
    tracing::debug!(path = %log_path.display(), "logging initialised");

    match command {
        Command::Collect { username, output } => {
            commands::collect(&cfg, username.as_deref(), output).await
        }
        Command::Train { input, output } => commands::train(&cfg, input, output),
        Command::Simulate { model, depth, seed } => commands::simulate(&cfg, model, depth, seed),
    }
}
