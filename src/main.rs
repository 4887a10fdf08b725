//! Join Cooldown - Main Entry Point
//!
//! Records manual join outcomes per account and recommends how long to
//! wait before the next one.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use join_cooldown::commands::{CommandHandler, CooldownCommand};
use join_cooldown::config::{AppSettings, EstimatorSettings};
use join_cooldown::cooldown::{CooldownEstimator, CooldownTracker};
use join_cooldown::store::{CooldownStore, JsonFileStore};

/// Per-account cooldown estimator for manual Telegram actions.
#[derive(Parser, Debug)]
#[command(name = "join_cooldown")]
#[command(about = "Learn safe delays between manual joins from reported flood waits")]
#[command(version)]
struct Args {
    /// Path to the JSON file holding learned cooldown state.
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report that an action succeeded after waiting DELAY seconds.
    ///
    /// There is no separate failure report: a rejected action is reported
    /// with `flood` and the wait Telegram returned.
    #[command(alias = "ok")]
    Success { account: String, delay: f64 },

    /// Report a flood wait of SECONDS returned by Telegram.
    Flood { account: String, seconds: f64 },

    /// Show the recommended delay for an account.
    Recommend { account: String },

    /// List all known accounts, safest first.
    #[command(alias = "ls")]
    List,

    /// Write a join-assist file for an account.
    Assist {
        account: String,

        /// File with one pending link per line.
        #[arg(long, default_value = "links.txt")]
        links: PathBuf,

        /// Directory to write the assist file to.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

impl From<Command> for CooldownCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Success { account, delay } => Self::Success { account, delay },
            Command::Flood { account, seconds } => Self::FloodWait { account, seconds },
            Command::Recommend { account } => Self::Recommend { account },
            Command::List => Self::List,
            Command::Assist {
                account,
                links,
                out_dir,
            } => Self::Assist {
                account,
                links_file: links,
                out_dir,
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("✗ {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let app_settings = AppSettings::from_env_with_defaults();
    let estimator = CooldownEstimator::new(EstimatorSettings::from_env_with_defaults())
        .context("Invalid cooldown estimator settings")?;

    let state_path = args.state.unwrap_or(app_settings.state_path);
    let store = JsonFileStore::new(state_path);
    let states = store
        .load()
        .with_context(|| format!("Failed to load cooldown state from {}", store.path().display()))?;
    debug!("Tracking {} accounts", states.len());

    let tracker = Arc::new(CooldownTracker::from_states(estimator, states));
    let handler = CommandHandler::new(tracker, Arc::new(store), app_settings.assist_dir);

    let result = handler.execute(args.command.into()).await;
    if result.success {
        println!("{}", result.message);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("✗ {}", result.message);
        Ok(ExitCode::FAILURE)
    }
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
