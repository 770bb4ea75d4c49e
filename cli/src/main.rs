mod report;
mod tui;

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use taskchain_core::{devnet, AppConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskchain")]
#[command(about = "Manage tasks stored in an on-chain TaskManager contract", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.taskchain/config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file (the TUI logs nothing otherwise)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Open the Terminal User Interface
    Tui,
    /// Print the contract's JSON ABI
    Abi,
    /// List the development wallet's accounts
    Accounts,
}

fn init_tracing(verbose: u8, log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        // stderr would scribble over the alternate screen.
        None if interactive => return Ok(()),
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Tui));
    init_tracing(cli.verbose, cli.log_file.as_deref(), interactive)?;

    let config = AppConfig::load(cli.config.as_deref())?;
    let descriptor = config.descriptor()?;
    info!(
        network = %config.network.name,
        contract = %descriptor.address,
        "starting taskchain"
    );

    match cli.command {
        Some(Commands::Abi) => {
            report::show_abi(&descriptor)?;
        }
        Some(Commands::Accounts) => {
            let wallet = devnet::launch(&config)?;
            report::show_accounts(&config, &wallet);
        }
        Some(Commands::Tui) | None => {
            tui::run(&config, descriptor)?;
        }
    }
    Ok(())
}
