//! Workbench CLI
//!
//! Manages persisted terminal session tabs, runs a headless multi-session
//! shell and renders directory trees.

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;

use workbench_cli::session_cmd::{self, SessionAction};
use workbench_cli::shell;
use workbench_cli::shell_transport::ShellTransport;
use workbench_cli::tree_cmd::{self, TreeArgs};
use workbench_core::config::{Config, load_config};
use workbench_core::tracing_init::{default_filter, init_tracing};
use workbench_core::{JsonFileStore, MultiplexerConfig, SessionLink, SessionMultiplexer};

#[derive(Parser, Debug)]
#[command(name = "workbench")]
#[command(version, about = "Terminal sessions and file tree state", long_about = None)]
struct Cli {
    /// Project directory holding `.workbench/settings.json` (defaults to cwd)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// JSON file backing the session store
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "WORKBENCH_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage persisted sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Interactive line shell over the persisted sessions
    Shell {
        /// Working directory for commands (defaults to cwd)
        #[arg(short = 'd', long)]
        working_dir: Option<PathBuf>,
    },
    /// Print a directory as a collapsible tree
    Tree(TreeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let project_dir = cli
        .config_dir
        .clone()
        .or_else(|| std::env::current_dir().ok());
    let mut config = load_config(project_dir.as_deref())?;
    if let Some(path) = cli.store {
        config.store.path = Some(path);
    }

    init_tracing(&default_filter(&config.log_level), cli.log_json);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting workbench CLI");

    let mut out = io::stdout();
    match cli.command {
        Commands::Sessions { action } => {
            let mut mux = open_sessions(&config)?;
            session_cmd::run(&mut mux, action, &mut out)?;
        }
        Commands::Shell { working_dir } => {
            let working_dir = match working_dir {
                Some(dir) => dir,
                None => std::env::current_dir().context("Failed to resolve working directory")?,
            };
            let mut mux = open_sessions(&config)?;
            let mut link = SessionLink::new(ShellTransport::new(working_dir));
            let stdin = BufReader::new(tokio::io::stdin());
            shell::run(&mut mux, &mut link, stdin, &mut out).await?;
        }
        Commands::Tree(args) => tree_cmd::run(&args, &mut out)?,
    }
    Ok(())
}

fn open_sessions(config: &Config) -> anyhow::Result<SessionMultiplexer<JsonFileStore>> {
    let path = config
        .store_path()
        .context("Cannot determine store path; pass --store")?;
    let store = JsonFileStore::open(&path)
        .with_context(|| format!("Failed to open store {}", path.display()))?;
    let mux = SessionMultiplexer::restore(store, MultiplexerConfig::from(&config.sessions))?;
    Ok(mux)
}
