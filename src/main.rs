//! Trellis CLI entry point

mod commands;
mod config;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commands::OutputFormat;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Review, publish, and undo pending workspace changes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Workspace server base URL
    #[arg(long)]
    server: Option<String>,

    /// Workspace id to review
    #[arg(short, long)]
    workspace: Option<String>,

    /// Bearer token for the workspace server
    #[arg(long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List pending changes and their publish/undo marks
    Diff {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Publish selected pending changes to the shared graph
    Publish {
        /// Select every eligible change
        #[arg(long)]
        all: bool,
        /// Record ids to select (repeatable)
        #[arg(long = "id", value_name = "ID")]
        ids: Vec<String>,
    },
    /// Discard selected pending changes
    Undo {
        /// Select every eligible change
        #[arg(long)]
        all: bool,
        /// Record ids to select (repeatable)
        #[arg(long = "id", value_name = "ID")]
        ids: Vec<String>,
    },
    /// Follow workspace pushes and reprint the pending summary
    Watch,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "trellis={log_level}"
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("trellis v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = config::Config::load(cli.server, cli.workspace, cli.token)?;
    match cli.command {
        Commands::Diff { format } => commands::diff(&config, format).await,
        Commands::Publish { all, ids } => commands::publish(&config, all, ids).await,
        Commands::Undo { all, ids } => commands::undo(&config, all, ids).await,
        Commands::Watch => commands::watch(&config).await,
        Commands::Version => Ok(()),
    }
}
