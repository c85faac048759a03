mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Scout -- execution broker for agent-callable security tools.
#[derive(Parser, Debug)]
#[command(name = "scout", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a registered tool and print the result envelope as JSON
    Run {
        /// Tool name as registered in the target table
        tool: String,

        /// Arguments passed through to the tool unchanged
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        /// Wall-clock timeout in seconds, overriding the tool default
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Workspace directory passed through to the execution environment
        #[arg(long)]
        workspace: Option<PathBuf>,
    },

    /// List the registered tools and their execution targets
    List,

    /// Diagnose the execution environment
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            tool,
            args,
            timeout_secs,
            workspace,
        } => commands::run::run(tool, args, timeout_secs, workspace).await,
        Commands::List => commands::list::run(),
        Commands::Doctor => commands::doctor::run().await,
    }
}
