//! lbtunnel CLI - Route host traffic into a local Kubernetes cluster
//!
//! A command-line tool for running the cluster tunnel, cleaning up tunnels
//! left behind by dead processes, and managing tunnel settings.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "lbtunnel")]
#[command(author, version, about = "Route host traffic into a local Kubernetes cluster")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tunnel until interrupted
    Run {
        /// Profile (machine) to tunnel into
        #[arg(short, long, default_value = "minikube", env = "MINIKUBE_PROFILE")]
        profile: String,

        /// Seconds between reconcile ticks (overrides the config file)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Remove tunnels whose process is gone
    Cleanup,

    /// List registered tunnels
    #[command(alias = "ls")]
    List,

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set the tick interval in seconds
    SetInterval { seconds: u64 },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    // Status output owns stdout
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { profile, interval } => {
            commands::run::run(&profile, interval, cli.json).await?;
        }
        Commands::Cleanup => {
            commands::cleanup::run(cli.json).await?;
        }
        Commands::List => {
            commands::list::run(cli.json).await?;
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config::show(cli.json).await?,
            ConfigAction::SetInterval { seconds } => {
                commands::config::set_interval(seconds).await?
            }
        },
    }

    Ok(())
}
