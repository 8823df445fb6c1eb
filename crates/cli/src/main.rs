use clap::{Parser, Subcommand};

mod commands;

use commands::{CheckConfigArgs, RegimeArgs, ReplayArgs};

#[derive(Parser)]
#[command(name = "strangle-guard")]
#[command(about = "Portfolio risk guard for short-strangle option books", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the risk configuration, then print it
    CheckConfig(CheckConfigArgs),
    /// Show the regime multipliers for a VIX level
    Regime(RegimeArgs),
    /// Replay recorded market ticks through the engine against a paper executor
    Replay(ReplayArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::CheckConfig(args) => commands::run_check_config(&args)?,
        Commands::Regime(args) => commands::run_regime(&args)?,
        Commands::Replay(args) => commands::run_replay(args).await?,
    }

    Ok(())
}
