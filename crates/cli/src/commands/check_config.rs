//! Config validation command.

use anyhow::Result;
use clap::Args;

use super::ConfigSource;

#[derive(Args, Debug, Clone)]
pub struct CheckConfigArgs {
    #[command(flatten)]
    pub source: ConfigSource,
}

/// Loads the layered configuration and prints the effective values as JSON.
///
/// # Errors
/// Returns an error if loading or validation fails.
pub fn run_check_config(args: &CheckConfigArgs) -> Result<()> {
    let config = args.source.load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!(
        "\nConfiguration OK: capital {}, daily stop at {}",
        config.capital,
        -config.capital * config.thresholds.daily_max_loss_pct
    );
    Ok(())
}
