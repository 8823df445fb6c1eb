//! Regime lookup command.

use anyhow::Result;
use clap::Args;
use strangle_guard_risk::regime::regime_adjustments;

use super::ConfigSource;

#[derive(Args, Debug, Clone)]
pub struct RegimeArgs {
    /// India VIX level
    #[arg(long)]
    pub vix: f64,

    /// Implied volatility percentile (0-100)
    #[arg(long)]
    pub iv_percentile: Option<f64>,

    #[command(flatten)]
    pub source: ConfigSource,
}

/// Prints the regime label and strategy multipliers for the given VIX.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded.
pub fn run_regime(args: &RegimeArgs) -> Result<()> {
    let config = args.source.load()?;
    let adj = regime_adjustments(args.vix, args.iv_percentile, &config.regime);

    println!("VIX {:.2} -> regime {}", args.vix, adj.label);
    println!("  position_size   x{:.2}", adj.multipliers.position_size);
    println!("  strike_distance x{:.2}", adj.multipliers.strike_distance);
    println!("  stop_loss       x{:.2}", adj.multipliers.stop_loss);
    println!("  roll_trigger    x{:.2}", adj.multipliers.roll_trigger);
    if adj.low_iv_applied {
        println!("  (low IV percentile: size scaled by {:.2})", config.regime.low_iv_size_factor);
    }
    Ok(())
}
