//! CLI commands for the risk guard.

pub mod check_config;
pub mod regime;
pub mod replay;

pub use check_config::{run_check_config, CheckConfigArgs};
pub use regime::{run_regime, RegimeArgs};
pub use replay::{run_replay, ReplayArgs};

use anyhow::Result;
use clap::Args;
use strangle_guard_core::{ConfigLoader, RiskConfig};

/// Where to read the risk configuration from.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigSource {
    /// Config file path (defaults to config/Risk.toml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Profile overlay, e.g. "paper" reads Risk.paper.toml next to the config file
    #[arg(long, env = "STRANGLE_PROFILE")]
    pub profile: Option<String>,
}

impl ConfigSource {
    /// # Errors
    /// Returns an error if the files cannot be parsed or the result fails validation.
    pub fn load(&self) -> Result<RiskConfig> {
        match (&self.config, &self.profile) {
            (Some(path), Some(profile)) => ConfigLoader::load_profile_from(path, profile),
            (Some(path), None) => ConfigLoader::load_from(path),
            (None, Some(profile)) => ConfigLoader::load_with_profile(profile),
            (None, None) => ConfigLoader::load(),
        }
    }
}
