use crate::config::RiskConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/Risk.toml";
pub const ENV_PREFIX: &str = "STRANGLE_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the risk configuration from the default TOML file and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed, or
    /// if the merged configuration fails validation.
    pub fn load() -> Result<RiskConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads the risk configuration layered as defaults, `path`, then
    /// `STRANGLE_`-prefixed environment variables (`__` separates nesting).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or validation fails.
    pub fn load_from(path: impl AsRef<Path>) -> Result<RiskConfig> {
        let path = path.as_ref();
        Self::extract(Self::files(path).merge(Self::env()), &path.display().to_string())
    }

    /// Loads the risk configuration with a profile overlay such as `Risk.paper.toml`,
    /// merged over `config/Risk.toml` and under the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed, or
    /// if validation fails.
    pub fn load_with_profile(profile: &str) -> Result<RiskConfig> {
        Self::load_profile_from(DEFAULT_CONFIG_PATH, profile)
    }

    /// Like [`Self::load_with_profile`], with the profile file placed next
    /// to `path` (`<dir>/Risk.toml` -> `<dir>/Risk.<profile>.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed, or
    /// if validation fails.
    pub fn load_profile_from(path: impl AsRef<Path>, profile: &str) -> Result<RiskConfig> {
        let path = path.as_ref();
        let overlay = Self::profile_path(path, profile);
        let figment = Self::files(path).merge(Toml::file(&overlay)).merge(Self::env());
        Self::extract(figment, &format!("{} + {}", path.display(), overlay.display()))
    }

    fn profile_path(path: &Path, profile: &str) -> PathBuf {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("Risk");
        path.with_file_name(format!("{stem}.{profile}.toml"))
    }

    fn files(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(RiskConfig::default())).merge(Toml::file(path))
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    fn extract(figment: Figment, source: &str) -> Result<RiskConfig> {
        let config: RiskConfig = figment.extract()?;
        config.validate()?;
        tracing::info!(
            source,
            capital = %config.capital,
            daily_max_loss_pct = %config.thresholds.daily_max_loss_pct,
            cooldown_secs = config.thresholds.adjustment_cooldown_secs,
            "Risk configuration loaded"
        );
        Ok(config)
    }
}
