pub mod clock;
pub mod config;
pub mod config_loader;
pub mod position;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ConfigError, DeltaBandTier, RegimeConfig, RegimeLabel, RegimeMultipliers, RegimeTier,
    RiskConfig, RiskThresholds, HYSTERESIS_RATIO,
};
pub use config_loader::ConfigLoader;
pub use position::{Greeks, MarketTick, OptionPosition, OptionSide};
pub use traits::TickSource;
