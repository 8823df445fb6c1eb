use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed ratio between the hedge release band and the trigger band.
pub const HYSTERESIS_RATIO: f64 = 0.6;

/// Reasons a risk configuration is rejected at construction time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Capital must be positive, got {0}")]
    NonPositiveCapital(Decimal),

    #[error("Threshold `{name}` is invalid: {value}")]
    InvalidThreshold { name: &'static str, value: String },

    #[error("Delta band tiers are malformed: {0}")]
    BandTiers(String),

    #[error("Regime tiers are malformed: {0}")]
    RegimeTiers(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Trading capital the daily loss limit is measured against.
    pub capital: Decimal,
    /// Contract multiplier applied to per-unit premium moves.
    pub lot_size: Decimal,
    /// Strike grid used to round wing strikes.
    pub strike_step: Decimal,
    pub thresholds: RiskThresholds,
    pub regime: RegimeConfig,
}

/// Session-immutable thresholds driving the three detectors and the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Daily loss limit as a fraction of capital (0.015 = 1.5%).
    pub daily_max_loss_pct: Decimal,
    /// Band used when no volatility tier is configured.
    pub delta_band_base: f64,
    /// Volatility-scaled delta bands, ascending by `vix_below`.
    pub delta_band_tiers: Vec<DeltaBandTier>,
    /// Absolute volatility-index move that counts as a shock.
    pub vix_shock_abs: f64,
    /// Relative move (percent) that counts as a shock, tick-over-tick or from open.
    pub vix_shock_roc_pct: f64,
    /// Fraction of each short position to buy back on a shock.
    pub short_exposure_reduction_pct: f64,
    pub adjustment_cooldown_secs: u64,
    /// Per-lot delta of the option used to hedge.
    pub hedge_delta_offset: f64,
    pub wing_spread_width: Decimal,
    /// Maximum acceptable wing premium per lot before falling back to a close.
    pub wing_max_cost_per_lot: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaBandTier {
    pub vix_below: f64,
    pub band: f64,
}

impl DeltaBandTier {
    #[must_use]
    pub const fn new(vix_below: f64, band: f64) -> Self {
        Self { vix_below, band }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Ascending by `vix_below`; the last tier also catches everything above it.
    pub tiers: Vec<RegimeTier>,
    /// IV percentile under which entries are sized down further.
    pub low_iv_percentile: f64,
    pub low_iv_size_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegimeLabel {
    Normal,
    Elevated,
    High,
    Crisis,
}

impl std::fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Elevated => write!(f, "elevated"),
            Self::High => write!(f, "high"),
            Self::Crisis => write!(f, "crisis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeTier {
    pub vix_below: f64,
    pub label: RegimeLabel,
    pub multipliers: RegimeMultipliers,
}

/// Scaling applied to downstream strategy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeMultipliers {
    pub position_size: f64,
    pub strike_distance: f64,
    /// Below 1.0 means tighter stops.
    pub stop_loss: f64,
    /// Below 1.0 means roll earlier.
    pub roll_trigger: f64,
}

impl RegimeMultipliers {
    #[must_use]
    pub const fn new(position_size: f64, strike_distance: f64, stop_loss: f64, roll_trigger: f64) -> Self {
        Self {
            position_size,
            strike_distance,
            stop_loss,
            roll_trigger,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            capital: dec!(1000000),
            lot_size: dec!(75),
            strike_step: dec!(50),
            thresholds: RiskThresholds::default(),
            regime: RegimeConfig::default(),
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            daily_max_loss_pct: dec!(0.015),
            delta_band_base: 15.0,
            delta_band_tiers: vec![
                DeltaBandTier::new(15.0, 15.0),
                DeltaBandTier::new(20.0, 12.0),
                DeltaBandTier::new(30.0, 10.0),
                DeltaBandTier::new(999.0, 8.0),
            ],
            vix_shock_abs: 4.0,
            vix_shock_roc_pct: 15.0,
            short_exposure_reduction_pct: 0.4,
            adjustment_cooldown_secs: 900,
            hedge_delta_offset: 35.0,
            wing_spread_width: dec!(200),
            wing_max_cost_per_lot: dec!(1500),
        }
    }
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                RegimeTier {
                    vix_below: 15.0,
                    label: RegimeLabel::Normal,
                    multipliers: RegimeMultipliers::new(1.0, 1.0, 1.0, 1.0),
                },
                RegimeTier {
                    vix_below: 20.0,
                    label: RegimeLabel::Elevated,
                    multipliers: RegimeMultipliers::new(0.75, 1.1, 0.9, 1.0),
                },
                RegimeTier {
                    vix_below: 30.0,
                    label: RegimeLabel::High,
                    multipliers: RegimeMultipliers::new(0.5, 1.2, 0.8, 0.85),
                },
                RegimeTier {
                    vix_below: 999.0,
                    label: RegimeLabel::Crisis,
                    multipliers: RegimeMultipliers::new(0.25, 1.4, 0.7, 0.7),
                },
            ],
            low_iv_percentile: 20.0,
            low_iv_size_factor: 0.75,
        }
    }
}

fn positive_f64(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold {
            name,
            value: value.to_string(),
        })
    }
}

fn positive_decimal(name: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold {
            name,
            value: value.to_string(),
        })
    }
}

impl RiskConfig {
    /// Checks every threshold and tier table.
    ///
    /// # Errors
    ///
    /// Returns the first problem found; a session must not start with it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capital <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveCapital(self.capital));
        }
        positive_decimal("lot_size", self.lot_size)?;
        positive_decimal("strike_step", self.strike_step)?;
        self.thresholds.validate()?;
        self.regime.validate()
    }
}

impl RiskThresholds {
    /// # Errors
    ///
    /// Returns an error for non-positive thresholds or malformed band tiers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pct = self.daily_max_loss_pct;
        if pct <= Decimal::ZERO || pct >= Decimal::ONE {
            return Err(ConfigError::InvalidThreshold {
                name: "daily_max_loss_pct",
                value: pct.to_string(),
            });
        }
        positive_f64("delta_band_base", self.delta_band_base)?;
        positive_f64("vix_shock_abs", self.vix_shock_abs)?;
        positive_f64("vix_shock_roc_pct", self.vix_shock_roc_pct)?;
        positive_f64("hedge_delta_offset", self.hedge_delta_offset)?;
        positive_decimal("wing_spread_width", self.wing_spread_width)?;
        if self.wing_max_cost_per_lot < Decimal::ZERO {
            return Err(ConfigError::InvalidThreshold {
                name: "wing_max_cost_per_lot",
                value: self.wing_max_cost_per_lot.to_string(),
            });
        }
        let reduction = self.short_exposure_reduction_pct;
        if !(reduction.is_finite() && reduction > 0.0 && reduction <= 1.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "short_exposure_reduction_pct",
                value: reduction.to_string(),
            });
        }
        if self.adjustment_cooldown_secs == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "adjustment_cooldown_secs",
                value: "0".to_string(),
            });
        }

        for tier in &self.delta_band_tiers {
            if !tier.vix_below.is_finite() || !(tier.band.is_finite() && tier.band > 0.0) {
                return Err(ConfigError::BandTiers(format!(
                    "tier {{ vix_below: {}, band: {} }} must be finite with a positive band",
                    tier.vix_below, tier.band
                )));
            }
        }
        for pair in self.delta_band_tiers.windows(2) {
            if pair[1].vix_below <= pair[0].vix_below {
                return Err(ConfigError::BandTiers(format!(
                    "boundaries must strictly ascend ({} then {})",
                    pair[0].vix_below, pair[1].vix_below
                )));
            }
            if pair[1].band > pair[0].band {
                return Err(ConfigError::BandTiers(format!(
                    "band widens from {} to {} as volatility rises",
                    pair[0].band, pair[1].band
                )));
            }
        }
        Ok(())
    }
}

impl RegimeConfig {
    /// # Errors
    ///
    /// Returns an error if the tiers are empty, unordered, or would make the
    /// multipliers non-monotonic in volatility.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiers.is_empty() {
            return Err(ConfigError::RegimeTiers("at least one tier is required".to_string()));
        }
        for tier in &self.tiers {
            let m = tier.multipliers;
            let all = [m.position_size, m.strike_distance, m.stop_loss, m.roll_trigger];
            if !tier.vix_below.is_finite() || all.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
                return Err(ConfigError::RegimeTiers(format!(
                    "tier below {} has a non-positive or non-finite value",
                    tier.vix_below
                )));
            }
        }
        for pair in self.tiers.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if hi.vix_below <= lo.vix_below {
                return Err(ConfigError::RegimeTiers(format!(
                    "boundaries must strictly ascend ({} then {})",
                    lo.vix_below, hi.vix_below
                )));
            }
            if hi.multipliers.position_size > lo.multipliers.position_size {
                return Err(ConfigError::RegimeTiers(format!(
                    "position size grows from {} to {} as volatility rises",
                    lo.multipliers.position_size, hi.multipliers.position_size
                )));
            }
            if hi.multipliers.strike_distance < lo.multipliers.strike_distance {
                return Err(ConfigError::RegimeTiers(format!(
                    "strike distance shrinks from {} to {} as volatility rises",
                    lo.multipliers.strike_distance, hi.multipliers.strike_distance
                )));
            }
        }
        let factor = self.low_iv_size_factor;
        if !(factor.is_finite() && factor > 0.0 && factor <= 1.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "low_iv_size_factor",
                value: factor.to_string(),
            });
        }
        if !self.low_iv_percentile.is_finite() {
            return Err(ConfigError::InvalidThreshold {
                name: "low_iv_percentile",
                value: self.low_iv_percentile.to_string(),
            });
        }
        Ok(())
    }
}
