//! Volatility regime → strategy parameter multipliers.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use strangle_guard_core::{RegimeConfig, RegimeLabel, RegimeMultipliers, RegimeTier};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeAdjustment {
    pub label: RegimeLabel,
    pub multipliers: RegimeMultipliers,
    /// Whether the low-IV-percentile size cut was applied.
    pub low_iv_applied: bool,
}

fn select_tier(vix: f64, config: &RegimeConfig) -> Option<&RegimeTier> {
    if !vix.is_finite() {
        warn!(vix, "Non-finite volatility, using the most defensive regime");
        return config.tiers.last();
    }
    config
        .tiers
        .iter()
        .find(|tier| vix < tier.vix_below)
        .or_else(|| config.tiers.last())
}

/// Multipliers for the entry component to apply before sizing a new trade.
///
/// Tiers are scanned in ascending order and the first whose boundary `vix`
/// is below wins; above every boundary the last tier applies.
pub fn regime_adjustments(vix: f64, iv_percentile: Option<f64>, config: &RegimeConfig) -> RegimeAdjustment {
    let (label, mut multipliers) = select_tier(vix, config).map_or(
        (RegimeLabel::Normal, RegimeMultipliers::new(1.0, 1.0, 1.0, 1.0)),
        |tier| (tier.label, tier.multipliers),
    );

    let low_iv_applied = iv_percentile
        .filter(|p| p.is_finite())
        .is_some_and(|p| p < config.low_iv_percentile);
    if low_iv_applied {
        multipliers.position_size *= config.low_iv_size_factor;
    }

    debug!(
        vix,
        iv_percentile = ?iv_percentile,
        %label,
        size = multipliers.position_size,
        strike = multipliers.strike_distance,
        stop = multipliers.stop_loss,
        roll = multipliers.roll_trigger,
        "Regime adjustments"
    );

    RegimeAdjustment {
        label,
        multipliers,
        low_iv_applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn low_volatility_is_neutral() {
        let adj = regime_adjustments(12.0, Some(50.0), &RegimeConfig::default());
        assert_eq!(adj.label, RegimeLabel::Normal);
        assert_eq!(adj.multipliers.position_size, 1.0);
        assert_eq!(adj.multipliers.strike_distance, 1.0);
    }

    #[test]
    fn high_volatility_is_defensive() {
        let adj = regime_adjustments(25.0, Some(80.0), &RegimeConfig::default());
        assert_eq!(adj.label, RegimeLabel::High);
        assert_eq!(adj.multipliers.position_size, 0.5);
        assert!(adj.multipliers.strike_distance > 1.0);
        assert!(adj.multipliers.stop_loss < 1.0);
    }

    #[test]
    fn crisis_volatility_catches_everything_above() {
        let adj = regime_adjustments(35.0, Some(95.0), &RegimeConfig::default());
        assert_eq!(adj.label, RegimeLabel::Crisis);
        assert_eq!(adj.multipliers.position_size, 0.25);
        assert!(adj.multipliers.roll_trigger < 1.0);

        let beyond = regime_adjustments(5000.0, None, &RegimeConfig::default());
        assert_eq!(beyond.label, RegimeLabel::Crisis);
    }

    #[test]
    fn low_iv_percentile_cuts_size() {
        let adj = regime_adjustments(12.0, Some(10.0), &RegimeConfig::default());
        assert!(adj.low_iv_applied);
        assert_eq!(adj.multipliers.position_size, 0.75);

        let unknown = regime_adjustments(12.0, None, &RegimeConfig::default());
        assert!(!unknown.low_iv_applied);
    }

    #[test]
    fn non_finite_volatility_is_treated_as_crisis() {
        let adj = regime_adjustments(f64::NAN, None, &RegimeConfig::default());
        assert_eq!(adj.label, RegimeLabel::Crisis);
    }

    proptest! {
        #[test]
        fn size_never_grows_and_strike_never_shrinks_with_volatility(
            a in 0.0f64..120.0,
            b in 0.0f64..120.0,
            iv in proptest::option::of(0.0f64..100.0),
        ) {
            let (v1, v2) = if a <= b { (a, b) } else { (b, a) };
            let config = RegimeConfig::default();
            let low = regime_adjustments(v1, iv, &config);
            let high = regime_adjustments(v2, iv, &config);
            prop_assert!(low.multipliers.position_size >= high.multipliers.position_size);
            prop_assert!(low.multipliers.strike_distance <= high.multipliers.strike_distance);
        }
    }
}
