//! Delta-band breach detection with hysteresis.
//!
//! The trigger band narrows as volatility rises. Once breached, the hedge
//! target is the release band (0.6 x trigger) on the same side of zero.

use serde::{Deserialize, Serialize};
use tracing::warn;

use strangle_guard_core::{OptionSide, RiskThresholds, HYSTERESIS_RATIO};

use crate::types::PortfolioSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaBands {
    /// Trigger: hedge when |net delta| exceeds this.
    pub high: f64,
    /// Release: hedge back down to this.
    pub low: f64,
}

/// Trigger band for a volatility level: first tier whose boundary the level
/// is strictly below, else the last tier. Falls back to the base band when no
/// tiers are configured.
#[must_use]
pub fn band_for_volatility(vix: f64, thresholds: &RiskThresholds) -> f64 {
    thresholds
        .delta_band_tiers
        .iter()
        .find(|tier| vix < tier.vix_below)
        .or_else(|| thresholds.delta_band_tiers.last())
        .map_or(thresholds.delta_band_base, |tier| tier.band)
}

#[must_use]
pub fn delta_bands(vix: f64, thresholds: &RiskThresholds) -> DeltaBands {
    let high = band_for_volatility(vix, thresholds);
    DeltaBands {
        high,
        low: high * HYSTERESIS_RATIO,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaBreach {
    pub net_delta: f64,
    pub vix: f64,
    pub bands: DeltaBands,
    /// Long delta is hedged with puts, short delta with calls.
    pub hedge_side: OptionSide,
    /// `sign(net_delta) * low band`.
    pub target_delta: f64,
    pub reason: String,
}

/// Check net delta against the volatility-scaled band.
///
/// Cooldown is not consulted here; the engine decides whether a breach may act.
pub fn evaluate_delta_band(snapshot: &PortfolioSnapshot, vix: f64, thresholds: &RiskThresholds) -> Option<DeltaBreach> {
    let net_delta = snapshot.net_delta;
    if !net_delta.is_finite() || !vix.is_finite() {
        warn!(net_delta, vix, "Skipping delta band check on non-finite input");
        return None;
    }

    let bands = delta_bands(vix, thresholds);
    if net_delta.abs() <= bands.high {
        return None;
    }

    let (hedge_side, target_delta) = if net_delta > 0.0 {
        (OptionSide::Put, bands.low)
    } else {
        (OptionSide::Call, -bands.low)
    };
    let reason = format!(
        "Net delta {net_delta:.1} exceeds band ±{:.1} (VIX={vix:.1}), target={target_delta:.1}",
        bands.high
    );
    warn!(net_delta, band = bands.high, target_delta, %hedge_side, "Delta band breached");

    Some(DeltaBreach {
        net_delta,
        vix,
        bands,
        hedge_side,
        target_delta,
        reason,
    })
}
