//! Action planning. Turns detector signals into sized orders.
//!
//! Nothing here places orders; plans go to the execution layer via
//! [`crate::executor::RiskExecutor`].

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};

use strangle_guard_core::{OptionPosition, OptionSide, RiskConfig};

use crate::delta_band::DeltaBreach;
use crate::types::{HedgePlan, ReduceOrder, ShockPlan, WingAction, WingPlan};
use crate::volatility::VolatilityShock;

/// Lots of the hedge option needed to move `net_delta` to `target_delta`.
///
/// `ceil(|net - target| / instrument_delta)`, at least 1 whenever any gap
/// remains, 0 when already on target.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn hedge_lots(net_delta: f64, target_delta: f64, instrument_delta: f64) -> u32 {
    let gap = (net_delta - target_delta).abs();
    let per_lot = instrument_delta.abs();
    if !gap.is_finite() || gap == 0.0 || !per_lot.is_finite() || per_lot == 0.0 {
        return 0;
    }
    ((gap / per_lot).ceil() as u32).max(1)
}

/// Size the hedge for a delta breach.
pub fn plan_hedge(breach: &DeltaBreach, hedge_delta_offset: f64) -> HedgePlan {
    let instrument_delta = match breach.hedge_side {
        OptionSide::Put => -hedge_delta_offset.abs(),
        OptionSide::Call => hedge_delta_offset.abs(),
    };
    let lots = hedge_lots(breach.net_delta, breach.target_delta, instrument_delta).max(1);

    info!(
        side = %breach.hedge_side,
        lots,
        net_delta = breach.net_delta,
        target_delta = breach.target_delta,
        instrument_delta,
        "Hedge planned"
    );

    HedgePlan {
        side: breach.hedge_side,
        lots,
        instrument_delta,
        net_delta: breach.net_delta,
        target_delta: breach.target_delta,
        reason: breach.reason.clone(),
    }
}

/// Protective strike beyond a short strike, snapped to the strike grid.
#[must_use]
pub fn wing_strike(short_strike: Decimal, side: OptionSide, width: Decimal, strike_step: Decimal) -> Decimal {
    let raw = match side {
        OptionSide::Call => short_strike + width,
        OptionSide::Put => short_strike - width,
    };
    if strike_step <= Decimal::ZERO {
        return raw;
    }
    (raw / strike_step).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * strike_step
}

/// Wing for `lots` of a short position, or a close if the wing costs more
/// than the per-lot cap. An unpriced wing also falls back to a close.
pub fn plan_wing(position: &OptionPosition, lots: u32, wing_premium: Option<Decimal>, config: &RiskConfig) -> WingPlan {
    let thresholds = &config.thresholds;
    let strike = wing_strike(
        position.strike,
        position.side,
        thresholds.wing_spread_width,
        config.strike_step,
    );
    let cap = thresholds.wing_max_cost_per_lot;
    let cost = wing_premium.map(|premium| premium * config.lot_size);

    let (action, reason) = match cost {
        Some(cost) if cost <= cap => (
            WingAction::AddWing,
            format!("Add {} {strike} wing for {lots} lot(s), cost {cost}/lot", position.side),
        ),
        Some(cost) => (
            WingAction::ClosePosition,
            format!("Wing cost {cost}/lot exceeds cap {cap}/lot, closing {lots} lot(s)"),
        ),
        None => (
            WingAction::ClosePosition,
            format!("No premium quote for {strike} wing, closing {lots} lot(s)"),
        ),
    };
    if action == WingAction::ClosePosition {
        warn!(id = position.id, symbol = position.symbol, %strike, cost = ?cost, %cap, "Wing downgraded to close");
    }

    WingPlan {
        position_id: position.id.clone(),
        short_side: position.side,
        short_strike: position.strike,
        wing_strike: strike,
        lots,
        estimated_cost_per_lot: cost,
        cost_cap_per_lot: cap,
        action,
        reason,
    }
}

/// Lots to buy back from a short of `short_lots`: `ceil(lots * fraction)`,
/// clamped to `[1, lots]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn reduction_lots(short_lots: u32, fraction: f64) -> u32 {
    if short_lots == 0 {
        return 0;
    }
    let raw = (f64::from(short_lots) * fraction).ceil();
    if raw.is_finite() {
        (raw as u32).clamp(1, short_lots)
    } else {
        short_lots
    }
}

/// Reduce every short position and protect what remains.
pub fn plan_shock_response(
    shock: VolatilityShock,
    positions: &[OptionPosition],
    wing_premiums: &HashMap<String, Decimal>,
    config: &RiskConfig,
) -> ShockPlan {
    let fraction = config.thresholds.short_exposure_reduction_pct;
    let mut reductions = Vec::new();
    let mut wings = Vec::new();

    for pos in positions.iter().filter(|p| p.is_short()) {
        let short_lots = pos.lots.unsigned_abs();
        let reduce = reduction_lots(short_lots, fraction);
        reductions.push(ReduceOrder {
            position_id: pos.id.clone(),
            symbol: pos.symbol.clone(),
            side: pos.side,
            strike: pos.strike,
            lots: reduce,
        });

        let remaining = short_lots - reduce;
        if remaining > 0 {
            wings.push(plan_wing(pos, remaining, wing_premiums.get(&pos.id).copied(), config));
        }
    }

    info!(
        reductions = reductions.len(),
        wings = wings.len(),
        reason = shock.reason,
        "Shock response planned"
    );

    ShockPlan {
        shock,
        reductions,
        wings,
        pause_entries: true,
    }
}
