//! Types for portfolio risk evaluation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use strangle_guard_core::OptionSide;

use crate::daily_stop::DailyLossBreach;
use crate::delta_band::DeltaBreach;
use crate::volatility::VolatilityShock;

/// Aggregated Greeks and P&L across every open position, for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub net_delta: f64,
    pub net_gamma: f64,
    pub net_theta: f64,
    pub net_vega: f64,
    /// Absolute vega carried by short positions.
    pub short_vega_exposure: f64,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    daily_pnl: Decimal,
    pub active_positions: usize,
    /// Positions left out entirely for lack of a usable mark.
    pub skipped_positions: usize,
    /// Positions whose P&L counts but whose greeks were missing or non-finite.
    pub greeks_unavailable: usize,
    pub timestamp: DateTime<Utc>,
}

impl PortfolioSnapshot {
    /// A flat portfolio: all metrics zero.
    #[must_use]
    pub fn empty(realized_pnl: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            net_delta: 0.0,
            net_gamma: 0.0,
            net_theta: 0.0,
            net_vega: 0.0,
            short_vega_exposure: 0.0,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl,
            daily_pnl: realized_pnl,
            active_positions: 0,
            skipped_positions: 0,
            greeks_unavailable: 0,
            timestamp,
        }
    }

    pub(crate) fn add_unrealized(&mut self, pnl: Decimal) {
        self.unrealized_pnl += pnl;
        self.daily_pnl = self.realized_pnl + self.unrealized_pnl;
    }

    /// Realized plus unrealized P&L for the session.
    #[must_use]
    pub const fn daily_pnl(&self) -> Decimal {
        self.daily_pnl
    }
}

/// Buy-back order for part of a short position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReduceOrder {
    pub position_id: String,
    pub symbol: String,
    pub side: OptionSide,
    pub strike: Decimal,
    pub lots: u32,
}

/// What to do about an unprotected short strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WingAction {
    /// Buy the protective option at `wing_strike`.
    AddWing,
    /// Wing is too expensive (or unpriced): buy back the short instead.
    ClosePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WingPlan {
    pub position_id: String,
    pub short_side: OptionSide,
    pub short_strike: Decimal,
    pub wing_strike: Decimal,
    pub lots: u32,
    /// `None` when no premium quote was available.
    pub estimated_cost_per_lot: Option<Decimal>,
    pub cost_cap_per_lot: Decimal,
    pub action: WingAction,
    pub reason: String,
}

/// Option purchase that pulls net delta back to the release band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgePlan {
    pub side: OptionSide,
    pub lots: u32,
    /// Signed per-lot delta of the hedge option (negative for puts).
    pub instrument_delta: f64,
    pub net_delta: f64,
    pub target_delta: f64,
    pub reason: String,
}

/// Qualitative responses to a volatility shock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShockAction {
    ReduceShortExposure,
    AddProtectiveWings,
    PauseEntries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockPlan {
    pub shock: VolatilityShock,
    pub reductions: Vec<ReduceOrder>,
    pub wings: Vec<WingPlan>,
    pub pause_entries: bool,
}

/// A positive detector signal held back by the cooldown window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SuppressedSignal {
    VolatilityShock(VolatilityShock),
    DeltaBreach(DeltaBreach),
}

/// Which detector fired on a tick, in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RiskDecision {
    /// Kill-switch already latched this session; nothing else was evaluated.
    Halted,
    DailyStop(DailyLossBreach),
    VolatilityShock(ShockPlan),
    DeltaHedge(HedgePlan),
    Suppressed {
        signal: SuppressedSignal,
        cooldown_until: DateTime<Utc>,
    },
    Clear,
}

impl RiskDecision {
    #[must_use]
    pub const fn requires_action(&self) -> bool {
        matches!(
            self,
            Self::DailyStop(_) | Self::VolatilityShock(_) | Self::DeltaHedge(_)
        )
    }
}

/// Result of one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub snapshot: PortfolioSnapshot,
    pub decision: RiskDecision,
    pub evaluated_at: DateTime<Utc>,
}

/// What `apply` actually committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppliedAction {
    Nothing,
    KillSwitch,
    ShockResponse,
    Hedge,
}

/// Corrective action kinds, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    CloseAll,
    ShockResponse,
    DeltaHedge,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CloseAll => write!(f, "close_all"),
            Self::ShockResponse => write!(f, "shock_response"),
            Self::DeltaHedge => write!(f, "delta_hedge"),
        }
    }
}
