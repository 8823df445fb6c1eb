//! Volatility-shock detection.
//!
//! A shock is any of: an absolute index move of at least `vix_shock_abs`
//! since the previous tick, a relative move of at least `vix_shock_roc_pct`
//! since the previous tick, or the same relative move since session open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use strangle_guard_core::RiskThresholds;

use crate::types::ShockAction;

/// Volatility index levels tracked across ticks of one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolatilityState {
    previous: Option<f64>,
    session_open: Option<f64>,
    current: Option<f64>,
    latest_valid: Option<f64>,
    observed_at: Option<DateTime<Utc>>,
}

impl VolatilityState {
    /// State with explicit levels, as if `previous` and then `current` had been observed.
    #[must_use]
    pub const fn with_levels(previous: Option<f64>, session_open: Option<f64>, current: f64) -> Self {
        Self {
            previous,
            session_open,
            current: Some(current),
            latest_valid: Some(current),
            observed_at: None,
        }
    }

    /// Record the index level for the tick stamped `at`.
    ///
    /// Re-observing the same tick is a no-op. A non-finite or non-positive
    /// level clears `current` for this tick and leaves `previous` untouched.
    pub fn observe(&mut self, level: f64, at: DateTime<Utc>) {
        if self.observed_at == Some(at) {
            return;
        }
        self.observed_at = Some(at);

        if !(level.is_finite() && level > 0.0) {
            warn!(level, %at, "Ignoring invalid volatility index level");
            self.current = None;
            return;
        }

        self.previous = self.latest_valid;
        self.current = Some(level);
        self.latest_valid = Some(level);
        if self.session_open.is_none() {
            self.session_open = Some(level);
        }
    }

    #[must_use]
    pub const fn previous(&self) -> Option<f64> {
        self.previous
    }

    #[must_use]
    pub const fn session_open(&self) -> Option<f64> {
        self.session_open
    }

    #[must_use]
    pub const fn current(&self) -> Option<f64> {
        self.current
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Which shock condition fired and by how much.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShockTrigger {
    /// Point move since the previous tick.
    Absolute { change: f64 },
    /// Percent move since the previous tick.
    TickOverTick { change_pct: f64 },
    /// Percent move since the session open.
    FromOpen { change_pct: f64 },
}

impl std::fmt::Display for ShockTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute { change } => write!(f, "VIX moved {change:+.1} pts"),
            Self::TickOverTick { change_pct } => write!(f, "VIX changed {change_pct:+.1}% from prev"),
            Self::FromOpen { change_pct } => write!(f, "VIX changed {change_pct:+.1}% from open"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityShock {
    pub current: f64,
    pub previous: Option<f64>,
    pub session_open: Option<f64>,
    pub triggers: Vec<ShockTrigger>,
    pub actions: Vec<ShockAction>,
    pub reason: String,
}

fn relative_change_pct(current: f64, base: Option<f64>) -> Option<f64> {
    let base = base.filter(|b| b.is_finite() && *b != 0.0)?;
    Some((current - base) / base * 100.0)
}

/// Check the three shock conditions. Conditions whose reference level is
/// missing or zero are skipped.
pub fn evaluate_volatility_shock(state: &VolatilityState, thresholds: &RiskThresholds) -> Option<VolatilityShock> {
    let current = state.current()?;
    let mut triggers = Vec::new();

    if let Some(previous) = state.previous().filter(|p| p.is_finite()) {
        let change = current - previous;
        if change.abs() >= thresholds.vix_shock_abs {
            triggers.push(ShockTrigger::Absolute { change });
        }
    }
    if let Some(change_pct) = relative_change_pct(current, state.previous()) {
        if change_pct.abs() >= thresholds.vix_shock_roc_pct {
            triggers.push(ShockTrigger::TickOverTick { change_pct });
        }
    }
    if let Some(change_pct) = relative_change_pct(current, state.session_open()) {
        if change_pct.abs() >= thresholds.vix_shock_roc_pct {
            triggers.push(ShockTrigger::FromOpen { change_pct });
        }
    }

    if triggers.is_empty() {
        return None;
    }

    let reason = triggers.iter().map(ToString::to_string).collect::<Vec<_>>().join(" | ");
    warn!(
        current,
        previous = ?state.previous(),
        open = ?state.session_open(),
        reason,
        "Volatility shock detected"
    );

    Some(VolatilityShock {
        current,
        previous: state.previous(),
        session_open: state.session_open(),
        triggers,
        actions: vec![
            ShockAction::ReduceShortExposure,
            ShockAction::AddProtectiveWings,
            ShockAction::PauseEntries,
        ],
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn thresholds() -> RiskThresholds {
        RiskThresholds {
            vix_shock_abs: 4.0,
            vix_shock_roc_pct: 15.0,
            ..RiskThresholds::default()
        }
    }

    #[test]
    fn absolute_move_fires() {
        let state = VolatilityState::with_levels(Some(15.0), Some(15.0), 19.5);
        let shock = evaluate_volatility_shock(&state, &thresholds()).expect("shock");
        assert!(shock
            .triggers
            .iter()
            .any(|t| matches!(t, ShockTrigger::Absolute { change } if (*change - 4.5).abs() < 1e-9)));
        assert!(shock.reason.contains("+4.5 pts"));
        assert_eq!(shock.actions.len(), 3);
    }

    #[test]
    fn rate_of_change_fires_below_absolute_threshold() {
        let state = VolatilityState::with_levels(Some(15.0), Some(15.0), 18.5);
        let shock = evaluate_volatility_shock(&state, &thresholds()).expect("shock");
        assert!(!shock.triggers.iter().any(|t| matches!(t, ShockTrigger::Absolute { .. })));
        assert!(shock.triggers.iter().any(|t| matches!(t, ShockTrigger::TickOverTick { .. })));
        assert!(shock.reason.contains("+23.3% from prev"));
    }

    #[test]
    fn small_move_fires_nothing() {
        let state = VolatilityState::with_levels(Some(15.0), Some(15.0), 15.5);
        assert!(evaluate_volatility_shock(&state, &thresholds()).is_none());
    }

    #[test]
    fn intraday_drift_from_open_fires() {
        // Tick-over-tick is quiet but the session has drifted 20% from open.
        let state = VolatilityState::with_levels(Some(17.5), Some(15.0), 18.0);
        let shock = evaluate_volatility_shock(&state, &thresholds()).expect("shock");
        assert_eq!(shock.triggers.len(), 1);
        assert!(matches!(shock.triggers[0], ShockTrigger::FromOpen { .. }));
    }

    #[test]
    fn falling_volatility_counts_as_shock() {
        let state = VolatilityState::with_levels(Some(20.0), Some(20.0), 15.5);
        assert!(evaluate_volatility_shock(&state, &thresholds()).is_some());
    }

    #[test]
    fn zero_reference_levels_are_skipped() {
        let state = VolatilityState::with_levels(Some(0.0), Some(0.0), 15.0);
        let shock = evaluate_volatility_shock(&state, &thresholds()).expect("absolute still applies");
        assert_eq!(shock.triggers.len(), 1);
        assert!(matches!(shock.triggers[0], ShockTrigger::Absolute { .. }));

        let state = VolatilityState::with_levels(None, None, 15.0);
        assert!(evaluate_volatility_shock(&state, &thresholds()).is_none());
    }

    #[test]
    fn observe_rolls_previous_and_keeps_open() {
        let t0 = Utc::now();
        let mut state = VolatilityState::default();
        state.observe(15.0, t0);
        state.observe(16.0, t0 + Duration::seconds(1));
        assert_eq!(state.previous(), Some(15.0));
        assert_eq!(state.current(), Some(16.0));
        assert_eq!(state.session_open(), Some(15.0));
    }

    #[test]
    fn observing_same_tick_twice_is_idempotent() {
        let t0 = Utc::now();
        let mut state = VolatilityState::default();
        state.observe(15.0, t0);
        state.observe(19.5, t0 + Duration::seconds(1));
        let once = state.clone();
        state.observe(19.5, t0 + Duration::seconds(1));
        assert_eq!(state, once);
    }

    #[test]
    fn invalid_level_suppresses_evaluation_without_losing_history() {
        let t0 = Utc::now();
        let mut state = VolatilityState::default();
        state.observe(15.0, t0);
        state.observe(f64::NAN, t0 + Duration::seconds(1));
        assert_eq!(state.current(), None);
        assert!(evaluate_volatility_shock(&state, &thresholds()).is_none());

        state.observe(15.2, t0 + Duration::seconds(2));
        assert_eq!(state.previous(), Some(15.0));
    }
}
