//! Daily loss kill-switch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use strangle_guard_core::RiskThresholds;

use crate::types::PortfolioSnapshot;

/// Session latch for the kill-switch. Only moves false -> true until reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyStopState {
    triggered_at: Option<DateTime<Utc>>,
    reason: Option<String>,
}

impl DailyStopState {
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        self.triggered_at.is_some()
    }

    #[must_use]
    pub const fn triggered_at(&self) -> Option<DateTime<Utc>> {
        self.triggered_at
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Latch the stop. A second latch keeps the first timestamp and reason.
    pub(crate) fn latch(&mut self, at: DateTime<Utc>, reason: &str) {
        if self.triggered_at.is_none() {
            self.triggered_at = Some(at);
            self.reason = Some(reason.to_string());
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLossBreach {
    pub daily_pnl: Decimal,
    pub threshold: Decimal,
    pub reason: String,
}

/// `-capital * daily_max_loss_pct`.
#[must_use]
pub fn loss_threshold(capital: Decimal, thresholds: &RiskThresholds) -> Decimal {
    -(capital * thresholds.daily_max_loss_pct)
}

/// Breach when the session's daily P&L is at or below the loss threshold.
pub fn evaluate_daily_loss(
    snapshot: &PortfolioSnapshot,
    capital: Decimal,
    thresholds: &RiskThresholds,
) -> Option<DailyLossBreach> {
    let threshold = loss_threshold(capital, thresholds);
    let daily_pnl = snapshot.daily_pnl();
    if daily_pnl > threshold {
        return None;
    }

    let reason = format!(
        "Daily P&L {daily_pnl} breached limit {threshold} ({}% of capital)",
        (thresholds.daily_max_loss_pct * Decimal::ONE_HUNDRED).normalize()
    );
    error!(daily_pnl = %daily_pnl, threshold = %threshold, "Daily loss limit breached");

    Some(DailyLossBreach {
        daily_pnl,
        threshold,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(realized: Decimal, unrealized: Decimal) -> PortfolioSnapshot {
        let mut snap = PortfolioSnapshot::empty(realized, Utc::now());
        snap.add_unrealized(unrealized);
        snap
    }

    fn thresholds() -> RiskThresholds {
        RiskThresholds {
            daily_max_loss_pct: dec!(0.015),
            ..RiskThresholds::default()
        }
    }

    #[test]
    fn threshold_is_fraction_of_capital() {
        assert_eq!(loss_threshold(dec!(300000), &thresholds()), dec!(-4500));
    }

    #[test]
    fn loss_beyond_limit_triggers() {
        let breach = evaluate_daily_loss(&snapshot(dec!(0), dec!(-5000)), dec!(300000), &thresholds()).expect("breach");
        assert_eq!(breach.daily_pnl, dec!(-5000));
        assert!(breach.reason.contains("-5000"));
        assert!(breach.reason.contains("1.5%"));
    }

    #[test]
    fn loss_within_limit_does_not_trigger() {
        assert!(evaluate_daily_loss(&snapshot(dec!(0), dec!(-4000)), dec!(300000), &thresholds()).is_none());
    }

    #[test]
    fn exactly_at_limit_triggers() {
        assert!(evaluate_daily_loss(&snapshot(dec!(0), dec!(-4500)), dec!(300000), &thresholds()).is_some());
    }

    #[test]
    fn realized_and_unrealized_combine() {
        let snap = snapshot(dec!(-2500), dec!(-3000));
        assert!(evaluate_daily_loss(&snap, dec!(300000), &thresholds()).is_some());
    }

    #[test]
    fn latch_is_monotonic_until_reset() {
        let mut state = DailyStopState::default();
        let first = Utc::now();
        state.latch(first, "first");
        state.latch(first + chrono::Duration::seconds(5), "second");
        assert!(state.is_triggered());
        assert_eq!(state.triggered_at(), Some(first));
        assert_eq!(state.reason(), Some("first"));

        state.reset();
        assert!(!state.is_triggered());
    }
}
