//! Per-tick risk decision engine.
//!
//! ```text
//! MarketTick
//!     │
//!     ▼
//! aggregate ──► daily loss ──(breach)──► DailyStop   (ignores cooldown)
//!                  │
//!                  ▼
//!             volatility shock ─┐
//!                  │            ├──► cooldown? ──► Suppressed
//!                  ▼            │         │
//!             delta band ───────┘         └──► plan ──► apply ──► arm cooldown
//! ```
//!
//! `evaluate` only decides. `apply` hands the plan to the execution layer and
//! commits cooldown or the kill-switch latch once the orders are accepted.

use chrono::Duration;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use strangle_guard_core::{Clock, MarketTick, RiskConfig, SystemClock};

use crate::aggregator;
use crate::cooldown::{CooldownState, CooldownStatus};
use crate::daily_stop::{self, DailyStopState};
use crate::delta_band;
use crate::error::RiskError;
use crate::executor::RiskExecutor;
use crate::planner;
use crate::regime::{self, RegimeAdjustment};
use crate::types::{ActionKind, AppliedAction, Evaluation, RiskDecision, SuppressedSignal};
use crate::volatility::{self, VolatilityState};

/// The engine's only mutable state, scoped to one trading session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub volatility: VolatilityState,
    pub cooldown: CooldownState,
    pub daily_stop: DailyStopState,
}

impl SessionState {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            volatility: VolatilityState::default(),
            cooldown: CooldownState::new(cooldown),
            daily_stop: DailyStopState::default(),
        }
    }
}

pub struct RiskEngine<C: Clock = SystemClock> {
    config: RiskConfig,
    clock: C,
    session: SessionState,
}

impl RiskEngine<SystemClock> {
    /// # Errors
    ///
    /// Returns [`RiskError::Config`] if the configuration is malformed.
    pub fn with_system_clock(config: RiskConfig) -> Result<Self, RiskError> {
        Self::new(config, SystemClock)
    }
}

impl<C: Clock> RiskEngine<C> {
    /// Validates `config` and starts a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Config`] if the configuration is malformed.
    #[allow(clippy::cast_possible_wrap)]
    pub fn new(config: RiskConfig, clock: C) -> Result<Self, RiskError> {
        config.validate()?;
        let cooldown = Duration::seconds(config.thresholds.adjustment_cooldown_secs as i64);
        info!(
            capital = %config.capital,
            daily_max_loss_pct = %config.thresholds.daily_max_loss_pct,
            cooldown_secs = config.thresholds.adjustment_cooldown_secs,
            "Risk engine initialized"
        );
        Ok(Self {
            config,
            clock,
            session: SessionState::new(cooldown),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &RiskConfig {
        &self.config
    }

    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub fn is_in_cooldown(&self) -> bool {
        self.session.cooldown.is_in_cooldown(self.clock.now())
    }

    #[must_use]
    pub fn cooldown_status(&self) -> CooldownStatus {
        self.session.cooldown.status(self.clock.now())
    }

    #[must_use]
    pub const fn is_daily_stop_triggered(&self) -> bool {
        self.session.daily_stop.is_triggered()
    }

    /// Whether the entry component may open new positions right now.
    #[must_use]
    pub fn entries_allowed(&self) -> bool {
        !self.is_daily_stop_triggered() && !self.is_in_cooldown()
    }

    #[must_use]
    pub fn regime_adjustments(&self, vix: f64, iv_percentile: Option<f64>) -> RegimeAdjustment {
        regime::regime_adjustments(vix, iv_percentile, &self.config.regime)
    }

    /// Clear the kill-switch, cooldown and volatility history for a new session.
    pub fn reset_daily(&mut self) {
        self.session.daily_stop.reset();
        self.session.cooldown.reset();
        self.session.volatility.reset();
        info!("Risk engine daily state reset");
    }

    /// Run the detectors for one tick in priority order.
    ///
    /// Only the volatility history advances (once per distinct tick
    /// timestamp); cooldown and the kill-switch latch are left for [`Self::apply`].
    pub fn evaluate(&mut self, tick: &MarketTick) -> Evaluation {
        let now = self.clock.now();
        self.session.volatility.observe(tick.vix, tick.timestamp);

        let snapshot = aggregator::aggregate(&tick.positions, tick.realized_pnl, self.config.lot_size, tick.timestamp);

        if self.session.daily_stop.is_triggered() {
            debug!("Daily stop latched, skipping evaluation");
            return Evaluation {
                snapshot,
                decision: RiskDecision::Halted,
                evaluated_at: now,
            };
        }

        let thresholds = &self.config.thresholds;
        if let Some(breach) = daily_stop::evaluate_daily_loss(&snapshot, self.config.capital, thresholds) {
            return Evaluation {
                snapshot,
                decision: RiskDecision::DailyStop(breach),
                evaluated_at: now,
            };
        }

        let cooldown = self.session.cooldown.status(now);

        if let Some(shock) = volatility::evaluate_volatility_shock(&self.session.volatility, thresholds) {
            let decision = match cooldown {
                CooldownStatus::Cooldown { until } => {
                    info!(%until, reason = shock.reason, "Volatility shock suppressed by cooldown");
                    RiskDecision::Suppressed {
                        signal: SuppressedSignal::VolatilityShock(shock),
                        cooldown_until: until,
                    }
                }
                CooldownStatus::Active => RiskDecision::VolatilityShock(planner::plan_shock_response(
                    shock,
                    &tick.positions,
                    &tick.wing_premiums,
                    &self.config,
                )),
            };
            return Evaluation {
                snapshot,
                decision,
                evaluated_at: now,
            };
        }

        // An invalid index level for this tick leaves `current` unset; the band
        // cannot be chosen without it.
        let breach = match self.session.volatility.current() {
            Some(vix) => delta_band::evaluate_delta_band(&snapshot, vix, thresholds),
            None => {
                warn!(vix = tick.vix, "No valid volatility level, skipping delta band check");
                None
            }
        };
        let decision = match breach {
            Some(breach) => match cooldown {
                CooldownStatus::Cooldown { until } => {
                    info!(%until, net_delta = breach.net_delta, "Delta hedge suppressed by cooldown");
                    RiskDecision::Suppressed {
                        signal: SuppressedSignal::DeltaBreach(breach),
                        cooldown_until: until,
                    }
                }
                CooldownStatus::Active => {
                    RiskDecision::DeltaHedge(planner::plan_hedge(&breach, thresholds.hedge_delta_offset))
                }
            },
            None => RiskDecision::Clear,
        };

        Evaluation {
            snapshot,
            decision,
            evaluated_at: now,
        }
    }

    /// Hand the evaluation's plan to `executor` and commit state on acceptance.
    ///
    /// Re-applying an evaluation whose action is already committed is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Execution`] if the executor rejects the action. No
    /// cooldown is armed and the kill-switch stays unlatched in that case.
    pub async fn apply<E>(&mut self, evaluation: &Evaluation, executor: &mut E) -> Result<AppliedAction, RiskError>
    where
        E: RiskExecutor + ?Sized,
    {
        match &evaluation.decision {
            RiskDecision::Halted | RiskDecision::Clear | RiskDecision::Suppressed { .. } => Ok(AppliedAction::Nothing),

            RiskDecision::DailyStop(breach) => {
                if self.session.daily_stop.is_triggered() {
                    return Ok(AppliedAction::Nothing);
                }
                executor
                    .close_all_positions(breach)
                    .await
                    .map_err(|source| Self::execution_failed(ActionKind::CloseAll, source))?;
                self.session.daily_stop.latch(self.clock.now(), &breach.reason);
                error!(reason = breach.reason, "Daily stop latched, all positions closing, entries blocked");
                Ok(AppliedAction::KillSwitch)
            }

            RiskDecision::VolatilityShock(plan) => {
                if !self.may_adjust(ActionKind::ShockResponse) {
                    return Ok(AppliedAction::Nothing);
                }
                executor
                    .execute_shock_plan(plan)
                    .await
                    .map_err(|source| Self::execution_failed(ActionKind::ShockResponse, source))?;
                self.session.cooldown.arm(self.clock.now());
                Ok(AppliedAction::ShockResponse)
            }

            RiskDecision::DeltaHedge(plan) => {
                if !self.may_adjust(ActionKind::DeltaHedge) {
                    return Ok(AppliedAction::Nothing);
                }
                executor
                    .place_hedge(plan)
                    .await
                    .map_err(|source| Self::execution_failed(ActionKind::DeltaHedge, source))?;
                self.session.cooldown.arm(self.clock.now());
                Ok(AppliedAction::Hedge)
            }
        }
    }

    /// Adjustments are blocked once the kill-switch is latched or while in cooldown.
    fn may_adjust(&self, action: ActionKind) -> bool {
        if self.session.daily_stop.is_triggered() {
            debug!(%action, "Daily stop latched, dropping adjustment");
            return false;
        }
        if let CooldownStatus::Cooldown { until } = self.cooldown_status() {
            debug!(%action, %until, "Cooldown armed since evaluation, dropping adjustment");
            return false;
        }
        true
    }

    fn execution_failed(action: ActionKind, source: anyhow::Error) -> RiskError {
        warn!(%action, error = %source, "Corrective action rejected by execution layer");
        RiskError::Execution { action, source }
    }

    /// Loss limit for the session: `-capital * daily_max_loss_pct`.
    #[must_use]
    pub fn daily_loss_threshold(&self) -> Decimal {
        daily_stop::loss_threshold(self.config.capital, &self.config.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutedAction, PaperExecutor};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use strangle_guard_core::{Greeks, ManualClock, OptionPosition, OptionSide};

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 4, 0, 0).unwrap()
    }

    fn engine() -> (RiskEngine<Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let config = RiskConfig {
            capital: dec!(300000),
            ..RiskConfig::default()
        };
        (RiskEngine::new(config, Arc::clone(&clock)).unwrap(), clock)
    }

    fn position(delta: f64, mark: Decimal) -> OptionPosition {
        OptionPosition {
            id: "ce".to_string(),
            symbol: "NIFTY24000CE".to_string(),
            side: OptionSide::Call,
            strike: dec!(24000),
            lots: -1,
            entry_price: dec!(100),
            mark_price: Some(mark),
            greeks: Some(Greeks::new(-delta, 0.0, 0.0, 10.0)),
        }
    }

    fn tick(vix: f64, net_delta: f64, realized: Decimal, secs: i64) -> MarketTick {
        MarketTick {
            timestamp: t0() + Duration::seconds(secs),
            vix,
            iv_percentile: None,
            positions: vec![position(net_delta, dec!(100))],
            realized_pnl: realized,
            wing_premiums: Default::default(),
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let config = RiskConfig {
            capital: dec!(-1),
            ..RiskConfig::default()
        };
        assert!(matches!(
            RiskEngine::new(config, ManualClock::new(t0())),
            Err(RiskError::Config(_))
        ));
    }

    #[test]
    fn quiet_tick_is_clear() {
        let (mut engine, _) = engine();
        let eval = engine.evaluate(&tick(12.0, 5.0, dec!(0), 0));
        assert_eq!(eval.decision, RiskDecision::Clear);
    }

    #[test]
    fn delta_breach_plans_a_put_hedge() {
        let (mut engine, _) = engine();
        let eval = engine.evaluate(&tick(12.0, 18.0, dec!(0), 0));
        let RiskDecision::DeltaHedge(plan) = eval.decision else {
            panic!("expected hedge, got {:?}", eval.decision);
        };
        assert_eq!(plan.side, OptionSide::Put);
        assert!((plan.target_delta - 9.0).abs() < 1e-9);
        assert_eq!(plan.lots, 1);
    }

    #[test]
    fn daily_loss_outranks_other_detectors() {
        let (mut engine, _) = engine();
        engine.evaluate(&tick(15.0, 0.0, dec!(0), 0));
        // Volatility shock and delta breach present, but the loss limit wins.
        let eval = engine.evaluate(&tick(25.0, 40.0, dec!(-5000), 1));
        assert!(matches!(eval.decision, RiskDecision::DailyStop(_)));
    }

    #[test]
    fn volatility_shock_outranks_delta_breach() {
        let (mut engine, _) = engine();
        engine.evaluate(&tick(15.0, 0.0, dec!(0), 0));
        let eval = engine.evaluate(&tick(19.5, 40.0, dec!(0), 1));
        assert!(matches!(eval.decision, RiskDecision::VolatilityShock(_)));
    }

    #[tokio::test]
    async fn kill_switch_latches_and_halts_further_evaluation() {
        let (mut engine, _) = engine();
        let mut executor = PaperExecutor::new();
        let eval = engine.evaluate(&tick(12.0, 0.0, dec!(-5000), 0));
        let applied = engine.apply(&eval, &mut executor).await.unwrap();

        assert_eq!(applied, AppliedAction::KillSwitch);
        assert!(engine.is_daily_stop_triggered());
        assert!(!engine.entries_allowed());

        // P&L recovers; the latch holds.
        let eval = engine.evaluate(&tick(12.0, 0.0, dec!(2000), 1));
        assert_eq!(eval.decision, RiskDecision::Halted);
        assert!(engine.is_daily_stop_triggered());
        assert_eq!(executor.executed().len(), 1);
    }

    #[tokio::test]
    async fn rejected_close_leaves_kill_switch_unlatched() {
        let (mut engine, _) = engine();
        let mut executor = PaperExecutor::new();
        executor.reject_next(1);
        let eval = engine.evaluate(&tick(12.0, 0.0, dec!(-5000), 0));

        let err = engine.apply(&eval, &mut executor).await.unwrap_err();
        assert!(matches!(err, RiskError::Execution { action: ActionKind::CloseAll, .. }));
        assert!(!engine.is_daily_stop_triggered());

        // Next attempt goes through.
        let applied = engine.apply(&eval, &mut executor).await.unwrap();
        assert_eq!(applied, AppliedAction::KillSwitch);
        assert!(matches!(executor.executed()[0], ExecutedAction::CloseAll { .. }));
    }

    #[tokio::test]
    async fn hedge_arms_cooldown_which_suppresses_the_next_breach() {
        let (mut engine, clock) = engine();
        let mut executor = PaperExecutor::new();
        let eval = engine.evaluate(&tick(12.0, 18.0, dec!(0), 0));
        assert_eq!(engine.apply(&eval, &mut executor).await.unwrap(), AppliedAction::Hedge);
        assert!(engine.is_in_cooldown());
        assert!(!engine.entries_allowed());

        clock.advance(Duration::seconds(60));
        let eval = engine.evaluate(&tick(12.0, 18.0, dec!(0), 60));
        assert!(matches!(
            eval.decision,
            RiskDecision::Suppressed {
                signal: SuppressedSignal::DeltaBreach(_),
                ..
            }
        ));
        assert_eq!(engine.apply(&eval, &mut executor).await.unwrap(), AppliedAction::Nothing);
    }

    #[tokio::test]
    async fn kill_switch_ignores_cooldown() {
        let (mut engine, clock) = engine();
        let mut executor = PaperExecutor::new();
        let eval = engine.evaluate(&tick(12.0, 18.0, dec!(0), 0));
        engine.apply(&eval, &mut executor).await.unwrap();

        clock.advance(Duration::seconds(30));
        let eval = engine.evaluate(&tick(12.0, 18.0, dec!(-6000), 30));
        assert!(matches!(eval.decision, RiskDecision::DailyStop(_)));
        assert_eq!(engine.apply(&eval, &mut executor).await.unwrap(), AppliedAction::KillSwitch);
    }

    #[test]
    fn invalid_vix_skips_delta_band() {
        let (mut engine, _) = engine();
        let eval = engine.evaluate(&tick(0.0, 40.0, dec!(0), 0));
        assert_eq!(eval.decision, RiskDecision::Clear);
        let eval = engine.evaluate(&tick(-3.0, 40.0, dec!(0), 1));
        assert_eq!(eval.decision, RiskDecision::Clear);
    }

    #[test]
    fn loss_on_leg_with_bad_greeks_still_trips_daily_stop() {
        let (mut engine, _) = engine();
        let mut bad = position(20.0, dec!(400));
        bad.greeks = Some(Greeks::new(-20.0, 0.0, 0.0, f64::NAN));
        let t = MarketTick {
            positions: vec![bad],
            ..tick(12.0, 0.0, dec!(0), 0)
        };
        // (400-100)*-1*75 = -22500 against a -4500 limit.
        let eval = engine.evaluate(&t);
        assert_eq!(eval.snapshot.daily_pnl(), dec!(-22500));
        assert_eq!(eval.snapshot.greeks_unavailable, 1);
        assert!(matches!(eval.decision, RiskDecision::DailyStop(_)));
    }

    #[test]
    fn reset_daily_clears_session() {
        let (mut engine, _) = engine();
        engine.session.daily_stop.latch(t0(), "test");
        engine.session.cooldown.arm(t0());
        engine.evaluate(&tick(15.0, 0.0, dec!(0), 0));

        engine.reset_daily();
        assert!(!engine.is_daily_stop_triggered());
        assert!(!engine.is_in_cooldown());
        assert_eq!(engine.session().volatility.session_open(), None);
    }

    #[test]
    fn regime_query_uses_configured_tiers() {
        let (engine, _) = engine();
        let adj = engine.regime_adjustments(25.0, Some(50.0));
        assert_eq!(adj.multipliers.position_size, 0.5);
    }

    #[test]
    fn loss_threshold_matches_capital() {
        let (engine, _) = engine();
        assert_eq!(engine.daily_loss_threshold(), dec!(-4500));
    }
}
