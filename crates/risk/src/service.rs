//! Supervisor loop: pull ticks, evaluate, apply, repeat.

use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{error, info, warn};

use strangle_guard_core::{Clock, TickSource};

use crate::engine::RiskEngine;
use crate::executor::RiskExecutor;
use crate::types::{AppliedAction, Evaluation, RiskDecision};

/// Counters for one supervisor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub ticks: u64,
    pub kill_switches: u64,
    pub shock_responses: u64,
    pub hedges: u64,
    pub suppressed: u64,
    pub execution_failures: u64,
    /// Re-submissions of a previously rejected action.
    pub retries: u64,
}

pub struct RiskSupervisor<C: Clock, S, E> {
    engine: RiskEngine<C>,
    source: S,
    executor: E,
    poll_interval: Option<Duration>,
    session_date: Option<NaiveDate>,
    /// Rejected action awaiting re-submission.
    pending: Option<Evaluation>,
    stats: SupervisorStats,
}

impl<C, S, E> RiskSupervisor<C, S, E>
where
    C: Clock,
    S: TickSource,
    E: RiskExecutor,
{
    pub fn new(engine: RiskEngine<C>, source: S, executor: E) -> Self {
        Self {
            engine,
            source,
            executor,
            poll_interval: None,
            session_date: None,
            pending: None,
            stats: SupervisorStats::default(),
        }
    }

    /// Pace the loop; without an interval ticks are consumed as fast as the
    /// source yields them.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub const fn engine(&self) -> &RiskEngine<C> {
        &self.engine
    }

    pub const fn executor(&self) -> &E {
        &self.executor
    }

    pub const fn stats(&self) -> SupervisorStats {
        self.stats
    }

    /// The rejected evaluation that will be re-applied on the next tick, if any.
    pub const fn pending(&self) -> Option<&Evaluation> {
        self.pending.as_ref()
    }

    /// Run until the source is exhausted.
    ///
    /// Source and execution errors are logged and the loop carries on. A
    /// rejected action is kept and re-applied on following ticks until it is
    /// accepted or a newer actionable decision replaces it.
    pub async fn run(&mut self) -> Result<SupervisorStats> {
        info!(poll_interval = ?self.poll_interval, "Risk supervisor started");

        let mut interval = self.poll_interval.map(tokio::time::interval);

        loop {
            if let Some(interval) = interval.as_mut() {
                interval.tick().await;
            }

            let tick = match self.source.next_tick().await {
                Ok(Some(tick)) => tick,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Failed to fetch market tick");
                    continue;
                }
            };
            self.stats.ticks += 1;

            let date = tick.timestamp.date_naive();
            if self.session_date.is_some_and(|d| d != date) {
                info!(%date, "New trading session");
                self.engine.reset_daily();
                if let Some(stale) = self.pending.take() {
                    warn!(decision = ?stale.decision, "Dropping rejected action from previous session");
                }
            }
            self.session_date = Some(date);

            let evaluation = self.engine.evaluate(&tick);
            if let RiskDecision::Suppressed { .. } = evaluation.decision {
                self.stats.suppressed += 1;
            }

            // A fresh actionable decision supersedes a pending one.
            let evaluation = match self.pending.take() {
                Some(pending) if !evaluation.decision.requires_action() => {
                    self.stats.retries += 1;
                    info!(decision = ?pending.decision, "Re-submitting rejected corrective action");
                    pending
                }
                _ => evaluation,
            };

            match self.engine.apply(&evaluation, &mut self.executor).await {
                Ok(AppliedAction::KillSwitch) => self.stats.kill_switches += 1,
                Ok(AppliedAction::ShockResponse) => self.stats.shock_responses += 1,
                Ok(AppliedAction::Hedge) => self.stats.hedges += 1,
                Ok(AppliedAction::Nothing) => {}
                Err(e) => {
                    self.stats.execution_failures += 1;
                    error!(error = %e, "Corrective action rejected, re-submitting on next tick");
                    self.pending = Some(evaluation);
                }
            }
        }

        if let Some(pending) = &self.pending {
            error!(decision = ?pending.decision, "Source exhausted with a corrective action still rejected");
        }
        info!(stats = ?self.stats, "Risk supervisor finished");
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::PaperExecutor;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use strangle_guard_core::{ManualClock, MarketTick, RiskConfig};

    struct Scripted {
        ticks: VecDeque<Result<MarketTick>>,
        clock: Arc<ManualClock>,
    }

    #[async_trait]
    impl TickSource for Scripted {
        async fn next_tick(&mut self) -> Result<Option<MarketTick>> {
            match self.ticks.pop_front() {
                Some(Ok(tick)) => {
                    self.clock.set(tick.timestamp);
                    Ok(Some(tick))
                }
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        }
    }

    fn tick(day: u32, realized: rust_decimal::Decimal) -> MarketTick {
        MarketTick {
            timestamp: Utc.with_ymd_and_hms(2026, 3, day, 4, 0, 0).unwrap(),
            vix: 13.0,
            iv_percentile: None,
            positions: Vec::new(),
            realized_pnl: realized,
            wing_premiums: Default::default(),
        }
    }

    #[tokio::test]
    async fn source_errors_do_not_stop_the_loop() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = RiskEngine::new(RiskConfig::default(), Arc::clone(&clock)).unwrap();
        let source = Scripted {
            ticks: VecDeque::from([Err(anyhow::anyhow!("feed down")), Ok(tick(2, dec!(0)))]),
            clock,
        };
        let mut supervisor = RiskSupervisor::new(engine, source, PaperExecutor::new());
        let stats = supervisor.run().await.unwrap();
        assert_eq!(stats.ticks, 1);
    }

    #[tokio::test]
    async fn new_session_date_resets_the_kill_switch() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = RiskEngine::new(RiskConfig::default(), Arc::clone(&clock)).unwrap();
        let source = Scripted {
            ticks: VecDeque::from([Ok(tick(2, dec!(-20000))), Ok(tick(3, dec!(0)))]),
            clock,
        };
        let mut supervisor = RiskSupervisor::new(engine, source, PaperExecutor::new());
        let stats = supervisor.run().await.unwrap();

        assert_eq!(stats.kill_switches, 1);
        assert!(!supervisor.engine().is_daily_stop_triggered());
        assert!(supervisor.engine().entries_allowed());
    }

    fn intraday(minute: u32, realized: rust_decimal::Decimal) -> MarketTick {
        MarketTick {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 2, 4, minute, 0).unwrap(),
            ..tick(2, realized)
        }
    }

    #[tokio::test]
    async fn rejected_close_all_is_resubmitted_after_pnl_recovers() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = RiskEngine::new(RiskConfig::default(), Arc::clone(&clock)).unwrap();
        let source = Scripted {
            ticks: VecDeque::from([Ok(intraday(0, dec!(-20000))), Ok(intraday(1, dec!(0)))]),
            clock,
        };
        let mut executor = PaperExecutor::new();
        executor.reject_next(1);
        let mut supervisor = RiskSupervisor::new(engine, source, executor);
        let stats = supervisor.run().await.unwrap();

        assert_eq!(stats.execution_failures, 1);
        assert_eq!(stats.retries, 1);
        assert_eq!(stats.kill_switches, 1);
        assert!(supervisor.engine().is_daily_stop_triggered());
        assert!(supervisor.pending().is_none());
    }

    #[tokio::test]
    async fn still_rejected_action_stays_pending() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = RiskEngine::new(RiskConfig::default(), Arc::clone(&clock)).unwrap();
        let source = Scripted {
            ticks: VecDeque::from([Ok(intraday(0, dec!(-20000))), Ok(intraday(1, dec!(0)))]),
            clock,
        };
        let mut executor = PaperExecutor::new();
        executor.reject_next(5);
        let mut supervisor = RiskSupervisor::new(engine, source, executor);
        let stats = supervisor.run().await.unwrap();

        assert_eq!(stats.execution_failures, 2);
        assert!(!supervisor.engine().is_daily_stop_triggered());
        assert!(matches!(
            supervisor.pending().map(|e| &e.decision),
            Some(RiskDecision::DailyStop(_))
        ));
    }
}
