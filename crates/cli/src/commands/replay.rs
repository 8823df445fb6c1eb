//! Replays recorded market ticks through the risk engine.
//!
//! The engine clock follows each tick's timestamp, so cooldown windows
//! elapse in market time rather than wall time.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use strangle_guard_core::{ManualClock, MarketTick, TickSource};
use strangle_guard_risk::{PaperExecutor, RiskEngine, RiskSupervisor};

use super::ConfigSource;

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// JSON file holding an array of market ticks
    #[arg(long)]
    pub ticks: PathBuf,

    /// Delay between ticks in milliseconds (0 replays as fast as possible)
    #[arg(long, default_value_t = 0)]
    pub pace_ms: u64,

    #[command(flatten)]
    pub source: ConfigSource,
}

/// Yields ticks from memory and moves a shared clock to each timestamp.
pub struct ReplaySource {
    ticks: VecDeque<MarketTick>,
    clock: Arc<ManualClock>,
}

impl ReplaySource {
    /// # Errors
    /// Returns an error if the file is unreadable, not a tick array, or empty.
    pub fn from_file(path: &Path) -> Result<(Self, Arc<ManualClock>)> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read tick file: {}", path.display()))?;
        let ticks: Vec<MarketTick> =
            serde_json::from_str(&raw).with_context(|| format!("Failed to parse tick file: {}", path.display()))?;
        Self::new(ticks)
    }

    /// # Errors
    /// Returns an error if `ticks` is empty.
    pub fn new(mut ticks: Vec<MarketTick>) -> Result<(Self, Arc<ManualClock>)> {
        ticks.sort_by_key(|t| t.timestamp);
        let first = ticks.first().context("Tick file contains no ticks")?;
        let clock = Arc::new(ManualClock::new(first.timestamp));
        let source = Self {
            ticks: ticks.into(),
            clock: Arc::clone(&clock),
        };
        Ok((source, clock))
    }
}

#[async_trait]
impl TickSource for ReplaySource {
    async fn next_tick(&mut self) -> Result<Option<MarketTick>> {
        let tick = self.ticks.pop_front();
        if let Some(tick) = &tick {
            self.clock.set(tick.timestamp);
        }
        Ok(tick)
    }
}

/// Runs the replay and prints what the paper executor accepted.
///
/// # Errors
/// Returns an error if the config or tick file cannot be loaded.
pub async fn run_replay(args: ReplayArgs) -> Result<()> {
    let config = args.source.load()?;
    let (source, clock) = ReplaySource::from_file(&args.ticks)?;
    tracing::info!(ticks = source.ticks.len(), file = %args.ticks.display(), "Replaying market ticks");

    let engine = RiskEngine::new(config, clock)?;
    let mut supervisor = RiskSupervisor::new(engine, source, PaperExecutor::new());
    if args.pace_ms > 0 {
        supervisor = supervisor.with_poll_interval(Duration::from_millis(args.pace_ms));
    }

    let stats = supervisor.run().await?;

    println!("Replay complete");
    println!("  ticks              {}", stats.ticks);
    println!("  kill switches      {}", stats.kill_switches);
    println!("  shock responses    {}", stats.shock_responses);
    println!("  hedges             {}", stats.hedges);
    println!("  suppressed         {}", stats.suppressed);
    println!("  execution failures {}", stats.execution_failures);
    println!("  retries            {}", stats.retries);
    for (i, action) in supervisor.executor().executed().iter().enumerate() {
        println!("  #{:<3} {action:?}", i + 1);
    }
    let engine = supervisor.engine();
    println!(
        "  final state: daily_stop={} entries_allowed={}",
        engine.is_daily_stop_triggered(),
        engine.entries_allowed()
    );
    Ok(())
}
