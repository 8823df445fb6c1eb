use crate::position::MarketTick;
use anyhow::Result;
use async_trait::async_trait;

/// Supplies market ticks (volatility, open positions with greeks, session P&L).
#[async_trait]
pub trait TickSource: Send + Sync {
    /// Returns `None` once the source is exhausted.
    async fn next_tick(&mut self) -> Result<Option<MarketTick>>;
}
