//! Portfolio aggregation: fold per-position greeks and P&L into one snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use strangle_guard_core::OptionPosition;

use crate::types::PortfolioSnapshot;

/// Build the portfolio snapshot for one tick.
///
/// Greeks are per lot and weighted by signed lots, so shorts contribute the
/// negated value. A position without a usable mark is left out entirely and
/// counted in `skipped_positions`. A position with missing or non-finite
/// greeks still contributes its P&L but not its greeks, and is counted in
/// `greeks_unavailable`.
pub fn aggregate(
    positions: &[OptionPosition],
    realized_pnl: Decimal,
    lot_size: Decimal,
    timestamp: DateTime<Utc>,
) -> PortfolioSnapshot {
    let mut snapshot = PortfolioSnapshot::empty(realized_pnl, timestamp);

    for pos in positions {
        let Some(pnl) = pos.unrealized_pnl(lot_size) else {
            warn!(id = pos.id, symbol = pos.symbol, mark = ?pos.mark_price, "Skipping position without a usable mark");
            snapshot.skipped_positions += 1;
            continue;
        };

        snapshot.add_unrealized(pnl);
        snapshot.active_positions += 1;

        match pos.greeks {
            Some(greeks) if greeks.is_finite() => {
                let lots = f64::from(pos.lots);
                snapshot.net_delta += greeks.delta * lots;
                snapshot.net_gamma += greeks.gamma * lots;
                snapshot.net_theta += greeks.theta * lots;
                snapshot.net_vega += greeks.vega * lots;
                if pos.is_short() {
                    snapshot.short_vega_exposure += (greeks.vega * lots).abs();
                }
            }
            greeks => {
                warn!(id = pos.id, symbol = pos.symbol, ?greeks, "Position greeks unavailable, excluded from net greeks");
                snapshot.greeks_unavailable += 1;
            }
        }
    }

    debug!(
        net_delta = snapshot.net_delta,
        net_gamma = snapshot.net_gamma,
        net_theta = snapshot.net_theta,
        net_vega = snapshot.net_vega,
        daily_pnl = %snapshot.daily_pnl(),
        positions = snapshot.active_positions,
        skipped = snapshot.skipped_positions,
        greeks_unavailable = snapshot.greeks_unavailable,
        "Portfolio snapshot"
    );

    snapshot
}
