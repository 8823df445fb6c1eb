use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Option contract right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSide {
    Call,
    Put,
}

impl std::fmt::Display for OptionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CE"),
            Self::Put => write!(f, "PE"),
        }
    }
}

/// Per-lot option sensitivities, delta quoted in points (0.30 delta = 30).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

impl Greeks {
    #[must_use]
    pub const fn new(delta: f64, gamma: f64, theta: f64, vega: f64) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.delta.is_finite() && self.gamma.is_finite() && self.theta.is_finite() && self.vega.is_finite()
    }
}

/// An open option position as reported by the position provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionPosition {
    pub id: String,
    pub symbol: String,
    pub side: OptionSide,
    pub strike: Decimal,
    /// Signed lot count: negative for short.
    pub lots: i32,
    pub entry_price: Decimal,
    /// Live mark; `None` when the quote is unavailable.
    pub mark_price: Option<Decimal>,
    /// `None` when greeks could not be computed for this tick.
    pub greeks: Option<Greeks>,
}

impl OptionPosition {
    #[must_use]
    pub const fn is_short(&self) -> bool {
        self.lots < 0
    }

    /// Unrealized P&L at the current mark, or `None` without a usable mark.
    #[must_use]
    pub fn unrealized_pnl(&self, lot_size: Decimal) -> Option<Decimal> {
        let mark = self.mark_price.filter(|m| *m > Decimal::ZERO)?;
        Some((mark - self.entry_price) * Decimal::from(self.lots) * lot_size)
    }
}

/// One market observation handed to the risk engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketTick {
    pub timestamp: DateTime<Utc>,
    /// Volatility index level (India VIX or similar).
    pub vix: f64,
    #[serde(default)]
    pub iv_percentile: Option<f64>,
    #[serde(default)]
    pub positions: Vec<OptionPosition>,
    /// Realized P&L booked so far this session.
    #[serde(default)]
    pub realized_pnl: Decimal,
    /// Per-unit premium of the protective option at each short position's
    /// wing strike, keyed by position id.
    #[serde(default)]
    pub wing_premiums: HashMap<String, Decimal>,
}
