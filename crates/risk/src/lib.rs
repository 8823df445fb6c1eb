//! Portfolio risk guard for a short-strangle options book.
//!
//! Each market tick is aggregated into a [`PortfolioSnapshot`] and run
//! through three detectors in priority order:
//! - daily loss limit (latching kill-switch)
//! - volatility shock (reduce shorts, add wings, pause entries)
//! - delta band (hedge back toward the inner band)
//!
//! Adjustments share one cooldown window. Order placement is delegated to a
//! [`RiskExecutor`]; the engine never talks to a broker itself.

pub mod aggregator;
pub mod cooldown;
pub mod daily_stop;
pub mod delta_band;
pub mod engine;
pub mod error;
pub mod executor;
pub mod planner;
pub mod regime;
pub mod service;
pub mod types;
pub mod volatility;

pub use cooldown::{CooldownState, CooldownStatus};
pub use daily_stop::{DailyLossBreach, DailyStopState};
pub use delta_band::{DeltaBands, DeltaBreach};
pub use engine::{RiskEngine, SessionState};
pub use error::RiskError;
pub use executor::{ExecutedAction, PaperExecutor, RiskExecutor};
pub use regime::RegimeAdjustment;
pub use service::{RiskSupervisor, SupervisorStats};
pub use types::{
    ActionKind, AppliedAction, Evaluation, HedgePlan, PortfolioSnapshot, ReduceOrder, RiskDecision, ShockAction,
    ShockPlan, SuppressedSignal, WingAction, WingPlan,
};
pub use volatility::{ShockTrigger, VolatilityShock, VolatilityState};
