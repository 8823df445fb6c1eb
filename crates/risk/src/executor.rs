//! Execution collaborator seam and a paper implementation.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::daily_stop::DailyLossBreach;
use crate::types::{HedgePlan, ShockPlan, WingAction};

/// Places the orders behind a corrective action.
///
/// `Ok` means the broker accepted the orders, not that they filled. An `Err`
/// leaves engine state untouched so the action is re-attempted.
#[async_trait]
pub trait RiskExecutor: Send + Sync {
    /// Flatten every open position and block new entries.
    async fn close_all_positions(&mut self, breach: &DailyLossBreach) -> Result<()>;

    async fn execute_shock_plan(&mut self, plan: &ShockPlan) -> Result<()>;

    async fn place_hedge(&mut self, plan: &HedgePlan) -> Result<()>;
}

/// Record of an order batch accepted by [`PaperExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutedAction {
    CloseAll { reason: String },
    ShockResponse { reductions: usize, wings_added: usize, wings_closed: usize },
    Hedge { side: strangle_guard_core::OptionSide, lots: u32 },
}

/// Logs and records actions instead of routing them. Can be told to reject.
#[derive(Debug, Default)]
pub struct PaperExecutor {
    executed: Vec<ExecutedAction>,
    reject_next: usize,
}

impl PaperExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` submissions.
    pub fn reject_next(&mut self, count: usize) {
        self.reject_next = count;
    }

    #[must_use]
    pub fn executed(&self) -> &[ExecutedAction] {
        &self.executed
    }

    fn accept(&mut self, action: ExecutedAction) -> Result<()> {
        if self.reject_next > 0 {
            self.reject_next -= 1;
            anyhow::bail!("paper broker rejected {action:?}");
        }
        info!(?action, "Paper execution accepted");
        self.executed.push(action);
        Ok(())
    }
}

#[async_trait]
impl RiskExecutor for PaperExecutor {
    async fn close_all_positions(&mut self, breach: &DailyLossBreach) -> Result<()> {
        self.accept(ExecutedAction::CloseAll {
            reason: breach.reason.clone(),
        })
    }

    async fn execute_shock_plan(&mut self, plan: &ShockPlan) -> Result<()> {
        let wings_added = plan.wings.iter().filter(|w| w.action == WingAction::AddWing).count();
        self.accept(ExecutedAction::ShockResponse {
            reductions: plan.reductions.len(),
            wings_added,
            wings_closed: plan.wings.len() - wings_added,
        })
    }

    async fn place_hedge(&mut self, plan: &HedgePlan) -> Result<()> {
        self.accept(ExecutedAction::Hedge {
            side: plan.side,
            lots: plan.lots,
        })
    }
}
