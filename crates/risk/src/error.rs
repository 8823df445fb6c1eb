use thiserror::Error;

use strangle_guard_core::ConfigError;

use crate::types::ActionKind;

/// Errors surfaced by the risk engine.
#[derive(Error, Debug)]
pub enum RiskError {
    /// Configuration rejected at construction.
    #[error("Invalid risk configuration: {0}")]
    Config(#[from] ConfigError),

    /// The execution layer refused a corrective action; nothing was committed.
    #[error("Execution of {action} failed: {source}")]
    Execution {
        action: ActionKind,
        #[source]
        source: anyhow::Error,
    },
}
