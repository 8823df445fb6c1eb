//! Anti-thrash cooldown between corrective actions.
//!
//! There is no timer: every query compares the clock against the deadline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CooldownStatus {
    Active,
    Cooldown { until: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownState {
    last_adjustment: Option<DateTime<Utc>>,
    lock: Duration,
}

impl CooldownState {
    #[must_use]
    pub const fn new(lock: Duration) -> Self {
        Self {
            last_adjustment: None,
            lock,
        }
    }

    #[must_use]
    pub const fn last_adjustment(&self) -> Option<DateTime<Utc>> {
        self.last_adjustment
    }

    #[must_use]
    pub const fn lock(&self) -> Duration {
        self.lock
    }

    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.last_adjustment.map(|at| at + self.lock)
    }

    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> CooldownStatus {
        match self.deadline() {
            Some(until) if now < until => CooldownStatus::Cooldown { until },
            _ => CooldownStatus::Active,
        }
    }

    #[must_use]
    pub fn is_in_cooldown(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status(now), CooldownStatus::Cooldown { .. })
    }

    /// Start the lock window. Only called once a corrective action has been
    /// accepted by the execution layer.
    pub(crate) fn arm(&mut self, at: DateTime<Utc>) {
        self.last_adjustment = Some(at);
        tracing::info!(lock_secs = self.lock.num_seconds(), until = %(at + self.lock), "Adjustment cooldown armed");
    }

    pub(crate) fn reset(&mut self) {
        self.last_adjustment = None;
    }
}
