//! Daily action budgets.
//!
//! Pure accounting of per-action-type counts against daily limits. No I/O;
//! the session manager owns one of these per session and serializes access.

use crate::strategy::EngagementStrategy;
use crate::types::{ActionCounts, ActionType};

/// Per-day budget tracker for a session.
///
/// Counts can never exceed limits: [`DailyBudget::record`] refuses to go past
/// the ceiling instead of erroring, so budget exhaustion blocks new actions
/// of that type without failing the session.
#[derive(Debug, Clone)]
pub struct DailyBudget {
    limits: ActionCounts,
    counts: ActionCounts,
}

impl DailyBudget {
    /// Create a budget with the given limits and zeroed counts.
    pub fn new(limits: ActionCounts) -> Self {
        Self {
            limits,
            counts: ActionCounts::default(),
        }
    }

    /// Budget derived from a strategy's hourly rates.
    pub fn from_strategy(strategy: &EngagementStrategy) -> Self {
        Self::new(strategy.daily_limits())
    }

    /// Whether another action of this type fits in today's budget.
    ///
    /// Unbudgeted types (story views, DMs) always have budget.
    pub fn has_budget(&self, action_type: ActionType) -> bool {
        match (
            self.counts.get(action_type),
            self.limits.get(action_type),
        ) {
            (Some(count), Some(limit)) => count < limit,
            _ => true,
        }
    }

    /// Record one completed action. Returns false (without counting) if the
    /// budget for this type is already exhausted.
    pub fn record(&mut self, action_type: ActionType) -> bool {
        if !self.has_budget(action_type) {
            return false;
        }
        self.counts.bump(action_type);
        true
    }

    /// Remaining budget for a type; `None` for unbudgeted types.
    pub fn remaining(&self, action_type: ActionType) -> Option<u32> {
        let count = self.counts.get(action_type)?;
        let limit = self.limits.get(action_type)?;
        Some(limit.saturating_sub(count))
    }

    /// Reset counts to zero for a new day.
    pub fn reset(&mut self) {
        self.counts = ActionCounts::default();
    }

    pub fn limits(&self) -> ActionCounts {
        self.limits
    }

    pub fn counts(&self) -> ActionCounts {
        self.counts
    }
}
