//! Action execution.
//!
//! The executor attempts one automation action and produces an outcome. The
//! reference behavior is a simulation: a fixed success probability, a fixed
//! catalogue of failure reasons, and synthetic engagement scaled by action
//! type. A production deployment replaces the failure branch with a real
//! platform call; everything random is drawn through [`RandomSource`] so
//! tests can force deterministic sequences.

use crate::types::{ActionStatus, ActionType, AutomationAction, EngagementOutcome};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

/// Probability that a simulated action succeeds.
pub const SUCCESS_PROBABILITY: f64 = 0.92;

/// Human-readable failure reasons, picked uniformly at random in simulation.
pub const FAILURE_REASONS: [&str; 7] = [
    "Target account is private",
    "Content no longer available",
    "Rate limit reached, action throttled",
    "Network timeout",
    "Account temporarily restricted",
    "Content not suitable for engagement",
    "Interaction blocked by target",
];

/// Injectable source of randomness.
pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&self) -> f64;

    /// Uniform index in `[0, upper)`. `upper` must be non-zero.
    fn pick(&self, upper: usize) -> usize;

    /// Uniform draw in `[lo, hi)`.
    fn range_u64(&self, lo: u64, hi: u64) -> u64;
}

/// Production random source backed by the thread-local rand RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::random::<f64>()
    }

    fn pick(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }

    fn range_u64(&self, lo: u64, hi: u64) -> u64 {
        rand::thread_rng().gen_range(lo..hi)
    }
}

/// Deterministic random source for tests.
///
/// `next_f64` pops from a queue of scripted rolls and falls back to the
/// default once the queue is drained; `pick` always returns 0 and `range_u64`
/// always returns `lo`.
#[derive(Debug)]
pub struct FixedRandom {
    rolls: Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl FixedRandom {
    /// Always roll the given value.
    pub fn always(value: f64) -> Self {
        Self {
            rolls: Mutex::new(VecDeque::new()),
            fallback: value,
        }
    }

    /// Roll the scripted sequence, then fall back to `fallback`.
    pub fn sequence(rolls: Vec<f64>, fallback: f64) -> Self {
        Self {
            rolls: Mutex::new(rolls.into()),
            fallback,
        }
    }
}

impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        self.rolls
            .lock()
            .expect("rolls lock")
            .pop_front()
            .unwrap_or(self.fallback)
    }

    fn pick(&self, _upper: usize) -> usize {
        0
    }

    fn range_u64(&self, lo: u64, _hi: u64) -> u64 {
        lo
    }
}

/// Result of one action attempt, to be applied to the session by its owner.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub status: ActionStatus,
    pub failure_reason: Option<String>,
    pub engagement: Option<EngagementOutcome>,
}

/// Attempts automation actions against the (simulated) platform.
pub struct ActionExecutor {
    random: std::sync::Arc<dyn RandomSource>,
}

impl ActionExecutor {
    pub fn new(random: std::sync::Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Attempt one action.
    ///
    /// The caller applies the outcome to the action and the owning session's
    /// counters under its own lock; the executor itself holds no state.
    pub fn execute(&self, action: &AutomationAction) -> ActionOutcome {
        if self.random.next_f64() < SUCCESS_PROBABILITY {
            let engagement = self.synthesize_engagement(action.action_type);
            debug!(
                action_id = %action.id,
                action_type = action.action_type.as_str(),
                target = %action.target_username,
                "Action succeeded"
            );
            ActionOutcome {
                status: ActionStatus::Completed,
                failure_reason: None,
                engagement: Some(engagement),
            }
        } else {
            let reason = FAILURE_REASONS[self.random.pick(FAILURE_REASONS.len())].to_string();
            debug!(
                action_id = %action.id,
                action_type = action.action_type.as_str(),
                reason = %reason,
                "Action failed"
            );
            ActionOutcome {
                status: ActionStatus::Failed,
                failure_reason: Some(reason),
                engagement: None,
            }
        }
    }

    /// Synthetic engagement received back from a successful action.
    ///
    /// Comments draw the most return engagement, follows some, likes a
    /// trickle.
    fn synthesize_engagement(&self, action_type: ActionType) -> EngagementOutcome {
        match action_type {
            ActionType::Comment => EngagementOutcome {
                likes: 2 + self.random.range_u64(0, 5) as u32,
                comments: 1 + self.random.range_u64(0, 2) as u32,
                saves: self.random.range_u64(0, 3) as u32,
            },
            ActionType::Follow => EngagementOutcome {
                likes: 1 + self.random.range_u64(0, 3) as u32,
                comments: self.random.range_u64(0, 2) as u32,
                saves: 0,
            },
            ActionType::Like => EngagementOutcome {
                likes: 1,
                comments: 0,
                saves: self.random.range_u64(0, 2) as u32,
            },
            ActionType::Unfollow | ActionType::ViewStory | ActionType::Dm => {
                EngagementOutcome::default()
            }
        }
    }
}
