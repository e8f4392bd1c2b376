//! Automation session management.
//!
//! One session at a time runs automated engagement. The manager owns the
//! session state machine (active / paused / completed / error), the per-day
//! action budget, the chronological action history, and the activity loop
//! that plans actions from targeting recommendations.
//!
//! Cancellation is cooperative: stop and emergency stop flip the status and
//! the loop observes it at tick entry. In-flight actions always complete.

use crate::budget::DailyBudget;
use crate::collaborators::{TargetCandidate, TargetingService};
use crate::error::{Error, Result};
use crate::executor::{ActionExecutor, RandomSource};
use crate::risk::{ComplianceReport, RiskAssessment, RiskAssessor};
use crate::strategy::{EngagementStrategy, StrategyRegistry};
use crate::time::Clock;
use crate::types::{
    ActionCounts, ActionStatus, ActionType, AutomationAction, AutomationSession, AutomationStats,
    SessionStatus,
};
use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Cadence of the activity loop.
pub const ACTIVITY_INTERVAL_SECS: u64 = 60;

/// Candidates fetched from the targeting service per tick.
pub const TARGETS_PER_TICK: usize = 5;

/// Bounds of the randomized base delay before a planned action executes.
/// Consecutive actions of one tick are additionally spaced by the strategy's
/// inter-action delay.
pub const MIN_ACTION_DELAY_SECS: u64 = 10;
pub const MAX_ACTION_DELAY_SECS: u64 = 40;

/// Everything mutable shared between the loop, the per-action timers and the
/// synchronous operations. One lock guards it all.
struct SessionState {
    session: Option<AutomationSession>,
    strategy: Option<EngagementStrategy>,
    budget: Option<DailyBudget>,
    /// UTC day the current budget counts belong to.
    budget_day: Option<NaiveDate>,
    history: Vec<AutomationAction>,
}

/// Owns the automation session state machine and its activity loop.
pub struct AutomationSessionManager {
    state: Mutex<SessionState>,
    strategies: StrategyRegistry,
    targeting: Arc<dyn TargetingService>,
    executor: ActionExecutor,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    activity_task: RwLock<Option<AbortHandle>>,
}

impl AutomationSessionManager {
    pub fn new(
        targeting: Arc<dyn TargetingService>,
        random: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState {
                session: None,
                strategy: None,
                budget: None,
                budget_day: None,
                history: Vec::new(),
            }),
            strategies: StrategyRegistry::builtin(),
            targeting,
            executor: ActionExecutor::new(random.clone()),
            random,
            clock,
            activity_task: RwLock::new(None),
        }
    }

    /// Names of the strategies a session can be started with.
    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies.names()
    }

    // ─────────────────────────────────────────────────────────────────────
    // State machine
    // ─────────────────────────────────────────────────────────────────────

    /// Start a new automation session with the named strategy.
    ///
    /// Daily limits are the strategy's hourly rates over twelve active hours
    /// (unfollows fixed at 20). Fails with [`Error::SessionActive`] while a
    /// non-terminal session exists: the caller must stop it first rather
    /// than have its history silently discarded.
    pub async fn start_session(
        self: &Arc<Self>,
        strategy_name: &str,
        hashtags: Vec<String>,
    ) -> Result<AutomationSession> {
        let strategy = self
            .strategies
            .get(strategy_name)
            .ok_or_else(|| Error::UnknownStrategy(strategy_name.to_string()))?
            .clone();

        let session = {
            let mut state = self.state.lock().await;
            if let Some(existing) = &state.session {
                if !existing.status.is_terminal() {
                    return Err(Error::SessionActive(existing.id.clone()));
                }
            }

            let now = self.clock.now();
            let budget = DailyBudget::from_strategy(&strategy);
            let session = AutomationSession {
                id: Uuid::new_v4().to_string(),
                start_time: now,
                end_time: None,
                status: SessionStatus::Active,
                actions_completed: 0,
                actions_planned: 0,
                success_rate: 0.0,
                strategy_name: strategy.name.clone(),
                target_hashtags: hashtags,
                daily_limits: budget.limits(),
                current_counts: budget.counts(),
            };
            state.budget_day = Some(now.date_naive());
            state.budget = Some(budget);
            state.strategy = Some(strategy);
            state.history.clear();
            state.session = Some(session.clone());
            session
        };

        info!(
            session_id = %session.id,
            strategy = %session.strategy_name,
            hashtags = session.target_hashtags.len(),
            "Automation session started"
        );
        self.spawn_activity_loop(std::time::Duration::from_secs(ACTIVITY_INTERVAL_SECS))
            .await;
        Ok(session)
    }

    /// Pause the active session. No-op unless status is `active`.
    pub async fn pause_session(&self) -> bool {
        let mut state = self.state.lock().await;
        let Some(session) = state.session.as_mut() else {
            return false;
        };
        if session.status != SessionStatus::Active {
            debug!(status = session.status.as_str(), "Pause ignored");
            return false;
        }
        session.status = SessionStatus::Paused;
        info!(session_id = %session.id, "Automation session paused");
        true
    }

    /// Resume a paused session and relaunch the activity loop.
    pub async fn resume_session(self: &Arc<Self>) -> bool {
        let resumed = {
            let mut state = self.state.lock().await;
            let Some(session) = state.session.as_mut() else {
                return false;
            };
            if session.status != SessionStatus::Paused {
                debug!(status = session.status.as_str(), "Resume ignored");
                return false;
            }
            session.status = SessionStatus::Active;
            info!(session_id = %session.id, "Automation session resumed");
            true
        };
        if resumed {
            self.spawn_activity_loop(std::time::Duration::from_secs(ACTIVITY_INTERVAL_SECS))
                .await;
        }
        resumed
    }

    /// Stop the current session. The activity loop observes the status on
    /// its next tick and self-terminates; in-flight actions still complete.
    pub async fn stop_session(&self) -> Option<AutomationSession> {
        let mut state = self.state.lock().await;
        let session = state.session.as_mut()?;
        if session.status.is_terminal() {
            return None;
        }
        session.status = SessionStatus::Completed;
        session.end_time = Some(self.clock.now());
        info!(
            session_id = %session.id,
            completed = session.actions_completed,
            planned = session.actions_planned,
            "Automation session stopped"
        );
        Some(session.clone())
    }

    /// Immediately halt automation.
    ///
    /// The session enters the terminal `error` state and every action still
    /// pending is marked skipped. A fresh start is required afterwards.
    /// Returns the number of actions skipped.
    pub async fn emergency_stop(&self, reason: &str) -> usize {
        let mut state = self.state.lock().await;
        let state = &mut *state;
        let Some(session) = state.session.as_mut() else {
            warn!("Emergency stop with no session");
            return 0;
        };
        session.status = SessionStatus::Error;
        session.end_time = Some(self.clock.now());

        let mut skipped = 0;
        for action in state.history.iter_mut() {
            if action.status == ActionStatus::Pending {
                action.status = ActionStatus::Skipped;
                action.failure_reason = Some(format!("Emergency stop: {reason}"));
                skipped += 1;
            }
        }
        warn!(
            session_id = %session.id,
            reason = %reason,
            skipped,
            "Emergency stop"
        );
        skipped
    }

    /// Snapshot of the current session, if any.
    pub async fn current_session(&self) -> Option<AutomationSession> {
        self.state.lock().await.session.clone()
    }

    /// Action history, ascending by timestamp. `limit` keeps the most recent
    /// entries.
    pub async fn action_history(&self, limit: Option<usize>) -> Vec<AutomationAction> {
        let state = self.state.lock().await;
        match limit {
            Some(n) if n < state.history.len() => {
                state.history[state.history.len() - n..].to_vec()
            }
            _ => state.history.clone(),
        }
    }

    /// Aggregate view of the automation state.
    pub async fn automation_stats(&self) -> AutomationStats {
        let state = self.state.lock().await;
        let today = self.clock.now().date_naive();

        let mut failed = 0;
        let mut skipped = 0;
        let mut actions_today = 0;
        let mut counts_today = ActionCounts::default();
        for action in &state.history {
            match action.status {
                ActionStatus::Failed => failed += 1,
                ActionStatus::Skipped => skipped += 1,
                _ => {}
            }
            if action.timestamp.date_naive() == today {
                match action.status {
                    ActionStatus::Completed => {
                        actions_today += 1;
                        counts_today.bump(action.action_type);
                    }
                    ActionStatus::Failed => actions_today += 1,
                    _ => {}
                }
            }
        }

        AutomationStats {
            session_id: state.session.as_ref().map(|s| s.id.clone()),
            session_status: state.session.as_ref().map(|s| s.status),
            actions_planned: state.session.as_ref().map(|s| s.actions_planned).unwrap_or(0),
            actions_completed: state
                .session
                .as_ref()
                .map(|s| s.actions_completed)
                .unwrap_or(0),
            actions_failed: failed,
            actions_skipped: skipped,
            success_rate: state.session.as_ref().map(|s| s.success_rate).unwrap_or(0.0),
            actions_today,
            counts_today,
        }
    }

    /// Risk assessment for the current session.
    pub async fn assess_risk(&self, assessor: &RiskAssessor) -> Result<RiskAssessment> {
        let state = self.state.lock().await;
        let session = state.session.as_ref().ok_or(Error::NoSession)?;
        let strategy = state.strategy.as_ref().ok_or(Error::NoSession)?;
        Ok(assessor.assess_risk(session, strategy, &state.history))
    }

    /// Compliance report for the current session.
    pub async fn generate_compliance_report(
        &self,
        assessor: &RiskAssessor,
    ) -> Result<ComplianceReport> {
        let stats = self.automation_stats().await;
        let state = self.state.lock().await;
        let session = state.session.as_ref().ok_or(Error::NoSession)?;
        let strategy = state.strategy.as_ref().ok_or(Error::NoSession)?;
        Ok(assessor.generate_compliance_report(session, &stats, strategy, &state.history))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Activity loop
    // ─────────────────────────────────────────────────────────────────────

    /// One activity tick: plan actions for fresh targeting candidates.
    ///
    /// Returns false when the loop should end (session gone or no longer
    /// active). Ticks outside the strategy's active hours, or on weekends
    /// for weekday-only strategies, plan nothing but keep the loop alive.
    pub async fn run_activity_tick(self: &Arc<Self>) -> bool {
        let hashtags = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let Some(session) = state.session.as_mut() else {
                return false;
            };
            if session.status != SessionStatus::Active {
                info!(
                    session_id = %session.id,
                    status = session.status.as_str(),
                    "Activity loop ending"
                );
                return false;
            }

            let now = self.clock.now();

            // Fresh budget when the UTC day rolls over.
            if state.budget_day != Some(now.date_naive()) {
                if let Some(budget) = state.budget.as_mut() {
                    budget.reset();
                    session.current_counts = budget.counts();
                }
                state.budget_day = Some(now.date_naive());
                info!(session_id = %session.id, "Daily budget reset");
            }

            if let Some(strategy) = &state.strategy {
                if !strategy.active_hours.contains(now.hour()) {
                    debug!(hour = now.hour(), "Outside active hours, skipping tick");
                    return true;
                }
                let weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
                if weekend && !strategy.weekend_activity {
                    debug!("Weekend activity disabled for this strategy, skipping tick");
                    return true;
                }
            }
            session.target_hashtags.clone()
        };

        let candidates = match self.targeting.find_targets(&hashtags, TARGETS_PER_TICK).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Target discovery failed, skipping tick");
                return true;
            }
        };

        let mut planned: Vec<(ActionType, TargetCandidate, Option<String>)> = Vec::new();
        for candidate in candidates {
            let rec = match self.targeting.recommend(&candidate).await {
                Ok(rec) => rec,
                Err(e) => {
                    warn!(target = %candidate.username, error = %e, "Recommendation failed");
                    continue;
                }
            };
            if rec.should_like {
                planned.push((ActionType::Like, candidate.clone(), None));
            }
            if rec.should_comment {
                let content = if rec.comment_suggestions.is_empty() {
                    None
                } else {
                    let idx = self.random.pick(rec.comment_suggestions.len());
                    Some(rec.comment_suggestions[idx].clone())
                };
                planned.push((ActionType::Comment, candidate.clone(), content));
            }
            if rec.should_follow {
                planned.push((ActionType::Follow, candidate.clone(), None));
            }
        }

        let to_execute = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let (Some(session), Some(budget), Some(strategy)) = (
                state.session.as_mut(),
                state.budget.as_ref(),
                state.strategy.as_ref(),
            ) else {
                return false;
            };
            if session.status != SessionStatus::Active {
                return false;
            }

            let mut to_execute = Vec::new();
            for (action_type, candidate, content) in planned {
                if !budget.has_budget(action_type) {
                    debug!(
                        action_type = action_type.as_str(),
                        "Daily budget exhausted, not planning"
                    );
                    continue;
                }
                let action = AutomationAction {
                    id: Uuid::new_v4().to_string(),
                    action_type,
                    target_username: candidate.username.clone(),
                    target_post_id: candidate.recent_post_id.clone(),
                    content,
                    timestamp: self.clock.now(),
                    status: ActionStatus::Pending,
                    failure_reason: None,
                    engagement: None,
                };
                let delay = self.pacing_delay(to_execute.len() as u64, strategy);
                to_execute.push((action.id.clone(), delay));
                session.actions_planned += 1;
                update_success_rate(session);
                state.history.push(action);
            }
            debug!(
                session_id = %session.id,
                planned = to_execute.len(),
                "Activity tick planned actions"
            );
            to_execute
        };

        // Fire-and-forget timers with human-like pacing; their completion
        // side effects are serialized through the state lock.
        for (action_id, delay_secs) in to_execute {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_secs(delay_secs)).await;
                manager.complete_action(&action_id).await;
            });
        }
        true
    }

    /// Delay before the `index`-th action planned in one tick executes.
    ///
    /// A randomized 10-40 s base, spaced out by the strategy's inter-action
    /// delay and jittered by its randomization factor.
    fn pacing_delay(&self, index: u64, strategy: &EngagementStrategy) -> u64 {
        let base = self
            .random
            .range_u64(MIN_ACTION_DELAY_SECS, MAX_ACTION_DELAY_SECS);
        let jitter_span =
            (strategy.action_delay_secs as f64 * strategy.randomization).round() as u64;
        let jitter = if jitter_span > 0 {
            self.random.range_u64(0, jitter_span)
        } else {
            0
        };
        base + index * strategy.action_delay_secs + jitter
    }

    /// Execute one pending action and apply the outcome.
    async fn complete_action(&self, action_id: &str) {
        let action = {
            let state = self.state.lock().await;
            let Some(action) = state.history.iter().find(|a| a.id == action_id) else {
                return;
            };
            if action.status != ActionStatus::Pending {
                // Emergency stop (or a duplicate timer) got here first.
                return;
            }
            action.clone()
        };

        let outcome = self.executor.execute(&action);

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let Some(stored) = state.history.iter_mut().find(|a| a.id == action_id) else {
            return;
        };
        if stored.status != ActionStatus::Pending {
            return;
        }

        match outcome.status {
            ActionStatus::Completed => {
                // Re-check under the lock: independent timers may have drained
                // the budget since this action was planned.
                let recorded = state
                    .budget
                    .as_mut()
                    .map(|b| b.record(action.action_type))
                    .unwrap_or(false);
                if !recorded {
                    stored.status = ActionStatus::Skipped;
                    stored.failure_reason = Some("Daily budget exhausted".to_string());
                    debug!(
                        action_id = %action_id,
                        action_type = action.action_type.as_str(),
                        "Budget exhausted at execution time, action skipped"
                    );
                    return;
                }
                stored.status = ActionStatus::Completed;
                stored.engagement = outcome.engagement;
                if let Some(session) = state.session.as_mut() {
                    session.actions_completed += 1;
                    if let Some(budget) = &state.budget {
                        session.current_counts = budget.counts();
                    }
                    update_success_rate(session);
                }
            }
            _ => {
                stored.status = ActionStatus::Failed;
                stored.failure_reason = outcome.failure_reason;
            }
        }
    }

    /// (Re)launch the activity loop.
    async fn spawn_activity_loop(self: &Arc<Self>, every: std::time::Duration) {
        let mut task = self.activity_task.write().await;
        if let Some(handle) = task.take() {
            handle.abort();
        }
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            // First tick one full interval after start
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            loop {
                ticker.tick().await;
                if !manager.run_activity_tick().await {
                    break;
                }
            }
        });
        info!(every_secs = every.as_secs(), "Activity loop started");
        *task = Some(handle.abort_handle());
    }

    /// Abort the activity loop task, for process shutdown.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.activity_task.write().await.take() {
            handle.abort();
            info!("Activity loop stopped");
        }
    }
}

fn update_success_rate(session: &mut AutomationSession) {
    session.success_rate = if session.actions_planned > 0 {
        f64::from(session.actions_completed) / f64::from(session.actions_planned)
    } else {
        0.0
    };
}
