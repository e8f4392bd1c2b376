//! Shared types for studiflow-core.
//!
//! These types cross the boundary to the (out-of-scope) API layer, so they
//! all carry serde derives with camelCase renaming.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Scheduled Posts
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle status of a scheduled post.
///
/// The only legal transitions are `scheduled → posted`, `scheduled → failed`
/// and `scheduled → cancelled`. Posts are never deleted; terminal statuses
/// are retained for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Scheduled,
    Posted,
    Failed,
    Cancelled,
}

impl PostStatus {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Scheduled => "scheduled",
            PostStatus::Posted => "posted",
            PostStatus::Failed => "failed",
            PostStatus::Cancelled => "cancelled",
        }
    }
}

/// Priority of a scheduled post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostPriority {
    High,
    Medium,
    Low,
}

/// Engagement numbers attached to a post after publishing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
    pub reach: u32,
}

/// A content item with a target publish time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPost {
    pub id: String,
    /// Reference to the external content item this post was generated from.
    pub content_id: String,
    pub title: String,
    pub body: String,
    pub hashtags: Vec<String>,
    pub image_ref: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub status: PostStatus,
    pub priority: PostPriority,
    pub platform: String,
    pub campaign_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set iff status is `posted`.
    pub posted_at: Option<DateTime<Utc>>,
    /// Present only if status is `posted`.
    pub engagement: Option<EngagementSnapshot>,
}

/// Input for creating a new scheduled post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduledPost {
    pub content_id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub image_ref: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub priority: PostPriority,
    pub platform: String,
    pub campaign_id: Option<String>,
}

/// One day of the weekly calendar view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: chrono::NaiveDate,
    pub weekday: Weekday,
    /// Posts scheduled for this day, ascending by time.
    pub posts: Vec<ScheduledPost>,
}

/// Aggregate view of the scheduling store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingStats {
    pub scheduled: usize,
    pub posted: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub today: usize,
    pub upcoming: usize,
    pub posts_per_week: u32,
    /// The next post still in `scheduled` status, by time.
    pub next_post: Option<ScheduledPost>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Posting Schedule Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Process-wide posting schedule configuration.
///
/// Read by the auto-scheduling algorithm; mutated only through
/// `PostScheduler::update_posting_frequency`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingScheduleConfig {
    /// Target number of auto-scheduled posts per week.
    pub posts_per_week: u32,
    /// Ordered preferred times of day, `HH:MM`.
    pub preferred_times: Vec<String>,
    /// Weekdays excluded from auto-scheduling.
    #[serde(default)]
    pub exclude_days: Vec<Weekday>,
    /// IANA timezone name of the audience (informational).
    pub timezone: String,
    /// Whether auto-scheduled posts go out without manual review.
    pub auto_approve: bool,
    /// Minimum spacing between posts, in hours.
    pub min_hours_between_posts: i64,
}

impl Default for PostingScheduleConfig {
    fn default() -> Self {
        Self {
            posts_per_week: 4,
            preferred_times: vec![
                "09:00".to_string(),
                "12:30".to_string(),
                "17:00".to_string(),
            ],
            exclude_days: Vec::new(),
            timezone: "Europe/Berlin".to_string(),
            auto_approve: true,
            min_hours_between_posts: 6,
        }
    }
}

/// Partial update merged into the live [`PostingScheduleConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingScheduleUpdate {
    pub posts_per_week: Option<u32>,
    pub preferred_times: Option<Vec<String>>,
    pub exclude_days: Option<Vec<Weekday>>,
    pub timezone: Option<String>,
    pub auto_approve: Option<bool>,
    pub min_hours_between_posts: Option<i64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Automation Sessions & Actions
// ─────────────────────────────────────────────────────────────────────────────

/// Status of an automation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
    /// Terminal state entered by an emergency stop.
    Error,
}

impl SessionStatus {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        }
    }

    /// Whether the session can still make progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Error)
    }
}

/// Kind of engagement action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Like,
    Comment,
    Follow,
    Unfollow,
    ViewStory,
    Dm,
}

impl ActionType {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Like => "like",
            ActionType::Comment => "comment",
            ActionType::Follow => "follow",
            ActionType::Unfollow => "unfollow",
            ActionType::ViewStory => "view_story",
            ActionType::Dm => "dm",
        }
    }
}

/// Status of one automation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Completed,
    Failed,
    Skipped,
}

/// Synthetic engagement received back from one successful action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementOutcome {
    pub likes: u32,
    pub comments: u32,
    pub saves: u32,
}

/// One attempted engagement action.
///
/// Immutable once it reaches `completed`, `failed` or `skipped`; appended to
/// the session's chronological action history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationAction {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub target_username: String,
    pub target_post_id: Option<String>,
    /// Text for comment/dm actions.
    pub content: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: ActionStatus,
    pub failure_reason: Option<String>,
    pub engagement: Option<EngagementOutcome>,
}

/// Per-action-type counters, used for both daily limits and current counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub likes: u32,
    pub follows: u32,
    pub comments: u32,
    pub unfollows: u32,
}

impl ActionCounts {
    /// Counter for a budgeted action type; `None` for unbudgeted types
    /// (story views and DMs are not rate-limited).
    pub fn get(&self, action_type: ActionType) -> Option<u32> {
        match action_type {
            ActionType::Like => Some(self.likes),
            ActionType::Follow => Some(self.follows),
            ActionType::Comment => Some(self.comments),
            ActionType::Unfollow => Some(self.unfollows),
            ActionType::ViewStory | ActionType::Dm => None,
        }
    }

    /// Increment the counter for a budgeted action type.
    pub fn bump(&mut self, action_type: ActionType) {
        match action_type {
            ActionType::Like => self.likes += 1,
            ActionType::Follow => self.follows += 1,
            ActionType::Comment => self.comments += 1,
            ActionType::Unfollow => self.unfollows += 1,
            ActionType::ViewStory | ActionType::Dm => {}
        }
    }

    /// Sum across all budgeted types.
    pub fn total(&self) -> u32 {
        self.likes + self.follows + self.comments + self.unfollows
    }
}

/// One automation run with its own rate budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSession {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub actions_completed: u32,
    pub actions_planned: u32,
    /// Derived: `actions_completed / actions_planned`, 0.0 when nothing planned.
    pub success_rate: f64,
    pub strategy_name: String,
    pub target_hashtags: Vec<String>,
    pub daily_limits: ActionCounts,
    /// Invariant while active: `current_counts[k] <= daily_limits[k]` for all k.
    pub current_counts: ActionCounts,
}

/// Aggregate view of the automation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationStats {
    pub session_id: Option<String>,
    pub session_status: Option<SessionStatus>,
    pub actions_planned: u32,
    pub actions_completed: u32,
    pub actions_failed: u32,
    pub actions_skipped: u32,
    pub success_rate: f64,
    /// Actions attempted (completed or failed) during the current UTC day.
    pub actions_today: u32,
    /// Completed actions today, by budgeted type.
    pub counts_today: ActionCounts,
}
