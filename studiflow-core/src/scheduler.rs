//! Post scheduling.
//!
//! The [`PostScheduler`] owns the scheduled-post store, the weekly calendar
//! view, the auto-scheduling distribution and two background tasks: the
//! publish loop (every minute, promotes due posts via the publishing backend)
//! and the weekly auto-schedule trigger (Sunday mornings, pulls content ids
//! from the content source).
//!
//! All mutation paths go through the store mutex; reporting reads take a
//! consistent snapshot under the same lock.

use crate::collaborators::{ContentSource, PublishingBackend};
use crate::error::{Error, Result};
use crate::time::{self, Clock};
use crate::types::{
    CalendarDay, NewScheduledPost, PostPriority, PostStatus, PostingScheduleConfig,
    PostingScheduleUpdate, ScheduledPost, SchedulingStats,
};
use chrono::{DateTime, Datelike, Duration, IsoWeek, NaiveTime, Timelike, Utc, Weekday};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Cadence of the publish loop.
pub const PUBLISH_INTERVAL_SECS: u64 = 60;

/// Hour (UTC) on Sunday at which the weekly auto-schedule trigger fires.
pub const AUTO_SCHEDULE_HOUR: u32 = 10;

/// Owns the scheduled-post store and the publishing loops.
pub struct PostScheduler {
    posts: Mutex<Vec<ScheduledPost>>,
    config: RwLock<PostingScheduleConfig>,
    publisher: Arc<dyn PublishingBackend>,
    content: Arc<dyn ContentSource>,
    clock: Arc<dyn Clock>,
    /// Week the auto-schedule trigger last ran for.
    last_auto_schedule: Mutex<Option<IsoWeek>>,
    /// Skip-if-running guard so overlapping publish ticks cannot double-publish.
    tick_guard: Mutex<()>,
    publish_task: RwLock<Option<AbortHandle>>,
    weekly_task: RwLock<Option<AbortHandle>>,
}

impl PostScheduler {
    /// Create a scheduler with the default posting configuration.
    pub fn new(
        publisher: Arc<dyn PublishingBackend>,
        content: Arc<dyn ContentSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_config(publisher, content, clock, PostingScheduleConfig::default())
    }

    /// Create a scheduler with an explicit posting configuration.
    pub fn with_config(
        publisher: Arc<dyn PublishingBackend>,
        content: Arc<dyn ContentSource>,
        clock: Arc<dyn Clock>,
        config: PostingScheduleConfig,
    ) -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            config: RwLock::new(config),
            publisher,
            content,
            clock,
            last_auto_schedule: Mutex::new(None),
            tick_guard: Mutex::new(()),
            publish_task: RwLock::new(None),
            weekly_task: RwLock::new(None),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Store operations
    // ─────────────────────────────────────────────────────────────────────

    /// Enqueue a post for publishing.
    ///
    /// Assigns an id and creation timestamp and appends it to the store.
    /// Duplicate scheduling at identical timestamps is allowed.
    pub async fn schedule_post(&self, input: NewScheduledPost) -> ScheduledPost {
        let post = ScheduledPost {
            id: Uuid::new_v4().to_string(),
            content_id: input.content_id,
            title: input.title,
            body: input.body,
            hashtags: input.hashtags,
            image_ref: input.image_ref,
            scheduled_for: input.scheduled_for,
            status: PostStatus::Scheduled,
            priority: input.priority,
            platform: input.platform,
            campaign_id: input.campaign_id,
            created_at: self.clock.now(),
            posted_at: None,
            engagement: None,
        };
        info!(
            post_id = %post.id,
            scheduled_for = %post.scheduled_for,
            "Post scheduled"
        );
        let mut posts = self.posts.lock().await;
        posts.push(post.clone());
        post
    }

    /// Seven-day, Monday-first calendar view.
    ///
    /// Defaults to the Monday of the current week. Only posts with
    /// `scheduled_for` inside `[week_start, week_start + 7d)` appear,
    /// regardless of status; each day's posts are ascending by time.
    pub async fn get_weekly_calendar(
        &self,
        week_start: Option<DateTime<Utc>>,
    ) -> Vec<CalendarDay> {
        let start = week_start.unwrap_or_else(|| time::monday_of_week(self.clock.now()));
        let end = start + Duration::days(7);

        let mut days: Vec<CalendarDay> = (0..7)
            .map(|offset| {
                let date = (start + Duration::days(offset)).date_naive();
                CalendarDay {
                    date,
                    weekday: date.weekday(),
                    posts: Vec::new(),
                }
            })
            .collect();

        let posts = self.posts.lock().await;
        for post in posts.iter() {
            if post.scheduled_for < start || post.scheduled_for >= end {
                continue;
            }
            let offset = (post.scheduled_for.date_naive() - start.date_naive()).num_days();
            let idx = offset.clamp(0, 6) as usize;
            days[idx].posts.push(post.clone());
        }
        for day in &mut days {
            day.posts.sort_by_key(|p| p.scheduled_for);
        }
        days
    }

    /// Merge a partial update into the live posting configuration.
    ///
    /// Takes effect on the next auto-schedule run. Malformed values are a
    /// synchronous error; nothing is applied in that case.
    pub async fn update_posting_frequency(
        &self,
        update: PostingScheduleUpdate,
    ) -> Result<PostingScheduleConfig> {
        if let Some(per_week) = update.posts_per_week {
            if per_week == 0 {
                return Err(Error::InvalidConfig(
                    "postsPerWeek must be at least 1".to_string(),
                ));
            }
        }
        if let Some(times) = &update.preferred_times {
            if times.is_empty() {
                return Err(Error::InvalidConfig(
                    "preferredTimes must not be empty".to_string(),
                ));
            }
            for t in times {
                if time::parse_time_of_day(t).is_none() {
                    return Err(Error::InvalidTimeOfDay(t.clone()));
                }
            }
        }
        if let Some(hours) = update.min_hours_between_posts {
            if hours < 0 {
                return Err(Error::InvalidConfig(
                    "minHoursBetweenPosts must not be negative".to_string(),
                ));
            }
        }

        let mut config = self.config.write().await;
        if let Some(v) = update.posts_per_week {
            config.posts_per_week = v;
        }
        if let Some(v) = update.preferred_times {
            config.preferred_times = v;
        }
        if let Some(v) = update.exclude_days {
            config.exclude_days = v;
        }
        if let Some(v) = update.timezone {
            config.timezone = v;
        }
        if let Some(v) = update.auto_approve {
            config.auto_approve = v;
        }
        if let Some(v) = update.min_hours_between_posts {
            config.min_hours_between_posts = v;
        }
        info!(posts_per_week = config.posts_per_week, "Posting schedule updated");
        Ok(config.clone())
    }

    /// Distribute posts for the given content ids across the upcoming week.
    ///
    /// Schedules `min(content_ids.len(), posts_per_week)` posts. Post `i` of
    /// `n` lands on `available_days[i * available_days.len() / n]`, so the
    /// week is covered near-uniformly; times rotate through the preferred
    /// list. Two posts can share a day once `n` exceeds the available days.
    pub async fn auto_schedule_week(&self, content_ids: &[String]) -> Vec<ScheduledPost> {
        let config = self.config.read().await.clone();
        let n = content_ids.len().min(config.posts_per_week as usize);
        if n == 0 {
            return Vec::new();
        }

        let available: Vec<u32> = (0..7)
            .filter(|offset| {
                !config
                    .exclude_days
                    .contains(&time::weekday_from_monday_offset(*offset))
            })
            .collect();
        if available.is_empty() {
            warn!("All weekdays excluded; nothing auto-scheduled");
            return Vec::new();
        }

        let noon = NaiveTime::from_hms_opt(12, 0, 0).expect("noon is valid");
        let times: Vec<NaiveTime> = config
            .preferred_times
            .iter()
            .map(|t| {
                time::parse_time_of_day(t).unwrap_or_else(|| {
                    warn!(time = %t, "Unparseable preferred time, using 12:00");
                    noon
                })
            })
            .collect();
        let times = if times.is_empty() { vec![noon] } else { times };

        // Target the week after the current one so every slot is in the future.
        let week_start = time::monday_of_week(self.clock.now()) + Duration::days(7);

        let mut created = Vec::with_capacity(n);
        for (i, content_id) in content_ids.iter().take(n).enumerate() {
            let day = available[i * available.len() / n];
            let at = times[i % times.len()];
            let scheduled_for = week_start
                + Duration::days(day as i64)
                + Duration::seconds(at.num_seconds_from_midnight() as i64);
            let post = self
                .schedule_post(NewScheduledPost {
                    content_id: content_id.clone(),
                    title: format!("Auto-scheduled: {content_id}"),
                    body: String::new(),
                    hashtags: Vec::new(),
                    image_ref: None,
                    scheduled_for,
                    priority: PostPriority::Medium,
                    platform: "instagram".to_string(),
                    campaign_id: None,
                })
                .await;
            created.push(post);
        }
        info!(count = created.len(), week_start = %week_start, "Auto-scheduled week");
        created
    }

    /// All posts of the current UTC day, any status, ascending by time.
    pub async fn get_todays_posts(&self) -> Vec<ScheduledPost> {
        let start = time::start_of_day(self.clock.now());
        let end = start + Duration::days(1);
        let posts = self.posts.lock().await;
        let mut todays: Vec<ScheduledPost> = posts
            .iter()
            .filter(|p| p.scheduled_for >= start && p.scheduled_for < end)
            .cloned()
            .collect();
        todays.sort_by_key(|p| p.scheduled_for);
        todays
    }

    /// Scheduled-status posts of the next seven days, ascending by time.
    pub async fn get_upcoming_posts(&self) -> Vec<ScheduledPost> {
        let now = self.clock.now();
        let end = now + Duration::days(7);
        let posts = self.posts.lock().await;
        let mut upcoming: Vec<ScheduledPost> = posts
            .iter()
            .filter(|p| {
                p.status == PostStatus::Scheduled && p.scheduled_for >= now && p.scheduled_for < end
            })
            .cloned()
            .collect();
        upcoming.sort_by_key(|p| p.scheduled_for);
        upcoming
    }

    /// Move a post to a new publish time.
    ///
    /// Returns false for unknown ids and for posts that already left the
    /// `scheduled` status (a posted/cancelled post cannot be rescheduled).
    pub async fn reschedule_post(&self, id: &str, new_time: DateTime<Utc>) -> bool {
        let mut posts = self.posts.lock().await;
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            debug!(post_id = %id, "Reschedule: post not found");
            return false;
        };
        if post.status != PostStatus::Scheduled {
            warn!(
                post_id = %id,
                status = post.status.as_str(),
                "Refusing to reschedule a post that is no longer scheduled"
            );
            return false;
        }
        post.scheduled_for = new_time;
        info!(post_id = %id, new_time = %new_time, "Post rescheduled");
        true
    }

    /// Cancel a scheduled post. Returns false for unknown ids and for posts
    /// no longer in `scheduled` status (idempotent no-op on invalid
    /// transitions).
    pub async fn cancel_post(&self, id: &str) -> bool {
        let mut posts = self.posts.lock().await;
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            debug!(post_id = %id, "Cancel: post not found");
            return false;
        };
        if post.status != PostStatus::Scheduled {
            debug!(
                post_id = %id,
                status = post.status.as_str(),
                "Cancel: post is not in scheduled status"
            );
            return false;
        }
        post.status = PostStatus::Cancelled;
        info!(post_id = %id, "Post cancelled");
        true
    }

    /// Snapshot of the scheduling state.
    pub async fn get_scheduling_stats(&self) -> SchedulingStats {
        let now = self.clock.now();
        let today_start = time::start_of_day(now);
        let today_end = today_start + Duration::days(1);
        let upcoming_end = now + Duration::days(7);

        let posts = self.posts.lock().await;
        let mut stats = SchedulingStats {
            scheduled: 0,
            posted: 0,
            failed: 0,
            cancelled: 0,
            today: 0,
            upcoming: 0,
            posts_per_week: self.config.read().await.posts_per_week,
            next_post: None,
        };
        for post in posts.iter() {
            match post.status {
                PostStatus::Scheduled => stats.scheduled += 1,
                PostStatus::Posted => stats.posted += 1,
                PostStatus::Failed => stats.failed += 1,
                PostStatus::Cancelled => stats.cancelled += 1,
            }
            if post.scheduled_for >= today_start && post.scheduled_for < today_end {
                stats.today += 1;
            }
            if post.status == PostStatus::Scheduled
                && post.scheduled_for >= now
                && post.scheduled_for < upcoming_end
            {
                stats.upcoming += 1;
            }
            if post.status == PostStatus::Scheduled {
                let is_earlier = stats
                    .next_post
                    .as_ref()
                    .map(|next| post.scheduled_for < next.scheduled_for)
                    .unwrap_or(true);
                if is_earlier {
                    stats.next_post = Some(post.clone());
                }
            }
        }
        stats
    }

    // ─────────────────────────────────────────────────────────────────────
    // Publish loop
    // ─────────────────────────────────────────────────────────────────────

    /// One publish tick: promote every due scheduled post.
    ///
    /// Failures are per-post; one failing post never blocks the rest of the
    /// tick. Returns the number of posts that reached `posted`. If another
    /// tick is still running this one is skipped entirely.
    pub async fn publish_due(&self) -> usize {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            debug!("Publish tick already running, skipping");
            return 0;
        };

        let now = self.clock.now();
        let due: Vec<ScheduledPost> = {
            let posts = self.posts.lock().await;
            posts
                .iter()
                .filter(|p| p.status == PostStatus::Scheduled && p.scheduled_for <= now)
                .cloned()
                .collect()
        };
        if due.is_empty() {
            return 0;
        }
        info!(count = due.len(), "Publishing due posts");

        let mut published = 0;
        for post in due {
            let result = self.publisher.publish(&post).await;

            let mut posts = self.posts.lock().await;
            let Some(stored) = posts.iter_mut().find(|p| p.id == post.id) else {
                continue;
            };
            // Re-check under the lock so a post another path already
            // transitioned is never published twice.
            if stored.status != PostStatus::Scheduled {
                debug!(post_id = %stored.id, "Post already transitioned, skipping");
                continue;
            }
            match result {
                Ok(snapshot) => {
                    stored.status = PostStatus::Posted;
                    stored.posted_at = Some(self.clock.now());
                    stored.engagement = Some(snapshot);
                    published += 1;
                    info!(post_id = %stored.id, reach = snapshot.reach, "Post published");
                }
                Err(e) => {
                    stored.status = PostStatus::Failed;
                    error!(post_id = %stored.id, error = %e, "Publishing failed");
                }
            }
        }
        published
    }

    /// One weekly-trigger tick.
    ///
    /// Fires at most once per ISO week, on Sunday at or after
    /// [`AUTO_SCHEDULE_HOUR`] UTC. Returns true if auto-scheduling ran.
    pub async fn run_weekly_tick(&self) -> bool {
        let now = self.clock.now();
        if now.weekday() != Weekday::Sun || now.hour() < AUTO_SCHEDULE_HOUR {
            return false;
        }
        {
            let last = self.last_auto_schedule.lock().await;
            if *last == Some(now.iso_week()) {
                return false;
            }
        }

        let limit = self.config.read().await.posts_per_week as usize;
        match self.content.pending_content_ids(limit).await {
            Ok(ids) => {
                let created = self.auto_schedule_week(&ids).await;
                info!(
                    content_items = ids.len(),
                    scheduled = created.len(),
                    "Weekly auto-schedule trigger ran"
                );
                *self.last_auto_schedule.lock().await = Some(now.iso_week());
                true
            }
            Err(e) => {
                // Not marked as run; the trigger retries on the next tick.
                error!(error = %e, "Weekly auto-schedule failed to fetch content");
                false
            }
        }
    }

    /// Start the publish loop with the given tick interval.
    pub async fn start_publish_loop(self: &Arc<Self>, every: std::time::Duration) {
        let mut task = self.publish_task.write().await;
        if let Some(handle) = task.take() {
            handle.abort();
        }
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                scheduler.publish_due().await;
            }
        });
        info!(every_secs = every.as_secs(), "Publish loop started");
        *task = Some(handle.abort_handle());
    }

    /// Start the weekly auto-schedule trigger with the given check interval.
    pub async fn start_weekly_loop(self: &Arc<Self>, every: std::time::Duration) {
        let mut task = self.weekly_task.write().await;
        if let Some(handle) = task.take() {
            handle.abort();
        }
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                scheduler.run_weekly_tick().await;
            }
        });
        info!("Weekly auto-schedule trigger started");
        *task = Some(handle.abort_handle());
    }

    /// Stop both background tasks.
    pub async fn stop(&self) {
        if let Some(handle) = self.publish_task.write().await.take() {
            handle.abort();
            info!("Publish loop stopped");
        }
        if let Some(handle) = self.weekly_task.write().await.take() {
            handle.abort();
            info!("Weekly auto-schedule trigger stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FailingPublisher, SimulatedPublisher, StaticContentSource};
    use crate::error::Result as CoreResult;
    use crate::executor::{FixedRandom, ThreadRandom};
    use crate::time::ManualClock;
    use crate::types::EngagementSnapshot;
    use async_trait::async_trait;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    // Wednesday, 2025-03-12
    const MIDWEEK: &str = "2025-03-12T08:00:00Z";

    fn new_post(scheduled_for: &str) -> NewScheduledPost {
        NewScheduledPost {
            content_id: "content-1".to_string(),
            title: "Prüfungsphase überleben".to_string(),
            body: "5 Tipps für die Klausurwoche".to_string(),
            hashtags: vec!["#studium".to_string(), "#klausur".to_string()],
            image_ref: None,
            scheduled_for: ts(scheduled_for),
            priority: PostPriority::Medium,
            platform: "instagram".to_string(),
            campaign_id: None,
        }
    }

    fn scheduler_at(now: &str) -> Arc<PostScheduler> {
        let random = Arc::new(FixedRandom::always(0.5));
        Arc::new(PostScheduler::new(
            Arc::new(SimulatedPublisher::new(random)),
            Arc::new(StaticContentSource::default()),
            Arc::new(ManualClock::new(ts(now))),
        ))
    }

    #[tokio::test]
    async fn test_schedule_post_assigns_id_and_status() {
        let scheduler = scheduler_at(MIDWEEK);
        let post = scheduler.schedule_post(new_post("2025-03-13T09:00:00Z")).await;
        assert!(!post.id.is_empty());
        assert_eq!(post.status, PostStatus::Scheduled);
        assert_eq!(post.created_at, ts(MIDWEEK));
        assert!(post.posted_at.is_none());
        assert!(post.engagement.is_none());
    }

    #[tokio::test]
    async fn test_weekly_calendar_buckets_and_bounds() {
        let scheduler = scheduler_at(MIDWEEK);
        // Week of Monday 2025-03-10
        scheduler.schedule_post(new_post("2025-03-10T09:00:00Z")).await;
        scheduler.schedule_post(new_post("2025-03-10T17:00:00Z")).await;
        scheduler.schedule_post(new_post("2025-03-16T12:00:00Z")).await;
        // Outside the week on both sides
        scheduler.schedule_post(new_post("2025-03-09T23:59:00Z")).await;
        scheduler.schedule_post(new_post("2025-03-17T00:00:00Z")).await;

        let calendar = scheduler.get_weekly_calendar(None).await;
        assert_eq!(calendar.len(), 7);
        assert_eq!(calendar[0].weekday, Weekday::Mon);
        assert_eq!(calendar[0].date, ts("2025-03-10T00:00:00Z").date_naive());

        let total: usize = calendar.iter().map(|d| d.posts.len()).sum();
        assert_eq!(total, 3);
        assert_eq!(calendar[0].posts.len(), 2);
        assert_eq!(calendar[6].posts.len(), 1);
        // Ascending within the day
        assert!(calendar[0].posts[0].scheduled_for < calendar[0].posts[1].scheduled_for);
    }

    #[tokio::test]
    async fn test_weekly_calendar_includes_all_statuses() {
        let scheduler = scheduler_at(MIDWEEK);
        let post = scheduler.schedule_post(new_post("2025-03-11T09:00:00Z")).await;
        scheduler.cancel_post(&post.id).await;

        let calendar = scheduler.get_weekly_calendar(None).await;
        assert_eq!(calendar[1].posts.len(), 1);
        assert_eq!(calendar[1].posts[0].status, PostStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_auto_schedule_week_even_distribution() {
        let scheduler = scheduler_at(MIDWEEK);
        let ids: Vec<String> = (1..=4).map(|i| format!("content-{i}")).collect();
        let created = scheduler.auto_schedule_week(&ids).await;
        assert_eq!(created.len(), 4);

        let week_start = time::monday_of_week(ts(MIDWEEK)) + Duration::days(7);
        let offsets: Vec<i64> = created
            .iter()
            .map(|p| (p.scheduled_for.date_naive() - week_start.date_naive()).num_days())
            .collect();
        // floor(i * 7 / 4) for i in 0..4
        assert_eq!(offsets, vec![0, 1, 3, 5]);
        let distinct: std::collections::HashSet<i64> = offsets.iter().copied().collect();
        assert!(distinct.len() >= 3);
        // All in the upcoming week, all still scheduled
        for post in &created {
            assert!(post.scheduled_for >= week_start);
            assert!(post.scheduled_for < week_start + Duration::days(7));
            assert_eq!(post.status, PostStatus::Scheduled);
        }
    }

    #[tokio::test]
    async fn test_auto_schedule_respects_excluded_days() {
        let scheduler = scheduler_at(MIDWEEK);
        scheduler
            .update_posting_frequency(PostingScheduleUpdate {
                exclude_days: Some(vec![Weekday::Sat, Weekday::Sun]),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<String> = (1..=4).map(|i| format!("content-{i}")).collect();
        let created = scheduler.auto_schedule_week(&ids).await;

        for post in &created {
            let weekday = post.scheduled_for.weekday();
            assert_ne!(weekday, Weekday::Sat);
            assert_ne!(weekday, Weekday::Sun);
        }
    }

    #[tokio::test]
    async fn test_auto_schedule_caps_at_posts_per_week() {
        let scheduler = scheduler_at(MIDWEEK);
        let ids: Vec<String> = (1..=10).map(|i| format!("content-{i}")).collect();
        let created = scheduler.auto_schedule_week(&ids).await;
        assert_eq!(created.len(), 4); // default postsPerWeek
    }

    #[tokio::test]
    async fn test_auto_schedule_rotates_preferred_times() {
        let scheduler = scheduler_at(MIDWEEK);
        let ids: Vec<String> = (1..=4).map(|i| format!("content-{i}")).collect();
        let created = scheduler.auto_schedule_week(&ids).await;
        // Default times are 09:00, 12:30, 17:00, then wrap back to 09:00
        assert_eq!(created[0].scheduled_for.time(), created[3].scheduled_for.time());
        assert_ne!(created[0].scheduled_for.time(), created[1].scheduled_for.time());
    }

    #[tokio::test]
    async fn test_update_posting_frequency_merges_and_validates() {
        let scheduler = scheduler_at(MIDWEEK);
        let config = scheduler
            .update_posting_frequency(PostingScheduleUpdate {
                posts_per_week: Some(5),
                timezone: Some("Europe/Vienna".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(config.posts_per_week, 5);
        assert_eq!(config.timezone, "Europe/Vienna");
        // Untouched fields keep their values
        assert_eq!(config.preferred_times.len(), 3);

        let err = scheduler
            .update_posting_frequency(PostingScheduleUpdate {
                posts_per_week: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = scheduler
            .update_posting_frequency(PostingScheduleUpdate {
                preferred_times: Some(vec!["25:99".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTimeOfDay(_)));
    }

    #[tokio::test]
    async fn test_todays_and_upcoming_posts() {
        let scheduler = scheduler_at(MIDWEEK);
        scheduler.schedule_post(new_post("2025-03-12T06:00:00Z")).await; // today, past
        scheduler.schedule_post(new_post("2025-03-12T20:00:00Z")).await; // today, future
        scheduler.schedule_post(new_post("2025-03-15T10:00:00Z")).await; // upcoming
        scheduler.schedule_post(new_post("2025-03-25T10:00:00Z")).await; // beyond 7 days

        let todays = scheduler.get_todays_posts().await;
        assert_eq!(todays.len(), 2);
        assert!(todays[0].scheduled_for < todays[1].scheduled_for);

        let upcoming = scheduler.get_upcoming_posts().await;
        assert_eq!(upcoming.len(), 2); // today's future post + the 15th
        assert!(upcoming.iter().all(|p| p.status == PostStatus::Scheduled));
    }

    #[tokio::test]
    async fn test_reschedule_post() {
        let scheduler = scheduler_at(MIDWEEK);
        let post = scheduler.schedule_post(new_post("2025-03-13T09:00:00Z")).await;

        assert!(scheduler.reschedule_post(&post.id, ts("2025-03-14T10:00:00Z")).await);
        assert!(!scheduler.reschedule_post("no-such-id", ts("2025-03-14T10:00:00Z")).await);

        // A cancelled post cannot be rescheduled
        scheduler.cancel_post(&post.id).await;
        assert!(!scheduler.reschedule_post(&post.id, ts("2025-03-15T10:00:00Z")).await);
    }

    #[tokio::test]
    async fn test_cancel_posted_post_is_a_no_op() {
        let scheduler = scheduler_at(MIDWEEK);
        let post = scheduler.schedule_post(new_post("2025-03-12T07:00:00Z")).await;
        assert_eq!(scheduler.publish_due().await, 1);

        assert!(!scheduler.cancel_post(&post.id).await);
        let stats = scheduler.get_scheduling_stats().await;
        assert_eq!(stats.posted, 1);
        assert_eq!(stats.cancelled, 0);
    }

    #[tokio::test]
    async fn test_publish_due_promotes_and_attaches_engagement() {
        let scheduler = scheduler_at(MIDWEEK);
        let post = scheduler.schedule_post(new_post("2025-03-12T07:59:00Z")).await;
        let future = scheduler.schedule_post(new_post("2025-03-12T20:00:00Z")).await;

        assert_eq!(scheduler.publish_due().await, 1);

        let todays = scheduler.get_todays_posts().await;
        let published = todays.iter().find(|p| p.id == post.id).unwrap();
        assert_eq!(published.status, PostStatus::Posted);
        assert_eq!(published.posted_at, Some(ts(MIDWEEK)));
        assert!(published.engagement.is_some());

        let pending = todays.iter().find(|p| p.id == future.id).unwrap();
        assert_eq!(pending.status, PostStatus::Scheduled);

        // Already-transitioned posts are not re-published
        assert_eq!(scheduler.publish_due().await, 0);
    }

    /// Publisher that fails for one specific post id.
    struct FlakyPublisher {
        fail_id: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl crate::collaborators::PublishingBackend for FlakyPublisher {
        async fn publish(&self, post: &ScheduledPost) -> CoreResult<EngagementSnapshot> {
            let fail_id = self.fail_id.lock().unwrap().clone();
            if fail_id.as_deref() == Some(post.id.as_str()) {
                return Err(Error::Publish("temporary platform error".to_string()));
            }
            Ok(EngagementSnapshot::default())
        }
    }

    #[tokio::test]
    async fn test_publish_failure_is_isolated_per_post() {
        let publisher = Arc::new(FlakyPublisher {
            fail_id: std::sync::Mutex::new(None),
        });
        let scheduler = Arc::new(PostScheduler::new(
            publisher.clone(),
            Arc::new(StaticContentSource::default()),
            Arc::new(ManualClock::new(ts(MIDWEEK))),
        ));
        let good = scheduler.schedule_post(new_post("2025-03-12T06:00:00Z")).await;
        let bad = scheduler.schedule_post(new_post("2025-03-12T06:30:00Z")).await;
        *publisher.fail_id.lock().unwrap() = Some(bad.id.clone());

        assert_eq!(scheduler.publish_due().await, 1);

        let stats = scheduler.get_scheduling_stats().await;
        assert_eq!(stats.posted, 1);
        assert_eq!(stats.failed, 1);
        let todays = scheduler.get_todays_posts().await;
        assert_eq!(
            todays.iter().find(|p| p.id == good.id).unwrap().status,
            PostStatus::Posted
        );
        assert_eq!(
            todays.iter().find(|p| p.id == bad.id).unwrap().status,
            PostStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_failed_posts_are_not_retried() {
        let scheduler = Arc::new(PostScheduler::new(
            Arc::new(FailingPublisher),
            Arc::new(StaticContentSource::default()),
            Arc::new(ManualClock::new(ts(MIDWEEK))),
        ));
        scheduler.schedule_post(new_post("2025-03-12T06:00:00Z")).await;
        assert_eq!(scheduler.publish_due().await, 0);
        assert_eq!(scheduler.get_scheduling_stats().await.failed, 1);
        // The failed post stays failed; the next tick finds nothing due.
        assert_eq!(scheduler.publish_due().await, 0);
        assert_eq!(scheduler.get_scheduling_stats().await.failed, 1);
    }

    #[tokio::test]
    async fn test_scheduling_stats_next_post() {
        let scheduler = scheduler_at(MIDWEEK);
        scheduler.schedule_post(new_post("2025-03-14T09:00:00Z")).await;
        let earlier = scheduler.schedule_post(new_post("2025-03-13T09:00:00Z")).await;

        let stats = scheduler.get_scheduling_stats().await;
        assert_eq!(stats.scheduled, 2);
        assert_eq!(stats.next_post.unwrap().id, earlier.id);
        assert_eq!(stats.posts_per_week, 4);
    }

    #[tokio::test]
    async fn test_weekly_trigger_runs_once_per_week() {
        let clock = Arc::new(ManualClock::new(ts("2025-03-16T10:05:00Z"))); // Sunday
        let scheduler = Arc::new(PostScheduler::new(
            Arc::new(SimulatedPublisher::new(Arc::new(ThreadRandom))),
            Arc::new(StaticContentSource::new(vec![
                "c1".to_string(),
                "c2".to_string(),
                "c3".to_string(),
                "c4".to_string(),
            ])),
            clock.clone(),
        ));

        assert!(scheduler.run_weekly_tick().await);
        assert_eq!(scheduler.get_scheduling_stats().await.scheduled, 4);

        // Same Sunday, an hour later: already ran this week
        clock.advance(Duration::hours(1));
        assert!(!scheduler.run_weekly_tick().await);
        assert_eq!(scheduler.get_scheduling_stats().await.scheduled, 4);

        // Next Sunday it fires again
        clock.advance(Duration::days(7));
        assert!(scheduler.run_weekly_tick().await);
        assert_eq!(scheduler.get_scheduling_stats().await.scheduled, 8);
    }

    #[tokio::test]
    async fn test_weekly_trigger_only_fires_sunday_morning() {
        let scheduler = scheduler_at(MIDWEEK); // Wednesday
        assert!(!scheduler.run_weekly_tick().await);

        let clock = Arc::new(ManualClock::new(ts("2025-03-16T08:00:00Z"))); // Sunday, too early
        let scheduler = Arc::new(PostScheduler::new(
            Arc::new(SimulatedPublisher::new(Arc::new(ThreadRandom))),
            Arc::new(StaticContentSource::new(vec!["c1".to_string()])),
            clock.clone(),
        ));
        assert!(!scheduler.run_weekly_tick().await);
        clock.set(ts("2025-03-16T10:00:00Z"));
        assert!(scheduler.run_weekly_tick().await);
    }
}
