//! Collaborator contracts consumed by the engine.
//!
//! The engine never talks to the social platform directly. Publishing,
//! content supply and target discovery are injected behind these traits; the
//! simulated implementations below back the daemon binary and the tests, and
//! a production deployment swaps in real platform clients.

use crate::error::{Error, Result};
use crate::executor::RandomSource;
use crate::types::{EngagementSnapshot, ScheduledPost};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Supplies content identifiers for auto-scheduling.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Ordered list of opaque content ids, at most `limit` of them.
    async fn pending_content_ids(&self, limit: usize) -> Result<Vec<String>>;
}

/// Performs the actual platform post for a due scheduled post.
#[async_trait]
pub trait PublishingBackend: Send + Sync {
    /// Publish the post, returning the initial engagement snapshot.
    ///
    /// Any error is treated by the publish loop as a per-post terminal
    /// failure; there is no retry at this layer.
    async fn publish(&self, post: &ScheduledPost) -> Result<EngagementSnapshot>;
}

/// A candidate account the automation may engage with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCandidate {
    pub username: String,
    /// Relevance score (0.0 - 1.0) against the session's hashtags.
    pub relevance: f64,
    /// Most recent post of the candidate, if known.
    pub recent_post_id: Option<String>,
}

/// Engagement recommendation for one candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRecommendation {
    pub should_like: bool,
    pub should_follow: bool,
    pub should_comment: bool,
    pub comment_suggestions: Vec<String>,
}

/// Discovers candidate accounts and recommends engagement per candidate.
#[async_trait]
pub trait TargetingService: Send + Sync {
    /// Up to `count` candidates relevant to the given hashtags.
    async fn find_targets(
        &self,
        hashtags: &[String],
        count: usize,
    ) -> Result<Vec<TargetCandidate>>;

    /// Engagement recommendation for one candidate.
    async fn recommend(&self, candidate: &TargetCandidate) -> Result<EngagementRecommendation>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulated implementations
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed content id list, drained in order.
#[derive(Debug, Clone, Default)]
pub struct StaticContentSource {
    ids: Vec<String>,
}

impl StaticContentSource {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }
}

#[async_trait]
impl ContentSource for StaticContentSource {
    async fn pending_content_ids(&self, limit: usize) -> Result<Vec<String>> {
        Ok(self.ids.iter().take(limit).cloned().collect())
    }
}

/// Publishing backend that always succeeds with a synthetic snapshot.
pub struct SimulatedPublisher {
    random: Arc<dyn RandomSource>,
}

impl SimulatedPublisher {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }
}

#[async_trait]
impl PublishingBackend for SimulatedPublisher {
    async fn publish(&self, post: &ScheduledPost) -> Result<EngagementSnapshot> {
        let reach = 200 + self.random.range_u64(0, 800) as u32;
        let snapshot = EngagementSnapshot {
            likes: 10 + self.random.range_u64(0, 60) as u32,
            comments: self.random.range_u64(0, 8) as u32,
            shares: self.random.range_u64(0, 5) as u32,
            reach,
        };
        debug!(post_id = %post.id, reach = snapshot.reach, "Simulated publish");
        Ok(snapshot)
    }
}

/// Publishing backend that always fails. Test helper.
#[derive(Debug, Clone, Default)]
pub struct FailingPublisher;

#[async_trait]
impl PublishingBackend for FailingPublisher {
    async fn publish(&self, post: &ScheduledPost) -> Result<EngagementSnapshot> {
        Err(Error::Publish(format!(
            "platform rejected post {}",
            post.id
        )))
    }
}

/// Targeting service that fabricates plausible candidates.
pub struct SimulatedTargeting {
    random: Arc<dyn RandomSource>,
}

impl SimulatedTargeting {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }
}

#[async_trait]
impl TargetingService for SimulatedTargeting {
    async fn find_targets(
        &self,
        hashtags: &[String],
        count: usize,
    ) -> Result<Vec<TargetCandidate>> {
        let tag = hashtags
            .first()
            .map(|t| t.trim_start_matches('#').to_string())
            .unwrap_or_else(|| "studium".to_string());
        let candidates = (0..count)
            .map(|_| {
                let n = self.random.range_u64(1000, 10_000);
                TargetCandidate {
                    username: format!("{tag}_{n}"),
                    relevance: 0.5 + self.random.next_f64() * 0.5,
                    recent_post_id: Some(format!("post_{}", self.random.range_u64(1, 100_000))),
                }
            })
            .collect();
        Ok(candidates)
    }

    async fn recommend(&self, candidate: &TargetCandidate) -> Result<EngagementRecommendation> {
        // Highly relevant candidates get the full treatment, the rest a like.
        let relevant = candidate.relevance > 0.75;
        Ok(EngagementRecommendation {
            should_like: true,
            should_follow: relevant && self.random.next_f64() < 0.4,
            should_comment: relevant && self.random.next_f64() < 0.3,
            comment_suggestions: vec![
                "Super hilfreich, danke!".to_string(),
                "Toller Beitrag 👌".to_string(),
                "Genau was ich gesucht habe!".to_string(),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ThreadRandom;

    #[tokio::test]
    async fn test_static_content_source_respects_limit() {
        let source = StaticContentSource::new(vec![
            "c1".to_string(),
            "c2".to_string(),
            "c3".to_string(),
        ]);
        let ids = source.pending_content_ids(2).await.unwrap();
        assert_eq!(ids, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[tokio::test]
    async fn test_simulated_targeting_count_and_tag() {
        let targeting = SimulatedTargeting::new(Arc::new(ThreadRandom));
        let targets = targeting
            .find_targets(&["#klausurphase".to_string()], 4)
            .await
            .unwrap();
        assert_eq!(targets.len(), 4);
        assert!(targets[0].username.starts_with("klausurphase_"));
    }

    #[tokio::test]
    async fn test_failing_publisher_is_an_error() {
        use crate::types::{PostPriority, PostStatus};

        let publisher = FailingPublisher;
        let post = ScheduledPost {
            id: "p1".to_string(),
            content_id: "c1".to_string(),
            title: "Lernplan für die Klausurphase".to_string(),
            body: String::new(),
            hashtags: vec!["#studium".to_string()],
            image_ref: None,
            scheduled_for: "2030-01-01T10:00:00Z".parse().unwrap(),
            status: PostStatus::Scheduled,
            priority: PostPriority::Medium,
            platform: "instagram".to_string(),
            campaign_id: None,
            created_at: "2030-01-01T09:00:00Z".parse().unwrap(),
            posted_at: None,
            engagement: None,
        };
        assert!(publisher.publish(&post).await.is_err());
    }
}
