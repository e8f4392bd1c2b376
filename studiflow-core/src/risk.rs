//! Risk and compliance assessment.
//!
//! Pure derivations over the session counters, the action history and the
//! strategy's declared compliance flags. Nothing here mutates state; the
//! session manager hands in consistent snapshots taken under its lock.

use crate::strategy::{EngagementStrategy, StrategyLevel};
use crate::time::Clock;
use crate::types::{ActionStatus, AutomationAction, AutomationSession, AutomationStats};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Daily action volume that raises the risk level to medium.
pub const MEDIUM_RISK_DAILY_ACTIONS: u32 = 100;

/// Success rate below which the risk level rises to medium.
pub const MEDIUM_RISK_SUCCESS_RATE: f64 = 0.8;

/// Failures within the trailing hour that raise the risk level to high.
pub const HIGH_RISK_RECENT_FAILURES: usize = 5;

/// Derived risk rating for a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Overall verdict of a compliance report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceGrade {
    Excellent,
    Good,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub overall_compliance: ComplianceGrade,
    pub instagram_terms_compliance: bool,
    /// 0-100, higher is safer.
    pub business_safety_score: u32,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub next_review_date: DateTime<Utc>,
}

/// Derives risk levels and compliance reports for automation sessions.
pub struct RiskAssessor {
    clock: Arc<dyn Clock>,
}

impl RiskAssessor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Rate the current session.
    ///
    /// Starts at low; daily volume above 100 actions or a success rate under
    /// 0.8 escalates to medium; an aggressive strategy or more than 5
    /// failures in the trailing hour escalates to high.
    pub fn assess_risk(
        &self,
        session: &AutomationSession,
        strategy: &EngagementStrategy,
        history: &[AutomationAction],
    ) -> RiskAssessment {
        let mut level = RiskLevel::Low;
        let mut factors = Vec::new();
        let mut recommendations = Vec::new();

        let daily_actions = session.current_counts.total();
        if daily_actions > MEDIUM_RISK_DAILY_ACTIONS {
            level = level.max(RiskLevel::Medium);
            factors.push(format!("High daily action volume ({daily_actions})"));
            recommendations
                .push("Reduce the hourly rates or pause until tomorrow".to_string());
        }
        if session.actions_planned > 0 && session.success_rate < MEDIUM_RISK_SUCCESS_RATE {
            level = level.max(RiskLevel::Medium);
            factors.push(format!(
                "Low success rate ({:.0}%)",
                session.success_rate * 100.0
            ));
            recommendations
                .push("Review targeting quality, failures often mean poor targets".to_string());
        }

        if strategy.level == StrategyLevel::Aggressive {
            level = RiskLevel::High;
            factors.push(format!("Aggressive strategy in use ({})", strategy.name));
            recommendations.push("Switch to a conservative or moderate strategy".to_string());
        }
        let hour_ago = self.clock.now() - Duration::hours(1);
        let recent_failures = history
            .iter()
            .filter(|a| a.status == ActionStatus::Failed && a.timestamp > hour_ago)
            .count();
        if recent_failures > HIGH_RISK_RECENT_FAILURES {
            level = RiskLevel::High;
            factors.push(format!(
                "{recent_failures} failed actions in the last hour"
            ));
            recommendations
                .push("Stop the session and investigate before continuing".to_string());
        }

        debug!(
            session_id = %session.id,
            level = level.as_str(),
            factors = factors.len(),
            "Risk assessed"
        );
        RiskAssessment {
            level,
            factors,
            recommendations,
        }
    }

    /// Point-in-time compliance judgment for the session.
    ///
    /// The business safety score starts at 100 and takes deductions for the
    /// risk level (-20 medium, -50 high), for daily volume above 100 (-15)
    /// and for a success rate under 0.8 (-10), floored at 0.
    pub fn generate_compliance_report(
        &self,
        session: &AutomationSession,
        stats: &AutomationStats,
        strategy: &EngagementStrategy,
        history: &[AutomationAction],
    ) -> ComplianceReport {
        let risk = self.assess_risk(session, strategy, history);

        let mut score: i32 = 100;
        match risk.level {
            RiskLevel::Medium => score -= 20,
            RiskLevel::High => score -= 50,
            RiskLevel::Low => {}
        }
        if stats.actions_today > MEDIUM_RISK_DAILY_ACTIONS {
            score -= 15;
        }
        if session.actions_planned > 0 && session.success_rate < MEDIUM_RISK_SUCCESS_RATE {
            score -= 10;
        }

        let overall_compliance = if !strategy.compliance.instagram_terms {
            ComplianceGrade::Critical
        } else if stats.actions_today > 80
            || (session.actions_planned > 0 && session.success_rate < 0.85)
        {
            ComplianceGrade::Warning
        } else {
            ComplianceGrade::Excellent
        };

        let mut recommendations = risk.recommendations;
        if !strategy.compliance.instagram_terms {
            recommendations.insert(
                0,
                "The chosen strategy violates platform terms, stop automation".to_string(),
            );
        }
        if !strategy.compliance.safe_for_business {
            recommendations
                .push("This strategy is not marked safe for business accounts".to_string());
        }

        ComplianceReport {
            overall_compliance,
            instagram_terms_compliance: strategy.compliance.instagram_terms,
            business_safety_score: score.max(0) as u32,
            recommendations,
            risk_factors: risk.factors,
            next_review_date: self.clock.now() + Duration::days(7),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyRegistry;
    use crate::time::ManualClock;
    use crate::types::{ActionCounts, ActionType, SessionStatus};
    use chrono::Utc;
    use uuid::Uuid;

    const NOW: &str = "2025-03-12T10:00:00Z";

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn assessor() -> RiskAssessor {
        RiskAssessor::new(Arc::new(ManualClock::new(ts(NOW))))
    }

    fn strategy(name: &str) -> EngagementStrategy {
        StrategyRegistry::builtin().get(name).unwrap().clone()
    }

    fn session_with(counts: ActionCounts, planned: u32, completed: u32) -> AutomationSession {
        let success_rate = if planned > 0 {
            f64::from(completed) / f64::from(planned)
        } else {
            0.0
        };
        AutomationSession {
            id: Uuid::new_v4().to_string(),
            start_time: ts(NOW),
            end_time: None,
            status: SessionStatus::Active,
            actions_completed: completed,
            actions_planned: planned,
            success_rate,
            strategy_name: "StudiFlow Conservative".to_string(),
            target_hashtags: vec!["#studium".to_string()],
            daily_limits: ActionCounts {
                likes: 240,
                follows: 36,
                comments: 24,
                unfollows: 20,
            },
            current_counts: counts,
        }
    }

    fn failed_action(timestamp: &str) -> AutomationAction {
        AutomationAction {
            id: Uuid::new_v4().to_string(),
            action_type: ActionType::Like,
            target_username: "studi_1".to_string(),
            target_post_id: None,
            content: None,
            timestamp: ts(timestamp),
            status: ActionStatus::Failed,
            failure_reason: Some("Network timeout".to_string()),
            engagement: None,
        }
    }

    #[test]
    fn test_quiet_session_is_low_risk() {
        let session = session_with(ActionCounts::default(), 10, 10);
        let risk = assessor().assess_risk(&session, &strategy("StudiFlow Conservative"), &[]);
        assert_eq!(risk.level, RiskLevel::Low);
        assert!(risk.factors.is_empty());
        assert!(risk.recommendations.is_empty());
    }

    #[test]
    fn test_high_volume_is_medium_risk() {
        let counts = ActionCounts {
            likes: 90,
            follows: 10,
            comments: 5,
            unfollows: 0,
        };
        let session = session_with(counts, 110, 105);
        let risk = assessor().assess_risk(&session, &strategy("StudiFlow Conservative"), &[]);
        assert_eq!(risk.level, RiskLevel::Medium);
        assert!(!risk.factors.is_empty());
    }

    #[test]
    fn test_low_success_rate_is_medium_risk() {
        let session = session_with(ActionCounts::default(), 20, 10);
        let risk = assessor().assess_risk(&session, &strategy("StudiFlow Conservative"), &[]);
        assert_eq!(risk.level, RiskLevel::Medium);
    }

    #[test]
    fn test_aggressive_strategy_is_always_high_risk() {
        // Perfect counters, still high
        let session = session_with(ActionCounts::default(), 10, 10);
        let risk = assessor().assess_risk(&session, &strategy("StudiFlow Aggressive"), &[]);
        assert_eq!(risk.level, RiskLevel::High);
    }

    #[test]
    fn test_recent_failure_burst_is_high_risk() {
        let history: Vec<AutomationAction> =
            (0..6).map(|_| failed_action("2025-03-12T09:30:00Z")).collect();
        let session = session_with(ActionCounts::default(), 50, 44);
        let risk =
            assessor().assess_risk(&session, &strategy("StudiFlow Conservative"), &history);
        assert_eq!(risk.level, RiskLevel::High);
    }

    #[test]
    fn test_old_failures_do_not_escalate() {
        // Same burst, but outside the trailing hour
        let history: Vec<AutomationAction> =
            (0..6).map(|_| failed_action("2025-03-12T08:30:00Z")).collect();
        let session = session_with(ActionCounts::default(), 50, 50);
        let risk =
            assessor().assess_risk(&session, &strategy("StudiFlow Conservative"), &history);
        assert_eq!(risk.level, RiskLevel::Low);
    }

    fn stats_for(session: &AutomationSession, actions_today: u32) -> AutomationStats {
        AutomationStats {
            session_id: Some(session.id.clone()),
            session_status: Some(session.status),
            actions_planned: session.actions_planned,
            actions_completed: session.actions_completed,
            actions_failed: 0,
            actions_skipped: 0,
            success_rate: session.success_rate,
            actions_today,
            counts_today: session.current_counts,
        }
    }

    #[test]
    fn test_compliant_quiet_session_is_excellent() {
        let session = session_with(ActionCounts::default(), 10, 10);
        let stats = stats_for(&session, 10);
        let report = assessor().generate_compliance_report(
            &session,
            &stats,
            &strategy("StudiFlow Conservative"),
            &[],
        );
        assert_eq!(report.overall_compliance, ComplianceGrade::Excellent);
        assert!(report.instagram_terms_compliance);
        assert_eq!(report.business_safety_score, 100);
        assert_eq!(report.next_review_date, ts("2025-03-19T10:00:00Z"));
    }

    #[test]
    fn test_non_compliant_strategy_is_always_critical() {
        let session = session_with(ActionCounts::default(), 10, 10);
        let stats = stats_for(&session, 5);
        let report = assessor().generate_compliance_report(
            &session,
            &stats,
            &strategy("StudiFlow Aggressive"),
            &[],
        );
        assert_eq!(report.overall_compliance, ComplianceGrade::Critical);
        assert!(!report.instagram_terms_compliance);
        // High risk from the aggressive strategy: 100 - 50
        assert_eq!(report.business_safety_score, 50);
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn test_busy_day_is_a_warning() {
        let session = session_with(ActionCounts::default(), 90, 90);
        let stats = stats_for(&session, 85);
        let report = assessor().generate_compliance_report(
            &session,
            &stats,
            &strategy("StudiFlow Conservative"),
            &[],
        );
        assert_eq!(report.overall_compliance, ComplianceGrade::Warning);
    }

    #[test]
    fn test_safety_score_deductions_stack_and_floor() {
        // Medium risk (-20), >100 actions today (-15), low success rate (-10)
        let counts = ActionCounts {
            likes: 100,
            follows: 5,
            comments: 0,
            unfollows: 0,
        };
        let session = session_with(counts, 150, 105);
        let stats = stats_for(&session, 105);
        let conservative = strategy("StudiFlow Conservative");
        let report =
            assessor().generate_compliance_report(&session, &stats, &conservative, &[]);
        assert_eq!(report.business_safety_score, 100 - 20 - 15 - 10);

        // Pile on a failure burst: high risk (-50) drives the score to the floor
        let history: Vec<AutomationAction> =
            (0..10).map(|_| failed_action("2025-03-12T09:45:00Z")).collect();
        let report =
            assessor().generate_compliance_report(&session, &stats, &conservative, &history);
        assert_eq!(report.business_safety_score, (100i32 - 50 - 15 - 10).max(0) as u32);
    }
}
