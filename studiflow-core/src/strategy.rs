//! Engagement strategies.
//!
//! Strategies are immutable, predefined presets selected by name when an
//! automation session starts. Each one declares hourly action rates, pacing,
//! an active-hour window and its compliance posture.

use crate::types::ActionCounts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Active hours assumed when converting hourly rates to daily budgets.
pub const ACTIVE_HOURS_PER_DAY: u32 = 12;

/// Fixed daily unfollow ceiling, independent of strategy.
pub const UNFOLLOW_DAILY_LIMIT: u32 = 20;

/// Declared risk level of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyLevel {
    Conservative,
    Moderate,
    Aggressive,
}

impl StrategyLevel {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyLevel::Conservative => "conservative",
            StrategyLevel::Moderate => "moderate",
            StrategyLevel::Aggressive => "aggressive",
        }
    }
}

/// Hourly action rates while inside the active-hour window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyRates {
    pub likes: u32,
    pub follows: u32,
    pub comments: u32,
    pub story_views: u32,
}

/// Declared compliance flags of a strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceFlags {
    pub instagram_terms: bool,
    pub safe_for_business: bool,
    pub recommended_for_students: bool,
}

/// Hour-of-day window during which the activity loop plans actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveHours {
    /// Inclusive start hour (0-23).
    pub start: u32,
    /// Exclusive end hour (1-24).
    pub end: u32,
}

impl ActiveHours {
    /// Whether the given hour falls inside the window.
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }
}

/// A named, versioned engagement preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementStrategy {
    pub name: String,
    pub version: String,
    pub hourly_rates: HourlyRates,
    /// Spacing between consecutive actions planned in one tick, in seconds.
    pub action_delay_secs: u64,
    pub active_hours: ActiveHours,
    /// Whether the activity loop runs on Saturday/Sunday.
    pub weekend_activity: bool,
    /// Jitter factor (0.0 - 1.0) applied to the inter-action spacing.
    pub randomization: f64,
    pub level: StrategyLevel,
    pub description: String,
    pub compliance: ComplianceFlags,
}

impl EngagementStrategy {
    /// Daily per-action-type limits derived from the hourly rates.
    ///
    /// Rates apply over [`ACTIVE_HOURS_PER_DAY`] hours; the unfollow limit is
    /// fixed at [`UNFOLLOW_DAILY_LIMIT`] regardless of strategy.
    pub fn daily_limits(&self) -> ActionCounts {
        ActionCounts {
            likes: self.hourly_rates.likes * ACTIVE_HOURS_PER_DAY,
            follows: self.hourly_rates.follows * ACTIVE_HOURS_PER_DAY,
            comments: self.hourly_rates.comments * ACTIVE_HOURS_PER_DAY,
            unfollows: UNFOLLOW_DAILY_LIMIT,
        }
    }
}

/// Registry of the built-in engagement strategies.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<String, EngagementStrategy>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StrategyRegistry {
    /// Registry with the three StudiFlow presets.
    pub fn builtin() -> Self {
        let mut strategies = HashMap::new();
        for strategy in [conservative(), moderate(), aggressive()] {
            strategies.insert(strategy.name.clone(), strategy);
        }
        Self { strategies }
    }

    /// Look up a strategy by name.
    pub fn get(&self, name: &str) -> Option<&EngagementStrategy> {
        self.strategies.get(name)
    }

    /// Names of all registered strategies.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.keys().cloned().collect();
        names.sort();
        names
    }
}

fn conservative() -> EngagementStrategy {
    EngagementStrategy {
        name: "StudiFlow Conservative".to_string(),
        version: "1.0".to_string(),
        hourly_rates: HourlyRates {
            likes: 20,
            follows: 3,
            comments: 2,
            story_views: 10,
        },
        action_delay_secs: 120,
        active_hours: ActiveHours { start: 9, end: 21 },
        weekend_activity: false,
        randomization: 0.3,
        level: StrategyLevel::Conservative,
        description: "Slow, steady engagement well below platform attention thresholds."
            .to_string(),
        compliance: ComplianceFlags {
            instagram_terms: true,
            safe_for_business: true,
            recommended_for_students: true,
        },
    }
}

fn moderate() -> EngagementStrategy {
    EngagementStrategy {
        name: "StudiFlow Moderate".to_string(),
        version: "1.0".to_string(),
        hourly_rates: HourlyRates {
            likes: 40,
            follows: 8,
            comments: 5,
            story_views: 20,
        },
        action_delay_secs: 60,
        active_hours: ActiveHours { start: 8, end: 20 },
        weekend_activity: true,
        randomization: 0.25,
        level: StrategyLevel::Moderate,
        description: "Balanced growth pace for established accounts.".to_string(),
        compliance: ComplianceFlags {
            instagram_terms: true,
            safe_for_business: true,
            recommended_for_students: false,
        },
    }
}

fn aggressive() -> EngagementStrategy {
    EngagementStrategy {
        name: "StudiFlow Aggressive".to_string(),
        version: "1.0".to_string(),
        hourly_rates: HourlyRates {
            likes: 80,
            follows: 15,
            comments: 10,
            story_views: 40,
        },
        action_delay_secs: 30,
        active_hours: ActiveHours { start: 7, end: 19 },
        weekend_activity: true,
        randomization: 0.15,
        level: StrategyLevel::Aggressive,
        description: "Maximum-volume engagement. High detection risk; not recommended."
            .to_string(),
        compliance: ComplianceFlags {
            instagram_terms: false,
            safe_for_business: false,
            recommended_for_students: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_has_three_presets() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec![
                "StudiFlow Aggressive".to_string(),
                "StudiFlow Conservative".to_string(),
                "StudiFlow Moderate".to_string(),
            ]
        );
        assert!(registry.get("StudiFlow Conservative").is_some());
        assert!(registry.get("does-not-exist").is_none());
    }

    #[test]
    fn test_conservative_daily_limits() {
        let registry = StrategyRegistry::builtin();
        let limits = registry
            .get("StudiFlow Conservative")
            .unwrap()
            .daily_limits();
        assert_eq!(limits.likes, 240);
        assert_eq!(limits.follows, 36);
        assert_eq!(limits.comments, 24);
        assert_eq!(limits.unfollows, 20);
    }

    #[test]
    fn test_active_hours_window() {
        let hours = ActiveHours { start: 9, end: 21 };
        assert!(!hours.contains(8));
        assert!(hours.contains(9));
        assert!(hours.contains(20));
        assert!(!hours.contains(21));
    }

    #[test]
    fn test_aggressive_is_marked_non_compliant() {
        let registry = StrategyRegistry::builtin();
        let strategy = registry.get("StudiFlow Aggressive").unwrap();
        assert_eq!(strategy.level, StrategyLevel::Aggressive);
        assert!(!strategy.compliance.instagram_terms);
    }
}
