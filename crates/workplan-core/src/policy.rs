//! Analysis options and diagnostics policy.
//!
//! The severity thresholds are policy, not physics: they can be tuned per
//! organisation from a TOML file.
//!
//! ```toml
//! critical_utilization = 160.0
//! high_utilization = 125.0
//! max_recommendations = 5
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ConfigurationError;

/// Thresholds and caps used by the diagnostics engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsPolicy {
    /// Overloads at or above this utilization are `Critical`
    pub critical_utilization: f64,
    /// Overloads at or above this utilization are `High`
    pub high_utilization: f64,
    /// Roles between this and 100% get a near-capacity note
    pub near_capacity_floor: f64,
    /// Upper bound on the recommendation list
    pub max_recommendations: usize,
    /// Overloads that get a hiring recommendation
    pub top_overloads: usize,
}

impl Default for DiagnosticsPolicy {
    fn default() -> Self {
        Self {
            critical_utilization: 150.0,
            high_utilization: 120.0,
            near_capacity_floor: 90.0,
            max_recommendations: 8,
            top_overloads: 3,
        }
    }
}

impl DiagnosticsPolicy {
    /// Parse a policy from TOML; omitted keys keep their defaults
    pub fn from_toml(text: &str) -> Result<Self, ConfigurationError> {
        let policy: Self =
            toml::from_str(text).map_err(|e| ConfigurationError::Policy(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.high_utilization.is_nan() || self.high_utilization <= 100.0 {
            return Err(ConfigurationError::Policy(format!(
                "high_utilization ({}) must be above 100",
                self.high_utilization
            )));
        }
        if self.critical_utilization < self.high_utilization {
            return Err(ConfigurationError::Policy(format!(
                "critical_utilization ({}) must not be below high_utilization ({})",
                self.critical_utilization, self.high_utilization
            )));
        }
        if !(0.0..=100.0).contains(&self.near_capacity_floor) {
            return Err(ConfigurationError::Policy(format!(
                "near_capacity_floor ({}) must be within 0..=100",
                self.near_capacity_floor
            )));
        }
        if self.max_recommendations == 0 {
            return Err(ConfigurationError::Policy(
                "max_recommendations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Per-run analysis settings
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisOptions {
    /// Wall-clock budget for the solver
    pub time_limit: Duration,
    pub policy: DiagnosticsPolicy,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(30),
            policy: DiagnosticsPolicy::default(),
        }
    }
}

impl AnalysisOptions {
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn policy(mut self, policy: DiagnosticsPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_thresholds() {
        let policy = DiagnosticsPolicy::default();
        assert_eq!(policy.critical_utilization, 150.0);
        assert_eq!(policy.high_utilization, 120.0);
        assert_eq!(policy.max_recommendations, 8);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let policy = DiagnosticsPolicy::from_toml("critical_utilization = 175.0\n").unwrap();
        assert_eq!(policy.critical_utilization, 175.0);
        assert_eq!(policy.high_utilization, 120.0);
        assert_eq!(policy.top_overloads, 3);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let err = DiagnosticsPolicy::from_toml(
            "critical_utilization = 110.0\nhigh_utilization = 130.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Policy(_)));
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(DiagnosticsPolicy::from_toml("critical = 1.0\n").is_err());
    }

    #[test]
    fn default_time_limit_is_thirty_seconds() {
        assert_eq!(AnalysisOptions::default().time_limit, Duration::from_secs(30));
    }
}
