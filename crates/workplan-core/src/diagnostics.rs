//! Infeasibility diagnostics records
//!
//! When no assignment exists, the analysis explains why with four families of
//! findings, a ranked root cause, and remediation recommendations. Findings
//! serialize with a `type` tag (`impossible_activity`, `time_horizon_exceeded`,
//! `zero_resources`, `excessive_frequency`, `missing_resource_types`).

use serde::{Deserialize, Serialize};

use crate::{ActivityId, RoleName};

// ============================================================================
// Severity
// ============================================================================

/// How serious a finding is, most serious first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Moderate,
    Low,
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Moderate => "Moderate",
            Severity::Low => "Low",
            Severity::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Findings
// ============================================================================

/// A role whose total demand exceeds its total capacity over the horizon
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceOverload {
    pub role: RoleName,
    pub utilization_percentage: f64,
    /// Σ demand × duration, in slot units
    pub demand_slots: u64,
    /// capacity × working slots
    pub capacity_slots: u64,
    pub excess_slots: u64,
    pub current_capacity: u32,
    pub min_additional_staff: u32,
    pub severity: Severity,
}

/// Timing or per-slot conflicts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConflict {
    pub severity: Severity,
    pub description: String,
    #[serde(flatten)]
    pub kind: ConflictKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConflictKind {
    /// A single occurrence needs more of a role than exists at all
    ImpossibleActivity {
        activity_id: ActivityId,
        activity_name: String,
        role: RoleName,
        demand: u32,
        capacity: u32,
        occurrences: u32,
    },
    /// Occurrences laid end to end do not fit the working slots
    TimeHorizonExceeded {
        required_slots: u64,
        available_slots: u64,
        excess_slots: u64,
    },
}

/// Activity definitions that are suspicious or structurally unplaceable
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvalidConfiguration {
    pub severity: Severity,
    pub description: String,
    #[serde(flatten)]
    pub kind: InvalidConfigurationKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvalidConfigurationKind {
    /// An activity requiring no staff of any kind
    ZeroResources {
        activity_id: ActivityId,
        activity_name: String,
        occurrences: u32,
    },
    /// An activity whose occurrences cannot fit even with the horizon to itself
    ExcessiveFrequency {
        activity_id: ActivityId,
        activity_name: String,
        frequency: u32,
        max_frequency: u32,
        excess: u32,
    },
}

/// Inconsistencies between the workplan and the capacity definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub severity: Severity,
    pub description: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViolationKind {
    /// Roles demanded by activities but absent from the capacity map
    MissingResourceTypes {
        missing_resources: Vec<RoleName>,
        affected_activities: Vec<ActivityId>,
    },
}

// ============================================================================
// Root Cause
// ============================================================================

/// Ranked primary explanation of an infeasible verdict
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootCause {
    MissingResourceTypes,
    ImpossibleActivityRequirements,
    TimeHorizonExceeded,
    ExcessiveActivityFrequency,
    ActivitiesWithoutResources,
    SevereResourceCapacityShortage,
    ResourceCapacityInsufficient,
    ResourceCapacityShortage,
    SchedulingConflicts,
    InvalidActivityConfiguration,
    UnknownInfeasibility,
}

impl RootCause {
    pub fn label(&self) -> &'static str {
        match self {
            RootCause::MissingResourceTypes => "Missing Resource Types",
            RootCause::ImpossibleActivityRequirements => "Impossible Activity Requirements",
            RootCause::TimeHorizonExceeded => "Time Horizon Exceeded",
            RootCause::ExcessiveActivityFrequency => "Excessive Activity Frequency",
            RootCause::ActivitiesWithoutResources => "Activities Without Resources",
            RootCause::SevereResourceCapacityShortage => "Severe Resource Capacity Shortage",
            RootCause::ResourceCapacityInsufficient => "Resource Capacity Insufficient",
            RootCause::ResourceCapacityShortage => "Resource Capacity Shortage",
            RootCause::SchedulingConflicts => "Scheduling Conflicts",
            RootCause::InvalidActivityConfiguration => "Invalid Activity Configuration",
            RootCause::UnknownInfeasibility => "Unknown Infeasibility",
        }
    }

    /// True for the labels derived from overload severity
    pub fn is_overload(&self) -> bool {
        matches!(
            self,
            RootCause::SevereResourceCapacityShortage
                | RootCause::ResourceCapacityInsufficient
                | RootCause::ResourceCapacityShortage
        )
    }
}

impl std::fmt::Display for RootCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl ConflictKind {
    pub fn root_cause(&self) -> RootCause {
        match self {
            ConflictKind::ImpossibleActivity { .. } => RootCause::ImpossibleActivityRequirements,
            ConflictKind::TimeHorizonExceeded { .. } => RootCause::TimeHorizonExceeded,
        }
    }
}

impl InvalidConfigurationKind {
    pub fn root_cause(&self) -> RootCause {
        match self {
            InvalidConfigurationKind::ZeroResources { .. } => RootCause::ActivitiesWithoutResources,
            InvalidConfigurationKind::ExcessiveFrequency { .. } => {
                RootCause::ExcessiveActivityFrequency
            }
        }
    }
}

impl ViolationKind {
    pub fn root_cause(&self) -> RootCause {
        match self {
            ViolationKind::MissingResourceTypes { .. } => RootCause::MissingResourceTypes,
        }
    }
}

// ============================================================================
// Diagnostics Record
// ============================================================================

/// Structured explanation attached to an infeasible analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfeasibilityDiagnostics {
    pub primary_reason: RootCause,
    pub severity: Severity,
    pub resource_overloads: Vec<ResourceOverload>,
    pub scheduling_conflicts: Vec<SchedulingConflict>,
    pub invalid_configurations: Vec<InvalidConfiguration>,
    pub constraint_violations: Vec<ConstraintViolation>,
    pub recommendations: Vec<String>,
}

impl InfeasibilityDiagnostics {
    /// Total number of findings across all four families
    pub fn finding_count(&self) -> usize {
        self.resource_overloads.len()
            + self.scheduling_conflicts.len()
            + self.invalid_configurations.len()
            + self.constraint_violations.len()
    }

    /// Roles listed by any missing-resource violation
    pub fn missing_roles(&self) -> Vec<&str> {
        self.constraint_violations
            .iter()
            .flat_map(|violation| match &violation.kind {
                ViolationKind::MissingResourceTypes {
                    missing_resources, ..
                } => missing_resources.iter().map(String::as_str),
            })
            .collect()
    }
}
