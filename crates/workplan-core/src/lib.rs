//! # workplan-core
//!
//! Core domain model for workplan feasibility analysis.
//!
//! This crate provides:
//! - Domain types: `Activity`, `RoleMap`, `ResourceCapacity`, `PlanningHorizon`, `Occurrence`
//! - Result types: `SolverStatus`, `AnalysisResult`, `InfeasibilityDiagnostics`
//! - Policy configuration for the diagnostics engine
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use workplan_core::{Activity, PlanningHorizon, ResourceCapacity};
//!
//! let patrol = Activity::new("A1")
//!     .name("Boundary patrol")
//!     .frequency(2)
//!     .duration(0.5)
//!     .requires("Ranger", 2);
//! let capacity = ResourceCapacity::new().role("Ranger", 3);
//! let horizon = PlanningHorizon::with_working_days(5);
//!
//! assert_eq!(patrol.duration_slots().unwrap(), 2);
//! assert_eq!(capacity.roles.get("Ranger"), 3);
//! assert_eq!(horizon.capacity_slots(), 20);
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub mod diagnostics;
pub mod horizon;
pub mod policy;

pub use diagnostics::{
    ConflictKind, ConstraintViolation, InfeasibilityDiagnostics, InvalidConfiguration,
    InvalidConfigurationKind, ResourceOverload, RootCause, SchedulingConflict, Severity,
    ViolationKind,
};
pub use horizon::{FinancialQuarter, HorizonDay, PlanningHorizon};
pub use policy::{AnalysisOptions, DiagnosticsPolicy};

// ============================================================================
// Constants
// ============================================================================

/// Quarter-day slots per working day. Fixed for every horizon.
pub const SLOTS_PER_DAY: u32 = 4;

/// Unique identifier for an activity
pub type ActivityId = String;

/// Name of a staffing role (open set, e.g. "Ranger")
pub type RoleName = String;

// ============================================================================
// Role Map
// ============================================================================

/// Role name to quantity map.
///
/// Used for activity requirements, capacity headcounts and aggregated demand.
/// Iteration order is the lexical order of role names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleMap(BTreeMap<RoleName, u32>);

impl RoleMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Quantity for a role, 0 when the role is absent
    pub fn get(&self, role: &str) -> u32 {
        self.0.get(role).copied().unwrap_or(0)
    }

    /// Whether the role is defined at all (a defined role may still be 0)
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains_key(role)
    }

    /// Set the quantity for a role, returning the previous value
    pub fn insert(&mut self, role: impl Into<RoleName>, quantity: u32) -> Option<u32> {
        self.0.insert(role.into(), quantity)
    }

    pub fn remove(&mut self, role: &str) -> Option<u32> {
        self.0.remove(role)
    }

    /// Add to the quantity for a role
    pub fn add(&mut self, role: &str, quantity: u32) {
        let entry = self.0.entry(role.to_string()).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(role, qty)| (role.as_str(), *qty))
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every quantity is zero (or the map is empty)
    pub fn all_zero(&self) -> bool {
        self.0.values().all(|&qty| qty == 0)
    }
}

impl<K: Into<RoleName>> FromIterator<(K, u32)> for RoleMap {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ============================================================================
// Activity
// ============================================================================

/// Allowed activity durations in days, with their length in slots
const ALLOWED_DURATIONS: [(f64, u32); 3] = [(0.25, 1), (0.5, 2), (1.0, 4)];

/// A recurring activity from the workplan
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique identifier
    pub activity_id: ActivityId,
    /// Human-readable name
    pub name: String,
    /// Target planning quarter label (e.g. "2025-Q3")
    #[serde(default)]
    pub quarter: String,
    /// Occurrences required within the quarter
    pub frequency: u32,
    /// Length of one occurrence in days: 0.25, 0.5 or 1.0
    pub duration: f64,
    /// Headcount per role while an occurrence runs
    #[serde(default)]
    pub resource_requirements: RoleMap,
}

impl Activity {
    /// Create a single full-day occurrence activity with no requirements
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            activity_id: id,
            quarter: String::new(),
            frequency: 1,
            duration: 1.0,
            resource_requirements: RoleMap::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn quarter(mut self, quarter: impl Into<String>) -> Self {
        self.quarter = quarter.into();
        self
    }

    pub fn frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn duration(mut self, days: f64) -> Self {
        self.duration = days;
        self
    }

    /// Require `quantity` staff of `role` for every occurrence
    pub fn requires(mut self, role: impl Into<RoleName>, quantity: u32) -> Self {
        self.resource_requirements.insert(role, quantity);
        self
    }

    /// Length of one occurrence in quarter-day slots
    pub fn duration_slots(&self) -> Result<u32, ConfigurationError> {
        ALLOWED_DURATIONS
            .iter()
            .find(|(days, _)| (days - self.duration).abs() < f64::EPSILON)
            .map(|&(_, slots)| slots)
            .ok_or_else(|| ConfigurationError::InvalidDuration {
                activity_id: self.activity_id.clone(),
                duration: self.duration,
            })
    }

    /// Check the invariants the analysis relies on
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.frequency < 1 {
            return Err(ConfigurationError::InvalidFrequency {
                activity_id: self.activity_id.clone(),
                frequency: self.frequency,
            });
        }
        self.duration_slots().map(|_| ())
    }
}

/// Split activities into those planned for `quarter` and the rest
pub fn partition_by_quarter(activities: &[Activity], quarter: &str) -> (Vec<Activity>, Vec<Activity>) {
    activities
        .iter()
        .cloned()
        .partition(|activity| activity.quarter == quarter)
}

// ============================================================================
// Resource Capacity
// ============================================================================

/// Headcount available per role in every working slot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCapacity {
    /// Available headcount per role
    pub roles: RoleMap,
    /// Resolved non-working dates (public and organisation holidays)
    #[serde(default)]
    pub non_working_dates: BTreeSet<NaiveDate>,
}

impl ResourceCapacity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the headcount for a role
    pub fn role(mut self, role: impl Into<RoleName>, headcount: u32) -> Self {
        self.roles.insert(role, headcount);
        self
    }

    /// Mark a date as non-working
    pub fn non_working(mut self, date: NaiveDate) -> Self {
        self.non_working_dates.insert(date);
        self
    }

    pub fn headcount(&self, role: &str) -> u32 {
        self.roles.get(role)
    }
}

// ============================================================================
// Occurrence
// ============================================================================

/// Dense index of an occurrence within one analysis run
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OccurrenceId(pub usize);

impl std::fmt::Display for OccurrenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One concrete instance of a recurring activity, placed exactly once
#[derive(Clone, Copy, Debug)]
pub struct Occurrence<'a> {
    pub id: OccurrenceId,
    pub activity: &'a Activity,
    /// 0-based index within the activity's frequency
    pub index: u32,
    /// Validated length in slots
    pub duration_slots: u32,
}

impl<'a> Occurrence<'a> {
    pub fn resource_demand(&self) -> &'a RoleMap {
        &self.activity.resource_requirements
    }

    /// Demand for a single role, 0 when not required
    pub fn demand(&self, role: &str) -> u32 {
        self.activity.resource_requirements.get(role)
    }

    /// True when the occurrence needs no staff of any kind
    pub fn requires_nothing(&self) -> bool {
        self.activity.resource_requirements.all_zero()
    }
}

// ============================================================================
// Workplan Summary
// ============================================================================

/// Aggregate figures for a workplan, computed without solving
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkplanSummary {
    pub total_activities: usize,
    pub total_occurrences: u64,
    /// Σ quantity × frequency per role
    pub total_demand: RoleMap,
    /// Occurrences per duration (in slots)
    pub duration_breakdown: BTreeMap<u32, u64>,
    pub quarters: BTreeSet<String>,
}

impl WorkplanSummary {
    pub fn from_activities(activities: &[Activity]) -> Self {
        let mut summary = Self {
            total_activities: activities.len(),
            ..Self::default()
        };

        for activity in activities {
            summary.total_occurrences += u64::from(activity.frequency);
            for (role, qty) in activity.resource_requirements.iter() {
                summary
                    .total_demand
                    .add(role, qty.saturating_mul(activity.frequency));
            }
            if let Ok(slots) = activity.duration_slots() {
                *summary.duration_breakdown.entry(slots).or_insert(0) +=
                    u64::from(activity.frequency);
            }
            summary.quarters.insert(activity.quarter.clone());
        }

        summary
    }
}

// ============================================================================
// Solver Status
// ============================================================================

/// Terminal state of one analysis, in the outward status vocabulary
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolverStatus {
    /// A full assignment exists (search completed)
    Optimal,
    /// A full assignment exists
    Feasible,
    /// Provably no assignment satisfies all constraints
    Infeasible,
    /// Time limit reached without proof either way
    Unknown,
    /// The solver rejected the model
    ModelInvalid,
    /// Building or solving failed
    Error(String),
}

impl SolverStatus {
    /// Whether a valid assignment was found
    pub fn is_feasible(&self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, SolverStatus::Infeasible)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SolverStatus::Error(_))
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverStatus::Optimal => write!(f, "OPTIMAL"),
            SolverStatus::Feasible => write!(f, "FEASIBLE"),
            SolverStatus::Infeasible => write!(f, "INFEASIBLE"),
            SolverStatus::Unknown => write!(f, "UNKNOWN"),
            SolverStatus::ModelInvalid => write!(f, "MODEL_INVALID"),
            SolverStatus::Error(message) => write!(f, "ERROR:{}", message),
        }
    }
}

impl std::str::FromStr for SolverStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPTIMAL" => Ok(SolverStatus::Optimal),
            "FEASIBLE" => Ok(SolverStatus::Feasible),
            "INFEASIBLE" => Ok(SolverStatus::Infeasible),
            "UNKNOWN" => Ok(SolverStatus::Unknown),
            "MODEL_INVALID" => Ok(SolverStatus::ModelInvalid),
            other => other
                .strip_prefix("ERROR:")
                .map(|message| SolverStatus::Error(message.to_string()))
                .ok_or_else(|| ParseStatusError(other.to_string())),
        }
    }
}

impl Serialize for SolverStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SolverStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Analysis Result
// ============================================================================

/// Solver statistics for one analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverStats {
    pub status: SolverStatus,
    /// Wall-clock seconds spent so far (whole run for errors)
    pub solve_time: f64,
    pub num_variables: usize,
    pub num_constraints: usize,
}

/// Where one occurrence was placed in a feasible schedule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub activity_id: ActivityId,
    pub occurrence_index: u32,
    pub start_slot: u32,
    /// Exclusive end slot
    pub end_slot: u32,
    /// Index of the horizon day holding the start slot
    pub day: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// Outcome of one feasibility analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub timestamp: DateTime<Utc>,
    pub feasible: bool,
    /// Utilization percentage per role
    pub utilization: BTreeMap<RoleName, f64>,
    pub solver_stats: SolverStats,
    /// Slots in the horizon grid
    pub total_slots: u32,
    /// Working slots in which capacity is available
    pub capacity_slots: u32,
    /// Placements, present only for feasible verdicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<Placement>>,
    /// Present only for infeasible verdicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infeasibility_diagnostics: Option<InfeasibilityDiagnostics>,
    /// Capacity the analysis ran against
    pub resource_capacity: ResourceCapacity,
}

/// Terminal state of an analysis run as seen by the caller
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisOutcome {
    Completed(Box<AnalysisResult>),
    /// Cancelled before completion; no partial verdict is exposed
    Cancelled,
}

impl AnalysisOutcome {
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisOutcome::Completed(result) => Some(result.as_ref()),
            AnalysisOutcome::Cancelled => None,
        }
    }

    pub fn into_result(self) -> Option<AnalysisResult> {
        match self {
            AnalysisOutcome::Completed(result) => Some(*result),
            AnalysisOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisOutcome::Cancelled)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Malformed activity, resource or horizon data reaching the core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Invalid duration {duration} for activity '{activity_id}': must be 0.25, 0.5 or 1.0")]
    InvalidDuration { activity_id: ActivityId, duration: f64 },

    #[error("Invalid frequency {frequency} for activity '{activity_id}': must be at least 1")]
    InvalidFrequency { activity_id: ActivityId, frequency: u32 },

    #[error("Invalid planning quarter '{0}': expected YYYY-Q1 to YYYY-Q4")]
    InvalidQuarter(String),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid diagnostics policy: {0}")]
    Policy(String),
}

/// Internal invariant violation while constructing the constraint model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelBuildError {
    #[error("Coefficient {value} for role '{role}' exceeds the solver's integer range")]
    CoefficientOverflow { role: RoleName, value: u64 },

    #[error("Planning horizon of {slots} slots exceeds the solver's integer range")]
    HorizonTooLarge { slots: u64 },
}

/// Any failure that aborts an analysis before a verdict
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    ModelBuild(#[from] ModelBuildError),
}

/// Unrecognised solver status string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown solver status '{0}'")]
pub struct ParseStatusError(pub String);

// ============================================================================
// Tests
// ============================================================================
