//! Infeasibility diagnostics engine
//!
//! Runs only after an `INFEASIBLE` verdict. Four independent analyzers look
//! at the occurrences, the capacity and the per-role loads:
//!
//! | Analyzer | Findings |
//! |----------|----------|
//! | [`analyze_overloads`] | roles with utilization above 100% |
//! | [`analyze_scheduling_conflicts`] | impossible activities, horizon overrun |
//! | [`analyze_invalid_configurations`] | zero-resource activities, excessive frequency |
//! | [`analyze_constraint_violations`] | roles missing from the capacity map |
//!
//! A failing analyzer contributes no findings; the others still run.

use thiserror::Error;
use tracing::{debug, warn};
use workplan_core::{
    Activity, ConflictKind, ConstraintViolation, DiagnosticsPolicy, InfeasibilityDiagnostics,
    InvalidConfiguration, InvalidConfigurationKind, Occurrence, ResourceCapacity,
    ResourceOverload, RootCause, SchedulingConflict, Severity, ViolationKind,
};

use crate::utilization::RoleLoad;

/// Failure inside one analyzer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyzerError {
    #[error("malformed role name {0:?}")]
    MalformedRole(String),

    #[error("slot arithmetic overflow computing {0}")]
    Overflow(&'static str),
}

/// Everything the analyzers read
#[derive(Clone, Copy, Debug)]
pub struct DiagnosticInputs<'a, 'o> {
    pub occurrences: &'a [Occurrence<'o>],
    pub capacity: &'a ResourceCapacity,
    /// Loads over the full role registry
    pub loads: &'a [RoleLoad],
    /// Working slots in the horizon
    pub total_slots: u32,
}

// ============================================================================
// Analyzers
// ============================================================================

/// Severity of a role at `utilization` percent, `None` when not overloaded
pub fn classify_overload(utilization: f64, policy: &DiagnosticsPolicy) -> Option<Severity> {
    if utilization.is_nan() || utilization <= 100.0 {
        None
    } else if utilization >= policy.critical_utilization {
        Some(Severity::Critical)
    } else if utilization >= policy.high_utilization {
        Some(Severity::High)
    } else {
        Some(Severity::Moderate)
    }
}

/// Roles whose demand exceeds capacity over the horizon, worst first
pub fn analyze_overloads(
    inputs: &DiagnosticInputs<'_, '_>,
    policy: &DiagnosticsPolicy,
) -> Result<Vec<ResourceOverload>, AnalyzerError> {
    let total_slots = u64::from(inputs.total_slots);
    let mut overloads = Vec::new();

    for load in inputs.loads {
        check_role(&load.role)?;
        let utilization = load.utilization();
        let Some(severity) = classify_overload(utilization, policy) else {
            continue;
        };

        let excess_slots = load.excess_slots();
        let additional = excess_slots
            .checked_div(total_slots)
            .and_then(|staff| staff.checked_add(1))
            .and_then(|staff| u32::try_from(staff).ok())
            .ok_or(AnalyzerError::Overflow("min_additional_staff"))?;

        overloads.push(ResourceOverload {
            role: load.role.clone(),
            utilization_percentage: utilization,
            demand_slots: load.demand_slots,
            capacity_slots: load.capacity_slots,
            excess_slots,
            current_capacity: load.capacity,
            min_additional_staff: additional,
            severity,
        });
    }

    overloads.sort_by(|a, b| b.utilization_percentage.total_cmp(&a.utilization_percentage));
    Ok(overloads)
}

/// Activities no timing can satisfy, and work that overruns the horizon
pub fn analyze_scheduling_conflicts(
    inputs: &DiagnosticInputs<'_, '_>,
) -> Result<Vec<SchedulingConflict>, AnalyzerError> {
    let mut conflicts = Vec::new();

    for group in group_by_activity(inputs.occurrences) {
        let activity = group.activity;
        for (role, demand) in activity.resource_requirements.iter() {
            check_role(role)?;
            if !inputs.capacity.roles.contains(role) {
                continue;
            }
            let capacity = inputs.capacity.headcount(role);
            if demand > capacity {
                conflicts.push(SchedulingConflict {
                    severity: Severity::Critical,
                    description: format!(
                        "'{}' needs {} {} at once but only {} exist",
                        activity.name, demand, role, capacity
                    ),
                    kind: ConflictKind::ImpossibleActivity {
                        activity_id: activity.activity_id.clone(),
                        activity_name: activity.name.clone(),
                        role: role.to_string(),
                        demand,
                        capacity,
                        occurrences: group.occurrences,
                    },
                });
            }
        }
    }

    let required_slots = inputs
        .occurrences
        .iter()
        .try_fold(0u64, |sum, o| sum.checked_add(u64::from(o.duration_slots)))
        .ok_or(AnalyzerError::Overflow("required slots"))?;
    let available_slots = u64::from(inputs.total_slots);
    if required_slots > available_slots {
        let excess_slots = required_slots - available_slots;
        conflicts.push(SchedulingConflict {
            severity: Severity::High,
            description: format!(
                "{required_slots} slots of work cannot fit in {available_slots} working slots \
                 ({excess_slots} over)"
            ),
            kind: ConflictKind::TimeHorizonExceeded {
                required_slots,
                available_slots,
                excess_slots,
            },
        });
    }

    Ok(conflicts)
}

/// Activities that need nobody, or recur more often than the horizon allows
pub fn analyze_invalid_configurations(
    inputs: &DiagnosticInputs<'_, '_>,
) -> Result<Vec<InvalidConfiguration>, AnalyzerError> {
    let mut findings = Vec::new();

    for group in group_by_activity(inputs.occurrences) {
        let activity = group.activity;
        if activity.resource_requirements.all_zero() {
            findings.push(InvalidConfiguration {
                severity: Severity::Low,
                description: format!("'{}' requires no resources", activity.name),
                kind: InvalidConfigurationKind::ZeroResources {
                    activity_id: activity.activity_id.clone(),
                    activity_name: activity.name.clone(),
                    occurrences: group.occurrences,
                },
            });
        }

        let max_frequency = inputs
            .total_slots
            .checked_div(group.duration_slots)
            .ok_or(AnalyzerError::Overflow("max frequency"))?;

        if activity.frequency > max_frequency {
            let excess = activity.frequency - max_frequency;
            findings.push(InvalidConfiguration {
                severity: Severity::High,
                description: format!(
                    "'{}' recurs {} times but at most {} fit in the horizon",
                    activity.name, activity.frequency, max_frequency
                ),
                kind: InvalidConfigurationKind::ExcessiveFrequency {
                    activity_id: activity.activity_id.clone(),
                    activity_name: activity.name.clone(),
                    frequency: activity.frequency,
                    max_frequency,
                    excess,
                },
            });
        }
    }

    Ok(findings)
}

/// Roles demanded by activities but absent from the capacity map
pub fn analyze_constraint_violations(
    inputs: &DiagnosticInputs<'_, '_>,
) -> Result<Vec<ConstraintViolation>, AnalyzerError> {
    let mut missing: Vec<String> = Vec::new();
    let mut affected = Vec::new();

    for ActivityGroup { activity, .. } in group_by_activity(inputs.occurrences) {
        let mut activity_affected = false;
        for (role, qty) in activity.resource_requirements.iter() {
            check_role(role)?;
            if qty == 0 || inputs.capacity.roles.contains(role) {
                continue;
            }
            activity_affected = true;
            if !missing.iter().any(|m| m == role) {
                missing.push(role.to_string());
            }
        }
        if activity_affected {
            affected.push(activity.activity_id.clone());
        }
    }

    if missing.is_empty() {
        return Ok(Vec::new());
    }

    missing.sort();
    Ok(vec![ConstraintViolation {
        severity: Severity::Critical,
        description: format!("No capacity defined for: {}", missing.join(", ")),
        kind: ViolationKind::MissingResourceTypes {
            missing_resources: missing,
            affected_activities: affected,
        },
    }])
}

// ============================================================================
// Ranking and Recommendations
// ============================================================================

/// First-match root cause over the four finding families
pub fn rank_root_cause(
    overloads: &[ResourceOverload],
    conflicts: &[SchedulingConflict],
    invalid: &[InvalidConfiguration],
    violations: &[ConstraintViolation],
) -> (RootCause, Severity) {
    let critical = violations
        .iter()
        .find(|v| v.severity == Severity::Critical)
        .map(|v| v.kind.root_cause())
        .or_else(|| {
            conflicts
                .iter()
                .find(|c| c.severity == Severity::Critical)
                .map(|c| c.kind.root_cause())
        })
        .or_else(|| {
            invalid
                .iter()
                .find(|i| i.severity == Severity::Critical)
                .map(|i| i.kind.root_cause())
        });
    if let Some(cause) = critical {
        return (cause, Severity::Critical);
    }

    if let Some(worst) = overloads.iter().map(|o| o.severity).min() {
        return match worst {
            Severity::Critical => (RootCause::SevereResourceCapacityShortage, Severity::Critical),
            Severity::High => (RootCause::ResourceCapacityInsufficient, Severity::High),
            _ => (RootCause::ResourceCapacityShortage, Severity::Moderate),
        };
    }
    if !conflicts.is_empty() {
        return (RootCause::SchedulingConflicts, Severity::High);
    }
    if !invalid.is_empty() {
        return (RootCause::InvalidActivityConfiguration, Severity::Moderate);
    }
    (RootCause::UnknownInfeasibility, Severity::Unknown)
}

/// Remediation strings in priority order, capped by the policy
pub fn recommendations(
    overloads: &[ResourceOverload],
    conflicts: &[SchedulingConflict],
    invalid: &[InvalidConfiguration],
    violations: &[ConstraintViolation],
    loads: &[RoleLoad],
    policy: &DiagnosticsPolicy,
) -> Vec<String> {
    let mut recs = Vec::new();

    let mut ranked: Vec<&ResourceOverload> = overloads.iter().collect();
    ranked.sort_by(|a, b| b.utilization_percentage.total_cmp(&a.utilization_percentage));
    for overload in ranked.into_iter().take(policy.top_overloads) {
        recs.push(format!(
            "Hire {} more {} (from {} to {}) to cover {:.1}% utilization",
            overload.min_additional_staff,
            overload.role,
            overload.current_capacity,
            overload
                .current_capacity
                .saturating_add(overload.min_additional_staff),
            overload.utilization_percentage
        ));
    }

    for conflict in conflicts {
        match &conflict.kind {
            ConflictKind::ImpossibleActivity {
                activity_name,
                role,
                demand,
                ..
            } => recs.push(format!(
                "Raise {role} capacity to at least {demand} so '{activity_name}' can run"
            )),
            ConflictKind::TimeHorizonExceeded { excess_slots, .. } => recs.push(format!(
                "Reduce activity frequency by {excess_slots} slots of work or extend the planning horizon"
            )),
        }
    }

    for finding in invalid {
        if let InvalidConfigurationKind::ExcessiveFrequency {
            activity_name,
            excess,
            ..
        } = &finding.kind
        {
            recs.push(format!("Reduce the frequency of '{activity_name}' by {excess}"));
        }
    }

    for violation in violations {
        let ViolationKind::MissingResourceTypes {
            missing_resources, ..
        } = &violation.kind;
        recs.push(format!(
            "Define capacity for missing resource types: {}",
            missing_resources.join(", ")
        ));
    }

    for load in loads.iter().filter(|load| load.capacity_slots > 0) {
        let utilization = load.utilization();
        if utilization >= policy.near_capacity_floor && utilization <= 100.0 {
            recs.push(format!(
                "{} is near capacity ({:.1}% utilized), consider increasing it",
                load.role, utilization
            ));
        }
    }

    if !overloads.is_empty() {
        recs.push("Reschedule some activities to a different quarter".to_string());
        recs.push("Split high-frequency activities across multiple quarters".to_string());
    }

    recs.truncate(policy.max_recommendations);
    recs
}

// ============================================================================
// Engine
// ============================================================================

/// Run every analyzer, rank the root cause and build recommendations
pub fn diagnose(inputs: &DiagnosticInputs<'_, '_>, policy: &DiagnosticsPolicy) -> InfeasibilityDiagnostics {
    let resource_overloads = isolated("resource_overloads", analyze_overloads(inputs, policy));
    let scheduling_conflicts =
        isolated("scheduling_conflicts", analyze_scheduling_conflicts(inputs));
    let invalid_configurations =
        isolated("invalid_configurations", analyze_invalid_configurations(inputs));
    let constraint_violations =
        isolated("constraint_violations", analyze_constraint_violations(inputs));

    let (primary_reason, severity) = rank_root_cause(
        &resource_overloads,
        &scheduling_conflicts,
        &invalid_configurations,
        &constraint_violations,
    );
    let recommendations = recommendations(
        &resource_overloads,
        &scheduling_conflicts,
        &invalid_configurations,
        &constraint_violations,
        inputs.loads,
        policy,
    );

    debug!(
        %primary_reason,
        %severity,
        overloads = resource_overloads.len(),
        conflicts = scheduling_conflicts.len(),
        invalid = invalid_configurations.len(),
        violations = constraint_violations.len(),
        "infeasibility diagnosed"
    );

    InfeasibilityDiagnostics {
        primary_reason,
        severity,
        resource_overloads,
        scheduling_conflicts,
        invalid_configurations,
        constraint_violations,
        recommendations,
    }
}

fn isolated<T>(analyzer: &str, result: Result<Vec<T>, AnalyzerError>) -> Vec<T> {
    result.unwrap_or_else(|error| {
        warn!(analyzer, %error, "diagnostic analyzer failed, contributing no findings");
        Vec::new()
    })
}

fn check_role(role: &str) -> Result<(), AnalyzerError> {
    if role.trim().is_empty() {
        return Err(AnalyzerError::MalformedRole(role.to_string()));
    }
    Ok(())
}

/// One activity as seen through its occurrences
struct ActivityGroup<'o> {
    activity: &'o Activity,
    duration_slots: u32,
    occurrences: u32,
}

/// Distinct activities in occurrence order
fn group_by_activity<'o>(occurrences: &[Occurrence<'o>]) -> Vec<ActivityGroup<'o>> {
    let mut grouped: Vec<ActivityGroup<'o>> = Vec::new();
    for occurrence in occurrences {
        match grouped.last_mut() {
            Some(group) if std::ptr::eq(group.activity, occurrence.activity) => {
                group.occurrences += 1;
            }
            _ => grouped.push(ActivityGroup {
                activity: occurrence.activity,
                duration_slots: occurrence.duration_slots,
                occurrences: 1,
            }),
        }
    }
    grouped
}
