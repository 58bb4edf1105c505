//! Integration tests for feasibility analysis
//!
//! End-to-end runs through the Pumpkin backend: verdicts, utilization,
//! schedule validity and diagnostics for the reference scenarios.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use workplan_core::{
    Activity, AnalysisOptions, AnalysisResult, ConflictKind, PlanningHorizon, ResourceCapacity,
    RootCause, Severity, SolverStatus,
};
use workplan_solver::{analyze, AnalysisRequest, Analyzer, CancellationToken};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn run(request: &AnalysisRequest) -> AnalysisResult {
    analyze(request, Duration::from_secs(20), &CancellationToken::new())
        .into_result()
        .expect("analysis should complete")
}

// =============================================================================
// Reference Scenarios
// =============================================================================

#[test]
fn single_full_day_fits_exactly() {
    let request = AnalysisRequest::new(
        vec![Activity::new("A1").frequency(1).duration(1.0).requires("Ranger", 1)],
        ResourceCapacity::new().role("Ranger", 1),
        PlanningHorizon::with_working_days(1),
    );

    let result = run(&request);
    assert!(result.feasible);
    assert_eq!(result.solver_stats.status, SolverStatus::Optimal);
    assert_eq!(result.utilization["Ranger"], 100.0);
    assert!(result.infeasibility_diagnostics.is_none());
    assert_eq!(result.total_slots, 4);
    assert_eq!(result.capacity_slots, 4);
}

#[test]
fn zero_capacity_is_an_impossible_activity() {
    let request = AnalysisRequest::new(
        vec![Activity::new("A1").duration(1.0).requires("Ranger", 1)],
        ResourceCapacity::new().role("Ranger", 0),
        PlanningHorizon::with_working_days(1),
    );

    let result = run(&request);
    assert!(!result.feasible);
    assert_eq!(result.solver_stats.status, SolverStatus::Infeasible);
    assert_eq!(result.utilization["Ranger"], 0.0);

    let diagnostics = result.infeasibility_diagnostics.unwrap();
    assert!(diagnostics.scheduling_conflicts.iter().any(|c| {
        c.severity == Severity::Critical
            && matches!(c.kind, ConflictKind::ImpossibleActivity { ref role, .. } if role == "Ranger")
    }));
    assert_eq!(diagnostics.primary_reason, RootCause::ImpossibleActivityRequirements);
    assert!(!diagnostics.primary_reason.is_overload());
    assert_eq!(diagnostics.severity, Severity::Critical);
}

#[test]
fn missing_role_preempts_overload_labels() {
    // Ranger is also overloaded at 150%
    let request = AnalysisRequest::new(
        vec![Activity::new("A1")
            .frequency(3)
            .duration(1.0)
            .requires("Ranger", 1)
            .requires("Drone", 1)],
        ResourceCapacity::new().role("Ranger", 1),
        PlanningHorizon::with_working_days(2),
    );

    let result = run(&request);
    assert!(!result.feasible);

    let diagnostics = result.infeasibility_diagnostics.unwrap();
    assert_eq!(diagnostics.missing_roles(), vec!["Drone"]);
    assert_eq!(diagnostics.resource_overloads.len(), 1);
    assert_eq!(diagnostics.resource_overloads[0].severity, Severity::Critical);
    assert_eq!(diagnostics.primary_reason, RootCause::MissingResourceTypes);
    assert_eq!(diagnostics.severity, Severity::Critical);
    assert!(!result.utilization.contains_key("Drone"));
}

#[test]
fn time_horizon_excess_is_exact() {
    // 6 full days of work into 5 days
    let request = AnalysisRequest::new(
        vec![Activity::new("A1").frequency(6).duration(1.0).requires("Ranger", 1)],
        ResourceCapacity::new().role("Ranger", 1),
        PlanningHorizon::with_working_days(5),
    );

    let result = run(&request);
    assert!(!result.feasible);

    let diagnostics = result.infeasibility_diagnostics.unwrap();
    let excess: Vec<u64> = diagnostics
        .scheduling_conflicts
        .iter()
        .filter_map(|c| match c.kind {
            ConflictKind::TimeHorizonExceeded { excess_slots, required_slots, available_slots } => {
                assert_eq!(required_slots, 24);
                assert_eq!(available_slots, 20);
                Some(excess_slots)
            }
            _ => None,
        })
        .collect();
    assert_eq!(excess, vec![4]);
    assert_eq!(diagnostics.primary_reason, RootCause::ResourceCapacityInsufficient);
}

#[test]
fn overlapping_work_fits_with_enough_staff() {
    // More work than days, but capacity lets occurrences run side by side
    let request = AnalysisRequest::new(
        vec![Activity::new("A1").frequency(6).duration(1.0).requires("Ranger", 1)],
        ResourceCapacity::new().role("Ranger", 2),
        PlanningHorizon::with_working_days(5),
    );

    let result = run(&request);
    assert!(result.feasible);
    assert_eq!(result.schedule.unwrap().len(), 6);
}

// =============================================================================
// Schedule Validity
// =============================================================================

fn mixed_workplan() -> Vec<Activity> {
    vec![
        Activity::new("patrol").frequency(4).duration(0.5).requires("Ranger", 2),
        Activity::new("survey")
            .frequency(2)
            .duration(1.0)
            .requires("Ranger", 1)
            .requires("Pilot", 1),
        Activity::new("admin").frequency(6).duration(0.25).requires("Admin", 1),
    ]
}

#[test]
fn feasible_schedule_respects_every_constraint() {
    let days: Vec<NaiveDate> = (6..=10).map(|d| date(2025, 1, d)).collect();
    let holiday = days[2];
    let capacity = ResourceCapacity::new()
        .role("Ranger", 3)
        .role("Pilot", 1)
        .role("Admin", 1)
        .non_working(holiday);
    let activities = mixed_workplan();
    let request = AnalysisRequest::new(activities.clone(), capacity.clone(), PlanningHorizon::from_dates(days));

    let result = run(&request);
    assert!(result.feasible);
    assert_eq!(result.capacity_slots, 16);

    let schedule = result.schedule.unwrap();
    let expected: u32 = activities.iter().map(|a| a.frequency).sum();
    assert_eq!(schedule.len(), expected as usize);

    // Every occurrence placed exactly once
    let keys: HashSet<(&str, u32)> = schedule
        .iter()
        .map(|p| (p.activity_id.as_str(), p.occurrence_index))
        .collect();
    assert_eq!(keys.len(), schedule.len());

    // Never on the holiday
    for placement in &schedule {
        for slot in placement.start_slot..placement.end_slot {
            assert_ne!(slot / 4, 2, "{} #{} runs on the holiday", placement.activity_id, placement.occurrence_index);
        }
    }

    // Per-slot demand within capacity
    let mut load: BTreeMap<(u32, &str), u32> = BTreeMap::new();
    for placement in &schedule {
        let activity = activities.iter().find(|a| a.activity_id == placement.activity_id).unwrap();
        for slot in placement.start_slot..placement.end_slot {
            for (role, qty) in activity.resource_requirements.iter() {
                *load.entry((slot, role)).or_insert(0) += qty;
            }
        }
    }
    for ((slot, role), demand) in load {
        assert!(
            demand <= capacity.headcount(role),
            "slot {} uses {} {} of {}",
            slot,
            demand,
            role,
            capacity.headcount(role)
        );
    }
}

#[test]
fn placements_carry_calendar_dates() {
    let days: Vec<NaiveDate> = (6..=7).map(|d| date(2025, 1, d)).collect();
    let request = AnalysisRequest::new(
        vec![Activity::new("A1").frequency(2).duration(1.0).requires("Ranger", 1)],
        ResourceCapacity::new().role("Ranger", 1),
        PlanningHorizon::from_dates(days.clone()),
    );

    let result = run(&request);
    let mut dates: Vec<NaiveDate> = result
        .schedule
        .unwrap()
        .iter()
        .filter_map(|p| p.date)
        .collect();
    dates.sort();
    assert_eq!(dates, days);
}

// =============================================================================
// Invariants
// =============================================================================

#[test]
fn unused_zero_capacity_role_reports_zero() {
    let request = AnalysisRequest::new(
        vec![Activity::new("A1").requires("Ranger", 1)],
        ResourceCapacity::new().role("Ranger", 1).role("Pilot", 0),
        PlanningHorizon::with_working_days(2),
    );

    let result = run(&request);
    assert_eq!(result.utilization["Pilot"], 0.0);
    assert_eq!(result.utilization["Ranger"], 50.0);
}

#[test]
fn recommendations_never_exceed_eight() {
    let roles = ["A", "B", "C", "D", "E", "F"];
    let mut activity = Activity::new("everything").frequency(10).duration(1.0);
    for role in roles {
        activity = activity.requires(role, 1);
    }
    let mut capacity = ResourceCapacity::new();
    for role in roles {
        capacity = capacity.role(role, 1);
    }
    let request = AnalysisRequest::new(
        vec![activity, Activity::new("nobody").frequency(2)],
        capacity,
        PlanningHorizon::with_working_days(2),
    );

    let result = run(&request);
    let diagnostics = result.infeasibility_diagnostics.unwrap();
    assert_eq!(diagnostics.resource_overloads.len(), 6);
    assert!(diagnostics.recommendations.len() <= 8);
}

#[test]
fn policy_thresholds_change_severity() {
    let request = AnalysisRequest::new(
        vec![Activity::new("A1").frequency(3).duration(1.0).requires("Ranger", 1)],
        ResourceCapacity::new().role("Ranger", 1),
        PlanningHorizon::with_working_days(2),
    );
    let policy = workplan_core::DiagnosticsPolicy::from_toml("critical_utilization = 200.0\n").unwrap();
    let analyzer = Analyzer::new(AnalysisOptions::default().policy(policy));

    let result = analyzer
        .analyze(&request, &CancellationToken::new())
        .into_result()
        .unwrap();
    let diagnostics = result.infeasibility_diagnostics.unwrap();
    // 150% is only High under the stricter policy
    assert_eq!(diagnostics.resource_overloads[0].severity, Severity::High);
}

#[test]
fn repeated_runs_are_independent() {
    let infeasible = AnalysisRequest::new(
        vec![Activity::new("A1").requires("Drone", 1)],
        ResourceCapacity::new(),
        PlanningHorizon::with_working_days(1),
    );
    let feasible = AnalysisRequest::new(
        vec![Activity::new("A1").requires("Ranger", 1)],
        ResourceCapacity::new().role("Ranger", 1),
        PlanningHorizon::with_working_days(1),
    );
    let analyzer = Analyzer::new(AnalysisOptions::default());
    let cancel = CancellationToken::new();

    let first = analyzer.analyze(&infeasible, &cancel).into_result().unwrap();
    let second = analyzer.analyze(&feasible, &cancel).into_result().unwrap();
    let third = analyzer.analyze(&infeasible, &cancel).into_result().unwrap();

    assert!(!first.feasible);
    assert!(second.feasible);
    assert_eq!(first.solver_stats.num_variables, third.solver_stats.num_variables);
    assert_eq!(
        first.infeasibility_diagnostics.unwrap().primary_reason,
        third.infeasibility_diagnostics.unwrap().primary_reason
    );
}
