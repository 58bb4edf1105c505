//! Text reports
//!
//! Verdict, utilization table, solver statistics and the diagnostics panel
//! for `analyze`; the workplan summary for `check`; slot counts for `horizon`.

use std::io::{self, Write};
use workplan_core::{
    AnalysisOutcome, AnalysisResult, ConflictKind, FinancialQuarter, InfeasibilityDiagnostics,
    InvalidConfigurationKind, PlanningHorizon, SolverStatus, WorkplanSummary,
};

pub fn write_outcome(out: &mut dyn Write, outcome: &AnalysisOutcome) -> io::Result<()> {
    match outcome.result() {
        Some(result) => write_result(out, result),
        None => writeln!(out, "Analysis cancelled"),
    }
}

pub fn write_result(out: &mut dyn Write, result: &AnalysisResult) -> io::Result<()> {
    writeln!(out, "Verdict: {}", verdict(&result.solver_stats.status))?;
    writeln!(
        out,
        "Horizon: {} slots ({} working)",
        result.total_slots, result.capacity_slots
    )?;
    writeln!(out)?;

    if !result.utilization.is_empty() {
        writeln!(out, "{:<20} {:>9} {:>12}", "Role", "Capacity", "Utilization")?;
        for (role, percentage) in &result.utilization {
            let marker = if *percentage > 100.0 { "  !" } else { "" };
            writeln!(
                out,
                "{:<20} {:>9} {:>11.1}%{}",
                role,
                result.resource_capacity.headcount(role),
                percentage,
                marker
            )?;
        }
        writeln!(out)?;
    }

    let stats = &result.solver_stats;
    writeln!(
        out,
        "Solver: {} in {:.3}s ({} variables, {} constraints)",
        stats.status, stats.solve_time, stats.num_variables, stats.num_constraints
    )?;

    if let Some(schedule) = &result.schedule {
        writeln!(out, "Placed {} occurrences", schedule.len())?;
    }

    if let Some(diagnostics) = &result.infeasibility_diagnostics {
        writeln!(out)?;
        write_diagnostics(out, diagnostics)?;
    }
    Ok(())
}

fn verdict(status: &SolverStatus) -> &'static str {
    match status {
        SolverStatus::Optimal | SolverStatus::Feasible => "FEASIBLE",
        SolverStatus::Infeasible => "INFEASIBLE",
        SolverStatus::Unknown => "UNDECIDED (time limit reached)",
        SolverStatus::ModelInvalid => "MODEL INVALID",
        SolverStatus::Error(_) => "ERROR",
    }
}

pub fn write_diagnostics(out: &mut dyn Write, diagnostics: &InfeasibilityDiagnostics) -> io::Result<()> {
    writeln!(
        out,
        "Primary reason: {} [{}]",
        diagnostics.primary_reason, diagnostics.severity
    )?;

    for overload in &diagnostics.resource_overloads {
        writeln!(
            out,
            "  [{}] {} at {:.1}%: {} slots over, needs {} more",
            overload.severity,
            overload.role,
            overload.utilization_percentage,
            overload.excess_slots,
            overload.min_additional_staff
        )?;
    }
    for conflict in &diagnostics.scheduling_conflicts {
        let label = match conflict.kind {
            ConflictKind::ImpossibleActivity { .. } => "impossible activity",
            ConflictKind::TimeHorizonExceeded { .. } => "time horizon exceeded",
        };
        writeln!(out, "  [{}] {}: {}", conflict.severity, label, conflict.description)?;
    }
    for finding in &diagnostics.invalid_configurations {
        let label = match finding.kind {
            InvalidConfigurationKind::ZeroResources { .. } => "zero resources",
            InvalidConfigurationKind::ExcessiveFrequency { .. } => "excessive frequency",
        };
        writeln!(out, "  [{}] {}: {}", finding.severity, label, finding.description)?;
    }
    for violation in &diagnostics.constraint_violations {
        writeln!(
            out,
            "  [{}] missing resource types: {}",
            violation.severity, violation.description
        )?;
    }

    if !diagnostics.recommendations.is_empty() {
        writeln!(out)?;
        writeln!(out, "Recommendations:")?;
        for (i, recommendation) in diagnostics.recommendations.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, recommendation)?;
        }
    }
    Ok(())
}

pub fn write_summary(out: &mut dyn Write, summary: &WorkplanSummary, excluded: usize) -> io::Result<()> {
    writeln!(out, "Activities:  {}", summary.total_activities)?;
    writeln!(out, "Occurrences: {}", summary.total_occurrences)?;
    if excluded > 0 {
        writeln!(out, "Excluded:    {} (other quarters)", excluded)?;
    }
    if !summary.quarters.is_empty() {
        let quarters: Vec<&str> = summary.quarters.iter().map(String::as_str).collect();
        writeln!(out, "Quarters:    {}", quarters.join(", "))?;
    }

    writeln!(out)?;
    writeln!(out, "Demand (headcount x occurrences):")?;
    for (role, demand) in summary.total_demand.iter() {
        writeln!(out, "  {:<20} {:>6}", role, demand)?;
    }

    writeln!(out)?;
    writeln!(out, "Durations:")?;
    for (slots, count) in &summary.duration_breakdown {
        writeln!(out, "  {:>4.2} day  {:>6}", f64::from(*slots) / 4.0, count)?;
    }
    Ok(())
}

pub fn write_horizon(out: &mut dyn Write, quarter: &FinancialQuarter, horizon: &PlanningHorizon) -> io::Result<()> {
    writeln!(out, "{} ({} to {})", quarter, quarter.start(), quarter.end())?;
    writeln!(out, "Working days: {}", horizon.working_day_count())?;
    writeln!(out, "Slots:        {}", horizon.capacity_slots())
}
