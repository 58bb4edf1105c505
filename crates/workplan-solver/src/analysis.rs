//! Analysis entry point
//!
//! One call runs `Building → Solving → (Diagnosing) → Done` on a fresh model
//! and always yields an [`AnalysisOutcome`]: configuration and build failures
//! become `ERROR:<message>` results, a cancelled run yields
//! [`AnalysisOutcome::Cancelled`] and nothing else.

use chrono::Utc;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn};
use workplan_core::{
    Activity, AnalysisError, AnalysisOptions, AnalysisOutcome, AnalysisResult,
    InfeasibilityDiagnostics, Occurrence, Placement, PlanningHorizon, ResourceCapacity,
    SolverStats, SolverStatus,
};

use crate::adapter::{FeasibilitySolver, PumpkinSolver, SolveVerdict};
use crate::cancel::CancellationToken;
use crate::diagnostics::{diagnose, DiagnosticInputs};
use crate::expand::expand_occurrences;
use crate::model::ConstraintModel;
use crate::utilization::{role_loads, utilization_of};

/// Inputs of one analysis, read-only for its whole duration
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    /// Activities already filtered to the planning quarter
    pub activities: Vec<Activity>,
    pub capacity: ResourceCapacity,
    pub horizon: PlanningHorizon,
}

impl AnalysisRequest {
    pub fn new(activities: Vec<Activity>, capacity: ResourceCapacity, horizon: PlanningHorizon) -> Self {
        Self {
            activities,
            capacity,
            horizon,
        }
    }
}

/// Progress of a run, reported to observers as it advances
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnalysisPhase {
    Building,
    Solving,
    Diagnosing,
    Done,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AnalysisPhase::Building => "building",
            AnalysisPhase::Solving => "solving",
            AnalysisPhase::Diagnosing => "diagnosing",
            AnalysisPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Feasibility analyzer over a pluggable solver backend
#[derive(Clone, Debug, Default)]
pub struct Analyzer<S = PumpkinSolver> {
    backend: S,
    options: AnalysisOptions,
}

impl Analyzer<PumpkinSolver> {
    pub fn new(options: AnalysisOptions) -> Self {
        Self {
            backend: PumpkinSolver,
            options,
        }
    }
}

impl<S: FeasibilitySolver> Analyzer<S> {
    pub fn with_backend(backend: S, options: AnalysisOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn analyze(&self, request: &AnalysisRequest, cancel: &CancellationToken) -> AnalysisOutcome {
        self.analyze_with_progress(request, cancel, |_| {})
    }

    /// Run one analysis, reporting each phase to `on_phase`
    pub fn analyze_with_progress(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
        mut on_phase: impl FnMut(AnalysisPhase),
    ) -> AnalysisOutcome {
        let span = info_span!(
            "analysis",
            backend = self.backend.name(),
            activities = request.activities.len(),
            days = request.horizon.day_count()
        );
        let _guard = span.enter();
        let started = Instant::now();
        let total_slots = request.horizon.total_slots();
        let capacity_slots = request.horizon.working_slots(&request.capacity.non_working_dates);

        if cancel.is_cancelled() {
            return cancelled("before start");
        }

        on_phase(AnalysisPhase::Building);
        let occurrences = match expand_occurrences(&request.activities) {
            Ok(occurrences) => occurrences,
            Err(error) => return Self::failed(request, started, &error.into()),
        };
        let loads = role_loads(&occurrences, &request.capacity, &request.horizon);
        let utilization = utilization_of(&loads);

        let model = match ConstraintModel::build(&occurrences, &request.capacity, &request.horizon) {
            Ok(model) => model,
            Err(error) => return Self::failed(request, started, &error.into()),
        };
        let num_variables = model.num_variables();
        let num_constraints = model.num_constraints();

        if cancel.is_cancelled() {
            return cancelled("after model build");
        }

        on_phase(AnalysisPhase::Solving);
        let solve_started = Instant::now();
        let verdict = panic::catch_unwind(AssertUnwindSafe(|| {
            self.backend.solve(model, self.options.time_limit, cancel)
        }));
        let solve_time = solve_started.elapsed();

        let verdict = match verdict {
            Ok(verdict) => verdict,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(%message, "solver panicked");
                return Self::completed(
                    request,
                    SolverStats {
                        status: SolverStatus::Error(message),
                        solve_time: started.elapsed().as_secs_f64(),
                        num_variables,
                        num_constraints,
                    },
                    (total_slots, capacity_slots),
                    utilization,
                    None,
                    None,
                );
            }
        };

        // A search interrupted by cancellation reports Unknown; never expose it
        if cancel.is_cancelled() {
            return cancelled("after search");
        }

        let status = status_of(&verdict);
        info!(%status, solve_time_ms = solve_time.as_millis() as u64, "solver finished");

        let schedule = verdict
            .starts()
            .map(|starts| placements(&occurrences, starts, &request.horizon));

        let diagnostics = if verdict == SolveVerdict::Infeasible {
            on_phase(AnalysisPhase::Diagnosing);
            Some(diagnose(
                &DiagnosticInputs {
                    occurrences: &occurrences,
                    capacity: &request.capacity,
                    loads: &loads,
                    total_slots: capacity_slots,
                },
                &self.options.policy,
            ))
        } else {
            None
        };

        on_phase(AnalysisPhase::Done);
        Self::completed(
            request,
            SolverStats {
                status,
                solve_time: solve_time.as_secs_f64(),
                num_variables,
                num_constraints,
            },
            (total_slots, capacity_slots),
            utilization,
            schedule,
            diagnostics,
        )
    }

    fn completed(
        request: &AnalysisRequest,
        solver_stats: SolverStats,
        (total_slots, capacity_slots): (u32, u32),
        utilization: std::collections::BTreeMap<String, f64>,
        schedule: Option<Vec<Placement>>,
        infeasibility_diagnostics: Option<InfeasibilityDiagnostics>,
    ) -> AnalysisOutcome {
        AnalysisOutcome::Completed(Box::new(AnalysisResult {
            timestamp: Utc::now(),
            feasible: solver_stats.status.is_feasible(),
            utilization,
            solver_stats,
            total_slots,
            capacity_slots,
            schedule,
            infeasibility_diagnostics,
            resource_capacity: request.capacity.clone(),
        }))
    }

    /// `ERROR:<message>` result carrying the time spent so far
    fn failed(
        request: &AnalysisRequest,
        started: Instant,
        error: &AnalysisError,
    ) -> AnalysisOutcome {
        warn!(%error, "analysis aborted");
        let horizon = &request.horizon;
        Self::completed(
            request,
            SolverStats {
                status: SolverStatus::Error(error.to_string()),
                solve_time: started.elapsed().as_secs_f64(),
                num_variables: 0,
                num_constraints: 0,
            },
            (
                horizon.total_slots(),
                horizon.working_slots(&request.capacity.non_working_dates),
            ),
            Default::default(),
            None,
            None,
        )
    }
}

/// Analyze with default options on the Pumpkin backend
pub fn analyze(request: &AnalysisRequest, time_limit: Duration, cancel: &CancellationToken) -> AnalysisOutcome {
    Analyzer::new(AnalysisOptions::default().time_limit(time_limit)).analyze(request, cancel)
}

fn cancelled(at: &str) -> AnalysisOutcome {
    info!(at, "analysis cancelled");
    AnalysisOutcome::Cancelled
}

fn status_of(verdict: &SolveVerdict) -> SolverStatus {
    match verdict {
        SolveVerdict::Optimal(_) => SolverStatus::Optimal,
        SolveVerdict::Feasible(_) => SolverStatus::Feasible,
        SolveVerdict::Infeasible => SolverStatus::Infeasible,
        SolveVerdict::Unknown => SolverStatus::Unknown,
        SolveVerdict::ModelInvalid => SolverStatus::ModelInvalid,
    }
}

fn placements(occurrences: &[Occurrence<'_>], starts: &[u32], horizon: &PlanningHorizon) -> Vec<Placement> {
    debug!(placed = starts.len(), "extracting schedule");
    occurrences
        .iter()
        .zip(starts)
        .map(|(occurrence, &start_slot)| Placement {
            activity_id: occurrence.activity.activity_id.clone(),
            occurrence_index: occurrence.index,
            start_slot,
            end_slot: start_slot + occurrence.duration_slots,
            day: horizon.day_of_slot(start_slot),
            date: horizon.date_of_slot(start_slot),
        })
        .collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "solver panicked".to_string())
}
