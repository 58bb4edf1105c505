//! Solver adapter
//!
//! [`FeasibilitySolver`] is the seam between the analysis and a concrete
//! constraint solver. [`PumpkinSolver`] searches with the Pumpkin CP solver
//! under a wall-clock budget that also honours a [`CancellationToken`].

use pumpkin_solver::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_solver::optimisation::OptimisationDirection;
use pumpkin_solver::results::{OptimisationResult, ProblemSolution, SolutionReference};
use pumpkin_solver::termination::{TerminationCondition, TimeBudget};
use pumpkin_solver::Solver;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::model::{ConstraintModel, StartVariables};

/// Solver terminal state, before it is mapped onto the outward vocabulary
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolveVerdict {
    /// Search completed with an assignment; one start slot per occurrence
    Optimal(Vec<u32>),
    /// An assignment was found but search did not complete
    Feasible(Vec<u32>),
    Infeasible,
    /// Budget exhausted (or search interrupted) without proof either way
    Unknown,
    /// The solver rejected the model or returned an inconsistent assignment
    ModelInvalid,
}

impl SolveVerdict {
    /// Start slots, when a feasible assignment exists
    pub fn starts(&self) -> Option<&[u32]> {
        match self {
            SolveVerdict::Optimal(starts) | SolveVerdict::Feasible(starts) => Some(starts),
            _ => None,
        }
    }
}

/// A constraint solver able to decide a [`ConstraintModel`]
pub trait FeasibilitySolver: Send + Sync {
    /// Decide the model within `time_limit`. The model is consumed; every
    /// call works on its own fresh model.
    fn solve(
        &self,
        model: ConstraintModel,
        time_limit: Duration,
        cancel: &CancellationToken,
    ) -> SolveVerdict;

    fn name(&self) -> &'static str;
}

/// Pumpkin search with its default brancher
#[derive(Clone, Copy, Debug, Default)]
pub struct PumpkinSolver;

impl FeasibilitySolver for PumpkinSolver {
    fn solve(
        &self,
        model: ConstraintModel,
        time_limit: Duration,
        cancel: &CancellationToken,
    ) -> SolveVerdict {
        if let Some(refutation) = model.refutation() {
            debug!(?refutation, "model refuted while building; skipping search");
            return SolveVerdict::Infeasible;
        }

        let (mut solver, starts) = model.into_parts();
        // Feasibility has no preference between schedules; a constant
        // objective makes the first assignment found optimal.
        let objective = solver.new_bounded_integer(0, 0);
        let mut brancher = solver.default_brancher();
        let mut termination = CancellableBudget::new(time_limit, cancel);

        fn noop_callback<B>(_: &Solver, _: SolutionReference, _: &B) {}
        let result = solver.optimise(
            &mut brancher,
            &mut termination,
            LinearSatUnsat::new(OptimisationDirection::Minimise, objective, noop_callback),
        );

        match result {
            OptimisationResult::Optimal(solution) => {
                decoded(decode_starts(&starts, |var| solution.get_integer_value(var)), SolveVerdict::Optimal)
            }
            OptimisationResult::Satisfiable(solution) => {
                decoded(decode_starts(&starts, |var| solution.get_integer_value(var)), SolveVerdict::Feasible)
            }
            OptimisationResult::Unsatisfiable => SolveVerdict::Infeasible,
            OptimisationResult::Unknown => SolveVerdict::Unknown,
        }
    }

    fn name(&self) -> &'static str {
        "pumpkin"
    }
}

fn decoded(assignment: Option<Vec<u32>>, verdict: fn(Vec<u32>) -> SolveVerdict) -> SolveVerdict {
    match assignment {
        Some(starts) => verdict(starts),
        None => {
            warn!("solver returned an assignment that breaks exactly-once");
            SolveVerdict::ModelInvalid
        }
    }
}

/// Read back the single start slot of each occurrence
fn decode_starts(
    starts: &[StartVariables],
    value_of: impl Fn(pumpkin_solver::variables::DomainId) -> i32,
) -> Option<Vec<u32>> {
    starts
        .iter()
        .map(|occurrence| {
            let mut chosen = occurrence.iter().filter(|(_, var)| value_of(*var) == 1);
            let (start, _) = chosen.next()?;
            chosen.next().is_none().then_some(start)
        })
        .collect()
}

/// Time budget that also stops as soon as the token is cancelled
struct CancellableBudget<'a> {
    budget: TimeBudget,
    cancel: &'a CancellationToken,
}

impl<'a> CancellableBudget<'a> {
    fn new(time_limit: Duration, cancel: &'a CancellationToken) -> Self {
        Self {
            budget: TimeBudget::starting_now(time_limit),
            cancel,
        }
    }
}

impl TerminationCondition for CancellableBudget<'_> {
    fn should_stop(&mut self) -> bool {
        self.cancel.is_cancelled() || self.budget.should_stop()
    }
}
