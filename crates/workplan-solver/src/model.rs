//! Constraint model construction
//!
//! Each occurrence gets one 0/1 "starts at slot s" variable for every start
//! slot that lets it finish inside the horizon grid:
//!
//! - **Exactly-once**: `Σ start[o][s] == 1`
//! - **Non-working exclusion**: every start whose interval covers a blocked
//!   slot is fixed to 0
//! - **Capacity**: for each working slot and registered role,
//!   `Σ demand[o][r] × start[o][s'] <= capacity[r]` over the starts `s'` that
//!   keep `o` active at the slot
//!
//! An occurrence is active at slot `s` when it started in the trailing window
//! `[max(0, s - d + 1), s]`, so no separate "is-active" variables are needed.
//! Every call builds a fresh [`ConstraintModel`]; nothing is shared between
//! analyses.

use pumpkin_solver::constraints::{self as cp, Constraint};
use pumpkin_solver::variables::{DomainId, TransformableVariable};
use pumpkin_solver::Solver;
use tracing::{debug, instrument};
use workplan_core::{
    ModelBuildError, Occurrence, OccurrenceId, PlanningHorizon, ResourceCapacity, SLOTS_PER_DAY,
};

use crate::roles::RoleRegistry;

/// Start indicators of one occurrence; index == start slot
#[derive(Clone, Debug, Default)]
pub struct StartVariables {
    duration: u32,
    vars: Vec<DomainId>,
}

impl StartVariables {
    pub(crate) fn from_vars(duration: u32, vars: Vec<DomainId>) -> Self {
        Self { duration, vars }
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Number of admissible start slots
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, start: u32) -> Option<DomainId> {
        self.vars.get(start as usize).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, DomainId)> + '_ {
        (0u32..).zip(self.vars.iter().copied())
    }

    /// Starts that keep the occurrence active at `slot`
    pub fn covering(&self, slot: u32) -> impl Iterator<Item = (u32, DomainId)> + '_ {
        let first = (slot + 1).saturating_sub(self.duration);
        (first..=slot).filter_map(move |start| self.get(start).map(|var| (start, var)))
    }
}

/// Why a model is known to be unsatisfiable before any search
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refutation {
    /// The occurrence has no start slot that fits the horizon
    Unplaceable(OccurrenceId),
    /// Posting a constraint emptied a domain at the root
    RootConflict,
}

/// A freshly built, single-use feasibility model
pub struct ConstraintModel {
    solver: Solver,
    starts: Vec<StartVariables>,
    roles: RoleRegistry,
    num_variables: usize,
    num_constraints: usize,
    refutation: Option<Refutation>,
}

impl std::fmt::Debug for ConstraintModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintModel")
            .field("occurrences", &self.starts.len())
            .field("roles", &self.roles.len())
            .field("num_variables", &self.num_variables)
            .field("num_constraints", &self.num_constraints)
            .field("refutation", &self.refutation)
            .finish()
    }
}

impl ConstraintModel {
    /// Build the model for one analysis run.
    ///
    /// The role set is the union of capacity roles and demanded roles;
    /// demanded roles without capacity are constrained at headcount 0.
    #[instrument(skip_all, fields(occurrences = occurrences.len(), days = horizon.day_count()))]
    pub fn build(
        occurrences: &[Occurrence<'_>],
        capacity: &ResourceCapacity,
        horizon: &PlanningHorizon,
    ) -> Result<Self, ModelBuildError> {
        let grid = horizon.day_count() as u64 * u64::from(SLOTS_PER_DAY);
        if grid > i32::MAX as u64 {
            return Err(ModelBuildError::HorizonTooLarge { slots: grid });
        }
        let total_slots = horizon.total_slots();

        let roles = RoleRegistry::for_occurrences(capacity, occurrences);
        let mut model = Self {
            solver: Solver::default(),
            starts: Vec::with_capacity(occurrences.len()),
            roles,
            num_variables: 0,
            num_constraints: 0,
            refutation: None,
        };

        model.create_start_variables(occurrences, total_slots);

        let tag = model.solver.new_constraint_tag();

        // Exactly-once
        for (occurrence, starts) in occurrences.iter().zip(&model.starts) {
            if starts.is_empty() && model.refutation.is_none() {
                debug!(occurrence = %occurrence.id, activity = %occurrence.activity.activity_id,
                    "occurrence cannot finish inside the horizon");
                model.refutation = Some(Refutation::Unplaceable(occurrence.id));
            }
        }
        for idx in 0..model.starts.len() {
            if model.starts[idx].is_empty() {
                continue;
            }
            let terms: Vec<_> = model.starts[idx].iter().map(|(_, var)| var.scaled(1)).collect();
            model.post(cp::equals(terms, 1, tag));
        }

        // Non-working exclusion, one constraint per blocked start
        let blocked_slots = horizon.non_working_slots(&capacity.non_working_dates);
        let mut blocked: Vec<Vec<bool>> = model
            .starts
            .iter()
            .map(|starts| vec![false; starts.len()])
            .collect();
        for &slot in &blocked_slots {
            for (idx, starts) in model.starts.iter().enumerate() {
                for (start, _) in starts.covering(slot) {
                    blocked[idx][start as usize] = true;
                }
            }
        }
        for idx in 0..model.starts.len() {
            for (start, var) in model.starts[idx].iter().collect::<Vec<_>>() {
                if blocked[idx][start as usize] {
                    model.post(cp::equals(vec![var.scaled(1)], 0, tag));
                }
            }
        }

        // Capacity, skipping zero-demand terms and blocked starts
        let role_limits = model.role_limits(occurrences)?;
        for slot in (0..total_slots).filter(|&s| horizon.is_working_slot(s, &capacity.non_working_dates)) {
            for (limit, demands) in &role_limits {
                let terms: Vec<_> = demands
                    .iter()
                    .flat_map(|&(idx, demand)| {
                        let blocked = &blocked[idx];
                        model.starts[idx]
                            .covering(slot)
                            .filter(move |(start, _)| !blocked[*start as usize])
                            .map(move |(_, var)| var.scaled(demand))
                    })
                    .collect();
                if !terms.is_empty() {
                    model.post(cp::less_than_or_equals(terms, *limit, tag));
                }
            }
        }

        debug!(
            variables = model.num_variables,
            constraints = model.num_constraints,
            roles = model.roles.len(),
            refuted = model.refutation.is_some(),
            "constraint model built"
        );
        Ok(model)
    }

    fn create_start_variables(&mut self, occurrences: &[Occurrence<'_>], total_slots: u32) {
        for occurrence in occurrences {
            let duration = occurrence.duration_slots;
            let admissible = (total_slots + 1).saturating_sub(duration);
            let vars: Vec<DomainId> = (0..admissible)
                .map(|_| self.solver.new_bounded_integer(0, 1))
                .collect();
            self.num_variables += vars.len();
            self.starts.push(StartVariables::from_vars(duration, vars));
        }
    }

    /// Per registered role: its capacity and every (occurrence, demand) with demand > 0
    fn role_limits(
        &self,
        occurrences: &[Occurrence<'_>],
    ) -> Result<Vec<(i32, Vec<(usize, i32)>)>, ModelBuildError> {
        let coefficient = |role: &str, value: u32| {
            i32::try_from(value).map_err(|_| ModelBuildError::CoefficientOverflow {
                role: role.to_string(),
                value: u64::from(value),
            })
        };

        self.roles
            .iter()
            .map(|entry| {
                let limit = coefficient(&entry.name, entry.capacity)?;
                let demands = occurrences
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, occurrence)| {
                        let demand = occurrence.demand(&entry.name);
                        (demand > 0).then_some((idx, demand))
                    })
                    .map(|(idx, demand)| Ok((idx, coefficient(&entry.name, demand)?)))
                    .collect::<Result<Vec<_>, ModelBuildError>>()?;
                Ok((limit, demands))
            })
            .collect()
    }

    fn post(&mut self, constraint: impl Constraint) {
        if self.refutation.is_some() {
            return;
        }
        self.num_constraints += 1;
        if self.solver.add_constraint(constraint).post().is_err() {
            debug!("constraint refuted at the root");
            self.refutation = Some(Refutation::RootConflict);
        }
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn num_constraints(&self) -> usize {
        self.num_constraints
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Start variables per occurrence, indexed by `OccurrenceId`
    pub fn starts(&self) -> &[StartVariables] {
        &self.starts
    }

    pub fn refutation(&self) -> Option<Refutation> {
        self.refutation
    }

    pub(crate) fn into_parts(self) -> (Solver, Vec<StartVariables>) {
        (self.solver, self.starts)
    }
}
