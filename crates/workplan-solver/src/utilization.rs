//! Per-role demand versus capacity over the horizon

use std::collections::BTreeMap;
use workplan_core::{Occurrence, PlanningHorizon, ResourceCapacity, RoleName};

use crate::roles::RoleRegistry;

/// Aggregate load of one role across every occurrence
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleLoad {
    pub role: RoleName,
    /// Headcount available in every working slot
    pub capacity: u32,
    /// Whether the capacity map defines the role
    pub defined: bool,
    /// Σ demand × duration_slots
    pub demand_slots: u64,
    /// capacity × working slots
    pub capacity_slots: u64,
}

impl RoleLoad {
    /// Demand as a percentage of capacity; 0 when there is no capacity
    pub fn utilization(&self) -> f64 {
        if self.capacity_slots == 0 {
            return 0.0;
        }
        100.0 * self.demand_slots as f64 / self.capacity_slots as f64
    }

    pub fn excess_slots(&self) -> u64 {
        self.demand_slots.saturating_sub(self.capacity_slots)
    }
}

/// Loads for every registered role, in role-name order
pub fn role_loads(
    occurrences: &[Occurrence<'_>],
    capacity: &ResourceCapacity,
    horizon: &PlanningHorizon,
) -> Vec<RoleLoad> {
    let working_slots = u64::from(horizon.working_slots(&capacity.non_working_dates));
    let registry = RoleRegistry::for_occurrences(capacity, occurrences);

    registry
        .iter()
        .map(|entry| {
            let demand_slots = occurrences
                .iter()
                .map(|o| u64::from(o.demand(&entry.name)) * u64::from(o.duration_slots))
                .fold(0u64, u64::saturating_add);

            RoleLoad {
                role: entry.name.clone(),
                capacity: entry.capacity,
                defined: entry.defined,
                demand_slots,
                capacity_slots: u64::from(entry.capacity).saturating_mul(working_slots),
            }
        })
        .collect()
}

/// Utilization percentage per role defined in the capacity map
pub fn utilization(
    occurrences: &[Occurrence<'_>],
    capacity: &ResourceCapacity,
    horizon: &PlanningHorizon,
) -> BTreeMap<RoleName, f64> {
    utilization_of(&role_loads(occurrences, capacity, horizon))
}

/// Same as [`utilization`], from precomputed loads
pub fn utilization_of(loads: &[RoleLoad]) -> BTreeMap<RoleName, f64> {
    loads
        .iter()
        .filter(|load| load.defined)
        .map(|load| (load.role.clone(), load.utilization()))
        .collect()
}
