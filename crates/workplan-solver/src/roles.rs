//! Per-run role registry.
//!
//! The registry is the union of every role with a capacity entry and every
//! role an occurrence actually demands. Demanded roles without a capacity
//! entry are registered with headcount 0 and flagged as undefined.

use std::collections::BTreeMap;
use workplan_core::{Occurrence, ResourceCapacity, RoleName};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleEntry {
    pub name: RoleName,
    pub capacity: u32,
    /// Whether the capacity map defines this role
    pub defined: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleRegistry {
    entries: Vec<RoleEntry>,
}

impl RoleRegistry {
    pub fn new<'a>(capacity: &ResourceCapacity, demanded: impl IntoIterator<Item = &'a str>) -> Self {
        let mut roles: BTreeMap<&str, RoleEntry> = capacity
            .roles
            .iter()
            .map(|(name, headcount)| {
                (
                    name,
                    RoleEntry {
                        name: name.to_string(),
                        capacity: headcount,
                        defined: true,
                    },
                )
            })
            .collect();

        for name in demanded {
            roles.entry(name).or_insert_with(|| RoleEntry {
                name: name.to_string(),
                capacity: 0,
                defined: false,
            });
        }

        Self {
            entries: roles.into_values().collect(),
        }
    }

    /// Registry for the roles a set of occurrences demands (quantity > 0)
    pub fn for_occurrences(capacity: &ResourceCapacity, occurrences: &[Occurrence<'_>]) -> Self {
        Self::new(
            capacity,
            occurrences.iter().flat_map(|occurrence| {
                occurrence
                    .resource_demand()
                    .iter()
                    .filter(|(_, qty)| *qty > 0)
                    .map(|(role, _)| role)
            }),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleEntry> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&RoleEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Roles demanded but absent from the capacity map
    pub fn undefined(&self) -> impl Iterator<Item = &RoleEntry> {
        self.entries.iter().filter(|entry| !entry.defined)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand_occurrences;
    use workplan_core::Activity;

    #[test]
    fn union_of_capacity_and_demand() {
        let capacity = ResourceCapacity::new().role("Ranger", 2).role("Pilot", 0);
        let activities = vec![Activity::new("a").requires("Ranger", 1).requires("Drone", 1)];
        let occurrences = expand_occurrences(&activities).unwrap();

        let registry = RoleRegistry::for_occurrences(&capacity, &occurrences);
        let names: Vec<&str> = registry.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Drone", "Pilot", "Ranger"]);

        let drone = registry.get("Drone").unwrap();
        assert!(!drone.defined);
        assert_eq!(drone.capacity, 0);
        assert_eq!(registry.undefined().count(), 1);
    }

    #[test]
    fn zero_quantity_requirement_is_not_a_demand() {
        let capacity = ResourceCapacity::new().role("Ranger", 2);
        let activities = vec![Activity::new("a").requires("Boat", 0)];
        let occurrences = expand_occurrences(&activities).unwrap();

        let registry = RoleRegistry::for_occurrences(&capacity, &occurrences);
        assert!(registry.get("Boat").is_none());
        assert_eq!(registry.len(), 1);
    }
}
