//! Occurrence expansion
//!
//! Each activity with frequency `f` becomes `f` independent occurrences,
//! numbered densely across the whole workplan.

use workplan_core::{Activity, ConfigurationError, Occurrence, OccurrenceId};

/// Expand activities into one occurrence per (activity, k), k in `[0, frequency)`.
///
/// Durations and frequencies are re-validated; the first invalid activity
/// aborts the expansion.
pub fn expand_occurrences(activities: &[Activity]) -> Result<Vec<Occurrence<'_>>, ConfigurationError> {
    let mut occurrences = Vec::with_capacity(
        activities
            .iter()
            .map(|activity| activity.frequency as usize)
            .sum(),
    );

    for activity in activities {
        activity.validate()?;
        let duration_slots = activity.duration_slots()?;

        for index in 0..activity.frequency {
            occurrences.push(Occurrence {
                id: OccurrenceId(occurrences.len()),
                activity,
                index,
                duration_slots,
            });
        }
    }

    Ok(occurrences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn one_occurrence_per_frequency_unit() {
        let activities = vec![
            Activity::new("a").frequency(3).duration(0.25),
            Activity::new("b").frequency(2).duration(1.0),
        ];

        let occurrences = expand_occurrences(&activities).unwrap();
        let total: u32 = activities.iter().map(|a| a.frequency).sum();
        assert_eq!(occurrences.len(), total as usize);

        let b_indices: Vec<u32> = occurrences
            .iter()
            .filter(|o| o.activity.activity_id == "b")
            .map(|o| o.index)
            .collect();
        assert_eq!(b_indices, vec![0, 1]);
    }

    #[test]
    fn ids_are_dense_and_ordered() {
        let activities = vec![
            Activity::new("a").frequency(2),
            Activity::new("b").frequency(2),
        ];

        let occurrences = expand_occurrences(&activities).unwrap();
        let ids: Vec<usize> = occurrences.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn duration_slots_cached() {
        let activities = vec![Activity::new("a").duration(0.5)];
        let occurrences = expand_occurrences(&activities).unwrap();
        assert_eq!(occurrences[0].duration_slots, 2);
    }

    #[test]
    fn invalid_duration_rejected() {
        let activities = vec![
            Activity::new("ok"),
            Activity::new("bad").duration(2.0),
        ];

        let err = expand_occurrences(&activities).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidDuration { ref activity_id, .. } if activity_id == "bad"
        ));
    }

    #[test]
    fn empty_workplan_has_no_occurrences() {
        assert!(expand_occurrences(&[]).unwrap().is_empty());
    }
}
