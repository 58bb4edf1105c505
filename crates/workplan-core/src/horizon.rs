//! Planning horizon and financial quarters
//!
//! A horizon is an ordered list of days, each split into [`SLOTS_PER_DAY`]
//! quarter-day slots. Slot `s` belongs to day `s / 4`. Holidays are normally
//! dropped before a horizon is built; days that remain but are flagged
//! non-working, or whose date is listed in the capacity record's
//! non-working dates, block every slot they contain.
//!
//! Quarters follow the Australian financial year: `2025-Q1` is July to
//! September 2024 and `2025-Q3` is January to March 2025.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{ConfigurationError, SLOTS_PER_DAY};

// ============================================================================
// Planning Horizon
// ============================================================================

/// One day of the horizon
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonDay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub working: bool,
}

impl HorizonDay {
    pub fn working(date: Option<NaiveDate>) -> Self {
        Self { date, working: true }
    }

    pub fn non_working(date: Option<NaiveDate>) -> Self {
        Self {
            date,
            working: false,
        }
    }
}

/// Ordered days of one planning quarter
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningHorizon {
    days: Vec<HorizonDay>,
}

impl PlanningHorizon {
    /// Horizon of `n` undated working days
    pub fn with_working_days(n: usize) -> Self {
        Self {
            days: vec![HorizonDay::working(None); n],
        }
    }

    pub fn from_days(days: Vec<HorizonDay>) -> Self {
        Self { days }
    }

    /// Horizon over the given working dates (sorted, duplicates dropped)
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let dates: BTreeSet<NaiveDate> = dates.into_iter().collect();
        Self {
            days: dates
                .into_iter()
                .map(|date| HorizonDay::working(Some(date)))
                .collect(),
        }
    }

    /// Monday-to-Friday days in `[start, end]`, with `non_working` dates removed
    pub fn between(
        start: NaiveDate,
        end: NaiveDate,
        non_working: &BTreeSet<NaiveDate>,
    ) -> Result<Self, ConfigurationError> {
        if start > end {
            return Err(ConfigurationError::InvalidDateRange { start, end });
        }

        Ok(Self::from_dates(
            start
                .iter_days()
                .take_while(|date| *date <= end)
                .filter(|date| is_weekday(*date) && !non_working.contains(date)),
        ))
    }

    /// Working days of a financial quarter, with `non_working` dates removed
    pub fn for_quarter(quarter: &FinancialQuarter, non_working: &BTreeSet<NaiveDate>) -> Self {
        Self::from_dates(
            quarter
                .start()
                .iter_days()
                .take_while(|date| *date <= quarter.end())
                .filter(|date| is_weekday(*date) && !non_working.contains(date)),
        )
    }

    /// Flag the day at `index` as non-working
    pub fn with_non_working_day(mut self, index: usize) -> Self {
        if let Some(day) = self.days.get_mut(index) {
            day.working = false;
        }
        self
    }

    pub fn days(&self) -> &[HorizonDay] {
        &self.days
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn working_day_count(&self) -> usize {
        self.days.iter().filter(|day| day.working).count()
    }

    /// Length of the slot grid (`days × 4`)
    pub fn total_slots(&self) -> u32 {
        slots_for(self.days.len())
    }

    /// Working slots (`working_days × 4`)
    pub fn capacity_slots(&self) -> u32 {
        slots_for(self.working_day_count())
    }

    /// Working slots once `non_working_dates` are also excluded
    pub fn working_slots(&self, non_working_dates: &BTreeSet<NaiveDate>) -> u32 {
        let days = self
            .days
            .iter()
            .filter(|day| is_working(day, non_working_dates))
            .count();
        slots_for(days)
    }

    pub fn day_of_slot(&self, slot: u32) -> usize {
        (slot / SLOTS_PER_DAY) as usize
    }

    pub fn date_of_slot(&self, slot: u32) -> Option<NaiveDate> {
        self.days
            .get(self.day_of_slot(slot))
            .and_then(|day| day.date)
    }

    /// Whether staff can work in `slot`
    pub fn is_working_slot(&self, slot: u32, non_working_dates: &BTreeSet<NaiveDate>) -> bool {
        self.days
            .get(self.day_of_slot(slot))
            .is_some_and(|day| is_working(day, non_working_dates))
    }

    /// Every blocked slot, ascending
    pub fn non_working_slots(&self, non_working_dates: &BTreeSet<NaiveDate>) -> Vec<u32> {
        (0..self.total_slots())
            .filter(|&slot| !self.is_working_slot(slot, non_working_dates))
            .collect()
    }
}

fn is_working(day: &HorizonDay, non_working_dates: &BTreeSet<NaiveDate>) -> bool {
    day.working
        && day
            .date
            .map_or(true, |date| !non_working_dates.contains(&date))
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn slots_for(days: usize) -> u32 {
    u32::try_from(days)
        .unwrap_or(u32::MAX)
        .saturating_mul(SLOTS_PER_DAY)
}

// ============================================================================
// Financial Quarter
// ============================================================================

/// A quarter of the July-to-June financial year, labelled `YYYY-Qn`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FinancialQuarter {
    year: i32,
    quarter: u8,
    start: NaiveDate,
    end: NaiveDate,
}

impl FinancialQuarter {
    pub fn new(year: i32, quarter: u8) -> Result<Self, ConfigurationError> {
        let invalid = || ConfigurationError::InvalidQuarter(format!("{}-Q{}", year, quarter));

        let (start_year, start_month) = match quarter {
            1 => (year - 1, 7),
            2 => (year - 1, 10),
            3 => (year, 1),
            4 => (year, 4),
            _ => return Err(invalid()),
        };
        let start = NaiveDate::from_ymd_opt(start_year, start_month, 1).ok_or_else(invalid)?;
        let (next_year, next_month) = if start_month == 10 {
            (start_year + 1, 1)
        } else {
            (start_year, start_month + 3)
        };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|next| next.pred_opt())
            .ok_or_else(invalid)?;

        Ok(Self {
            year,
            quarter,
            start,
            end,
        })
    }

    /// Financial year label (the calendar year in which it ends)
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u8 {
        self.quarter
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl std::fmt::Display for FinancialQuarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

impl std::str::FromStr for FinancialQuarter {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigurationError::InvalidQuarter(s.to_string());
        let (year, quarter) = s.trim().split_once("-Q").ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let quarter: u8 = quarter.parse().map_err(|_| invalid())?;
        Self::new(year, quarter).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn working_days_horizon_slots() {
        let horizon = PlanningHorizon::with_working_days(3);
        assert_eq!(horizon.total_slots(), 12);
        assert_eq!(horizon.capacity_slots(), 12);
        assert!(horizon.non_working_slots(&BTreeSet::new()).is_empty());
    }

    #[test]
    fn non_working_day_blocks_its_slots() {
        let horizon = PlanningHorizon::with_working_days(3).with_non_working_day(1);
        assert_eq!(horizon.total_slots(), 12);
        assert_eq!(horizon.capacity_slots(), 8);
        assert_eq!(horizon.non_working_slots(&BTreeSet::new()), vec![4, 5, 6, 7]);
    }

    #[test]
    fn capacity_dates_block_matching_days() {
        let horizon = PlanningHorizon::from_dates([date(2025, 1, 6), date(2025, 1, 7)]);
        let holidays = BTreeSet::from([date(2025, 1, 7)]);

        assert!(horizon.is_working_slot(3, &holidays));
        assert!(!horizon.is_working_slot(4, &holidays));
        assert_eq!(horizon.working_slots(&holidays), 4);
        assert_eq!(horizon.capacity_slots(), 8);
    }

    #[test]
    fn between_skips_weekends_and_holidays() {
        // Mon 2025-01-20 .. Sun 2025-02-02, Australia Day observed Mon 27th
        let holidays = BTreeSet::from([date(2025, 1, 27)]);
        let horizon = PlanningHorizon::between(date(2025, 1, 20), date(2025, 2, 2), &holidays).unwrap();

        assert_eq!(horizon.day_count(), 9);
        assert!(horizon
            .days()
            .iter()
            .all(|day| day.date != Some(date(2025, 1, 27))));
        assert_eq!(horizon.date_of_slot(0), Some(date(2025, 1, 20)));
        assert_eq!(horizon.date_of_slot(20), Some(date(2025, 1, 28)));
    }

    #[test]
    fn between_rejects_reversed_range() {
        let err = PlanningHorizon::between(date(2025, 2, 1), date(2025, 1, 1), &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDateRange { .. }));
    }

    #[test]
    fn quarter_three_is_january_to_march() {
        let q: FinancialQuarter = "2025-Q3".parse().unwrap();
        assert_eq!(q.start(), date(2025, 1, 1));
        assert_eq!(q.end(), date(2025, 3, 31));
    }

    #[test]
    fn quarter_one_is_previous_july_to_september() {
        let q: FinancialQuarter = "2025-Q1".parse().unwrap();
        assert_eq!(q.start(), date(2024, 7, 1));
        assert_eq!(q.end(), date(2024, 9, 30));
    }

    #[test]
    fn quarter_two_ends_on_new_years_eve() {
        let q: FinancialQuarter = "2025-Q2".parse().unwrap();
        assert_eq!(q.start(), date(2024, 10, 1));
        assert_eq!(q.end(), date(2024, 12, 31));
        assert_eq!(q.to_string(), "2025-Q2");
    }

    #[test]
    fn quarter_parse_rejects_garbage() {
        assert!("2025-Q5".parse::<FinancialQuarter>().is_err());
        assert!("2025Q1".parse::<FinancialQuarter>().is_err());
        assert!("soon".parse::<FinancialQuarter>().is_err());
    }

    #[test]
    fn quarter_horizon_counts_weekdays() {
        // Jan-Mar 2025 has 64 weekdays
        let q: FinancialQuarter = "2025-Q3".parse().unwrap();
        let horizon = PlanningHorizon::for_quarter(&q, &BTreeSet::new());
        assert_eq!(horizon.day_count(), 64);

        let holidays = BTreeSet::from([date(2025, 1, 1), date(2025, 1, 27)]);
        let horizon = PlanningHorizon::for_quarter(&q, &holidays);
        assert_eq!(horizon.day_count(), 62);
        assert_eq!(horizon.capacity_slots(), 248);
    }
}
