//! JSON scenario files
//!
//! ```json
//! {
//!   "quarter": "2025-Q3",
//!   "activities": [
//!     { "activity_id": "A1", "name": "Boundary patrol", "quarter": "2025-Q3",
//!       "frequency": 4, "duration": 0.5,
//!       "resource_requirements": { "Ranger": 2 } }
//!   ],
//!   "resources": { "Ranger": 3, "Pilot": 1 },
//!   "non_working_dates": ["2025-01-27"],
//!   "horizon": { "quarter": "2025-Q3", "holidays": ["2025-01-01"] }
//! }
//! ```
//!
//! `horizon` is one of `{ "working_days": n }`, `{ "dates": [..] }`,
//! `{ "start", "end", "holidays" }` or `{ "quarter", "holidays" }`.
//! Horizon holidays are left out of the slot grid; `non_working_dates` stay
//! in the grid but are blocked.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};
use workplan_core::{
    partition_by_quarter, Activity, FinancialQuarter, PlanningHorizon, ResourceCapacity, RoleMap,
};
use workplan_solver::AnalysisRequest;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Planning quarter label; activities for other quarters are excluded
    #[serde(default)]
    pub quarter: Option<String>,
    pub activities: Vec<Activity>,
    pub resources: RoleMap,
    #[serde(default)]
    pub non_working_dates: BTreeSet<NaiveDate>,
    pub horizon: HorizonSpec,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HorizonSpec {
    WorkingDays {
        working_days: usize,
    },
    Dates {
        dates: Vec<NaiveDate>,
    },
    Range {
        start: NaiveDate,
        end: NaiveDate,
        #[serde(default)]
        holidays: BTreeSet<NaiveDate>,
    },
    Quarter {
        quarter: String,
        #[serde(default)]
        holidays: BTreeSet<NaiveDate>,
    },
}

impl HorizonSpec {
    pub fn resolve(&self) -> Result<PlanningHorizon> {
        let horizon = match self {
            HorizonSpec::WorkingDays { working_days } => PlanningHorizon::with_working_days(*working_days),
            HorizonSpec::Dates { dates } => PlanningHorizon::from_dates(dates.iter().copied()),
            HorizonSpec::Range {
                start,
                end,
                holidays,
            } => PlanningHorizon::between(*start, *end, holidays)?,
            HorizonSpec::Quarter { quarter, holidays } => {
                let quarter: FinancialQuarter = quarter.parse()?;
                PlanningHorizon::for_quarter(&quarter, holidays)
            }
        };
        Ok(horizon)
    }
}

/// A scenario resolved into an analysis request
#[derive(Debug)]
pub struct Prepared {
    pub request: AnalysisRequest,
    /// Activities left out by the quarter filter
    pub excluded: Vec<Activity>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let scenario: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid scenario {}", path.display()))?;
        debug!(activities = scenario.activities.len(), "scenario loaded");
        Ok(scenario)
    }

    /// Validate activities, filter to the quarter and build the horizon
    pub fn prepare(self) -> Result<Prepared> {
        for activity in &self.activities {
            activity.validate()?;
        }

        let (activities, excluded) = match &self.quarter {
            Some(quarter) => {
                let (valid, excluded) = partition_by_quarter(&self.activities, quarter);
                if !excluded.is_empty() {
                    info!(quarter = %quarter, excluded = excluded.len(), "activities outside the planning quarter");
                }
                (valid, excluded)
            }
            None => (self.activities, Vec::new()),
        };

        let horizon = self.horizon.resolve()?;
        let capacity = ResourceCapacity {
            roles: self.resources,
            non_working_dates: self.non_working_dates,
        };

        Ok(Prepared {
            request: AnalysisRequest::new(activities, capacity, horizon),
            excluded,
        })
    }
}
