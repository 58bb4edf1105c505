//! Process exit codes
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Feasible: a schedule exists (or the command succeeded) |
//! | 1 | Not feasible: infeasible, undecided, failed or cancelled |
//! | 2 | Input error: unreadable or invalid scenario, policy or arguments |

use std::process;
use workplan_core::AnalysisOutcome;

/// Exit codes for CLI operations. Stable API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
    InputError = 2,
}

impl ExitCode {
    /// Only a completed, feasible analysis succeeds
    pub fn from_outcome(outcome: &AnalysisOutcome) -> Self {
        match outcome.result() {
            Some(result) if result.feasible => ExitCode::Success,
            _ => ExitCode::Failure,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code as u8)
    }
}
