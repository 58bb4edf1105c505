//! # workplan-solver
//!
//! Feasibility analysis for staffing workplans.
//!
//! This crate provides:
//! - Occurrence expansion and a start-slot constraint model (Pumpkin CP solver)
//! - Utilization per role over the planning horizon
//! - Infeasibility diagnostics with a ranked root cause and recommendations
//! - Cancellable, off-thread and batch analysis runners
//!
//! ## Example
//!
//! ```rust
//! use workplan_core::{Activity, AnalysisOptions, PlanningHorizon, ResourceCapacity};
//! use workplan_solver::{AnalysisRequest, Analyzer, CancellationToken};
//!
//! let request = AnalysisRequest::new(
//!     vec![Activity::new("A1").duration(1.0).requires("Ranger", 1)],
//!     ResourceCapacity::new().role("Ranger", 1),
//!     PlanningHorizon::with_working_days(1),
//! );
//! let outcome = Analyzer::new(AnalysisOptions::default())
//!     .analyze(&request, &CancellationToken::new());
//!
//! let result = outcome.result().unwrap();
//! assert!(result.feasible);
//! assert_eq!(result.utilization["Ranger"], 100.0);
//! ```

pub mod adapter;
pub mod analysis;
pub mod cancel;
pub mod diagnostics;
pub mod expand;
pub mod model;
pub mod roles;
pub mod runner;
pub mod utilization;

pub use adapter::{FeasibilitySolver, PumpkinSolver, SolveVerdict};
pub use analysis::{analyze, AnalysisPhase, AnalysisRequest, Analyzer};
pub use cancel::CancellationToken;
pub use diagnostics::{diagnose, AnalyzerError, DiagnosticInputs};
pub use expand::expand_occurrences;
pub use model::{ConstraintModel, Refutation, StartVariables};
pub use roles::{RoleEntry, RoleRegistry};
pub use runner::{analyze_batch, spawn_analysis, AnalysisHandle, WorkerError};
pub use utilization::{role_loads, utilization, RoleLoad};
