//! Off-thread and batch execution
//!
//! [`spawn_analysis`] keeps an interactive caller responsive: the run owns
//! its request on a worker thread, streams phase changes back, and can be
//! cancelled through its handle. [`analyze_batch`] runs independent
//! analyses in parallel; each owns its own model.

use rayon::prelude::*;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::debug;
use workplan_core::{AnalysisOptions, AnalysisOutcome};

use crate::analysis::{AnalysisPhase, AnalysisRequest, Analyzer};
use crate::cancel::CancellationToken;

/// Failure of the worker thread itself
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn analysis worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("analysis worker panicked: {0}")]
    Panicked(String),
}

/// Handle to an analysis running on its own thread
#[derive(Debug)]
pub struct AnalysisHandle {
    cancel: CancellationToken,
    progress: Receiver<AnalysisPhase>,
    worker: JoinHandle<AnalysisOutcome>,
}

impl AnalysisHandle {
    /// Request cooperative cancellation; `join` then yields `Cancelled`
    /// unless the run had already completed
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Phases reached since the last call, without blocking
    pub fn progress(&self) -> impl Iterator<Item = AnalysisPhase> + '_ {
        self.progress.try_iter()
    }

    /// Wait for the run to end
    pub fn join(self) -> Result<AnalysisOutcome, WorkerError> {
        self.worker.join().map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            WorkerError::Panicked(message)
        })
    }
}

/// Run one analysis on a named worker thread
pub fn spawn_analysis(
    request: AnalysisRequest,
    options: AnalysisOptions,
) -> Result<AnalysisHandle, WorkerError> {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let (tx, progress) = mpsc::channel();

    let worker = thread::Builder::new()
        .name("workplan-analysis".into())
        .spawn(move || {
            Analyzer::new(options).analyze_with_progress(&request, &token, |phase| {
                // The receiver may be gone if the handle was dropped
                let _ = tx.send(phase);
            })
        })?;

    debug!("analysis worker spawned");
    Ok(AnalysisHandle {
        cancel,
        progress,
        worker,
    })
}

/// Analyze every request in parallel; outcomes keep the input order
pub fn analyze_batch(
    requests: &[AnalysisRequest],
    options: &AnalysisOptions,
    cancel: &CancellationToken,
) -> Vec<AnalysisOutcome> {
    debug!(requests = requests.len(), "running analysis batch");
    requests
        .par_iter()
        .map(|request| Analyzer::new(options.clone()).analyze(request, cancel))
        .collect()
}
