use hmip_core::Observer;
use hmip_solvers::hopfield::{Action, DualStatus, Event};
use tracing::{info, warn};

/// Emits `tracing` events while a Hopfield solve runs.
///
/// The dual ascent outcome is logged once. Iterations are logged every
/// `every` iterations, or never when `every` is zero. The observer never
/// changes the course of the solve.
#[derive(Debug, Clone, Copy)]
pub struct LogObserver {
    every: usize,
}

impl LogObserver {
    #[must_use]
    pub fn every(every: usize) -> Self {
        Self { every }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::every(1)
    }
}

impl Observer<Event<'_>, Action> for LogObserver {
    fn observe(&mut self, event: &Event<'_>) -> Option<Action> {
        match event {
            Event::DualAscent { estimate } => match estimate.status {
                DualStatus::DidNotConverge { outer_iterations } => {
                    warn!(outer_iterations, "dual ascent did not converge");
                }
                status => info!(?status, "dual variables resolved"),
            },
            Event::Iteration {
                iter,
                objective,
                step_size,
                stationarity,
                ..
            } => {
                if self.every > 0 && iter % self.every == 0 {
                    info!(iter, objective, step_size, stationarity, "hopfield iteration");
                }
            }
        }
        None
    }
}
