use ndarray::ArrayView1;

use super::{DualStatus, DualVariables, Trajectory};

/// Indicates why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The stationarity measure fell below the configured precision.
    Converged,

    /// Reached the iteration limit without converging.
    MaxIters,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The result of a Hopfield solve.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Final solver status.
    pub status: Status,

    /// Every recorded iterate, trimmed to the iterations actually run.
    pub trajectory: Trajectory,

    /// Dual variables used by the augmented Lagrangian.
    pub duals: DualVariables,

    pub dual_status: DualStatus,

    /// Index of the final iterate.
    pub iters: usize,

    /// `‖∇L ⊙ σ(x)‖` at the final iterate.
    pub stationarity: f64,
}

impl Solution {
    /// The final feasible iterate.
    #[must_use]
    pub fn x(&self) -> ArrayView1<'_, f64> {
        self.trajectory.last_x()
    }

    /// Augmented objective at the final iterate.
    #[must_use]
    pub fn objective(&self) -> f64 {
        self.trajectory.objective[self.iters]
    }
}
