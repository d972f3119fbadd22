use ndarray::ArrayView1;

use super::DualEstimate;

/// Events emitted by the Hopfield solver.
#[derive(Debug, Clone)]
pub enum Event<'a> {
    /// Dual variables were resolved, emitted once before the first iteration
    /// when the problem has linear constraints.
    DualAscent {
        /// The duals the solve will use and how they were obtained.
        estimate: &'a DualEstimate,
    },

    /// An iteration completed.
    Iteration {
        /// Index of the new iterate; the start point is iterate `0`.
        iter: usize,

        /// The new feasible iterate, after absorption.
        x: ArrayView1<'a, f64>,

        /// The new hidden state.
        x_hidden: ArrayView1<'a, f64>,

        /// Augmented objective at the new iterate.
        objective: f64,

        /// Step that produced the new iterate.
        step_size: f64,

        /// `‖∇L ⊙ σ(x)‖` at the new iterate.
        stationarity: f64,
    },
}

impl Event<'_> {
    /// Returns the iteration index, if this is an iteration event.
    #[must_use]
    pub fn iter(&self) -> Option<usize> {
        match self {
            Self::Iteration { iter, .. } => Some(*iter),
            Self::DualAscent { .. } => None,
        }
    }

    /// Returns the objective at the new iterate, if this is an iteration event.
    #[must_use]
    pub fn objective(&self) -> Option<f64> {
        match self {
            Self::Iteration { objective, .. } => Some(*objective),
            Self::DualAscent { .. } => None,
        }
    }

    /// Returns the stationarity measure, if this is an iteration event.
    #[must_use]
    pub fn stationarity(&self) -> Option<f64> {
        match self {
            Self::Iteration { stationarity, .. } => Some(*stationarity),
            Self::DualAscent { .. } => None,
        }
    }
}
