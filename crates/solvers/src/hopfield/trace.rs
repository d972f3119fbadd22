use ndarray::{Array1, Array2, ArrayView1, s};

/// Per-iteration history of a solve.
///
/// Columns of `x`, `x_hidden` and `slack` (and entries of `objective`) are
/// indexed by iteration, starting with the start point at `0`.
/// `step_size[k]` is the step that moved iterate `k` to `k + 1`, so it has
/// one entry fewer than the other fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Feasible iterates, one column per iteration.
    pub x: Array2<f64>,

    /// Hidden states, one column per iteration.
    pub x_hidden: Array2<f64>,

    /// Augmented objective at each iterate; equals `f` without constraints.
    pub objective: Array1<f64>,

    /// Step applied to iterate `k` to reach `k + 1`; one entry fewer than
    /// `objective`.
    pub step_size: Array1<f64>,

    /// Inequality slacks, present only with inequality constraints.
    pub slack: Option<Array2<f64>>,
}

impl Trajectory {
    /// Allocates room for `capacity` iterates, filled with NaN.
    pub(super) fn with_capacity(n: usize, slack_dim: Option<usize>, capacity: usize) -> Self {
        Self {
            x: Array2::from_elem((n, capacity), f64::NAN),
            x_hidden: Array2::from_elem((n, capacity), f64::NAN),
            objective: Array1::from_elem(capacity, f64::NAN),
            step_size: Array1::from_elem(capacity.saturating_sub(1), f64::NAN),
            slack: slack_dim.map(|m| Array2::from_elem((m, capacity), f64::NAN)),
        }
    }

    pub(super) fn record(
        &mut self,
        k: usize,
        x: ArrayView1<'_, f64>,
        x_hidden: ArrayView1<'_, f64>,
        objective: f64,
        slack: ArrayView1<'_, f64>,
    ) {
        self.x.column_mut(k).assign(&x);
        self.x_hidden.column_mut(k).assign(&x_hidden);
        self.objective[k] = objective;
        if let Some(slacks) = &mut self.slack {
            slacks.column_mut(k).assign(&slack);
        }
    }

    pub(super) fn record_step(&mut self, k: usize, step_size: f64) {
        self.step_size[k] = step_size;
    }

    /// Drops unused trailing columns, keeping `len` iterates.
    pub(super) fn trimmed(self, len: usize) -> Self {
        let steps = len.saturating_sub(1);
        Self {
            x: self.x.slice_move(s![.., ..len]),
            x_hidden: self.x_hidden.slice_move(s![.., ..len]),
            objective: self.objective.slice_move(s![..len]),
            step_size: self.step_size.slice_move(s![..steps]),
            slack: self.slack.map(|slacks| slacks.slice_move(s![.., ..len])),
        }
    }

    /// Number of recorded iterates, including the start point.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objective.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The last recorded feasible iterate.
    ///
    /// # Panics
    ///
    /// Panics if the trajectory is empty, which a solve never returns.
    #[must_use]
    pub fn last_x(&self) -> ArrayView1<'_, f64> {
        self.x.column(self.len() - 1)
    }
}
