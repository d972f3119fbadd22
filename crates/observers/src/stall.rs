use hmip_core::Observer;

use crate::traits::{CanStopEarly, HasObjective};

/// Stops a solve once the objective stops improving.
///
/// Tracks the best objective seen so far and counts consecutive events that
/// fail to beat it by more than `tolerance`. After `patience` such events in
/// a row the observer requests an early stop. Events without an objective
/// (NaN) are ignored.
///
/// ```
/// use hmip_core::Quadratic;
/// use hmip_observers::Stall;
/// use hmip_solvers::hopfield::{self, Config, ProblemDefinition};
/// use ndarray::array;
///
/// let objective = Quadratic::new(array![[2.0]], array![-1.0]).unwrap();
/// let definition = ProblemDefinition::new(objective, array![0.0], array![1.0]);
/// let config = Config::default();
/// let problem = hopfield::setup(definition, &config).unwrap();
///
/// let solution = hopfield::solve(&problem, &config, Stall::new(5, 1e-9)).unwrap();
/// assert!(solution.trajectory.len() <= config.max_iterations());
/// ```
#[derive(Debug, Clone)]
pub struct Stall {
    patience: usize,
    tolerance: f64,
    best: f64,
    stalled: usize,
}

impl Stall {
    /// Creates a stall detector.
    #[must_use]
    pub fn new(patience: usize, tolerance: f64) -> Self {
        Self {
            patience,
            tolerance,
            best: f64::INFINITY,
            stalled: 0,
        }
    }

    /// Best objective observed so far.
    #[must_use]
    pub fn best(&self) -> f64 {
        self.best
    }
}

impl<E: HasObjective, A: CanStopEarly> Observer<E, A> for Stall {
    fn observe(&mut self, event: &E) -> Option<A> {
        let objective = event.objective();
        if objective.is_nan() {
            return None;
        }

        if objective < self.best - self.tolerance {
            self.stalled = 0;
        } else {
            self.stalled += 1;
        }
        self.best = self.best.min(objective);

        (self.stalled >= self.patience).then(A::stop_early)
    }
}
