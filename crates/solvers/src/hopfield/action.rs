/// Actions an observer can take during a Hopfield solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the solver and return the trajectory recorded so far.
    StopEarly,
}
