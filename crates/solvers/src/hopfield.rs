//! Hopfield-network heuristic for mixed-integer quadratic programs.
//!
//! # Algorithm
//!
//! The solver keeps a hidden state `x_h` and maps it into the box
//! `lb ≤ x ≤ ub` through a squashing [`Activation`]. Each iteration picks a
//! unit search direction, scales it with an adaptive step, moves the hidden
//! state, and maps it back into the box. Directions can pull binary
//! coordinates toward their nearest bound, and near-bound coordinates can be
//! snapped onto the bound (absorption).
//!
//! Linear equality and inequality constraints are handled with an augmented
//! Lagrangian. Unless the caller supplies dual variables, they are estimated
//! once by dual ascent before the main loop starts.
//!
//! # When to Use
//!
//! - Box-bounded problems with some binary coordinates and a smooth objective
//! - A fast feasible candidate is worth more than an optimality certificate
//!
//! # Limitations
//!
//! - **Local heuristic**: no optimality guarantee, binary coordinates may
//!   finish strictly inside their box when absorption is disabled
//! - **Constraints are penalized**: linear constraints hold only approximately
//!
//! # Observer Events
//!
//! - [`Event::DualAscent`] — once, after dual variables are resolved, when the
//!   problem has constraints
//! - [`Event::Iteration`] — once per completed iteration
//!
//! Observers can return [`Action::StopEarly`] from either event to halt.

mod action;
mod activation;
mod config;
mod direction;
mod dual;
mod error;
mod event;
mod initial;
mod lagrangian;
mod problem;
mod solution;
mod solve;
mod step;
mod trace;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use activation::{Activation, ActivationFns};
pub use config::{
    Beta, BetaScope, Config, ConfigBuilder, ConfigError, Direction, DualAscentConfig,
    InitialAscent, StepRule, StoppingCriterion,
};
pub use dual::{DualEstimate, DualStatus, DualVariables};
pub use error::{ConstraintKind, Error, SetupError};
pub use event::Event;
pub use lagrangian::AugmentedLagrangian;
pub use problem::{Problem, ProblemDefinition, resolve_beta};
pub use solution::{Solution, Status};
pub use trace::Trajectory;

use hmip_core::Observer;

/// Validates a problem definition and freezes it into a [`Problem`].
///
/// Computes the start point, resolves β, and estimates the smoothness
/// coefficient when neither the caller nor the objective provides one.
/// Every random draw comes from an RNG seeded with [`Config::seed`].
///
/// # Errors
///
/// Returns a [`SetupError`] if the definition is inconsistent with itself
/// or with the configured β.
pub fn setup(definition: ProblemDefinition, config: &Config) -> Result<Problem, SetupError> {
    problem::setup(definition, config)
}

/// Runs the Hopfield heuristic on a prepared problem.
///
/// The observer receives an [`Event`] after dual resolution and after every
/// iteration. See the [module docs](self) for details.
///
/// # Errors
///
/// Returns an error if the objective or its gradient becomes non-finite.
pub fn solve<Obs>(problem: &Problem, config: &Config, observer: Obs) -> Result<Solution, Error>
where
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    solve::solve(problem, config, observer)
}

/// Runs the Hopfield heuristic without observer support.
///
/// This is a convenience wrapper around [`solve`] that uses a no-op observer.
///
/// # Errors
///
/// Returns an error if the objective or its gradient becomes non-finite.
pub fn solve_unobserved(problem: &Problem, config: &Config) -> Result<Solution, Error> {
    solve(problem, config, ())
}

/// Estimates dual variables for the problem's linear constraints by dual
/// ascent on the augmented Lagrangian.
///
/// Supplied duals on the problem are ignored; use this to inspect or reuse
/// the estimate that [`solve`] would compute.
#[must_use]
pub fn estimate_duals(problem: &Problem, config: &DualAscentConfig) -> DualEstimate {
    dual::estimate(problem, config)
}
