//! Core traits and types for Hopfield-network MIQP heuristics.
//!
//! This crate defines the shared abstractions that solvers and observers
//! build on:
//!
//! - [`Objective`] — a smooth objective with an analytic gradient
//! - [`FnObjective`], [`Quadratic`] — ready-made objectives
//! - [`LinearConstraints`] — a dense `A x ∘ b` constraint block
//! - [`Observer`] — receives solver events and optionally returns control actions
//! - [`linalg`] — small dense helpers shared by solvers

mod constraints;
mod objective;
mod observer;

pub mod linalg;

pub use constraints::{ConstraintError, LinearConstraints};
pub use objective::{FnObjective, Objective, Quadratic, QuadraticError};
pub use observer::Observer;
