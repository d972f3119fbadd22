//! Solvers for mixed-integer quadratic programs.
//!
//! # Solvers
//!
//! - [`hopfield`] — continuous-relaxation heuristic that moves a hidden state
//!   through a squashing activation, pulling binary coordinates toward their
//!   bounds, with augmented-Lagrangian handling of linear constraints

pub mod hopfield;
