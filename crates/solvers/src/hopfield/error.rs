use std::fmt;

use hmip_core::ConstraintError;
use thiserror::Error;

/// Which block of linear constraints an error or dual refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Equality,
    Inequality,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equality => "equality",
            Self::Inequality => "inequality",
        })
    }
}

/// Errors that can occur while building a [`Problem`](super::Problem).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    #[error("binary mask, lb and ub must have equal lengths, got {mask}, {lb} and {ub}")]
    DimensionMismatch { mask: usize, lb: usize, ub: usize },

    #[error("lb must be finite and strictly below ub, violated at index {index}")]
    InvalidBounds { index: usize },

    #[error("binary mask entry at index {index} is {value}, expected 0 or 1")]
    InvalidBinaryMask { index: usize, value: u8 },

    #[error("{kind} constraints: {source}")]
    ConstraintShape {
        kind: ConstraintKind,
        #[source]
        source: ConstraintError,
    },

    #[error("beta must be finite and positive with one entry per variable")]
    InvalidBeta,

    #[error("smoothness coefficient must be finite and positive, got {0}")]
    NonPositiveSmoothness(f64),

    #[error("{kind} penalty must be finite and non-negative (positive for inequalities), got {value}")]
    InvalidPenalty { kind: ConstraintKind, value: f64 },

    #[error("starting point has {len} entries but the problem has {n} variables")]
    InvalidStartingPoint { len: usize, n: usize },

    #[error("{kind} duals must be finite with one entry per row, got {len} for {rows} rows")]
    InvalidDual {
        kind: ConstraintKind,
        len: usize,
        rows: usize,
    },
}

/// Errors that can occur while running the Hopfield solver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("objective or gradient is not finite at iteration {iter}")]
    NonFiniteObjective { iter: usize },
}
