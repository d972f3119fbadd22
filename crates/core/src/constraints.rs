use ndarray::{Array1, Array2, ArrayView1, Axis};
use thiserror::Error;

use crate::linalg;

/// A dense block of linear constraints `A x ∘ b`.
///
/// The relation `∘` (equality or inequality) is decided by the solver that
/// consumes the block; this type only stores the coefficients and evaluates
/// residuals `A x − b`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraints {
    a: Array2<f64>,
    b: Array1<f64>,
}

/// Errors that can occur when building a constraint block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("constraint matrix has {rows} rows but right-hand side has {rhs} entries")]
    RowMismatch { rows: usize, rhs: usize },

    #[error("constraint block has no rows")]
    Empty,

    #[error("constraint coefficients must be finite")]
    NonFinite,

    #[error("constraint matrix has {cols} columns but the problem has {n} variables")]
    ColumnMismatch { cols: usize, n: usize },
}

impl LinearConstraints {
    /// Creates a constraint block from a coefficient matrix and right-hand side.
    ///
    /// # Errors
    ///
    /// Returns an error if the row counts differ, the block is empty, or any
    /// coefficient is not finite.
    pub fn new(a: Array2<f64>, b: Array1<f64>) -> Result<Self, ConstraintError> {
        if a.nrows() != b.len() {
            return Err(ConstraintError::RowMismatch {
                rows: a.nrows(),
                rhs: b.len(),
            });
        }
        if a.nrows() == 0 {
            return Err(ConstraintError::Empty);
        }
        if !a.iter().chain(b.iter()).all(|v| v.is_finite()) {
            return Err(ConstraintError::NonFinite);
        }
        Ok(Self { a, b })
    }

    /// Creates a single-row block from a flat coefficient vector.
    ///
    /// # Errors
    ///
    /// Returns an error if `b` does not have exactly one entry or any
    /// coefficient is not finite.
    pub fn from_row(row: Array1<f64>, b: Array1<f64>) -> Result<Self, ConstraintError> {
        Self::new(row.insert_axis(Axis(0)), b)
    }

    /// Number of constraint rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.a.nrows()
    }

    /// Number of variables each row applies to.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.a.ncols()
    }

    /// Checks that every row applies to exactly `n` variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::ColumnMismatch`] otherwise.
    pub fn check_columns(&self, n: usize) -> Result<(), ConstraintError> {
        if self.cols() == n {
            Ok(())
        } else {
            Err(ConstraintError::ColumnMismatch { cols: self.cols(), n })
        }
    }

    /// The coefficient matrix `A`.
    #[must_use]
    pub fn a(&self) -> &Array2<f64> {
        &self.a
    }

    /// The right-hand side `b`.
    #[must_use]
    pub fn b(&self) -> &Array1<f64> {
        &self.b
    }

    /// Evaluates `A x − b`.
    #[must_use]
    pub fn residual(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self.a.dot(&x) - &self.b
    }

    /// Applies the transpose: `Aᵀ y`.
    #[must_use]
    pub fn transpose_dot(&self, y: ArrayView1<'_, f64>) -> Array1<f64> {
        self.a.t().dot(&y)
    }

    /// Largest eigenvalue of `AᵀA`.
    #[must_use]
    pub fn gram_spectral_radius(&self) -> f64 {
        linalg::gram_spectral_radius(self.a.view())
    }
}
