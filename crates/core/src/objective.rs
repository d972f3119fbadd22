use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

use crate::linalg;

/// A smooth objective with an analytic gradient.
///
/// Solvers never differentiate the objective themselves, so implementors
/// must supply an exact gradient.
pub trait Objective {
    /// Evaluates the objective at `x`.
    fn value(&self, x: ArrayView1<'_, f64>) -> f64;

    /// Evaluates the gradient at `x`.
    fn gradient(&self, x: ArrayView1<'_, f64>) -> Array1<f64>;

    /// Lipschitz constant of the gradient, when known exactly.
    ///
    /// Solvers fall back to a sampled estimate when this returns `None`.
    fn smoothness_coef(&self) -> Option<f64> {
        None
    }
}

/// An [`Objective`] built from a pair of closures.
///
/// # Example
///
/// ```
/// use hmip_core::{FnObjective, Objective};
/// use ndarray::{ArrayView1, array};
///
/// let objective = FnObjective::new(
///     |x: ArrayView1<'_, f64>| x.dot(&x),
///     |x: ArrayView1<'_, f64>| 2.0 * &x,
/// );
///
/// assert_eq!(objective.value(array![1.0, 2.0].view()), 5.0);
/// ```
#[derive(Clone)]
pub struct FnObjective<F, G> {
    value: F,
    gradient: G,
}

impl<F, G> FnObjective<F, G> {
    /// Wraps an objective closure and its gradient closure.
    pub fn new(value: F, gradient: G) -> Self
    where
        F: Fn(ArrayView1<'_, f64>) -> f64,
        G: Fn(ArrayView1<'_, f64>) -> Array1<f64>,
    {
        Self { value, gradient }
    }
}

impl<F, G> Objective for FnObjective<F, G>
where
    F: Fn(ArrayView1<'_, f64>) -> f64,
    G: Fn(ArrayView1<'_, f64>) -> Array1<f64>,
{
    fn value(&self, x: ArrayView1<'_, f64>) -> f64 {
        (self.value)(x)
    }

    fn gradient(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        (self.gradient)(x)
    }
}

/// The quadratic objective `½ xᵀHx + qᵀx`.
///
/// `H` is stored symmetrized as `½(H + Hᵀ)`, which leaves the objective
/// unchanged and makes `Hx + q` its exact gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadratic {
    h: Array2<f64>,
    q: Array1<f64>,
}

/// Errors that can occur when building a [`Quadratic`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuadraticError {
    #[error("H must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("q has {q} entries but H is {n}x{n}")]
    LinearTerm { q: usize, n: usize },
}

impl Quadratic {
    /// Creates a quadratic objective, symmetrizing `H` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if `H` is not square or `q` does not match its size.
    pub fn new(h: Array2<f64>, q: Array1<f64>) -> Result<Self, QuadraticError> {
        let (rows, cols) = h.dim();
        if rows != cols {
            return Err(QuadraticError::NotSquare { rows, cols });
        }
        if q.len() != rows {
            return Err(QuadraticError::LinearTerm { q: q.len(), n: rows });
        }

        let h = if h == h.t() { h } else { 0.5 * (&h + &h.t()) };
        Ok(Self { h, q })
    }

    /// The symmetric quadratic term.
    #[must_use]
    pub fn h(&self) -> &Array2<f64> {
        &self.h
    }

    /// The linear term.
    #[must_use]
    pub fn q(&self) -> &Array1<f64> {
        &self.q
    }

    /// Number of variables.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.q.len()
    }

    /// Exact Lipschitz constant of the gradient, `‖H‖₂`.
    #[must_use]
    pub fn smoothness_coef(&self) -> f64 {
        linalg::spectral_radius_symmetric(self.h.view())
    }
}

impl Objective for Quadratic {
    fn value(&self, x: ArrayView1<'_, f64>) -> f64 {
        0.5 * x.dot(&self.h.dot(&x)) + self.q.dot(&x)
    }

    fn gradient(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self.h.dot(&x) + &self.q
    }

    fn smoothness_coef(&self) -> Option<f64> {
        Some(Quadratic::smoothness_coef(self))
    }
}
