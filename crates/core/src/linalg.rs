//! Small dense linear-algebra helpers.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

const POWER_ITERS: usize = 1_000;
const POWER_REL_TOL: f64 = 1e-12;

/// Returns `v / ‖v‖₂`, or `v` unchanged when its norm is zero.
#[must_use]
pub fn normalize(v: &Array1<f64>) -> Array1<f64> {
    let norm = norm(v.view());
    if norm == 0.0 { v.clone() } else { v / norm }
}

/// Euclidean norm.
#[must_use]
pub fn norm(v: ArrayView1<'_, f64>) -> f64 {
    v.dot(&v).sqrt()
}

/// Returns `true` if `lb < x < ub` holds strictly in every coordinate.
#[must_use]
pub fn is_strictly_inside(
    x: ArrayView1<'_, f64>,
    lb: ArrayView1<'_, f64>,
    ub: ArrayView1<'_, f64>,
) -> bool {
    x.iter()
        .zip(lb.iter().zip(ub.iter()))
        .all(|(&xi, (&l, &u))| l < xi && xi < u)
}

/// Estimates the largest absolute eigenvalue of a symmetric matrix.
///
/// Runs power iteration from a fixed, non-uniform vector and from each basis
/// vector, keeping the largest estimate. At least one start has a component
/// along the dominant eigenvector of any non-zero matrix, and every start is
/// deterministic, so results are reproducible. Returns `0.0` for an empty or
/// zero matrix.
#[must_use]
pub fn spectral_radius_symmetric(a: ArrayView2<'_, f64>) -> f64 {
    let n = a.nrows();
    if n == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let spread = Array1::from_shape_fn(n, |i| 1.0 + i as f64 / n as f64);
    let basis = (0..n).map(|k| Array1::from_shape_fn(n, |i| if i == k { 1.0 } else { 0.0 }));

    std::iter::once(spread)
        .chain(basis)
        .map(|start| power_iteration(a, normalize(&start)))
        .fold(0.0, f64::max)
}

/// Power iteration from a unit start vector.
///
/// A start orthogonal to the whole range of `a` yields `0.0`.
fn power_iteration(a: ArrayView2<'_, f64>, mut v: Array1<f64>) -> f64 {
    let mut estimate = 0.0;

    for _ in 0..POWER_ITERS {
        let av = a.dot(&v);
        let next = norm(av.view());
        if next == 0.0 {
            return 0.0;
        }
        v = av / next;
        if (next - estimate).abs() <= POWER_REL_TOL * next {
            return next;
        }
        estimate = next;
    }

    estimate
}

/// Largest eigenvalue of the Gram matrix `AᵀA`, i.e. `‖A‖₂²`.
#[must_use]
pub fn gram_spectral_radius(a: ArrayView2<'_, f64>) -> f64 {
    let gram: Array2<f64> = a.t().dot(&a);
    spectral_radius_symmetric(gram.view())
}
