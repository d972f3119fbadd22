use ndarray::{ArrayView1, Zip};

/// Cap on Armijo halvings; the last trial is accepted once reached.
pub(super) const MAX_HALVINGS: usize = 64;

/// Closed-form Hopfield step:
/// `α = −⟨σ⊙∇f, d⟩ / (L‖β⊙d‖² + 12⟨(β⊙d)², |∇f|⟩)`.
///
/// A degenerate denominator gives `α = 0`. With `stochastic_iter = Some(k)`
/// the step is blended toward `1/L` as `(1 − 1/√k)α + 1/(L√k)`, `k ≥ 1`.
pub(super) fn classic(
    sigma: ArrayView1<'_, f64>,
    grad: ArrayView1<'_, f64>,
    direction: ArrayView1<'_, f64>,
    beta: ArrayView1<'_, f64>,
    smoothness_coef: f64,
    stochastic_iter: Option<usize>,
) -> f64 {
    let (beta_d_sq, curvature) = Zip::from(direction)
        .and(beta)
        .and(grad)
        .fold((0.0, 0.0), |(sq, curv), &d, &b, &g| {
            let bd2 = (b * d).powi(2);
            (sq + bd2, curv + bd2 * g.abs())
        });
    let numerator = -Zip::from(sigma)
        .and(grad)
        .and(direction)
        .fold(0.0, |acc, &s, &g, &d| acc + s * g * d);
    let denominator = smoothness_coef * beta_d_sq + 12.0 * curvature;

    let alpha = if denominator.is_finite() && denominator > f64::EPSILON {
        numerator / denominator
    } else {
        0.0
    };

    match stochastic_iter {
        Some(k) => {
            #[allow(clippy::cast_precision_loss)]
            let root = (k.max(1) as f64).sqrt();
            (1.0 - 1.0 / root) * alpha + 1.0 / (smoothness_coef * root)
        }
        None => alpha,
    }
}

/// Armijo backtracking from `initial_alpha`.
///
/// `trial(α)` evaluates the candidate reached with step `α` and returns its
/// objective alongside it. A trial is accepted when
/// `f(trial) ≤ f(x) + (α/2)·slope`, where `slope = ⟨σ⊙∇f, d⟩`; otherwise
/// `α` is halved. Returns the accepted step and candidate.
pub(super) fn armijo<T, F>(initial_alpha: f64, current: f64, slope: f64, mut trial: F) -> (f64, T)
where
    F: FnMut(f64) -> (f64, T),
{
    let mut alpha = initial_alpha;
    let mut halvings = 0;
    loop {
        let (value, candidate) = trial(alpha);
        if value <= current + 0.5 * alpha * slope || halvings == MAX_HALVINGS {
            return (alpha, candidate);
        }
        alpha *= 0.5;
        halvings += 1;
    }
}
