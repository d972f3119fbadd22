use hmip_core::{Objective, linalg};
use ndarray::{Array1, ArrayView1, Zip};
use rand::Rng;

use super::{Config, InitialAscent};

const MAX_ASCENT_STEPS: usize = 1_000;
const GRADIENT_FLOOR: f64 = 1e-6;

/// The parts of a problem the start point depends on.
pub(super) struct AscentProblem<'a> {
    pub(super) objective: &'a (dyn Objective + Send + Sync),
    pub(super) lb: ArrayView1<'a, f64>,
    pub(super) ub: ArrayView1<'a, f64>,
    pub(super) binary: &'a Array1<bool>,
    pub(super) smoothness_coef: f64,
}

/// Pushes a seed point away from flat regions by bounded gradient ascent.
///
/// The seed is `start` when it lies strictly inside the box, the box midpoint
/// otherwise. Steps of size `1/L` continue while the point stays strictly
/// inside the box shrunk by the ascent stop distance and the gradient is not
/// negligible. The result is clamped to the shrunk box.
pub(super) fn initial_point<R: Rng>(
    problem: &AscentProblem<'_>,
    start: Option<ArrayView1<'_, f64>>,
    config: &Config,
    rng: &mut R,
) -> Array1<f64> {
    let eps = config.effective_ascent_stop();
    let lo = &problem.lb + eps;
    let hi = &problem.ub - eps;
    let n = problem.lb.len();

    let mut x = match start {
        Some(x0) if linalg::is_strictly_inside(x0, problem.lb, problem.ub) => x0.to_owned(),
        _ => Zip::from(problem.lb)
            .and(problem.ub)
            .map_collect(|&l, &u| 0.5 * (l + u)),
    };

    let free = match config.initial_ascent() {
        InitialAscent::Ascent => Array1::ones(n),
        InitialAscent::BinaryNeutralAscent => problem.binary.mapv(|b| if b { 0.0 } else { 1.0 }),
    };

    let mut grad = problem.objective.gradient(x.view());
    if grad.iter().all(|&g| g == 0.0) {
        grad = perturbed_gradient(n, problem.smoothness_coef, rng);
    }

    #[allow(clippy::cast_precision_loss)]
    let floor = GRADIENT_FLOOR / n as f64;
    let rate = 1.0 / problem.smoothness_coef;

    for _ in 0..MAX_ASCENT_STEPS {
        if !linalg::is_strictly_inside(x.view(), lo.view(), hi.view())
            || linalg::norm(grad.view()) <= floor
        {
            break;
        }
        x.scaled_add(rate, &(&grad * &free));
        grad = problem.objective.gradient(x.view());
    }

    Zip::from(&mut x)
        .and(&lo)
        .and(&hi)
        .for_each(|x, &l, &h| *x = x.max(l).min(h));
    x
}

/// Random stand-in for a gradient that is exactly zero:
/// `(L/10)·(U(0,1) − ½)` per coordinate.
pub(super) fn perturbed_gradient<R: Rng>(n: usize, smoothness_coef: f64, rng: &mut R) -> Array1<f64> {
    Array1::from_shape_fn(n, |_| smoothness_coef / 10.0 * (rng.r#gen::<f64>() - 0.5))
}
