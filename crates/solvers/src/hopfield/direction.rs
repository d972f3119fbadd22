use hmip_core::linalg::normalize;
use ndarray::{Array1, ArrayView1, Zip};
use rand::Rng;

use super::{Config, Direction, Problem, activation::BoxMap};

/// Offset subtracted from each uniform draw in the stochastic direction.
const STOCHASTIC_SHIFT: f64 = 0.3;

/// Zero at binary coordinates sitting exactly on a bound, one elsewhere.
pub(super) fn absorption_mask(problem: &Problem, x: ArrayView1<'_, f64>) -> Array1<f64> {
    Zip::from(x)
        .and(problem.lb())
        .and(problem.ub())
        .and(problem.binary_mask())
        .map_collect(|&x, &l, &u, &binary| {
            if binary && (x == l || x == u) { 0.0 } else { 1.0 }
        })
}

/// Chooses a unit search direction at `x`, or the zero vector.
pub(super) fn find_direction<R: Rng>(
    problem: &Problem,
    map: &BoxMap<'_>,
    config: &Config,
    x: ArrayView1<'_, f64>,
    grad: ArrayView1<'_, f64>,
    rng: &mut R,
) -> Array1<f64> {
    let mask = config.absorbs().then(|| absorption_mask(problem, x));

    let direction = match config.direction() {
        Direction::Classic => descent(grad, mask.as_ref()),
        Direction::Stochastic => {
            let d = descent(grad, mask.as_ref());
            d.mapv(|d| -d * (rng.r#gen::<f64>() - STOCHASTIC_SHIFT))
        }
        Direction::Binary | Direction::SoftBinary => {
            let pull = binary_pull(problem, map, config.direction(), x);
            blended(map, config, x, grad, pull, mask.as_ref())
        }
    };

    normalize(&direction)
}

/// `−grad`, masked when absorption is active.
fn descent(grad: ArrayView1<'_, f64>, mask: Option<&Array1<f64>>) -> Array1<f64> {
    let d = grad.mapv(|g| -g);
    match mask {
        Some(mask) => d * mask,
        None => d,
    }
}

/// Pull toward the nearer bound on binary coordinates, zero elsewhere.
fn binary_pull(
    problem: &Problem,
    map: &BoxMap<'_>,
    direction: Direction,
    x: ArrayView1<'_, f64>,
) -> Array1<f64> {
    let offset = match direction {
        Direction::SoftBinary => map.activate(x) - problem.midpoint(),
        _ => Zip::from(x)
            .and(problem.midpoint())
            .map_collect(|&x, &m| sign(x - m)),
    };
    Zip::from(&offset)
        .and(problem.binary_mask())
        .map_collect(|&o, &binary| if binary { o } else { 0.0 })
}

/// Blends the binary pull with plain descent, then bends the blend toward
/// the proxy-weighted descent `g` until it lies within angle `θ` of it.
fn blended(
    map: &BoxMap<'_>,
    config: &Config,
    x: ArrayView1<'_, f64>,
    grad: ArrayView1<'_, f64>,
    mut pull: Array1<f64>,
    mask: Option<&Array1<f64>>,
) -> Array1<f64> {
    let mut h = grad.mapv(|g| -g);
    let g = (map.proxy_distance(x) * grad).mapv(|v| -v);
    if let Some(mask) = mask {
        pull *= mask;
        h *= mask;
    }

    let b = normalize(&pull);
    let h = normalize(&h);
    let g = normalize(&g);

    let w = &b * config.gamma() + &h * (1.0 - config.gamma());
    let gw = g.dot(&w);
    let spread = (w.dot(&w) - gw * gw).max(0.0).sqrt();
    let y = (-gw + config.theta().tan() * spread).max(0.0);

    let mut d = w;
    d.scaled_add(y, &g);
    match mask {
        Some(mask) => d * mask,
        None => d,
    }
}

/// Sign with `sign(0) = 0`.
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
