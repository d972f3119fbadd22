use hmip_core::{LinearConstraints, linalg::norm};
use ndarray::{Array1, Zip};
use tracing::{debug, warn};

use super::{AugmentedLagrangian, DualAscentConfig, Problem};

/// Dual variables for the linear constraint blocks.
///
/// Each entry is `Some` exactly when the problem has that block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DualVariables {
    pub eq: Option<Array1<f64>>,
    pub ineq: Option<Array1<f64>>,
}

/// How the dual variables used by a solve were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualStatus {
    /// The problem has no linear constraints.
    NotRequired,

    /// The caller supplied duals for every constraint block.
    Supplied,

    /// Dual ascent converged after the given number of outer iterations.
    Converged { outer_iterations: usize },

    /// Dual ascent hit its outer iteration cap; the estimate whose update
    /// changed the duals least is used.
    DidNotConverge { outer_iterations: usize },
}

/// Result of resolving or estimating dual variables.
#[derive(Debug, Clone, PartialEq)]
pub struct DualEstimate {
    pub duals: DualVariables,
    pub status: DualStatus,
}

/// Uses supplied duals when every block has them, estimates otherwise.
pub(super) fn resolve(problem: &Problem, config: &DualAscentConfig) -> DualEstimate {
    if !problem.is_constrained() {
        return DualEstimate {
            duals: DualVariables::default(),
            status: DualStatus::NotRequired,
        };
    }

    let eq_known = problem.eq().is_none() || problem.dual_eq().is_some();
    let ineq_known = problem.ineq().is_none() || problem.dual_ineq().is_some();
    if eq_known && ineq_known {
        debug!("using supplied dual variables");
        return DualEstimate {
            duals: DualVariables {
                eq: problem.dual_eq().cloned(),
                ineq: problem.dual_ineq().cloned(),
            },
            status: DualStatus::Supplied,
        };
    }

    estimate(problem, config)
}

/// Dual ascent on the augmented Lagrangian.
///
/// Each outer iteration minimizes `L(·, ·; λ)` over the box and `s ≤ 0` by
/// projected gradient descent from `(x0, 0)`, then moves the duals along the
/// constraint residuals with geometrically decaying step coefficients.
/// Stops once every dual block changes by less than the tolerance. At the
/// outer cap, returns the estimate whose update moved least.
pub(super) fn estimate(problem: &Problem, config: &DualAscentConfig) -> DualEstimate {
    let rows = |block: Option<&LinearConstraints>| {
        block.map(|c| Array1::from_elem(c.rows(), config.initial_dual()))
    };
    let mut duals = DualVariables {
        eq: rows(problem.eq()),
        ineq: rows(problem.ineq()),
    };

    let eq_step = nonzero_or_one(problem.penalty_eq());
    let ineq_step = nonzero_or_one(problem.penalty_ineq());
    let rate = 1.0 / problem.effective_smoothness_coef();

    let mut decay = 1.0;
    let mut best = Best::empty();
    for outer in 1..=config.max_outer_iterations() {
        let (x, slack) = minimize_inner(problem, &duals, rate, config);
        let lagrangian = AugmentedLagrangian::new(problem, &duals);

        let next_eq = lagrangian.eq_residual(x.view()).map(|residual| {
            let mut next = duals.eq.clone().unwrap_or_default();
            next.scaled_add(eq_step * decay, &residual);
            next
        });
        let next_ineq = lagrangian
            .ineq_residual(x.view(), slack.view())
            .map(|residual| {
                let mut next = duals.ineq.clone().unwrap_or_default();
                next.scaled_add(ineq_step * decay, &residual);
                next.mapv_inplace(|v| v.max(0.0));
                next
            });

        let change = change_norm(duals.eq.as_ref(), next_eq.as_ref())
            .max(change_norm(duals.ineq.as_ref(), next_ineq.as_ref()));
        debug!(outer, change, "dual ascent step");

        duals = DualVariables {
            eq: next_eq,
            ineq: next_ineq,
        };
        decay *= config.step_decay();

        if change < config.tolerance() {
            return DualEstimate {
                duals,
                status: DualStatus::Converged {
                    outer_iterations: outer,
                },
            };
        }
        best.update(change, &duals);
    }

    warn!(
        max_outer_iterations = config.max_outer_iterations(),
        change = best.change,
        "dual ascent did not converge; using the most stable estimate"
    );
    DualEstimate {
        duals: best.duals.unwrap_or(duals),
        status: DualStatus::DidNotConverge {
            outer_iterations: config.max_outer_iterations(),
        },
    }
}

/// Projected gradient descent on `L(x, s)` over the box and `s ≤ 0`.
///
/// Stops once the projected step, scaled back by the rate, falls below the
/// tolerance.
fn minimize_inner(
    problem: &Problem,
    duals: &DualVariables,
    rate: f64,
    config: &DualAscentConfig,
) -> (Array1<f64>, Array1<f64>) {
    let lagrangian = AugmentedLagrangian::new(problem, duals);
    let mut x = problem.x0().clone();
    let mut slack = Array1::zeros(problem.slack_dim());

    for _ in 0..config.max_inner_iterations() {
        let grad_x = lagrangian.gradient(x.view(), slack.view());
        let grad_s = lagrangian.slack_gradient(x.view(), slack.view());

        let mut next_x = x.clone();
        next_x.scaled_add(-rate, &grad_x);
        Zip::from(&mut next_x)
            .and(problem.lb())
            .and(problem.ub())
            .for_each(|v, &l, &u| *v = v.clamp(l, u));

        let mut next_s = slack.clone();
        next_s.scaled_add(-rate, &grad_s);
        next_s.mapv_inplace(|v| v.min(0.0));

        let dx = norm((&next_x - &x).view());
        let ds = norm((&next_s - &slack).view());
        x = next_x;
        slack = next_s;

        // Projected gradient mapping norm.
        if dx.hypot(ds) / rate < config.tolerance() {
            break;
        }
    }

    (x, slack)
}

/// Tracks the best dual estimate encountered so far.
///
/// The best estimate is the one whose update changed the duals least.
struct Best {
    change: f64,
    duals: Option<DualVariables>,
}

impl Best {
    fn empty() -> Self {
        Self {
            change: f64::INFINITY,
            duals: None,
        }
    }

    /// Keeps `duals` if its change improves on the best so far.
    fn update(&mut self, change: f64, duals: &DualVariables) {
        if change >= self.change {
            return;
        }
        self.change = change;
        self.duals = Some(duals.clone());
    }
}

fn nonzero_or_one(penalty: f64) -> f64 {
    if penalty == 0.0 { 1.0 } else { penalty }
}

fn change_norm(before: Option<&Array1<f64>>, after: Option<&Array1<f64>>) -> f64 {
    match (before, after) {
        (Some(before), Some(after)) => norm((after - before).view()),
        _ => 0.0,
    }
}
