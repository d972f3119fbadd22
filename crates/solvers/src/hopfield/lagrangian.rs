use hmip_core::{LinearConstraints, Objective};
use ndarray::{Array1, ArrayView1, Zip};

use super::{DualVariables, Problem};

/// The augmented Lagrangian of a [`Problem`] at fixed dual variables.
///
/// ```text
/// L(x, s) = f(x) + λ_eqᵀc_eq + (ρ_eq/2)‖c_eq‖² + λ_inᵀc_in + (ρ_in/2)‖c_in‖²
/// c_eq = A_eq x − b_eq,   c_in = A_in x − b_in − s,   s ≤ 0
/// ```
///
/// The slack `s` has one entry per inequality row and is empty when the
/// problem has no inequality constraints. Without constraints `L` is `f`.
pub struct AugmentedLagrangian<'a> {
    objective: &'a (dyn Objective + Send + Sync),
    eq: Option<Penalized<'a>>,
    ineq: Option<Penalized<'a>>,
}

struct Penalized<'a> {
    constraints: &'a LinearConstraints,
    dual: ArrayView1<'a, f64>,
    penalty: f64,
}

impl Penalized<'_> {
    /// `λᵀc + (ρ/2)‖c‖²`.
    fn value(&self, residual: &Array1<f64>) -> f64 {
        self.dual.dot(residual) + 0.5 * self.penalty * residual.dot(residual)
    }

    /// `λ + ρc`, the weight applied through `Aᵀ` in the gradient.
    fn multiplier(&self, residual: &Array1<f64>) -> Array1<f64> {
        &self.dual + &(residual * self.penalty)
    }
}

impl<'a> AugmentedLagrangian<'a> {
    /// Binds the problem's objective and constraints to dual variables.
    ///
    /// A constraint block without a matching dual vector is left out.
    #[must_use]
    pub fn new(problem: &'a Problem, duals: &'a DualVariables) -> Self {
        Self {
            objective: problem.objective(),
            eq: problem
                .eq()
                .zip(duals.eq.as_ref())
                .map(|(constraints, dual)| Penalized {
                    constraints,
                    dual: dual.view(),
                    penalty: problem.penalty_eq(),
                }),
            ineq: problem
                .ineq()
                .zip(duals.ineq.as_ref())
                .map(|(constraints, dual)| Penalized {
                    constraints,
                    dual: dual.view(),
                    penalty: problem.penalty_ineq(),
                }),
        }
    }

    /// `L(x, s)`.
    #[must_use]
    pub fn value(&self, x: ArrayView1<'_, f64>, slack: ArrayView1<'_, f64>) -> f64 {
        let mut value = self.objective.value(x);
        if let Some(eq) = &self.eq {
            value += eq.value(&eq.constraints.residual(x));
        }
        if let Some(ineq) = &self.ineq {
            value += ineq.value(&Self::slack_residual(ineq, x, slack));
        }
        value
    }

    /// `∇ₓL = ∇f + A_eqᵀ(λ_eq + ρ_eq c_eq) + A_inᵀ(λ_in + ρ_in c_in)`.
    #[must_use]
    pub fn gradient(&self, x: ArrayView1<'_, f64>, slack: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut grad = self.objective.gradient(x);
        if let Some(eq) = &self.eq {
            let weight = eq.multiplier(&eq.constraints.residual(x));
            grad += &eq.constraints.transpose_dot(weight.view());
        }
        if let Some(ineq) = &self.ineq {
            let weight = ineq.multiplier(&Self::slack_residual(ineq, x, slack));
            grad += &ineq.constraints.transpose_dot(weight.view());
        }
        grad
    }

    /// `∂L/∂s = −λ_in − ρ_in c_in`; empty without inequality constraints.
    #[must_use]
    pub fn slack_gradient(&self, x: ArrayView1<'_, f64>, slack: ArrayView1<'_, f64>) -> Array1<f64> {
        match &self.ineq {
            Some(ineq) => ineq
                .multiplier(&Self::slack_residual(ineq, x, slack))
                .mapv(|v| -v),
            None => Array1::zeros(0),
        }
    }

    /// Projected slack step `s ← min(0, s − (1/ρ_in)·∂L/∂s)`.
    #[must_use]
    pub fn update_slack(&self, x: ArrayView1<'_, f64>, slack: ArrayView1<'_, f64>) -> Array1<f64> {
        let Some(ineq) = &self.ineq else {
            return Array1::zeros(0);
        };
        let rate = 1.0 / ineq.penalty;
        let grad = self.slack_gradient(x, slack);
        Zip::from(slack)
            .and(&grad)
            .map_collect(|&s, &g| (s - rate * g).min(0.0))
    }

    /// Equality residual `A_eq x − b_eq`, if the block is present.
    #[must_use]
    pub fn eq_residual(&self, x: ArrayView1<'_, f64>) -> Option<Array1<f64>> {
        self.eq.as_ref().map(|eq| eq.constraints.residual(x))
    }

    /// Inequality residual `A_in x − b_in − s`, if the block is present.
    #[must_use]
    pub fn ineq_residual(
        &self,
        x: ArrayView1<'_, f64>,
        slack: ArrayView1<'_, f64>,
    ) -> Option<Array1<f64>> {
        self.ineq
            .as_ref()
            .map(|ineq| Self::slack_residual(ineq, x, slack))
    }

    fn slack_residual(
        ineq: &Penalized<'_>,
        x: ArrayView1<'_, f64>,
        slack: ArrayView1<'_, f64>,
    ) -> Array1<f64> {
        ineq.constraints.residual(x) - &slack
    }
}
