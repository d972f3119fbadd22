use std::{fmt, sync::Arc};

use hmip_core::{ConstraintError, LinearConstraints, Objective, linalg};
use ndarray::{Array1, Array2, ArrayView1, Zip};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use super::{
    Beta, BetaScope, Config, ConstraintKind, SetupError,
    activation::BoxMap,
    initial::{AscentProblem, initial_point},
};

type SharedObjective = Arc<dyn Objective + Send + Sync>;

/// Caller-facing description of a problem, consumed by [`setup`](super::setup).
///
/// # Example
///
/// ```
/// use hmip_core::Quadratic;
/// use hmip_solvers::hopfield::{Config, ProblemDefinition, setup};
/// use ndarray::array;
///
/// let objective = Quadratic::new(array![[2.0, 0.0], [0.0, 1.0]], array![-1.0, 0.5])?;
/// let definition = ProblemDefinition::new(objective, array![0.0, 0.0], array![1.0, 1.0])
///     .with_binary_mask(array![1, 0])
///     .with_eq_row(array![1.0, 1.0], array![1.0])
///     .with_penalties(10.0, 0.0);
///
/// let problem = setup(definition, &Config::default())?;
/// assert_eq!(problem.dim(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct ProblemDefinition {
    objective: SharedObjective,
    lb: Array1<f64>,
    ub: Array1<f64>,
    binary_mask: Option<Array1<u8>>,
    eq: Option<Result<LinearConstraints, ConstraintError>>,
    ineq: Option<Result<LinearConstraints, ConstraintError>>,
    x0: Option<Array1<f64>>,
    smoothness_coef: Option<f64>,
    penalty_eq: f64,
    penalty_ineq: f64,
    dual_eq: Option<Array1<f64>>,
    dual_ineq: Option<Array1<f64>>,
}

impl ProblemDefinition {
    /// Starts a definition from an objective and box bounds.
    ///
    /// Every coordinate is continuous until a binary mask is supplied.
    pub fn new<O>(objective: O, lb: Array1<f64>, ub: Array1<f64>) -> Self
    where
        O: Objective + Send + Sync + 'static,
    {
        Self {
            objective: Arc::new(objective),
            lb,
            ub,
            binary_mask: None,
            eq: None,
            ineq: None,
            x0: None,
            smoothness_coef: None,
            penalty_eq: 0.0,
            penalty_ineq: 0.0,
            dual_eq: None,
            dual_ineq: None,
        }
    }

    /// Marks coordinates as binary (`1`) or continuous (`0`).
    #[must_use]
    pub fn with_binary_mask(mut self, mask: Array1<u8>) -> Self {
        self.binary_mask = Some(mask);
        self
    }

    /// Adds equality constraints `A x = b`.
    #[must_use]
    pub fn with_eq(mut self, a: Array2<f64>, b: Array1<f64>) -> Self {
        self.eq = Some(LinearConstraints::new(a, b));
        self
    }

    /// Adds a single equality constraint from a flat coefficient row.
    #[must_use]
    pub fn with_eq_row(mut self, row: Array1<f64>, b: Array1<f64>) -> Self {
        self.eq = Some(LinearConstraints::from_row(row, b));
        self
    }

    /// Adds inequality constraints `A x ≤ b`.
    #[must_use]
    pub fn with_ineq(mut self, a: Array2<f64>, b: Array1<f64>) -> Self {
        self.ineq = Some(LinearConstraints::new(a, b));
        self
    }

    /// Adds a single inequality constraint from a flat coefficient row.
    #[must_use]
    pub fn with_ineq_row(mut self, row: Array1<f64>, b: Array1<f64>) -> Self {
        self.ineq = Some(LinearConstraints::from_row(row, b));
        self
    }

    /// Suggests a start point; it is ignored unless strictly inside the box.
    #[must_use]
    pub fn with_x0(mut self, x0: Array1<f64>) -> Self {
        self.x0 = Some(x0);
        self
    }

    /// Overrides the gradient's Lipschitz constant.
    #[must_use]
    pub fn with_smoothness_coef(mut self, smoothness_coef: f64) -> Self {
        self.smoothness_coef = Some(smoothness_coef);
        self
    }

    /// Sets the augmented-Lagrangian penalties `ρ_eq` and `ρ_ineq`.
    #[must_use]
    pub fn with_penalties(mut self, penalty_eq: f64, penalty_ineq: f64) -> Self {
        self.penalty_eq = penalty_eq;
        self.penalty_ineq = penalty_ineq;
        self
    }

    /// Supplies known equality duals, skipping their estimate.
    #[must_use]
    pub fn with_dual_eq(mut self, dual: Array1<f64>) -> Self {
        self.dual_eq = Some(dual);
        self
    }

    /// Supplies known inequality duals, skipping their estimate.
    #[must_use]
    pub fn with_dual_ineq(mut self, dual: Array1<f64>) -> Self {
        self.dual_ineq = Some(dual);
        self
    }
}

/// A validated, immutable problem ready to be solved.
///
/// Built once by [`setup`](super::setup) and read-only afterwards.
#[derive(Clone)]
pub struct Problem {
    objective: SharedObjective,
    lb: Array1<f64>,
    ub: Array1<f64>,
    mid: Array1<f64>,
    binary: Array1<bool>,
    eq: Option<LinearConstraints>,
    ineq: Option<LinearConstraints>,
    penalty_eq: f64,
    penalty_ineq: f64,
    smoothness_coef: f64,
    x0: Array1<f64>,
    beta: Array1<f64>,
    dual_eq: Option<Array1<f64>>,
    dual_ineq: Option<Array1<f64>>,
}

impl Problem {
    /// Number of variables.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.lb.len()
    }

    #[must_use]
    pub fn objective(&self) -> &(dyn Objective + Send + Sync) {
        self.objective.as_ref()
    }

    #[must_use]
    pub fn lb(&self) -> &Array1<f64> {
        &self.lb
    }

    #[must_use]
    pub fn ub(&self) -> &Array1<f64> {
        &self.ub
    }

    /// The box midpoint `(lb + ub) / 2`.
    #[must_use]
    pub fn midpoint(&self) -> &Array1<f64> {
        &self.mid
    }

    /// `true` at binary coordinates.
    #[must_use]
    pub fn binary_mask(&self) -> &Array1<bool> {
        &self.binary
    }

    #[must_use]
    pub fn eq(&self) -> Option<&LinearConstraints> {
        self.eq.as_ref()
    }

    #[must_use]
    pub fn ineq(&self) -> Option<&LinearConstraints> {
        self.ineq.as_ref()
    }

    #[must_use]
    pub fn penalty_eq(&self) -> f64 {
        self.penalty_eq
    }

    #[must_use]
    pub fn penalty_ineq(&self) -> f64 {
        self.penalty_ineq
    }

    /// Lipschitz constant of the objective gradient.
    #[must_use]
    pub fn smoothness_coef(&self) -> f64 {
        self.smoothness_coef
    }

    /// Smoothness of the augmented Lagrangian:
    /// `L + ρ_eq·λmax(A_eqᵀA_eq) + ρ_ineq·λmax(A_ineqᵀA_ineq)`.
    ///
    /// Equals [`smoothness_coef`](Self::smoothness_coef) without constraints.
    #[must_use]
    pub fn effective_smoothness_coef(&self) -> f64 {
        let eq = self
            .eq
            .as_ref()
            .map_or(0.0, |c| self.penalty_eq * c.gram_spectral_radius());
        let ineq = self
            .ineq
            .as_ref()
            .map_or(0.0, |c| self.penalty_ineq * c.gram_spectral_radius());
        self.smoothness_coef + eq + ineq
    }

    /// The start point, strictly inside the box up to the ascent stop distance.
    #[must_use]
    pub fn x0(&self) -> &Array1<f64> {
        &self.x0
    }

    /// Resolved per-coordinate activation sharpness.
    #[must_use]
    pub fn beta(&self) -> &Array1<f64> {
        &self.beta
    }

    #[must_use]
    pub fn dual_eq(&self) -> Option<&Array1<f64>> {
        self.dual_eq.as_ref()
    }

    #[must_use]
    pub fn dual_ineq(&self) -> Option<&Array1<f64>> {
        self.dual_ineq.as_ref()
    }

    /// Returns `true` if the problem has any linear constraints.
    #[must_use]
    pub fn is_constrained(&self) -> bool {
        self.eq.is_some() || self.ineq.is_some()
    }

    /// Number of inequality rows, which is also the slack dimension.
    #[must_use]
    pub fn slack_dim(&self) -> usize {
        self.ineq.as_ref().map_or(0, LinearConstraints::rows)
    }

    pub(super) fn box_map(&self, config: &Config) -> BoxMap<'_> {
        BoxMap::new(
            config.activation(),
            self.lb.view(),
            self.ub.view(),
            self.beta.view(),
        )
    }
}

impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Problem")
            .field("lb", &self.lb)
            .field("ub", &self.ub)
            .field("binary", &self.binary)
            .field("eq", &self.eq)
            .field("ineq", &self.ineq)
            .field("penalty_eq", &self.penalty_eq)
            .field("penalty_ineq", &self.penalty_ineq)
            .field("smoothness_coef", &self.smoothness_coef)
            .field("x0", &self.x0)
            .field("beta", &self.beta)
            .finish_non_exhaustive()
    }
}

/// Resolves the configured β into one value per coordinate.
///
/// A scalar β is broadcast according to [`Config::beta_scope`]; coordinates
/// outside the scope get `1.0`. A per-coordinate β is used as-is.
///
/// # Errors
///
/// Returns [`SetupError::InvalidBeta`] if a per-coordinate β has the wrong
/// length or any value is not finite and positive.
pub fn resolve_beta(config: &Config, binary: &Array1<bool>) -> Result<Array1<f64>, SetupError> {
    let beta = match config.beta() {
        Beta::Scalar(b) => binary.mapv(|is_binary| match (config.beta_scope(), is_binary) {
            (BetaScope::All, _)
            | (BetaScope::ContinuousOnly, false)
            | (BetaScope::BinaryOnly, true) => *b,
            _ => 1.0,
        }),
        Beta::PerCoordinate(values) => {
            if values.len() != binary.len() {
                return Err(SetupError::InvalidBeta);
            }
            Array1::from(values.clone())
        }
    };

    if beta.iter().all(|b| b.is_finite() && *b > 0.0) {
        Ok(beta)
    } else {
        Err(SetupError::InvalidBeta)
    }
}

pub(super) fn setup(definition: ProblemDefinition, config: &Config) -> Result<Problem, SetupError> {

    let ProblemDefinition {
        objective,
        lb,
        ub,
        binary_mask,
        eq,
        ineq,
        x0,
        smoothness_coef,
        penalty_eq,
        penalty_ineq,
        dual_eq,
        dual_ineq,
    } = definition;

    let n = lb.len();
    let mask = binary_mask.unwrap_or_else(|| Array1::zeros(n));
    if mask.len() != n || ub.len() != n {
        return Err(SetupError::DimensionMismatch {
            mask: mask.len(),
            lb: n,
            ub: ub.len(),
        });
    }
    if let Some(index) = lb
        .iter()
        .zip(&ub)
        .position(|(l, u)| !(l.is_finite() && u.is_finite() && l < u))
    {
        return Err(SetupError::InvalidBounds { index });
    }
    if let Some((index, &value)) = mask.iter().enumerate().find(|(_, v)| **v > 1) {
        return Err(SetupError::InvalidBinaryMask { index, value });
    }
    let binary = mask.mapv(|v| v == 1);

    let eq = check_constraints(eq, ConstraintKind::Equality, n)?;
    let ineq = check_constraints(ineq, ConstraintKind::Inequality, n)?;

    if !(penalty_eq.is_finite() && penalty_eq >= 0.0) {
        return Err(SetupError::InvalidPenalty {
            kind: ConstraintKind::Equality,
            value: penalty_eq,
        });
    }
    let ineq_penalty_ok = if ineq.is_some() {
        penalty_ineq > 0.0
    } else {
        penalty_ineq >= 0.0
    };
    if !(penalty_ineq.is_finite() && ineq_penalty_ok) {
        return Err(SetupError::InvalidPenalty {
            kind: ConstraintKind::Inequality,
            value: penalty_ineq,
        });
    }

    let dual_eq = check_dual(dual_eq, eq.as_ref(), ConstraintKind::Equality)?;
    let dual_ineq = check_dual(dual_ineq, ineq.as_ref(), ConstraintKind::Inequality)?;

    if let Some(x0) = &x0 {
        if x0.len() != n {
            return Err(SetupError::InvalidStartingPoint { len: x0.len(), n });
        }
    }

    let mut rng = StdRng::seed_from_u64(config.seed());

    let smoothness_coef = match smoothness_coef.or_else(|| objective.smoothness_coef()) {
        Some(coef) => coef,
        None => {
            let coef = estimate_smoothness(objective.as_ref(), lb.view(), ub.view(), &mut rng);
            debug!(smoothness_coef = coef, samples = n, "estimated smoothness coefficient");
            coef
        }
    };
    if !(smoothness_coef.is_finite() && smoothness_coef > 0.0) {
        return Err(SetupError::NonPositiveSmoothness(smoothness_coef));
    }

    let beta = resolve_beta(config, &binary)?;

    let ascent = AscentProblem {
        objective: objective.as_ref(),
        lb: lb.view(),
        ub: ub.view(),
        binary: &binary,
        smoothness_coef,
    };
    let x0 = initial_point(&ascent, x0.as_ref().map(|x| x.view()), config, &mut rng);
    debug!(?x0, "computed start point");

    let mid = Zip::from(&lb).and(&ub).map_collect(|&l, &u| 0.5 * (l + u));

    Ok(Problem {
        objective,
        lb,
        ub,
        mid,
        binary,
        eq,
        ineq,
        penalty_eq,
        penalty_ineq,
        smoothness_coef,
        x0,
        beta,
        dual_eq,
        dual_ineq,
    })
}

fn check_constraints(
    block: Option<Result<LinearConstraints, ConstraintError>>,
    kind: ConstraintKind,
    n: usize,
) -> Result<Option<LinearConstraints>, SetupError> {
    block
        .map(|block| {
            let block = block?;
            block.check_columns(n)?;
            Ok(block)
        })
        .transpose()
        .map_err(|source| SetupError::ConstraintShape { kind, source })
}

fn check_dual(
    dual: Option<Array1<f64>>,
    block: Option<&LinearConstraints>,
    kind: ConstraintKind,
) -> Result<Option<Array1<f64>>, SetupError> {
    match (dual, block) {
        (Some(dual), Some(block)) => {
            if dual.len() == block.rows() && dual.iter().all(|v| v.is_finite()) {
                Ok(Some(dual))
            } else {
                Err(SetupError::InvalidDual {
                    kind,
                    len: dual.len(),
                    rows: block.rows(),
                })
            }
        }
        // Duals for an absent block have nothing to weight.
        _ => Ok(None),
    }
}

/// Samples `n` random pairs in the box and returns the largest observed
/// gradient difference ratio `‖∇f(p) − ∇f(q)‖ / ‖p − q‖`.
fn estimate_smoothness(
    objective: &(dyn Objective + Send + Sync),
    lb: ArrayView1<'_, f64>,
    ub: ArrayView1<'_, f64>,
    rng: &mut StdRng,
) -> f64 {
    let sample = |rng: &mut StdRng| {
        Zip::from(lb)
            .and(ub)
            .map_collect(|&l, &u| l + (u - l) * rng.r#gen::<f64>())
    };

    (0..lb.len())
        .map(|_| {
            let p = sample(rng);
            let q = sample(rng);
            let distance = linalg::norm((&p - &q).view());
            if distance == 0.0 {
                return 0.0;
            }
            let diff = objective.gradient(p.view()) - objective.gradient(q.view());
            linalg::norm(diff.view()) / distance
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use hmip_core::{FnObjective, Quadratic};
    use ndarray::array;

    fn quadratic() -> Quadratic {
        Quadratic::new(array![[1.0, 1.0], [1.0, 10.0]], array![-1.0, -6.0]).unwrap()
    }

    fn unit_box() -> ProblemDefinition {
        ProblemDefinition::new(quadratic(), array![0.0, 0.0], array![1.0, 1.0])
    }

    #[test]
    fn beta_scopes() {
        let binary = array![true, false, true];
        let scoped = |beta_scope| {
            let config = Config::builder()
                .beta(Beta::Scalar(4.0))
                .beta_scope(beta_scope)
                .build()
                .unwrap();
            resolve_beta(&config, &binary).unwrap()
        };

        assert_eq!(scoped(BetaScope::ContinuousOnly), array![1.0, 4.0, 1.0]);
        assert_eq!(scoped(BetaScope::BinaryOnly), array![4.0, 1.0, 4.0]);
        assert_eq!(scoped(BetaScope::All), array![4.0, 4.0, 4.0]);
    }

    #[test]
    fn per_coordinate_beta_must_match_dimension() {
        let binary = array![false, false];
        let config = Config::builder()
            .beta(Beta::PerCoordinate(vec![1.0, 2.0, 3.0]))
            .build()
            .unwrap();
        assert_eq!(resolve_beta(&config, &binary), Err(SetupError::InvalidBeta));

        let config = Config::builder()
            .beta(Beta::PerCoordinate(vec![0.5, 2.0]))
            .build()
            .unwrap();
        assert_eq!(resolve_beta(&config, &binary), Ok(array![0.5, 2.0]));
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let err = setup(unit_box().with_binary_mask(array![1, 0, 0]), &Config::default())
            .unwrap_err();
        assert_eq!(err, SetupError::DimensionMismatch { mask: 3, lb: 2, ub: 2 });
    }

    #[test]
    fn rejects_inverted_bounds() {
        let definition = ProblemDefinition::new(quadratic(), array![0.0, 1.0], array![1.0, 1.0]);
        let err = setup(definition, &Config::default()).unwrap_err();
        assert_eq!(err, SetupError::InvalidBounds { index: 1 });
    }

    #[test]
    fn rejects_non_binary_mask_entries() {
        let err = setup(unit_box().with_binary_mask(array![0, 2]), &Config::default())
            .unwrap_err();
        assert_eq!(err, SetupError::InvalidBinaryMask { index: 1, value: 2 });
    }

    #[test]
    fn rejects_constraint_shapes() {
        let err = setup(
            unit_box().with_eq(array![[1.0, 2.0, 3.0]], array![1.0]),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SetupError::ConstraintShape {
                kind: ConstraintKind::Equality,
                source: ConstraintError::ColumnMismatch { cols: 3, n: 2 },
            }
        );

        let err = setup(
            unit_box()
                .with_ineq(array![[1.0, 2.0]], array![1.0, 0.0])
                .with_penalties(0.0, 1.0),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SetupError::ConstraintShape {
                kind: ConstraintKind::Inequality,
                source: ConstraintError::RowMismatch { rows: 1, rhs: 2 },
            }
        );
    }

    #[test]
    fn inequalities_need_positive_penalty() {
        let err = setup(
            unit_box().with_ineq_row(array![1.0, 1.0], array![1.0]),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SetupError::InvalidPenalty {
                kind: ConstraintKind::Inequality,
                value: 0.0,
            }
        );

        let err = setup(unit_box().with_penalties(-1.0, 0.0), &Config::default()).unwrap_err();
        assert!(matches!(
            err,
            SetupError::InvalidPenalty { kind: ConstraintKind::Equality, .. }
        ));
    }

    #[test]
    fn rejects_wrong_dual_length() {
        let err = setup(
            unit_box()
                .with_eq_row(array![1.0, 1.0], array![1.0])
                .with_dual_eq(array![0.0, 0.0]),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SetupError::InvalidDual {
                kind: ConstraintKind::Equality,
                len: 2,
                rows: 1,
            }
        );
    }

    #[test]
    fn rejects_wrong_start_length() {
        let err = setup(unit_box().with_x0(array![0.5]), &Config::default()).unwrap_err();
        assert_eq!(err, SetupError::InvalidStartingPoint { len: 1, n: 2 });
    }

    #[test]
    fn rejects_non_positive_smoothness() {
        let err = setup(unit_box().with_smoothness_coef(0.0), &Config::default()).unwrap_err();
        assert_eq!(err, SetupError::NonPositiveSmoothness(0.0));

        // A linear objective has a constant gradient, so sampling finds no curvature.
        let linear = FnObjective::new(
            |x: ArrayView1<'_, f64>| x.sum(),
            |x: ArrayView1<'_, f64>| Array1::ones(x.len()),
        );
        let definition = ProblemDefinition::new(linear, array![0.0, 0.0], array![1.0, 1.0]);
        let err = setup(definition, &Config::default()).unwrap_err();
        assert_eq!(err, SetupError::NonPositiveSmoothness(0.0));
    }

    #[test]
    fn quadratic_smoothness_is_exact() {
        let problem = setup(unit_box(), &Config::default()).unwrap();
        assert_relative_eq!(
            problem.smoothness_coef(),
            (11.0 + 85.0_f64.sqrt()) / 2.0,
            epsilon = 1e-8
        );
    }

    #[test]
    fn estimated_smoothness_matches_isotropic_curvature() {
        let objective = FnObjective::new(
            |x: ArrayView1<'_, f64>| x.dot(&x),
            |x: ArrayView1<'_, f64>| 2.0 * &x,
        );
        let estimate = estimate_smoothness(
            &objective,
            array![-1.0, -1.0].view(),
            array![1.0, 1.0].view(),
            &mut StdRng::seed_from_u64(7),
        );
        // Every sampled pair sees exactly the spectral norm.
        assert_relative_eq!(estimate, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn effective_smoothness_adds_penalized_gram_norms() {
        let problem = setup(
            unit_box()
                .with_eq_row(array![3.0, -2.0], array![-0.5])
                .with_ineq_row(array![1.0, 0.0], array![0.5])
                .with_penalties(2.0, 3.0),
            &Config::default(),
        )
        .unwrap();
        let expected = problem.smoothness_coef() + 2.0 * 13.0 + 3.0 * 1.0;
        assert_relative_eq!(problem.effective_smoothness_coef(), expected, epsilon = 1e-8);
    }

    #[test]
    fn start_point_is_inside_the_box() {
        let config = Config::default();
        let problem = setup(unit_box().with_binary_mask(array![1, 0]), &config).unwrap();
        let eps = config.effective_ascent_stop();
        for (i, &x) in problem.x0().iter().enumerate() {
            assert!(x >= problem.lb()[i] + eps - 1e-12 && x <= problem.ub()[i] - eps + 1e-12);
        }
    }
}
