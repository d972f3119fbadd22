use approx::{assert_abs_diff_eq, assert_relative_eq};
use hmip_core::{FnObjective, Quadratic, linalg::normalize};
use ndarray::{Array1, ArrayView1, array};

use super::{
    Action, Activation, AugmentedLagrangian, Config, Direction, DualStatus, DualVariables, Error,
    Event, ProblemDefinition, Status, StepRule, estimate_duals, setup, solve, solve_unobserved,
    step,
};

/// `f(x) = ½xᵀHx + qᵀx` with `H = [[1, 1], [1, 10]]`, `q = [−1, −6]` on the
/// unit square. The unconstrained minimizer `[4/9, 5/9]` is interior.
fn quadratic() -> Quadratic {
    Quadratic::new(array![[1.0, 1.0], [1.0, 10.0]], array![-1.0, -6.0]).unwrap()
}

fn unit_square() -> ProblemDefinition {
    ProblemDefinition::new(quadratic(), array![0.0, 0.0], array![1.0, 1.0])
}

fn pwl_classic() -> Config {
    Config::builder()
        .activation(Activation::Pwl)
        .direction(Direction::Classic)
        .build()
        .unwrap()
}

#[test]
fn converges_to_interior_minimizer() {
    let config = pwl_classic();
    let problem = setup(unit_square(), &config).unwrap();

    let solution = solve_unobserved(&problem, &config).expect("should converge");

    assert_eq!(solution.status, Status::Converged);
    assert!(solution.stationarity < config.precision_stopping_criterion());
    assert_relative_eq!(solution.x()[0], 4.0 / 9.0, epsilon = 1e-5);
    assert_relative_eq!(solution.x()[1], 5.0 / 9.0, epsilon = 1e-5);
    assert_eq!(solution.trajectory.len(), solution.iters + 1);
    assert_eq!(solution.dual_status, DualStatus::NotRequired);
}

#[test]
fn armijo_steps_never_increase_the_objective() {
    let config = Config::builder().step(StepRule::Armijo).build().unwrap();
    let problem = setup(unit_square(), &config).unwrap();

    let solution = solve_unobserved(&problem, &config).expect("should converge");

    assert_eq!(solution.status, Status::Converged);
    let objective = &solution.trajectory.objective;
    for k in 1..objective.len() {
        assert!(objective[k] <= objective[k - 1] + 1e-12, "increase at {k}");
    }
    assert_relative_eq!(solution.x()[0], 4.0 / 9.0, epsilon = 1e-5);
    assert_relative_eq!(solution.x()[1], 5.0 / 9.0, epsilon = 1e-5);
}

#[test]
fn binary_coordinate_is_absorbed_onto_a_bound() {
    let config = Config::builder()
        .absorption_criterion(Some(0.1))
        .build()
        .unwrap();
    let problem = setup(unit_square().with_binary_mask(array![1, 0]), &config).unwrap();

    let solution = solve_unobserved(&problem, &config).expect("should finish");

    let x = solution.x();
    assert!(x[0] == 0.0 || x[0] == 1.0, "x[0] = {}", x[0]);
    assert!(x[1] > 0.0 && x[1] < 1.0);
    assert_eq!(solution.status, Status::Converged);
}

#[test]
fn equality_constraint_is_nearly_satisfied() {
    let config = Config::builder().max_iterations(5_000).build().unwrap();
    let definition = unit_square()
        .with_eq_row(array![3.0, -2.0], array![-0.5])
        .with_penalties(100.0, 0.0);
    let problem = setup(definition, &config).unwrap();

    let solution = solve_unobserved(&problem, &config).expect("should finish");

    assert!(matches!(solution.dual_status, DualStatus::Converged { .. }));
    let x = solution.x();
    let residual = 3.0 * x[0] - 2.0 * x[1] + 0.5;
    assert!(residual.abs() < 1.0 / 100.0, "residual = {residual}");

    // Constrained minimizer from the KKT system.
    assert_abs_diff_eq!(x[0], 12.0 / 53.0, epsilon = 1e-3);
    assert_abs_diff_eq!(x[1], 62.5 / 106.0, epsilon = 1e-3);
}

#[test]
fn inequality_slack_stays_non_positive() {
    let objective = Quadratic::new(array![[2.0, 0.0], [0.0, 2.0]], array![-2.0, -2.0]).unwrap();
    let definition = ProblemDefinition::new(objective, array![0.0, 0.0], array![1.0, 1.0])
        .with_ineq_row(array![1.0, 1.0], array![1.0])
        .with_penalties(0.0, 10.0)
        .with_dual_ineq(array![1.0]);
    let config = Config::builder().max_iterations(3_000).build().unwrap();
    let problem = setup(definition, &config).unwrap();

    let solution = solve_unobserved(&problem, &config).expect("should finish");

    assert_eq!(solution.dual_status, DualStatus::Supplied);
    let slack = solution.trajectory.slack.as_ref().expect("slack is recorded");
    assert_eq!(slack.ncols(), solution.trajectory.len());
    assert!(slack.iter().all(|&s| s <= 0.0));

    let x = solution.x();
    assert!(x[0] + x[1] <= 1.0 + 1e-2);
    assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-2);
    assert_abs_diff_eq!(x[1], 0.5, epsilon = 1e-2);
}

#[test]
fn constrained_steps_use_the_augmented_smoothness() {
    let config = Config::builder()
        .direction(Direction::Classic)
        .max_iterations(2)
        .build()
        .unwrap();
    let dual_eq = array![0.0613];
    let definition = unit_square()
        .with_eq_row(array![3.0, -2.0], array![-0.5])
        .with_penalties(100.0, 0.0)
        .with_dual_eq(dual_eq.clone());
    let problem = setup(definition, &config).unwrap();

    let solution = solve_unobserved(&problem, &config).expect("should finish");

    let duals = DualVariables {
        eq: Some(dual_eq),
        ineq: None,
    };
    let lagrangian = AugmentedLagrangian::new(&problem, &duals);
    let x0 = problem.x0().view();
    let grad = lagrangian.gradient(x0, Array1::<f64>::zeros(0).view());
    let sigma = problem.box_map(&config).proxy_distance(x0);
    let d = normalize(&grad.mapv(|g| -g));
    let classic = |smoothness| {
        step::classic(
            sigma.view(),
            grad.view(),
            d.view(),
            problem.beta().view(),
            smoothness,
            None,
        )
    };

    let augmented = classic(problem.effective_smoothness_coef());
    assert_relative_eq!(solution.trajectory.step_size[0], augmented, max_relative = 1e-12);

    // The plain objective's constant ignores the penalty curvature.
    assert!(classic(problem.smoothness_coef()) > augmented * (1.0 + 1e-6));
}

#[test]
fn stops_at_iteration_cap() {
    let config = Config::builder().max_iterations(5).build().unwrap();
    let problem = setup(unit_square(), &config).unwrap();

    let solution = solve_unobserved(&problem, &config).expect("should finish");

    assert_eq!(solution.status, Status::MaxIters);
    assert_eq!(solution.iters, 4);
    assert_eq!(solution.trajectory.len(), 5);
    assert_eq!(solution.trajectory.step_size.len(), 4);
    assert!(solution.trajectory.x.iter().all(|v| v.is_finite()));
    assert!(solution.trajectory.objective.iter().all(|v| v.is_finite()));
}

#[test]
fn single_iteration_returns_the_start_point() {
    let config = Config::builder().max_iterations(1).build().unwrap();
    let problem = setup(unit_square(), &config).unwrap();

    let solution = solve_unobserved(&problem, &config).expect("should finish");

    assert_eq!(solution.status, Status::MaxIters);
    assert_eq!(solution.iters, 0);
    assert_eq!(solution.x(), problem.x0().view());
    assert!(solution.trajectory.step_size.is_empty());
}

#[test]
fn identity_activation_is_stationary_at_start() {
    let config = Config::builder()
        .activation(Activation::Identity)
        .build()
        .unwrap();
    let problem = setup(unit_square(), &config).unwrap();

    let solution = solve_unobserved(&problem, &config).expect("should finish");

    assert_eq!(solution.status, Status::Converged);
    assert_eq!(solution.iters, 0);
    assert_eq!(solution.stationarity, 0.0);
}

#[test]
fn setup_is_deterministic() {
    let config = Config::default();
    let first = setup(unit_square(), &config).unwrap();
    let second = setup(unit_square(), &config).unwrap();

    assert_eq!(first.x0(), second.x0());
    assert_eq!(first.smoothness_coef(), second.smoothness_coef());

    let a = solve_unobserved(&first, &config).unwrap();
    let b = solve_unobserved(&second, &config).unwrap();
    assert_eq!(a.trajectory, b.trajectory);
}

#[test]
fn observer_can_stop_early() {
    let config = pwl_classic();
    let problem = setup(unit_square(), &config).unwrap();

    let mut seen = Vec::new();
    let observer = |event: &Event<'_>| {
        let iter = event.iter()?;
        seen.push(iter);
        (iter == 3).then_some(Action::StopEarly)
    };

    let solution = solve(&problem, &config, observer).expect("should stop");

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.iters, 3);
    assert_eq!(solution.trajectory.len(), 4);
    assert_eq!(seen, vec![1, 2, 3]);
}

#[test]
fn observer_sees_dual_ascent_first() {
    let config = Config::builder().max_iterations(3).build().unwrap();
    let definition = unit_square()
        .with_eq_row(array![3.0, -2.0], array![-0.5])
        .with_penalties(100.0, 0.0);
    let problem = setup(definition, &config).unwrap();

    let mut events = Vec::new();
    let observer = |event: &Event<'_>| {
        events.push(match event {
            Event::DualAscent { estimate } => {
                assert!(estimate.duals.eq.is_some());
                "dual"
            }
            Event::Iteration { .. } => "iteration",
        });
        None
    };

    solve(&problem, &config, observer).expect("should finish");

    assert_eq!(events, vec!["dual", "iteration", "iteration"]);
}

#[test]
fn observer_can_stop_after_dual_ascent() {
    let config = pwl_classic();
    let definition = unit_square()
        .with_eq_row(array![3.0, -2.0], array![-0.5])
        .with_penalties(100.0, 0.0);
    let problem = setup(definition, &config).unwrap();

    let observer = |event: &Event<'_>| match event {
        Event::DualAscent { .. } => Some(Action::StopEarly),
        Event::Iteration { .. } => None,
    };

    let solution = solve(&problem, &config, observer).unwrap();

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.iters, 0);
    assert_eq!(solution.trajectory.len(), 1);
}

#[test]
fn estimates_equality_multiplier() {
    let config = Config::default();
    let definition = unit_square()
        .with_eq_row(array![3.0, -2.0], array![-0.5])
        .with_penalties(100.0, 0.0);
    let problem = setup(definition, &config).unwrap();

    let estimate = estimate_duals(&problem, &config.dual_ascent());

    assert!(matches!(estimate.status, DualStatus::Converged { .. }));
    let lambda = estimate.duals.eq.expect("equality duals");
    assert_abs_diff_eq!(lambda[0], 6.5 / 106.0, epsilon = 1e-3);
}

#[test]
fn non_finite_start_is_an_error() {
    let objective = FnObjective::new(
        |x: ArrayView1<'_, f64>| 1.0 / (x[0] - x[0]),
        |x: ArrayView1<'_, f64>| x.to_owned(),
    );
    let config = Config::default();
    let definition = ProblemDefinition::new(objective, array![0.0], array![1.0])
        .with_smoothness_coef(1.0);
    let problem = setup(definition, &config).unwrap();

    let error = solve_unobserved(&problem, &config).unwrap_err();

    assert_eq!(error, Error::NonFiniteObjective { iter: 0 });
}

#[cfg(feature = "serde")]
#[test]
fn config_reads_from_json() {
    let config: Config = serde_json::from_str(
        r#"{
            "activation": "pwl",
            "direction": "soft_binary",
            "step": "armijo",
            "beta": [1.0, 2.0],
            "max_iterations": 50,
            "dual_ascent": { "tolerance": 1e-4 }
        }"#,
    )
    .unwrap();

    assert_eq!(config.activation(), Activation::Pwl);
    assert_eq!(config.direction(), Direction::SoftBinary);
    assert_eq!(config.step(), StepRule::Armijo);
    assert_eq!(config.beta(), &super::Beta::PerCoordinate(vec![1.0, 2.0]));
    assert_eq!(config.max_iterations(), 50);
    assert_eq!(config.gamma(), Config::default().gamma());
    assert_eq!(config.dual_ascent().tolerance(), 1e-4);
    assert_eq!(config.dual_ascent().max_outer_iterations(), 100);
}

#[cfg(feature = "serde")]
#[test]
fn config_read_from_json_is_validated() {
    let error = serde_json::from_str::<Config>(r#"{ "gamma": 2.0 }"#).unwrap_err();
    assert!(error.to_string().contains("gamma"));

    let error = serde_json::from_str::<Config>(r#"{ "dual_ascent": { "step_decay": 0.0 } }"#)
        .unwrap_err();
    assert!(error.to_string().contains("step decay"));
}
