use hmip_core::{Observer, linalg::norm};
use ndarray::{Array1, ArrayView1, Zip};
use rand::{SeedableRng, rngs::StdRng};
use tracing::debug;

use super::{
    Action, AugmentedLagrangian, Config, Direction, Error, Event, Problem, Solution, Status,
    StepRule, Trajectory,
    activation::BoxMap,
    direction::find_direction,
    dual,
    initial::perturbed_gradient,
    step,
};

/// A point reached by stepping the hidden state.
struct Candidate {
    x_hidden: Array1<f64>,
    x: Array1<f64>,
    slack: Array1<f64>,
    objective: f64,
}

pub(super) fn solve<Obs>(problem: &Problem, config: &Config, mut observer: Obs) -> Result<Solution, Error>
where
    Obs: for<'a> Observer<Event<'a>, Action>,
{

    let mut rng = StdRng::seed_from_u64(config.seed());
    let estimate = dual::resolve(problem, &config.dual_ascent());
    let lagrangian = AugmentedLagrangian::new(problem, &estimate.duals);
    let map = problem.box_map(config);
    let smoothness = problem.effective_smoothness_coef();
    let beta = problem.beta().view();

    let slack_dim = problem.ineq().map(|_| problem.slack_dim());
    let mut trace = Trajectory::with_capacity(problem.dim(), slack_dim, config.max_iterations());

    let mut x = problem.x0().clone();
    let mut x_hidden = map.inverse(x.view());
    let mut slack = Array1::zeros(problem.slack_dim());
    let mut objective = lagrangian.value(x.view(), slack.view());
    let mut grad = lagrangian.gradient(x.view(), slack.view());
    if !is_finite(objective, &grad) {
        return Err(Error::NonFiniteObjective { iter: 0 });
    }
    if grad.iter().all(|&g| g == 0.0) {
        grad = perturbed_gradient(problem.dim(), problem.smoothness_coef(), &mut rng);
    }
    trace.record(0, x.view(), x_hidden.view(), objective, slack.view());
    let mut stationarity = stationarity_at(&map, x.view(), grad.view());

    let mut k = 0;
    let status = 'iterate: {
        if problem.is_constrained()
            && observer.observe(&Event::DualAscent { estimate: &estimate })
                == Some(Action::StopEarly)
        {
            break 'iterate Status::StoppedByObserver;
        }

        loop {
            if stationarity < config.precision_stopping_criterion() {
                break 'iterate Status::Converged;
            }
            if k + 1 >= config.max_iterations() {
                break 'iterate Status::MaxIters;
            }

            let direction = find_direction(problem, &map, config, x.view(), grad.view(), &mut rng);
            let sigma = map.proxy_distance(x.view());

            let advance = |alpha: f64| {
                let mut x_hidden = x_hidden.clone();
                x_hidden.scaled_add(alpha, &direction);
                let x = map.activate(x_hidden.view());
                let slack = lagrangian.update_slack(x.view(), slack.view());
                let objective = lagrangian.value(x.view(), slack.view());
                Candidate {
                    x_hidden,
                    x,
                    slack,
                    objective,
                }
            };

            let (alpha, next) = match config.step() {
                StepRule::Classic => {
                    let stochastic = (config.direction() == Direction::Stochastic).then_some(k);
                    let alpha = step::classic(
                        sigma.view(),
                        grad.view(),
                        direction.view(),
                        beta,
                        smoothness,
                        stochastic,
                    );
                    (alpha, advance(alpha))
                }
                StepRule::Armijo => {
                    let slope = (&sigma * &grad).dot(&direction);
                    let initial = norm(grad.view()) / smoothness;
                    step::armijo(initial, objective, slope, |alpha| {
                        let candidate = advance(alpha);
                        (candidate.objective, candidate)
                    })
                }
            };

            Candidate {
                x_hidden,
                x,
                slack,
                objective,
            } = next;
            grad = lagrangian.gradient(x.view(), slack.view());
            k += 1;
            if !is_finite(objective, &grad) {
                return Err(Error::NonFiniteObjective { iter: k });
            }

            if let Some(criterion) = config.absorption_criterion() {
                absorb(&mut x, problem, criterion);
            }

            trace.record(k, x.view(), x_hidden.view(), objective, slack.view());
            trace.record_step(k - 1, alpha);
            stationarity = stationarity_at(&map, x.view(), grad.view());

            let event = Event::Iteration {
                iter: k,
                x: x.view(),
                x_hidden: x_hidden.view(),
                objective,
                step_size: alpha,
                stationarity,
            };
            if observer.observe(&event) == Some(Action::StopEarly) {
                break 'iterate Status::StoppedByObserver;
            }
        }
    };

    debug!(?status, iters = k, stationarity, "hopfield solve finished");

    Ok(Solution {
        status,
        trajectory: trace.trimmed(k + 1),
        duals: estimate.duals,
        dual_status: estimate.status,
        iters: k,
        stationarity,
    })
}

/// `‖∇L ⊙ σ(x)‖`, which vanishes at saturated coordinates.
fn stationarity_at(map: &BoxMap<'_>, x: ArrayView1<'_, f64>, grad: ArrayView1<'_, f64>) -> f64 {
    norm((map.proxy_distance(x) * grad).view())
}

/// Snaps coordinates within `criterion` of a bound onto the bound on the
/// same side of the box midpoint.
fn absorb(x: &mut Array1<f64>, problem: &Problem, criterion: f64) {
    Zip::from(x)
        .and(problem.lb())
        .and(problem.ub())
        .and(problem.midpoint())
        .for_each(|x, &l, &u, &m| {
            if (*x - l).min(u - *x) < criterion {
                *x = if *x < m { l } else { u };
            }
        });
}

fn is_finite(objective: f64, grad: &Array1<f64>) -> bool {
    objective.is_finite() && grad.iter().all(|g| g.is_finite())
}
