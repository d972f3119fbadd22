use thiserror::Error;

use super::Activation;

/// Configuration for the Hopfield solver.
///
/// A `Config` is always valid: build one with [`Config::builder`], which
/// checks every parameter range in [`ConfigBuilder::build`].
///
/// ```
/// use hmip_solvers::hopfield::{Activation, Config, Direction};
///
/// let config = Config::builder()
///     .activation(Activation::Pwl)
///     .direction(Direction::Classic)
///     .max_iterations(1_000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_iterations(), 1_000);
///
/// assert!(Config::builder().gamma(1.5).build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "ConfigBuilder")
)]
pub struct Config {
    activation: Activation,
    gamma: f64,
    theta: f64,
    ascent_stop_criterion: Option<f64>,
    absorption_criterion: Option<f64>,
    max_iterations: usize,
    stopping_criterion: StoppingCriterion,
    direction: Direction,
    step: StepRule,
    initial_ascent: InitialAscent,
    precision_stopping_criterion: f64,
    beta: Beta,
    beta_scope: BetaScope,
    dual_ascent: DualAscentConfig,
    seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        ConfigBuilder::default().assemble()
    }
}

impl Config {
    /// Starts from the default parameters.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Returns a builder holding this config's parameters.
    #[must_use]
    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder {
            activation: self.activation,
            gamma: self.gamma,
            theta: self.theta,
            ascent_stop_criterion: self.ascent_stop_criterion,
            absorption_criterion: self.absorption_criterion,
            max_iterations: self.max_iterations,
            stopping_criterion: self.stopping_criterion,
            direction: self.direction,
            step: self.step,
            initial_ascent: self.initial_ascent,
            precision_stopping_criterion: self.precision_stopping_criterion,
            beta: self.beta.clone(),
            beta_scope: self.beta_scope,
            dual_ascent: self.dual_ascent,
            seed: self.seed,
        }
    }

    #[must_use]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Weight of the binary pull in the blended direction, in `[0, 1]`.
    #[must_use]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Angular slack (radians) between the blended direction and the
    /// boundary-aware descent direction, in `[0, 1]`.
    #[must_use]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Distance from the bounds at which the initial ascent stops.
    #[must_use]
    pub fn ascent_stop_criterion(&self) -> Option<f64> {
        self.ascent_stop_criterion
    }

    /// Distance from a bound within which a coordinate snaps onto it.
    ///
    /// `None` disables absorption and the binary absorption mask.
    #[must_use]
    pub fn absorption_criterion(&self) -> Option<f64> {
        self.absorption_criterion
    }

    /// Maximum number of recorded iterates, including the start point.
    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    #[must_use]
    pub fn stopping_criterion(&self) -> StoppingCriterion {
        self.stopping_criterion
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn step(&self) -> StepRule {
        self.step
    }

    #[must_use]
    pub fn initial_ascent(&self) -> InitialAscent {
        self.initial_ascent
    }

    /// Threshold on `‖∇f ⊙ σ(x)‖` below which the solver has converged.
    #[must_use]
    pub fn precision_stopping_criterion(&self) -> f64 {
        self.precision_stopping_criterion
    }

    #[must_use]
    pub fn beta(&self) -> &Beta {
        &self.beta
    }

    #[must_use]
    pub fn beta_scope(&self) -> BetaScope {
        self.beta_scope
    }

    #[must_use]
    pub fn dual_ascent(&self) -> DualAscentConfig {
        self.dual_ascent
    }

    /// Seed for every random draw made during `setup` and `solve`.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The ascent stop distance actually used by the initial point generator.
    ///
    /// When both criteria are set and the ascent stop does not exceed the
    /// absorption distance, twice the absorption distance is used so the
    /// start point is never absorbed on the first iteration.
    #[must_use]
    pub fn effective_ascent_stop(&self) -> f64 {
        match (self.ascent_stop_criterion, self.absorption_criterion) {
            (Some(ascent), Some(absorption)) if ascent <= absorption => 2.0 * absorption,
            (Some(ascent), _) => ascent,
            (None, _) => 0.0,
        }
    }

    /// Whether absorption, and with it the binary absorption mask, is active.
    #[must_use]
    pub fn absorbs(&self) -> bool {
        self.absorption_criterion.is_some()
    }
}

/// Collects Hopfield solver parameters and validates them into a [`Config`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct ConfigBuilder {
    activation: Activation,
    gamma: f64,
    theta: f64,
    ascent_stop_criterion: Option<f64>,
    absorption_criterion: Option<f64>,
    max_iterations: usize,
    stopping_criterion: StoppingCriterion,
    direction: Direction,
    step: StepRule,
    initial_ascent: InitialAscent,
    precision_stopping_criterion: f64,
    beta: Beta,
    beta_scope: BetaScope,
    dual_ascent: DualAscentConfig,
    seed: u64,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            activation: Activation::Sin,
            gamma: 0.9,
            theta: 0.01,
            ascent_stop_criterion: Some(0.01),
            absorption_criterion: None,
            max_iterations: 500,
            stopping_criterion: StoppingCriterion::Gradient,
            direction: Direction::Binary,
            step: StepRule::Classic,
            initial_ascent: InitialAscent::BinaryNeutralAscent,
            precision_stopping_criterion: 1e-6,
            beta: Beta::default(),
            beta_scope: BetaScope::default(),
            dual_ascent: DualAscentConfig::default(),
            seed: 0,
        }
    }
}

macro_rules! setters {
    ($($field:ident: $ty:ty),+ $(,)?) => {
        $(
            #[must_use]
            pub fn $field(mut self, $field: $ty) -> Self {
                self.$field = $field;
                self
            }
        )+
    };
}

impl ConfigBuilder {
    setters! {
        activation: Activation,
        gamma: f64,
        theta: f64,
        ascent_stop_criterion: Option<f64>,
        absorption_criterion: Option<f64>,
        max_iterations: usize,
        stopping_criterion: StoppingCriterion,
        direction: Direction,
        step: StepRule,
        initial_ascent: InitialAscent,
        precision_stopping_criterion: f64,
        beta: Beta,
        beta_scope: BetaScope,
        dual_ascent: DualAscentConfig,
        seed: u64,
    }

    /// Validates parameter ranges and creates the config.
    ///
    /// # Errors
    ///
    /// Returns the first invalid parameter found.
    pub fn build(self) -> Result<Config, ConfigError> {
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::Gamma);
        }
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(ConfigError::Theta);
        }
        if self.ascent_stop_criterion.is_some_and(|v| !non_negative(v)) {
            return Err(ConfigError::AscentStop);
        }
        if self.absorption_criterion.is_some_and(|v| !non_negative(v)) {
            return Err(ConfigError::Absorption);
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::MaxIterations);
        }
        if !positive(self.precision_stopping_criterion) {
            return Err(ConfigError::Precision);
        }
        match &self.beta {
            Beta::Scalar(b) if !positive(*b) => return Err(ConfigError::Beta),
            Beta::PerCoordinate(bs) if !bs.iter().copied().all(positive) => {
                return Err(ConfigError::Beta);
            }
            _ => {}
        }
        Ok(self.assemble())
    }

    fn assemble(self) -> Config {
        Config {
            activation: self.activation,
            gamma: self.gamma,
            theta: self.theta,
            ascent_stop_criterion: self.ascent_stop_criterion,
            absorption_criterion: self.absorption_criterion,
            max_iterations: self.max_iterations,
            stopping_criterion: self.stopping_criterion,
            direction: self.direction,
            step: self.step,
            initial_ascent: self.initial_ascent,
            precision_stopping_criterion: self.precision_stopping_criterion,
            beta: self.beta,
            beta_scope: self.beta_scope,
            dual_ascent: self.dual_ascent,
            seed: self.seed,
        }
    }
}

impl TryFrom<ConfigBuilder> for Config {
    type Error = ConfigError;

    fn try_from(builder: ConfigBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

/// Settings for the dual-variable estimate computed before the main loop.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "DualAscentFields")
)]
pub struct DualAscentConfig {
    tolerance: f64,
    max_outer_iterations: usize,
    max_inner_iterations: usize,
    step_decay: f64,
    initial_dual: f64,
}

impl Default for DualAscentConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_outer_iterations: 100,
            max_inner_iterations: 10_000,
            step_decay: 0.9,
            initial_dual: 1.0,
        }
    }
}

impl DualAscentConfig {
    /// Creates a new dual ascent config with validated parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the tolerance is not positive, either iteration
    /// cap is zero, the step decay lies outside `(0, 1]`, or the initial dual
    /// is non-finite.
    pub fn new(
        tolerance: f64,
        max_outer_iterations: usize,
        max_inner_iterations: usize,
        step_decay: f64,
        initial_dual: f64,
    ) -> Result<Self, ConfigError> {
        if !positive(tolerance) {
            return Err(ConfigError::DualTolerance);
        }
        if max_outer_iterations == 0 || max_inner_iterations == 0 {
            return Err(ConfigError::DualIterations);
        }
        if !(step_decay > 0.0 && step_decay <= 1.0) {
            return Err(ConfigError::DualDecay);
        }
        if !initial_dual.is_finite() {
            return Err(ConfigError::InitialDual);
        }

        Ok(Self {
            tolerance,
            max_outer_iterations,
            max_inner_iterations,
            step_decay,
            initial_dual,
        })
    }

    /// Threshold on the projected gradient (inner loop) and on the dual
    /// change (outer loop).
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    #[must_use]
    pub fn max_outer_iterations(&self) -> usize {
        self.max_outer_iterations
    }

    #[must_use]
    pub fn max_inner_iterations(&self) -> usize {
        self.max_inner_iterations
    }

    /// Geometric decay applied to the dual step coefficients, in `(0, 1]`.
    #[must_use]
    pub fn step_decay(&self) -> f64 {
        self.step_decay
    }

    /// Starting value of every dual variable.
    #[must_use]
    pub fn initial_dual(&self) -> f64 {
        self.initial_dual
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(default)]
struct DualAscentFields {
    tolerance: f64,
    max_outer_iterations: usize,
    max_inner_iterations: usize,
    step_decay: f64,
    initial_dual: f64,
}

#[cfg(feature = "serde")]
impl Default for DualAscentFields {
    fn default() -> Self {
        let DualAscentConfig {
            tolerance,
            max_outer_iterations,
            max_inner_iterations,
            step_decay,
            initial_dual,
        } = DualAscentConfig::default();
        Self {
            tolerance,
            max_outer_iterations,
            max_inner_iterations,
            step_decay,
            initial_dual,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<DualAscentFields> for DualAscentConfig {
    type Error = ConfigError;

    fn try_from(fields: DualAscentFields) -> Result<Self, Self::Error> {
        Self::new(
            fields.tolerance,
            fields.max_outer_iterations,
            fields.max_inner_iterations,
            fields.step_decay,
            fields.initial_dual,
        )
    }
}

/// Per-coordinate activation sharpness.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum Beta {
    /// One value, broadcast according to [`BetaScope`].
    Scalar(f64),

    /// One value per coordinate, used as-is.
    PerCoordinate(Vec<f64>),
}

impl Default for Beta {
    fn default() -> Self {
        Self::Scalar(1.0)
    }
}

/// Which coordinates receive a scalar [`Beta`]; the rest get `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum BetaScope {
    /// Continuous coordinates get β, binary coordinates get 1.
    #[default]
    ContinuousOnly,

    /// Binary coordinates get β, continuous coordinates get 1.
    BinaryOnly,

    /// Every coordinate gets β.
    All,
}

/// How the search direction is chosen each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Direction {
    /// Negative gradient.
    Classic,

    /// Negative gradient with random per-coordinate factors.
    Stochastic,

    /// Blend of a sign-based pull toward the nearest bound and the gradient.
    #[default]
    Binary,

    /// Blend of an activation-based pull toward the nearest bound and the gradient.
    SoftBinary,
}

/// How the step size along the direction is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum StepRule {
    /// Closed-form rule from the smoothness coefficient and proxy distance.
    #[default]
    Classic,

    /// Backtracking line search with a sufficient-decrease test.
    Armijo,
}

/// How the start point is pushed away from flat regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum InitialAscent {
    /// Gradient ascent on every coordinate.
    Ascent,

    /// Gradient ascent with binary coordinates held at the box midpoint.
    #[default]
    BinaryNeutralAscent,
}

/// When the main loop declares convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum StoppingCriterion {
    /// `‖∇f ⊙ σ(x)‖` below `precision_stopping_criterion`.
    #[default]
    Gradient,
}

/// Errors that can occur when validating a Hopfield solver config.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown activation type `{0}`")]
    UnknownActivation(String),

    #[error("unknown direction type `{0}`")]
    UnknownDirection(String),

    #[error("unknown step type `{0}`")]
    UnknownStepRule(String),

    #[error("unknown initial ascent type `{0}`")]
    UnknownInitialAscent(String),

    #[error("unknown stopping criterion type `{0}`")]
    UnknownStoppingCriterion(String),

    #[error("unknown beta scope `{0}`")]
    UnknownBetaScope(String),

    #[error("gamma must lie in [0, 1]")]
    Gamma,

    #[error("theta must lie in [0, 1]")]
    Theta,

    #[error("ascent_stop_criterion must be finite and non-negative")]
    AscentStop,

    #[error("absorption_criterion must be finite and non-negative")]
    Absorption,

    #[error("max_iterations must be at least 1")]
    MaxIterations,

    #[error("precision_stopping_criterion must be finite and positive")]
    Precision,

    #[error("beta must be finite and positive")]
    Beta,

    #[error("dual ascent tolerance must be finite and positive")]
    DualTolerance,

    #[error("dual ascent iteration caps must be at least 1")]
    DualIterations,

    #[error("dual ascent step decay must lie in (0, 1]")]
    DualDecay,

    #[error("initial dual value must be finite")]
    InitialDual,
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

macro_rules! config_names {
    ($ty:ident, $err:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// The configuration name of this variant.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(ConfigError::$err(other.to_owned())),
                }
            }
        }
    };
}

config_names!(Direction, UnknownDirection {
    Classic => "classic",
    Stochastic => "stochastic",
    Binary => "binary",
    SoftBinary => "soft_binary",
});

config_names!(StepRule, UnknownStepRule {
    Classic => "classic",
    Armijo => "armijo",
});

config_names!(InitialAscent, UnknownInitialAscent {
    Ascent => "ascent",
    BinaryNeutralAscent => "binary_neutral_ascent",
});

config_names!(StoppingCriterion, UnknownStoppingCriterion {
    Gradient => "gradient",
});

config_names!(BetaScope, UnknownBetaScope {
    ContinuousOnly => "continuous_only",
    BinaryOnly => "binary_only",
    All => "all",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_builds() {
        assert_eq!(Config::builder().build(), Ok(Config::default()));
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let cases = [
            (Config::builder().gamma(1.5), ConfigError::Gamma),
            (Config::builder().theta(-0.1), ConfigError::Theta),
            (Config::builder().ascent_stop_criterion(Some(f64::NAN)), ConfigError::AscentStop),
            (Config::builder().absorption_criterion(Some(-1.0)), ConfigError::Absorption),
            (Config::builder().max_iterations(0), ConfigError::MaxIterations),
            (Config::builder().precision_stopping_criterion(0.0), ConfigError::Precision),
            (Config::builder().beta(Beta::Scalar(0.0)), ConfigError::Beta),
            (Config::builder().beta(Beta::PerCoordinate(vec![1.0, -2.0])), ConfigError::Beta),
        ];

        for (builder, expected) in cases {
            assert_eq!(builder.build(), Err(expected));
        }
    }

    #[test]
    fn rejects_bad_dual_ascent_settings() {
        assert_eq!(
            DualAscentConfig::new(1e-3, 100, 100, 0.0, 1.0),
            Err(ConfigError::DualDecay)
        );
        assert_eq!(
            DualAscentConfig::new(1e-3, 0, 100, 0.9, 1.0),
            Err(ConfigError::DualIterations)
        );
        assert_eq!(
            DualAscentConfig::new(0.0, 100, 100, 0.9, 1.0),
            Err(ConfigError::DualTolerance)
        );
        assert_eq!(
            DualAscentConfig::new(1e-3, 100, 100, 0.9, f64::INFINITY),
            Err(ConfigError::InitialDual)
        );
    }

    #[test]
    fn builder_round_trips_a_config() {
        let config = Config::builder().seed(7).step(StepRule::Armijo).build().unwrap();
        assert_eq!(config.to_builder().build(), Ok(config));
    }

    #[test]
    fn ascent_stop_adapts_to_absorption() {
        let config = Config::builder()
            .ascent_stop_criterion(Some(0.01))
            .absorption_criterion(Some(0.1))
            .build()
            .unwrap();
        assert_eq!(config.effective_ascent_stop(), 0.2);

        let config = Config::builder()
            .ascent_stop_criterion(Some(0.3))
            .absorption_criterion(Some(0.1))
            .build()
            .unwrap();
        assert_eq!(config.effective_ascent_stop(), 0.3);

        let config = Config::builder().ascent_stop_criterion(None).build().unwrap();
        assert_eq!(config.effective_ascent_stop(), 0.0);
    }

    #[test]
    fn names_round_trip() {
        for direction in [
            Direction::Classic,
            Direction::Stochastic,
            Direction::Binary,
            Direction::SoftBinary,
        ] {
            assert_eq!(direction.name().parse::<Direction>(), Ok(direction));
        }
        assert_eq!("armijo".parse::<StepRule>(), Ok(StepRule::Armijo));
        assert_eq!(
            "binary_neutral_ascent".parse::<InitialAscent>(),
            Ok(InitialAscent::BinaryNeutralAscent)
        );
        assert_eq!("gradient".parse::<StoppingCriterion>(), Ok(StoppingCriterion::Gradient));
        assert_eq!("all".parse::<BetaScope>(), Ok(BetaScope::All));
    }

    #[test]
    fn unknown_names_are_config_errors() {
        assert_eq!(
            "newton".parse::<Direction>(),
            Err(ConfigError::UnknownDirection("newton".into()))
        );
        assert_eq!(
            "wolfe".parse::<StepRule>(),
            Err(ConfigError::UnknownStepRule("wolfe".into()))
        );
        assert_eq!(
            "descent".parse::<InitialAscent>(),
            Err(ConfigError::UnknownInitialAscent("descent".into()))
        );
        assert_eq!(
            "objective".parse::<StoppingCriterion>(),
            Err(ConfigError::UnknownStoppingCriterion("objective".into()))
        );
    }
}
