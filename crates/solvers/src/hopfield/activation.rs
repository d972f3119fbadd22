use std::{
    f64::consts::{FRAC_PI_4, LN_2},
    fmt,
    str::FromStr,
};

use ndarray::{Array1, ArrayView1, Zip};

use super::ConfigError;

/// The squashing function that maps a hidden state into the box.
///
/// Every kind operates elementwise on a normalized coordinate
/// `z = (x − lb) / (ub − lb)` with a per-coordinate sharpness `β > 0`, and
/// provides three paired maps (see [`ActivationFns`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Activation {
    /// Piecewise linear: `clip(β(z − ½) + ½, 0, 1)`.
    Pwl,

    /// Two-sided exponential saturation around `z = ½`.
    Exp,

    /// Sine ramp over the window `|z − ½| ≤ π / (4β)`.
    #[default]
    Sin,

    /// Hyperbolic tangent: `½(tanh(2β(z − ½)) + 1)`.
    Tanh,

    /// No squashing; the proxy distance is identically zero.
    Identity,
}

/// The three scalar maps of one activation kind.
#[derive(Debug, Clone, Copy)]
pub struct ActivationFns {
    /// Hidden coordinate to box coordinate, both normalized.
    pub activate: fn(f64, f64) -> f64,

    /// One-sided inverse of `activate`, clamped outside `[0, 1]`.
    pub inverse: fn(f64, f64) -> f64,

    /// Derivative-like weight that vanishes at saturated coordinates.
    pub proxy_distance: fn(f64, f64) -> f64,
}

impl Activation {
    /// Every activation kind.
    pub const ALL: [Self; 5] = [Self::Pwl, Self::Exp, Self::Sin, Self::Tanh, Self::Identity];

    /// Returns the function table for this kind.
    #[must_use]
    pub fn functions(self) -> ActivationFns {
        match self {
            Self::Pwl => ActivationFns {
                activate: pwl::activate,
                inverse: pwl::inverse,
                proxy_distance: pwl::proxy_distance,
            },
            Self::Exp => ActivationFns {
                activate: exp::activate,
                inverse: exp::inverse,
                proxy_distance: exp::proxy_distance,
            },
            Self::Sin => ActivationFns {
                activate: sin::activate,
                inverse: sin::inverse,
                proxy_distance: sin::proxy_distance,
            },
            Self::Tanh => ActivationFns {
                activate: tanh::activate,
                inverse: tanh::inverse,
                proxy_distance: tanh::proxy_distance,
            },
            Self::Identity => ActivationFns {
                activate: identity::activate,
                inverse: identity::inverse,
                proxy_distance: identity::proxy_distance,
            },
        }
    }

    /// The configuration name of this kind.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Pwl => "pwl",
            Self::Exp => "exp",
            Self::Sin => "sin",
            Self::Tanh => "tanh",
            Self::Identity => "identity",
        }
    }

    /// Applies `activate` elementwise on normalized coordinates.
    #[must_use]
    pub fn activate(self, z: ArrayView1<'_, f64>, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        let activate = self.functions().activate;
        Zip::from(z).and(beta).map_collect(|&z, &b| activate(z, b))
    }

    /// Applies `inverse` elementwise on normalized coordinates.
    #[must_use]
    pub fn inverse(self, z: ArrayView1<'_, f64>, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        let inverse = self.functions().inverse;
        Zip::from(z).and(beta).map_collect(|&z, &b| inverse(z, b))
    }

    /// Applies `proxy_distance` elementwise on normalized coordinates.
    #[must_use]
    pub fn proxy_distance(self, z: ArrayView1<'_, f64>, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        let proxy = self.functions().proxy_distance;
        Zip::from(z).and(beta).map_collect(|&z, &b| proxy(z, b))
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConfigError::UnknownActivation(s.to_owned()))
    }
}

/// Activation maps lifted from normalized coordinates onto a box.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoxMap<'a> {
    fns: ActivationFns,
    lb: ArrayView1<'a, f64>,
    ub: ArrayView1<'a, f64>,
    beta: ArrayView1<'a, f64>,
}

impl<'a> BoxMap<'a> {
    pub(crate) fn new(
        activation: Activation,
        lb: ArrayView1<'a, f64>,
        ub: ArrayView1<'a, f64>,
        beta: ArrayView1<'a, f64>,
    ) -> Self {
        Self {
            fns: activation.functions(),
            lb,
            ub,
            beta,
        }
    }

    /// Maps a hidden state into the box: `lb + (ub − lb)·activate(z)`.
    pub(crate) fn activate(&self, x_hidden: ArrayView1<'_, f64>) -> Array1<f64> {
        self.lift(x_hidden, self.fns.activate)
    }

    /// Maps a box point to a hidden state: `lb + (ub − lb)·inverse(z)`.
    pub(crate) fn inverse(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self.lift(x, self.fns.inverse)
    }

    /// Proxy distance vector at a box point.
    pub(crate) fn proxy_distance(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        let proxy = self.fns.proxy_distance;
        Zip::from(x)
            .and(self.lb)
            .and(self.ub)
            .and(self.beta)
            .map_collect(|&xi, &l, &u, &b| proxy((xi - l) / (u - l), b))
    }

    fn lift(&self, v: ArrayView1<'_, f64>, map: fn(f64, f64) -> f64) -> Array1<f64> {
        Zip::from(v)
            .and(self.lb)
            .and(self.ub)
            .and(self.beta)
            .map_collect(|&vi, &l, &u, &b| l + (u - l) * map((vi - l) / (u - l), b))
    }
}

mod pwl {
    pub(super) fn activate(z: f64, beta: f64) -> f64 {
        (beta * (z - 0.5) + 0.5).clamp(0.0, 1.0)
    }

    /// Clamps to 0 below the box and 1 above it, but maps the closed unit
    /// interval through the formula, so `inverse(0) = ½ − 1/(2β)`.
    pub(super) fn inverse(z: f64, beta: f64) -> f64 {
        if (0.0..=1.0).contains(&z) {
            (z - 0.5) / beta + 0.5
        } else if z < 0.0 {
            0.0
        } else {
            1.0
        }
    }

    pub(super) fn proxy_distance(z: f64, beta: f64) -> f64 {
        if 0.0 < z && z < 1.0 { beta } else { 0.0 }
    }
}

mod sin {
    use super::FRAC_PI_4;

    pub(super) fn activate(z: f64, beta: f64) -> f64 {
        let half_window = FRAC_PI_4 / beta;
        if z > 0.5 + half_window {
            1.0
        } else if z < 0.5 - half_window {
            0.0
        } else {
            0.5 * (2.0 * beta * (z - 0.5)).sin() + 0.5
        }
    }

    pub(super) fn inverse(z: f64, beta: f64) -> f64 {
        if (0.0..=1.0).contains(&z) {
            (2.0 * z - 1.0).asin() / (2.0 * beta) + 0.5
        } else if z < 0.0 {
            0.0
        } else {
            1.0
        }
    }

    /// Round-off can push `z` just outside `[0, 1]`; clamp before the roots.
    pub(super) fn proxy_distance(z: f64, beta: f64) -> f64 {
        let z = z.clamp(0.0, 1.0);
        2.0 * beta * z.sqrt() * (1.0 - z).sqrt()
    }
}

mod exp {
    use super::LN_2;

    pub(super) fn activate(z: f64, beta: f64) -> f64 {
        if z > 0.5 {
            1.0 - (2.0 * beta * (0.5 - z) - LN_2).exp()
        } else {
            (2.0 * beta * (z - 0.5) - LN_2).exp()
        }
    }

    pub(super) fn inverse(z: f64, beta: f64) -> f64 {
        if z <= 0.0 {
            0.0
        } else if z >= 1.0 {
            1.0
        } else if z < 0.5 {
            0.5 + (2.0 * z).ln() / (2.0 * beta)
        } else {
            0.5 - (2.0 * (1.0 - z)).ln() / (2.0 * beta)
        }
    }

    pub(super) fn proxy_distance(z: f64, beta: f64) -> f64 {
        let z = z.clamp(0.0, 1.0);
        beta * z.min(1.0 - z)
    }
}

mod tanh {
    pub(super) fn activate(z: f64, beta: f64) -> f64 {
        0.5 * ((2.0 * beta * (z - 0.5)).tanh() + 1.0)
    }

    pub(super) fn inverse(z: f64, beta: f64) -> f64 {
        if z <= 0.0 {
            0.0
        } else if z >= 1.0 {
            1.0
        } else {
            (2.0 * z - 1.0).atanh() / (2.0 * beta) + 0.5
        }
    }

    pub(super) fn proxy_distance(z: f64, beta: f64) -> f64 {
        let z = z.clamp(0.0, 1.0);
        4.0 * beta * z * (1.0 - z)
    }
}

mod identity {
    pub(super) fn activate(z: f64, _beta: f64) -> f64 {
        z
    }

    pub(super) fn inverse(z: f64, _beta: f64) -> f64 {
        z
    }

    pub(super) fn proxy_distance(_z: f64, _beta: f64) -> f64 {
        0.0
    }
}
