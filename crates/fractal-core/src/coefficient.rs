//! Polynomial coefficients: a constant complex number or a point travelling
//! along a closed trajectory.
//!
//! Every variant reduces to the same six-number ellipse parameterisation
//! `(duration_ms, rotation, half_extent_1, half_extent_2, centre_modulus,
//! centre_argument)`, which is what the GPU evaluates each frame:
//!
//! ```text
//! phase = 2π · fract(t / duration)          (0 when duration == 0)
//! point = centre + R(rotation) · (h1·cos phase, h2·sin phase)
//! ```

use std::fmt;
use std::ops::Range;

use fastrand::Rng;
use glam::DVec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::complex::Complex;
use crate::utils::{random_in, round_to_significant};

/// `(duration_ms, rotation, half_extent_1, half_extent_2, centre_modulus, centre_argument)`
pub type EllipseParameters = [f64; 6];

// ---------------------------------------------------------------------------
// Trajectories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub centre: Complex,
    pub radius: f64,
    pub duration_ms: f64,
}

/// Back-and-forth motion between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub start: Complex,
    pub end: Complex,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ellipse {
    pub centre: Complex,
    pub semi_axis_1: f64,
    pub semi_axis_2: f64,
    /// Radians, counter-clockwise from the real axis.
    pub rotation: f64,
    pub duration_ms: f64,
}

// ---------------------------------------------------------------------------
// Coefficient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Coefficient {
    #[serde(rename = "complex")]
    Constant(Complex),
    Circle(Circle),
    Line(Line),
    Ellipse(Ellipse),
}

/// Variant selector for random generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoefficientKind {
    Constant,
    Circle,
    Line,
    Ellipse,
}

impl CoefficientKind {
    pub const ALL: [CoefficientKind; 4] = [
        CoefficientKind::Constant,
        CoefficientKind::Circle,
        CoefficientKind::Line,
        CoefficientKind::Ellipse,
    ];
}

/// Sampling range for every numeric field a coefficient variant can have.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientRanges {
    pub real: Range<f64>,
    pub imaginary: Range<f64>,
    pub radius: Range<f64>,
    pub rotation: Range<f64>,
    pub duration_ms: Range<f64>,
    /// Sampled values are rounded to this many significant digits.
    pub significant_digits: u32,
}

impl Default for CoefficientRanges {
    fn default() -> Self {
        Self {
            real: -1.0..1.0,
            imaginary: -1.0..1.0,
            radius: 0.05..0.5,
            rotation: 0.0..std::f64::consts::PI,
            duration_ms: 5_000.0..30_000.0,
            significant_digits: 3,
        }
    }
}

impl Coefficient {
    pub fn constant(re: f64, im: f64) -> Self {
        Coefficient::Constant(Complex::new(re, im))
    }

    /// True when every point of the coefficient is `0`.
    pub fn is_zero(&self) -> bool {
        match self {
            Coefficient::Constant(v) => v.is_zero(),
            Coefficient::Circle(c) => c.centre.is_zero() && c.radius == 0.0,
            Coefficient::Line(l) => l.start.is_zero() && l.end.is_zero(),
            Coefficient::Ellipse(e) => {
                e.centre.is_zero() && e.semi_axis_1 == 0.0 && e.semi_axis_2 == 0.0
            }
        }
    }

    /// Whether an equation should print this coefficient as `- |c|`.
    ///
    /// Only constants on the non-positive real or imaginary axis qualify,
    /// zero included; trajectories are always printed as-is.
    pub fn has_minus(&self) -> bool {
        match self {
            Coefficient::Constant(v) => {
                (v.im == 0.0 && v.re <= 0.0) || (v.re == 0.0 && v.im <= 0.0)
            }
            Coefficient::Circle(_) | Coefficient::Line(_) | Coefficient::Ellipse(_) => false,
        }
    }

    /// The same variant with every point multiplied by `factor`.
    pub fn multiplied_by(&self, factor: f64) -> Coefficient {
        match self {
            Coefficient::Constant(v) => Coefficient::Constant(v.scaled(factor)),
            Coefficient::Circle(c) => Coefficient::Circle(Circle {
                centre: c.centre.scaled(factor),
                radius: c.radius * factor.abs(),
                duration_ms: c.duration_ms,
            }),
            Coefficient::Line(l) => Coefficient::Line(Line {
                start: l.start.scaled(factor),
                end: l.end.scaled(factor),
                duration_ms: l.duration_ms,
            }),
            Coefficient::Ellipse(e) => Coefficient::Ellipse(Ellipse {
                centre: e.centre.scaled(factor),
                semi_axis_1: e.semi_axis_1 * factor.abs(),
                semi_axis_2: e.semi_axis_2 * factor.abs(),
                rotation: e.rotation,
                duration_ms: e.duration_ms,
            }),
        }
    }

    pub fn ellipse_parameters(&self) -> EllipseParameters {
        match self {
            Coefficient::Constant(v) => [0.0, 0.0, 0.0, 0.0, v.modulus(), v.argument()],
            Coefficient::Circle(c) => [
                c.duration_ms,
                0.0,
                c.radius,
                c.radius,
                c.centre.modulus(),
                c.centre.argument(),
            ],
            Coefficient::Line(l) => {
                let start = DVec2::from(l.start);
                let end = DVec2::from(l.end);
                let half = (end - start) * 0.5;
                let mid = Complex::from((start + end) * 0.5);
                [
                    l.duration_ms,
                    half.y.atan2(half.x),
                    half.length(),
                    0.0,
                    mid.modulus(),
                    mid.argument(),
                ]
            }
            Coefficient::Ellipse(e) => [
                e.duration_ms,
                e.rotation,
                e.semi_axis_1,
                e.semi_axis_2,
                e.centre.modulus(),
                e.centre.argument(),
            ],
        }
    }

    pub fn copy(&self) -> Coefficient {
        self.clone()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// `None` when `json` is not a well-formed coefficient.
    pub fn from_json(json: &Value) -> Option<Coefficient> {
        Coefficient::deserialize(json).ok()
    }

    /// Sample a coefficient of the given variant, each field drawn from its
    /// range in `ranges`.
    pub fn random(rng: &mut Rng, kind: CoefficientKind, ranges: &CoefficientRanges) -> Coefficient {
        let digits = ranges.significant_digits;
        let mut sample = |range: &Range<f64>| round_to_significant(random_in(rng, range), digits);
        match kind {
            CoefficientKind::Constant => {
                Coefficient::constant(sample(&ranges.real), sample(&ranges.imaginary))
            }
            CoefficientKind::Circle => Coefficient::Circle(Circle {
                centre: Complex::new(sample(&ranges.real), sample(&ranges.imaginary)),
                radius: sample(&ranges.radius),
                duration_ms: sample(&ranges.duration_ms),
            }),
            CoefficientKind::Line => Coefficient::Line(Line {
                start: Complex::new(sample(&ranges.real), sample(&ranges.imaginary)),
                end: Complex::new(sample(&ranges.real), sample(&ranges.imaginary)),
                duration_ms: sample(&ranges.duration_ms),
            }),
            CoefficientKind::Ellipse => Coefficient::Ellipse(Ellipse {
                centre: Complex::new(sample(&ranges.real), sample(&ranges.imaginary)),
                semi_axis_1: sample(&ranges.radius),
                semi_axis_2: sample(&ranges.radius),
                rotation: sample(&ranges.rotation),
                duration_ms: sample(&ranges.duration_ms),
            }),
        }
    }

    /// Variant drawn uniformly from `kinds` (constants when `kinds` is empty).
    pub fn random_of(rng: &mut Rng, kinds: &[CoefficientKind], ranges: &CoefficientRanges) -> Coefficient {
        let kind = if kinds.is_empty() {
            CoefficientKind::Constant
        } else {
            kinds[rng.usize(..kinds.len())]
        };
        Coefficient::random(rng, kind, ranges)
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coefficient::Constant(v) => write!(f, "{v}"),
            Coefficient::Circle(c) => write!(f, "circle({}, {})", c.centre, c.radius),
            Coefficient::Line(l) => write!(f, "line({}, {})", l.start, l.end),
            Coefficient::Ellipse(e) => write!(
                f,
                "ellipse({}, {}, {}, {})",
                e.centre, e.semi_axis_1, e.semi_axis_2, e.rotation
            ),
        }
    }
}
