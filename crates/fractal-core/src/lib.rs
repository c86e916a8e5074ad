//! Math model for animated Julia/Fatou fractals: time-varying coefficients,
//! sparse polynomials, numerator/denominator functions and the
//! configuration handed to the GPU generator.

pub mod attractor;
pub mod coefficient;
pub mod complex;
pub mod configuration;
pub mod function;
pub mod polynomial;
pub mod utils;

pub use attractor::{Attractor, Hsv};
pub use coefficient::{Circle, Coefficient, CoefficientKind, CoefficientRanges, Ellipse, EllipseParameters, Line};
pub use complex::Complex;
pub use configuration::{Configuration, MAX_ATTRACTORS};
pub use function::{FractalFunction, FunctionError, FunctionKind, RandomFunctionOptions};
pub use polynomial::{Polynomial, RangeError, COEFFICIENT_SLOTS, MAX_DEGREE};
