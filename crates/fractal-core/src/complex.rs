use std::fmt;
use std::ops::{Add, Mul, Sub};

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A complex number in Cartesian form.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Complex = Complex::new(0.0, 0.0);
    pub const ONE: Complex = Complex::new(1.0, 0.0);

    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn from_polar(modulus: f64, argument: f64) -> Self {
        Self::new(modulus * argument.cos(), modulus * argument.sin())
    }

    pub fn modulus(self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Angle in `(-π, π]`, `0` for the origin.
    pub fn argument(self) -> f64 {
        self.im.atan2(self.re)
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.re * factor, self.im * factor)
    }

    pub fn is_zero(self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }
}

impl Add for Complex {
    type Output = Complex;
    fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex {
    type Output = Complex;
    fn sub(self, rhs: Complex) -> Complex {
        Complex::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Complex;
    fn mul(self, rhs: Complex) -> Complex {
        Complex::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl From<Complex> for DVec2 {
    fn from(c: Complex) -> DVec2 {
        DVec2::new(c.re, c.im)
    }
}

impl From<DVec2> for Complex {
    fn from(v: DVec2) -> Complex {
        Complex::new(v.x, v.y)
    }
}

impl fmt::Display for Complex {
    /// `3`, `2i`, `-i`, or `(1.5 - 2i)` when both parts are present.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.re == 0.0, self.im == 0.0) {
            (_, true) => write!(f, "{}", self.re),
            (true, false) => write!(f, "{}", Imaginary(self.im)),
            (false, false) => {
                let sign = if self.im < 0.0 { '-' } else { '+' };
                write!(f, "({} {} {})", self.re, sign, Imaginary(self.im.abs()))
            }
        }
    }
}

struct Imaginary(f64);

impl fmt::Display for Imaginary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            v if v == 1.0 => write!(f, "i"),
            v if v == -1.0 => write!(f, "-i"),
            v => write!(f, "{v}i"),
        }
    }
}
