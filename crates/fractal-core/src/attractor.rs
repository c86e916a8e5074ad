use fastrand::Rng;
use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::utils::{random_float, round_to_significant};

/// Colour in HSV space, every channel in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Hsv {
    pub hue: f64,
    pub saturation: f64,
    pub value: f64,
}

impl Hsv {
    pub const BLACK: Hsv = Hsv::new(0.0, 0.0, 0.0);

    pub const fn new(hue: f64, saturation: f64, value: f64) -> Self {
        Self { hue, saturation, value }
    }

    pub fn random(rng: &mut Rng) -> Self {
        Self::new(
            round_to_significant(rng.f64(), 3),
            round_to_significant(random_float(rng, 0.5, 1.0), 3),
            round_to_significant(random_float(rng, 0.6, 1.0), 3),
        )
    }
}

/// Colour rule for points whose orbit settles near `coordinates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attractor {
    pub coordinates: Complex,
    pub colour: Hsv,
    /// Dim the colour the more iterations an orbit needed.
    pub darkening: bool,
}

impl Attractor {
    pub fn new(coordinates: Complex, colour: Hsv, darkening: bool) -> Self {
        Self {
            coordinates,
            colour,
            darkening,
        }
    }

    /// Random attractor whose coordinates fall in the disk `|z| <= extent`.
    pub fn random(rng: &mut Rng, extent: f64) -> Self {
        let point = Complex::from_polar(
            extent * rng.f64().sqrt(),
            random_float(rng, -std::f64::consts::PI, std::f64::consts::PI),
        );
        let coordinates = Complex::new(
            round_to_significant(point.re, 3),
            round_to_significant(point.im, 3),
        );
        Self::new(coordinates, Hsv::random(rng), rng.bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_attractors_stay_in_the_disk() {
        let mut rng = Rng::with_seed(11);
        for _ in 0..500 {
            let attractor = Attractor::random(&mut rng, 1.5);
            // 3-digit rounding may nudge a point just past the rim.
            assert!(attractor.coordinates.modulus() <= 1.51, "{:?}", attractor.coordinates);
        }
    }

    #[test]
    fn random_colours_are_in_range() {
        let mut rng = Rng::with_seed(3);
        for _ in 0..200 {
            let Hsv { hue, saturation, value } = Hsv::random(&mut rng);
            assert!((0.0..=1.0).contains(&hue));
            assert!((0.5..=1.0).contains(&saturation));
            assert!((0.6..=1.0).contains(&value));
        }
    }
}
