use fastrand::Rng;
use serde::{Deserialize, Serialize};

use crate::attractor::{Attractor, Hsv};
use crate::coefficient::{Circle, Coefficient};
use crate::complex::Complex;
use crate::function::{FractalFunction, FunctionKind, RandomFunctionOptions};
use crate::polynomial::{Polynomial, COEFFICIENT_SLOTS};

/// Upper bound on `Configuration::attractors` honoured by the GPU encoder.
pub const MAX_ATTRACTORS: usize = COEFFICIENT_SLOTS;

/// Everything needed to render one animated fractal.
///
/// Hand a clone to anything that mutates it while another owner is still
/// generating from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub id: String,
    pub name: String,
    /// Canvas resolution relative to the surface size.
    pub resolution_scale: f64,
    /// Half the visible height, in complex-plane units.
    pub coordinates_scale: f64,
    pub coordinates_centre: Complex,
    pub iterations: u32,
    /// Convergence threshold between successive iterates.
    pub epsilon: f64,
    /// Divergence threshold on `|z|`.
    pub bound: f64,
    pub function: FractalFunction,
    pub julia_hsv: Hsv,
    pub default_attractor: Attractor,
    pub infinity_attractor: Attractor,
    pub attractors: Vec<Attractor>,
}

impl Configuration {
    /// Quadratic Julia set whose constant term circles the origin.
    pub fn default_configuration() -> Self {
        let numerator = Polynomial::from_terms([
            (2, Coefficient::Constant(Complex::ONE)),
            (
                0,
                Coefficient::Circle(Circle {
                    centre: Complex::ZERO,
                    radius: 0.7885,
                    duration_ms: 30_000.0,
                }),
            ),
        ])
        .unwrap_or_default();

        Self {
            id: "default".into(),
            name: "Default".into(),
            resolution_scale: 1.0,
            coordinates_scale: 1.5,
            coordinates_centre: Complex::ZERO,
            iterations: 200,
            epsilon: 1e-6,
            bound: 10.0,
            function: FractalFunction::default_function(numerator),
            julia_hsv: Hsv::new(0.6, 0.7, 0.9),
            default_attractor: Attractor::new(Complex::ZERO, Hsv::BLACK, false),
            infinity_attractor: Attractor::new(Complex::ZERO, Hsv::new(0.08, 0.9, 1.0), true),
            attractors: Vec::new(),
        }
    }

    /// `z ↦ z` with no attractors.
    pub fn empty_configuration() -> Self {
        Self {
            id: "empty".into(),
            name: "Empty".into(),
            resolution_scale: 1.0,
            coordinates_scale: 1.0,
            coordinates_centre: Complex::ZERO,
            iterations: 100,
            epsilon: 1e-6,
            bound: 10.0,
            function: FractalFunction::default(),
            julia_hsv: Hsv::BLACK,
            default_attractor: Attractor::new(Complex::ZERO, Hsv::BLACK, false),
            infinity_attractor: Attractor::new(Complex::ZERO, Hsv::BLACK, false),
            attractors: Vec::new(),
        }
    }

    /// Random function plus, for Newton/Fraction kinds, one random attractor
    /// per numerator degree.
    pub fn random(rng: &mut Rng, options: &RandomFunctionOptions) -> Self {
        let function = FractalFunction::random(rng, options);
        let attractor_count = match function.kind() {
            FunctionKind::Default => 0,
            FunctionKind::Newton | FunctionKind::Fraction => {
                function.numerator().degree().clamp(1, MAX_ATTRACTORS)
            }
        };
        let attractors = (0..attractor_count)
            .map(|_| Attractor::random(rng, 1.5))
            .collect();

        Self {
            id: format!("{:016x}", rng.u64(..)),
            name: format!("Random {}", function.kind()),
            function,
            julia_hsv: Hsv::random(rng),
            default_attractor: Attractor::new(Complex::ZERO, Hsv::BLACK, false),
            infinity_attractor: Attractor::new(Complex::ZERO, Hsv::random(rng), true),
            attractors,
            ..Self::default_configuration()
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// `None` if any field, however deeply nested, is missing or malformed.
    pub fn from_json(json: &str) -> Option<Configuration> {
        match serde_json::from_str(json) {
            Ok(configuration) => Some(configuration),
            Err(e) => {
                log::debug!("rejecting configuration JSON: {e}");
                None
            }
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::default_configuration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn default_configuration_is_an_animated_julia_set() {
        let config = Configuration::default_configuration();
        assert_eq!(config.function.kind(), FunctionKind::Default);
        assert_eq!(config.function.numerator().degree(), 2);
        assert!(matches!(
            config.function.numerator().coefficient(0),
            Ok(Some(Coefficient::Circle(_)))
        ));
    }

    #[test]
    fn json_round_trip() {
        for config in [
            Configuration::default_configuration(),
            Configuration::empty_configuration(),
        ] {
            assert_eq!(Configuration::from_json(&config.to_json()), Some(config.clone()));
        }
    }

    #[test]
    fn random_configurations_round_trip() {
        let mut rng = Rng::with_seed(99);
        let options = RandomFunctionOptions::default();
        for _ in 0..25 {
            let config = Configuration::random(&mut rng, &options);
            assert!(config.attractors.len() <= MAX_ATTRACTORS);
            assert_eq!(Configuration::from_json(&config.to_json_pretty()), Some(config));
        }
    }

    #[test]
    fn any_nested_failure_invalidates_the_whole_configuration() {
        let config = Configuration::default_configuration();

        let mut json: Value = serde_json::from_str(&config.to_json()).unwrap();
        json["function"]["numerator"]["coefficients"]["0"]["type"] = "spiral".into();
        assert_eq!(Configuration::from_json(&json.to_string()), None);

        let mut json: Value = serde_json::from_str(&config.to_json()).unwrap();
        json["infinityAttractor"]["colour"]
            .as_object_mut()
            .unwrap()
            .remove("hue");
        assert_eq!(Configuration::from_json(&json.to_string()), None);

        let mut json: Value = serde_json::from_str(&config.to_json()).unwrap();
        json["iterations"] = (-5).into();
        assert_eq!(Configuration::from_json(&json.to_string()), None);

        assert_eq!(Configuration::from_json("not json"), None);
    }

    #[test]
    fn clones_are_independent() {
        let original = Configuration::default_configuration();
        let mut copy = original.clone();
        copy.function.set_function_type(FunctionKind::Newton);
        copy.attractors.push(Attractor::new(Complex::ONE, Hsv::BLACK, true));
        assert_eq!(original.function.kind(), FunctionKind::Default);
        assert!(original.attractors.is_empty());
    }
}
