use std::collections::BTreeMap;
use std::fmt;

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coefficient::{Coefficient, CoefficientKind, CoefficientRanges};
use crate::complex::Complex;
use crate::utils::sample_without_replacement;

/// Highest power a polynomial can hold.
pub const MAX_DEGREE: usize = 15;

/// Number of coefficient slots (`0..=MAX_DEGREE`).
pub const COEFFICIENT_SLOTS: usize = MAX_DEGREE + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("power {power} is outside 0..={max}", max = MAX_DEGREE)]
pub struct RangeError {
    pub power: usize,
}

fn check_power(power: usize) -> Result<usize, RangeError> {
    if power > MAX_DEGREE {
        Err(RangeError { power })
    } else {
        Ok(power)
    }
}

/// Sparse polynomial in `z`: a coefficient slot per power, absent slots are
/// not terms (as opposed to zero-valued terms).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "PolynomialRecord", into = "PolynomialRecord")]
pub struct Polynomial {
    coefficients: [Option<Coefficient>; COEFFICIENT_SLOTS],
    /// Highest present power, or 0 when empty.
    degree: usize,
}

impl Polynomial {
    pub fn new() -> Self {
        Self::default()
    }

    /// The constant polynomial `1`.
    pub fn constant_one() -> Self {
        Self::from_terms([(0, Coefficient::Constant(Complex::ONE))])
            .unwrap_or_default()
    }

    pub fn from_terms(
        terms: impl IntoIterator<Item = (usize, Coefficient)>,
    ) -> Result<Self, RangeError> {
        let mut polynomial = Self::new();
        for (power, coefficient) in terms {
            polynomial.set_coefficient(power, coefficient)?;
        }
        Ok(polynomial)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.iter().all(Option::is_none)
    }

    /// `Ok(None)` for an in-range power without a term.
    pub fn coefficient(&self, power: usize) -> Result<Option<&Coefficient>, RangeError> {
        Ok(self.coefficients[check_power(power)?].as_ref())
    }

    /// Store `coefficient` at `power`. Raises the degree, never lowers it.
    pub fn set_coefficient(&mut self, power: usize, coefficient: Coefficient) -> Result<(), RangeError> {
        self.coefficients[check_power(power)?] = Some(coefficient);
        self.degree = self.degree.max(power);
        Ok(())
    }

    /// Clear `power`, returning the removed term.
    pub fn remove_coefficient(&mut self, power: usize) -> Result<Option<Coefficient>, RangeError> {
        let removed = self.coefficients[check_power(power)?].take();
        if power == self.degree {
            self.degree = (0..=MAX_DEGREE)
                .rev()
                .find(|&p| self.coefficients[p].is_some())
                .unwrap_or(0);
        }
        Ok(removed)
    }

    /// First derivative: `c·z^p` becomes `(p·c)·z^(p-1)`; constant terms vanish.
    pub fn derivative(&self) -> Polynomial {
        let mut derivative = Polynomial::new();
        for (power, coefficient) in self.iter().filter(|(p, _)| *p >= 1) {
            derivative.coefficients[power - 1] = Some(coefficient.multiplied_by(power as f64));
            derivative.degree = derivative.degree.max(power - 1);
        }
        derivative
    }

    /// Present terms in ascending power order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &Coefficient)> + '_ {
        self.coefficients
            .iter()
            .enumerate()
            .filter_map(|(power, c)| c.as_ref().map(|c| (power, c)))
    }

    /// Bit `p` set iff power `p` has a term.
    pub fn presence_mask(&self) -> u32 {
        self.iter().fold(0, |mask, (power, _)| mask | (1 << power))
    }

    /// `count` distinct powers, each with an independently sampled
    /// coefficient whose variant is drawn from `kinds`.
    pub fn random(
        rng: &mut Rng,
        count: usize,
        kinds: &[CoefficientKind],
        ranges: &CoefficientRanges,
    ) -> Polynomial {
        let mut polynomial = Polynomial::new();
        for power in sample_without_replacement(rng, 0..COEFFICIENT_SLOTS, count) {
            polynomial.coefficients[power] = Some(Coefficient::random_of(rng, kinds, ranges));
            polynomial.degree = polynomial.degree.max(power);
        }
        polynomial
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_json(json: &Value) -> Option<Polynomial> {
        Polynomial::deserialize(json).ok()
    }
}

// ---------------------------------------------------------------------------
// JSON record
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct PolynomialRecord {
    coefficients: BTreeMap<usize, Coefficient>,
}

impl From<Polynomial> for PolynomialRecord {
    fn from(polynomial: Polynomial) -> Self {
        let coefficients = polynomial
            .coefficients
            .into_iter()
            .enumerate()
            .filter_map(|(power, c)| c.map(|c| (power, c)))
            .collect();
        Self { coefficients }
    }
}

impl TryFrom<PolynomialRecord> for Polynomial {
    type Error = RangeError;

    fn try_from(record: PolynomialRecord) -> Result<Self, RangeError> {
        Polynomial::from_terms(record.coefficients)
    }
}

// ---------------------------------------------------------------------------
// Equation text
// ---------------------------------------------------------------------------

impl fmt::Display for Polynomial {
    /// Highest power first, e.g. `z^2 - 3z + (1 + i)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (power, coefficient) in self.iter().rev() {
            if coefficient.is_zero() {
                continue;
            }
            let negative = coefficient.has_minus();
            let shown = if negative {
                coefficient.multiplied_by(-1.0)
            } else {
                coefficient.clone()
            };
            let separator = match (first, negative) {
                (true, false) => "",
                (true, true) => "-",
                (false, false) => " + ",
                (false, true) => " - ",
            };
            let unit = power > 0 && shown == Coefficient::Constant(Complex::ONE);
            let text = if unit { String::new() } else { shown.to_string() };
            match power {
                0 => write!(f, "{separator}{text}")?,
                1 => write!(f, "{separator}{text}z")?,
                p => write!(f, "{separator}{text}z^{p}")?,
            }
            first = false;
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn c(re: f64, im: f64) -> Coefficient {
        Coefficient::constant(re, im)
    }

    // --- access -----------------------------------------------------------------

    #[test]
    fn out_of_range_powers_fail() {
        let mut p = Polynomial::new();
        assert_eq!(p.coefficient(16), Err(RangeError { power: 16 }));
        assert_eq!(p.set_coefficient(99, c(1.0, 0.0)), Err(RangeError { power: 99 }));
        assert_eq!(p.remove_coefficient(16), Err(RangeError { power: 16 }));
    }

    #[test]
    fn absent_power_reads_as_none() {
        let p = Polynomial::constant_one();
        assert_eq!(p.coefficient(3), Ok(None));
        assert_eq!(p.coefficient(0), Ok(Some(&c(1.0, 0.0))));
    }

    // --- degree -----------------------------------------------------------------

    #[test]
    fn set_never_lowers_degree() {
        let mut p = Polynomial::new();
        p.set_coefficient(5, c(1.0, 0.0)).unwrap();
        p.set_coefficient(2, c(1.0, 0.0)).unwrap();
        assert_eq!(p.degree(), 5);
    }

    #[test]
    fn removing_the_top_term_rescans() {
        let mut p = Polynomial::from_terms([(1, c(1.0, 0.0)), (4, c(2.0, 0.0)), (9, c(3.0, 0.0))]).unwrap();
        assert_eq!(p.remove_coefficient(9).unwrap(), Some(c(3.0, 0.0)));
        assert_eq!(p.degree(), 4);
        p.remove_coefficient(1).unwrap();
        assert_eq!(p.degree(), 4);
        p.remove_coefficient(4).unwrap();
        assert_eq!(p.degree(), 0);
        assert!(p.is_empty());
    }

    #[test]
    fn degree_tracks_highest_present_power_under_random_edits() {
        let mut rng = Rng::with_seed(2024);
        let mut p = Polynomial::new();
        for _ in 0..2_000 {
            let power = rng.usize(..COEFFICIENT_SLOTS);
            if rng.bool() {
                p.set_coefficient(power, c(1.0, 0.0)).unwrap();
            } else {
                p.remove_coefficient(power).unwrap();
            }
            let expected = p.iter().map(|(power, _)| power).max().unwrap_or(0);
            assert_eq!(p.degree(), expected);
        }
    }

    // --- derivative -------------------------------------------------------------

    #[test]
    fn derivative_of_z_squared() {
        let p = Polynomial::from_terms([(2, c(1.0, 0.0))]).unwrap();
        assert_eq!(p.derivative(), Polynomial::from_terms([(1, c(2.0, 0.0))]).unwrap());
    }

    #[test]
    fn derivative_drops_constants_and_shifts_powers() {
        let p = Polynomial::from_terms([(0, c(7.0, 0.0)), (1, c(0.0, 1.0)), (3, c(1.0, 1.0))]).unwrap();
        let d = p.derivative();
        assert_eq!(d.coefficient(0), Ok(Some(&c(0.0, 1.0))));
        assert_eq!(d.coefficient(1), Ok(None));
        assert_eq!(d.coefficient(2), Ok(Some(&c(3.0, 3.0))));
        assert_eq!(d.degree(), 2);
        assert!(Polynomial::constant_one().derivative().is_empty());
    }

    #[test]
    fn presence_mask_sets_one_bit_per_term() {
        let p = Polynomial::from_terms([(0, c(1.0, 0.0)), (3, c(1.0, 0.0)), (15, c(1.0, 0.0))]).unwrap();
        assert_eq!(p.presence_mask(), 0b1000_0000_0000_1001);
    }

    // --- random -----------------------------------------------------------------

    #[test]
    fn random_has_requested_term_count() {
        let mut rng = Rng::with_seed(77);
        let ranges = CoefficientRanges::default();
        for count in 1..=COEFFICIENT_SLOTS {
            let p = Polynomial::random(&mut rng, count, &CoefficientKind::ALL, &ranges);
            assert_eq!(p.iter().count(), count);
            assert_eq!(p.degree(), p.iter().map(|(power, _)| power).max().unwrap());
        }
    }

    // --- JSON -------------------------------------------------------------------

    #[test]
    fn json_round_trip() {
        let mut rng = Rng::with_seed(8);
        let p = Polynomial::random(&mut rng, 5, &CoefficientKind::ALL, &CoefficientRanges::default());
        assert_eq!(Polynomial::from_json(&p.to_json()), Some(p));
    }

    #[test]
    fn json_shape() {
        let p = Polynomial::from_terms([(2, c(1.0, 0.0))]).unwrap();
        assert_eq!(
            p.to_json(),
            json!({ "coefficients": { "2": { "type": "complex", "re": 1.0, "im": 0.0 } } })
        );
    }

    #[test]
    fn json_rejects_out_of_range_power_and_bad_terms() {
        let too_high = json!({ "coefficients": { "16": { "type": "complex", "re": 1.0, "im": 0.0 } } });
        assert_eq!(Polynomial::from_json(&too_high), None);
        let bad_term = json!({ "coefficients": { "1": { "type": "complex", "re": 1.0 } } });
        assert_eq!(Polynomial::from_json(&bad_term), None);
        assert_eq!(Polynomial::from_json(&json!({})), None);
    }

    // --- display ----------------------------------------------------------------

    #[test]
    fn equation_text() {
        let p = Polynomial::from_terms([(2, c(1.0, 0.0)), (1, c(-3.0, 0.0)), (0, c(1.0, 1.0))]).unwrap();
        assert_eq!(p.to_string(), "z^2 - 3z + (1 + i)");
        let q = Polynomial::from_terms([(3, c(0.0, -2.0)), (0, c(1.0, 0.0))]).unwrap();
        assert_eq!(q.to_string(), "-2iz^3 + 1");
        assert_eq!(Polynomial::new().to_string(), "0");
    }

    #[test]
    fn zero_terms_are_left_out_of_the_equation() {
        let p = Polynomial::from_terms([(2, c(1.0, 0.0)), (0, c(0.0, 0.0))]).unwrap();
        assert_eq!(p.to_string(), "z^2");
        let only_zero = Polynomial::from_terms([(1, c(0.0, 0.0))]).unwrap();
        assert_eq!(only_zero.to_string(), "0");
    }
}
