use std::fmt;
use std::ops::RangeInclusive;

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coefficient::{Coefficient, CoefficientKind, CoefficientRanges};
use crate::complex::Complex;
use crate::polynomial::{Polynomial, RangeError};
use crate::utils::random_int;

/// How numerator and denominator combine into the iterated map.
///
/// * `Default` : `z ↦ N(z)` (denominator fixed to `1`)
/// * `Newton`  : `z ↦ z − a·N(z)/N'(z)` (denominator is the derivative)
/// * `Fraction`: `z ↦ N(z)/D(z)` with an independent `D`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FunctionKind {
    #[default]
    Default,
    Newton,
    Fraction,
}

impl FunctionKind {
    pub const ALL: [FunctionKind; 3] = [FunctionKind::Default, FunctionKind::Newton, FunctionKind::Fraction];

    /// Discriminant consumed by the shader.
    pub fn shader_id(self) -> u32 {
        match self {
            FunctionKind::Default => 0,
            FunctionKind::Newton => 1,
            FunctionKind::Fraction => 2,
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FunctionKind::Default => "DEFAULT",
            FunctionKind::Newton => "NEWTON",
            FunctionKind::Fraction => "FRACTION",
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FunctionError {
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("coefficient must not be inserted into a {0} denominator")]
    DenominatorLocked(FunctionKind),
    #[error("newton coefficient cannot be set on a {0} function")]
    NotNewton(FunctionKind),
    #[error("{0} denominator does not match its canonical form")]
    InconsistentDenominator(FunctionKind),
}

/// A numerator/denominator pair plus the rule combining them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FunctionRecord", into = "FunctionRecord")]
pub struct FractalFunction {
    numerator: Polynomial,
    denominator: Polynomial,
    kind: FunctionKind,
    newton_coefficient: Coefficient,
}

impl FractalFunction {
    pub fn default_function(numerator: Polynomial) -> Self {
        Self {
            numerator,
            denominator: Polynomial::constant_one(),
            kind: FunctionKind::Default,
            newton_coefficient: Coefficient::Constant(Complex::ZERO),
        }
    }

    pub fn newton_function(numerator: Polynomial, newton_coefficient: Coefficient) -> Self {
        Self {
            denominator: numerator.derivative(),
            numerator,
            kind: FunctionKind::Newton,
            newton_coefficient,
        }
    }

    pub fn fraction_function(numerator: Polynomial, denominator: Polynomial) -> Self {
        Self {
            numerator,
            denominator,
            kind: FunctionKind::Fraction,
            newton_coefficient: Coefficient::Constant(Complex::ZERO),
        }
    }

    pub fn numerator(&self) -> &Polynomial {
        &self.numerator
    }

    pub fn denominator(&self) -> &Polynomial {
        &self.denominator
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn newton_coefficient(&self) -> &Coefficient {
        &self.newton_coefficient
    }

    /// Insert or replace one term. Denominator edits are only legal for
    /// `Fraction`; a `Newton` numerator edit re-derives the denominator.
    pub fn set_coefficient(
        &mut self,
        power: usize,
        in_numerator: bool,
        coefficient: Coefficient,
    ) -> Result<(), FunctionError> {
        self.edit(in_numerator, |polynomial| polynomial.set_coefficient(power, coefficient))
    }

    pub fn remove_coefficient(&mut self, power: usize, in_numerator: bool) -> Result<Option<Coefficient>, FunctionError> {
        self.edit(in_numerator, |polynomial| polynomial.remove_coefficient(power))
    }

    fn edit<T>(
        &mut self,
        in_numerator: bool,
        apply: impl FnOnce(&mut Polynomial) -> Result<T, RangeError>,
    ) -> Result<T, FunctionError> {
        if in_numerator {
            let result = apply(&mut self.numerator)?;
            if self.kind == FunctionKind::Newton {
                self.denominator = self.numerator.derivative();
            }
            Ok(result)
        } else if self.kind == FunctionKind::Fraction {
            Ok(apply(&mut self.denominator)?)
        } else {
            Err(FunctionError::DenominatorLocked(self.kind))
        }
    }

    pub fn set_newton_coefficient(&mut self, coefficient: Coefficient) -> Result<(), FunctionError> {
        if self.kind != FunctionKind::Newton {
            return Err(FunctionError::NotNewton(self.kind));
        }
        self.newton_coefficient = coefficient;
        Ok(())
    }

    /// Switch kind, resetting denominator and Newton coefficient to the new
    /// kind's defaults. The numerator is left untouched.
    pub fn set_function_type(&mut self, kind: FunctionKind) {
        let numerator = std::mem::take(&mut self.numerator);
        *self = match kind {
            FunctionKind::Default => Self::default_function(numerator),
            FunctionKind::Newton => {
                Self::newton_function(numerator, Coefficient::Constant(Complex::ONE))
            }
            FunctionKind::Fraction => Self::fraction_function(numerator, Polynomial::constant_one()),
        };
    }

    /// Check the denominator against what `kind` requires.
    fn validate(&self) -> Result<(), FunctionError> {
        let consistent = match self.kind {
            FunctionKind::Default => self.denominator == Polynomial::constant_one(),
            FunctionKind::Newton => self.denominator == self.numerator.derivative(),
            FunctionKind::Fraction => true,
        };
        if consistent {
            Ok(())
        } else {
            Err(FunctionError::InconsistentDenominator(self.kind))
        }
    }

    pub fn random(rng: &mut Rng, options: &RandomFunctionOptions) -> FractalFunction {
        let kind = if options.kinds.is_empty() {
            FunctionKind::Default
        } else {
            options.kinds[rng.usize(..options.kinds.len())]
        };
        let (low, high) = options.coefficient_count.clone().into_inner();
        let total = random_int(rng, low as i64, high as i64 + 1).max(1) as usize;
        let kinds = &options.coefficient_kinds;
        let ranges = &options.ranges;

        match kind {
            FunctionKind::Default => {
                Self::default_function(Polynomial::random(rng, total, kinds, ranges))
            }
            FunctionKind::Newton => {
                let numerator = Polynomial::random(rng, total, kinds, ranges);
                let a = Coefficient::random(rng, CoefficientKind::Constant, ranges);
                Self::newton_function(numerator, a)
            }
            FunctionKind::Fraction => {
                // At least one term on each side.
                let total = total.max(2);
                let in_numerator = random_int(rng, 1, total as i64) as usize;
                let numerator = Polynomial::random(rng, in_numerator, kinds, ranges);
                let denominator = Polynomial::random(rng, total - in_numerator, kinds, ranges);
                Self::fraction_function(numerator, denominator)
            }
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_json(json: &Value) -> Option<FractalFunction> {
        FractalFunction::deserialize(json).ok()
    }
}

impl Default for FractalFunction {
    /// `z ↦ z`
    fn default() -> Self {
        let identity = Polynomial::from_terms([(1, Coefficient::Constant(Complex::ONE))]);
        Self::default_function(identity.unwrap_or_default())
    }
}

impl fmt::Display for FractalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FunctionKind::Default => write!(f, "{}", self.numerator),
            FunctionKind::Newton => write!(
                f,
                "z - {} · ({}) / ({})",
                self.newton_coefficient, self.numerator, self.denominator
            ),
            FunctionKind::Fraction => write!(f, "({}) / ({})", self.numerator, self.denominator),
        }
    }
}

// ---------------------------------------------------------------------------
// Random generation options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RandomFunctionOptions {
    /// Kinds the generator may pick from.
    pub kinds: Vec<FunctionKind>,
    /// Total number of terms across numerator and denominator.
    pub coefficient_count: RangeInclusive<usize>,
    pub coefficient_kinds: Vec<CoefficientKind>,
    pub ranges: CoefficientRanges,
}

impl Default for RandomFunctionOptions {
    fn default() -> Self {
        Self {
            kinds: FunctionKind::ALL.to_vec(),
            coefficient_count: 2..=4,
            coefficient_kinds: CoefficientKind::ALL.to_vec(),
            ranges: CoefficientRanges::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON record
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionRecord {
    numerator: Polynomial,
    denominator: Polynomial,
    #[serde(rename = "type")]
    kind: FunctionKind,
    newton_coefficient: Coefficient,
}

impl From<FractalFunction> for FunctionRecord {
    fn from(function: FractalFunction) -> Self {
        Self {
            numerator: function.numerator,
            denominator: function.denominator,
            kind: function.kind,
            newton_coefficient: function.newton_coefficient,
        }
    }
}

impl TryFrom<FunctionRecord> for FractalFunction {
    type Error = FunctionError;

    fn try_from(record: FunctionRecord) -> Result<Self, FunctionError> {
        let function = FractalFunction {
            numerator: record.numerator,
            denominator: record.denominator,
            kind: record.kind,
            newton_coefficient: record.newton_coefficient,
        };
        function.validate()?;
        Ok(function)
    }
}
