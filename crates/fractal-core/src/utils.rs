use std::ops::Range;

use fastrand::Rng;

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Significant decimal digits an `f64` can carry.
const F64_DIGITS: u32 = 17;

/// Round `value` to `digits` significant digits.
///
/// Zero, NaN and infinities are returned unchanged; `digits == 0` behaves
/// like `1`, and anything at or past `f64` precision leaves `value` as-is.
pub fn round_to_significant(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() || digits >= F64_DIGITS {
        return value;
    }
    let digits = digits.max(1) as i32;
    let magnitude = value.abs().log10().floor() as i32;
    let shift = digits - 1 - magnitude;
    if shift >= 0 {
        let factor = 10f64.powi(shift);
        if factor.is_finite() {
            return (value * factor).round() / factor;
        }
        // 10^shift overflows for subnormal magnitudes; scale in two steps.
        let low = 10f64.powi(shift / 2);
        let high = 10f64.powi(shift - shift / 2);
        (value * low * high).round() / high / low
    } else {
        let factor = 10f64.powi(-shift);
        (value / factor).round() * factor
    }
}

// ---------------------------------------------------------------------------
// Random sampling
// ---------------------------------------------------------------------------

/// Uniform integer in `[min, max)`. Returns `min` for an empty range.
pub fn random_int(rng: &mut Rng, min: i64, max: i64) -> i64 {
    if max <= min {
        min
    } else {
        rng.i64(min..max)
    }
}

/// Uniform float in `[min, max)`. Returns `min` for an empty range.
pub fn random_float(rng: &mut Rng, min: f64, max: f64) -> f64 {
    if max <= min {
        min
    } else {
        min + rng.f64() * (max - min)
    }
}

/// Uniform float drawn from `range`, see [`random_float`].
pub fn random_in(rng: &mut Rng, range: &Range<f64>) -> f64 {
    random_float(rng, range.start, range.end)
}

/// Draw `count` distinct values from `range`, in draw order.
///
/// Asking for more values than the range holds returns the whole range
/// (shuffled).
pub fn sample_without_replacement(rng: &mut Rng, range: Range<usize>, count: usize) -> Vec<usize> {
    let mut pool: Vec<usize> = range.collect();
    let count = count.min(pool.len());
    // Partial Fisher–Yates: only the first `count` slots are settled.
    for i in 0..count {
        let j = rng.usize(i..pool.len());
        pool.swap(i, j);
    }
    pool.truncate(count);
    pool
}
