//! Parameter → buffer map.
//!
//! Every abstract parameter the shader reads lives at a fixed word offset in
//! one of seven physical buffers (one per bind-group slot). Several unrelated
//! parameters share a buffer to stay inside the binding budget; the table
//! below is the single source of truth for where each one goes and which
//! numeric view (`f32` / `u32`) its words are written through.
//!
//! ```text
//! slot buffer                 kind              stages            words
//!  0   Viewport               uniform           fragment              8
//!  1   Time                   uniform           compute               4
//!  2   FunctionShape          uniform           compute+fragment     12
//!  3   FunctionCoefficients   storage (read)    compute             192
//!  4   FractionValues         storage (rw)      compute+fragment     66
//!  5   Fractal                uniform           fragment             16
//!  6   Attractors             storage (read)    fragment            128
//! ```

use fractal_core::{Attractor, Coefficient, Configuration, Hsv, Polynomial, COEFFICIENT_SLOTS, MAX_ATTRACTORS};

/// Words per coefficient: its ellipse parameterisation.
pub const COEFFICIENT_WORDS: usize = 6;
/// Words per attractor record: `position.xy, 0, 0, h, s, v, darkening`.
pub const ATTRACTOR_WORDS: usize = 8;
/// Evaluated coefficient values written by the compute pass: numerator,
/// denominator, then the Newton coefficient.
pub const FRACTION_VALUE_COUNT: usize = 2 * COEFFICIENT_SLOTS + 1;

// ---------------------------------------------------------------------------
// Buffers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferName {
    Viewport,
    Time,
    FunctionShape,
    FunctionCoefficients,
    FractionValues,
    Fractal,
    Attractors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Uniform,
    Storage { read_only: bool },
}

impl BufferName {
    pub const ALL: [BufferName; 7] = [
        BufferName::Viewport,
        BufferName::Time,
        BufferName::FunctionShape,
        BufferName::FunctionCoefficients,
        BufferName::FractionValues,
        BufferName::Fractal,
        BufferName::Attractors,
    ];

    /// Bind-group slot; also the index into per-buffer arrays.
    pub fn binding(self) -> u32 {
        self as u32
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Size in 32-bit words (uniforms are padded to 16 bytes).
    pub fn words(self) -> usize {
        match self {
            BufferName::Viewport => 8,
            BufferName::Time => 4,
            BufferName::FunctionShape => 12,
            BufferName::FunctionCoefficients => 2 * COEFFICIENT_SLOTS * COEFFICIENT_WORDS,
            BufferName::FractionValues => 2 * FRACTION_VALUE_COUNT,
            BufferName::Fractal => 16,
            BufferName::Attractors => MAX_ATTRACTORS * ATTRACTOR_WORDS,
        }
    }

    pub fn size_bytes(self) -> u64 {
        (self.words() * 4) as u64
    }

    pub fn kind(self) -> BufferKind {
        match self {
            BufferName::Viewport | BufferName::Time | BufferName::FunctionShape | BufferName::Fractal => {
                BufferKind::Uniform
            }
            BufferName::FunctionCoefficients | BufferName::Attractors => {
                BufferKind::Storage { read_only: true }
            }
            BufferName::FractionValues => BufferKind::Storage { read_only: false },
        }
    }

    pub fn visibility(self) -> wgpu::ShaderStages {
        use wgpu::ShaderStages as S;
        match self {
            BufferName::Viewport | BufferName::Fractal | BufferName::Attractors => S::FRAGMENT,
            BufferName::Time | BufferName::FunctionCoefficients => S::COMPUTE,
            BufferName::FunctionShape | BufferName::FractionValues => S::COMPUTE | S::FRAGMENT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BufferName::Viewport => "viewport",
            BufferName::Time => "time",
            BufferName::FunctionShape => "function_shape",
            BufferName::FunctionCoefficients => "function_coefficients",
            BufferName::FractionValues => "fraction_values",
            BufferName::Fractal => "fractal",
            BufferName::Attractors => "attractors",
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    CanvasDimensions,
    CoordinatesScale,
    DimensionRatio,
    CoordinatesCentre,
    Time,
    FunctionType,
    NumeratorMask,
    DenominatorMask,
    NewtonCoefficient,
    NumeratorCoefficients,
    DenominatorCoefficients,
    Iterations,
    Epsilon,
    Bound,
    AttractorCount,
    JuliaHsv,
    DefaultAttractor,
    InfinityAttractor,
    Attractors,
}

impl ParameterId {
    pub const ALL: [ParameterId; 19] = [
        ParameterId::CanvasDimensions,
        ParameterId::CoordinatesScale,
        ParameterId::DimensionRatio,
        ParameterId::CoordinatesCentre,
        ParameterId::Time,
        ParameterId::FunctionType,
        ParameterId::NumeratorMask,
        ParameterId::DenominatorMask,
        ParameterId::NewtonCoefficient,
        ParameterId::NumeratorCoefficients,
        ParameterId::DenominatorCoefficients,
        ParameterId::Iterations,
        ParameterId::Epsilon,
        ParameterId::Bound,
        ParameterId::AttractorCount,
        ParameterId::JuliaHsv,
        ParameterId::DefaultAttractor,
        ParameterId::InfinityAttractor,
        ParameterId::Attractors,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericView {
    F32,
    U32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    Array,
}

/// Where one parameter lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterBinding {
    pub id: ParameterId,
    pub buffer: BufferName,
    /// Offset in 32-bit words.
    pub offset: usize,
    /// Length in 32-bit words (1 for scalars).
    pub len: usize,
    pub shape: ValueShape,
    pub view: NumericView,
}

impl ParameterBinding {
    pub fn words(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

const fn scalar(id: ParameterId, buffer: BufferName, offset: usize, view: NumericView) -> ParameterBinding {
    ParameterBinding {
        id,
        buffer,
        offset,
        len: 1,
        shape: ValueShape::Scalar,
        view,
    }
}

const fn array(id: ParameterId, buffer: BufferName, offset: usize, len: usize) -> ParameterBinding {
    ParameterBinding {
        id,
        buffer,
        offset,
        len,
        shape: ValueShape::Array,
        view: NumericView::F32,
    }
}

const COEFFICIENT_ARRAY_WORDS: usize = COEFFICIENT_SLOTS * COEFFICIENT_WORDS;

/// Indexed by `ParameterId as usize`.
pub static PARAMETER_MAP: [ParameterBinding; ParameterId::ALL.len()] = {
    use BufferName as B;
    use NumericView::{F32, U32};
    use ParameterId as P;
    [
        array(P::CanvasDimensions, B::Viewport, 0, 2),
        scalar(P::CoordinatesScale, B::Viewport, 2, F32),
        scalar(P::DimensionRatio, B::Viewport, 3, F32),
        array(P::CoordinatesCentre, B::Viewport, 4, 2),
        scalar(P::Time, B::Time, 0, F32),
        scalar(P::FunctionType, B::FunctionShape, 0, U32),
        scalar(P::NumeratorMask, B::FunctionShape, 1, U32),
        scalar(P::DenominatorMask, B::FunctionShape, 2, U32),
        array(P::NewtonCoefficient, B::FunctionShape, 4, COEFFICIENT_WORDS),
        array(P::NumeratorCoefficients, B::FunctionCoefficients, 0, COEFFICIENT_ARRAY_WORDS),
        array(
            P::DenominatorCoefficients,
            B::FunctionCoefficients,
            COEFFICIENT_ARRAY_WORDS,
            COEFFICIENT_ARRAY_WORDS,
        ),
        scalar(P::Iterations, B::Fractal, 0, U32),
        scalar(P::Epsilon, B::Fractal, 1, F32),
        scalar(P::Bound, B::Fractal, 2, F32),
        scalar(P::AttractorCount, B::Fractal, 3, U32),
        array(P::JuliaHsv, B::Fractal, 4, 3),
        array(P::DefaultAttractor, B::Fractal, 8, 4),
        array(P::InfinityAttractor, B::Fractal, 12, 4),
        array(P::Attractors, B::Attractors, 0, MAX_ATTRACTORS * ATTRACTOR_WORDS),
    ]
};

pub fn binding(id: ParameterId) -> &'static ParameterBinding {
    &PARAMETER_MAP[id as usize]
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    F32(f32),
    U32(u32),
    F32Array(Vec<f32>),
    U32Array(Vec<u32>),
}

impl ParameterValue {
    pub fn view(&self) -> NumericView {
        match self {
            ParameterValue::F32(_) | ParameterValue::F32Array(_) => NumericView::F32,
            ParameterValue::U32(_) | ParameterValue::U32Array(_) => NumericView::U32,
        }
    }

    pub fn shape(&self) -> ValueShape {
        match self {
            ParameterValue::F32(_) | ParameterValue::U32(_) => ValueShape::Scalar,
            ParameterValue::F32Array(_) | ParameterValue::U32Array(_) => ValueShape::Array,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration encoding
// ---------------------------------------------------------------------------

fn coefficient_words(coefficient: &Coefficient) -> [f32; COEFFICIENT_WORDS] {
    coefficient.ellipse_parameters().map(|v| v as f32)
}

fn polynomial_words(polynomial: &Polynomial) -> Vec<f32> {
    let mut words = vec![0.0; COEFFICIENT_ARRAY_WORDS];
    for (power, coefficient) in polynomial.iter() {
        let start = power * COEFFICIENT_WORDS;
        words[start..start + COEFFICIENT_WORDS].copy_from_slice(&coefficient_words(coefficient));
    }
    words
}

fn colour_words(colour: &Hsv, darkening: bool) -> Vec<f32> {
    vec![
        colour.hue as f32,
        colour.saturation as f32,
        colour.value as f32,
        if darkening { 1.0 } else { 0.0 },
    ]
}

fn attractor_words(attractors: &[Attractor]) -> Vec<f32> {
    let mut words = Vec::with_capacity(MAX_ATTRACTORS * ATTRACTOR_WORDS);
    for attractor in attractors.iter().take(MAX_ATTRACTORS) {
        words.extend_from_slice(&[attractor.coordinates.re as f32, attractor.coordinates.im as f32, 0.0, 0.0]);
        words.extend(colour_words(&attractor.colour, attractor.darkening));
    }
    words.resize(MAX_ATTRACTORS * ATTRACTOR_WORDS, 0.0);
    words
}

/// Every parameter a configuration determines, in one batch.
///
/// Surface-derived parameters (`CanvasDimensions`, `DimensionRatio`) and
/// `Time` are owned by the generator and not included.
pub fn configuration_parameters(config: &Configuration) -> Vec<(ParameterId, ParameterValue)> {
    use ParameterId as P;
    use ParameterValue as V;

    let function = &config.function;
    let attractor_count = config.attractors.len().min(MAX_ATTRACTORS) as u32;
    vec![
        (P::CoordinatesScale, V::F32(config.coordinates_scale as f32)),
        (
            P::CoordinatesCentre,
            V::F32Array(vec![config.coordinates_centre.re as f32, config.coordinates_centre.im as f32]),
        ),
        (P::FunctionType, V::U32(function.kind().shader_id())),
        (P::NumeratorMask, V::U32(function.numerator().presence_mask())),
        (P::DenominatorMask, V::U32(function.denominator().presence_mask())),
        (
            P::NewtonCoefficient,
            V::F32Array(coefficient_words(function.newton_coefficient()).to_vec()),
        ),
        (P::NumeratorCoefficients, V::F32Array(polynomial_words(function.numerator()))),
        (P::DenominatorCoefficients, V::F32Array(polynomial_words(function.denominator()))),
        (P::Iterations, V::U32(config.iterations)),
        (P::Epsilon, V::F32(config.epsilon as f32)),
        (P::Bound, V::F32(config.bound as f32)),
        (P::AttractorCount, V::U32(attractor_count)),
        (
            P::JuliaHsv,
            V::F32Array(vec![
                config.julia_hsv.hue as f32,
                config.julia_hsv.saturation as f32,
                config.julia_hsv.value as f32,
            ]),
        ),
        (
            P::DefaultAttractor,
            V::F32Array(colour_words(&config.default_attractor.colour, config.default_attractor.darkening)),
        ),
        (
            P::InfinityAttractor,
            V::F32Array(colour_words(&config.infinity_attractor.colour, config.infinity_attractor.darkening)),
        ),
        (P::Attractors, V::F32Array(attractor_words(&config.attractors))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractal_core::{Complex, FunctionKind};
    use std::collections::HashSet;

    #[test]
    fn every_parameter_appears_exactly_once() {
        let ids: Vec<_> = PARAMETER_MAP.iter().map(|b| b.id).collect();
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len(), "duplicate ids in {ids:?}");
        for id in ParameterId::ALL {
            assert_eq!(binding(id).id, id, "{id:?} is not at its own index");
        }
    }

    #[test]
    fn entries_fit_inside_their_buffer() {
        for b in &PARAMETER_MAP {
            assert!(b.len >= 1, "{:?} is empty", b.id);
            assert!(
                b.offset + b.len <= b.buffer.words(),
                "{:?} overflows {:?}",
                b.id,
                b.buffer
            );
            if b.shape == ValueShape::Scalar {
                assert_eq!(b.len, 1, "{:?} scalar with len {}", b.id, b.len);
            }
        }
    }

    #[test]
    fn no_two_entries_in_a_buffer_overlap() {
        for (i, a) in PARAMETER_MAP.iter().enumerate() {
            for b in PARAMETER_MAP.iter().skip(i + 1) {
                if a.buffer != b.buffer {
                    continue;
                }
                let disjoint = a.offset + a.len <= b.offset || b.offset + b.len <= a.offset;
                assert!(disjoint, "{:?} overlaps {:?} in {:?}", a.id, b.id, a.buffer);
            }
        }
    }

    #[test]
    fn compute_output_buffer_is_not_host_written() {
        assert!(PARAMETER_MAP.iter().all(|b| b.buffer != BufferName::FractionValues));
    }

    #[test]
    fn uniform_buffers_are_16_byte_multiples() {
        for buffer in BufferName::ALL {
            if buffer.kind() == BufferKind::Uniform {
                assert_eq!(buffer.size_bytes() % 16, 0, "{buffer:?}");
            }
        }
    }

    #[test]
    fn slots_are_dense() {
        let slots: Vec<u32> = BufferName::ALL.iter().map(|b| b.binding()).collect();
        assert_eq!(slots, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn configuration_values_match_their_bindings() {
        let config = Configuration::default_configuration();
        let params = configuration_parameters(&config);
        for (id, value) in &params {
            let b = binding(*id);
            assert_eq!(value.view(), b.view, "{id:?}");
            assert_eq!(value.shape(), b.shape, "{id:?}");
            if let ParameterValue::F32Array(v) = value {
                assert_eq!(v.len(), b.len, "{id:?}");
            }
        }
        let ids: HashSet<_> = params.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids.len(), params.len());
        assert!(!ids.contains(&ParameterId::Time));
        assert!(!ids.contains(&ParameterId::CanvasDimensions));
    }

    #[test]
    fn coefficients_land_at_power_times_six() {
        let config = Configuration::default_configuration();
        let params = configuration_parameters(&config);
        let numerator = params
            .iter()
            .find_map(|(id, v)| match (id, v) {
                (ParameterId::NumeratorCoefficients, ParameterValue::F32Array(words)) => Some(words.clone()),
                _ => None,
            })
            .unwrap();
        // z^2 with coefficient 1: static, modulus 1, argument 0.
        assert_eq!(&numerator[12..18], &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        // Circle constant term: duration 30 s, radius 0.7885 on both axes.
        let radius = 0.7885_f64 as f32;
        assert_eq!(&numerator[0..4], &[30_000.0, 0.0, radius, radius]);
        // Absent power 1 stays zero.
        assert!(numerator[6..12].iter().all(|&w| w == 0.0));
    }

    #[test]
    fn masks_and_kind_follow_the_function() {
        let mut config = Configuration::default_configuration();
        config.function.set_function_type(FunctionKind::Newton);
        let params = configuration_parameters(&config);
        let get = |wanted: ParameterId| {
            params
                .iter()
                .find(|(id, _)| *id == wanted)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get(ParameterId::FunctionType), ParameterValue::U32(1));
        assert_eq!(get(ParameterId::NumeratorMask), ParameterValue::U32(0b101));
        // Derivative of z^2 + c is 2z.
        assert_eq!(get(ParameterId::DenominatorMask), ParameterValue::U32(0b10));
        assert_eq!(
            get(ParameterId::NewtonCoefficient),
            ParameterValue::F32Array(vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0])
        );
    }

    #[test]
    fn attractors_are_packed_and_truncated() {
        let mut config = Configuration::default_configuration();
        config.attractors = (0..20)
            .map(|i| Attractor::new(Complex::new(i as f64, -1.0), Hsv::new(0.5, 0.25, 1.0), i % 2 == 0))
            .collect();
        let params = configuration_parameters(&config);
        let count = params.iter().find(|(id, _)| *id == ParameterId::AttractorCount).unwrap();
        assert_eq!(count.1, ParameterValue::U32(MAX_ATTRACTORS as u32));
        let words = params
            .iter()
            .find_map(|(id, v)| match (id, v) {
                (ParameterId::Attractors, ParameterValue::F32Array(w)) => Some(w.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(&words[8..16], &[1.0, -1.0, 0.0, 0.0, 0.5, 0.25, 1.0, 0.0]);
    }
}
