//! The generator: owns the parameter backing stores and a `GpuBackend`, and
//! drives them through the animation lifecycle.
//!
//! ```text
//! Uninitialised --attach--> Initialising --start_animation--> Running <--> Paused
//!        any state --destroy--> Destroyed
//! ```

use std::collections::BTreeSet;
use std::time::Instant;

use fractal_core::Configuration;
use glam::{DVec2, UVec2};

use crate::backend::{FrameError, GpuBackend};
use crate::buffers::{BindingError, BufferStore};
use crate::context::{GpuContext, InitError};
use crate::frame::FrameTick;
use crate::layout::{configuration_parameters, ParameterId, ParameterValue};
use crate::renderer::WgpuBackend;
use crate::rolling_average::RollingAverage;

/// The uploaded animation time wraps at 2^22 ms so its `f32` spacing stays
/// at or below half a millisecond.
pub const TIME_WRAP_MS: f64 = 4_194_304.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Uninitialised,
    /// Backend attached, animation not started.
    Initialising,
    Running,
    Paused,
    Destroyed,
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("no GPU backend in state {0:?}")]
    NoBackend(GeneratorState),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Rolling averages over the last frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingMeasurements {
    pub fps: f64,
    /// Host time spent recording and submitting a frame.
    pub cpu_time_ms: f64,
    pub compute_time_ms: f64,
    pub render_time_ms: f64,
}

pub struct FractalGenerator<B: GpuBackend> {
    backend: Option<B>,
    state: GeneratorState,
    store: BufferStore,

    animation_time_ms: f64,
    surface_size: UVec2,
    resolution_scale: f64,

    fps: RollingAverage,
    cpu_time: RollingAverage,
    compute_time: RollingAverage,
    render_time: RollingAverage,
}

impl FractalGenerator<WgpuBackend> {
    /// Bring up a wgpu device for `target` and attach it.
    pub fn initialise(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, InitError> {
        let context = pollster::block_on(GpuContext::new(target, width, height))?;
        let mut generator = Self::new();
        generator.attach(WgpuBackend::new(context), width, height);
        Ok(generator)
    }
}

impl<B: GpuBackend> FractalGenerator<B> {
    pub fn new() -> Self {
        Self {
            backend: None,
            state: GeneratorState::Uninitialised,
            store: BufferStore::new(),
            animation_time_ms: 0.0,
            surface_size: UVec2::ONE,
            resolution_scale: 1.0,
            fps: RollingAverage::default(),
            cpu_time: RollingAverage::default(),
            compute_time: RollingAverage::default(),
            render_time: RollingAverage::default(),
        }
    }

    /// Ignored unless the generator is still uninitialised.
    pub fn attach(&mut self, backend: B, width: u32, height: u32) {
        if self.state != GeneratorState::Uninitialised {
            log::warn!("attach ignored in state {:?}", self.state);
            return;
        }
        self.backend = Some(backend);
        self.surface_size = UVec2::new(width, height).max(UVec2::ONE);
        self.state = GeneratorState::Initialising;
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Write every parameter of `config`, reset the clock and start running.
    pub fn start_animation(&mut self, config: &Configuration) -> Result<(), GeneratorError> {
        self.require_backend()?;
        self.animation_time_ms = 0.0;
        self.write_configuration(config)?;
        self.state = GeneratorState::Running;
        log::info!("Animation started: {} ({})", config.name, config.function.kind());
        Ok(())
    }

    /// Swap in a new configuration without touching the animation clock.
    pub fn apply_configuration(&mut self, config: &Configuration) -> Result<(), GeneratorError> {
        self.require_backend()?;
        self.write_configuration(config)?;
        self.redraw_if_paused()
    }

    pub fn pause(&mut self) {
        if self.state == GeneratorState::Running {
            self.state = GeneratorState::Paused;
        }
    }

    pub fn unpause(&mut self) {
        if self.state == GeneratorState::Paused {
            self.state = GeneratorState::Running;
        }
    }

    /// Drop the backend and every GPU resource it owns. Nothing is submitted
    /// afterwards.
    pub fn destroy(&mut self) {
        if self.state == GeneratorState::Destroyed {
            return;
        }
        self.backend = None;
        self.state = GeneratorState::Destroyed;
        log::info!("Generator destroyed");
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == GeneratorState::Paused
    }

    /// Whether the host should keep driving frames.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, GeneratorState::Uninitialised | GeneratorState::Destroyed)
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn animation_time_ms(&self) -> f64 {
        self.animation_time_ms
    }

    // -------------------------------------------------------------------------
    // Frames
    // -------------------------------------------------------------------------

    /// Advance one host frame. Only a running generator draws; frame rate is
    /// tracked in every live state.
    pub fn render(&mut self, tick: FrameTick) -> Result<(), GeneratorError> {
        if matches!(self.state, GeneratorState::Uninitialised | GeneratorState::Destroyed) {
            return Ok(());
        }
        if tick.delta_ms > 0.0 {
            self.fps.add_sample(1000.0 / tick.delta_ms);
        }
        if self.state != GeneratorState::Running {
            return Ok(());
        }

        self.animation_time_ms += tick.delta_ms;
        let time = self.shader_time();
        self.write_batch([(ParameterId::Time, ParameterValue::F32(time))])?;
        self.draw()
    }

    // -------------------------------------------------------------------------
    // Parameters
    // -------------------------------------------------------------------------

    /// Write one parameter and upload its whole buffer. A paused generator
    /// redraws once so the change is visible.
    pub fn update_parameter(&mut self, id: ParameterId, value: ParameterValue) -> Result<(), GeneratorError> {
        self.require_backend()?;
        self.write_batch([(id, value)])?;
        self.redraw_if_paused()
    }

    pub fn reset_animation_time(&mut self) -> Result<(), GeneratorError> {
        self.animation_time_ms = 0.0;
        self.update_parameter(ParameterId::Time, ParameterValue::F32(0.0))
    }

    /// Host surface resized; zero sizes are ignored.
    pub fn update_surface_size(&mut self, width: u32, height: u32) -> Result<(), GeneratorError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.require_backend()?.configure_surface(width, height);
        self.surface_size = UVec2::new(width, height);
        let params = self.canvas_parameters();
        self.write_batch(params)?;
        self.redraw_if_paused()
    }

    /// Render at `scale` × the surface size.
    pub fn update_canvas_resolution(&mut self, scale: f64) -> Result<(), GeneratorError> {
        self.require_backend()?;
        self.resolution_scale = scale;
        let params = self.canvas_parameters();
        self.write_batch(params)?;
        self.redraw_if_paused()
    }

    /// Recompute the width / height ratio from the current canvas.
    pub fn update_viewport_dimension_ratio(&mut self) -> Result<(), GeneratorError> {
        self.require_backend()?;
        let ratio = self.dimension_ratio();
        self.update_parameter(ParameterId::DimensionRatio, ParameterValue::F32(ratio))
    }

    /// `surface × resolution_scale`, shrunk with its aspect kept when a side
    /// would exceed the backend's texture limit.
    pub fn canvas_size(&self) -> UVec2 {
        let scale = if self.resolution_scale.is_finite() && self.resolution_scale > 0.0 {
            self.resolution_scale
        } else {
            1.0
        };
        let limit = self
            .backend
            .as_ref()
            .map_or(u32::MAX, B::max_canvas_dimension)
            .max(1) as f64;
        let requested = self.surface_size.as_dvec2() * scale;
        let fit = (limit / requested.max_element()).min(1.0);
        (requested * fit)
            .round()
            .clamp(DVec2::ONE, DVec2::splat(limit))
            .as_uvec2()
    }

    pub fn timing_measurements(&self) -> TimingMeasurements {
        TimingMeasurements {
            fps: self.fps.get(),
            cpu_time_ms: self.cpu_time.get(),
            compute_time_ms: self.compute_time.get(),
            render_time_ms: self.render_time.get(),
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn require_backend(&mut self) -> Result<&mut B, GeneratorError> {
        let state = self.state;
        self.backend.as_mut().ok_or(GeneratorError::NoBackend(state))
    }

    fn shader_time(&self) -> f32 {
        (self.animation_time_ms % TIME_WRAP_MS) as f32
    }

    fn dimension_ratio(&self) -> f32 {
        let canvas = self.canvas_size().as_vec2();
        canvas.x / canvas.y
    }

    /// Canvas dimensions and ratio; also resizes the backend's canvas.
    fn canvas_parameters(&mut self) -> Vec<(ParameterId, ParameterValue)> {
        let canvas = self.canvas_size();
        if let Some(backend) = self.backend.as_mut() {
            backend.resize_canvas(canvas.x, canvas.y);
        }
        vec![
            (
                ParameterId::CanvasDimensions,
                ParameterValue::F32Array(vec![canvas.x as f32, canvas.y as f32]),
            ),
            (ParameterId::DimensionRatio, ParameterValue::F32(self.dimension_ratio())),
        ]
    }

    fn write_configuration(&mut self, config: &Configuration) -> Result<(), GeneratorError> {
        self.resolution_scale = config.resolution_scale;
        let mut params = configuration_parameters(config);
        params.extend(self.canvas_parameters());
        params.push((ParameterId::Time, ParameterValue::F32(self.shader_time())));
        log::debug!("Writing {} parameters for {}", params.len(), config.id);
        self.write_batch(params)
    }

    /// Write every value, then upload each touched buffer once.
    fn write_batch(
        &mut self,
        params: impl IntoIterator<Item = (ParameterId, ParameterValue)>,
    ) -> Result<(), GeneratorError> {
        let mut touched = BTreeSet::new();
        for (id, value) in params {
            touched.insert(self.store.write(id, &value)?);
        }
        let Some(backend) = self.backend.as_mut() else {
            return Err(GeneratorError::NoBackend(self.state));
        };
        for buffer in touched {
            backend.upload(buffer, self.store.bytes(buffer));
        }
        Ok(())
    }

    fn redraw_if_paused(&mut self) -> Result<(), GeneratorError> {
        if self.state == GeneratorState::Paused {
            self.draw()?;
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<(), GeneratorError> {
        let state = self.state;
        let backend = self.backend.as_mut().ok_or(GeneratorError::NoBackend(state))?;
        let started = Instant::now();
        backend.draw()?;
        self.cpu_time.add_sample(started.elapsed().as_secs_f64() * 1000.0);
        let timings = backend.pass_timings();
        self.compute_time.add_sample(timings.compute_ms);
        self.render_time.add_sample(timings.render_ms);
        Ok(())
    }
}

impl<B: GpuBackend> Default for FractalGenerator<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PassTimings;
    use crate::layout::BufferName;
    use fractal_core::FunctionKind;

    #[derive(Default)]
    struct RecordingBackend {
        uploads: Vec<(BufferName, Vec<u8>)>,
        draws: usize,
        surface: (u32, u32),
        canvas: (u32, u32),
        texture_limit: Option<u32>,
        fail_next_draw: Option<wgpu::SurfaceError>,
    }

    impl GpuBackend for RecordingBackend {
        fn upload(&mut self, buffer: BufferName, bytes: &[u8]) {
            self.uploads.push((buffer, bytes.to_vec()));
        }

        fn configure_surface(&mut self, width: u32, height: u32) {
            self.surface = (width, height);
        }

        fn resize_canvas(&mut self, width: u32, height: u32) {
            self.canvas = (width, height);
        }

        fn max_canvas_dimension(&self) -> u32 {
            self.texture_limit.unwrap_or(8192)
        }

        fn draw(&mut self) -> Result<(), FrameError> {
            if let Some(e) = self.fail_next_draw.take() {
                return Err(e.into());
            }
            self.draws += 1;
            Ok(())
        }

        fn pass_timings(&self) -> PassTimings {
            PassTimings {
                compute_ms: 1.5,
                render_ms: 2.5,
            }
        }
    }

    // FractionValues is written by the compute pass only.
    fn host_buffers() -> impl Iterator<Item = BufferName> {
        BufferName::ALL
            .into_iter()
            .filter(|&b| b != BufferName::FractionValues)
    }

    fn tick(delta_ms: f64) -> FrameTick {
        FrameTick {
            time_ms: 0.0,
            delta_ms,
            index: 0,
        }
    }

    fn attached() -> FractalGenerator<RecordingBackend> {
        let mut generator = FractalGenerator::new();
        generator.attach(RecordingBackend::default(), 800, 600);
        generator
    }

    fn running() -> FractalGenerator<RecordingBackend> {
        let mut generator = attached();
        generator
            .start_animation(&Configuration::default_configuration())
            .unwrap();
        generator
    }

    fn draws(generator: &FractalGenerator<RecordingBackend>) -> usize {
        generator.backend().unwrap().draws
    }

    fn f32_param(generator: &FractalGenerator<RecordingBackend>, id: ParameterId) -> Vec<f32> {
        generator
            .store
            .read(id)
            .iter()
            .map(|&w| f32::from_bits(w))
            .collect()
    }

    // --- lifecycle -----------------------------------------------------------

    #[test]
    fn uninitialised_generator_does_nothing() {
        let mut generator = FractalGenerator::<RecordingBackend>::new();
        assert_eq!(generator.state(), GeneratorState::Uninitialised);
        assert!(!generator.is_active());
        generator.render(tick(16.0)).unwrap();
        assert!(matches!(
            generator.update_parameter(ParameterId::Bound, ParameterValue::F32(4.0)),
            Err(GeneratorError::NoBackend(GeneratorState::Uninitialised))
        ));
    }

    #[test]
    fn attached_generator_waits_for_start() {
        let mut generator = attached();
        assert_eq!(generator.state(), GeneratorState::Initialising);
        assert!(generator.is_active());
        generator.render(tick(16.0)).unwrap();
        assert_eq!(draws(&generator), 0);
    }

    #[test]
    fn start_uploads_every_host_buffer_once() {
        let generator = running();
        assert_eq!(generator.state(), GeneratorState::Running);
        let uploaded: Vec<BufferName> = generator
            .backend()
            .unwrap()
            .uploads
            .iter()
            .map(|(b, _)| *b)
            .collect();
        assert_eq!(uploaded, host_buffers().collect::<Vec<_>>());
        for (buffer, bytes) in &generator.backend().unwrap().uploads {
            assert_eq!(bytes.len() as u64, buffer.size_bytes());
        }
    }

    #[test]
    fn running_generator_draws_and_advances_time() {
        let mut generator = running();
        generator.render(tick(16.0)).unwrap();
        generator.render(tick(16.0)).unwrap();
        assert_eq!(draws(&generator), 2);
        assert_eq!(generator.animation_time_ms(), 32.0);
        assert_eq!(f32_param(&generator, ParameterId::Time), vec![32.0]);
    }

    #[test]
    fn paused_generator_skips_draws_but_tracks_fps() {
        let mut generator = running();
        generator.pause();
        assert!(generator.is_paused());
        generator.render(tick(20.0)).unwrap();
        assert_eq!(draws(&generator), 0);
        assert_eq!(generator.animation_time_ms(), 0.0);
        assert_eq!(generator.timing_measurements().fps, 50.0);

        generator.unpause();
        generator.render(tick(20.0)).unwrap();
        assert_eq!(draws(&generator), 1);
    }

    #[test]
    fn paused_parameter_update_draws_exactly_once() {
        let mut generator = running();
        generator.pause();
        generator
            .update_parameter(ParameterId::Iterations, ParameterValue::U32(50))
            .unwrap();
        assert_eq!(draws(&generator), 1);

        let (buffer, bytes) = generator.backend().unwrap().uploads.last().unwrap().clone();
        assert_eq!(buffer, BufferName::Fractal);
        assert_eq!(bytes.len() as u64, BufferName::Fractal.size_bytes());
        assert_eq!(&bytes[..4], &50u32.to_ne_bytes());
    }

    #[test]
    fn paused_ticks_around_an_update_add_a_single_draw() {
        let mut generator = running();
        generator.pause();
        generator.render(tick(16.0)).unwrap();
        generator
            .update_parameter(ParameterId::Bound, ParameterValue::F32(4.0))
            .unwrap();
        generator.render(tick(16.0)).unwrap();
        assert_eq!(draws(&generator), 1);
        assert_eq!(generator.animation_time_ms(), 0.0);
    }

    #[test]
    fn running_parameter_update_waits_for_the_next_frame() {
        let mut generator = running();
        generator
            .update_parameter(ParameterId::Epsilon, ParameterValue::F32(1e-3))
            .unwrap();
        assert_eq!(draws(&generator), 0);
    }

    #[test]
    fn binding_errors_surface() {
        let mut generator = running();
        assert!(matches!(
            generator.update_parameter(ParameterId::Iterations, ParameterValue::F32(1.0)),
            Err(GeneratorError::Binding(BindingError::ViewMismatch { .. }))
        ));
    }

    #[test]
    fn destroy_releases_the_backend() {
        let mut generator = running();
        generator.destroy();
        assert_eq!(generator.state(), GeneratorState::Destroyed);
        assert!(generator.backend().is_none());
        assert!(!generator.is_active());
        generator.render(tick(16.0)).unwrap();
        assert!(matches!(
            generator.update_parameter(ParameterId::Bound, ParameterValue::F32(4.0)),
            Err(GeneratorError::NoBackend(GeneratorState::Destroyed))
        ));
        generator.pause();
        assert_eq!(generator.state(), GeneratorState::Destroyed);
    }

    // --- viewport ------------------------------------------------------------

    #[test]
    fn canvas_follows_resolution_scale() {
        let mut generator = running();
        generator.update_canvas_resolution(0.5).unwrap();
        assert_eq!(generator.canvas_size(), UVec2::new(400, 300));
        assert_eq!(generator.backend().unwrap().canvas, (400, 300));
        assert_eq!(f32_param(&generator, ParameterId::CanvasDimensions), vec![400.0, 300.0]);
        assert_eq!(
            f32_param(&generator, ParameterId::DimensionRatio),
            vec![400.0f32 / 300.0]
        );
    }

    #[test]
    fn paused_canvas_change_redraws_once() {
        let mut generator = running();
        generator.pause();
        generator.update_canvas_resolution(2.0).unwrap();
        assert_eq!(draws(&generator), 1);
        assert_eq!(generator.backend().unwrap().canvas, (1600, 1200));
    }

    #[test]
    fn oversized_canvas_is_shrunk_to_the_texture_limit() {
        let mut generator = FractalGenerator::new();
        generator.attach(RecordingBackend::default(), 5120, 2880);
        generator
            .start_animation(&Configuration::default_configuration())
            .unwrap();
        generator.update_canvas_resolution(2.0).unwrap();
        assert_eq!(generator.canvas_size(), UVec2::new(8192, 4608));
        assert_eq!(generator.backend().unwrap().canvas, (8192, 4608));
        assert_eq!(f32_param(&generator, ParameterId::CanvasDimensions), vec![8192.0, 4608.0]);
        assert_eq!(
            f32_param(&generator, ParameterId::DimensionRatio),
            vec![8192.0f32 / 4608.0]
        );
    }

    #[test]
    fn canvas_respects_a_small_device_limit() {
        let backend = RecordingBackend {
            texture_limit: Some(1000),
            ..Default::default()
        };
        let mut generator = FractalGenerator::new();
        generator.attach(backend, 800, 600);
        generator.update_canvas_resolution(2.0).unwrap();
        assert_eq!(generator.canvas_size(), UVec2::new(1000, 750));
    }

    #[test]
    fn surface_resize_reconfigures_and_rescales() {
        let mut generator = running();
        generator.update_surface_size(1000, 500).unwrap();
        let backend = generator.backend().unwrap();
        assert_eq!(backend.surface, (1000, 500));
        assert_eq!(backend.canvas, (1000, 500));
        assert_eq!(f32_param(&generator, ParameterId::DimensionRatio), vec![2.0]);

        generator.update_surface_size(0, 500).unwrap();
        assert_eq!(generator.backend().unwrap().surface, (1000, 500));
    }

    #[test]
    fn dimension_ratio_can_be_refreshed() {
        let mut generator = running();
        generator
            .update_parameter(ParameterId::DimensionRatio, ParameterValue::F32(9.0))
            .unwrap();
        generator.update_viewport_dimension_ratio().unwrap();
        assert_eq!(
            f32_param(&generator, ParameterId::DimensionRatio),
            vec![800.0f32 / 600.0]
        );
    }

    // --- configuration -------------------------------------------------------

    #[test]
    fn reset_rewinds_the_clock() {
        let mut generator = running();
        generator.render(tick(100.0)).unwrap();
        generator.reset_animation_time().unwrap();
        assert_eq!(generator.animation_time_ms(), 0.0);
        assert_eq!(f32_param(&generator, ParameterId::Time), vec![0.0]);
    }

    #[test]
    fn uploaded_time_wraps_and_keeps_frame_spacing() {
        let mut generator = running();
        generator.render(tick(86_400_000.0)).unwrap();
        let before = f32_param(&generator, ParameterId::Time)[0];
        generator.render(tick(16.0)).unwrap();
        let after = f32_param(&generator, ParameterId::Time)[0];
        assert_eq!(generator.animation_time_ms(), 86_400_016.0);
        assert!(f64::from(before) < TIME_WRAP_MS);
        assert_eq!(after - before, 16.0);
    }

    #[test]
    fn applying_a_configuration_keeps_the_clock() {
        let mut generator = running();
        generator.render(tick(40.0)).unwrap();
        let mut config = Configuration::default_configuration();
        config.function.set_function_type(FunctionKind::Newton);
        generator.apply_configuration(&config).unwrap();
        assert_eq!(generator.animation_time_ms(), 40.0);
        assert_eq!(generator.store.read(ParameterId::FunctionType), &[1]);
    }

    // --- errors and metrics --------------------------------------------------

    #[test]
    fn frame_errors_propagate() {
        let mut generator = running();
        generator
            .backend
            .as_mut()
            .unwrap()
            .fail_next_draw = Some(wgpu::SurfaceError::Lost);
        assert!(matches!(
            generator.render(tick(16.0)),
            Err(GeneratorError::Frame(FrameError::Surface(wgpu::SurfaceError::Lost)))
        ));
        generator.render(tick(16.0)).unwrap();
        assert_eq!(draws(&generator), 1);
    }

    #[test]
    fn pass_timings_feed_the_measurements() {
        let mut generator = running();
        for _ in 0..3 {
            generator.render(tick(10.0)).unwrap();
        }
        let m = generator.timing_measurements();
        assert_eq!(m.fps, 100.0);
        assert_eq!(m.compute_time_ms, 1.5);
        assert_eq!(m.render_time_ms, 2.5);
        assert!(m.cpu_time_ms >= 0.0);
    }
}
