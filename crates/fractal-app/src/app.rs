use std::sync::Arc;
use std::time::Instant;

use fractal_core::{Attractor, Configuration, FunctionKind, RandomFunctionOptions, MAX_ATTRACTORS};
use fractal_gpu::{
    FractalGenerator, FrameClock, GeneratorError, InitError, ParameterId, ParameterValue, WgpuBackend,
};
use winit::window::Window;

use crate::input::{action_for_key, scale_iterations, step_resolution, InputAction, Key};

// ---------------------------------------------------------------------------
// Once-per-second metrics report
// ---------------------------------------------------------------------------

struct ReportTimer {
    last_report: Instant,
}

impl ReportTimer {
    fn new() -> Self {
        Self {
            last_report: Instant::now(),
        }
    }

    /// True once a full second has elapsed since the last report.
    fn due(&mut self) -> bool {
        if self.last_report.elapsed().as_secs_f32() >= 1.0 {
            self.last_report = Instant::now();
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    generator: FractalGenerator<WgpuBackend>,
    configuration: Configuration,
    random_options: RandomFunctionOptions,
    rng: fastrand::Rng,

    // Frame timing
    clock: FrameClock,
    report: ReportTimer,
}

impl App {
    /// Bring up the GPU for `window` and start the default configuration.
    pub fn new(window: Arc<Window>) -> Result<Self, InitError> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let mut generator = FractalGenerator::initialise(Arc::clone(&window), width, height)?;
        let configuration = Configuration::default_configuration();
        log_failure("start animation", generator.start_animation(&configuration));

        Ok(Self {
            generator,
            configuration,
            random_options: RandomFunctionOptions::default(),
            rng: fastrand::Rng::new(),
            clock: FrameClock::new(),
            report: ReportTimer::new(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.generator.is_active()
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if self.is_active() {
            log_failure("resize", self.generator.update_surface_size(new_width, new_height));
        }
    }

    /// Returns `true` if the app should exit.
    pub fn on_key_pressed(&mut self, key: Key) -> bool {
        self.handle_action(action_for_key(key))
    }

    /// Release the GPU; no frame is submitted afterwards.
    pub fn shutdown(&mut self) {
        self.generator.destroy();
    }

    /// Apply an action to the app state.
    ///
    /// Returns `true` if the app should exit (i.e. action was `Quit`).
    pub fn handle_action(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::TogglePause => {
                if self.generator.is_paused() {
                    self.generator.unpause();
                } else {
                    self.generator.pause();
                }
                log::info!("Paused: {}", self.generator.is_paused());
            }

            InputAction::ResetTime => {
                log_failure("reset time", self.generator.reset_animation_time());
            }

            InputAction::Randomise => {
                let mut next = Configuration::random(&mut self.rng, &self.random_options);
                next.resolution_scale = self.configuration.resolution_scale;
                log::info!("Random configuration: {}", next.function);
                self.configuration = next;
                log_failure(
                    "apply configuration",
                    self.generator.apply_configuration(&self.configuration),
                );
            }

            InputAction::SetFunctionKind(kind) => {
                self.configuration.function.set_function_type(kind);
                if kind != FunctionKind::Default && self.configuration.attractors.is_empty() {
                    let count = self
                        .configuration
                        .function
                        .numerator()
                        .degree()
                        .clamp(1, MAX_ATTRACTORS);
                    self.configuration.attractors =
                        (0..count).map(|_| Attractor::random(&mut self.rng, 1.5)).collect();
                }
                log::info!("Function: {}", self.configuration.function);
                log_failure(
                    "apply configuration",
                    self.generator.apply_configuration(&self.configuration),
                );
            }

            InputAction::ResolutionUp | InputAction::ResolutionDown => {
                let up = action == InputAction::ResolutionUp;
                let scale = step_resolution(self.configuration.resolution_scale, up);
                self.configuration.resolution_scale = scale;
                log::debug!("resolution scale → {scale}");
                log_failure("resolution", self.generator.update_canvas_resolution(scale));
            }

            InputAction::IterationsHalve | InputAction::IterationsDouble => {
                let double = action == InputAction::IterationsDouble;
                let iterations = scale_iterations(self.configuration.iterations, double);
                self.configuration.iterations = iterations;
                log::debug!("iterations → {iterations}");
                log_failure(
                    "iterations",
                    self.generator
                        .update_parameter(ParameterId::Iterations, ParameterValue::U32(iterations)),
                );
            }

            InputAction::Quit => {
                self.shutdown();
                return true;
            }
        }
        false
    }

    // -------------------------------------------------------------------------
    // Render
    // -------------------------------------------------------------------------

    /// Advance the clock and draw one frame if the generator is running.
    pub fn render(&mut self) -> Result<(), GeneratorError> {
        let tick = self.clock.tick();
        let result = self.generator.render(tick);

        if self.report.due() {
            let m = self.generator.timing_measurements();
            log::debug!(
                "frame {} @ {:.1} s  FPS: {:.1}  cpu: {:.2} ms  compute: {:.3} ms  render: {:.3} ms  iter: {}",
                tick.index,
                tick.time_ms / 1000.0,
                m.fps,
                m.cpu_time_ms,
                m.compute_time_ms,
                m.render_time_ms,
                self.configuration.iterations,
            );
        }
        result
    }
}

/// Generator errors outside the frame path indicate a bug; log and carry on.
fn log_failure(what: &str, result: Result<(), GeneratorError>) {
    if let Err(e) = result {
        log::error!("{what} failed: {e}");
    }
}
