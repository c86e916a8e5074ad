use std::sync::Arc;

use fractal_gpu::{FrameError, GeneratorError};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod app;
mod input;

use app::App;
use input::Key;

// ---------------------------------------------------------------------------
// Handler — winit ApplicationHandler
// ---------------------------------------------------------------------------

struct Handler {
    window: Option<Arc<Window>>,
    app: Option<App>,
}

/// Map a winit key code to our library-independent `Key`.
fn key_from_code(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::Digit1 => Key::Digit1,
        KeyCode::Digit2 => Key::Digit2,
        KeyCode::Digit3 => Key::Digit3,
        KeyCode::Space => Key::Space,
        KeyCode::Equal | KeyCode::NumpadAdd => Key::Equal,
        KeyCode::Minus | KeyCode::NumpadSubtract => Key::Minus,
        KeyCode::BracketLeft => Key::BracketLeft,
        KeyCode::BracketRight => Key::BracketRight,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyQ => Key::Q,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    })
}

impl ApplicationHandler for Handler {
    /// Called once on desktop when the event loop starts.
    /// Creates the window then initialises the GPU generator.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title("Fractal Explorer")
            .with_inner_size(winit::dpi::LogicalSize::new(800u32, 600u32));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        log::info!("Window created (800×600)");

        match App::new(Arc::clone(&window)) {
            Ok(app) => {
                self.window = Some(window);
                self.app = Some(app);
            }
            Err(e) => {
                log::error!("GPU initialisation failed: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(app) = &mut self.app else {
            return;
        };
        match event {
            // ----------------------------------------------------------------
            // Exit
            // ----------------------------------------------------------------
            WindowEvent::CloseRequested => {
                log::info!("Close requested — exiting");
                app.shutdown();
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if let Some(key) = key_from_code(code) {
                    if app.on_key_pressed(key) {
                        log::info!("Quit requested — exiting");
                        event_loop.exit();
                    }
                }
            }

            // ----------------------------------------------------------------
            // Resize — reconfigure the surface and canvas
            // ----------------------------------------------------------------
            WindowEvent::Resized(new_size) => {
                app.resize(new_size.width, new_size.height);
            }

            // ----------------------------------------------------------------
            // Redraw — one generator frame
            // ----------------------------------------------------------------
            WindowEvent::RedrawRequested => match app.render() {
                Ok(()) => {}
                // Surface lost / outdated: reconfigure and try again next frame.
                Err(GeneratorError::Frame(FrameError::Surface(
                    wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
                ))) => {
                    if let Some(window) = &self.window {
                        let size = window.inner_size();
                        app.resize(size.width, size.height);
                    }
                }
                Err(GeneratorError::Frame(FrameError::Surface(wgpu::SurfaceError::OutOfMemory))) => {
                    log::error!("GPU out of memory — exiting");
                    app.shutdown();
                    event_loop.exit();
                }
                Err(e) => log::warn!("render error: {e:?}"),
            },

            _ => {}
        }
    }

    /// Keep frames coming while the generator is alive.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        let active = self.app.as_ref().is_some_and(App::is_active);
        if let (true, Some(window)) = (active, &self.window) {
            window.request_redraw();
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("failed to create event loop: {e}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut handler = Handler {
        window: None,
        app: None,
    };
    if let Err(e) = event_loop.run_app(&mut handler) {
        log::error!("event loop error: {e}");
    }
}
