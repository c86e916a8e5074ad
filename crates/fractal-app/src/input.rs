use fractal_core::FunctionKind;

pub const MIN_RESOLUTION_SCALE: f64 = 0.25;
pub const MAX_RESOLUTION_SCALE: f64 = 2.0;
pub const RESOLUTION_STEP: f64 = 0.25;
pub const MIN_ITERATIONS: u32 = 10;
pub const MAX_ITERATIONS: u32 = 1000;

// ---------------------------------------------------------------------------
// Key — windowing-library-independent key representation
// ---------------------------------------------------------------------------

/// A keyboard key, independent of any windowing library.
///
/// `main.rs` maps `winit::keyboard::PhysicalKey` → `Key`; everything else
/// in the input pipeline works purely with this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit1,
    Digit2,
    Digit3,
    Space,
    Equal, // = / + (same physical key; Shift state ignored)
    Minus, // - / _ (same physical key; Shift state ignored)
    BracketLeft,
    BracketRight,
    R,
    N,
    Q,
    Escape,
}

// ---------------------------------------------------------------------------
// InputAction — what the app does in response to input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    TogglePause,
    ResetTime,
    Randomise,
    SetFunctionKind(FunctionKind),
    ResolutionUp,
    ResolutionDown,
    IterationsHalve,
    IterationsDouble,
    Quit,
}

/// Translate a `Key` press into an `InputAction`.
pub fn action_for_key(key: Key) -> InputAction {
    match key {
        Key::Space => InputAction::TogglePause,
        Key::R => InputAction::ResetTime,
        Key::N => InputAction::Randomise,
        Key::Digit1 => InputAction::SetFunctionKind(FunctionKind::Default),
        Key::Digit2 => InputAction::SetFunctionKind(FunctionKind::Newton),
        Key::Digit3 => InputAction::SetFunctionKind(FunctionKind::Fraction),
        Key::Equal => InputAction::ResolutionUp,
        Key::Minus => InputAction::ResolutionDown,
        Key::BracketLeft => InputAction::IterationsHalve,
        Key::BracketRight => InputAction::IterationsDouble,
        Key::Q | Key::Escape => InputAction::Quit,
    }
}

// ---------------------------------------------------------------------------
// Knob arithmetic (pure, testable)
// ---------------------------------------------------------------------------

/// One resolution step up or down, clamped to \[0.25, 2.0\].
pub fn step_resolution(scale: f64, up: bool) -> f64 {
    let next = if up {
        scale + RESOLUTION_STEP
    } else {
        scale - RESOLUTION_STEP
    };
    next.clamp(MIN_RESOLUTION_SCALE, MAX_RESOLUTION_SCALE)
}

/// Halve or double an iteration count, clamped to \[10, 1000\].
pub fn scale_iterations(iterations: u32, double: bool) -> u32 {
    let next = if double {
        iterations.saturating_mul(2)
    } else {
        iterations / 2
    };
    next.clamp(MIN_ITERATIONS, MAX_ITERATIONS)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
