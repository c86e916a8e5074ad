//! GPU side of the fractal engine: the parameter → buffer map, host backing
//! stores, the wgpu backend and the generator state machine that drives it.

pub mod backend;
pub mod buffers;
pub mod context;
pub mod frame;
pub mod generator;
pub mod layout;
pub mod pipeline;
pub mod renderer;
pub mod rolling_average;
pub mod timing;

pub use backend::{FrameError, GpuBackend, PassTimings};
pub use buffers::{BindingError, BufferStore};
pub use context::{GpuContext, InitError};
pub use frame::{FrameClock, FrameTick};
pub use generator::{FractalGenerator, GeneratorError, GeneratorState, TimingMeasurements};
pub use layout::{BufferName, ParameterId, ParameterValue};
pub use renderer::WgpuBackend;
pub use rolling_average::RollingAverage;
