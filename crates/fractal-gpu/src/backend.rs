use crate::layout::BufferName;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
}

/// GPU time of the last completed frame, per pass. Zero until measured.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassTimings {
    pub compute_ms: f64,
    pub render_ms: f64,
}

/// What the generator needs from the device.
///
/// `WgpuBackend` is the real implementation; tests drive the generator's
/// state machine through a recording fake.
pub trait GpuBackend {
    /// Replace the whole of `buffer` with `bytes`.
    fn upload(&mut self, buffer: BufferName, bytes: &[u8]);

    /// Reconfigure the presentation surface.
    fn configure_surface(&mut self, width: u32, height: u32);

    /// Reallocate the offscreen canvas the fractal is rendered into.
    fn resize_canvas(&mut self, width: u32, height: u32);

    /// Largest canvas side the device accepts.
    fn max_canvas_dimension(&self) -> u32;

    /// Compute pass, render pass, blit and present.
    fn draw(&mut self) -> Result<(), FrameError>;

    fn pass_timings(&self) -> PassTimings;
}
