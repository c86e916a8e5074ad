use wgpu::{BindGroup, Buffer, Texture, TextureView};

use crate::backend::{FrameError, GpuBackend, PassTimings};
use crate::context::GpuContext;
use crate::layout::{BufferKind, BufferName, FRACTION_VALUE_COUNT};
use crate::pipeline::{FractalPipelines, CANVAS_FORMAT};
use crate::timing::PassTimer;

const WORKGROUP_SIZE: u32 = 64;

/// Offscreen texture the fractal is rendered into at canvas resolution.
struct Canvas {
    _texture: Texture,
    view: TextureView,
    blit_bind_group: BindGroup,
    width: u32,
    height: u32,
}

impl Canvas {
    fn new(device: &wgpu::Device, pipelines: &FractalPipelines, width: u32, height: u32) -> Self {
        let limit = device.limits().max_texture_dimension_2d;
        let width = width.clamp(1, limit);
        let height = height.clamp(1, limit);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("fractal_canvas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CANVAS_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit_bg"),
            layout: &pipelines.blit_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&pipelines.blit_sampler),
                },
            ],
        });
        Self {
            _texture: texture,
            view,
            blit_bind_group,
            width,
            height,
        }
    }
}

/// `GpuBackend` over a real device: one buffer per `BufferName`, a single
/// bind group, and per-pass timers.
pub struct WgpuBackend {
    context: GpuContext,
    pipelines: FractalPipelines,
    buffers: Vec<Buffer>,
    bind_group: BindGroup,
    canvas: Canvas,
    compute_timer: PassTimer,
    render_timer: PassTimer,
}

impl WgpuBackend {
    pub fn new(context: GpuContext) -> Self {
        let device = &context.device;
        let pipelines = FractalPipelines::new(device, context.format());

        // --- parameter buffers -----------------------------------------------
        let buffers: Vec<Buffer> = BufferName::ALL
            .iter()
            .map(|&b| {
                let usage = match b.kind() {
                    BufferKind::Uniform => wgpu::BufferUsages::UNIFORM,
                    BufferKind::Storage { .. } => wgpu::BufferUsages::STORAGE,
                };
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(b.label()),
                    size: b.size_bytes(),
                    usage: usage | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let entries: Vec<_> = BufferName::ALL
            .iter()
            .map(|&b| wgpu::BindGroupEntry {
                binding: b.binding(),
                resource: buffers[b.index()].as_entire_binding(),
            })
            .collect();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fractal_bg"),
            layout: &pipelines.bind_group_layout,
            entries: &entries,
        });

        let canvas = Canvas::new(
            device,
            &pipelines,
            context.surface_config.width,
            context.surface_config.height,
        );
        let compute_timer = PassTimer::new(device, &context.queue, "compute_timer");
        let render_timer = PassTimer::new(device, &context.queue, "render_timer");

        Self {
            context,
            pipelines,
            buffers,
            bind_group,
            canvas,
            compute_timer,
            render_timer,
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn upload(&mut self, buffer: BufferName, bytes: &[u8]) {
        self.context
            .queue
            .write_buffer(&self.buffers[buffer.index()], 0, bytes);
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        self.context.configure_surface(width, height);
    }

    fn resize_canvas(&mut self, width: u32, height: u32) {
        let limit = self.max_canvas_dimension();
        let (width, height) = (width.clamp(1, limit), height.clamp(1, limit));
        if (width, height) == (self.canvas.width, self.canvas.height) {
            return;
        }
        self.canvas = Canvas::new(&self.context.device, &self.pipelines, width, height);
        log::debug!("Canvas resized to {}×{}", width, height);
    }

    fn max_canvas_dimension(&self) -> u32 {
        self.context.device.limits().max_texture_dimension_2d
    }

    /// One command buffer: coefficient compute pass, fractal render pass into
    /// the canvas, blit onto the surface.
    fn draw(&mut self) -> Result<(), FrameError> {
        // Collect timings from earlier frames without waiting.
        self.context.device.poll(wgpu::Maintain::Poll);
        self.compute_timer.poll();
        self.render_timer.poll();

        let output = self.context.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        // --- 1. Coefficient trajectories -------------------------------------
        {
            let mut pass = self.compute_timer.begin_compute_pass(&mut encoder, "fractal_compute");
            pass.set_pipeline(&self.pipelines.compute);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups((FRACTION_VALUE_COUNT as u32).div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        self.compute_timer.resolve(&mut encoder);

        // --- 2. Fractal into the canvas --------------------------------------
        {
            let mut pass = self.render_timer.begin_render_pass(
                &mut encoder,
                wgpu::RenderPassDescriptor {
                    label: Some("fractal_render"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &self.canvas.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                },
            );
            pass.set_pipeline(&self.pipelines.render);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
        self.render_timer.resolve(&mut encoder);

        // --- 3. Canvas onto the surface --------------------------------------
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blit"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipelines.blit);
            pass.set_bind_group(0, &self.canvas.blit_bind_group, &[]);
            pass.draw(0..6, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        self.compute_timer.after_submit();
        self.render_timer.after_submit();
        output.present();
        Ok(())
    }

    fn pass_timings(&self) -> PassTimings {
        PassTimings {
            compute_ms: self.compute_timer.result_ms(),
            render_ms: self.render_timer.result_ms(),
        }
    }
}
