use wgpu::{BindGroupLayout, ComputePipeline, Device, RenderPipeline, Sampler, TextureFormat};

use crate::layout::{BufferKind, BufferName};

pub const FRACTAL_WGSL: &str = include_str!("../shaders/fractal.wgsl");

/// Format of the offscreen canvas the fractal is rendered into.
pub const CANVAS_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Full-screen quad that samples the offscreen canvas and presents it to the
/// surface at whatever size the surface has.
pub const FULLSCREEN_WGSL: &str = r#"
struct VertexOut {
    @builtin(position) pos: vec4<f32>,
    @location(0)       uv:  vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VertexOut {
    var positions = array<vec2<f32>, 6>(
        vec2(-1.0, -1.0), vec2( 1.0, -1.0), vec2(-1.0,  1.0),
        vec2(-1.0,  1.0), vec2( 1.0, -1.0), vec2( 1.0,  1.0),
    );
    let p = positions[vi];
    var out: VertexOut;
    out.pos = vec4(p, 0.0, 1.0);
    // Canvas rows run top-down.
    out.uv  = vec2(p.x * 0.5 + 0.5, 0.5 - p.y * 0.5);
    return out;
}

@group(0) @binding(0) var t_canvas: texture_2d<f32>;
@group(0) @binding(1) var s_canvas: sampler;

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    return textureSample(t_canvas, s_canvas, in.uv);
}
"#;

/// Everything that depends only on the device and surface format: the
/// parameter bind-group layout, the compute + fractal render pipelines and
/// the blit that scales the canvas onto the surface.
pub struct FractalPipelines {
    pub bind_group_layout: BindGroupLayout,
    pub compute: ComputePipeline,
    pub render: RenderPipeline,

    pub blit_layout: BindGroupLayout,
    pub blit_sampler: Sampler,
    pub blit: RenderPipeline,
}

impl FractalPipelines {
    pub fn new(device: &Device, surface_format: TextureFormat) -> Self {
        // --- parameter bind group layout ---------------------------------------
        // One entry per BufferName, slot = binding().
        let entries: Vec<_> = BufferName::ALL.iter().map(|&b| layout_entry(b)).collect();
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fractal_bgl"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fractal_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fractal"),
            source: wgpu::ShaderSource::Wgsl(FRACTAL_WGSL.into()),
        });

        // --- pipelines ---------------------------------------------------------
        let compute = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("fractal_compute"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "cs_main",
            compilation_options: Default::default(),
            cache: None,
        });

        let render = fullscreen_pipeline(device, "fractal_render", &pipeline_layout, &module, CANVAS_FORMAT);

        let (blit_layout, blit_sampler, blit) = build_blit_pipeline(device, surface_format);

        Self {
            bind_group_layout,
            compute,
            render,
            blit_layout,
            blit_sampler,
            blit,
        }
    }
}

fn layout_entry(buffer: BufferName) -> wgpu::BindGroupLayoutEntry {
    let ty = match buffer.kind() {
        BufferKind::Uniform => wgpu::BufferBindingType::Uniform,
        BufferKind::Storage { read_only } => wgpu::BufferBindingType::Storage { read_only },
    };
    wgpu::BindGroupLayoutEntry {
        binding: buffer.binding(),
        visibility: buffer.visibility(),
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(buffer.size_bytes()),
        },
        count: None,
    }
}

fn fullscreen_pipeline(
    device: &Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    format: TextureFormat,
) -> RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: "vs_main",
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn build_blit_pipeline(device: &Device, surface_format: TextureFormat) -> (BindGroupLayout, Sampler, RenderPipeline) {
    let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("blit_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("blit_sampler"),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        ..Default::default()
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("blit_pl"),
        bind_group_layouts: &[&blit_layout],
        push_constant_ranges: &[],
    });

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen"),
        source: wgpu::ShaderSource::Wgsl(FULLSCREEN_WGSL.into()),
    });

    let blit = fullscreen_pipeline(device, "blit", &pipeline_layout, &module, surface_format);
    (blit_layout, blit_sampler, blit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    fn parse(src: &str) -> naga::Module {
        let module = naga::front::wgsl::parse_str(src).unwrap_or_else(|e| panic!("{}", e.emit_to_string(src)));
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .unwrap_or_else(|e| panic!("{e:?}"));
        module
    }

    fn entry_points(module: &naga::Module) -> Vec<(&str, naga::ShaderStage)> {
        module
            .entry_points
            .iter()
            .map(|ep| (ep.name.as_str(), ep.stage))
            .collect()
    }

    #[test]
    fn fractal_shader_validates_with_all_entry_points() {
        let module = parse(FRACTAL_WGSL);
        let eps = entry_points(&module);
        assert!(eps.contains(&("cs_main", naga::ShaderStage::Compute)));
        assert!(eps.contains(&("vs_main", naga::ShaderStage::Vertex)));
        assert!(eps.contains(&("fs_main", naga::ShaderStage::Fragment)));
    }

    #[test]
    fn fractal_shader_bindings_match_the_buffer_layout() {
        let module = parse(FRACTAL_WGSL);
        let ctx = module.to_ctx();
        for buffer in BufferName::ALL {
            let (_, global) = module
                .global_variables
                .iter()
                .find(|(_, g)| {
                    g.binding
                        .as_ref()
                        .is_some_and(|rb| rb.group == 0 && rb.binding == buffer.binding())
                })
                .unwrap_or_else(|| panic!("no global at binding {} ({buffer:?})", buffer.binding()));

            match (buffer.kind(), global.space) {
                (BufferKind::Uniform, naga::AddressSpace::Uniform) => {}
                (BufferKind::Storage { read_only }, naga::AddressSpace::Storage { access }) => {
                    assert_eq!(
                        access.contains(naga::StorageAccess::STORE),
                        !read_only,
                        "{buffer:?} access {access:?}"
                    );
                }
                (kind, space) => panic!("{buffer:?}: {kind:?} bound as {space:?}"),
            }

            let shader_size = module.types[global.ty].inner.size(ctx) as u64;
            assert!(
                shader_size <= buffer.size_bytes(),
                "{buffer:?}: shader reads {shader_size} bytes, buffer has {}",
                buffer.size_bytes()
            );
        }
    }

    #[test]
    fn blit_shader_validates() {
        let module = parse(FULLSCREEN_WGSL);
        let eps = entry_points(&module);
        assert_eq!(
            eps,
            vec![("vs_main", naga::ShaderStage::Vertex), ("fs_main", naga::ShaderStage::Fragment)]
        );
    }
}
