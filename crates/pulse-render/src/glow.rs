//! Offscreen glow: a low-resolution copy of the bright geometry, blurred with
//! a separable Gaussian and added on top of the finished frame.
//!
//! Usage per frame: render into [`GlowStage::target`], end that pass, draw
//! the screen pass, then call [`GlowStage::render`] with the screen view.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::depth::DepthBuffer;
use crate::pass::ColorTarget;

/// Color format of the glow source and blur textures.
pub const GLOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Normalized weights of a 9-tap Gaussian (sigma about 1.5): center, then
/// each symmetric pair.
pub const GAUSSIAN_WEIGHTS: [f32; 5] = [
    0.227_027_03,
    0.194_594_6,
    0.121_621_62,
    0.054_054_055,
    0.016_216_216,
];

#[derive(Debug, Clone, PartialEq)]
pub struct GlowSettings {
    /// Target resolution divisor; values below 1 are treated as 1.
    pub downscale: u32,
    /// Blur tap spacing in glow texels.
    pub radius: f32,
    /// Multiplier applied when adding the glow to the frame.
    pub intensity: f32,
}

impl Default for GlowSettings {
    fn default() -> Self {
        Self {
            downscale: 2,
            radius: 1.0,
            intensity: 1.0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct BlurParams {
    direction: [f32; 2],
    radius: f32,
    intensity: f32,
}

const GLOW_SHADER_SOURCE: &str = r#"
struct BlurParams {
    direction: vec2<f32>,
    radius: f32,
    intensity: f32,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: BlurParams;
@group(1) @binding(0) var source: texture_2d<f32>;
@group(1) @binding(1) var source_sampler: sampler;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_blur(in: VertexOutput) -> @location(0) vec4<f32> {
    var weights = array<f32, 5>(0.22702703, 0.1945946, 0.12162162, 0.054054055, 0.016216216);
    let texel_step = params.direction * params.radius / vec2<f32>(textureDimensions(source));
    var sum = textureSample(source, source_sampler, in.uv) * weights[0];
    for (var i = 1; i < 5; i++) {
        let offset = texel_step * f32(i);
        sum += textureSample(source, source_sampler, in.uv + offset) * weights[i];
        sum += textureSample(source, source_sampler, in.uv - offset) * weights[i];
    }
    return sum;
}

@fragment
fn fs_composite(in: VertexOutput) -> @location(0) vec4<f32> {
    let glow = textureSample(source, source_sampler, in.uv);
    return vec4<f32>(glow.rgb * params.intensity, 0.0);
}
"#;

/// Glow resolution for a `width` x `height` frame, never below 1x1.
pub fn glow_size(width: u32, height: u32, downscale: u32) -> (u32, u32) {
    let downscale = downscale.max(1);
    ((width / downscale).max(1), (height / downscale).max(1))
}

struct GlowTextures {
    source: ColorTarget,
    depth: DepthBuffer,
    ping: ColorTarget,
    pong: ColorTarget,
    source_group: wgpu::BindGroup,
    ping_group: wgpu::BindGroup,
    pong_group: wgpu::BindGroup,
}

pub struct GlowStage {
    settings: GlowSettings,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    horizontal_buffer: wgpu::Buffer,
    vertical_buffer: wgpu::Buffer,
    horizontal_params: wgpu::BindGroup,
    vertical_params: wgpu::BindGroup,
    textures: GlowTextures,
    size: (u32, u32),
}

impl GlowStage {
    /// `format` is the format of the view the glow is composited onto;
    /// `width` and `height` are the full frame size.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        settings: GlowSettings,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glow-shader"),
            source: wgpu::ShaderSource::Wgsl(GLOW_SHADER_SOURCE.into()),
        });

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glow-params-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(std::mem::size_of::<BlurParams>() as u64),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glow-texture-layout"),
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

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glow-layout"),
            bind_group_layouts: &[&params_layout, &texture_layout],
            immediate_size: 0,
        });

        let blur_pipeline = fullscreen_pipeline(device, &shader, &layout, "fs_blur", GLOW_FORMAT, None, "glow-blur");
        let composite_pipeline = fullscreen_pipeline(
            device,
            &shader,
            &layout,
            "fs_composite",
            format,
            Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Zero,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            "glow-composite",
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("glow-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let params_buffer = |label, direction| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&blur_params(&settings, direction)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        };
        let horizontal_buffer = params_buffer("glow-horizontal", [1.0, 0.0]);
        let vertical_buffer = params_buffer("glow-vertical", [0.0, 1.0]);
        let params_group = |label, buffer: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &params_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        };
        let horizontal_params = params_group("glow-horizontal-params", &horizontal_buffer);
        let vertical_params = params_group("glow-vertical-params", &vertical_buffer);

        let size = glow_size(width, height, settings.downscale);
        let textures = create_textures(device, &texture_layout, &sampler, size);
        log::debug!("Glow stage at {}x{}", size.0, size.1);

        Self {
            settings,
            texture_layout,
            sampler,
            blur_pipeline,
            composite_pipeline,
            horizontal_buffer,
            vertical_buffer,
            horizontal_params,
            vertical_params,
            textures,
            size,
        }
    }

    /// Color and depth views the glow source pass renders into.
    pub fn target(&self) -> (&wgpu::TextureView, &wgpu::TextureView) {
        (&self.textures.source.view, &self.textures.depth.view)
    }

    pub fn width(&self) -> u32 {
        self.size.0
    }

    pub fn height(&self) -> u32 {
        self.size.1
    }

    pub fn settings(&self) -> &GlowSettings {
        &self.settings
    }

    /// Recreate the low-resolution textures for a new frame size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let size = glow_size(width, height, self.settings.downscale);
        if size == self.size {
            return;
        }
        self.textures = create_textures(device, &self.texture_layout, &self.sampler, size);
        self.size = size;
    }

    /// Update radius and intensity. A changed downscale takes effect on the
    /// next resize.
    pub fn set_settings(&mut self, queue: &wgpu::Queue, settings: GlowSettings) {
        queue.write_buffer(&self.horizontal_buffer, 0, bytemuck::bytes_of(&blur_params(&settings, [1.0, 0.0])));
        queue.write_buffer(&self.vertical_buffer, 0, bytemuck::bytes_of(&blur_params(&settings, [0.0, 1.0])));
        self.settings = settings;
    }

    /// Blur the glow source and add it onto `dest`, which is loaded rather
    /// than cleared.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, dest: &wgpu::TextureView) {
        let t = &self.textures;
        self.run_pass(
            encoder,
            &self.blur_pipeline,
            &self.horizontal_params,
            &t.source_group,
            &t.ping.view,
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            "glow-blur-horizontal",
        );
        self.run_pass(
            encoder,
            &self.blur_pipeline,
            &self.vertical_params,
            &t.ping_group,
            &t.pong.view,
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            "glow-blur-vertical",
        );
        self.run_pass(
            encoder,
            &self.composite_pipeline,
            &self.horizontal_params,
            &t.pong_group,
            dest,
            wgpu::LoadOp::Load,
            "glow-composite",
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        params: &wgpu::BindGroup,
        source: &wgpu::BindGroup,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
        label: &str,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, params, &[]);
        pass.set_bind_group(1, source, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn blur_params(settings: &GlowSettings, direction: [f32; 2]) -> BlurParams {
    BlurParams {
        direction,
        radius: settings.radius,
        intensity: settings.intensity,
    }
}

fn create_textures(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    size: (u32, u32),
) -> GlowTextures {
    let color = |label| ColorTarget::new(device, label, GLOW_FORMAT, size, 1, wgpu::TextureUsages::TEXTURE_BINDING);
    let source = color("glow-source");
    let ping = color("glow-ping");
    let pong = color("glow-pong");

    let sampled = |label, target: &ColorTarget| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&target.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    };

    GlowTextures {
        source_group: sampled("glow-source-group", &source),
        ping_group: sampled("glow-ping-group", &ping),
        pong_group: sampled("glow-pong-group", &pong),
        depth: DepthBuffer::new(device, size.0, size.1, 1),
        source,
        ping,
        pong,
    }
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}
