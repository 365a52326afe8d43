//! Shader programs and render pipelines for the globe, city sprites and
//! connection arcs.

use pulse_graph::{ArcVertex, CityVertex};

use crate::depth::DepthBuffer;
use crate::globe::GlobeVertex;
use crate::shader::{ShaderError, ShaderLibrary, ShaderProgram, ShaderStage};
use crate::uniform::{UniformBlock, UniformKind};

const GLOBE_VERTEX: &str = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return draw.mvp * vec4<f32>(position, 1.0);
}
"#;

const GLOBE_FRAGMENT: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return draw.color;
}
"#;

const CITIES_VERTEX: &str = r#"
const SPRITE_RADIUS: f32 = 0.012;

struct SpriteOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) corner: vec2<f32>,
    @location(1) intensity: f32,
};

@vertex
fn vs_main(
    @builtin(vertex_index) index: u32,
    @location(0) position: vec3<f32>,
    @location(1) intensity: f32,
) -> SpriteOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[index];

    var out: SpriteOutput;
    let center = draw.mvp * vec4<f32>(position, 1.0);
    // Clip space is stretched horizontally by the aspect ratio; undo it so
    // sprites stay round.
    let offset = corner * SPRITE_RADIUS * center.w;
    out.clip = center + vec4<f32>(offset.x / draw.aspect, offset.y, 0.0, 0.0);
    out.corner = corner;
    out.intensity = intensity;
    return out;
}
"#;

const CITIES_FRAGMENT: &str = r#"
@fragment
fn fs_main(in: SpriteOutput) -> @location(0) vec4<f32> {
    let r2 = dot(in.corner, in.corner);
    if (r2 > 1.0) {
        discard;
    }
    return vec4<f32>(draw.color.rgb, draw.color.a * in.intensity * (1.0 - r2));
}
"#;

const CONNECTIONS_VERTEX: &str = r#"
struct ArcOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) t: f32,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) t: f32) -> ArcOutput {
    var out: ArcOutput;
    out.clip = draw.mvp * vec4<f32>(position, 1.0);
    out.t = t;
    return out;
}
"#;

// The head of the signal sits at `tex_offset`; the trail behind it fades
// towards a dim baseline and nothing is drawn ahead of it.
const CONNECTIONS_FRAGMENT: &str = r#"
@fragment
fn fs_main(in: ArcOutput) -> @location(0) vec4<f32> {
    let behind = draw.tex_offset - in.t;
    if (behind < 0.0) {
        discard;
    }
    let fade = mix(0.3, 1.0, exp(-6.0 * behind));
    return vec4<f32>(draw.color.rgb, draw.color.a * fade);
}
"#;

/// Number of vertices in one city sprite (two triangles).
pub const SPRITE_VERTICES: u32 = 6;

pub fn arc_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<ArcVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

/// One [`CityVertex`] per sprite instance.
pub fn city_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<CityVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &ATTRIBUTES,
    }
}

/// The three linked programs and the library holding their modules.
pub struct Programs {
    pub globe: ShaderProgram,
    pub cities: ShaderProgram,
    pub connections: ShaderProgram,
    library: ShaderLibrary,
}

impl Programs {
    /// Build and link all programs.
    pub fn link(device: &wgpu::Device) -> Result<Self, ShaderError> {
        let mut programs = Self::unlinked();
        for program in [
            &mut programs.globe,
            &mut programs.cities,
            &mut programs.connections,
        ] {
            program.link(device, &mut programs.library)?;
        }
        log::debug!("Linked {} shader programs", programs.library.len());
        Ok(programs)
    }

    fn unlinked() -> Self {
        let colored = || UniformBlock::new(&[("mvp", UniformKind::Mat4), ("color", UniformKind::Vec4)]);

        let mut globe = ShaderProgram::new("globe", colored());
        globe
            .add_shader(ShaderStage::Vertex, GLOBE_VERTEX)
            .add_shader(ShaderStage::Fragment, GLOBE_FRAGMENT);

        let mut cities = ShaderProgram::new(
            "cities",
            UniformBlock::new(&[
                ("mvp", UniformKind::Mat4),
                ("color", UniformKind::Vec4),
                ("aspect", UniformKind::Float),
            ]),
        );
        cities
            .add_shader(ShaderStage::Vertex, CITIES_VERTEX)
            .add_shader(ShaderStage::Fragment, CITIES_FRAGMENT);

        let mut connections = ShaderProgram::new(
            "connections",
            UniformBlock::new(&[
                ("mvp", UniformKind::Mat4),
                ("color", UniformKind::Vec4),
                ("tex_offset", UniformKind::Float),
            ]),
        );
        connections
            .add_shader(ShaderStage::Vertex, CONNECTIONS_VERTEX)
            .add_shader(ShaderStage::Fragment, CONNECTIONS_FRAGMENT);

        Self {
            globe,
            cities,
            connections,
            library: ShaderLibrary::new(),
        }
    }

    /// Largest uniform record any program needs.
    pub fn max_uniform_size(&self) -> u32 {
        [&self.globe, &self.cities, &self.connections]
            .iter()
            .map(|p| p.uniforms().size())
            .max()
            .unwrap_or(16)
    }
}

/// Color format and sample count the pipelines render into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDesc {
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
}

/// Pipelines for one render target.
pub struct ScenePipelines {
    pub globe_front: wgpu::RenderPipeline,
    pub globe_back: wgpu::RenderPipeline,
    pub cities: wgpu::RenderPipeline,
    pub connections: wgpu::RenderPipeline,
    target: TargetDesc,
}

struct PipelineDesc<'a> {
    label: &'a str,
    program: &'a ShaderProgram,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    depth_write: bool,
}

impl ScenePipelines {
    pub fn new(
        device: &wgpu::Device,
        programs: &Programs,
        uniform_layout: &wgpu::BindGroupLayout,
        target: TargetDesc,
    ) -> Result<Self, ShaderError> {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene-pipeline-layout"),
            bind_group_layouts: &[uniform_layout],
            immediate_size: 0,
        });

        let build = |desc: PipelineDesc<'_>| -> Result<wgpu::RenderPipeline, ShaderError> {
            let module = desc.program.module()?;
            Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some(ShaderStage::Vertex.entry_point()),
                    buffers: desc.buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: desc.topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: desc.cull_mode,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(DepthBuffer::depth_stencil_state(desc.depth_write)),
                multisample: wgpu::MultisampleState {
                    count: target.sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(ShaderStage::Fragment.entry_point()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview_mask: None,
                cache: None,
            }))
        };

        let globe_buffers = [GlobeVertex::layout()];
        let globe = |label, cull_mode| PipelineDesc {
            label,
            program: &programs.globe,
            buffers: &globe_buffers,
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: Some(cull_mode),
            depth_write: true,
        };

        Ok(Self {
            globe_front: build(globe("globe-front", wgpu::Face::Back))?,
            globe_back: build(globe("globe-back", wgpu::Face::Front))?,
            cities: build(PipelineDesc {
                label: "cities",
                program: &programs.cities,
                buffers: &[city_instance_layout()],
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                depth_write: false,
            })?,
            connections: build(PipelineDesc {
                label: "connections",
                program: &programs.connections,
                buffers: &[arc_vertex_layout()],
                topology: wgpu::PrimitiveTopology::LineStrip,
                cull_mode: None,
                depth_write: false,
            })?,
            target,
        })
    }

    pub fn target(&self) -> TargetDesc {
        self.target
    }
}
