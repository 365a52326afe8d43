//! Per-frame drawing of the globe, lit cities and active connections.
//!
//! A frame is two scene passes over the same geometry. The glow pass draws
//! into the low-resolution [`GlowStage`] target with the globe acting only
//! as a depth occluder; the screen pass draws everything in full color with
//! MSAA. The blurred glow is then added on top of the screen.

use glam::{Mat4, Vec4};
use pulse_graph::{ArcVertex, CityVertex, EdgeId, Graph, SignalView, write_lit_cities};

use crate::buffer::{BufferAllocator, DynamicVertexBuffer, MeshBuffer, VertexBuffer};
use crate::camera::OrbitCamera;
use crate::depth::DepthBuffer;
use crate::globe::GlobeMesh;
use crate::glow::{GLOW_FORMAT, GlowSettings, GlowStage};
use crate::pass::{ColorTarget, RenderPassBuilder};
use crate::pipeline::{Programs, SPRITE_VERTICES, ScenePipelines, TargetDesc};
use crate::shader::{ShaderError, ShaderProgram};
use crate::uniform::{UniformBlock, UniformRing, UniformSlot, UniformValue};

const GLOBE_FRONT: Vec4 = Vec4::splat(0.6);
const GLOBE_BACK: Vec4 = Vec4::splat(0.4);
const AMBER: Vec4 = Vec4::new(1.0, 0.35, 0.0, 1.0);
const GLOW_AMBER: Vec4 = Vec4::new(0.5, 0.35, 0.0, 1.0);

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Screen pass sample count; anything other than 1 or 4 is rounded.
    pub msaa_samples: u32,
    pub glow: bool,
    pub glow_settings: GlowSettings,
    pub globe_subdivisions: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            msaa_samples: 4,
            glow: true,
            glow_settings: GlowSettings::default(),
            globe_subdivisions: 6,
        }
    }
}

/// Sample counts every wgpu backend supports for color targets.
pub fn normalized_msaa(samples: u32) -> u32 {
    if samples > 1 { 4 } else { 1 }
}

/// What one [`GlobeRenderer::render`] call drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub num_active_cities: u32,
    pub edges_drawn: u32,
}

/// Colors for one scene pass.
struct PassColors {
    globe_front: Vec4,
    globe_back: Vec4,
    cities: Vec4,
    connections: Vec4,
}

const GLOW_PASS: PassColors = PassColors {
    globe_front: Vec4::ZERO,
    globe_back: Vec4::ZERO,
    cities: AMBER,
    connections: GLOW_AMBER,
};

const SCREEN_PASS: PassColors = PassColors {
    globe_front: GLOBE_FRONT,
    globe_back: GLOBE_BACK,
    cities: AMBER,
    connections: AMBER,
};

/// Uniform record offsets for one scene pass.
#[derive(Default)]
struct PassRecords {
    globe_front: u32,
    globe_back: u32,
    cities: u32,
    connections: Vec<(EdgeId, u32)>,
}

#[derive(Clone, Copy)]
struct ColorSlots {
    mvp: UniformSlot,
    color: UniformSlot,
}

impl ColorSlots {
    fn of(program: &ShaderProgram) -> Result<Self, ShaderError> {
        Ok(Self {
            mvp: program.uniform_location("mvp")?,
            color: program.uniform_location("color")?,
        })
    }
}

/// Everything the passes draw from.
struct SceneGeometry {
    globe: MeshBuffer,
    arcs: VertexBuffer<ArcVertex>,
    cities: DynamicVertexBuffer<CityVertex>,
}

pub struct GlobeRenderer {
    camera: OrbitCamera,
    settings: RenderSettings,
    programs: Programs,
    ring: UniformRing,
    screen_pipelines: ScenePipelines,
    glow: Option<(GlowStage, ScenePipelines)>,
    geometry: SceneGeometry,
    depth: DepthBuffer,
    msaa_target: Option<ColorTarget>,
    surface_format: wgpu::TextureFormat,
    size: (u32, u32),
    globe_slots: ColorSlots,
    city_slots: ColorSlots,
    connection_slots: ColorSlots,
    tex_offset_slot: UniformSlot,
    aspect_slot: UniformSlot,
    glow_records: PassRecords,
    screen_records: PassRecords,
}

impl GlobeRenderer {
    /// Link programs, build pipelines and upload the static geometry for `graph`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        graph: &Graph,
        camera: OrbitCamera,
        mut settings: RenderSettings,
    ) -> Result<Self, ShaderError> {
        settings.msaa_samples = normalized_msaa(settings.msaa_samples);
        let size = (width.max(1), height.max(1));

        let programs = Programs::link(device)?;
        let ring = UniformRing::new(device, programs.max_uniform_size());

        let screen_pipelines = ScenePipelines::new(
            device,
            &programs,
            ring.layout(),
            TargetDesc {
                format: surface_format,
                sample_count: settings.msaa_samples,
            },
        )?;

        let glow = if settings.glow {
            let stage = GlowStage::new(device, surface_format, size.0, size.1, settings.glow_settings.clone());
            let pipelines = ScenePipelines::new(
                device,
                &programs,
                ring.layout(),
                TargetDesc {
                    format: GLOW_FORMAT,
                    sample_count: 1,
                },
            )?;
            Some((stage, pipelines))
        } else {
            None
        };

        let allocator = BufferAllocator::new(device);
        let mesh = GlobeMesh::icosphere(settings.globe_subdivisions);
        log::info!(
            "Globe mesh: {} vertices, {} triangles",
            mesh.vertices.len(),
            mesh.triangle_count()
        );
        let geometry = SceneGeometry {
            globe: mesh.upload(&allocator),
            arcs: allocator.create_vertices("arcs", graph.arc_vertices()),
            cities: allocator.create_dynamic("cities", graph.vertex_count()),
        };

        let globe_slots = ColorSlots::of(&programs.globe)?;
        let city_slots = ColorSlots::of(&programs.cities)?;
        let connection_slots = ColorSlots::of(&programs.connections)?;
        let tex_offset_slot = programs.connections.uniform_location("tex_offset")?;
        let aspect_slot = programs.cities.uniform_location("aspect")?;

        Ok(Self {
            depth: DepthBuffer::new(device, size.0, size.1, settings.msaa_samples),
            msaa_target: create_msaa_target(device, surface_format, size, settings.msaa_samples),
            camera,
            settings,
            programs,
            ring,
            screen_pipelines,
            glow,
            geometry,
            surface_format,
            size,
            globe_slots,
            city_slots,
            connection_slots,
            tex_offset_slot,
            aspect_slot,
            glow_records: PassRecords::default(),
            screen_records: PassRecords::default(),
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn programs(&self) -> &Programs {
        &self.programs
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Width over height of the render target.
    pub fn aspect(&self) -> f32 {
        self.size.0 as f32 / self.size.1 as f32
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if size == self.size {
            return;
        }
        self.size = size;
        self.depth.resize(device, size.0, size.1);
        self.msaa_target = create_msaa_target(device, self.surface_format, size, self.settings.msaa_samples);
        if let Some((stage, _)) = &mut self.glow {
            stage.resize(device, size.0, size.1);
        }
    }

    /// Encode one frame into `encoder`, drawing onto `surface_view`.
    ///
    /// Refills the city buffer from the current signals, then runs the glow
    /// pass (when enabled), the screen pass and the glow composite.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        graph: &Graph,
        signals: &SignalView<'_>,
        cur_time: f32,
    ) -> Result<FrameStats, ShaderError> {
        let num_active_cities = {
            let mut mapped = self.geometry.cities.map_for_write(queue);
            let written = write_lit_cities(graph, signals, &mut mapped[..]);
            mapped.set_len(written);
            written as u32
        };

        let aspect = self.aspect();
        let mvp = self.camera.mvp(aspect, cur_time);

        self.ring.reset();
        let mut glow_records = std::mem::take(&mut self.glow_records);
        let mut screen_records = std::mem::take(&mut self.screen_records);
        if self.glow.is_some() {
            self.push_records(&mut glow_records, &GLOW_PASS, mvp, aspect, signals)?;
        }
        self.push_records(&mut screen_records, &SCREEN_PASS, mvp, aspect, signals)?;
        self.ring.flush(device, queue);

        if let Some((stage, pipelines)) = &self.glow {
            let (color, depth) = stage.target();
            let mut pass = RenderPassBuilder::new()
                .depth(depth, DepthBuffer::CLEAR_VALUE)
                .label("glow-source")
                .begin(encoder, color);
            self.draw_scene(&mut pass, pipelines, &glow_records, graph);
        }

        {
            let builder = RenderPassBuilder::new()
                .depth(&self.depth.view, DepthBuffer::CLEAR_VALUE)
                .label("screen");
            let mut pass = match &self.msaa_target {
                Some(msaa) => builder.msaa_resolve(surface_view).begin(encoder, &msaa.view),
                None => builder.begin(encoder, surface_view),
            };
            self.draw_scene(&mut pass, &self.screen_pipelines, &screen_records, graph);
        }

        if let Some((stage, _)) = &self.glow {
            stage.render(encoder, surface_view);
        }

        let stats = FrameStats {
            num_active_cities,
            edges_drawn: screen_records.connections.len() as u32,
        };
        self.glow_records = glow_records;
        self.screen_records = screen_records;
        Ok(stats)
    }

    fn push_records(
        &mut self,
        records: &mut PassRecords,
        colors: &PassColors,
        mvp: Mat4,
        aspect: f32,
        signals: &SignalView<'_>,
    ) -> Result<(), ShaderError> {
        let globe = &self.programs.globe;
        let cities = &self.programs.cities;
        let connections = &self.programs.connections;
        let ring = &mut self.ring;

        let mut colored = |block: &UniformBlock, slots: ColorSlots, color: Vec4| -> Result<u32, ShaderError> {
            let mut writer = ring.push(block);
            writer
                .set_uniform(slots.mvp, UniformValue::Mat4(mvp))?
                .set_uniform(slots.color, UniformValue::Vec4(color))?;
            Ok(writer.offset())
        };

        records.globe_front = colored(globe.uniforms(), self.globe_slots, colors.globe_front)?;
        records.globe_back = colored(globe.uniforms(), self.globe_slots, colors.globe_back)?;
        records.cities = {
            let mut writer = ring.push(cities.uniforms());
            writer
                .set_uniform(self.city_slots.mvp, UniformValue::Mat4(mvp))?
                .set_uniform(self.city_slots.color, UniformValue::Vec4(colors.cities))?
                .set_uniform(self.aspect_slot, UniformValue::Float(aspect))?;
            writer.offset()
        };

        records.connections.clear();
        for (edge, elapsed) in signals.active_edges() {
            let mut writer = ring.push(connections.uniforms());
            writer
                .set_uniform(self.connection_slots.mvp, UniformValue::Mat4(mvp))?
                .set_uniform(self.connection_slots.color, UniformValue::Vec4(colors.connections))?
                .set_uniform(self.tex_offset_slot, UniformValue::Float(elapsed))?;
            records.connections.push((edge, writer.offset()));
        }
        Ok(())
    }

    fn draw_scene(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipelines: &ScenePipelines,
        records: &PassRecords,
        graph: &Graph,
    ) {
        let geometry = &self.geometry;

        geometry.globe.bind(pass);
        pass.set_pipeline(&pipelines.globe_front);
        self.ring.bind(pass, records.globe_front);
        geometry.globe.draw(pass);
        pass.set_pipeline(&pipelines.globe_back);
        self.ring.bind(pass, records.globe_back);
        geometry.globe.draw(pass);

        let city_count = geometry.cities.draw_count();
        if city_count > 0 {
            pass.set_pipeline(&pipelines.cities);
            self.ring.bind(pass, records.cities);
            geometry.cities.bind(pass, 0);
            pass.draw(0..SPRITE_VERTICES, 0..city_count);
        }

        if !records.connections.is_empty() {
            pass.set_pipeline(&pipelines.connections);
            geometry.arcs.bind(pass, 0);
            for &(edge, offset) in &records.connections {
                self.ring.bind(pass, offset);
                geometry.arcs.draw(pass, graph.edge(edge).arc.clone());
            }
        }
    }
}

fn create_msaa_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    size: (u32, u32),
    sample_count: u32,
) -> Option<ColorTarget> {
    (sample_count > 1).then(|| {
        ColorTarget::new(device, "msaa-color", format, size, sample_count, wgpu::TextureUsages::empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;
    use pulse_graph::{GeoCoord, GraphParams, PropagationEngine, PropagationParams};

    fn small_graph() -> Graph {
        let coords = [
            GeoCoord::new(51.51, -0.13),
            GeoCoord::new(48.86, 2.35),
            GeoCoord::new(52.52, 13.40),
        ];
        Graph::build(&coords, &GraphParams::default())
    }

    fn small_settings(glow: bool) -> RenderSettings {
        RenderSettings {
            glow,
            globe_subdivisions: 2,
            ..RenderSettings::default()
        }
    }

    fn render_once(renderer: &mut GlobeRenderer, device: &wgpu::Device, queue: &wgpu::Queue, graph: &Graph, engine: &PropagationEngine) -> FrameStats {
        let target = ColorTarget::new(
            device,
            "frame",
            wgpu::TextureFormat::Bgra8UnormSrgb,
            renderer.size(),
            1,
            wgpu::TextureUsages::empty(),
        );
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let stats = renderer
            .render(device, queue, &mut encoder, &target.view, graph, &engine.view(), 1.0)
            .unwrap();
        queue.submit([encoder.finish()]);
        stats
    }

    #[test]
    fn test_msaa_normalization() {
        assert_eq!(normalized_msaa(0), 1);
        assert_eq!(normalized_msaa(1), 1);
        assert_eq!(normalized_msaa(2), 4);
        assert_eq!(normalized_msaa(4), 4);
        assert_eq!(normalized_msaa(8), 4);
    }

    #[test]
    fn test_pass_colors() {
        assert_eq!(GLOW_PASS.globe_front, Vec4::ZERO);
        assert_eq!(GLOW_PASS.globe_back, Vec4::ZERO);
        assert_eq!(GLOW_PASS.connections, Vec4::new(0.5, 0.35, 0.0, 1.0));
        assert_eq!(SCREEN_PASS.globe_front, Vec4::splat(0.6));
        assert_eq!(SCREEN_PASS.globe_back, Vec4::splat(0.4));
        assert_eq!(SCREEN_PASS.connections, Vec4::new(1.0, 0.35, 0.0, 1.0));
    }

    #[test]
    fn test_dark_frame_draws_only_the_globe() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let graph = small_graph();
        let engine = PropagationEngine::new(&graph, PropagationParams::default());
        let mut renderer = GlobeRenderer::new(
            &device,
            wgpu::TextureFormat::Bgra8UnormSrgb,
            64,
            64,
            &graph,
            OrbitCamera::default(),
            small_settings(true),
        )
        .unwrap();

        let stats = render_once(&mut renderer, &device, &queue, &graph, &engine);
        assert_eq!(stats, FrameStats::default());
    }

    #[test]
    fn test_active_edges_and_cities_are_counted() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let graph = small_graph();
        assert!(graph.edge_count() > 0);
        let mut engine = PropagationEngine::new(&graph, PropagationParams::default());
        engine.activate(0);
        for _ in 0..10 {
            engine.tick(&graph);
        }

        for glow in [true, false] {
            let mut renderer = GlobeRenderer::new(
                &device,
                wgpu::TextureFormat::Bgra8UnormSrgb,
                48,
                32,
                &graph,
                OrbitCamera::default(),
                small_settings(glow),
            )
            .unwrap();
            let stats = render_once(&mut renderer, &device, &queue, &graph, &engine);
            assert_eq!(stats.edges_drawn, 1);
            assert_eq!(stats.num_active_cities, 1);
        }
    }

    #[test]
    fn test_empty_graph_renders() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let graph = Graph::build(&[], &GraphParams::default());
        let engine = PropagationEngine::new(&graph, PropagationParams::default());
        let mut renderer = GlobeRenderer::new(
            &device,
            wgpu::TextureFormat::Bgra8UnormSrgb,
            16,
            16,
            &graph,
            OrbitCamera::default(),
            small_settings(true),
        )
        .unwrap();
        assert_eq!(render_once(&mut renderer, &device, &queue, &graph, &engine), FrameStats::default());

        renderer.resize(&device, 40, 20);
        assert_eq!(renderer.size(), (40, 20));
        assert_eq!(renderer.aspect(), 2.0);
        assert_eq!(render_once(&mut renderer, &device, &queue, &graph, &engine), FrameStats::default());
    }
}
