//! Window creation and the winit event loop.
//!
//! Each redraw renders the current propagation state, optionally saves the
//! frame, then advances the [`FrameClock`] and runs the ticks it asks for.

use std::sync::Arc;

use glam::Vec3;
use pulse_config::Config;
use pulse_graph::{ARC_SAMPLES, GraphParams, PropagationParams, Simulation, SimulationParams, world_cities};
use pulse_render::{
    FrameEncoder, FrameStats, GlobeRenderer, GlowSettings, OrbitCamera, RenderContext,
    RenderSettings, SurfaceError, init_render_context_blocking,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::capture::{CaptureError, FrameCapture};
use crate::error::AppError;
use crate::frame_clock::FrameClock;

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ))
}

pub fn simulation_params(config: &Config) -> SimulationParams {
    SimulationParams {
        graph: GraphParams {
            threshold: config.graph.threshold,
            min_height: config.graph.min_height,
            max_height: config.graph.max_height,
            arc_samples: ARC_SAMPLES,
        },
        propagation: PropagationParams {
            step: config.propagation.step,
            fan_out: config.propagation.fan_out as usize,
        },
        seed_one_in: config.graph.seed_one_in,
    }
}

pub fn render_settings(config: &Config) -> RenderSettings {
    RenderSettings {
        msaa_samples: config.render.msaa_samples,
        glow: config.render.glow,
        glow_settings: GlowSettings {
            downscale: config.render.glow_downscale,
            radius: config.render.glow_radius,
            intensity: config.render.glow_intensity,
        },
        globe_subdivisions: config.render.globe_subdivisions,
    }
}

pub fn camera_from_config(config: &Config) -> OrbitCamera {
    OrbitCamera {
        eye: Vec3::from_array(config.camera.eye),
        fov_y: config.camera.fov_y_degrees.to_radians(),
        angular_speed: config.camera.angular_speed,
        phase: config.camera.phase,
        ..OrbitCamera::default()
    }
}

/// Application state: the simulation always exists, the window and GPU
/// resources appear once the event loop resumes.
pub struct App {
    config: Config,
    simulation: Simulation,
    clock: FrameClock,
    capture: Option<FrameCapture>,
    window: Option<Arc<Window>>,
    gpu: Option<RenderContext>,
    renderer: Option<GlobeRenderer>,
    last_stats: FrameStats,
    error: Option<AppError>,
}

impl App {
    /// Build the city graph and seed its signals. A missing `rng_seed` draws
    /// a fresh one, which is logged so the run can be reproduced.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let seed = config.graph.rng_seed.unwrap_or_else(rand::random);
        info!("Propagation seed: {seed}");
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let simulation = Simulation::new(world_cities(), &simulation_params(&config), &mut rng);

        let capture = FrameCapture::from_config(&config.capture)?;
        let clock = FrameClock::from_config(&config);

        Ok(Self {
            config,
            simulation,
            clock,
            capture,
            window: None,
            gpu: None,
            renderer: None,
            last_stats: FrameStats::default(),
            error: None,
        })
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Stats from the most recent rendered frame.
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// The fatal error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<AppError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window = Arc::new(event_loop.create_window(window_attributes_from_config(&self.config))?);
        let gpu = init_render_context_blocking(window.clone(), self.config.window.vsync)?;

        let renderer = GlobeRenderer::new(
            &gpu.device,
            gpu.surface_format,
            gpu.width(),
            gpu.height(),
            self.simulation.graph(),
            camera_from_config(&self.config),
            render_settings(&self.config),
        )?;
        info!(
            "Renderer ready: {}x{} {:?}",
            gpu.width(),
            gpu.height(),
            gpu.surface_format
        );

        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        // Minimized windows report a zero size; keep the old surface.
        if width == 0 || height == 0 {
            return;
        }
        if let (Some(gpu), Some(renderer)) = (&mut self.gpu, &mut self.renderer) {
            gpu.resize(width, height);
            renderer.resize(&gpu.device, width, height);
            debug!("Resized to {width}x{height}");
        }
    }

    /// Render the current state, save it if capturing, then run the ticks
    /// the clock hands out.
    fn draw_frame(&mut self) -> Result<(), AppError> {
        let (Some(gpu), Some(renderer)) = (self.gpu.as_ref(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let mut frame = FrameEncoder::new(&gpu.device, gpu.get_current_texture()?);
        let stats = {
            let (encoder, surface_view) = frame.parts();
            renderer.render(
                &gpu.device,
                &gpu.queue,
                encoder,
                surface_view,
                self.simulation.graph(),
                &self.simulation.signals(),
                self.clock.cur_time(),
            )?
        };
        let readback = if self.capture.is_some() {
            frame.copy_surface_to_buffer(&gpu.device)
        } else {
            None
        };
        frame.submit(&gpu.queue);

        if let Some(capture) = self.capture.as_mut() {
            let readback = readback.ok_or(CaptureError::SurfaceNotReadable)?;
            let path = capture.save(&gpu.device, &readback)?;
            debug!("Saved {}", path.display());
        }

        let advance = self.clock.advance();
        for _ in 0..advance.ticks {
            self.simulation.step();
        }
        self.last_stats = stats;
        self.log_stats();
        Ok(())
    }

    fn log_stats(&self) {
        let interval = u64::from(self.config.debug.stats_interval);
        let frame = self.clock.frame_count();
        if interval > 0 && frame % interval == 0 {
            info!(
                frame,
                ticks = self.simulation.ticks(),
                active_edges = self.last_stats.edges_drawn,
                lit_cities = self.last_stats.num_active_cities,
                completed = self.simulation.signals().completed_count(),
                "propagation"
            );
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        match self.draw_frame() {
            Ok(()) => {}
            Err(AppError::Surface(SurfaceError::Timeout)) => {
                warn!("Surface timeout, skipping frame");
            }
            Err(AppError::Surface(SurfaceError::Lost)) => {
                warn!("Surface lost, reconfiguring");
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.resize(size.width, size.height);
                }
            }
            Err(err) => {
                self.fail(event_loop, err);
                return;
            }
        }

        if let Some(capture) = &self.capture
            && capture.is_done()
        {
            info!("Captured {} frames, exiting", capture.written());
            event_loop.exit();
            return;
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init_graphics(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                info!("Escape pressed, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    debug!("Scale factor changed to {scale_factor:.2}");
                    self.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Creates an event loop and runs the globe until the window closes, Escape
/// is pressed or the requested frames are captured.
#[instrument(skip(config))]
pub fn run(config: Config) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;
    match app.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.graph.rng_seed = Some(7);
        config
    }

    #[test]
    fn test_simulation_params_follow_config() {
        let mut config = Config::default();
        config.graph.threshold = 0.5;
        config.propagation.fan_out = 5;
        config.graph.seed_one_in = 0;

        let params = simulation_params(&config);
        assert_eq!(params.graph.threshold, 0.5);
        assert_eq!(params.graph.arc_samples, ARC_SAMPLES);
        assert_eq!(params.propagation.fan_out, 5);
        assert_eq!(params.seed_one_in, 0);
    }

    #[test]
    fn test_default_config_matches_library_defaults() {
        let config = Config::default();
        assert_eq!(simulation_params(&config), SimulationParams::default());
        assert_eq!(render_settings(&config), RenderSettings::default());
        let camera = camera_from_config(&config);
        let expected = OrbitCamera::default();
        assert_eq!(camera.eye, expected.eye);
        assert!((camera.fov_y - expected.fov_y).abs() < 1e-6);
        assert_eq!(camera.angular_speed, expected.angular_speed);
        assert_eq!(camera.phase, expected.phase);
    }

    #[test]
    fn test_render_settings_follow_config() {
        let mut config = Config::default();
        config.render.glow = false;
        config.render.glow_downscale = 4;
        config.render.msaa_samples = 1;
        let settings = render_settings(&config);
        assert!(!settings.glow);
        assert_eq!(settings.glow_settings.downscale, 4);
        assert_eq!(settings.msaa_samples, 1);
    }

    #[test]
    fn test_app_starts_without_window() {
        let mut app = App::new(quiet_config()).unwrap();
        assert!(app.window.is_none());
        assert!(app.gpu.is_none());
        assert!(app.take_error().is_none());
        assert_eq!(app.clock().cur_time(), 0.0);
        assert!(app.simulation().graph().vertex_count() > 0);
        assert_eq!(app.last_stats(), FrameStats::default());
    }

    #[test]
    fn test_seed_makes_runs_repeatable() {
        let a = App::new(quiet_config()).unwrap();
        let b = App::new(quiet_config()).unwrap();
        let lit_a: Vec<_> = a.simulation().signals().active_edges().collect();
        let lit_b: Vec<_> = b.simulation().signals().active_edges().collect();
        assert_eq!(lit_a, lit_b);
    }

    #[test]
    fn test_draw_without_gpu_is_noop() {
        let mut app = App::new(quiet_config()).unwrap();
        app.draw_frame().unwrap();
        assert_eq!(app.simulation().ticks(), 0);
        assert_eq!(app.clock().frame_count(), 0);
    }

    #[test]
    fn test_capture_dir_created_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quiet_config();
        config.capture.frames = 2;
        config.capture.output_dir = dir.path().join("out");
        let app = App::new(config).unwrap();
        assert!(dir.path().join("out").is_dir());
        assert!(app.capture.as_ref().is_some_and(|c| !c.is_done()));
    }
}
