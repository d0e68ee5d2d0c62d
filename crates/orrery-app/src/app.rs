//! The winit application: window and GPU bootstrap, input mapping, and the
//! per-frame loop closing the quality feedback cycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use orrery_config::Config;
use orrery_lod::{ControllerParams, QualityController};
use orrery_render::{
    OrbitCamera, RenderContext, SurfaceError, TextureCache, create_depth_texture,
    init_render_context_blocking,
};
use orrery_scene::{BodyRegistry, SceneRenderer};
use orrery_texture::{MatteOutcome, MattingParams, MattingPipeline};

use crate::assets::submit_body_textures;
use crate::frame::FrameClock;
use crate::hud::format_hud;

/// Matting worker threads. Startup submits ten-odd images at most.
const MATTING_WORKERS: usize = 2;
/// In-flight matting snapshot budget.
const MATTING_BUDGET: usize = 16;
/// How often the window title refreshes.
const HUD_INTERVAL: Duration = Duration::from_secs(1);

/// Mouse drag sensitivity, radians per pixel.
const DRAG_SENSITIVITY: f32 = 0.005;
/// Zoom factor per scroll line.
const ZOOM_STEP: f32 = 0.9;

/// GPU-backed state created once the window exists.
struct GpuState {
    window: Arc<Window>,
    ctx: RenderContext,
    depth_view: wgpu::TextureView,
    textures: TextureCache,
    scene: SceneRenderer,
}

/// The application. Owns the closed loop: measured frame duration goes into
/// the quality controller, whose tier shapes the next frame's LOD ceilings
/// and effect passes.
pub struct App {
    config: Config,
    texture_dir: PathBuf,
    gpu: Option<GpuState>,

    registry: BodyRegistry,
    camera: OrbitCamera,
    controller: QualityController,
    matting: MattingPipeline,
    clock: FrameClock,

    sim_time: f64,
    time_scale: f64,
    paused: bool,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
    last_hud_update: Instant,
}

impl App {
    /// Build the pre-window state from a validated configuration.
    pub fn new(config: Config, texture_dir: PathBuf) -> Self {
        let controller = QualityController::new(&ControllerParams {
            target_fps: config.render.target_fps,
            min_lod_level: config.render.min_lod_level,
            max_lod_level: config.render.max_lod_level,
            history_len: config.quality.history_len,
            upper_hysteresis: config.quality.upper_hysteresis,
            lower_hysteresis: config.quality.lower_hysteresis,
            sustain_frames: config.quality.sustain_frames,
            adaptive: config.render.adaptive_quality,
        });
        let matting = MattingPipeline::new(
            MATTING_WORKERS,
            MATTING_BUDGET,
            MattingParams {
                color_threshold: config.matting.color_threshold,
                border_agreement: config.matting.border_agreement,
                edge_softness: config.matting.edge_softness,
            },
        );
        let aspect = config.window.width as f32 / config.window.height.max(1) as f32;

        Self {
            config,
            texture_dir,
            gpu: None,
            registry: BodyRegistry::solar_system(),
            camera: OrbitCamera::new(200.0, aspect),
            controller,
            matting,
            clock: FrameClock::new(),
            sim_time: 0.0,
            time_scale: 1.0,
            paused: false,
            dragging: false,
            last_cursor: None,
            last_hud_update: Instant::now(),
        }
    }

    fn window_attributes(&self) -> WindowAttributes {
        let mut attrs = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window.width as f64,
                self.config.window.height as f64,
            ));
        if self.config.window.fullscreen {
            attrs = attrs.with_fullscreen(Some(winit::window::Fullscreen::Borderless(None)));
        }
        attrs
    }

    /// Publish finished matting results into the GPU texture cache.
    ///
    /// Each result becomes visible in a single insert; until then the body
    /// renders with its placeholder.
    fn drain_matting_results(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        for result in self.matting.drain_results() {
            if result.matted.outcome == MatteOutcome::NoCoherentBackground {
                warn!(
                    "no coherent background in '{}', using it unmasked",
                    result.key
                );
            }
            if let Err(e) =
                gpu.textures
                    .insert(&gpu.ctx.device, &gpu.ctx.queue, &result.key, &result.matted.image)
            {
                // Per-asset failure: the body keeps its placeholder.
                warn!("upload failed for '{}': {e}", result.key);
            }
        }
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        // Close the loop first: the previous frame's measured duration
        // drives this frame's quality tier.
        let frame_time = self.clock.begin_frame();
        if let Some(change) = self.controller.end_frame(frame_time) {
            info!(
                "quality tier {} -> {} (smoothed frame time {:.1} ms)",
                change.from.label(),
                change.to.label(),
                self.controller.smoothed_frame_time().unwrap_or(0.0) * 1000.0,
            );
        }

        self.drain_matting_results();

        if !self.paused {
            let dt = (frame_time * self.time_scale) as f32;
            self.registry.advance(dt);
            self.sim_time += frame_time * self.time_scale;
        }

        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let surface_texture = match gpu.ctx.get_current_texture() {
            Ok(texture) => texture,
            Err(SurfaceError::Timeout) => return, // skip the frame
            Err(SurfaceError::Lost) => {
                let (w, h) = (gpu.ctx.surface_config.width, gpu.ctx.surface_config.height);
                gpu.ctx.resize(w, h);
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("surface out of GPU memory, shutting down");
                event_loop.exit();
                return;
            }
        };
        let target_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let stats = gpu.scene.render_frame(
            &gpu.ctx.device,
            &gpu.ctx.queue,
            &target_view,
            &gpu.depth_view,
            &self.camera,
            &self.registry,
            &self.controller,
            &gpu.textures,
            self.sim_time as f32,
        );
        surface_texture.present();

        if self.config.debug.show_fps && self.last_hud_update.elapsed() >= HUD_INTERVAL {
            self.last_hud_update = Instant::now();
            gpu.window.set_title(&format_hud(
                &self.config.window.title,
                self.clock.fps(),
                &stats,
                self.controller.is_adaptive(),
            ));
        }

        gpu.window.request_redraw();
    }

    fn handle_key(&mut self, code: KeyCode, event_loop: &ActiveEventLoop) {
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => self.paused = !self.paused,
            KeyCode::ArrowUp => self.time_scale = (self.time_scale + 0.5).min(5.0),
            KeyCode::ArrowDown => self.time_scale = (self.time_scale - 0.5).max(0.0),
            KeyCode::KeyQ => {
                // Manual override: freeze or resume the adaptive controller.
                let adaptive = !self.controller.is_adaptive();
                self.controller.set_adaptive(adaptive);
                info!(
                    "adaptive quality {}",
                    if adaptive { "resumed" } else { "frozen" }
                );
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        let window = match event_loop.create_window(self.window_attributes()) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let ctx = match init_render_context_blocking(window.clone(), self.config.window.vsync) {
            Ok(ctx) => ctx,
            Err(e) => {
                error!("GPU initialization failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let depth_view = create_depth_texture(
            &ctx.device,
            ctx.surface_config.width,
            ctx.surface_config.height,
        );
        self.camera
            .set_aspect_ratio(ctx.surface_config.width as f32, ctx.surface_config.height as f32);

        let mut textures = TextureCache::new(&ctx.device);
        let scene = match SceneRenderer::new(
            &ctx.device,
            &ctx.queue,
            ctx.surface_format,
            &mut textures,
            self.config.render.min_lod_level,
            self.config.render.max_lod_level,
            self.config.render.particle_budget,
            self.config.debug.show_orbits,
        ) {
            Ok(scene) => scene,
            Err(e) => {
                error!("scene initialization failed: {e}");
                event_loop.exit();
                return;
            }
        };

        submit_body_textures(&self.texture_dir, &self.registry, &mut self.matting);

        window.request_redraw();
        info!(
            "renderer up: {}x{}, target {} fps, adaptive quality {}",
            ctx.surface_config.width,
            ctx.surface_config.height,
            self.config.render.target_fps,
            self.config.render.adaptive_quality,
        );
        self.gpu = Some(GpuState {
            window,
            ctx,
            depth_view,
            textures,
            scene,
        });
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.ctx.resize(size.width, size.height);
                    gpu.depth_view = create_depth_texture(
                        &gpu.ctx.device,
                        gpu.ctx.surface_config.width,
                        gpu.ctx.surface_config.height,
                    );
                }
                self.camera
                    .set_aspect_ratio(size.width.max(1) as f32, size.height.max(1) as f32);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && let PhysicalKey::Code(code) = event.physical_key
                {
                    self.handle_key(code, event_loop);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.dragging = state == ElementState::Pressed;
                    if !self.dragging {
                        self.last_cursor = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.dragging {
                    if let Some((lx, ly)) = self.last_cursor {
                        let dx = (position.x - lx) as f32 * DRAG_SENSITIVITY;
                        let dy = (position.y - ly) as f32 * DRAG_SENSITIVITY;
                        self.camera.rotate(dx, dy);
                    }
                    self.last_cursor = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
                if lines != 0.0 {
                    self.camera.zoom(ZOOM_STEP.powf(lines));
                }
            }
            WindowEvent::RedrawRequested => {
                self.render(event_loop);
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // In-flight matting work may finish or be abandoned; its results are
        // never queried again. GPU caches drop with the context.
        self.matting.shutdown();
        info!("shutdown complete");
    }
}
