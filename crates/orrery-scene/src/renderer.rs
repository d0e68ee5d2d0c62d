//! Per-frame scene orchestration.
//!
//! For every visible body the renderer resolves a LOD mesh (distance and tier
//! ceiling), resolves its texture (placeholder until matting publishes), and
//! pushes draw commands into a queue sorted by pipeline and texture state.
//! Effect passes (atmosphere, rings, particles) are enqueued behind the
//! opaque bodies. One instance buffer, reordered to match the sorted queue,
//! feeds every instanced draw.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use tracing::warn;

use orrery_lod::{LodSelector, QualityController, QualityTier};
use orrery_mesh::{MeshCache, MeshKey, RADIUS_BUCKET_STEP, SphereMesh, radius_bucket};
use orrery_render::{
    BodyInstance, BodyPipeline, BufferAllocator, CameraUniform, DrawQueue, DrawKey, GpuTexture,
    LightingUniform, MeshBuffer, OrbitCamera, PassKind, TextureCache,
};
use orrery_texture::RgbaImage;

use crate::atmosphere::{ATMOSPHERE_SCALE, AtmosphereRenderer};
use crate::body::BodyRegistry;
use crate::orbits::OrbitPathRenderer;
use crate::particles::ParticleRenderer;
use crate::rings::RingRenderer;
use crate::starfield::StarfieldRenderer;

/// Cache key for the shared transparent placeholder texture.
pub const PLACEHOLDER_TEXTURE_KEY: &str = "placeholder";

const STARFIELD_SEED: u64 = 42;
const STARFIELD_COUNT: u32 = 4_000;
const RING_TINT: [f32; 4] = [0.8, 0.7, 0.5, 0.6];
const ATMOSPHERE_INTENSITY: f32 = 0.35;

/// Values the UI overlay reads each frame. The core exposes numbers; text
/// rendering happens elsewhere.
#[derive(Clone, Copy, Debug)]
pub struct FrameStats {
    pub tier: QualityTier,
    pub bodies_drawn: u32,
    pub draw_calls: u32,
    pub particles_active: u32,
    /// Bodies that rendered with the flat placeholder this frame.
    pub texture_fallbacks: u32,
}

/// Owns every pass and the shared per-frame buffers.
pub struct SceneRenderer {
    body_pipeline: BodyPipeline,
    atmosphere: AtmosphereRenderer,
    rings: RingRenderer,
    particles: ParticleRenderer,
    starfield: StarfieldRenderer,
    orbit_paths: OrbitPathRenderer,

    mesh_cache: MeshCache,
    selector: LodSelector,
    gpu_meshes: Vec<MeshBuffer>,
    mesh_ids: HashMap<MeshKey, u32>,

    commands: DrawQueue,
    raw_instances: Vec<BodyInstance>,
    sorted_instances: Vec<BodyInstance>,
    texture_bindings: HashMap<u32, Arc<GpuTexture>>,

    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    lighting_buffer: wgpu::Buffer,
    lighting_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    instance_capacity: u32,

    show_orbits: bool,
}

impl SceneRenderer {
    /// Build all passes and seed the texture cache with the shared
    /// transparent placeholder (bodies render their flat color through it).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        textures: &mut TextureCache,
        min_lod_level: u32,
        max_lod_level: u32,
        particle_budget: u32,
        show_orbits: bool,
    ) -> Result<Self, orrery_render::TextureUploadError> {
        let placeholder = RgbaImage::solid(1, 1, [0, 0, 0, 0]);
        textures.insert(device, queue, PLACEHOLDER_TEXTURE_KEY, &placeholder)?;

        let body_pipeline = BodyPipeline::new(
            device,
            surface_format,
            Some(orrery_render::DEPTH_FORMAT),
            textures.bind_group_layout(),
        );
        let camera_layout = &body_pipeline.camera_bind_group_layout;

        let atmosphere = AtmosphereRenderer::new(
            device,
            surface_format,
            orrery_render::DEPTH_FORMAT,
            camera_layout,
        );
        let rings = RingRenderer::new(
            device,
            surface_format,
            orrery_render::DEPTH_FORMAT,
            camera_layout,
        );
        let particles = ParticleRenderer::new(
            device,
            surface_format,
            orrery_render::DEPTH_FORMAT,
            camera_layout,
            particle_budget,
        );
        let starfield = StarfieldRenderer::new(
            device,
            surface_format,
            orrery_render::DEPTH_FORMAT,
            camera_layout,
            STARFIELD_SEED,
            STARFIELD_COUNT,
        );
        let orbit_paths = OrbitPathRenderer::new(
            device,
            surface_format,
            orrery_render::DEPTH_FORMAT,
            camera_layout,
            32,
        );

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene-camera-uniform"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene-camera-bind-group"),
            layout: camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene-lighting-uniform"),
            size: std::mem::size_of::<LightingUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lighting_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene-lighting-bind-group"),
            layout: &body_pipeline.lighting_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: lighting_buffer.as_entire_binding(),
            }],
        });

        let instance_capacity = 64;
        let instance_buffer = create_instance_buffer(device, instance_capacity);

        Ok(Self {
            body_pipeline,
            atmosphere,
            rings,
            particles,
            starfield,
            orbit_paths,
            mesh_cache: MeshCache::new(min_lod_level, max_lod_level),
            selector: LodSelector::with_default_bands(min_lod_level, max_lod_level),
            gpu_meshes: Vec::new(),
            mesh_ids: HashMap::new(),
            commands: DrawQueue::with_capacity(64),
            raw_instances: Vec::new(),
            sorted_instances: Vec::new(),
            texture_bindings: HashMap::new(),
            camera_buffer,
            camera_bind_group,
            lighting_buffer,
            lighting_bind_group,
            instance_buffer,
            instance_capacity,
            show_orbits,
        })
    }

    /// Render one frame into `target_view`. Strictly sequential; the caller
    /// measures the duration and feeds it back to the quality controller for
    /// the next frame.
    #[allow(clippy::too_many_arguments)]
    pub fn render_frame(
        &mut self,
        device: &wgpu::Device,
        gpu_queue: &wgpu::Queue,
        target_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        camera: &OrbitCamera,
        registry: &BodyRegistry,
        controller: &QualityController,
        textures: &TextureCache,
        time: f32,
    ) -> FrameStats {
        let preset = *controller.preset();
        let tier = controller.tier();

        gpu_queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera.to_uniform()]),
        );

        let sun_position = registry
            .iter()
            .find(|b| b.emissive)
            .map(|b| b.position)
            .unwrap_or(Vec3::ZERO);
        gpu_queue.write_buffer(
            &self.lighting_buffer,
            0,
            bytemuck::cast_slice(&[LightingUniform {
                sun_position: sun_position.to_array(),
                specular_strength: if preset.specular { 1.0 } else { 0.0 },
                ..LightingUniform::default()
            }]),
        );

        // --- Build this frame's command list ---
        self.commands.clear();
        self.raw_instances.clear();
        self.texture_bindings.clear();

        let placeholder_id = textures
            .texture_id(PLACEHOLDER_TEXTURE_KEY)
            .unwrap_or_default();
        let mut texture_fallbacks = 0u32;
        let mut bodies_drawn = 0u32;
        let mut emitting: Vec<(String, Vec3, f32)> = Vec::new();

        for body in registry.iter() {
            let distance = camera.distance_to(body.position) as f64;
            let level =
                self.selector
                    .select_level(distance, body.radius as f64, preset.lod_ceiling);
            let key = MeshKey {
                radius_bucket: radius_bucket(body.radius),
                detail_level: self.mesh_cache.clamp_level(level),
            };
            let mesh = self.mesh_cache.get_or_generate(body.radius, level);
            let mesh_id = self.ensure_gpu_mesh(device, key, &mesh);

            let texture_id = match textures.texture_id(&body.texture_key) {
                Some(id) => id,
                None => {
                    texture_fallbacks += 1;
                    placeholder_id
                }
            };
            if let std::collections::hash_map::Entry::Vacant(entry) =
                self.texture_bindings.entry(texture_id)
            {
                let lookup_key = if texture_id == placeholder_id {
                    PLACEHOLDER_TEXTURE_KEY
                } else {
                    body.texture_key.as_str()
                };
                match textures.get(lookup_key) {
                    Some(texture) => {
                        entry.insert(texture);
                    }
                    None => {
                        warn!("texture '{lookup_key}' vanished from cache, skipping body");
                        continue;
                    }
                }
            }

            // Meshes are generated at the bucket radius; the model matrix
            // closes the gap to the body's exact radius.
            let bucket_radius = key.radius_bucket as f32 * RADIUS_BUCKET_STEP;
            let scale = body.radius / bucket_radius;
            let model = Mat4::from_translation(body.position)
                * Mat4::from_rotation_y(body.rotation_angle)
                * Mat4::from_scale(Vec3::splat(scale));

            let emissive = if body.emissive { 1.0 } else { 0.0 };
            self.push_command(
                DrawKey {
                    pass: PassKind::Body,
                    texture_id,
                    mesh_id,
                },
                BodyInstance {
                    model: model.to_cols_array_2d(),
                    tint: [
                        body.fallback_color[0],
                        body.fallback_color[1],
                        body.fallback_color[2],
                        emissive,
                    ],
                },
            );
            bodies_drawn += 1;

            if body.has_ring {
                let ring_model = Mat4::from_translation(body.position)
                    * Mat4::from_scale(Vec3::splat(body.radius));
                self.push_command(
                    DrawKey {
                        pass: PassKind::Ring,
                        texture_id: 0,
                        mesh_id: 0,
                    },
                    BodyInstance {
                        model: ring_model.to_cols_array_2d(),
                        tint: RING_TINT,
                    },
                );
            }

            if body.has_atmosphere && preset.atmosphere {
                let shell_model = Mat4::from_translation(body.position)
                    * Mat4::from_scale(Vec3::splat(body.radius * ATMOSPHERE_SCALE));
                self.push_command(
                    DrawKey {
                        pass: PassKind::Atmosphere,
                        texture_id: 0,
                        mesh_id: 0,
                    },
                    BodyInstance {
                        model: shell_model.to_cols_array_2d(),
                        tint: [
                            body.atmosphere_color[0],
                            body.atmosphere_color[1],
                            body.atmosphere_color[2],
                            ATMOSPHERE_INTENSITY,
                        ],
                    },
                );
            }

            if body.has_particles && preset.particles {
                emitting.push((body.key.clone(), body.position, body.radius));
            }
        }

        if !emitting.is_empty() {
            // Single marker command so the particle pass sorts behind all
            // other translucent work.
            self.commands.push(
                DrawKey {
                    pass: PassKind::Particles,
                    texture_id: 0,
                    mesh_id: 0,
                },
                0,
            );
        }

        // --- Sort and stage instance data in draw order ---
        self.commands.sort();
        self.sorted_instances.clear();
        for group in self.commands.groups() {
            for command in group.commands {
                self.sorted_instances
                    .push(self.raw_instances[command.instance_index as usize]);
            }
        }
        self.ensure_instance_capacity(device, self.sorted_instances.len() as u32);
        if !self.sorted_instances.is_empty() {
            gpu_queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&self.sorted_instances),
            );
        }

        let (camera_right, camera_up) = billboard_basis(camera);
        let particles_active = self.particles.update(
            gpu_queue,
            &emitting,
            preset.particle_scale,
            time,
            camera_right,
            camera_up,
        );
        if self.show_orbits {
            self.orbit_paths.update(gpu_queue, registry);
        }

        // --- Encode the frame ---
        let mut draw_calls = 0u32;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene-encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        // Reverse-Z: far plane clears to zero.
                        load: wgpu::LoadOp::Clear(0.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            self.starfield.draw(&mut pass, &self.camera_bind_group);
            draw_calls += 1;
            if self.show_orbits {
                self.orbit_paths.draw(&mut pass, &self.camera_bind_group);
                draw_calls += 1;
            }

            let mut cursor = 0u32;
            for group in self.commands.groups() {
                match group.pass {
                    PassKind::Body => {
                        pass.set_pipeline(&self.body_pipeline.pipeline);
                        pass.set_bind_group(0, &self.camera_bind_group, &[]);
                        pass.set_bind_group(2, &self.lighting_bind_group, &[]);
                        if let Some(texture) = self.texture_bindings.get(&group.texture_id) {
                            pass.set_bind_group(1, &texture.bind_group, &[]);
                        }
                        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                        for run in group.instanced_runs() {
                            let mesh = &self.gpu_meshes[run.mesh_id as usize];
                            mesh.bind(&mut pass);
                            mesh.draw_instanced(&mut pass, cursor..cursor + run.instance_count());
                            cursor += run.instance_count();
                            draw_calls += 1;
                        }
                    }
                    PassKind::Ring => {
                        let count = group.commands.len() as u32;
                        self.rings.draw(
                            &mut pass,
                            &self.camera_bind_group,
                            &self.instance_buffer,
                            cursor..cursor + count,
                        );
                        cursor += count;
                        draw_calls += 1;
                    }
                    PassKind::Atmosphere => {
                        let count = group.commands.len() as u32;
                        self.atmosphere.draw(
                            &mut pass,
                            &self.camera_bind_group,
                            &self.instance_buffer,
                            cursor..cursor + count,
                        );
                        cursor += count;
                        draw_calls += 1;
                    }
                    PassKind::Particles => {
                        cursor += group.commands.len() as u32;
                        if particles_active > 0 {
                            self.particles.draw(&mut pass, &self.camera_bind_group);
                            draw_calls += 1;
                        }
                    }
                }
            }
        }
        gpu_queue.submit(std::iter::once(encoder.finish()));

        FrameStats {
            tier,
            bodies_drawn,
            draw_calls,
            particles_active,
            texture_fallbacks,
        }
    }

    /// Number of distinct LOD meshes generated so far.
    pub fn mesh_count(&self) -> usize {
        self.mesh_cache.len()
    }

    fn push_command(&mut self, key: DrawKey, instance: BodyInstance) {
        let index = self.raw_instances.len() as u32;
        self.raw_instances.push(instance);
        self.commands.push(key, index);
    }

    fn ensure_gpu_mesh(&mut self, device: &wgpu::Device, key: MeshKey, mesh: &SphereMesh) -> u32 {
        if let Some(&id) = self.mesh_ids.get(&key) {
            return id;
        }
        let label = format!("sphere-b{}-l{}", key.radius_bucket, key.detail_level);
        let buffer = BufferAllocator::new(device).upload_sphere(&label, mesh);
        let id = self.gpu_meshes.len() as u32;
        self.gpu_meshes.push(buffer);
        self.mesh_ids.insert(key, id);
        id
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, count: u32) {
        if count <= self.instance_capacity {
            return;
        }
        self.instance_capacity = count.next_power_of_two();
        self.instance_buffer = create_instance_buffer(device, self.instance_capacity);
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("scene-instances"),
        size: capacity as u64 * std::mem::size_of::<BodyInstance>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// View-plane basis for particle billboards.
fn billboard_basis(camera: &OrbitCamera) -> (Vec3, Vec3) {
    let forward = (camera.focus - camera.position()).normalize_or(Vec3::NEG_Z);
    let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
    let up = right.cross(forward);
    (right, up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_lod::ControllerParams;

    fn create_test_gpu() -> Option<(wgpu::Device, wgpu::Queue)> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions::default())
                .await
                .ok()?;
            adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await
                .ok()
        })
    }

    fn offscreen_targets(
        device: &wgpu::Device,
        size: u32,
    ) -> (wgpu::TextureView, wgpu::TextureView) {
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test-color"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth = orrery_render::create_depth_texture(device, size, size);
        (
            color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth,
        )
    }

    fn test_scene(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> (SceneRenderer, TextureCache) {
        let mut textures = TextureCache::new(device);
        let renderer = SceneRenderer::new(
            device,
            queue,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            &mut textures,
            8,
            32,
            256,
            true,
        )
        .unwrap();
        (renderer, textures)
    }

    #[test]
    fn test_frame_renders_full_solar_system() {
        let Some((device, queue)) = create_test_gpu() else {
            return;
        };
        let (mut renderer, textures) = test_scene(&device, &queue);
        let (color_view, depth_view) = offscreen_targets(&device, 64);

        let mut registry = BodyRegistry::solar_system();
        registry.advance(0.1);
        let camera = OrbitCamera::new(200.0, 1.0);
        let controller = QualityController::new(&ControllerParams::default());

        let stats = renderer.render_frame(
            &device,
            &queue,
            &color_view,
            &depth_view,
            &camera,
            &registry,
            &controller,
            &textures,
            0.5,
        );

        assert_eq!(stats.bodies_drawn, 10);
        assert_eq!(stats.tier, QualityTier::High);
        assert!(stats.draw_calls > 0);
        // No real textures loaded yet: every body used its placeholder.
        assert_eq!(stats.texture_fallbacks, 10);
    }

    #[test]
    fn test_mesh_cache_populates_lazily_and_is_bounded() {
        let Some((device, queue)) = create_test_gpu() else {
            return;
        };
        let (mut renderer, textures) = test_scene(&device, &queue);
        let (color_view, depth_view) = offscreen_targets(&device, 32);

        let registry = BodyRegistry::solar_system();
        let camera = OrbitCamera::new(200.0, 1.0);
        let controller = QualityController::new(&ControllerParams::default());

        assert_eq!(renderer.mesh_count(), 0);
        for _ in 0..3 {
            renderer.render_frame(
                &device,
                &queue,
                &color_view,
                &depth_view,
                &camera,
                &registry,
                &controller,
                &textures,
                0.0,
            );
        }
        let after_first = renderer.mesh_count();
        assert!(after_first > 0);

        // A static camera and registry re-use cached meshes.
        renderer.render_frame(
            &device,
            &queue,
            &color_view,
            &depth_view,
            &camera,
            &registry,
            &controller,
            &textures,
            0.0,
        );
        assert_eq!(renderer.mesh_count(), after_first);
    }

    #[test]
    fn test_low_tier_drops_effect_passes() {
        let Some((device, queue)) = create_test_gpu() else {
            return;
        };
        let (mut renderer, textures) = test_scene(&device, &queue);
        let (color_view, depth_view) = offscreen_targets(&device, 32);

        let registry = BodyRegistry::solar_system();
        let camera = OrbitCamera::new(200.0, 1.0);

        let high = QualityController::new(&ControllerParams::default());
        let high_stats = renderer.render_frame(
            &device,
            &queue,
            &color_view,
            &depth_view,
            &camera,
            &registry,
            &high,
            &textures,
            0.0,
        );

        // Drive a controller to the lowest tier with a sustained overload.
        let mut low = QualityController::new(&ControllerParams::default());
        for _ in 0..200 {
            low.end_frame(3.0 / 60.0);
        }
        assert_eq!(low.tier(), QualityTier::Low);

        let low_stats = renderer.render_frame(
            &device,
            &queue,
            &color_view,
            &depth_view,
            &camera,
            &registry,
            &low,
            &textures,
            0.0,
        );

        assert!(low_stats.draw_calls < high_stats.draw_calls);
        assert_eq!(low_stats.particles_active, 0);
        assert!(high_stats.particles_active > 0);
    }

    #[test]
    fn test_loaded_texture_clears_fallback() {
        let Some((device, queue)) = create_test_gpu() else {
            return;
        };
        let (mut renderer, mut textures) = test_scene(&device, &queue);
        let (color_view, depth_view) = offscreen_targets(&device, 32);

        let earth_texture = RgbaImage::solid(4, 4, [30, 90, 200, 255]);
        textures
            .insert(&device, &queue, "earth", &earth_texture)
            .unwrap();

        let registry = BodyRegistry::solar_system();
        let camera = OrbitCamera::new(200.0, 1.0);
        let controller = QualityController::new(&ControllerParams::default());

        let stats = renderer.render_frame(
            &device,
            &queue,
            &color_view,
            &depth_view,
            &camera,
            &registry,
            &controller,
            &textures,
            0.0,
        );
        assert_eq!(stats.texture_fallbacks, 9, "earth no longer falls back");
    }
}
