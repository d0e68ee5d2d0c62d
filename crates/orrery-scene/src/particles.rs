//! Billboard particle pass for emitting bodies (solar flares and the like).
//!
//! Particle motion is a pure function of absolute time, so the system carries
//! no per-frame simulation state: each particle streams outward along a
//! seeded direction and loops. The process-wide particle budget is fixed at
//! startup; the active quality tier scales how much of it is drawn.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use orrery_render::BufferAllocator;

/// How far a particle travels before looping, as a fraction of body radius.
const TRAVEL_SPAN: f32 = 0.6;

/// One seeded particle: a direction on the body's surface and loop timing.
#[derive(Clone, Copy, Debug)]
pub struct ParticleSeed {
    pub direction: [f32; 3],
    pub speed: f32,
    pub phase: f32,
    pub size: f32,
}

/// Per-particle GPU instance data.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct ParticleInstance {
    position: [f32; 3],
    size: f32,
    color: [f32; 4],
}

const PARTICLE_INSTANCE_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<ParticleInstance>() as u64,
    step_mode: wgpu::VertexStepMode::Instance,
    attributes: &[
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: 0,
            shader_location: 1,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: 16,
            shader_location: 2,
        },
    ],
};

/// Billboard basis uniform, rebuilt from the camera each frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct BillboardUniform {
    right: [f32; 3],
    _pad0: f32,
    up: [f32; 3],
    _pad1: f32,
}

const _: () = assert!(std::mem::size_of::<BillboardUniform>() == 32);

/// Deterministic particle directions for a body key.
pub fn generate_seeds(body_key: &str, count: u32) -> Vec<ParticleSeed> {
    let mut hasher = DefaultHasher::new();
    body_key.hash(&mut hasher);
    let mut rng = ChaCha8Rng::seed_from_u64(hasher.finish());

    let mut seeds = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let theta = rng.random::<f32>() * std::f32::consts::TAU;
        let z: f32 = 1.0 - 2.0 * rng.random::<f32>();
        let planar = (1.0 - z * z).max(0.0).sqrt();
        seeds.push(ParticleSeed {
            direction: [planar * theta.cos(), z, planar * theta.sin()],
            speed: 0.2 + rng.random::<f32>() * 0.6,
            phase: rng.random(),
            size: 0.02 + rng.random::<f32>() * 0.04,
        });
    }
    seeds
}

const PARTICLE_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

struct Billboard {
    right: vec3<f32>,
    up: vec3<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var<uniform> billboard: Billboard;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) corner: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) corner: vec2<f32>,
    @location(1) pos_size: vec4<f32>,
    @location(2) color: vec4<f32>,
) -> VertexOutput {
    let world = pos_size.xyz
        + billboard.right * corner.x * pos_size.w
        + billboard.up * corner.y * pos_size.w;

    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(world, 1.0);
    out.color = color;
    out.corner = corner;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    // Round, soft-edged sprite.
    let r = length(in.corner);
    let falloff = max(1.0 - r, 0.0);
    return vec4<f32>(in.color.rgb * in.color.a * falloff, in.color.a * falloff);
}
"#;

/// Instanced billboard pipeline plus the seeded emitters.
pub struct ParticleRenderer {
    pub pipeline: wgpu::RenderPipeline,
    billboard_bind_group: wgpu::BindGroup,
    billboard_buffer: wgpu::Buffer,
    quad_vertex_buffer: wgpu::Buffer,
    quad_index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_capacity: u32,
    instances: Vec<ParticleInstance>,
    emitters: HashMap<String, Vec<ParticleSeed>>,
    budget: u32,
}

impl ParticleRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        budget: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("particle-shader"),
            source: wgpu::ShaderSource::Wgsl(PARTICLE_SHADER_SOURCE.into()),
        });

        let billboard_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("billboard-bind-group-layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(
                            std::mem::size_of::<BillboardUniform>() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("particle-pipeline-layout"),
            bind_group_layouts: &[camera_bind_group_layout, &billboard_bind_group_layout],
            immediate_size: 0,
        });

        let quad_layout = wgpu::VertexBufferLayout {
            array_stride: 8,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: 0,
            }],
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("particle-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[quad_layout, PARTICLE_INSTANCE_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::GreaterEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let allocator = BufferAllocator::new(device);
        let corners: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
        let quad_indices: [u16; 6] = [0, 1, 2, 2, 3, 0];
        let quad_vertex_buffer =
            allocator.create_vertex_buffer("particle-quad", bytemuck::cast_slice(&corners));
        let quad_index_buffer = allocator.create_index_buffer(
            "particle-quad",
            &orrery_render::IndexData::U16(&quad_indices),
        );

        let billboard_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("billboard-uniform"),
            size: std::mem::size_of::<BillboardUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let billboard_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("billboard-bind-group"),
            layout: &billboard_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: billboard_buffer.as_entire_binding(),
            }],
        });

        let instance_capacity = budget.max(1);
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particle-instances"),
            size: instance_capacity as u64 * std::mem::size_of::<ParticleInstance>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            billboard_bind_group,
            billboard_buffer,
            quad_vertex_buffer,
            quad_index_buffer,
            instance_buffer,
            instance_capacity,
            instances: Vec::new(),
            emitters: HashMap::new(),
            budget,
        }
    }

    /// Rebuild instance data for this frame's emitting bodies.
    ///
    /// `tier_scale` is the active tier's share of the budget; emitters split
    /// the scaled budget evenly. Returns the number of active particles.
    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        emitting_bodies: &[(String, Vec3, f32)],
        tier_scale: f32,
        time: f32,
        camera_right: Vec3,
        camera_up: Vec3,
    ) -> u32 {
        self.instances.clear();
        if emitting_bodies.is_empty() || tier_scale <= 0.0 {
            return 0;
        }

        let active_budget = (self.budget as f32 * tier_scale) as usize;
        let per_body = (active_budget / emitting_bodies.len()).max(1);

        for (key, position, radius) in emitting_bodies {
            let budget = self.budget;
            let seeds = self
                .emitters
                .entry(key.clone())
                .or_insert_with(|| generate_seeds(key, budget));

            for seed in seeds.iter().take(per_body) {
                let travel = (seed.phase + time * seed.speed).fract();
                let offset = radius * (1.0 + travel * TRAVEL_SPAN);
                let fade = 1.0 - travel;
                self.instances.push(ParticleInstance {
                    position: [
                        position.x + seed.direction[0] * offset,
                        position.y + seed.direction[1] * offset,
                        position.z + seed.direction[2] * offset,
                    ],
                    size: seed.size * radius,
                    color: [1.0, 0.75, 0.3, 0.8 * fade],
                });
            }
        }

        let count = (self.instances.len() as u32).min(self.instance_capacity);
        self.instances.truncate(count as usize);
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&self.instances),
        );
        queue.write_buffer(
            &self.billboard_buffer,
            0,
            bytemuck::cast_slice(&[BillboardUniform {
                right: camera_right.to_array(),
                _pad0: 0.0,
                up: camera_up.to_array(),
                _pad1: 0.0,
            }]),
        );
        count
    }

    /// Draw whatever [`update`](Self::update) staged this frame.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, camera_bind_group: &wgpu::BindGroup) {
        let count = self.instances.len() as u32;
        if count == 0 {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, camera_bind_group, &[]);
        render_pass.set_bind_group(1, &self.billboard_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..6, 0, 0..count);
    }

    /// Particles staged for the current frame.
    pub fn active_count(&self) -> u32 {
        self.instances.len() as u32
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }
}
