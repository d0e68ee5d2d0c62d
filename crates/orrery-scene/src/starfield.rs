//! Deterministic point starfield rendered behind the scene.

use bytemuck::{Pod, Zeroable};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use orrery_render::BufferAllocator;

/// Sky sphere radius. Far enough that parallax is invisible, inside the far
/// clip plane.
const STAR_DISTANCE: f32 = 5_000.0;

/// A point star: position on the sky sphere plus premultiplied color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct StarVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

const STAR_VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<StarVertex>() as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: 12,
            shader_location: 1,
        },
    ],
};

/// Generate a deterministic star catalog: uniform directions, power-law
/// brightness so most stars are dim, warm/cool temperature tints.
pub fn generate_starfield(seed: u64, count: u32) -> Vec<StarVertex> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut stars = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let theta = rng.random::<f32>() * std::f32::consts::TAU;
        let z: f32 = 1.0 - 2.0 * rng.random::<f32>();
        let planar = (1.0 - z * z).max(0.0).sqrt();
        let direction = [planar * theta.cos(), z, planar * theta.sin()];

        let brightness = rng.random::<f32>().powf(4.0) * 0.9 + 0.1;
        // Temperature tint: cool stars redden, hot stars blue-shift.
        let warmth: f32 = rng.random();
        let color = [
            brightness * (0.8 + 0.2 * warmth),
            brightness * 0.9,
            brightness * (1.0 - 0.3 * warmth),
            1.0,
        ];

        stars.push(StarVertex {
            position: [
                direction[0] * STAR_DISTANCE,
                direction[1] * STAR_DISTANCE,
                direction[2] * STAR_DISTANCE,
            ],
            color,
        });
    }

    stars
}

const STARFIELD_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
) -> VertexOutput {
    // Stars follow the camera so the sky never shows parallax.
    let world = position + camera.camera_pos.xyz;
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(world, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Point-list pipeline drawing the star catalog first each frame.
pub struct StarfieldRenderer {
    pub pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    star_count: u32,
}

impl StarfieldRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        seed: u64,
        count: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("starfield-shader"),
            source: wgpu::ShaderSource::Wgsl(STARFIELD_SHADER_SOURCE.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("starfield-pipeline-layout"),
            bind_group_layouts: &[camera_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("starfield-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[STAR_VERTEX_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                // Background: never occludes, never writes.
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let stars = generate_starfield(seed, count);
        let vertex_buffer =
            BufferAllocator::new(device).create_vertex_buffer("starfield", bytemuck::cast_slice(&stars));

        Self {
            pipeline,
            vertex_buffer,
            star_count: count,
        }
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, camera_bind_group: &wgpu::BindGroup) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, camera_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..self.star_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starfield_is_deterministic_per_seed() {
        let a = generate_starfield(42, 500);
        let b = generate_starfield(42, 500);
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.position, sb.position);
            assert_eq!(sa.color, sb.color);
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate_starfield(1, 100);
        let b = generate_starfield(2, 100);
        assert!(a.iter().zip(b.iter()).any(|(sa, sb)| sa.position != sb.position));
    }

    #[test]
    fn test_stars_lie_on_sky_sphere() {
        for star in generate_starfield(7, 200) {
            let r = (star.position[0].powi(2)
                + star.position[1].powi(2)
                + star.position[2].powi(2))
            .sqrt();
            assert!((r - STAR_DISTANCE).abs() < 1.0);
        }
    }

    #[test]
    fn test_brightness_distribution_skews_dim() {
        let stars = generate_starfield(11, 2000);
        let bright = stars.iter().filter(|s| s.color[1] > 0.6).count();
        assert!(
            bright < stars.len() / 4,
            "power-law brightness should leave most stars dim, got {bright} bright"
        );
    }
}
