//! Planetary ring pass: a flat annulus around ringed bodies, alpha-blended
//! and visible from both sides.

use orrery_mesh::{SPHERE_VERTEX_LAYOUT, SphereVertex};
use orrery_render::{BodyInstance, BufferAllocator, IndexData, MeshBuffer};

/// Inner ring edge relative to the body radius.
pub const RING_INNER_SCALE: f32 = 1.2;
/// Outer ring edge relative to the body radius.
pub const RING_OUTER_SCALE: f32 = 2.0;

const RING_SEGMENTS: u32 = 64;

/// Generate a unit-body-radius annulus in the XZ plane.
///
/// UVs store the radial fraction in U (0 at the inner edge, 1 at the outer),
/// which the shader uses for the outward fade.
pub fn generate_ring(inner: f32, outer: f32, segments: u32) -> (Vec<SphereVertex>, Vec<u32>) {
    let segments = segments.max(3);
    let mut vertices = Vec::with_capacity(((segments + 1) * 2) as usize);
    let mut indices = Vec::with_capacity((segments * 6) as usize);

    for seg in 0..=segments {
        let angle = std::f32::consts::TAU * seg as f32 / segments as f32;
        let (sin_a, cos_a) = angle.sin_cos();
        for (radius, u) in [(inner, 0.0f32), (outer, 1.0f32)] {
            vertices.push(SphereVertex {
                position: [cos_a * radius, 0.0, sin_a * radius],
                normal: [0.0, 1.0, 0.0],
                uv: [u, seg as f32 / segments as f32],
            });
        }
    }

    for seg in 0..segments {
        let i0 = seg * 2;
        indices.extend_from_slice(&[i0, i0 + 1, i0 + 2]);
        indices.extend_from_slice(&[i0 + 1, i0 + 3, i0 + 2]);
    }

    (vertices, indices)
}

const RING_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct InstanceInput {
    @location(3) model_0: vec4<f32>,
    @location(4) model_1: vec4<f32>,
    @location(5) model_2: vec4<f32>,
    @location(6) model_3: vec4<f32>,
    @location(7) tint: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) tint: vec4<f32>,
};

@vertex
fn vs_main(in: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    var out: VertexOutput;
    out.clip_position = camera.view_proj * (model * vec4<f32>(in.position, 1.0));
    out.uv = in.uv;
    out.tint = instance.tint;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    // Fade toward the outer edge, with faint banding across the annulus.
    let band = 0.85 + 0.15 * sin(in.uv.x * 40.0);
    let alpha = in.tint.a * (1.0 - in.uv.x * 0.6) * band;
    return vec4<f32>(in.tint.rgb, alpha);
}
"#;

/// Pipeline and shared annulus mesh for ring passes.
pub struct RingRenderer {
    pub pipeline: wgpu::RenderPipeline,
    ring_mesh: MeshBuffer,
}

impl RingRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ring-shader"),
            source: wgpu::ShaderSource::Wgsl(RING_SHADER_SOURCE.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ring-pipeline-layout"),
            bind_group_layouts: &[camera_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("ring-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[SPHERE_VERTEX_LAYOUT, BodyInstance::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Rings are visible from above and below.
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
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
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let (vertices, indices) = generate_ring(RING_INNER_SCALE, RING_OUTER_SCALE, RING_SEGMENTS);
        let ring_mesh = BufferAllocator::new(device).create_mesh(
            "ring-annulus",
            bytemuck::cast_slice(&vertices),
            IndexData::U32(&indices),
        );

        Self {
            pipeline,
            ring_mesh,
        }
    }

    pub fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        camera_bind_group: &wgpu::BindGroup,
        instance_buffer: &wgpu::Buffer,
        instance_range: std::ops::Range<u32>,
    ) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, camera_bind_group, &[]);
        render_pass.set_vertex_buffer(1, instance_buffer.slice(..));
        self.ring_mesh.bind(render_pass);
        self.ring_mesh.draw_instanced(render_pass, instance_range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_mesh_is_a_flat_annulus() {
        let (vertices, indices) = generate_ring(1.2, 2.0, 32);
        assert_eq!(vertices.len(), 33 * 2);
        assert_eq!(indices.len(), 32 * 6);
        for v in &vertices {
            assert_eq!(v.position[1], 0.0, "annulus lies in the XZ plane");
            let r = (v.position[0].powi(2) + v.position[2].powi(2)).sqrt();
            assert!(r >= 1.2 - 1e-4 && r <= 2.0 + 1e-4);
        }
    }

    #[test]
    fn test_ring_uv_u_is_radial_fraction() {
        let (vertices, _) = generate_ring(1.2, 2.0, 16);
        for pair in vertices.chunks(2) {
            assert_eq!(pair[0].uv[0], 0.0);
            assert_eq!(pair[1].uv[0], 1.0);
        }
    }

    #[test]
    fn test_indices_in_bounds() {
        let (vertices, indices) = generate_ring(1.2, 2.0, 64);
        for &i in &indices {
            assert!((i as usize) < vertices.len());
        }
    }

    #[test]
    fn test_segment_floor() {
        let (vertices, _) = generate_ring(1.0, 2.0, 1);
        assert!(vertices.len() >= 8);
    }
}
