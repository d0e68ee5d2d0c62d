//! Orbit path overlay: one unlit line circle per orbiting body.
//!
//! Moons orbit a moving parent, so circle centers change every frame; the
//! vertex buffer is rebuilt CPU-side per frame (a few kilobytes at most).

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::body::BodyRegistry;

const ORBIT_SEGMENTS: u32 = 64;
const PLANET_ORBIT_COLOR: [f32; 4] = [0.4, 0.4, 0.4, 1.0];
const MOON_ORBIT_COLOR: [f32; 4] = [0.6, 0.6, 0.6, 1.0];

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct OrbitVertex {
    position: [f32; 3],
    color: [f32; 4],
}

const ORBIT_VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<OrbitVertex>() as u64,
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

const ORBIT_SHADER_SOURCE: &str = r#"
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
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Line-list pipeline with a per-frame rebuilt vertex buffer.
pub struct OrbitPathRenderer {
    pub pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    capacity_vertices: u32,
    vertex_count: u32,
}

impl OrbitPathRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        max_bodies: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("orbit-shader"),
            source: wgpu::ShaderSource::Wgsl(ORBIT_SHADER_SOURCE.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("orbit-pipeline-layout"),
            bind_group_layouts: &[camera_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("orbit-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[ORBIT_VERTEX_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
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
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let capacity_vertices = max_bodies.max(1) * ORBIT_SEGMENTS * 2;
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("orbit-vertices"),
            size: capacity_vertices as u64 * std::mem::size_of::<OrbitVertex>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            vertex_buffer,
            capacity_vertices,
            vertex_count: 0,
        }
    }

    /// Rebuild the line buffer for every orbiting body.
    pub fn update(&mut self, queue: &wgpu::Queue, registry: &BodyRegistry) {
        let mut vertices: Vec<OrbitVertex> = Vec::new();

        for body in registry.iter() {
            if body.orbit_radius <= 0.0 {
                continue;
            }
            let (center, color) = match &body.parent {
                Some(parent_key) => {
                    let Some(parent) = registry.get(parent_key) else {
                        continue;
                    };
                    (parent.position, MOON_ORBIT_COLOR)
                }
                None => (Vec3::ZERO, PLANET_ORBIT_COLOR),
            };
            push_circle(&mut vertices, center, body.orbit_radius, color);
        }

        vertices.truncate(self.capacity_vertices as usize);
        self.vertex_count = vertices.len() as u32;
        if !vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, camera_bind_group: &wgpu::BindGroup) {
        if self.vertex_count == 0 {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, camera_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..self.vertex_count, 0..1);
    }
}

/// Append a circle in the XZ plane as line-list segment pairs.
fn push_circle(vertices: &mut Vec<OrbitVertex>, center: Vec3, radius: f32, color: [f32; 4]) {
    for seg in 0..ORBIT_SEGMENTS {
        for step in [seg, (seg + 1) % ORBIT_SEGMENTS] {
            let angle = std::f32::consts::TAU * step as f32 / ORBIT_SEGMENTS as f32;
            vertices.push(OrbitVertex {
                position: [
                    center.x + angle.cos() * radius,
                    center.y,
                    center.z + angle.sin() * radius,
                ],
                color,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_segment_count() {
        let mut vertices = Vec::new();
        push_circle(&mut vertices, Vec3::ZERO, 10.0, PLANET_ORBIT_COLOR);
        assert_eq!(vertices.len(), (ORBIT_SEGMENTS * 2) as usize);
    }

    #[test]
    fn test_circle_points_lie_on_radius() {
        let mut vertices = Vec::new();
        let center = Vec3::new(5.0, 0.0, -3.0);
        push_circle(&mut vertices, center, 8.0, MOON_ORBIT_COLOR);
        for v in &vertices {
            let p = Vec3::from_array(v.position);
            assert!((p.distance(center) - 8.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_circle_closes() {
        let mut vertices = Vec::new();
        push_circle(&mut vertices, Vec3::ZERO, 1.0, PLANET_ORBIT_COLOR);
        // The last segment's end point is the first segment's start point.
        let first = vertices.first().unwrap().position;
        let last = vertices.last().unwrap().position;
        assert_eq!(first, last);
    }
}
