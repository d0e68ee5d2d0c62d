//! Translucent atmosphere shell pass.
//!
//! Each atmosphere-bearing body gets one extra instanced draw: a sphere shell
//! slightly larger than the body with a Fresnel-style rim falloff, so the
//! limb glows brighter than the center. Drawn additively after opaque
//! geometry with depth writes off.

use orrery_mesh::{SPHERE_VERTEX_LAYOUT, generate_sphere};
use orrery_render::{BodyInstance, BufferAllocator, MeshBuffer};

/// Shell radius relative to the body radius.
pub const ATMOSPHERE_SCALE: f32 = 1.025;

/// Shell geometry detail. The shell is a smooth gradient, so it never needs
/// the body's full tessellation.
const SHELL_DETAIL_LEVEL: u32 = 24;

const ATMOSPHERE_SHADER_SOURCE: &str = r#"
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
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) tint: vec4<f32>,
};

// Rim sharpness for the Fresnel-style falloff.
const RIM_EXPONENT: f32 = 3.0;

@vertex
fn vs_main(in: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world = model * vec4<f32>(in.position, 1.0);

    var out: VertexOutput;
    out.clip_position = camera.view_proj * world;
    out.world_pos = world.xyz;
    out.normal = normalize((model * vec4<f32>(in.normal, 0.0)).xyz);
    out.tint = instance.tint;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let view_dir = normalize(camera.camera_pos.xyz - in.world_pos);
    let facing = abs(dot(normalize(in.normal), view_dir));
    // Rim brighter than center: fade where the shell faces the camera.
    let rim = pow(1.0 - facing, RIM_EXPONENT);
    let alpha = rim * in.tint.a;
    return vec4<f32>(in.tint.rgb * alpha, alpha);
}
"#;

/// Pipeline and shared shell mesh for atmosphere passes.
pub struct AtmosphereRenderer {
    pub pipeline: wgpu::RenderPipeline,
    shell_mesh: MeshBuffer,
}

impl AtmosphereRenderer {
    /// Build the pass. `camera_bind_group_layout` is shared with the body
    /// pipeline so one camera bind group serves every pass.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("atmosphere-shader"),
            source: wgpu::ShaderSource::Wgsl(ATMOSPHERE_SHADER_SOURCE.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("atmosphere-pipeline-layout"),
            bind_group_layouts: &[camera_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("atmosphere-pipeline"),
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
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                // Translucent: test against opaque geometry, never write.
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

        let shell = generate_sphere(1.0, SHELL_DETAIL_LEVEL);
        let shell_mesh = BufferAllocator::new(device).upload_sphere("atmosphere-shell", &shell);

        Self {
            pipeline,
            shell_mesh,
        }
    }

    /// Draw `instance_range` shells from the bound instance buffer.
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
        self.shell_mesh.bind(render_pass);
        self.shell_mesh.draw_instanced(render_pass, instance_range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_scale_slightly_exceeds_body() {
        assert!(ATMOSPHERE_SCALE > 1.0 && ATMOSPHERE_SCALE < 1.1);
    }

    #[test]
    fn test_shader_contains_rim_falloff() {
        assert!(ATMOSPHERE_SHADER_SOURCE.contains("RIM_EXPONENT"));
        assert!(ATMOSPHERE_SHADER_SOURCE.contains("fn vs_main"));
        assert!(ATMOSPHERE_SHADER_SOURCE.contains("fn fs_main"));
    }
}
