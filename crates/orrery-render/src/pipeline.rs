//! Lit body pipeline: textured spheres shaded by a single dominant light
//! (the star) over a low ambient floor, with per-tier specular.

use bytemuck::{Pod, Zeroable};
use std::num::NonZeroU64;

use orrery_mesh::SPHERE_VERTEX_LAYOUT;

/// Camera uniform: combined view-projection plus world-space position for
/// the specular half-vector.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
}

/// Lighting uniform. Field order matches the WGSL struct, with explicit
/// padding so vec3 members land on 16-byte boundaries.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LightingUniform {
    /// Star position in world space. (offset 0)
    pub sun_position: [f32; 3],
    /// Ambient floor so night sides stay readable. (offset 12)
    pub ambient: f32,
    /// Star light color. (offset 16)
    pub sun_color: [f32; 3],
    /// Specular term weight; 0 disables the term at lower tiers. (offset 28)
    pub specular_strength: f32,
    /// Blinn-Phong exponent. (offset 32)
    pub shininess: f32,
    /// Padding to a 16-byte multiple. (offset 36)
    pub _pad: [f32; 3],
}

const _: () = assert!(std::mem::size_of::<LightingUniform>() == 48);
const _: () = assert!(std::mem::size_of::<CameraUniform>() == 80);

impl Default for LightingUniform {
    fn default() -> Self {
        Self {
            sun_position: [0.0; 3],
            ambient: 0.15,
            sun_color: [1.0, 1.0, 1.0],
            specular_strength: 1.0,
            shininess: 40.0,
            _pad: [0.0; 3],
        }
    }
}

/// Per-instance data: model matrix columns plus a tint.
///
/// `tint.rgb` fills texels the matting masked out (and tints placeholders);
/// `tint.a` is the emissive blend; 1.0 renders the body self-lit, which is
/// how the star itself is drawn.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BodyInstance {
    pub model: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<BodyInstance>() == 80);

impl BodyInstance {
    /// Instance buffer layout: four mat4 columns then the tint, following the
    /// vertex attributes of [`SPHERE_VERTEX_LAYOUT`].
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<BodyInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 0,
                shader_location: 3,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 16,
                shader_location: 4,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 32,
                shader_location: 5,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 48,
                shader_location: 6,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 64,
                shader_location: 7,
            },
        ],
    };
}

/// The WGSL source for the lit body shader.
pub const BODY_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

struct Lighting {
    sun_position: vec3<f32>,
    ambient: f32,
    sun_color: vec3<f32>,
    specular_strength: f32,
    shininess: f32,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var body_texture: texture_2d<f32>;
@group(1) @binding(1) var body_sampler: sampler;
@group(2) @binding(0) var<uniform> lighting: Lighting;

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
    @location(2) uv: vec2<f32>,
    @location(3) tint: vec4<f32>,
};

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
    // Rotation plus uniform scale only, so the model matrix transforms
    // normals directly (renormalized).
    out.normal = normalize((model * vec4<f32>(in.normal, 0.0)).xyz);
    out.uv = in.uv;
    out.tint = instance.tint;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let tex = textureSample(body_texture, body_sampler, in.uv);
    // Matted-out texels fall back to the body's flat color.
    let albedo = mix(in.tint.rgb, tex.rgb, tex.a);

    let n = normalize(in.normal);
    let to_light = lighting.sun_position - in.world_pos;
    let light_dir = normalize(to_light);
    let diffuse = max(dot(n, light_dir), 0.0);

    let view_dir = normalize(camera.camera_pos.xyz - in.world_pos);
    let half_dir = normalize(light_dir + view_dir);
    let spec = pow(max(dot(n, half_dir), 0.0), lighting.shininess)
        * lighting.specular_strength;

    let lit = albedo * (lighting.ambient + diffuse * lighting.sun_color)
        + spec * lighting.sun_color * diffuse;

    // tint.a = emissive blend: the star ignores its own lighting.
    let color = mix(lit, albedo, in.tint.a);
    return vec4<f32>(color, 1.0);
}
"#;

/// Render pipeline for lit, textured celestial bodies.
pub struct BodyPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub camera_bind_group_layout: wgpu::BindGroupLayout,
    pub lighting_bind_group_layout: wgpu::BindGroupLayout,
}

impl BodyPipeline {
    /// Build the pipeline. `texture_bind_group_layout` comes from the
    /// [`TextureCache`](crate::texture::TextureCache) so every cached texture
    /// binds directly.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
        texture_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("body-shader"),
            source: wgpu::ShaderSource::Wgsl(BODY_SHADER_SOURCE.into()),
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("body-camera-bind-group-layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<CameraUniform>() as u64
                        ),
                    },
                    count: None,
                }],
            });

        let lighting_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("body-lighting-bind-group-layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<LightingUniform>() as u64
                        ),
                    },
                    count: None,
                }],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("body-pipeline-layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
                texture_bind_group_layout,
                &lighting_bind_group_layout,
            ],
            immediate_size: 0,
        });

        let depth_stencil = depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::GreaterEqual, // reverse-Z
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("body-pipeline"),
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
            depth_stencil,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None, // bodies are opaque
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            camera_bind_group_layout,
            lighting_bind_group_layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::create_test_device_queue;

    #[test]
    fn test_uniform_sizes_are_wgsl_compatible() {
        assert_eq!(std::mem::size_of::<LightingUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<CameraUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<BodyInstance>(), 80);
    }

    #[test]
    fn test_instance_layout_follows_vertex_attributes() {
        // Vertex attributes end at location 2; instance data starts at 3.
        let first = BodyInstance::LAYOUT.attributes[0];
        assert_eq!(first.shader_location, 3);
        for (i, attr) in BodyInstance::LAYOUT.attributes.iter().enumerate() {
            assert_eq!(attr.offset, i as u64 * 16);
        }
    }

    #[test]
    fn test_shader_has_expected_entry_points() {
        assert!(BODY_SHADER_SOURCE.contains("fn vs_main"));
        assert!(BODY_SHADER_SOURCE.contains("fn fs_main"));
    }

    #[test]
    fn test_pipeline_creation_succeeds() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let cache = crate::texture::TextureCache::new(&device);
        let _pipeline = BodyPipeline::new(
            &device,
            wgpu::TextureFormat::Bgra8UnormSrgb,
            Some(crate::gpu::DEPTH_FORMAT),
            cache.bind_group_layout(),
        );
    }

    #[test]
    fn test_default_lighting_has_ambient_floor() {
        let lighting = LightingUniform::default();
        assert!(lighting.ambient > 0.0 && lighting.ambient < 0.5);
        assert!(lighting.specular_strength > 0.0);
    }
}
