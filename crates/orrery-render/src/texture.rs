//! GPU texture cache: upload, mipmap generation, bind groups, and shared
//! ownership of every celestial body texture.
//!
//! The cache is the longest-lived holder of GPU texture memory. `insert` is
//! idempotent per key: a present key returns the existing entry without a
//! second upload, so racing first-use callers resolve to exactly one matting
//! and upload. Everything is released together when the cache drops at
//! pipeline teardown.

use std::collections::HashMap;
use std::sync::Arc;

use orrery_texture::RgbaImage;

/// Errors surfaced for a single asset's upload. The affected body falls back
/// to its placeholder; the pipeline keeps running.
#[derive(Debug, thiserror::Error)]
pub enum TextureUploadError {
    /// The image exceeds the device's 2D texture limit.
    #[error("texture {width}x{height} exceeds device limit {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// A cached GPU texture with its view and ready-to-bind group.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
    pub dimensions: (u32, u32),
    pub mip_level_count: u32,
}

/// Number of mip levels for the given dimensions.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    (width.max(height) as f32).log2().floor() as u32 + 1
}

/// WGSL for mipmap generation via fullscreen-triangle blit.
const MIP_BLIT_SHADER_SOURCE: &str = r#"
@group(0) @binding(0) var src_texture: texture_2d<f32>;
@group(0) @binding(1) var src_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(src_texture, src_sampler, in.uv);
}
"#;

/// Texture format for all body imagery.
const BODY_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Cache of uploaded celestial body textures, keyed by body texture key.
pub struct TextureCache {
    textures: HashMap<String, Arc<GpuTexture>>,
    /// Interned dense ids for draw-key sorting, stable per key for the
    /// process lifetime.
    texture_ids: HashMap<String, u32>,
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    blit_shader: wgpu::ShaderModule,
    blit_pipeline_layout: wgpu::PipelineLayout,
    blit_bind_group_layout: wgpu::BindGroupLayout,
    blit_sampler: wgpu::Sampler,
    max_dimension: u32,
}

impl TextureCache {
    /// Create the cache with its shared sampler and bind group layout.
    pub fn new(device: &wgpu::Device) -> Self {
        // Linear filtering with horizontal repeat: sphere UVs wrap in U and
        // clamp in V at the poles.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("body-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("body-texture-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let blit_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("mip-blit-bind-group-layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mip-blit-shader"),
            source: wgpu::ShaderSource::Wgsl(MIP_BLIT_SHADER_SOURCE.into()),
        });

        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mip-blit-pipeline-layout"),
            bind_group_layouts: &[&blit_bind_group_layout],
            immediate_size: 0,
        });

        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("mip-blit-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let max_dimension = device.limits().max_texture_dimension_2d;

        Self {
            textures: HashMap::new(),
            texture_ids: HashMap::new(),
            sampler,
            bind_group_layout,
            blit_shader,
            blit_pipeline_layout,
            blit_bind_group_layout,
            blit_sampler,
            max_dimension,
        }
    }

    /// Upload an RGBA8 image under `key`, generating mipmaps and a bind group.
    ///
    /// Idempotent: if `key` is already cached, the existing entry is returned
    /// and no upload happens.
    pub fn insert(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        key: &str,
        image: &RgbaImage,
    ) -> Result<Arc<GpuTexture>, TextureUploadError> {
        if let Some(existing) = self.textures.get(key) {
            return Ok(Arc::clone(existing));
        }

        let (width, height) = (image.width(), image.height());
        if width > self.max_dimension || height > self.max_dimension {
            return Err(TextureUploadError::TooLarge {
                width,
                height,
                max: self.max_dimension,
            });
        }

        let mip_levels = mip_level_count(width, height);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(key),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: BODY_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        if mip_levels > 1 {
            self.generate_mipmaps(device, queue, &texture, mip_levels);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{key}-bind-group")),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let entry = Arc::new(GpuTexture {
            texture,
            view,
            bind_group,
            dimensions: (width, height),
            mip_level_count: mip_levels,
        });

        self.textures.insert(key.to_string(), Arc::clone(&entry));
        let next_id = self.texture_ids.len() as u32;
        self.texture_ids.entry(key.to_string()).or_insert(next_id);
        log::info!("Uploaded texture '{key}' ({width}x{height}, {mip_levels} mips)");
        Ok(entry)
    }

    /// Fetch a cached texture.
    pub fn get(&self, key: &str) -> Option<Arc<GpuTexture>> {
        self.textures.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.textures.contains_key(key)
    }

    /// Dense id for draw-key sorting. Stable once a key has been uploaded.
    pub fn texture_id(&self, key: &str) -> Option<u32> {
        self.texture_ids.get(key).copied()
    }

    /// The bind group layout all body textures share.
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Downsample mip level N from level N-1 with render-pass blits.
    fn generate_mipmaps(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
        mip_count: u32,
    ) {
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mip-blit-pipeline"),
            layout: Some(&self.blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.blit_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &self.blit_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: BODY_TEXTURE_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mip-blit-encoder"),
        });

        for level in 1..mip_count {
            let src_view = texture.create_view(&wgpu::TextureViewDescriptor {
                base_mip_level: level - 1,
                mip_level_count: Some(1),
                ..Default::default()
            });
            let dst_view = texture.create_view(&wgpu::TextureViewDescriptor {
                base_mip_level: level,
                mip_level_count: Some(1),
                ..Default::default()
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mip-blit-bind-group"),
                layout: &self.blit_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&src_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.blit_sampler),
                    },
                ],
            });

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mip-blit-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &dst_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Create a test GPU device and queue. Returns `None` if no adapter exists
/// (headless CI without GPU), letting tests skip gracefully.
#[cfg(test)]
pub(crate) fn create_test_device_queue() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;

        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: Default::default(),
                ..Default::default()
            })
            .await
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count_calculation() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(4, 4), 3);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(512, 256), 10);
    }

    #[test]
    fn test_insert_and_get() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut cache = TextureCache::new(&device);

        let image = RgbaImage::solid(4, 4, [255, 0, 0, 255]);
        let tex = cache.insert(&device, &queue, "mars", &image).unwrap();
        assert_eq!(tex.dimensions, (4, 4));
        assert!(cache.contains("mars"));
        assert!(cache.get("mars").is_some());
        assert!(cache.get("venus").is_none());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut cache = TextureCache::new(&device);

        let image = RgbaImage::solid(2, 2, [0, 255, 0, 255]);
        let first = cache.insert(&device, &queue, "earth", &image).unwrap();
        let second = cache.insert(&device, &queue, "earth", &image).unwrap();
        assert!(
            Arc::ptr_eq(&first, &second),
            "second insert must observe the first's entry"
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_mipmaps_generated_for_large_textures() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut cache = TextureCache::new(&device);

        let image = RgbaImage::solid(256, 256, [128, 128, 128, 255]);
        let tex = cache.insert(&device, &queue, "moon", &image).unwrap();
        assert_eq!(tex.mip_level_count, 9);
    }

    #[test]
    fn test_oversized_texture_fails_per_asset() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut cache = TextureCache::new(&device);
        // Claim a tiny limit so the test stays cheap.
        cache.max_dimension = 8;

        let image = RgbaImage::solid(16, 16, [1, 2, 3, 255]);
        let result = cache.insert(&device, &queue, "jupiter", &image);
        assert!(matches!(result, Err(TextureUploadError::TooLarge { .. })));
        assert!(!cache.contains("jupiter"), "failed upload must not cache");
    }

    #[test]
    fn test_texture_ids_are_dense_and_stable() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut cache = TextureCache::new(&device);

        let image = RgbaImage::solid(2, 2, [9, 9, 9, 255]);
        cache.insert(&device, &queue, "sun", &image).unwrap();
        cache.insert(&device, &queue, "mercury", &image).unwrap();

        let sun_id = cache.texture_id("sun").unwrap();
        let mercury_id = cache.texture_id("mercury").unwrap();
        assert_ne!(sun_id, mercury_id);

        cache.insert(&device, &queue, "sun", &image).unwrap();
        assert_eq!(cache.texture_id("sun").unwrap(), sun_id);
    }
}
