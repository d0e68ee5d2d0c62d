//! wgpu rendering plumbing: device and surface lifecycle, buffer allocation,
//! the GPU texture cache, draw-call batching, and the lit body pipeline.

pub mod batching;
pub mod buffer;
pub mod camera;
pub mod gpu;
pub mod pipeline;
pub mod texture;

pub use batching::{DrawCommand, DrawGroup, DrawKey, DrawQueue, InstancedRun, PassKind};
pub use buffer::{BufferAllocator, IndexData, MeshBuffer};
pub use camera::OrbitCamera;
pub use gpu::{
    DEPTH_FORMAT, RenderContext, RenderContextError, SurfaceError, create_depth_texture,
    init_render_context_blocking,
};
pub use pipeline::{
    BODY_SHADER_SOURCE, BodyInstance, BodyPipeline, CameraUniform, LightingUniform,
};
pub use texture::{GpuTexture, TextureCache, TextureUploadError};
