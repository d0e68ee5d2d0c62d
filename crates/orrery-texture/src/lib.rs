//! CPU-side texture asset pipeline: decode, background matting, enhancement,
//! seam blending, and an asynchronous matting worker pool.
//!
//! Everything here is pure pixel work with no GPU dependency; the render
//! crate owns upload and bind-group creation. Matting is deterministic for a
//! fixed [`MattingParams`], so cached results never diverge between runs.

pub mod enhance;
pub mod image_data;
pub mod matte;
pub mod pipeline;
pub mod seam;

pub use enhance::{EnhanceProfile, enhance};
pub use image_data::{RgbaImage, TextureError, decode_image};
pub use matte::{MatteOutcome, MattedImage, MattingParams, matte};
pub use pipeline::{MattingPipeline, MattingResult, MattingTask};
pub use seam::blend_wrap_seam;
