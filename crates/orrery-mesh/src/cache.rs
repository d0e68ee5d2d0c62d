//! Mesh cache keyed by (radius bucket, detail level).
//!
//! Bodies of equal radius share meshes rather than holding per-body copies;
//! the cache is the longest-lived holder and entries are never regenerated.

use std::collections::HashMap;
use std::sync::Arc;

use crate::sphere::{SphereMesh, generate_sphere};

/// Radii are quantized to this step so nearly-equal bodies share geometry.
pub const RADIUS_BUCKET_STEP: f32 = 0.25;

/// Quantize a radius into its sharing bucket.
pub fn radius_bucket(radius: f32) -> u32 {
    (radius / RADIUS_BUCKET_STEP).round().max(1.0) as u32
}

/// Cache key: one mesh per (radius bucket, clamped detail level) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshKey {
    pub radius_bucket: u32,
    pub detail_level: u32,
}

/// Lazily-populated sphere mesh cache.
///
/// Single-writer: the render thread owns the cache and mutates it between
/// draw submissions. Entries are `Arc`-shared with GPU upload bookkeeping and
/// live for the process lifetime. Growth is bounded by
/// `max_level - min_level + 1` distinct levels per radius bucket.
pub struct MeshCache {
    min_level: u32,
    max_level: u32,
    meshes: HashMap<MeshKey, Arc<SphereMesh>>,
}

impl MeshCache {
    /// Create a cache that clamps requested detail levels to `[min_level, max_level]`.
    pub fn new(min_level: u32, max_level: u32) -> Self {
        debug_assert!(min_level <= max_level, "inverted LOD range");
        Self {
            min_level,
            max_level,
            meshes: HashMap::new(),
        }
    }

    /// Clamp a requested detail level into the configured range.
    pub fn clamp_level(&self, level: u32) -> u32 {
        level.clamp(self.min_level, self.max_level)
    }

    /// Fetch the mesh for `(radius, detail_level)`, generating it on first use.
    pub fn get_or_generate(&mut self, radius: f32, detail_level: u32) -> Arc<SphereMesh> {
        let key = MeshKey {
            radius_bucket: radius_bucket(radius),
            detail_level: self.clamp_level(detail_level),
        };
        Arc::clone(self.meshes.entry(key).or_insert_with(|| {
            let bucket_radius = key.radius_bucket as f32 * RADIUS_BUCKET_STEP;
            Arc::new(generate_sphere(bucket_radius, key.detail_level))
        }))
    }

    /// Number of distinct meshes generated so far.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn min_level(&self) -> u32 {
        self.min_level
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }
}
