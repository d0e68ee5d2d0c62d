//! Canonical `wgpu::VertexBufferLayout` for sphere mesh rendering.
//!
//! Every pipeline that draws celestial body geometry (lit bodies, atmosphere
//! shells, rings) references [`SPHERE_VERTEX_LAYOUT`] to avoid layout drift.

use std::mem;

use bytemuck::{Pod, Zeroable};
use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// A sphere mesh vertex: position, unit normal, equirectangular UV.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SphereVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Vertex attributes for the sphere mesh format.
pub const SPHERE_VERTEX_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 24,
        shader_location: 2,
    },
];

/// The vertex buffer layout shared by all sphere-drawing pipelines.
pub const SPHERE_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<SphereVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &SPHERE_VERTEX_ATTRIBUTES,
};

// Stride must match `SphereVertex` size.
static_assertions::const_assert_eq!(mem::size_of::<SphereVertex>(), 32);

/// Attribute offsets must match the field layout.
const _: () = assert!(SPHERE_VERTEX_ATTRIBUTES[0].offset == 0);
const _: () = assert!(SPHERE_VERTEX_ATTRIBUTES[1].offset == 12);
const _: () = assert!(SPHERE_VERTEX_ATTRIBUTES[2].offset == 24);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_stride_matches_vertex_struct_size() {
        assert_eq!(
            SPHERE_VERTEX_LAYOUT.array_stride,
            mem::size_of::<SphereVertex>() as u64,
        );
    }

    #[test]
    fn test_shader_locations_are_sequential() {
        for (i, attr) in SPHERE_VERTEX_ATTRIBUTES.iter().enumerate() {
            assert_eq!(attr.shader_location, i as u32);
        }
    }

    #[test]
    fn test_attribute_formats_match_shader_expectations() {
        assert_eq!(SPHERE_VERTEX_ATTRIBUTES[0].format, VertexFormat::Float32x3);
        assert_eq!(SPHERE_VERTEX_ATTRIBUTES[1].format, VertexFormat::Float32x3);
        assert_eq!(SPHERE_VERTEX_ATTRIBUTES[2].format, VertexFormat::Float32x2);
    }

    #[test]
    fn test_last_attribute_fits_in_stride() {
        let last = &SPHERE_VERTEX_ATTRIBUTES[2];
        assert!(last.offset + 8 <= SPHERE_VERTEX_LAYOUT.array_stride);
    }
}
