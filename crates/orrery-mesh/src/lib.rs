//! Level-of-detail sphere geometry: UV-sphere generation parameterized by a
//! discrete detail level, and a cache sharing meshes across bodies of equal
//! radius.

pub mod cache;
pub mod sphere;
pub mod vertex;

pub use cache::{MeshCache, MeshKey, RADIUS_BUCKET_STEP, radius_bucket};
pub use sphere::{MIN_RINGS, MIN_SEGMENTS, SphereMesh, generate_sphere};
pub use vertex::{SPHERE_VERTEX_ATTRIBUTES, SPHERE_VERTEX_LAYOUT, SphereVertex};
