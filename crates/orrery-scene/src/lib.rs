//! Scene orchestration: the celestial body registry, per-frame LOD and
//! texture resolution, batched draw submission, and the lighting, atmosphere,
//! ring, particle, starfield, and orbit-path passes.

pub mod atmosphere;
pub mod body;
pub mod orbits;
pub mod particles;
pub mod renderer;
pub mod rings;
pub mod starfield;

pub use atmosphere::{ATMOSPHERE_SCALE, AtmosphereRenderer};
pub use body::{BodyRegistry, CelestialBody};
pub use orbits::OrbitPathRenderer;
pub use particles::{ParticleRenderer, ParticleSeed};
pub use renderer::{FrameStats, SceneRenderer};
pub use rings::{RING_INNER_SCALE, RING_OUTER_SCALE, RingRenderer, generate_ring};
pub use starfield::{StarVertex, StarfieldRenderer, generate_starfield};
