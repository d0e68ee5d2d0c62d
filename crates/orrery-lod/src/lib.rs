//! Level-of-detail selection and the adaptive quality controller.
//!
//! [`LodSelector`] maps camera-distance-to-radius ratios onto discrete sphere
//! detail levels. [`QualityController`] closes the loop: it consumes measured
//! frame durations and steps a small ladder of quality tiers up or down,
//! with hysteresis so frame-to-frame noise never causes tier flapping.

mod history;
mod quality;
mod selector;

pub use history::FrameTimeHistory;
pub use quality::{
    ControllerParams, QualityController, QualityTier, TierChange, TierPreset,
};
pub use selector::{LodSelector, RatioThresholds};
