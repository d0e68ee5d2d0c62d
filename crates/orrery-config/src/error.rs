//! Configuration error types.

/// Errors that can occur when loading, saving, parsing, or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the config file to disk.
    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),

    /// The LOD range is inverted: the minimum level exceeds the maximum.
    #[error("invalid LOD range: min_lod_level ({min}) > max_lod_level ({max})")]
    InvalidLodRange { min: u32, max: u32 },

    /// The target frame rate is zero, which makes the frame-time budget undefined.
    #[error("target_fps must be non-zero")]
    InvalidTargetFps,

    /// A hysteresis fraction falls outside the open interval (0, 1).
    #[error("hysteresis fraction {value} for {which} must be in (0, 1)")]
    InvalidHysteresis { which: &'static str, value: f64 },

    /// The frame-time history or sustain window has zero length.
    #[error("quality controller window sizes must be non-zero")]
    InvalidQualityWindow,

    /// A matting threshold falls outside the open interval (0, 1).
    #[error("matting threshold {value} for {which} must be in (0, 1)")]
    InvalidMattingThreshold { which: &'static str, value: f32 },
}
