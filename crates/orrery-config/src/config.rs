//! Configuration structs with sensible defaults, RON persistence, and startup validation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level renderer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Rendering settings.
    pub render: RenderConfig,
    /// Adaptive quality controller settings.
    pub quality: QualityConfig,
    /// Texture background-matting settings.
    pub matting: MattingConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Start in fullscreen mode.
    pub fullscreen: bool,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Target frame rate the adaptive controller steers toward.
    pub target_fps: u32,
    /// Lowest sphere detail level (longitude segments) the LOD ladder may select.
    pub min_lod_level: u32,
    /// Highest sphere detail level the LOD ladder may select.
    pub max_lod_level: u32,
    /// Enable the closed-loop quality controller. When off, the tier freezes
    /// at its last value and frame times are only recorded.
    pub adaptive_quality: bool,
    /// Process-wide particle budget at the highest quality tier.
    pub particle_budget: u32,
    /// MSAA sample count (1, 2, 4).
    pub msaa_samples: u32,
}

/// Adaptive quality controller tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    /// Capacity of the frame-time ring buffer used for smoothing.
    pub history_len: usize,
    /// Fraction above 1/target_fps the smoothed frame time must exceed
    /// before a downgrade is considered.
    pub upper_hysteresis: f64,
    /// Fraction below 1/target_fps the smoothed frame time must stay under
    /// before an upgrade is considered.
    pub lower_hysteresis: f64,
    /// Consecutive out-of-band frames required before a tier transition.
    pub sustain_frames: u32,
}

/// Background matting tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MattingConfig {
    /// Color-distance threshold for background membership, as a fraction of
    /// the RGB-space diagonal.
    pub color_threshold: f32,
    /// Fraction of border samples that must agree with the dominant border
    /// color for the background to count as coherent.
    pub border_agreement: f32,
    /// Width of the partial-alpha edge band, as a fraction of `color_threshold`.
    pub edge_softness: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Show FPS and quality tier in the window title.
    pub show_fps: bool,
    /// Draw orbit path overlays.
    pub show_orbits: bool,
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fullscreen: false,
            vsync: true,
            title: "Orrery".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            min_lod_level: 8,
            max_lod_level: 48,
            adaptive_quality: true,
            particle_budget: 2048,
            msaa_samples: 1,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            history_len: 20,
            upper_hysteresis: 0.15,
            lower_hysteresis: 0.15,
            sustain_frames: 12,
        }
    }
}

impl Default for MattingConfig {
    fn default() -> Self {
        Self {
            color_threshold: 0.10,
            border_agreement: 0.60,
            edge_softness: 0.35,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            show_fps: true,
            show_orbits: true,
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload / Validate ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Validate configuration contracts that the render loop depends on.
    ///
    /// Must be called before the loop starts; a violation here is a startup
    /// contract failure, not a recoverable runtime condition.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render.min_lod_level > self.render.max_lod_level {
            return Err(ConfigError::InvalidLodRange {
                min: self.render.min_lod_level,
                max: self.render.max_lod_level,
            });
        }
        if self.render.target_fps == 0 {
            return Err(ConfigError::InvalidTargetFps);
        }
        for (which, value) in [
            ("upper_hysteresis", self.quality.upper_hysteresis),
            ("lower_hysteresis", self.quality.lower_hysteresis),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::InvalidHysteresis { which, value });
            }
        }
        if self.quality.history_len == 0 || self.quality.sustain_frames == 0 {
            return Err(ConfigError::InvalidQualityWindow);
        }
        for (which, value) in [
            ("color_threshold", self.matting.color_threshold),
            ("border_agreement", self.matting.border_agreement),
            ("edge_softness", self.matting.edge_softness),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::InvalidMattingThreshold { which, value });
            }
        }
        Ok(())
    }
}
