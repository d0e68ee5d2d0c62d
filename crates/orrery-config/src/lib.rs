//! Configuration system for the Orrery renderer.
//!
//! Provides runtime-configurable settings that persist to disk as RON files,
//! CLI overrides via clap, and startup validation of the rendering contracts
//! (LOD range, target frame rate, hysteresis bands). Validation failures are
//! fatal before the render loop starts.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, MattingConfig, QualityConfig, RenderConfig, WindowConfig,
};
pub use error::ConfigError;
