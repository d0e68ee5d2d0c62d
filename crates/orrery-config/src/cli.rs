//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Orrery command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "orrery", about = "Interactive 3D solar system renderer")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Target frame rate for the adaptive quality controller.
    #[arg(long)]
    pub target_fps: Option<u32>,

    /// Enable or disable adaptive quality.
    #[arg(long)]
    pub adaptive_quality: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory containing celestial body imagery.
    #[arg(long)]
    pub texture_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Parse from the process arguments.
    pub fn from_env() -> Self {
        Self::parse()
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(fs) = args.fullscreen {
            self.window.fullscreen = fs;
        }
        if let Some(fps) = args.target_fps {
            self.render.target_fps = fps;
        }
        if let Some(adaptive) = args.adaptive_quality {
            self.render.adaptive_quality = adaptive;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
