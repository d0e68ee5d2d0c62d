//! Orrery entry point: configuration, validation, logging, and the event loop.

use std::path::PathBuf;

use tracing::error;
use winit::event_loop::{ControlFlow, EventLoop};

use orrery_app::App;
use orrery_config::{CliArgs, Config};

fn main() {
    let args = CliArgs::from_env();

    let config_dir = args
        .config
        .clone()
        .or_else(|| dirs::config_dir().map(|d| d.join("orrery")))
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            // Logging is not up yet.
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args);

    // Configuration contract violations are fatal before the loop starts.
    if let Err(e) = config.validate() {
        eprintln!("invalid configuration: {e}");
        std::process::exit(1);
    }

    orrery_log::init_logging(
        Some(&config_dir.join("logs")),
        cfg!(debug_assertions),
        Some(&config),
    );

    let texture_dir = args
        .texture_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("textures"));

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("failed to create event loop: {e}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, texture_dir);
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("event loop error: {e}");
        std::process::exit(1);
    }
}
