//! Application shell: window bootstrap, the per-frame closed loop, input
//! mapping onto the orbit camera, and the window-title HUD.

pub mod app;
pub mod assets;
pub mod frame;
pub mod hud;

pub use app::App;
pub use frame::FrameClock;
pub use hud::format_hud;
