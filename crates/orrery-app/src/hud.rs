//! Window-title HUD line.
//!
//! The core exposes FPS and the quality tier as plain values; formatting them
//! into the title bar is the whole extent of in-app text rendering.

use orrery_scene::FrameStats;

/// Format the per-frame values for the window title.
///
/// Example: `Orrery | FPS: 60 | Quality: HIGH (adaptive) | Bodies: 10 | Draws: 14`
pub fn format_hud(title: &str, fps: f64, stats: &FrameStats, adaptive: bool) -> String {
    let mode = if adaptive { "adaptive" } else { "locked" };
    format!(
        "{} | FPS: {:.0} | Quality: {} ({}) | Bodies: {} | Draws: {}",
        title,
        fps,
        stats.tier.label(),
        mode,
        stats.bodies_drawn,
        stats.draw_calls,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_lod::QualityTier;

    fn stats(tier: QualityTier) -> FrameStats {
        FrameStats {
            tier,
            bodies_drawn: 10,
            draw_calls: 14,
            particles_active: 256,
            texture_fallbacks: 0,
        }
    }

    #[test]
    fn test_hud_line_contains_all_values() {
        let line = format_hud("Orrery", 59.7, &stats(QualityTier::High), true);
        assert!(line.contains("FPS: 60"));
        assert!(line.contains("Quality: HIGH"));
        assert!(line.contains("adaptive"));
        assert!(line.contains("Bodies: 10"));
        assert!(line.contains("Draws: 14"));
    }

    #[test]
    fn test_hud_marks_frozen_controller() {
        let line = format_hud("Orrery", 30.0, &stats(QualityTier::Medium), false);
        assert!(line.contains("Quality: MED (locked)"));
    }
}
