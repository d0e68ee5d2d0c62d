//! Closed-loop adaptive quality controller.
//!
//! Once per completed frame the controller receives the measured duration,
//! smooths it over a ring buffer, and steps the quality tier down or up when
//! the smoothed time sits outside a hysteresis band around the target for an
//! unbroken run of frames. Inside the band nothing changes; a single outlier
//! frame breaks the run and can never move the tier by itself.

use crate::history::FrameTimeHistory;

/// Ordered quality tiers, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// All tiers in ascending order.
    pub const ORDERED: [QualityTier; 3] = [QualityTier::Low, QualityTier::Medium, QualityTier::High];

    /// Short display name for HUD output.
    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::Low => "LOW",
            QualityTier::Medium => "MED",
            QualityTier::High => "HIGH",
        }
    }
}

/// The knobs a tier fixes: a LOD ceiling and the enabled effect set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierPreset {
    /// Maximum sphere detail level the LOD selector may return.
    pub lod_ceiling: u32,
    /// Draw translucent atmosphere shells.
    pub atmosphere: bool,
    /// Draw particle systems.
    pub particles: bool,
    /// Evaluate the specular lighting term.
    pub specular: bool,
    /// Fraction of the process-wide particle budget in use (1.0 / 0.5 / 0.0).
    pub particle_scale: f32,
}

/// A completed tier transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierChange {
    pub from: QualityTier,
    pub to: QualityTier,
}

/// Controller construction parameters, mapped from configuration by the caller
/// so this crate stays free of config-format concerns.
#[derive(Clone, Debug)]
pub struct ControllerParams {
    pub target_fps: u32,
    pub min_lod_level: u32,
    pub max_lod_level: u32,
    pub history_len: usize,
    pub upper_hysteresis: f64,
    pub lower_hysteresis: f64,
    pub sustain_frames: u32,
    pub adaptive: bool,
}

impl Default for ControllerParams {
    fn default() -> Self {
        Self {
            target_fps: 60,
            min_lod_level: 8,
            max_lod_level: 48,
            history_len: 20,
            upper_hysteresis: 0.15,
            lower_hysteresis: 0.15,
            sustain_frames: 12,
            adaptive: true,
        }
    }
}

/// Feedback controller over the quality tier ladder.
///
/// Held by the render loop and fed one measured duration per frame, so it is
/// fully testable with synthetic frame-time sequences.
pub struct QualityController {
    presets: [TierPreset; 3],
    tier_index: usize,
    history: FrameTimeHistory,
    upper_band: f64,
    lower_band: f64,
    sustain_frames: u32,
    over_streak: u32,
    under_streak: u32,
    adaptive: bool,
}

impl QualityController {
    /// Build a controller starting at the highest tier.
    pub fn new(params: &ControllerParams) -> Self {
        debug_assert!(params.target_fps > 0, "target_fps must be validated upstream");
        let target = 1.0 / params.target_fps as f64;
        Self {
            presets: tier_presets(params.min_lod_level, params.max_lod_level),
            tier_index: QualityTier::ORDERED.len() - 1,
            history: FrameTimeHistory::new(params.history_len),
            upper_band: target * (1.0 + params.upper_hysteresis),
            lower_band: target * (1.0 - params.lower_hysteresis),
            sustain_frames: params.sustain_frames,
            over_streak: 0,
            under_streak: 0,
            adaptive: params.adaptive,
        }
    }

    /// Record a completed frame's duration and possibly step the tier.
    ///
    /// Frame times are recorded even while frozen so that re-enabling
    /// adaptivity resumes from a warm window instead of a stale one.
    pub fn end_frame(&mut self, frame_time: f64) -> Option<TierChange> {
        self.history.push(frame_time);

        if !self.adaptive {
            return None;
        }

        if frame_time > self.upper_band {
            self.over_streak += 1;
            self.under_streak = 0;
        } else if frame_time < self.lower_band {
            self.under_streak += 1;
            self.over_streak = 0;
        } else {
            self.over_streak = 0;
            self.under_streak = 0;
        }

        let smoothed = self.history.average()?;

        if self.over_streak >= self.sustain_frames && smoothed > self.upper_band {
            return self.step_down();
        }
        if self.under_streak >= self.sustain_frames && smoothed < self.lower_band {
            return self.step_up();
        }
        None
    }

    fn step_down(&mut self) -> Option<TierChange> {
        self.over_streak = 0;
        self.under_streak = 0;
        if self.tier_index == 0 {
            return None;
        }
        let from = self.tier();
        self.tier_index -= 1;
        Some(TierChange {
            from,
            to: self.tier(),
        })
    }

    fn step_up(&mut self) -> Option<TierChange> {
        self.over_streak = 0;
        self.under_streak = 0;
        if self.tier_index == QualityTier::ORDERED.len() - 1 {
            return None;
        }
        let from = self.tier();
        self.tier_index += 1;
        Some(TierChange {
            from,
            to: self.tier(),
        })
    }

    /// The active tier.
    pub fn tier(&self) -> QualityTier {
        QualityTier::ORDERED[self.tier_index]
    }

    /// The active tier's preset.
    pub fn preset(&self) -> &TierPreset {
        &self.presets[self.tier_index]
    }

    /// Freeze or resume automatic transitions.
    pub fn set_adaptive(&mut self, adaptive: bool) {
        self.adaptive = adaptive;
        self.over_streak = 0;
        self.under_streak = 0;
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    /// Ring-buffer average of recent frame times, if any were recorded.
    pub fn smoothed_frame_time(&self) -> Option<f64> {
        self.history.average()
    }
}

/// Build the three tier presets for a LOD level range.
fn tier_presets(min_level: u32, max_level: u32) -> [TierPreset; 3] {
    let span = max_level.saturating_sub(min_level);
    [
        TierPreset {
            lod_ceiling: min_level,
            atmosphere: false,
            particles: false,
            specular: false,
            particle_scale: 0.0,
        },
        TierPreset {
            lod_ceiling: min_level + span / 2,
            atmosphere: true,
            particles: true,
            specular: false,
            particle_scale: 0.5,
        },
        TierPreset {
            lod_ceiling: max_level,
            atmosphere: true,
            particles: true,
            specular: true,
            particle_scale: 1.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: f64 = 1.0 / 60.0;

    fn controller() -> QualityController {
        QualityController::new(&ControllerParams::default())
    }

    /// The controller starts at the highest tier with all effects on.
    #[test]
    fn test_initial_state_is_highest_tier() {
        let qc = controller();
        assert_eq!(qc.tier(), QualityTier::High);
        assert!(qc.preset().atmosphere);
        assert!(qc.preset().particles);
        assert!(qc.preset().specular);
        assert_eq!(qc.preset().lod_ceiling, 48);
    }

    /// A single 10x-target outlier amid on-target frames must not move the tier.
    #[test]
    fn test_single_outlier_does_not_change_tier() {
        let mut qc = controller();
        for _ in 0..30 {
            assert!(qc.end_frame(TARGET).is_none());
        }
        assert!(qc.end_frame(TARGET * 10.0).is_none());
        for _ in 0..60 {
            assert!(qc.end_frame(TARGET).is_none());
        }
        assert_eq!(qc.tier(), QualityTier::High);
    }

    /// A sustained 3x-target run converges to the lowest tier without
    /// overshooting past it.
    #[test]
    fn test_sustained_overload_converges_to_lowest_tier() {
        let mut qc = controller();
        let mut changes = Vec::new();
        for frame in 0..200 {
            if let Some(change) = qc.end_frame(TARGET * 3.0) {
                changes.push((frame, change));
            }
        }
        assert_eq!(qc.tier(), QualityTier::Low);
        assert_eq!(changes.len(), 2, "exactly High→Medium→Low, no repeats");
        assert_eq!(changes[0].1.to, QualityTier::Medium);
        assert_eq!(changes[1].1.to, QualityTier::Low);
        // Bounded convergence: both steps within a handful of sustain windows.
        assert!(changes[1].0 < 100);
    }

    /// A sustained fast run from a lowered tier climbs back up, one tier per
    /// sustain window, ceiling at High.
    #[test]
    fn test_sustained_headroom_upgrades_to_ceiling() {
        let mut qc = controller();
        for _ in 0..200 {
            qc.end_frame(TARGET * 3.0);
        }
        assert_eq!(qc.tier(), QualityTier::Low);

        for _ in 0..200 {
            qc.end_frame(TARGET * 0.4);
        }
        assert_eq!(qc.tier(), QualityTier::High);

        // Already at the ceiling: further fast frames change nothing.
        for _ in 0..100 {
            assert!(qc.end_frame(TARGET * 0.4).is_none());
        }
        assert_eq!(qc.tier(), QualityTier::High);
    }

    /// Frame times inside the hysteresis band never trigger a transition.
    #[test]
    fn test_in_band_frames_never_transition() {
        let mut qc = controller();
        let sequence = [1.0, 1.1, 0.9, 1.05, 0.95, 1.14, 0.86];
        for _ in 0..50 {
            for factor in sequence {
                assert!(qc.end_frame(TARGET * factor).is_none());
            }
        }
        assert_eq!(qc.tier(), QualityTier::High);
    }

    /// An interrupted over-budget run resets the streak: alternating slow and
    /// on-target frames never sustain long enough to downgrade.
    #[test]
    fn test_broken_streak_prevents_transition() {
        let mut qc = controller();
        for _ in 0..100 {
            qc.end_frame(TARGET * 2.0);
            qc.end_frame(TARGET);
        }
        assert_eq!(qc.tier(), QualityTier::High);
    }

    /// With adaptivity disabled the tier stays put through any sequence.
    #[test]
    fn test_frozen_controller_holds_tier() {
        let mut params = ControllerParams::default();
        params.adaptive = false;
        let mut qc = QualityController::new(&params);

        for _ in 0..300 {
            assert!(qc.end_frame(TARGET * 5.0).is_none());
        }
        assert_eq!(qc.tier(), QualityTier::High);

        // Still recording while frozen.
        assert!(qc.smoothed_frame_time().unwrap() > TARGET * 4.0);
    }

    /// Freezing mid-run holds the tier at its last value; resuming picks the
    /// loop back up from the recorded window.
    #[test]
    fn test_freeze_and_resume() {
        let mut qc = controller();
        for _ in 0..100 {
            qc.end_frame(TARGET * 3.0);
        }
        assert_eq!(qc.tier(), QualityTier::Low);

        qc.set_adaptive(false);
        for _ in 0..100 {
            qc.end_frame(TARGET * 0.2);
        }
        assert_eq!(qc.tier(), QualityTier::Low, "frozen tier must not move");

        qc.set_adaptive(true);
        for _ in 0..100 {
            qc.end_frame(TARGET * 0.2);
        }
        assert_eq!(qc.tier(), QualityTier::High);
    }

    /// Tier presets are ordered: ceilings and effect sets grow with the tier.
    #[test]
    fn test_presets_are_ordered() {
        let presets = tier_presets(8, 48);
        assert!(presets[0].lod_ceiling < presets[1].lod_ceiling);
        assert!(presets[1].lod_ceiling < presets[2].lod_ceiling);
        assert!(!presets[0].atmosphere && presets[2].atmosphere);
        assert_eq!(presets[0].particle_scale, 0.0);
        assert_eq!(presets[1].particle_scale, 0.5);
        assert_eq!(presets[2].particle_scale, 1.0);
    }

    /// Tier ordering matches the derive.
    #[test]
    fn test_tier_ordering() {
        assert!(QualityTier::Low < QualityTier::Medium);
        assert!(QualityTier::Medium < QualityTier::High);
    }
}
