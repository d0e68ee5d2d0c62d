//! Distance-based LOD selection with configurable ratio thresholds.

/// Configuration for ratio-based LOD selection.
///
/// Thresholds are values of `camera_distance / body_radius`. Crossing each
/// threshold steps the selected detail level down by an equal share of the
/// configured level range; beyond the last threshold the minimum level applies.
#[derive(Clone, Debug)]
pub struct RatioThresholds {
    ratios: Vec<f64>,
}

impl RatioThresholds {
    /// Default bands: each doubling of the distance-to-radius ratio past 4
    /// sheds detail, bottoming out past ratio 128.
    pub fn default_bands() -> Self {
        Self {
            ratios: vec![4.0, 8.0, 16.0, 32.0, 64.0, 128.0],
        }
    }

    /// Custom thresholds from a list of ratio boundaries.
    ///
    /// # Panics
    ///
    /// Panics if thresholds are not strictly increasing or contain
    /// non-positive values.
    pub fn custom(ratios: Vec<f64>) -> Self {
        assert!(!ratios.is_empty(), "must have at least one threshold");
        for (i, &r) in ratios.iter().enumerate() {
            assert!(r > 0.0, "thresholds must be positive");
            if i > 0 {
                assert!(r > ratios[i - 1], "thresholds must be strictly increasing");
            }
        }
        Self { ratios }
    }

    /// Number of bands (threshold count).
    pub fn band_count(&self) -> usize {
        self.ratios.len()
    }

    /// The threshold ratios.
    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }
}

/// Selects sphere detail levels from camera distance and body radius.
pub struct LodSelector {
    thresholds: RatioThresholds,
    min_level: u32,
    max_level: u32,
}

impl LodSelector {
    /// Create a selector spanning `[min_level, max_level]` with the given bands.
    pub fn new(thresholds: RatioThresholds, min_level: u32, max_level: u32) -> Self {
        debug_assert!(min_level <= max_level, "inverted LOD range");
        Self {
            thresholds,
            min_level,
            max_level,
        }
    }

    /// Selector with [`RatioThresholds::default_bands`].
    pub fn with_default_bands(min_level: u32, max_level: u32) -> Self {
        Self::new(RatioThresholds::default_bands(), min_level, max_level)
    }

    /// Select the detail level for a body, capped by the active tier's ceiling.
    ///
    /// The level is a non-increasing step function of
    /// `camera_distance / body_radius`. A ratio exactly on a threshold
    /// resolves to the nearer (higher-detail) band.
    pub fn select_level(&self, camera_distance: f64, body_radius: f64, ceiling: u32) -> u32 {
        debug_assert!(camera_distance >= 0.0, "distance must be non-negative");
        let ratio = camera_distance / body_radius.max(f64::MIN_POSITIVE);

        let crossed = self.thresholds.ratios.iter().filter(|&&t| ratio > t).count() as u32;
        let bands = self.thresholds.band_count() as u32;
        let span = self.max_level - self.min_level;

        let level = self.max_level - (crossed * span) / bands;
        level.min(ceiling).clamp(self.min_level, self.max_level)
    }

    pub fn min_level(&self) -> u32 {
        self.min_level
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_selector() -> LodSelector {
        LodSelector::with_default_bands(8, 32)
    }

    /// A body filling the view (ratio ~1) gets the maximum level.
    #[test]
    fn test_near_body_selects_max_level() {
        let selector = default_selector();
        assert_eq!(selector.select_level(5.0, 5.0, u32::MAX), 32);
        assert_eq!(selector.select_level(10.0, 5.0, u32::MAX), 32);
    }

    /// A body far beyond all thresholds gets the minimum level.
    #[test]
    fn test_far_body_selects_min_level() {
        let selector = default_selector();
        assert_eq!(selector.select_level(100_000.0, 5.0, u32::MAX), 8);
        assert_eq!(selector.select_level(f64::MAX, 5.0, u32::MAX), 8);
    }

    /// Level is a non-increasing step function of distance.
    #[test]
    fn test_level_non_increasing_with_distance() {
        let selector = default_selector();
        let mut prev = u32::MAX;
        let mut d = 10.0;
        while d <= 1000.0 {
            let level = selector.select_level(d, 5.0, u32::MAX);
            assert!(
                level <= prev,
                "level increased with distance: d={d}, level={level}, prev={prev}"
            );
            prev = level;
            d += 1.0;
        }
    }

    /// The tier ceiling caps selection at every distance.
    #[test]
    fn test_ceiling_caps_selection_across_sweep() {
        let selector = default_selector();
        let ceiling = 16;
        let mut d = 10.0;
        while d <= 1000.0 {
            let level = selector.select_level(d, 5.0, ceiling);
            assert!(level <= ceiling, "d={d}: level {level} exceeds ceiling");
            assert!(level >= 8, "d={d}: level {level} below range");
            d += 10.0;
        }
    }

    /// A ratio exactly on a threshold resolves to the nearer, higher-detail band.
    #[test]
    fn test_boundary_resolves_to_higher_detail() {
        let selector = default_selector();
        // radius 5, first threshold ratio 4 → boundary distance 20.
        let at_boundary = selector.select_level(20.0, 5.0, u32::MAX);
        let just_past = selector.select_level(20.0 + 1e-9, 5.0, u32::MAX);
        assert_eq!(at_boundary, 32);
        assert!(just_past < at_boundary);
    }

    /// Each crossed band sheds an equal share of the level span.
    #[test]
    fn test_bands_step_evenly() {
        let selector = default_selector();
        // radius 5: band boundaries at distances 20, 40, 80, 160, 320, 640.
        let expected = [
            (10.0, 32),
            (30.0, 28),
            (60.0, 24),
            (120.0, 20),
            (240.0, 16),
            (500.0, 12),
            (1000.0, 8),
        ];
        for (distance, level) in expected {
            assert_eq!(
                selector.select_level(distance, 5.0, u32::MAX),
                level,
                "at distance {distance}"
            );
        }
    }

    /// Custom thresholds override the defaults.
    #[test]
    fn test_custom_thresholds() {
        let selector = LodSelector::new(RatioThresholds::custom(vec![2.0, 10.0]), 8, 24);
        assert_eq!(selector.select_level(5.0, 5.0, u32::MAX), 24);
        assert_eq!(selector.select_level(25.0, 5.0, u32::MAX), 16);
        assert_eq!(selector.select_level(100.0, 5.0, u32::MAX), 8);
    }

    /// Non-increasing custom thresholds panic.
    #[test]
    #[should_panic(expected = "strictly increasing")]
    fn test_non_increasing_thresholds_panic() {
        RatioThresholds::custom(vec![10.0, 5.0, 20.0]);
    }

    /// A degenerate zero radius must not divide by zero.
    #[test]
    fn test_zero_radius_selects_min_level() {
        let selector = default_selector();
        assert_eq!(selector.select_level(100.0, 0.0, u32::MAX), 8);
    }
}
