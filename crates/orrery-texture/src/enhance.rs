//! Per-body texture enhancement: brightness, contrast, and saturation.
//!
//! Source imagery varies wildly in exposure; a small per-body profile keeps
//! the rendered bodies reading well side by side.

use crate::image_data::RgbaImage;

/// Multiplicative adjustment profile. 1.0 everywhere is the identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnhanceProfile {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for EnhanceProfile {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

impl EnhanceProfile {
    /// The tuned profile for a body key; unknown keys get the identity.
    pub fn for_body(key: &str) -> Self {
        match key {
            "sun" => Self {
                brightness: 1.3,
                contrast: 1.2,
                ..Self::default()
            },
            "earth" => Self {
                saturation: 1.4,
                ..Self::default()
            },
            "mars" => Self {
                saturation: 1.5,
                ..Self::default()
            },
            "jupiter" => Self {
                contrast: 1.3,
                ..Self::default()
            },
            "saturn" => Self {
                contrast: 1.15,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.brightness == 1.0 && self.contrast == 1.0 && self.saturation == 1.0
    }
}

/// Apply a profile in place. Alpha is never modified, so enhancement composes
/// with matting in either order.
pub fn enhance(image: &mut RgbaImage, profile: &EnhanceProfile) {
    if profile.is_identity() {
        return;
    }

    for y in 0..image.height() {
        for x in 0..image.width() {
            let [r, g, b, a] = image.pixel(x, y);
            let mut rgb = [r as f32, g as f32, b as f32];

            for c in &mut rgb {
                *c *= profile.brightness;
            }
            for c in &mut rgb {
                *c = (*c - 128.0) * profile.contrast + 128.0;
            }
            // Saturation: lerp away from the pixel's luma.
            let luma = 0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2];
            for c in &mut rgb {
                *c = luma + (*c - luma) * profile.saturation;
            }

            image.set_pixel(
                x,
                y,
                [
                    rgb[0].clamp(0.0, 255.0) as u8,
                    rgb[1].clamp(0.0, 255.0) as u8,
                    rgb[2].clamp(0.0, 255.0) as u8,
                    a,
                ],
            );
        }
    }
}
