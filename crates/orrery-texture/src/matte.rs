//! Background matting: derive a transparency mask from source imagery so the
//! celestial subject can be composited over the scene.
//!
//! The background reference is the dominant color among border pixels. When
//! the border is too varied to name a dominant color, matting soft-fails and
//! returns the image opaque and unmodified rather than guessing.

use crate::image_data::RgbaImage;

/// Length of the RGB-space diagonal, used to normalize color distances.
const RGB_DIAGONAL: f32 = 441.672_96; // sqrt(3 * 255^2)

/// Matting tuning. Mirrors the configuration's matting section; callers map
/// one onto the other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MattingParams {
    /// Background membership threshold as a fraction of the RGB diagonal.
    pub color_threshold: f32,
    /// Fraction of border samples that must agree with the dominant color.
    pub border_agreement: f32,
    /// Width of the partial-alpha edge band as a fraction of `color_threshold`.
    pub edge_softness: f32,
}

impl Default for MattingParams {
    fn default() -> Self {
        Self {
            color_threshold: 0.10,
            border_agreement: 0.60,
            edge_softness: 0.35,
        }
    }
}

/// Whether matting actually masked a background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatteOutcome {
    /// A coherent background was detected and masked to alpha 0.
    Matted,
    /// Border colors were too varied; the image passed through opaque.
    /// Consumers may treat this as a degraded-quality signal.
    NoCoherentBackground,
}

/// Matting result: the derived image plus how it was produced.
#[derive(Debug, Clone)]
pub struct MattedImage {
    pub image: RgbaImage,
    pub outcome: MatteOutcome,
}

/// Matte an image: background pixels get alpha 0, foreground keeps its color
/// at alpha 255, with a linear partial-alpha band at the threshold edge.
///
/// Deterministic for fixed params; calling it twice on the same input yields
/// byte-identical output.
pub fn matte(image: &RgbaImage, params: &MattingParams) -> MattedImage {
    let border = collect_border_pixels(image);

    let Some(reference) = dominant_border_color(&border) else {
        return soft_fail(image);
    };

    let threshold = params.color_threshold * RGB_DIAGONAL;
    let agreeing = border
        .iter()
        .filter(|&&px| color_distance(px, reference) <= threshold)
        .count();
    if (agreeing as f32) < params.border_agreement * border.len() as f32 {
        return soft_fail(image);
    }

    let band = threshold * params.edge_softness;
    let mut out = image.clone();
    for y in 0..image.height() {
        for x in 0..image.width() {
            let [r, g, b, _] = image.pixel(x, y);
            let dist = color_distance([r, g, b, 255], reference);

            let alpha = if dist <= threshold {
                0
            } else if dist < threshold + band {
                // Anti-aliased edge: ramp alpha across the softness band.
                (255.0 * (dist - threshold) / band) as u8
            } else {
                255
            };
            out.set_pixel(x, y, [r, g, b, alpha]);
        }
    }

    MattedImage {
        image: out,
        outcome: MatteOutcome::Matted,
    }
}

fn soft_fail(image: &RgbaImage) -> MattedImage {
    let mut out = image.clone();
    for y in 0..image.height() {
        for x in 0..image.width() {
            let [r, g, b, _] = image.pixel(x, y);
            out.set_pixel(x, y, [r, g, b, 255]);
        }
    }
    MattedImage {
        image: out,
        outcome: MatteOutcome::NoCoherentBackground,
    }
}

/// All pixels on the outermost rows and columns.
fn collect_border_pixels(image: &RgbaImage) -> Vec<[u8; 4]> {
    let (w, h) = (image.width(), image.height());
    let mut border = Vec::with_capacity((2 * (w + h)) as usize);
    for x in 0..w {
        border.push(image.pixel(x, 0));
        if h > 1 {
            border.push(image.pixel(x, h - 1));
        }
    }
    for y in 1..h.saturating_sub(1) {
        border.push(image.pixel(0, y));
        if w > 1 {
            border.push(image.pixel(w - 1, y));
        }
    }
    border
}

/// Mode of the border colors after 4-bit quantization, averaged back to full
/// precision over the winning bin's members.
fn dominant_border_color(border: &[[u8; 4]]) -> Option<[u8; 4]> {
    if border.is_empty() {
        return None;
    }

    let mut counts: std::collections::HashMap<(u8, u8, u8), u32> = std::collections::HashMap::new();
    for px in border {
        *counts.entry(quantize(*px)).or_insert(0) += 1;
    }
    // Deterministic tie-break on the bin key.
    let mode = counts
        .iter()
        .max_by_key(|&(key, count)| (*count, std::cmp::Reverse(*key)))
        .map(|(key, _)| *key)?;

    let members: Vec<&[u8; 4]> = border.iter().filter(|&&px| quantize(px) == mode).collect();
    let n = members.len() as u32;
    let sum = members.iter().fold([0u32; 3], |mut acc, px| {
        acc[0] += px[0] as u32;
        acc[1] += px[1] as u32;
        acc[2] += px[2] as u32;
        acc
    });
    Some([
        (sum[0] / n) as u8,
        (sum[1] / n) as u8,
        (sum[2] / n) as u8,
        255,
    ])
}

fn quantize(px: [u8; 4]) -> (u8, u8, u8) {
    (px[0] >> 4, px[1] >> 4, px[2] >> 4)
}

fn color_distance(a: [u8; 4], b: [u8; 4]) -> f32 {
    let dr = a[0] as f32 - b[0] as f32;
    let dg = a[1] as f32 - b[1] as f32;
    let db = a[2] as f32 - b[2] as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}
