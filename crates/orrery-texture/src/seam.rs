//! Wrap-seam blending for equirectangular textures.
//!
//! Sphere UVs wrap in U, so the left and right texture edges meet on the
//! surface. Blending the edge columns toward each other hides the seam.

use crate::image_data::RgbaImage;

/// Blend the outermost columns of `image` so the horizontal wrap is seamless.
///
/// The band covers `band_frac` of the width, capped at 10 columns. Each
/// column in the left band is averaged with its mirror in the right band and
/// both are overwritten with the mix; interior pixels are untouched.
pub fn blend_wrap_seam(image: &mut RgbaImage, band_frac: f32) {
    let width = image.width();
    let band = ((width as f32 * band_frac) as u32).clamp(1, 10).min(width / 2);
    if width < 2 {
        return;
    }

    for x in 0..band {
        for y in 0..image.height() {
            let left = image.pixel(x, y);
            let right = image.pixel(width - band + x, y);
            let mixed = [
                ((left[0] as u16 + right[0] as u16) / 2) as u8,
                ((left[1] as u16 + right[1] as u16) / 2) as u8,
                ((left[2] as u16 + right[2] as u16) / 2) as u8,
                ((left[3] as u16 + right[3] as u16) / 2) as u8,
            ];
            image.set_pixel(x, y, mixed);
            image.set_pixel(width - band + x, y, mixed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_edges_become_equal() {
        let mut img = RgbaImage::solid(40, 8, [0, 0, 0, 255]);
        for y in 0..8 {
            for x in 0..2 {
                img.set_pixel(x, y, [200, 0, 0, 255]);
                img.set_pixel(39 - x, y, [0, 0, 200, 255]);
            }
        }

        blend_wrap_seam(&mut img, 0.05);
        for y in 0..8 {
            assert_eq!(img.pixel(0, y), img.pixel(38, y));
            assert_eq!(img.pixel(1, y), img.pixel(39, y));
        }
    }

    #[test]
    fn test_interior_pixels_untouched() {
        let mut img = RgbaImage::solid(40, 8, [50, 60, 70, 255]);
        img.set_pixel(20, 4, [1, 2, 3, 255]);

        blend_wrap_seam(&mut img, 0.05);
        assert_eq!(img.pixel(20, 4), [1, 2, 3, 255]);
        assert_eq!(img.pixel(10, 0), [50, 60, 70, 255]);
    }

    #[test]
    fn test_uniform_image_is_a_noop() {
        let mut img = RgbaImage::solid(40, 8, [90, 90, 90, 200]);
        let before = img.clone();
        blend_wrap_seam(&mut img, 0.05);
        assert_eq!(img, before);
    }

    #[test]
    fn test_band_capped_for_tiny_images() {
        // width 3: band clamps to width/2 = 1, no out-of-bounds access.
        let mut img = RgbaImage::solid(3, 3, [10, 10, 10, 255]);
        blend_wrap_seam(&mut img, 0.5);
    }
}
