//! Startup texture loading.
//!
//! Looks for `<body key>.png` / `<body key>.jpg` under the texture directory,
//! decodes and pre-processes each source image, and hands it to the matting
//! workers. Missing or corrupt files are warnings, never errors: the body
//! simply keeps its flat-color placeholder.

use std::path::Path;

use tracing::{info, warn};

use orrery_scene::BodyRegistry;
use orrery_texture::{EnhanceProfile, MattingPipeline, blend_wrap_seam, decode_image, enhance};

/// Fraction of the texture width blended across the horizontal wrap seam.
const SEAM_BAND_FRAC: f32 = 0.05;

/// Submit every available body texture for background matting.
///
/// Returns the number of images handed to the pipeline.
pub fn submit_body_textures(
    texture_dir: &Path,
    registry: &BodyRegistry,
    matting: &mut MattingPipeline,
) -> usize {
    if !texture_dir.is_dir() {
        warn!(
            "texture directory {} not found, rendering with flat colors",
            texture_dir.display()
        );
        return 0;
    }

    let mut submitted = 0;
    for body in registry.iter() {
        let Some(bytes) = read_texture_file(texture_dir, &body.texture_key) else {
            continue;
        };

        let mut image = match decode_image(&bytes) {
            Ok(image) => image,
            Err(e) => {
                warn!("failed to decode texture for '{}': {e}", body.key);
                continue;
            }
        };

        enhance(&mut image, &EnhanceProfile::for_body(&body.texture_key));
        blend_wrap_seam(&mut image, SEAM_BAND_FRAC);

        if matting.submit(&body.texture_key, image) {
            submitted += 1;
        }
    }

    info!("submitted {submitted} textures for matting");
    submitted
}

fn read_texture_file(dir: &Path, key: &str) -> Option<Vec<u8>> {
    for ext in ["png", "jpg", "jpeg"] {
        let path = dir.join(format!("{key}.{ext}"));
        if path.is_file() {
            match std::fs::read(&path) {
                Ok(bytes) => return Some(bytes),
                Err(e) => {
                    warn!("failed to read {}: {e}", path.display());
                    return None;
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_texture::MattingParams;

    #[test]
    fn test_missing_directory_is_soft() {
        let registry = BodyRegistry::solar_system();
        let mut matting = MattingPipeline::new(1, 4, MattingParams::default());
        let submitted =
            submit_body_textures(Path::new("/nonexistent/textures"), &registry, &mut matting);
        assert_eq!(submitted, 0);
    }

    #[test]
    fn test_corrupt_file_is_skipped() {
        let dir = std::env::temp_dir().join("orrery-test-corrupt-texture");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("earth.png"), b"not an image").unwrap();

        let registry = BodyRegistry::solar_system();
        let mut matting = MattingPipeline::new(1, 4, MattingParams::default());
        let submitted = submit_body_textures(&dir, &registry, &mut matting);
        assert_eq!(submitted, 0);

        std::fs::remove_dir_all(&dir).ok();
    }
}
