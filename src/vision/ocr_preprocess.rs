//! Contrast stage applied to the text band
//!
//! The band normally passes through unchanged; `Brighten` is kept as a
//! tunable for plates photographed in poor light.

use image::RgbaImage;
use tracing::debug;

use crate::config::ContrastStage;

/// Apply the configured contrast stage, returning a new band image
pub fn apply_contrast_stage(band: &RgbaImage, stage: ContrastStage) -> RgbaImage {
    match stage {
        ContrastStage::Copy => band.clone(),
        ContrastStage::Brighten { alpha, beta } => {
            debug!("Brightening band: alpha={}, beta={}", alpha, beta);
            let mut result = band.clone();
            apply_brighten(&mut result, alpha, beta);
            result
        }
    }
}

/// `saturate(alpha * v + beta)` on RGB, alpha channel unchanged
fn apply_brighten(image: &mut RgbaImage, alpha: f32, beta: f32) {
    for pixel in image.pixels_mut() {
        for c in 0..3 {
            let adjusted = (alpha * pixel.0[c] as f32 + beta).round().clamp(0.0, 255.0);
            pixel.0[c] = adjusted as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_copy_is_identity() {
        let band = RgbaImage::from_pixel(3, 2, Rgba([100, 150, 200, 255]));
        assert_eq!(apply_contrast_stage(&band, ContrastStage::Copy), band);
    }

    #[test]
    fn test_brighten_saturates() {
        let band = RgbaImage::from_pixel(1, 1, Rgba([100, 128, 200, 40]));
        let result = apply_contrast_stage(&band, ContrastStage::brighten());
        // 100*1.5+10 = 160, 128*1.5+10 = 202, 200*1.5+10 = 310 -> 255
        assert_eq!(result.get_pixel(0, 0), &Rgba([160, 202, 255, 40]));
    }
}
