//! Whole-frame filters
//!
//! Stateless per-frame operations: box blur, horizontal mirror, grayscale.

use image::{imageops, GrayImage, RgbaImage};
use imageproc::filter::box_filter;

use super::preprocess::{gray_to_rgba, to_grayscale};

/// Box blur with a square `kernel x kernel` window over all four channels
pub fn blur(image: &RgbaImage, kernel: u32) -> RgbaImage {
    let radius = kernel / 2;
    if radius == 0 {
        return image.clone();
    }

    let (width, height) = image.dimensions();
    let mut result = RgbaImage::new(width, height);

    for c in 0..4 {
        let channel = GrayImage::from_fn(width, height, |x, y| {
            image::Luma([image.get_pixel(x, y).0[c]])
        });
        let blurred = box_filter(&channel, radius, radius);
        for (x, y, pixel) in blurred.enumerate_pixels() {
            result.get_pixel_mut(x, y).0[c] = pixel.0[0];
        }
    }

    result
}

/// Mirror around the vertical axis
pub fn flip(image: &RgbaImage) -> RgbaImage {
    imageops::flip_horizontal(image)
}

/// Luminance rendered back to four channels
pub fn grayscale(image: &RgbaImage) -> RgbaImage {
    gray_to_rgba(&to_grayscale(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_flip_mirrors_columns() {
        let mut image = RgbaImage::new(3, 1);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));

        let flipped = flip(&image);
        assert_eq!(flipped.get_pixel(2, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(flipped.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_blur_keeps_uniform_image() {
        let image = RgbaImage::from_pixel(20, 20, Rgba([10, 20, 30, 255]));
        assert_eq!(blur(&image, 15), image);
    }

    #[test]
    fn test_blur_spreads_a_spike() {
        let mut image = RgbaImage::from_pixel(31, 31, Rgba([0, 0, 0, 255]));
        image.put_pixel(15, 15, Rgba([255, 255, 255, 255]));

        let blurred = blur(&image, 15);
        let center = blurred.get_pixel(15, 15).0[0];
        assert!(center > 0 && center < 255);
        assert!(blurred.get_pixel(22, 15).0[0] > 0);
        assert_eq!(blurred.get_pixel(23, 15).0[0], 0);
    }

    #[test]
    fn test_grayscale_is_neutral() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([200, 40, 90, 255]));
        let gray = grayscale(&image);
        let p = gray.get_pixel(1, 1).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        assert_eq!(p[3], 255);
    }
}
