//! Image primitives used by detection and refinement
//!
//! Thin wrappers over `image` / `imageproc` with the exact semantics the
//! pipeline relies on: Otsu binarization, hysteresis edge maps, contour
//! extraction with run compression, cropping by [`Rect`], resampling, and
//! annotation drawing.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::contours::find_contours;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::point::Point;

use super::geometry::{compress_runs, Rect};

/// Foreground value of a binarized image
pub const FOREGROUND: u8 = 255;

/// Luminance of an RGBA image
pub fn to_grayscale(image: &RgbaImage) -> GrayImage {
    imageops::grayscale(image)
}

/// Render a grayscale image as opaque RGBA
pub fn gray_to_rgba(image: &GrayImage) -> RgbaImage {
    DynamicImage::ImageLuma8(image.clone()).to_rgba8()
}

/// Global binarization at the Otsu level: pixels above the level become
/// [`FOREGROUND`], everything else 0.
pub fn binarize_otsu(gray: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(gray);
    let (width, height) = gray.dimensions();

    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if pixel.0[0] > level { FOREGROUND } else { 0 };
        output.put_pixel(x, y, Luma([value]));
    }
    output
}

/// Two-threshold (Canny) edge map
pub fn edge_map(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    imageproc::edges::canny(gray, low, high)
}

/// Boundaries of every connected foreground region and hole, with
/// straight runs compressed to their turning points.
pub fn extract_contours(binary: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .map(|contour| compress_runs(&contour.points))
        .collect()
}

/// Copy out the part of `image` covered by `rect`, clipped to its bounds
pub fn crop_rgba(image: &RgbaImage, rect: Rect) -> Option<RgbaImage> {
    let (width, height) = image.dimensions();
    let r = rect.clamp_to(width, height)?;
    Some(imageops::crop_imm(image, r.x as u32, r.y as u32, r.width as u32, r.height as u32).to_image())
}

/// Grayscale counterpart of [`crop_rgba`]
pub fn crop_gray(image: &GrayImage, rect: Rect) -> Option<GrayImage> {
    let (width, height) = image.dimensions();
    let r = rect.clamp_to(width, height)?;
    Some(imageops::crop_imm(image, r.x as u32, r.y as u32, r.width as u32, r.height as u32).to_image())
}

/// Enlarge by an integer factor with a Lanczos kernel
pub fn upsample(image: &RgbaImage, factor: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if factor <= 1 {
        return image.clone();
    }
    imageops::resize(image, width * factor, height * factor, FilterType::Lanczos3)
}

/// Resize a grayscale image to a fixed size (bilinear)
pub fn resize_gray(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Outline `rect` with a stroke growing inwards from its border
pub fn draw_rect(image: &mut RgbaImage, rect: Rect, color: [u8; 4], stroke: u32) {
    for inset in 0..stroke as i32 {
        let r = rect.pad(-inset);
        if !r.is_valid() {
            break;
        }
        draw_hollow_rect_mut(
            image,
            imageproc::rect::Rect::at(r.x, r.y).of_size(r.width as u32, r.height as u32),
            Rgba(color),
        );
    }
}

/// Paste a grayscale image at the top-left corner, clipped to `target`
pub fn paste_gray(target: &mut RgbaImage, source: &GrayImage) {
    imageops::replace(target, &gray_to_rgba(source), 0, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;

    #[test]
    fn test_binarize_splits_two_levels() {
        let mut gray = GrayImage::from_pixel(10, 10, Luma([30]));
        for x in 0..5 {
            for y in 0..10 {
                gray.put_pixel(x, y, Luma([220]));
            }
        }

        let binary = binarize_otsu(&gray);
        assert_eq!(binary.get_pixel(0, 0).0[0], FOREGROUND);
        assert_eq!(binary.get_pixel(9, 9).0[0], 0);
        assert!(binary.pixels().all(|p| p.0[0] == 0 || p.0[0] == FOREGROUND));
    }

    #[test]
    fn test_edge_map_of_uniform_image_is_empty() {
        let gray = GrayImage::from_pixel(40, 30, Luma([128]));
        let edges = edge_map(&gray, 90.0, 180.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_contours_of_filled_square() {
        let mut binary = GrayImage::new(20, 20);
        draw_filled_rect_mut(
            &mut binary,
            imageproc::rect::Rect::at(5, 5).of_size(8, 6),
            Luma([FOREGROUND]),
        );

        let contours = extract_contours(&binary);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 4);
        assert_eq!(
            super::super::geometry::bounding_rect(&contours[0]),
            Rect::new(5, 5, 8, 6)
        );
    }

    #[test]
    fn test_crop_clips_to_image() {
        let image = RgbaImage::new(10, 10);
        let crop = crop_rgba(&image, Rect::new(6, 6, 10, 10)).unwrap();
        assert_eq!(crop.dimensions(), (4, 4));
        assert!(crop_rgba(&image, Rect::new(20, 20, 5, 5)).is_none());
        assert!(crop_gray(&GrayImage::new(4, 4), Rect::new(0, 0, 0, 3)).is_none());
    }

    #[test]
    fn test_upsample_scales_both_axes() {
        let image = RgbaImage::new(7, 3);
        assert_eq!(upsample(&image, 5).dimensions(), (35, 15));
        assert_eq!(upsample(&image, 1).dimensions(), (7, 3));
    }

    #[test]
    fn test_draw_rect_stroke() {
        let mut image = RgbaImage::new(20, 20);
        draw_rect(&mut image, Rect::new(2, 2, 16, 16), [255, 0, 255, 255], 3);

        assert_eq!(image.get_pixel(2, 10), &Rgba([255, 0, 255, 255]));
        assert_eq!(image.get_pixel(4, 10), &Rgba([255, 0, 255, 255]));
        assert_eq!(image.get_pixel(5, 10), &Rgba([0, 0, 0, 0]));
        assert_eq!(image.get_pixel(17, 10), &Rgba([255, 0, 255, 255]));
    }

    #[test]
    fn test_paste_is_clipped() {
        let mut target = RgbaImage::new(4, 4);
        paste_gray(&mut target, &GrayImage::from_pixel(10, 2, Luma([200])));
        assert_eq!(target.get_pixel(3, 1), &Rgba([200, 200, 200, 255]));
        assert_eq!(target.get_pixel(3, 2), &Rgba([0, 0, 0, 0]));
    }
}
