//! Text region refinement
//!
//! Narrows a plate candidate down to the printed characters:
//!
//! 1. crop the text band of the plate template
//! 2. upsample it so projection counts are stable
//! 3. binarize and trim to the dense content box
//! 4. segment letter contours inside the box and union them
//! 5. pad, clamp, crop from the unbinarized band and normalize
//!
//! Any stage that comes up empty ends refinement with a [`NoRegionFound`]
//! naming that stage.

use image::{GrayImage, RgbaImage};
use thiserror::Error;
use tracing::debug;

use super::geometry::{bounding_rect, Rect};
use super::ocr_preprocess::apply_contrast_stage;
use super::preprocess::{
    binarize_otsu, crop_gray, crop_rgba, edge_map, extract_contours, resize_gray, to_grayscale,
    upsample, FOREGROUND,
};
use crate::config::RefinerConfig;

/// Why refinement produced no region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoRegionFound {
    #[error("candidate too small for a text band")]
    EmptyBand,
    #[error("no dense content rows or columns after binarization")]
    NoContentBox,
    #[error("no letter-shaped contours in the content box")]
    NoLetters,
    #[error("padded letter envelope is degenerate")]
    DegenerateCrop,
}

/// Grayscale text region at the canonical size
#[derive(Debug, Clone)]
pub struct NormalizedTextRegion {
    /// Normalized image handed to the recognizer
    pub image: GrayImage,
    /// Crop rectangle in upsampled band coordinates
    pub source: Rect,
    /// Size of the crop before normalization
    pub crop_size: (u32, u32),
}

/// Outcome of refining one candidate
#[derive(Debug, Clone)]
pub struct Refinement {
    pub region: Result<NormalizedTextRegion, NoRegionFound>,
    /// Final crop, or the furthest intermediate reached
    pub preview: Option<GrayImage>,
}

impl Refinement {
    fn failed(reason: NoRegionFound, preview: Option<GrayImage>) -> Self {
        debug!("No text region: {}", reason);
        Self {
            region: Err(reason),
            preview,
        }
    }
}

/// Crops candidate plates down to their character string
#[derive(Debug, Clone, Default)]
pub struct TextRegionRefiner {
    config: RefinerConfig,
}

impl TextRegionRefiner {
    pub fn new(config: RefinerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RefinerConfig {
        &self.config
    }

    /// Refine the candidate `rect` of `frame`
    pub fn refine(&self, frame: &RgbaImage, rect: Rect) -> Refinement {
        let Some(plate) = crop_rgba(frame, rect) else {
            return Refinement::failed(NoRegionFound::EmptyBand, None);
        };

        let (plate_w, plate_h) = plate.dimensions();
        let Some(band) = self
            .text_band(plate_w, plate_h)
            .and_then(|band| crop_rgba(&plate, band))
        else {
            return Refinement::failed(NoRegionFound::EmptyBand, None);
        };

        let band = apply_contrast_stage(&band, self.config.contrast);
        let upsampled = upsample(&band, self.config.upsample_factor);
        let gray = to_grayscale(&upsampled);
        let binary = binarize_otsu(&gray);

        let Some(content) = self.trim_to_content_box(&binary) else {
            return Refinement::failed(NoRegionFound::NoContentBox, Some(gray));
        };
        let Some(trimmed) = crop_gray(&binary, content) else {
            return Refinement::failed(NoRegionFound::NoContentBox, Some(gray));
        };

        let letters = self.letter_boxes(&trimmed);
        let Some(envelope) = letter_envelope(&letters) else {
            return Refinement::failed(NoRegionFound::NoLetters, Some(trimmed));
        };

        let (gray_w, gray_h) = gray.dimensions();
        let Some(source) = pad_and_clamp(
            envelope,
            (content.x, content.y),
            self.config.padding,
            (gray_w, gray_h),
        ) else {
            return Refinement::failed(NoRegionFound::DegenerateCrop, Some(trimmed));
        };
        let Some(crop) = crop_gray(&gray, source) else {
            return Refinement::failed(NoRegionFound::DegenerateCrop, Some(trimmed));
        };

        debug!(
            "Text region {:?} ({} letters) in {}x{} band",
            source,
            letters.len(),
            gray_w,
            gray_h
        );

        let image = resize_gray(
            &crop,
            self.config.canonical_width,
            self.config.canonical_height,
        );
        Refinement {
            region: Ok(NormalizedTextRegion {
                image,
                source,
                crop_size: crop.dimensions(),
            }),
            preview: Some(crop),
        }
    }

    /// Horizontal band of the plate expected to hold the characters
    pub fn text_band(&self, plate_width: u32, plate_height: u32) -> Option<Rect> {
        let width = plate_width as i32;
        let x = width / self.config.band_start_divisor;
        let band_width = (width as f64 / self.config.band_width_divisor) as i32;
        let band = Rect::new(x, 0, band_width, plate_height as i32);
        band.is_valid().then_some(band)
    }

    /// Bounding box of the rows and columns whose foreground share lies
    /// strictly between `band_min_fill` and `band_max_fill`.
    ///
    /// Right and bottom boundaries are exclusive: the last qualifying row
    /// and column bound the box but are not part of it.
    pub fn trim_to_content_box(&self, binary: &GrayImage) -> Option<Rect> {
        let (width, height) = binary.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let row_counts: Vec<u32> = (0..height)
            .map(|y| (0..width).filter(|&x| is_foreground(binary, x, y)).count() as u32)
            .collect();
        let col_counts: Vec<u32> = (0..width)
            .map(|x| (0..height).filter(|&y| is_foreground(binary, x, y)).count() as u32)
            .collect();

        let row_ok = |count: u32| self.is_content_line(count, width);
        let col_ok = |count: u32| self.is_content_line(count, height);

        let cy = row_counts.iter().position(|&c| row_ok(c))? as i32;
        let cy2 = row_counts.iter().rposition(|&c| row_ok(c))? as i32;
        let cx = col_counts.iter().position(|&c| col_ok(c))? as i32;
        let cx2 = col_counts.iter().rposition(|&c| col_ok(c))? as i32;

        if cx < cx2 && cy < cy2 {
            Some(Rect::from_corners(cx, cy, cx2, cy2))
        } else {
            None
        }
    }

    fn is_content_line(&self, foreground: u32, len: u32) -> bool {
        let foreground = foreground as f64;
        let background = len as f64 - foreground;
        let len = len as f64;
        foreground > self.config.band_min_fill * len
            && background > (1.0 - self.config.band_max_fill) * len
    }

    /// Bounding boxes of glyph-shaped contours in a trimmed binary box
    pub fn letter_boxes(&self, trimmed: &GrayImage) -> Vec<Rect> {
        let edges = edge_map(
            trimmed,
            self.config.letter_edge_low_threshold,
            self.config.letter_edge_high_threshold,
        );
        let min_height = trimmed.height() as f64 * self.config.letter_min_height_ratio;

        extract_contours(&edges)
            .iter()
            .map(|contour| bounding_rect(contour))
            .filter(|rect| rect.is_valid() && rect.height as f64 >= min_height)
            .filter(|rect| {
                let deviation = rect.aspect_deviation();
                deviation > self.config.letter_aspect_min && deviation < self.config.letter_aspect_max
            })
            .collect()
    }
}

fn is_foreground(binary: &GrayImage, x: u32, y: u32) -> bool {
    binary.get_pixel(x, y).0[0] == FOREGROUND
}

/// Union of all letter boxes, `None` without letters
pub fn letter_envelope(letters: &[Rect]) -> Option<Rect> {
    let (first, rest) = letters.split_first()?;
    Some(rest.iter().fold(*first, |acc, r| acc.union(r)))
}

/// Move the envelope from content-box to band coordinates, pad it, and
/// clamp it to `[0, width) x [0, height)`.
pub fn pad_and_clamp(
    envelope: Rect,
    (offset_x, offset_y): (i32, i32),
    padding: i32,
    (width, height): (u32, u32),
) -> Option<Rect> {
    envelope
        .translate(offset_x, offset_y)
        .pad(padding)
        .clamp_to(width, height)
}
