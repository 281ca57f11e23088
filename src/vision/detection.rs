//! Plate candidate detection
//!
//! Finds elongated, solid rectangles in the frame's edge map: contours
//! whose bounding box has plate proportions and which nearly fill that
//! box. Overlapping finds are collapsed so each plate is reported once.

use image::{GrayImage, RgbaImage};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use serde::Serialize;
use tracing::debug;

use super::geometry::{bounding_rect, contour_area, Rect};
use super::preprocess::{draw_rect, edge_map, extract_contours, gray_to_rgba, to_grayscale};
use crate::config::DetectorConfig;

/// Measurements of one contour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Bounding box of the contour
    pub rect: Rect,
    /// Polygon area of the contour
    pub contour_area: f64,
    /// `contour_area / rect.area()`
    pub fill_ratio: f64,
    /// `|1 - width / height|` of the bounding box
    pub aspect_deviation: f64,
    /// Vertex count of the simplified polygon
    pub approx_vertices: usize,
}

/// Rectangles accepted during one detection call
#[derive(Debug, Clone, Default)]
pub struct AcceptedRectangleSet {
    rects: Vec<Rect>,
    overlap_ratio: f64,
}

impl AcceptedRectangleSet {
    pub fn new(overlap_ratio: f64) -> Self {
        Self {
            rects: Vec::new(),
            overlap_ratio,
        }
    }

    /// Whether `rect` overlaps an accepted rectangle by more than the
    /// overlap ratio of either one's area
    pub fn is_duplicate(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|existing| {
            let shared = rect.intersect(existing).area() as f64;
            shared > rect.area() as f64 * self.overlap_ratio
                || shared > existing.area() as f64 * self.overlap_ratio
        })
    }

    /// Add `rect` unless it duplicates an accepted one
    pub fn try_insert(&mut self, rect: Rect) -> bool {
        if self.is_duplicate(&rect) {
            return false;
        }
        self.rects.push(rect);
        true
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn into_vec(self) -> Vec<Rect> {
        self.rects
    }
}

/// Edge- and contour-based plate detector
#[derive(Debug, Clone, Default)]
pub struct CandidateDetector {
    config: DetectorConfig,
}

impl CandidateDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect plates in `input`.
    ///
    /// `output` is replaced by the edge map and each accepted rectangle is
    /// outlined on it. `on_accept` runs for every new rectangle, in
    /// acceptance order, before the next contour is considered.
    pub fn detect<F>(&self, input: &RgbaImage, output: &mut RgbaImage, mut on_accept: F) -> Vec<Rect>
    where
        F: FnMut(Rect, &mut RgbaImage),
    {
        let edges = self.edge_map(input);
        *output = gray_to_rgba(&edges);

        let contours = extract_contours(&edges);
        let mut accepted = AcceptedRectangleSet::new(self.config.overlap_ratio);
        let mut plate_shaped = 0usize;

        for contour in &contours {
            let Some(candidate) = self.evaluate(contour) else {
                continue;
            };
            if !self.is_plate_shaped(&candidate) {
                continue;
            }
            plate_shaped += 1;

            if !accepted.try_insert(candidate.rect) {
                debug!("Duplicate candidate {:?}", candidate.rect);
                continue;
            }

            debug!(
                "Accepted candidate {:?}: fill={:.3}, aspect={:.3}, vertices={}",
                candidate.rect, candidate.fill_ratio, candidate.aspect_deviation, candidate.approx_vertices
            );
            draw_rect(
                output,
                candidate.rect,
                self.config.highlight_color,
                self.config.stroke_width,
            );
            on_accept(candidate.rect, &mut *output);
        }

        debug!(
            "{} contours, {} plate-shaped, {} accepted",
            contours.len(),
            plate_shaped,
            accepted.len()
        );

        accepted.into_vec()
    }

    /// Edge map of the full frame
    pub fn edge_map(&self, input: &RgbaImage) -> GrayImage {
        edge_map(
            &to_grayscale(input),
            self.config.edge_low_threshold,
            self.config.edge_high_threshold,
        )
    }

    /// Measure a contour; `None` if its bounding box is too short
    pub fn evaluate(&self, contour: &[Point<i32>]) -> Option<Candidate> {
        let rect = bounding_rect(contour);
        if rect.height < self.config.min_height || !rect.is_valid() {
            return None;
        }

        let area = contour_area(contour);
        let epsilon = arc_length(contour, true) * self.config.approx_epsilon_ratio;
        // approximate_polygon_dp rejects a zero epsilon
        let approx_vertices = if epsilon > 0.0 {
            approximate_polygon_dp(contour, epsilon, true).len()
        } else {
            contour.len()
        };

        Some(Candidate {
            rect,
            contour_area: area,
            fill_ratio: area / rect.area() as f64,
            aspect_deviation: rect.aspect_deviation(),
            approx_vertices,
        })
    }

    /// Fill and aspect test, both bounds open
    pub fn is_plate_shaped(&self, candidate: &Candidate) -> bool {
        candidate.fill_ratio > self.config.min_fill_ratio
            && candidate.aspect_deviation > self.config.aspect_deviation_min
            && candidate.aspect_deviation < self.config.aspect_deviation_max
    }
}
