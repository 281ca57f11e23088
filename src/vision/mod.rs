//! Vision Layer
//!
//! Frame operations exposed to the host. Each takes an input/output frame
//! pair; if either frame cannot be converted the call does nothing and the
//! output frame keeps its previous contents.
//!
//! - `blur`, `flip`, `grayscale`: whole-frame filters
//! - `process`: plate detection, text region refinement and recognition

pub mod detection;
pub mod filters;
pub mod geometry;
pub mod ocr;
pub mod ocr_preprocess;
pub mod preprocess;
pub mod refine;

use std::time::Instant;

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::frame::{convert_pair, FrameError, PixelFrame};

pub use detection::{AcceptedRectangleSet, Candidate, CandidateDetector};
pub use geometry::Rect;
pub use ocr::{NullRecognizer, OcrResult, OcrToken, SharedRecognizer, TextRecognizer};
pub use refine::{NoRegionFound, NormalizedTextRegion, Refinement, TextRegionRefiner};

/// Reading shown when refinement found no text region
pub const NO_REGION_TEXT: &str = "nothing";

/// Result for one accepted plate candidate
#[derive(Debug, Clone)]
pub struct PlateReading {
    /// Accepted candidate rectangle in frame coordinates
    pub candidate: Rect,
    /// Normalized text region, or the stage that came up empty
    pub region: Result<NormalizedTextRegion, NoRegionFound>,
    /// Display-ready text
    pub text: String,
}

/// Result of processing one frame
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Accepted candidates in acceptance order
    pub accepted: Vec<Rect>,
    /// One reading per accepted candidate
    pub readings: Vec<PlateReading>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Frame processing pipeline
#[derive(Debug, Clone)]
pub struct PlatePipeline {
    detector: CandidateDetector,
    refiner: TextRegionRefiner,
    recognizer: SharedRecognizer,
    blur_kernel: u32,
}

impl Default for PlatePipeline {
    fn default() -> Self {
        Self::with_config(&AppConfig::default())
    }
}

impl PlatePipeline {
    /// Create a pipeline with the placeholder recognizer
    pub fn with_config(config: &AppConfig) -> Self {
        let recognizer = SharedRecognizer::new(Box::new(NullRecognizer), config.recognition.guard);
        Self::with_recognizer(config, recognizer)
    }

    /// Create a pipeline around a shared recognizer
    pub fn with_recognizer(config: &AppConfig, recognizer: SharedRecognizer) -> Self {
        Self {
            detector: CandidateDetector::new(config.detector.clone()),
            refiner: TextRegionRefiner::new(config.refiner.clone()),
            recognizer,
            blur_kernel: config.filters.blur_kernel,
        }
    }

    pub fn detector(&self) -> &CandidateDetector {
        &self.detector
    }

    pub fn refiner(&self) -> &TextRegionRefiner {
        &self.refiner
    }

    /// Box-blur `input` into `output`
    pub fn blur(&self, input: &PixelFrame, output: &mut PixelFrame) -> bool {
        let kernel = self.blur_kernel;
        apply_filter("blur", input, output, |image| filters::blur(image, kernel))
    }

    /// Mirror `input` horizontally into `output`
    pub fn flip(&self, input: &PixelFrame, output: &mut PixelFrame) -> bool {
        apply_filter("flip", input, output, filters::flip)
    }

    /// Render `input` as grayscale into `output`
    pub fn grayscale(&self, input: &PixelFrame, output: &mut PixelFrame) -> bool {
        apply_filter("grayscale", input, output, filters::grayscale)
    }

    /// Detect plates in `input`, annotate `output`, and read each plate.
    /// Returns `None` when the frames could not be converted.
    pub fn process(&self, input: &PixelFrame, output: &mut PixelFrame) -> Option<ScanReport> {
        let (input_image, mut output_image) = match convert_pair(input, output) {
            Ok(pair) => pair,
            Err(e) => {
                skip_frame("process", &e);
                return None;
            }
        };

        let report = self.process_image(&input_image, &mut output_image);

        if let Err(e) = output.write_rgba(&output_image) {
            skip_frame("process", &e);
            return None;
        }
        Some(report)
    }

    /// [`process`](Self::process) on already converted images
    pub fn process_image(&self, input: &RgbaImage, output: &mut RgbaImage) -> ScanReport {
        let start = Instant::now();
        let refiner_config = self.refiner.config();
        let mut readings = Vec::new();

        let accepted = self.detector.detect(input, output, |rect, canvas| {
            let refinement = self.refiner.refine(input, rect);

            if refiner_config.preview {
                if let Some(preview) = &refinement.preview {
                    let thumb = preprocess::resize_gray(
                        preview,
                        refiner_config.preview_width,
                        refiner_config.preview_height,
                    );
                    preprocess::paste_gray(canvas, &thumb);
                }
            }

            let text = match &refinement.region {
                Ok(region) => self.recognizer.read(region),
                Err(_) => NO_REGION_TEXT.to_string(),
            };
            debug!("Candidate {:?} read as {:?}", rect, text);

            readings.push(PlateReading {
                candidate: rect,
                region: refinement.region,
                text,
            });
        });

        let processing_time = start.elapsed();
        info!(
            "Processed frame in {:?}: {} plates, {} text regions",
            processing_time,
            accepted.len(),
            readings.iter().filter(|r| r.region.is_ok()).count()
        );

        ScanReport {
            accepted,
            readings,
            processing_time_ms: processing_time.as_millis() as u64,
        }
    }
}

fn apply_filter<F>(name: &str, input: &PixelFrame, output: &mut PixelFrame, filter: F) -> bool
where
    F: FnOnce(&RgbaImage) -> RgbaImage,
{
    let (input_image, _) = match convert_pair(input, output) {
        Ok(pair) => pair,
        Err(e) => {
            skip_frame(name, &e);
            return false;
        }
    };

    match output.write_rgba(&filter(&input_image)) {
        Ok(()) => true,
        Err(e) => {
            skip_frame(name, &e);
            false
        }
    }
}

fn skip_frame(operation: &str, error: &FrameError) {
    warn!("Skipping {}: {}", operation, error);
}
