//! Recognition adapter
//!
//! The text recognizer is an external engine behind [`TextRecognizer`].
//! [`SharedRecognizer`] puts a lock around it so concurrent pipeline calls
//! never enter the engine at the same time.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::refine::NormalizedTextRegion;
use crate::config::RecognizerGuard;

/// Single recognized token
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    /// Recognized text
    pub text: String,
    /// Recognition confidence, when the engine reports one
    pub confidence: Option<f32>,
}

/// Raw engine output for one region
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrResult {
    /// Full recognized string, as returned by the engine
    pub text: String,
    pub tokens: Vec<OcrToken>,
}

/// A text recognition engine
pub trait TextRecognizer: Send {
    /// Recognize text in a normalized region. `Ok(None)` means the engine
    /// produced nothing.
    fn recognize(&mut self, region: &NormalizedTextRegion) -> Result<Option<OcrResult>>;
}

/// Engine placeholder that never recognizes anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecognizer;

impl TextRecognizer for NullRecognizer {
    fn recognize(&mut self, _region: &NormalizedTextRegion) -> Result<Option<OcrResult>> {
        Ok(None)
    }
}

/// Recognizer shared between pipeline calls
#[derive(Clone)]
pub struct SharedRecognizer {
    engine: Arc<Mutex<Box<dyn TextRecognizer>>>,
    guard: RecognizerGuard,
}

impl SharedRecognizer {
    pub fn new(engine: Box<dyn TextRecognizer>, guard: RecognizerGuard) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            guard,
        }
    }

    /// Run the engine and sanitize its text; `None` when nothing usable
    /// came back (no result, engine error, or busy under `SkipWhenBusy`).
    pub fn recognize(&self, region: &NormalizedTextRegion) -> Option<String> {
        let mut engine = match self.guard {
            RecognizerGuard::Serialize => self.engine.lock(),
            RecognizerGuard::SkipWhenBusy => match self.engine.try_lock() {
                Some(engine) => engine,
                None => {
                    debug!("Recognizer busy, skipping region");
                    return None;
                }
            },
        };

        let result = match engine.recognize(region) {
            Ok(result) => result?,
            Err(e) => {
                warn!("Recognizer failed: {}", e);
                return None;
            }
        };

        let text = sanitize(&result.text);
        (!text.is_empty()).then_some(text)
    }

    /// Display-ready reading: sanitized text, or the attempted crop size
    pub fn read(&self, region: &NormalizedTextRegion) -> String {
        self.recognize(region)
            .unwrap_or_else(|| size_fallback(region.crop_size))
    }
}

impl Default for SharedRecognizer {
    fn default() -> Self {
        Self::new(Box::new(NullRecognizer), RecognizerGuard::default())
    }
}

impl std::fmt::Debug for SharedRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRecognizer")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

/// Strip line breaks and spaces
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\n' | '\r' | ' '))
        .collect()
}

/// Diagnostic reading for a region the recognizer returned nothing for
pub fn size_fallback((width, height): (u32, u32)) -> String {
    format!("size: {},{}", width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use image::GrayImage;

    use crate::vision::geometry::Rect;

    struct FixedRecognizer(&'static str);

    impl TextRecognizer for FixedRecognizer {
        fn recognize(&mut self, _region: &NormalizedTextRegion) -> Result<Option<OcrResult>> {
            Ok(Some(OcrResult {
                text: self.0.to_string(),
                tokens: vec![OcrToken {
                    text: self.0.to_string(),
                    confidence: None,
                }],
            }))
        }
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&mut self, _region: &NormalizedTextRegion) -> Result<Option<OcrResult>> {
            Err(anyhow!("engine offline"))
        }
    }

    fn region() -> NormalizedTextRegion {
        NormalizedTextRegion {
            image: GrayImage::new(896, 504),
            source: Rect::new(3, 4, 120, 60),
            crop_size: (120, 60),
        }
    }

    #[test]
    fn test_sanitize_strips_spaces_and_newlines() {
        assert_eq!(sanitize("AB 12\n34 \r\n"), "AB1234");
    }

    #[test]
    fn test_null_recognizer_falls_back_to_size() {
        let shared = SharedRecognizer::default();
        assert_eq!(shared.read(&region()), "size: 120,60");
    }

    #[test]
    fn test_recognized_text_is_sanitized() {
        let shared = SharedRecognizer::new(
            Box::new(FixedRecognizer("7 ABC\n123")),
            RecognizerGuard::Serialize,
        );
        assert_eq!(shared.read(&region()), "7ABC123");
    }

    #[test]
    fn test_blank_text_counts_as_unavailable() {
        let shared =
            SharedRecognizer::new(Box::new(FixedRecognizer(" \n ")), RecognizerGuard::Serialize);
        assert_eq!(shared.recognize(&region()), None);
        assert_eq!(shared.read(&region()), "size: 120,60");
    }

    #[test]
    fn test_engine_error_counts_as_unavailable() {
        let shared = SharedRecognizer::new(Box::new(FailingRecognizer), RecognizerGuard::Serialize);
        assert_eq!(shared.read(&region()), "size: 120,60");
    }

    #[test]
    fn test_skip_when_busy() {
        let shared =
            SharedRecognizer::new(Box::new(FixedRecognizer("X1")), RecognizerGuard::SkipWhenBusy);
        let held = shared.engine.lock();
        assert_eq!(shared.recognize(&region()), None);
        drop(held);
        assert_eq!(shared.recognize(&region()).as_deref(), Some("X1"));
    }
}
