//! PlateScan - licence plate detection and text region extraction
//!
//! Finds plate-shaped rectangles in BGRA frames, isolates the character
//! band of each plate and hands a normalized crop to a text recognizer.

pub mod config;
pub mod frame;
pub mod vision;

pub use config::AppConfig;
pub use frame::{FrameError, PixelFrame};
pub use vision::{PlatePipeline, PlateReading, Rect, ScanReport};
