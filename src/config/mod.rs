//! Pipeline Configuration
//!
//! Tunable detection and refinement constants stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Plate candidate detection
    pub detector: DetectorConfig,
    /// Text region refinement
    pub refiner: RefinerConfig,
    /// Whole-frame filters
    pub filters: FilterConfig,
    /// Recognition adapter settings
    pub recognition: RecognitionSettings,
}

/// Candidate detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Low hysteresis threshold for the frame edge map
    pub edge_low_threshold: f32,
    /// High hysteresis threshold for the frame edge map
    pub edge_high_threshold: f32,
    /// Contours with a shorter bounding box are ignored
    pub min_height: i32,
    /// Contour area / bounding box area must exceed this
    pub min_fill_ratio: f64,
    /// Open lower bound for |1 - w/h|
    pub aspect_deviation_min: f64,
    /// Open upper bound for |1 - w/h|
    pub aspect_deviation_max: f64,
    /// Intersection share above which a candidate is a duplicate
    pub overlap_ratio: f64,
    /// Polygon approximation epsilon as a fraction of the perimeter
    pub approx_epsilon_ratio: f64,
    /// Annotation color (RGBA)
    pub highlight_color: [u8; 4],
    /// Annotation stroke in pixels
    pub stroke_width: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            edge_low_threshold: 90.0,
            edge_high_threshold: 180.0,
            min_height: 15,
            min_fill_ratio: 0.6,
            aspect_deviation_min: 2.5,
            aspect_deviation_max: 3.5,
            overlap_ratio: 0.7,
            approx_epsilon_ratio: 0.02,
            highlight_color: [255, 0, 255, 255],
            stroke_width: 3,
        }
    }
}

/// Contrast adjustment applied to the text band before upsampling
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ContrastStage {
    /// Pass the band through unchanged
    #[default]
    Copy,
    /// `saturate(alpha * v + beta)` on the color channels
    Brighten { alpha: f32, beta: f32 },
}

impl ContrastStage {
    /// Brighten preset: `1.5 * v + 10`
    pub fn brighten() -> Self {
        Self::Brighten { alpha: 1.5, beta: 10.0 }
    }
}

/// Text region refinement constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    /// Band starts at `width / band_start_divisor`
    pub band_start_divisor: i32,
    /// Band spans `width / band_width_divisor`
    pub band_width_divisor: f64,
    /// Upsampling factor applied to the band (both axes)
    pub upsample_factor: u32,
    /// A content row/column has more than this share of foreground
    pub band_min_fill: f64,
    /// ...and less than this share
    pub band_max_fill: f64,
    /// Low hysteresis threshold for letter segmentation
    pub letter_edge_low_threshold: f32,
    /// High hysteresis threshold for letter segmentation
    pub letter_edge_high_threshold: f32,
    /// Letter height must be at least this share of the content box height
    pub letter_min_height_ratio: f64,
    /// Open lower bound for a letter's |1 - w/h|
    pub letter_aspect_min: f64,
    /// Open upper bound for a letter's |1 - w/h|
    pub letter_aspect_max: f64,
    /// Padding around the letter envelope
    pub padding: i32,
    /// Normalized region width
    pub canonical_width: u32,
    /// Normalized region height
    pub canonical_height: u32,
    /// Paste a preview of the refinement into the output frame
    pub preview: bool,
    pub preview_width: u32,
    pub preview_height: u32,
    /// Contrast stage for the band
    pub contrast: ContrastStage,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            band_start_divisor: 6,
            band_width_divisor: 2.3,
            upsample_factor: 5,
            band_min_fill: 0.25,
            band_max_fill: 0.75,
            letter_edge_low_threshold: 40.0,
            letter_edge_high_threshold: 80.0,
            letter_min_height_ratio: 0.5,
            letter_aspect_min: 0.2,
            letter_aspect_max: 1.0,
            padding: 5,
            canonical_width: 896,
            canonical_height: 504,
            preview: true,
            preview_width: 224,
            preview_height: 126,
            contrast: ContrastStage::Copy,
        }
    }
}

/// Whole-frame filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Box blur kernel side length (odd)
    pub blur_kernel: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { blur_kernel: 15 }
    }
}

/// How concurrent callers share one recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognizerGuard {
    /// Wait for the recognizer to become free
    #[default]
    Serialize,
    /// Give up on the region if another call holds the recognizer
    SkipWhenBusy,
}

/// Recognition adapter settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    pub guard: RecognizerGuard,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "platescan", "PlateScan")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_detector_constants() {
        let config = AppConfig::default();

        assert_eq!(config.detector.edge_low_threshold, 90.0);
        assert_eq!(config.detector.edge_high_threshold, 180.0);
        assert_eq!(config.detector.min_height, 15);
        assert!((config.detector.min_fill_ratio - 0.6).abs() < 1e-9);
        assert!((config.detector.aspect_deviation_min - 2.5).abs() < 1e-9);
        assert!((config.detector.aspect_deviation_max - 3.5).abs() < 1e-9);
        assert!((config.detector.overlap_ratio - 0.7).abs() < 1e-9);
        assert_eq!(config.detector.stroke_width, 3);
    }

    #[test]
    fn test_default_refiner_constants() {
        let config = AppConfig::default();

        assert_eq!(config.refiner.band_start_divisor, 6);
        assert!((config.refiner.band_width_divisor - 2.3).abs() < 1e-9);
        assert_eq!(config.refiner.upsample_factor, 5);
        assert_eq!(config.refiner.padding, 5);
        assert_eq!(config.refiner.canonical_width, 896);
        assert_eq!(config.refiner.canonical_height, 504);
        assert_eq!(config.refiner.contrast, ContrastStage::Copy);
        assert_eq!(config.filters.blur_kernel, 15);
        assert_eq!(config.recognition.guard, RecognizerGuard::Serialize);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.detector.min_height = 20;
        config.refiner.contrast = ContrastStage::brighten();
        config.recognition.guard = RecognizerGuard::SkipWhenBusy;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.detector.min_height, 20);
        assert_eq!(parsed.refiner.contrast, ContrastStage::Brighten { alpha: 1.5, beta: 10.0 });
        assert_eq!(parsed.recognition.guard, RecognizerGuard::SkipWhenBusy);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[detector]\nmin_height = 30\n").unwrap();

        assert_eq!(parsed.detector.min_height, 30);
        assert_eq!(parsed.detector.edge_low_threshold, 90.0);
        assert_eq!(parsed.refiner.canonical_width, 896);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.detector.min_height, loaded.detector.min_height);
        assert_eq!(config.refiner.canonical_height, loaded.refiner.canonical_height);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
