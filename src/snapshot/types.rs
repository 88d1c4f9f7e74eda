// Core data model for snapshot capture, comparison and storage

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageBuffer, Luma, Rgb, Rgba};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Result type for engine and store operations
pub type SnapshotResult<T> = Result<T, EngineError>;

/// Errors that end a single scenario.
///
/// None of these abort a run: the runner turns each one into a failed
/// record and moves on to the next scenario.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed identity or out-of-range precision/tolerance
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The renderer could not produce an image
    #[error("render failed: {0}")]
    RenderFailure(String),

    /// I/O error in the baseline store
    #[error("storage failure at {}: {source}", .path.display())]
    StorageFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The same identity is already being executed
    #[error("identity '{0}' is already being executed in this run")]
    DuplicateIdentity(String),
}

impl EngineError {
    /// Wrap an I/O error with the location it happened at
    pub fn storage(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        EngineError::StorageFailure {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Short machine-readable kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidConfiguration(_) => "invalid_configuration",
            EngineError::RenderFailure(_) => "render_failure",
            EngineError::StorageFailure { .. } => "storage_failure",
            EngineError::DuplicateIdentity(_) => "duplicate_identity",
        }
    }
}

/// Errors building, encoding or decoding an [`Image`]
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("failed to decode PNG: {0}")]
    Decode(String),

    #[error("failed to encode PNG: {0}")]
    Encode(String),
}

/// Error reported by a renderer
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(msg: impl Into<String>) -> Self {
        RenderError(msg.into())
    }
}

impl From<ImageError> for RenderError {
    fn from(err: ImageError) -> Self {
        RenderError(err.to_string())
    }
}

// ============================================================================
// Image
// ============================================================================

/// Channel layout of an [`Image`] buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Gray8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub const fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// An immutable raster: dimensions, pixel format and a row-major buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Image {
    /// Build an image, checking the buffer holds exactly width x height pixels
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(ImageError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::from_parts(width, height, format, data))
    }

    /// Caller guarantees the buffer length matches
    pub(crate) fn from_parts(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * format.channels());
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// An image where every pixel has the same value.
    ///
    /// `color` is RGBA; channels the format does not carry are dropped
    /// (gray uses the red channel).
    pub fn solid(width: u32, height: u32, format: PixelFormat, color: [u8; 4]) -> Self {
        let pixel: &[u8] = match format {
            PixelFormat::Gray8 => &color[..1],
            PixelFormat::Rgb8 => &color[..3],
            PixelFormat::Rgba8 => &color[..],
        };
        let data = pixel.repeat(width as usize * height as usize);
        Self::from_parts(width, height, format, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at row-major `index`, expanded to RGBA
    pub fn rgba_at(&self, index: usize) -> [u8; 4] {
        let c = self.format.channels();
        let p = &self.data[index * c..index * c + c];
        match self.format {
            PixelFormat::Gray8 => [p[0], p[0], p[0], 255],
            PixelFormat::Rgb8 => [p[0], p[1], p[2], 255],
            PixelFormat::Rgba8 => [p[0], p[1], p[2], p[3]],
        }
    }

    /// Pixel at (x, y), expanded to RGBA; `None` when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.rgba_at(y as usize * self.width as usize + x as usize))
    }

    /// Decode PNG bytes, keeping gray/RGB/RGBA layouts as they are
    pub fn from_png(bytes: &[u8]) -> Result<Self, ImageError> {
        let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .map_err(|e| ImageError::Decode(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        let (format, data) = match decoded {
            DynamicImage::ImageLuma8(buf) => (PixelFormat::Gray8, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (PixelFormat::Rgb8, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (PixelFormat::Rgba8, buf.into_raw()),
            other => (PixelFormat::Rgba8, other.to_rgba8().into_raw()),
        };
        Self::new(width, height, format, data)
    }

    /// Encode as PNG
    pub fn to_png(&self) -> Result<Vec<u8>, ImageError> {
        let (w, h) = self.dimensions();
        let raw = self.data.clone();
        let size_error = || ImageError::Encode("buffer does not match dimensions".to_string());
        let dynamic = match self.format {
            PixelFormat::Gray8 => DynamicImage::ImageLuma8(
                ImageBuffer::<Luma<u8>, _>::from_raw(w, h, raw).ok_or_else(size_error)?,
            ),
            PixelFormat::Rgb8 => DynamicImage::ImageRgb8(
                ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, raw).ok_or_else(size_error)?,
            ),
            PixelFormat::Rgba8 => DynamicImage::ImageRgba8(
                ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, raw).ok_or_else(size_error)?,
            ),
        };
        let mut bytes = Vec::new();
        dynamic
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| ImageError::Encode(e.to_string()))?;
        Ok(bytes)
    }
}

// ============================================================================
// Capture configuration
// ============================================================================

/// Light or dark appearance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorScheme::Light => f.write_str("light"),
            ColorScheme::Dark => f.write_str("dark"),
        }
    }
}

impl FromStr for ColorScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(ColorScheme::Light),
            "dark" => Ok(ColorScheme::Dark),
            other => Err(format!("unknown color scheme '{}'", other)),
        }
    }
}

/// Logical screen size plus pixel density
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Stable name, part of the configuration key
    pub name: String,
    /// Logical width in points
    pub width: u32,
    /// Logical height in points
    pub height: u32,
    /// Pixels per point
    pub scale: u32,
}

/// Largest rendered width or height, in pixels, a device may ask for
pub const MAX_PIXEL_DIMENSION: u32 = 16_384;

static PRESETS: Lazy<Vec<DeviceProfile>> = Lazy::new(|| {
    vec![
        DeviceProfile::new("iphone-se", 320, 568, 2),
        DeviceProfile::new("iphone-8", 375, 667, 2),
        DeviceProfile::new("iphone-13-pro-max", 428, 926, 3),
        DeviceProfile::new("ipad-mini", 768, 1024, 2),
    ]
});

impl DeviceProfile {
    pub fn new(name: impl Into<String>, width: u32, height: u32, scale: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            scale,
        }
    }

    /// A fixed-size frame at 1x, named by its size
    pub fn fixed(width: u32, height: u32) -> Self {
        Self::new(format!("{}x{}", width, height), width, height, 1)
    }

    /// The built-in device presets
    pub fn all_presets() -> &'static [DeviceProfile] {
        &PRESETS
    }

    pub fn iphone_13_pro_max() -> Self {
        PRESETS[2].clone()
    }

    /// Parse a preset name, or a custom `WxH` / `WxH@S` string
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_lowercase();
        if let Some(preset) = PRESETS.iter().find(|p| p.name == lowered) {
            return Some(preset.clone());
        }
        let (size, scale) = match lowered.split_once('@') {
            Some((size, scale)) => (size, scale.trim_end_matches('x').parse().ok()?),
            None => (lowered.as_str(), 1),
        };
        let (w, h) = size.split_once('x')?;
        let width: u32 = w.parse().ok()?;
        let height: u32 = h.parse().ok()?;
        if width == 0 || height == 0 || scale == 0 {
            return None;
        }
        let fits = |points: u32| points.checked_mul(scale).is_some_and(|px| px <= MAX_PIXEL_DIMENSION);
        if !fits(width) || !fits(height) {
            return None;
        }
        let name = if scale == 1 {
            format!("{}x{}", width, height)
        } else {
            format!("{}x{}@{}x", width, height, scale)
        };
        Some(Self::new(name, width, height, scale))
    }

    /// Rendered size in pixels, saturating at `u32::MAX`
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.scale),
            self.height.saturating_mul(self.scale),
        )
    }
}

/// How a view is captured and how strictly the capture is compared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfiguration {
    pub device: DeviceProfile,
    pub color_scheme: ColorScheme,
    pub locale: String,
    /// Minimum fraction of matching pixels, in [0, 1]
    pub precision: f64,
    /// Per-channel difference (normalized to [0, 1]) a pixel may have and still match
    pub perceptual_tolerance: f64,
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            device: DeviceProfile::iphone_13_pro_max(),
            color_scheme: ColorScheme::Light,
            locale: "en_US".to_string(),
            precision: 1.0,
            perceptual_tolerance: 0.0,
        }
    }
}

impl CaptureConfiguration {
    pub fn new(device: DeviceProfile) -> Self {
        Self {
            device,
            ..Default::default()
        }
    }

    pub fn color_scheme(mut self, scheme: ColorScheme) -> Self {
        self.color_scheme = scheme;
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    pub fn perceptual_tolerance(mut self, tolerance: f64) -> Self {
        self.perceptual_tolerance = tolerance;
        self
    }

    /// Key naming this configuration inside a test identity
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.device.name, self.color_scheme, self.locale)
    }

    /// Reject out-of-range (or NaN) precision and tolerance, and devices
    /// too large to render
    pub fn validate(&self) -> SnapshotResult<()> {
        let (w, h) = self.device.pixel_size();
        if w > MAX_PIXEL_DIMENSION || h > MAX_PIXEL_DIMENSION {
            return Err(EngineError::InvalidConfiguration(format!(
                "device '{}' renders at {}x{} pixels, above the {} pixel limit",
                self.device.name, w, h, MAX_PIXEL_DIMENSION
            )));
        }
        if !(0.0..=1.0).contains(&self.precision) {
            return Err(EngineError::InvalidConfiguration(format!(
                "precision must be within [0, 1], got {}",
                self.precision
            )));
        }
        if !(0.0..=1.0).contains(&self.perceptual_tolerance) {
            return Err(EngineError::InvalidConfiguration(format!(
                "perceptual tolerance must be within [0, 1], got {}",
                self.perceptual_tolerance
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Identity, baselines, results
// ============================================================================

/// Names one snapshot case; the key for baseline lookup and storage paths
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestIdentity {
    pub suite_name: String,
    pub case_name: String,
    pub configuration_key: String,
}

impl TestIdentity {
    pub fn new(
        suite_name: impl Into<String>,
        case_name: impl Into<String>,
        configuration_key: impl Into<String>,
    ) -> Self {
        Self {
            suite_name: suite_name.into(),
            case_name: case_name.into(),
            configuration_key: configuration_key.into(),
        }
    }

    /// Identity for a case captured under `config`
    pub fn for_configuration(
        suite_name: impl Into<String>,
        case_name: impl Into<String>,
        config: &CaptureConfiguration,
    ) -> Self {
        Self::new(suite_name, case_name, config.key())
    }

    /// All three fields must be non-empty
    pub fn validate(&self) -> SnapshotResult<()> {
        let fields = [
            ("suite name", &self.suite_name),
            ("case name", &self.case_name),
            ("configuration key", &self.configuration_key),
        ];
        for (label, value) in fields {
            if value.trim().is_empty() {
                return Err(EngineError::InvalidConfiguration(format!(
                    "test identity {} must not be empty",
                    label
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.suite_name, self.case_name, self.configuration_key
        )
    }
}

/// Recorded alongside every baseline image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineMetadata {
    pub captured_at: DateTime<Utc>,
    pub configuration: CaptureConfiguration,
    pub host: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl BaselineMetadata {
    /// Metadata for an image captured now on this machine
    pub fn capture(image: &Image, configuration: &CaptureConfiguration) -> Self {
        Self {
            captured_at: Utc::now(),
            configuration: configuration.clone(),
            host: hostname::get().ok().map(|h| h.to_string_lossy().to_string()),
            width: image.width(),
            height: image.height(),
            format: image.format(),
        }
    }
}

/// The accepted reference image for an identity
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub image: Image,
    /// `None` when the sidecar is missing or unreadable
    pub metadata: Option<BaselineMetadata>,
}

/// Comparator decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    BaselineMissing,
    SizeMismatch,
}

/// Outcome of comparing a candidate with a baseline
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub verdict: Verdict,
    pub mismatched_pixel_fraction: f64,
    pub mismatched_pixels: u64,
    pub total_pixels: u64,
    /// Largest per-channel difference seen, 0-255
    pub max_channel_difference: u8,
    /// Present only on `Fail` and `SizeMismatch`
    pub diff_image: Option<Image>,
}

// ============================================================================
// Run mode and outcomes
// ============================================================================

/// Environment variable consulted for the record signal by default
pub const DEFAULT_RECORD_SIGNAL: &str = "SNAPSHOT_RECORD";

/// Whether a run writes baselines or checks against them.
///
/// Resolved once per process and passed to the engine; never re-read mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Record,
    Verify,
}

impl RunMode {
    /// Resolve from [`DEFAULT_RECORD_SIGNAL`]
    pub fn from_env() -> Self {
        Self::from_env_var(DEFAULT_RECORD_SIGNAL)
    }

    /// Resolve from an arbitrary variable; unset means `Verify`
    pub fn from_env_var(name: &str) -> Self {
        Self::from_signal(env::var(name).ok().as_deref())
    }

    /// Interpret a raw signal value
    pub fn from_signal(value: Option<&str>) -> Self {
        match value {
            Some(v) if is_truthy(v) => RunMode::Record,
            _ => RunMode::Verify,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Record => f.write_str("record"),
            RunMode::Verify => f.write_str("verify"),
        }
    }
}

/// Accepts the usual spellings of "on"; a blank value stays off
fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "all" | "record"
    )
}

/// Why a verify-mode scenario failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No baseline stored for the identity
    BaselineMissing,
    /// Same size, too many mismatched pixels
    ContentMismatch,
    /// Dimensions differ between candidate and baseline
    SizeMismatch {
        baseline: (u32, u32),
        candidate: (u32, u32),
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::BaselineMissing => {
                f.write_str("no baseline recorded; run once in record mode")
            }
            FailureReason::ContentMismatch => f.write_str("rendered pixels differ from baseline"),
            FailureReason::SizeMismatch {
                baseline,
                candidate,
            } => write!(
                f,
                "size changed: baseline {}x{}, candidate {}x{}",
                baseline.0, baseline.1, candidate.0, candidate.1
            ),
        }
    }
}

/// Result of executing one scenario
#[derive(Debug)]
pub enum Outcome {
    Recorded,
    Passed {
        mismatched_pixel_fraction: f64,
    },
    Failed {
        reason: FailureReason,
        mismatched_pixel_fraction: Option<f64>,
        diff_image: Option<Image>,
    },
    Error(EngineError),
}

/// Coarse status of an [`Outcome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Recorded,
    Passed,
    Failed,
    Error,
}

impl Outcome {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            Outcome::Recorded => OutcomeStatus::Recorded,
            Outcome::Passed { .. } => OutcomeStatus::Passed,
            Outcome::Failed { .. } => OutcomeStatus::Failed,
            Outcome::Error(_) => OutcomeStatus::Error,
        }
    }

    /// `true` for `Recorded` and `Passed`
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Recorded | Outcome::Passed { .. })
    }

    pub fn mismatched_pixel_fraction(&self) -> Option<f64> {
        match self {
            Outcome::Passed {
                mismatched_pixel_fraction,
            } => Some(*mismatched_pixel_fraction),
            Outcome::Failed {
                mismatched_pixel_fraction,
                ..
            } => *mismatched_pixel_fraction,
            _ => None,
        }
    }

    pub fn diff_image(&self) -> Option<&Image> {
        match self {
            Outcome::Failed { diff_image, .. } => diff_image.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_new_checks_buffer_size() {
        assert!(Image::new(2, 2, PixelFormat::Rgb8, vec![0; 12]).is_ok());
        let err = Image::new(2, 2, PixelFormat::Rgba8, vec![0; 12]).unwrap_err();
        assert!(matches!(
            err,
            ImageError::BufferSize {
                expected: 16,
                actual: 12
            }
        ));
    }

    #[test]
    fn test_rgba_expansion() {
        let gray = Image::solid(1, 1, PixelFormat::Gray8, [7, 0, 0, 0]);
        assert_eq!(gray.rgba_at(0), [7, 7, 7, 255]);
        let rgb = Image::solid(1, 1, PixelFormat::Rgb8, [1, 2, 3, 0]);
        assert_eq!(rgb.rgba_at(0), [1, 2, 3, 255]);
        assert_eq!(rgb.pixel(1, 0), None);
    }

    #[test]
    fn test_png_keeps_format() {
        let img = Image::solid(3, 2, PixelFormat::Rgba8, [10, 20, 30, 40]);
        let decoded = Image::from_png(&img.to_png().unwrap()).unwrap();
        assert_eq!(decoded, img);

        let gray = Image::solid(4, 4, PixelFormat::Gray8, [99, 0, 0, 0]);
        assert_eq!(Image::from_png(&gray.to_png().unwrap()).unwrap(), gray);
    }

    #[test]
    fn test_from_png_rejects_garbage() {
        assert!(matches!(
            Image::from_png(b"not a png"),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn test_device_presets() {
        let d = DeviceProfile::parse("iPhone-13-Pro-Max").unwrap();
        assert_eq!(d.pixel_size(), (1284, 2778));
        assert_eq!(DeviceProfile::parse("iphone-se").unwrap().scale, 2);
        assert_eq!(DeviceProfile::all_presets().len(), 4);
    }

    #[test]
    fn test_device_custom() {
        assert_eq!(DeviceProfile::parse("300x200"), Some(DeviceProfile::fixed(300, 200)));
        let hi = DeviceProfile::parse("100x50@2x").unwrap();
        assert_eq!(hi.name, "100x50@2x");
        assert_eq!(hi.pixel_size(), (200, 100));
        assert_eq!(DeviceProfile::parse("100"), None);
        assert_eq!(DeviceProfile::parse("0x10"), None);
        assert_eq!(DeviceProfile::parse("phone"), None);
        assert_eq!(DeviceProfile::parse("100000x100000@100000"), None);
        assert_eq!(DeviceProfile::parse("5000x10@4"), None);
        assert!(DeviceProfile::parse("4096x10@4").is_some());
    }

    #[test]
    fn test_oversized_device_is_invalid_configuration() {
        let huge = DeviceProfile::new("huge", 100_000, 100_000, 100_000);
        assert_eq!(huge.pixel_size(), (u32::MAX, u32::MAX));
        assert!(matches!(
            CaptureConfiguration::new(huge).validate(),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_configuration_key() {
        let config = CaptureConfiguration::new(DeviceProfile::fixed(300, 120))
            .color_scheme(ColorScheme::Dark)
            .locale("de_DE");
        assert_eq!(config.key(), "300x120-dark-de_DE");
        assert_eq!(
            CaptureConfiguration::default().key(),
            "iphone-13-pro-max-light-en_US"
        );
    }

    #[test]
    fn test_configuration_validation() {
        assert!(CaptureConfiguration::default().validate().is_ok());
        let bad = [
            CaptureConfiguration::default().precision(1.5),
            CaptureConfiguration::default().precision(-0.1),
            CaptureConfiguration::default().precision(f64::NAN),
            CaptureConfiguration::default().perceptual_tolerance(2.0),
            CaptureConfiguration::default().perceptual_tolerance(f64::NAN),
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(EngineError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_identity_validation() {
        assert!(TestIdentity::new("suite", "case", "cfg").validate().is_ok());
        assert!(TestIdentity::new("", "case", "cfg").validate().is_err());
        assert!(TestIdentity::new("suite", "  ", "cfg").validate().is_err());
        assert!(TestIdentity::new("suite", "case", "").validate().is_err());
        assert_eq!(
            TestIdentity::new("a", "b", "c").to_string(),
            "a/b/c"
        );
    }

    #[test]
    fn test_run_mode_signal() {
        assert_eq!(RunMode::from_signal(None), RunMode::Verify);
        assert_eq!(RunMode::from_signal(Some("1")), RunMode::Record);
        assert_eq!(RunMode::from_signal(Some("TRUE")), RunMode::Record);
        assert_eq!(RunMode::from_signal(Some("record")), RunMode::Record);
        assert_eq!(RunMode::from_signal(Some("")), RunMode::Verify);
        assert_eq!(RunMode::from_signal(Some("  ")), RunMode::Verify);
        assert_eq!(RunMode::from_signal(Some("0")), RunMode::Verify);
        assert_eq!(RunMode::from_signal(Some("false")), RunMode::Verify);
    }

    #[test]
    fn test_outcome_status() {
        assert!(Outcome::Recorded.is_success());
        assert!(Outcome::Passed { mismatched_pixel_fraction: 0.0 }.is_success());
        let failed = Outcome::Failed {
            reason: FailureReason::BaselineMissing,
            mismatched_pixel_fraction: None,
            diff_image: None,
        };
        assert!(!failed.is_success());
        assert_eq!(failed.status(), OutcomeStatus::Failed);
        let err = Outcome::Error(EngineError::RenderFailure("boom".into()));
        assert_eq!(err.status(), OutcomeStatus::Error);
    }
}
