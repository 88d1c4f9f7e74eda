//! Pixel comparison of a candidate image against a baseline.
//!
//! Pure computation: no state, no I/O. Differences are measured per channel
//! and normalized to [0, 1]; a pixel is mismatched when its largest channel
//! difference exceeds the perceptual tolerance.

use super::types::{ComparisonResult, Image, PixelFormat, Verdict};

/// Diff color for a mismatched pixel
pub const MISMATCH_COLOR: [u8; 4] = [255, 0, 255, 255];

/// Diff color for pixels only one of the images covers
pub const OUT_OF_BOUNDS_COLOR: [u8; 4] = [0, 255, 255, 255];

/// Slack used when turning precision into a required pixel count
const PRECISION_EPSILON: f64 = 1e-9;

/// Compare `candidate` with `baseline`.
///
/// The verdict is symmetric in its two image arguments; the diff image is
/// drawn from the candidate's point of view.
pub fn compare(
    candidate: &Image,
    baseline: &Image,
    precision: f64,
    perceptual_tolerance: f64,
) -> ComparisonResult {
    if candidate.dimensions() != baseline.dimensions() {
        return size_mismatch(candidate, baseline);
    }

    let total = candidate.pixel_count();
    let mut mismatched = 0u64;
    let mut max_channel_difference = 0u8;
    for i in 0..total {
        let d = channel_difference(candidate.rgba_at(i), baseline.rgba_at(i));
        max_channel_difference = max_channel_difference.max(d);
        if exceeds_tolerance(d, perceptual_tolerance) {
            mismatched += 1;
        }
    }

    let total = total as u64;
    let verdict = if passes(total, mismatched, precision) {
        Verdict::Pass
    } else {
        Verdict::Fail
    };
    let diff_image = (verdict == Verdict::Fail)
        .then(|| render_diff(candidate, baseline, perceptual_tolerance));

    ComparisonResult {
        verdict,
        mismatched_pixel_fraction: fraction(mismatched, total),
        mismatched_pixels: mismatched,
        total_pixels: total,
        max_channel_difference,
        diff_image,
    }
}

/// Largest absolute difference across the RGBA channels
fn channel_difference(a: [u8; 4], b: [u8; 4]) -> u8 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0)
}

fn exceeds_tolerance(difference: u8, tolerance: f64) -> bool {
    f64::from(difference) / 255.0 > tolerance
}

/// Matching pixels must reach `precision` of the total, decided on counts
fn passes(total: u64, mismatched: u64, precision: f64) -> bool {
    if total == 0 {
        return true;
    }
    let matched = total - mismatched;
    let required = (precision * total as f64 - PRECISION_EPSILON).ceil().max(0.0) as u64;
    matched >= required
}

fn fraction(mismatched: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        mismatched as f64 / total as f64
    }
}

/// Matching pixels are drawn as the candidate's luminance at one third
fn dim(pixel: [u8; 4]) -> [u8; 4] {
    let [r, g, b, _] = pixel;
    let luma = (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000;
    let v = (luma / 3) as u8;
    [v, v, v, 255]
}

fn render_diff(candidate: &Image, baseline: &Image, tolerance: f64) -> Image {
    let mut data = Vec::with_capacity(candidate.pixel_count() * 4);
    for i in 0..candidate.pixel_count() {
        let a = candidate.rgba_at(i);
        let d = channel_difference(a, baseline.rgba_at(i));
        if exceeds_tolerance(d, tolerance) {
            data.extend_from_slice(&MISMATCH_COLOR);
        } else {
            data.extend_from_slice(&dim(a));
        }
    }
    Image::from_parts(candidate.width(), candidate.height(), PixelFormat::Rgba8, data)
}

/// Dimensions differ: no pixel comparison, just a map of where the images
/// overlap (candidate dimmed) and where they do not
fn size_mismatch(candidate: &Image, baseline: &Image) -> ComparisonResult {
    let width = candidate.width().max(baseline.width());
    let height = candidate.height().max(baseline.height());
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let inside_both = x < baseline.width() && y < baseline.height();
            match candidate.pixel(x, y) {
                Some(p) if inside_both => data.extend_from_slice(&dim(p)),
                _ => data.extend_from_slice(&OUT_OF_BOUNDS_COLOR),
            }
        }
    }
    let total = u64::from(width) * u64::from(height);
    ComparisonResult {
        verdict: Verdict::SizeMismatch,
        mismatched_pixel_fraction: 1.0,
        mismatched_pixels: total,
        total_pixels: total,
        max_channel_difference: 0,
        diff_image: Some(Image::from_parts(width, height, PixelFormat::Rgba8, data)),
    }
}
