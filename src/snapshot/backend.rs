//! Renderer abstraction for snapshot capture.
//!
//! The engine never knows what a "view" is. Anything that can turn a
//! [`CaptureConfiguration`] into an [`Image`] is a view:
//! - `Canvas` for programmatic drawing (tests and the demo screens)
//! - `Image` itself, as a static view
//! - `ViewFn` for wrapping a closure

use font8x8::{BASIC_FONTS, UnicodeFonts};

use super::types::{CaptureConfiguration, Image, PixelFormat, RenderError};

/// Something the engine can render.
///
/// Rendering must be deterministic for identical configurations in one
/// environment; the engine never retries.
pub trait Renderable: Send + Sync {
    /// Produce a fully materialized image for `config`
    fn render(&self, config: &CaptureConfiguration) -> Result<Image, RenderError>;
}

impl Renderable for Image {
    fn render(&self, _config: &CaptureConfiguration) -> Result<Image, RenderError> {
        Ok(self.clone())
    }
}

/// Adapts a closure into a [`Renderable`]
pub struct ViewFn<F>(pub F);

impl<F> Renderable for ViewFn<F>
where
    F: Fn(&CaptureConfiguration) -> Result<Image, RenderError> + Send + Sync,
{
    fn render(&self, config: &CaptureConfiguration) -> Result<Image, RenderError> {
        (self.0)(config)
    }
}

/// Wrap a closure as a view
pub fn view_fn<F>(f: F) -> ViewFn<F>
where
    F: Fn(&CaptureConfiguration) -> Result<Image, RenderError> + Send + Sync,
{
    ViewFn(f)
}

/// Glyph cell size of the built-in font, in pixels at scale 1
pub const GLYPH_SIZE: u32 = 8;

/// An RGB software canvas for programmatic drawing
///
/// Provides the drawing API the demo screens are built from:
/// - `fill()` - Fill entire buffer with a color
/// - `draw_rect()` / `draw_frame()` - Filled and outlined rectangles
/// - `draw_text()` - Text using font8x8 glyphs, integer-scaled
/// - `get_pixel()` / `set_pixel()` - Direct pixel access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl Canvas {
    /// Create a new canvas, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        let buffer = vec![0u8; width as usize * height as usize * 3];
        Self {
            width,
            height,
            buffer,
        }
    }

    /// Create a canvas initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut canvas = Self::new(width, height);
        canvas.fill(color);
        canvas
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill the entire canvas with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle, clipped to the canvas
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for py in y..y_end {
            for px in x..x_end {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw a rectangle outline of the given thickness
    pub fn draw_frame(&mut self, x: u32, y: u32, w: u32, h: u32, thickness: u32, color: [u8; 3]) {
        let t = thickness.min(w / 2).min(h / 2).max(1);
        self.draw_rect(x, y, w, t, color);
        self.draw_rect(x, (y + h).saturating_sub(t), w, t, color);
        self.draw_rect(x, y, t, h, color);
        self.draw_rect((x + w).saturating_sub(t), y, t, h, color);
    }

    /// Draw text using font8x8 glyphs.
    ///
    /// Each glyph covers `8 * scale` pixels square; only foreground bits are
    /// painted. Text does not wrap and stops at the right edge.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, scale: u32, fg: [u8; 3]) {
        let scale = scale.max(1);
        let advance = GLYPH_SIZE * scale;
        let mut cursor_x = x;
        for ch in text.chars() {
            if cursor_x >= self.width {
                break;
            }
            self.draw_char(cursor_x, y, ch, scale, fg);
            cursor_x += advance;
        }
    }

    /// Pixel width of `text` at `scale`
    pub fn text_width(text: &str, scale: u32) -> u32 {
        text.chars().count() as u32 * GLYPH_SIZE * scale.max(1)
    }

    fn draw_char(&mut self, x: u32, y: u32, ch: char, scale: u32, fg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            for bit in 0..GLYPH_SIZE {
                // font8x8 stores LSB as leftmost pixel
                if (row >> bit) & 1 == 1 {
                    self.draw_rect(
                        x + bit * scale,
                        y + row_idx as u32 * scale,
                        scale,
                        scale,
                        fg,
                    );
                }
            }
        }
    }

    /// Get the color of a pixel; black when out of bounds
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Set the color of a pixel; ignored when out of bounds
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    /// Get the raw RGB buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Freeze into an RGB image
    pub fn into_image(self) -> Image {
        Image::from_parts(self.width, self.height, PixelFormat::Rgb8, self.buffer)
    }

    /// Copy into an RGB image
    pub fn to_image(&self) -> Image {
        self.clone().into_image()
    }
}

impl Renderable for Canvas {
    fn render(&self, _config: &CaptureConfiguration) -> Result<Image, RenderError> {
        Ok(self.to_image())
    }
}
