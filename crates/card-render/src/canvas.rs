//! Labeled background canvas.

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::text::{TextRenderer, wrap_text};
use crate::{BLACK, WHITE};

/// Label font size (em square in pixels).
pub const DEFAULT_FONT_SIZE: f32 = 100.0;

/// Horizontal offset of the label baseline origin, 4000/64 px.
pub const DEFAULT_ANCHOR_X: f32 = 4000.0 / 64.0;

/// Vertical offset of the label baseline, 7500/64 px.
pub const DEFAULT_BASELINE: f32 = 7500.0 / 64.0;

/// Where the label goes on the background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelPlacement {
    /// Single line starting at a fixed baseline point. Overflow is clipped.
    Anchor { x: f32, baseline: f32 },
    /// Single line, measured and centered horizontally.
    Centered { baseline: f32 },
    /// Left-aligned at `x`, word-wrapped to `max_width`.
    Wrapped { x: f32, baseline: f32, max_width: f32 },
}

impl Default for LabelPlacement {
    fn default() -> Self {
        Self::Anchor {
            x: DEFAULT_ANCHOR_X,
            baseline: DEFAULT_BASELINE,
        }
    }
}

/// Appearance of the label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    pub font_size: f32,
    pub color: Rgba<u8>,
    pub placement: LabelPlacement,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            color: BLACK,
            placement: LabelPlacement::default(),
        }
    }
}

impl LabelStyle {
    /// Builder: set placement.
    pub fn with_placement(mut self, placement: LabelPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Builder: set font size.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }
}

/// Build a `width x height` opaque white canvas with `label` drawn on it.
///
/// The result is fully opaque whatever the renderer does to alpha.
pub fn build_background(
    width: u32,
    height: u32,
    label: &str,
    style: &LabelStyle,
    renderer: &dyn TextRenderer,
) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, WHITE);
    let size = style.font_size;

    match style.placement {
        LabelPlacement::Anchor { x, baseline } => {
            renderer.draw(&mut img, label, x, baseline, size, style.color);
        }
        LabelPlacement::Centered { baseline } => {
            let text_width = renderer.measure(label, size);
            let x = ((width as f32 - text_width) / 2.0).max(0.0);
            renderer.draw(&mut img, label, x, baseline, size, style.color);
        }
        LabelPlacement::Wrapped {
            x,
            baseline,
            max_width,
        } => {
            let lh = renderer.line_height(size);
            let lines = wrap_text(renderer, size, label, max_width);
            for (i, line) in lines.iter().enumerate() {
                let y = baseline + lh * i as f32;
                renderer.draw(&mut img, line, x, y, size, style.color);
            }
        }
    }

    // Anti-aliased glyph edges can round alpha down to 254.
    for pixel in img.pixels_mut() {
        pixel[3] = u8::MAX;
    }

    debug!(width, height, label, placement = ?style.placement, "Built background canvas");
    img
}
