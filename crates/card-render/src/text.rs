//! Label text rendering.
//!
//! Wraps glyph rasterization behind [`TextRenderer`] so canvas code only
//! deals with anchors, measurement, and wrapping.

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;

use crate::{RenderError, Result};

/// Draws and measures single lines of text.
///
/// Sizes are font sizes in points at 72 DPI, i.e. the em square in pixels.
/// Anchors are baseline points measured from the canvas's top-left corner.
pub trait TextRenderer: Send + Sync {
    /// Draw `text` with its baseline starting at `(x, baseline)`.
    fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        color: Rgba<u8>,
    );

    /// Horizontal advance of `text` in pixels.
    fn measure(&self, text: &str, size: f32) -> f32;

    /// Distance between successive baselines in pixels.
    fn line_height(&self, size: f32) -> f32;
}

/// [`TextRenderer`] over an owned TrueType/OpenType font.
pub struct GlyphRenderer {
    font: FontVec,
}

impl GlyphRenderer {
    /// Parse font data (TTF/OTF, first face of a collection).
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let font = FontVec::try_from_vec(data)
            .map_err(|_| RenderError::Font("failed to parse font data (TTF/OTF)".into()))?;
        Ok(Self { font })
    }

    fn scale(&self, size: f32) -> PxScale {
        self.font
            .pt_to_px_scale(size)
            .unwrap_or_else(|| PxScale::from(size))
    }
}

impl std::fmt::Debug for GlyphRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphRenderer")
            .field("units_per_em", &self.font.units_per_em())
            .finish()
    }
}

impl TextRenderer for GlyphRenderer {
    fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        color: Rgba<u8>,
    ) {
        let scale = self.scale(size);
        // draw_text_mut positions the top of the ascent, not the baseline.
        let top = baseline - self.font.as_scaled(scale).ascent();
        draw_text_mut(
            canvas,
            color,
            x.floor() as i32,
            top.round() as i32,
            scale,
            &self.font,
            text,
        );
    }

    fn measure(&self, text: &str, size: f32) -> f32 {
        let scaled = self.font.as_scaled(self.scale(size));
        let mut width = 0.0f32;
        let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

        for ch in text.chars() {
            let glyph_id = scaled.glyph_id(ch);
            if let Some(prev) = prev_glyph {
                width += scaled.kern(prev, glyph_id);
            }
            width += scaled.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }

        width
    }

    fn line_height(&self, size: f32) -> f32 {
        let scaled = self.font.as_scaled(self.scale(size));
        scaled.ascent() - scaled.descent() + scaled.line_gap()
    }
}

/// Wrap text to fit within `max_width` pixels.
///
/// Breaks on whitespace; a single word wider than the limit is split
/// character by character. Always returns at least one line.
pub fn wrap_text(
    renderer: &dyn TextRenderer,
    size: f32,
    text: &str,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0.0f32;

    for word in text.split_inclusive(|c: char| c.is_whitespace()) {
        let word_width = renderer.measure(word, size);

        if current_width + word_width > max_width && !current_line.is_empty() {
            lines.push(current_line.trim_end().to_string());
            current_line = String::new();
            current_width = 0.0;
        }

        let bare = word.trim_end();
        if renderer.measure(bare, size) > max_width && current_line.is_empty() {
            for ch in bare.chars() {
                let ch_w = renderer.measure(ch.encode_utf8(&mut [0; 4]), size);
                if current_width + ch_w > max_width && !current_line.is_empty() {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0.0;
                }
                current_line.push(ch);
                current_width += ch_w;
            }
            let tail = &word[bare.len()..];
            current_line.push_str(tail);
            current_width += renderer.measure(tail, size);
            continue;
        }

        current_line.push_str(word);
        current_width += word_width;
    }

    if !current_line.is_empty() {
        lines.push(current_line.trim_end().to_string());
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
