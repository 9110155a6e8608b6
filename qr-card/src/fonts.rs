//! Label font loading.
//!
//! The bundled DejaVu Sans face is the default so cards render the same on
//! every host. A configured font file or, on request, the first readable
//! system font replaces it.

use std::path::Path;

use card_render::GlyphRenderer;

use crate::error::{CardError, Result};

/// DejaVu Sans, covers Latin and Cyrillic labels.
pub static DEFAULT_FONT_DATA: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Where the label font comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSource<'a> {
    /// Font compiled into the binary.
    Bundled,
    /// A TTF/OTF file on disk.
    File(&'a Path),
    /// First readable font from the platform's usual locations.
    System,
}

impl<'a> FontSource<'a> {
    /// A configured path wins; otherwise system fonts only when asked for.
    pub fn select(path: Option<&'a Path>, use_system: bool) -> Self {
        match path {
            Some(path) => Self::File(path),
            None if use_system => Self::System,
            None => Self::Bundled,
        }
    }
}

/// Build a glyph renderer from `source`.
pub fn load_renderer(source: FontSource<'_>) -> Result<GlyphRenderer> {
    let data = match source {
        FontSource::Bundled => DEFAULT_FONT_DATA.to_vec(),
        FontSource::File(path) => std::fs::read(path).map_err(|e| CardError::io(path, e))?,
        FontSource::System => load_system_font_data()?,
    };
    Ok(GlyphRenderer::from_bytes(data)?)
}

fn load_system_font_data() -> Result<Vec<u8>> {
    for path in system_font_candidates() {
        if let Ok(data) = std::fs::read(path) {
            tracing::info!(path = %path, "Using system font for label");
            return Ok(data);
        }
    }
    Err(CardError::Font(
        "no system font found (unset QR_CARD_SYSTEM_FONT to use the bundled font)".to_string(),
    ))
}

fn system_font_candidates() -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        &[
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
            "/System/Library/Fonts/Helvetica.ttc",
        ]
    }
    #[cfg(target_os = "windows")]
    {
        &[
            "C:\\Windows\\Fonts\\arial.ttf",
            "C:\\Windows\\Fonts\\segoeui.ttf",
        ]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/opentype/noto/NotoSans-Regular.ttf",
        ]
    }
}
