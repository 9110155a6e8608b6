//! Raster building blocks for printable QR table cards.
//!
//! Provides QR bitmap generation, label rendering on a white background,
//! and alpha-aware composition of the two layers. Everything here works on
//! in-memory `RgbaImage` buffers; persistence is left to the caller.

pub mod canvas;
pub mod compose;
pub mod qr;
pub mod text;

// Re-exports for convenience
pub use canvas::{LabelPlacement, LabelStyle, build_background};
pub use compose::{compose, compose_encoded, compose_files};
pub use qr::{CodeGenerator, EcLevel, QrGenerator};
pub use text::{GlyphRenderer, TextRenderer};

use image::Rgba;

/// Opaque white, the background fill.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Opaque black, used for QR modules and label text.
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Errors that can occur while producing or combining rasters.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("QR encode error: {0}")]
    Encoding(String),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Font error: {0}")]
    Font(String),
}

/// Result type alias for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
