//! Layer composition: place the code bitmap over the labeled background.

use std::path::Path;

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::{RenderError, Result};

/// Composite `overlay` over `background` shifted down by `vertical_offset`.
///
/// The result has the background's bounds. The background is copied as-is,
/// then every overlay pixel is blended with [`blend_over`] at `(x, y + offset)`.
/// Overlay pixels that land outside the background are dropped.
pub fn compose(background: &RgbaImage, overlay: &RgbaImage, vertical_offset: i32) -> RgbaImage {
    let mut result = RgbaImage::new(background.width(), background.height());
    result.copy_from_slice(background.as_raw());

    let (width, height) = result.dimensions();
    let cols = overlay.width().min(width);
    let mut clipped_rows = 0u32;

    for y in 0..overlay.height() {
        let target_y = i64::from(y) + i64::from(vertical_offset);
        if target_y < 0 || target_y >= i64::from(height) {
            clipped_rows += 1;
            continue;
        }
        for x in 0..cols {
            let dst = result.get_pixel_mut(x, target_y as u32);
            *dst = blend_over(*dst, *overlay.get_pixel(x, y));
        }
    }

    if clipped_rows > 0 || cols < overlay.width() {
        debug!(
            clipped_rows,
            clipped_cols = overlay.width() - cols,
            vertical_offset,
            "Overlay partially outside background, clipped"
        );
    }

    result
}

/// Decode two encoded rasters (PNG or any format `image` knows) and compose them.
pub fn compose_encoded(
    background: &[u8],
    overlay: &[u8],
    vertical_offset: i32,
) -> Result<RgbaImage> {
    let background = decode(background, "background")?;
    let overlay = decode(overlay, "overlay")?;
    Ok(compose(&background, &overlay, vertical_offset))
}

/// Read two raster files and compose them.
pub fn compose_files(background: &Path, overlay: &Path, vertical_offset: i32) -> Result<RgbaImage> {
    let background = read(background)?;
    let overlay = read(overlay)?;
    compose_encoded(&background, &overlay, vertical_offset)
}

/// Straight-alpha Porter-Duff "source over destination".
///
/// An opaque source replaces the destination, a fully transparent one
/// leaves it untouched.
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = u32::from(src[3]);
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }

    let da = u32::from(dst[3]);
    let inv = 255 - sa;
    // Output alpha scaled by 255; never zero because sa > 0.
    let out_a = sa * 255 + da * inv;

    let mut out = [0u8; 4];
    for i in 0..3 {
        let num = u32::from(src[i]) * sa * 255 + u32::from(dst[i]) * da * inv;
        out[i] = ((num + out_a / 2) / out_a) as u8;
    }
    out[3] = ((out_a + 127) / 255) as u8;
    Rgba(out)
}

fn decode(bytes: &[u8], what: &'static str) -> Result<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|source| RenderError::Decode { what, source })
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| RenderError::Io {
        path: path.display().to_string(),
        source,
    })
}
