//! QR code generation for printable table cards.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use qrcode::{Color, QrCode};
use tracing::debug;

use crate::{BLACK, RenderError, Result, WHITE};

/// Width of the light border around the symbol, in modules.
pub const QUIET_ZONE: u32 = 4;

/// Error-correction tier of the generated symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcLevel {
    Low,
    #[default]
    Medium,
    Quartile,
    High,
}

impl From<EcLevel> for qrcode::EcLevel {
    fn from(level: EcLevel) -> Self {
        match level {
            EcLevel::Low => qrcode::EcLevel::L,
            EcLevel::Medium => qrcode::EcLevel::M,
            EcLevel::Quartile => qrcode::EcLevel::Q,
            EcLevel::High => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for EcLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Self::Low),
            "medium" | "m" => Ok(Self::Medium),
            "quartile" | "q" => Ok(Self::Quartile),
            "high" | "h" => Ok(Self::High),
            _ => Err("must be one of 'low', 'medium', 'quartile', 'high'".into()),
        }
    }
}

impl fmt::Display for EcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Quartile => "quartile",
            Self::High => "high",
        };
        f.write_str(name)
    }
}

/// Renders a payload into a square machine-readable bitmap.
pub trait CodeGenerator: Send + Sync {
    /// Produce a `width x width` bitmap encoding `payload` at the given tier.
    fn generate(&self, payload: &str, level: EcLevel, width: u32) -> Result<RgbaImage>;
}

/// [`CodeGenerator`] backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrGenerator;

/// Placement of a symbol inside a square bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleLayout {
    /// Side of one module in pixels.
    pub scale: u32,
    /// Pixel offset of the first data module from the top-left corner.
    pub origin: u32,
}

/// Compute module size and origin for `module_count` modules in `width` pixels.
///
/// The symbol plus its quiet zone is scaled by the largest integer factor
/// that fits and centered; leftover pixels become extra white border.
pub fn module_layout(module_count: u32, width: u32) -> Result<ModuleLayout> {
    let total = module_count + 2 * QUIET_ZONE;
    if width < total {
        return Err(RenderError::InvalidDimensions(format!(
            "QR width {width}px is smaller than the {total} modules required"
        )));
    }
    let scale = width / total;
    let padding = (width - total * scale) / 2;
    Ok(ModuleLayout {
        scale,
        origin: padding + QUIET_ZONE * scale,
    })
}

impl CodeGenerator for QrGenerator {
    fn generate(&self, payload: &str, level: EcLevel, width: u32) -> Result<RgbaImage> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), level.into())
            .map_err(|e| RenderError::Encoding(e.to_string()))?;
        let module_count = code.width() as u32;
        let layout = module_layout(module_count, width)?;

        let mut img = RgbaImage::from_pixel(width, width, WHITE);

        for (i, color) in code.to_colors().iter().enumerate() {
            if *color != Color::Dark {
                continue;
            }
            let x = layout.origin + (i as u32 % module_count) * layout.scale;
            let y = layout.origin + (i as u32 / module_count) * layout.scale;
            for dy in 0..layout.scale {
                for dx in 0..layout.scale {
                    img.put_pixel(x + dx, y + dy, BLACK);
                }
            }
        }

        debug!(
            width,
            module_count,
            scale = layout.scale,
            %level,
            "Generated QR bitmap"
        );
        Ok(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = "https://www.example.ru/my-venue/42";

    #[test]
    fn generate_produces_exact_square() {
        let img = QrGenerator.generate(PAYLOAD, EcLevel::Medium, 900).unwrap();
        assert_eq!(img.dimensions(), (900, 900));
    }

    #[test]
    fn generate_odd_width_is_still_exact() {
        let img = QrGenerator.generate(PAYLOAD, EcLevel::High, 257).unwrap();
        assert_eq!(img.dimensions(), (257, 257));
    }

    #[test]
    fn bitmap_matches_encoded_modules() {
        let width = 900;
        let img = QrGenerator.generate(PAYLOAD, EcLevel::Medium, width).unwrap();

        let code = QrCode::with_error_correction_level(PAYLOAD, qrcode::EcLevel::M).unwrap();
        let n = code.width() as u32;
        let layout = module_layout(n, width).unwrap();
        let half = layout.scale / 2;

        for (i, color) in code.to_colors().iter().enumerate() {
            let x = layout.origin + (i as u32 % n) * layout.scale + half;
            let y = layout.origin + (i as u32 / n) * layout.scale + half;
            let expected = if *color == Color::Dark { BLACK } else { WHITE };
            assert_eq!(img.get_pixel(x, y), &expected, "module {i} mismatch");
        }
    }

    #[test]
    fn quiet_zone_is_white() {
        let img = QrGenerator.generate(PAYLOAD, EcLevel::Medium, 300).unwrap();
        for x in 0..300 {
            assert_eq!(img.get_pixel(x, 0), &WHITE);
            assert_eq!(img.get_pixel(x, 299), &WHITE);
        }
    }

    #[test]
    fn oversized_payload_is_an_encoding_error() {
        let payload = "x".repeat(3000);
        let err = QrGenerator
            .generate(&payload, EcLevel::Medium, 900)
            .unwrap_err();
        assert!(matches!(err, RenderError::Encoding(_)));
    }

    #[test]
    fn too_narrow_width_is_rejected() {
        let err = QrGenerator.generate(PAYLOAD, EcLevel::Medium, 10).unwrap_err();
        assert!(matches!(err, RenderError::InvalidDimensions(_)));
    }

    #[test]
    fn ec_level_parses_names_and_letters() {
        assert_eq!("medium".parse::<EcLevel>().unwrap(), EcLevel::Medium);
        assert_eq!("H".parse::<EcLevel>().unwrap(), EcLevel::High);
        assert!("best".parse::<EcLevel>().is_err());
        assert_eq!(EcLevel::default(), EcLevel::Medium);
    }
}
