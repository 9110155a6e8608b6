//! Run configuration: defaults, environment overrides, and geometry checks.

use std::path::PathBuf;
use std::time::Duration;

use card_render::canvas::{DEFAULT_ANCHOR_X, DEFAULT_BASELINE};
use card_render::{EcLevel, LabelPlacement, LabelStyle};

use super::LabelAlign;
use super::defaults::{self, *};
use super::validation::validate_setting;
use crate::error::{CardError, Result};
use crate::fonts::FontSource;

/// Everything one card generation run needs.
#[derive(Debug, Clone)]
pub struct CardConfig {
    /// URI encoded into the QR code; its last two segments name the output.
    pub payload: String,
    /// Text drawn on the background.
    pub label: String,
    /// Card width, also the QR code side.
    pub width: u32,
    /// Card height.
    pub height: u32,
    /// Top edge of the QR code on the card. Horizontal offset is always 0.
    pub vertical_offset: u32,
    pub ec_level: EcLevel,
    pub label_align: LabelAlign,
    /// Label font file. `None` uses the bundled font.
    pub font_path: Option<PathBuf>,
    /// Without `font_path`, prefer the first system font over the bundled one.
    pub use_system_font: bool,
    pub output_dir: PathBuf,
    /// Write both layers to disk and reload them before compositing.
    pub persist_interim: bool,
    /// Parent of the scoped interim directory.
    pub interim_dir: PathBuf,
    pub timeout: Option<Duration>,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            payload: "https://www.example.ru/my-venue/42".into(),
            label: "Стол №10".into(),
            width: 900,
            height: 1020,
            vertical_offset: 120,
            ec_level: EcLevel::Medium,
            label_align: LabelAlign::Anchor,
            font_path: None,
            use_system_font: false,
            output_dir: PathBuf::from("."),
            persist_interim: false,
            interim_dir: std::env::temp_dir(),
            timeout: None,
        }
    }
}

impl CardConfig {
    /// Load from `QR_CARD_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` for each setting key. Unset or empty values take
    /// the default; every provided value is validated.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| -> Result<Option<String>> {
            match lookup(key).filter(|v| !v.is_empty()) {
                Some(value) => {
                    validate_setting(key, &value).map_err(|reason| CardError::config(key, reason))?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        };
        let or_default = |key: &str| -> Result<String> {
            let fallback = || defaults::get_default(key).unwrap_or_default().to_string();
            Ok(get(key)?.unwrap_or_else(fallback))
        };

        let width: u32 = parse(WIDTH, &or_default(WIDTH)?)?;
        let height: u32 = parse(HEIGHT, &or_default(HEIGHT)?)?;
        let vertical_offset = match get(VERTICAL_OFFSET)? {
            Some(v) => parse(VERTICAL_OFFSET, &v)?,
            None => derived_offset(width, height)?,
        };
        let timeout_secs: u64 = parse(TIMEOUT_SECS, &or_default(TIMEOUT_SECS)?)?;

        let config = Self {
            payload: or_default(PAYLOAD)?,
            label: or_default(LABEL)?,
            width,
            height,
            vertical_offset,
            ec_level: parse(EC_LEVEL, &or_default(EC_LEVEL)?)?,
            label_align: parse(LABEL_ALIGN, &or_default(LABEL_ALIGN)?)?,
            font_path: get(FONT_PATH)?.map(PathBuf::from),
            use_system_font: or_default(SYSTEM_FONT)? == "true",
            output_dir: PathBuf::from(or_default(OUTPUT_DIR)?),
            persist_interim: or_default(PERSIST_INTERIM)? == "true",
            interim_dir: get(INTERIM_DIR)?
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the geometry invariants: non-empty card, and the square QR code
    /// (side `width`) lies fully inside the card after the vertical offset.
    pub fn validate(&self) -> Result<()> {
        if self.payload.trim().is_empty() {
            return Err(CardError::config(PAYLOAD, "must not be empty"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CardError::config(WIDTH, "card dimensions must be non-zero"));
        }
        let bottom = u64::from(self.vertical_offset) + u64::from(self.width);
        if bottom > u64::from(self.height) {
            return Err(CardError::config(
                VERTICAL_OFFSET,
                format!(
                    "QR code of {}px at offset {} does not fit in a {}px tall card",
                    self.width, self.vertical_offset, self.height
                ),
            ));
        }
        Ok(())
    }

    /// Offset in the compositor's signed coordinates.
    pub fn overlay_offset(&self) -> Result<i32> {
        i32::try_from(self.vertical_offset)
            .map_err(|_| CardError::config(VERTICAL_OFFSET, "offset out of range"))
    }

    /// Label font selected by `font_path` and `use_system_font`.
    pub fn font_source(&self) -> FontSource<'_> {
        FontSource::select(self.font_path.as_deref(), self.use_system_font)
    }

    /// Label style for the configured alignment, with reference font size and anchor.
    pub fn label_style(&self) -> LabelStyle {
        let placement = match self.label_align {
            LabelAlign::Anchor => LabelPlacement::default(),
            LabelAlign::Center => LabelPlacement::Centered {
                baseline: DEFAULT_BASELINE,
            },
            LabelAlign::Wrap => LabelPlacement::Wrapped {
                x: DEFAULT_ANCHOR_X,
                baseline: DEFAULT_BASELINE,
                max_width: (self.width as f32 - 2.0 * DEFAULT_ANCHOR_X).max(1.0),
            },
        };
        LabelStyle::default().with_placement(placement)
    }
}

/// Bottom-align the square code: `height - width`.
fn derived_offset(width: u32, height: u32) -> Result<u32> {
    height.checked_sub(width).ok_or_else(|| {
        CardError::config(
            VERTICAL_OFFSET,
            format!("card height {height} is smaller than width {width}; set an explicit offset"),
        )
    })
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CardError::config(key, format!("cannot parse {value:?}")))
}
