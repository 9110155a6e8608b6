//! Configuration management: defaults, validation, loading from the environment.

pub mod card_config;
pub mod defaults;
pub mod validation;

pub use card_config::CardConfig;

use std::str::FromStr;

/// How the label is placed on the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelAlign {
    /// Fixed baseline anchor, no measurement.
    #[default]
    Anchor,
    /// Measured and horizontally centered.
    Center,
    /// Left-aligned and word-wrapped.
    Wrap,
}

impl FromStr for LabelAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anchor" => Ok(Self::Anchor),
            "center" => Ok(Self::Center),
            "wrap" => Ok(Self::Wrap),
            _ => Err("must be anchor, center, or wrap".into()),
        }
    }
}

/// Load `.env` from the first candidate path that exists.
pub fn load_dotenv() {
    let candidates = [".env", "../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::debug!("No .env file found, using system environment variables");
}
