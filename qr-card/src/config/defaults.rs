//! Setting keys and their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

pub const PAYLOAD: &str = "QR_CARD_PAYLOAD";
pub const LABEL: &str = "QR_CARD_LABEL";
pub const WIDTH: &str = "QR_CARD_WIDTH";
pub const HEIGHT: &str = "QR_CARD_HEIGHT";
pub const VERTICAL_OFFSET: &str = "QR_CARD_VERTICAL_OFFSET";
pub const EC_LEVEL: &str = "QR_CARD_EC_LEVEL";
pub const FONT_PATH: &str = "QR_CARD_FONT_PATH";
pub const SYSTEM_FONT: &str = "QR_CARD_SYSTEM_FONT";
pub const LABEL_ALIGN: &str = "QR_CARD_LABEL_ALIGN";
pub const OUTPUT_DIR: &str = "QR_CARD_OUTPUT_DIR";
pub const PERSIST_INTERIM: &str = "QR_CARD_PERSIST_INTERIM";
pub const INTERIM_DIR: &str = "QR_CARD_INTERIM_DIR";
pub const TIMEOUT_SECS: &str = "QR_CARD_TIMEOUT_SECS";

type DefTuple = (&'static str, &'static str, &'static str);

/// `(key, default, description)`. An empty default means "derived" or "unset".
const DEFS: &[DefTuple] = &[
    (PAYLOAD, "https://www.example.ru/my-venue/42", "URI encoded into the QR code"),
    (LABEL, "Стол №10", "Human-readable table label drawn on the card"),
    (WIDTH, "900", "Card width in pixels, also the QR code side"),
    (HEIGHT, "1020", "Card height in pixels"),
    (VERTICAL_OFFSET, "", "QR code top edge in pixels (default: height - width)"),
    (EC_LEVEL, "medium", "QR error correction: low, medium, quartile, high"),
    (FONT_PATH, "", "TTF/OTF label font (default: bundled DejaVu Sans)"),
    (SYSTEM_FONT, "false", "Use the first system font found instead of the bundled one"),
    (LABEL_ALIGN, "anchor", "Label placement: anchor, center, wrap"),
    (OUTPUT_DIR, ".", "Directory the final image is written to"),
    (PERSIST_INTERIM, "false", "Write interim rasters to disk before compositing"),
    (INTERIM_DIR, "", "Parent directory for interim rasters (default: system temp dir)"),
    (TIMEOUT_SECS, "0", "Abort the run after this many seconds (0: no limit)"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}

/// All definitions in declaration order.
pub fn definitions() -> impl Iterator<Item = SettingDef> {
    DEFS.iter().map(|&(key, default, description)| SettingDef {
        key,
        default,
        description,
    })
}

/// Usage text listing every setting with its description and default.
pub fn help_text() -> String {
    let mut out = String::from(
        "Usage: qr-card [PAYLOAD]\n\n\
         Writes qr-code-<venue>-<table>.png for PAYLOAD (default: QR_CARD_PAYLOAD).\n\n\
         Settings (environment or .env):\n",
    );
    for def in definitions() {
        let default = if def.default.is_empty() { "-" } else { def.default };
        out.push_str(&format!(
            "  {:<26} {} [default: {default}]\n",
            def.key, def.description
        ));
    }
    out
}
