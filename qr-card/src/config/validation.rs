//! Setting value validation.

use card_render::EcLevel;

use super::LabelAlign;
use super::defaults::*;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        PAYLOAD => {
            if value.trim().is_empty() {
                return Err("must not be empty".into());
            }
        }
        WIDTH | HEIGHT => validate_int_range(value, 1, 10_000)?,
        VERTICAL_OFFSET => validate_int_range(value, 0, 10_000)?,
        TIMEOUT_SECS => validate_int_range(value, 0, 3600)?,
        EC_LEVEL => {
            value.parse::<EcLevel>()?;
        }
        LABEL_ALIGN => {
            value.parse::<LabelAlign>()?;
        }
        PERSIST_INTERIM | SYSTEM_FONT => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        FONT_PATH => {
            let ext = value.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
            let known = ext.is_some_and(|ext| FONT_EXTENSIONS.contains(&ext.as_str()));
            if !value.is_empty() && !known {
                return Err("must be a .ttf, .otf, or .ttc file".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}
