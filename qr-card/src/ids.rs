//! Unique tokens for interim artifact names.

use uuid::Uuid;

/// Source of statistically unique tokens.
pub trait IdSource: Send + Sync {
    fn next_token(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn next_token(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Kind of interim raster, used as the file name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    QrCode,
    Background,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QrCode => "qr-code",
            Self::Background => "background",
        }
    }
}

/// `<kind>-<token>.png`
pub fn interim_file_name(kind: ArtifactKind, ids: &dyn IdSource) -> String {
    format!("{}-{}.png", kind.as_str(), ids.next_token())
}
