//! Error type for a card generation run.

use std::path::PathBuf;
use std::time::Duration;

use card_render::RenderError;

use crate::config::defaults;

/// Everything that can abort a run. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("Malformed payload {payload:?}: expected at least two '/'-separated segments")]
    MalformedPayload { payload: String },

    #[error("QR encode error: {0}")]
    Encoding(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode PNG: {source}")]
    Png {
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid setting {key}: {reason}")]
    Config { key: String, reason: String },

    #[error("Font error: {0}")]
    Font(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Run timed out after {0:?}")]
    Timeout(Duration),

    #[error("Worker task failed: {0}")]
    Task(String),
}

impl CardError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(key: &str, reason: impl Into<String>) -> Self {
        Self::Config {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<RenderError> for CardError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Encoding(msg) => Self::Encoding(msg),
            RenderError::InvalidDimensions(msg) => Self::config(defaults::WIDTH, msg),
            RenderError::Decode { what, source } => Self::Decode {
                what: what.to_string(),
                source,
            },
            RenderError::Io { path, source } => Self::io(path, source),
            RenderError::Font(msg) => Self::Font(msg),
        }
    }
}

impl From<tokio::task::JoinError> for CardError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Result type alias for card operations.
pub type Result<T> = std::result::Result<T, CardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_errors_keep_their_kind() {
        let err: CardError = RenderError::Encoding("data too long".into()).into();
        assert!(matches!(err, CardError::Encoding(_)));

        let err: CardError = RenderError::InvalidDimensions("too small".into()).into();
        assert!(matches!(err, CardError::Config { ref key, .. } if key == "QR_CARD_WIDTH"));
    }

    #[test]
    fn io_error_mentions_path() {
        let err = CardError::io(
            "/tmp/out.png",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/out.png"));
    }
}
