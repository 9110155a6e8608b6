//! PNG persistence and scoped storage for interim rasters.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

use crate::error::{CardError, Result};
use crate::ids::{ArtifactKind, IdSource, interim_file_name};

/// Encode an RGBA image as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)
        .map_err(|source| CardError::Png { source })?;
    Ok(cursor.into_inner())
}

/// Directory of interim rasters that is removed when dropped.
///
/// Each store owns a fresh `qr-card-<token>` directory under its parent, so
/// overlapping runs never touch each other's files. Removal happens on every
/// exit path, including early returns and cancelled futures.
#[derive(Debug)]
pub struct InterimStore {
    dir: PathBuf,
}

impl InterimStore {
    pub fn create(parent: &Path, ids: &dyn IdSource) -> Result<Self> {
        let dir = parent.join(format!("qr-card-{}", ids.next_token()));
        std::fs::create_dir_all(&dir).map_err(|e| CardError::io(&dir, e))?;
        tracing::debug!(dir = %dir.display(), "Created interim artifact directory");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `img` as `<kind>-<token>.png` and return its path.
    pub fn persist(
        &self,
        kind: ArtifactKind,
        img: &RgbaImage,
        ids: &dyn IdSource,
    ) -> Result<PathBuf> {
        let path = self.dir.join(interim_file_name(kind, ids));
        let bytes = encode_png(img)?;
        std::fs::write(&path, bytes).map_err(|e| CardError::io(&path, e))?;
        tracing::debug!(path = %path.display(), kind = kind.as_str(), "Persisted interim artifact");
        Ok(path)
    }
}

impl Drop for InterimStore {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => tracing::debug!(dir = %self.dir.display(), "Removed interim artifacts"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), "Failed to remove interim artifacts: {e}")
            }
        }
    }
}
