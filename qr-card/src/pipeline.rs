//! Card generation pipeline.
//!
//! Naming runs first so a malformed payload fails before any raster work.
//! The QR code and the labeled background are then produced concurrently on
//! blocking worker threads, composited once both are done, and the result is
//! written under its final name.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use card_render::{
    CodeGenerator, QrGenerator, TextRenderer, build_background, compose, compose_files,
};
use image::RgbaImage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::artifacts::{InterimStore, encode_png};
use crate::config::CardConfig;
use crate::error::{CardError, Result};
use crate::ids::{ArtifactKind, IdSource, UuidSource};
use crate::{fonts, naming};

/// Turns a [`CardConfig`] into a printable card.
#[derive(Clone)]
pub struct Pipeline {
    generator: Arc<dyn CodeGenerator>,
    renderer: Arc<dyn TextRenderer>,
    ids: Arc<dyn IdSource>,
}

impl Pipeline {
    /// Pipeline with the QR generator and UUID tokens.
    pub fn new(renderer: Arc<dyn TextRenderer>) -> Self {
        Self {
            generator: Arc::new(QrGenerator),
            renderer,
            ids: Arc::new(UuidSource),
        }
    }

    /// Pipeline with the label font `config` selects.
    ///
    /// The payload is checked first, so a malformed payload is reported even
    /// when the font cannot be loaded.
    pub fn from_config(config: &CardConfig) -> Result<Self> {
        naming::split_payload(&config.payload)?;
        let renderer = fonts::load_renderer(config.font_source())?;
        Ok(Self::new(Arc::new(renderer)))
    }

    /// Builder: replace the code generator.
    pub fn with_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Builder: replace the identifier source.
    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Build the card in memory without touching the filesystem.
    pub async fn render(
        &self,
        config: &CardConfig,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage> {
        config.validate()?;
        naming::split_payload(&config.payload)?;
        let offset = config.overlay_offset()?;
        let (code, background) = self.layers(config, cancel).await?;
        Ok(compose(&background, &code, offset))
    }

    /// Build the card and write it to `config.output_dir`. Returns the output path.
    ///
    /// Honors `config.timeout` and `cancel`; an aborted run writes no output
    /// and leaves no interim files behind.
    pub async fn run(&self, config: &CardConfig, cancel: CancellationToken) -> Result<PathBuf> {
        let started = Instant::now();
        let result = match config.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_inner(config, &cancel))
                .await
                .map_err(|_| CardError::Timeout(limit))
                .and_then(|r| r),
            None => self.run_inner(config, &cancel).await,
        };

        match &result {
            Ok(path) => info!(
                path = %path.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Table card written"
            ),
            Err(e) => warn!("Table card generation failed: {e}"),
        }
        result
    }

    async fn run_inner(&self, config: &CardConfig, cancel: &CancellationToken) -> Result<PathBuf> {
        config.validate()?;
        let segments = naming::split_payload(&config.payload)?;
        let file_name = naming::result_file_name(&config.payload)?;
        info!(
            venue = segments.venue,
            table = segments.table,
            file_name = %file_name,
            width = config.width,
            height = config.height,
            "Generating table card"
        );

        let offset = config.overlay_offset()?;
        let (code, background) = self.layers(config, cancel).await?;

        let composite = if config.persist_interim {
            ensure_active(cancel)?;
            let ids = Arc::clone(&self.ids);
            let parent = config.interim_dir.clone();
            // The store lives and drops on the worker, so its files are
            // removed even when this future is abandoned mid-compose.
            tokio::task::spawn_blocking(move || -> Result<RgbaImage> {
                let store = InterimStore::create(&parent, ids.as_ref())?;
                let code_path = store.persist(ArtifactKind::QrCode, &code, ids.as_ref())?;
                let background_path =
                    store.persist(ArtifactKind::Background, &background, ids.as_ref())?;
                Ok(compose_files(&background_path, &code_path, offset)?)
            })
            .await??
        } else {
            tokio::task::spawn_blocking(move || compose(&background, &code, offset)).await?
        };
        debug!(offset, "Composited layers");

        ensure_active(cancel)?;
        let bytes = tokio::task::spawn_blocking(move || encode_png(&composite)).await??;
        write_output(&config.output_dir, &file_name, &bytes, self.ids.as_ref()).await
    }

    /// Produce `(code, background)` concurrently.
    async fn layers(
        &self,
        config: &CardConfig,
        cancel: &CancellationToken,
    ) -> Result<(RgbaImage, RgbaImage)> {
        ensure_active(cancel)?;

        let generator = Arc::clone(&self.generator);
        let payload = config.payload.clone();
        let (level, width, height) = (config.ec_level, config.width, config.height);
        let code_task =
            tokio::task::spawn_blocking(move || generator.generate(&payload, level, width));

        let renderer = Arc::clone(&self.renderer);
        let label = config.label.clone();
        let style = config.label_style();
        let background_task = tokio::task::spawn_blocking(move || {
            build_background(width, height, &label, &style, renderer.as_ref())
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CardError::Cancelled),
            joined = async { tokio::try_join!(code_task, background_task) } => {
                let (code, background) = joined?;
                Ok((code?, background))
            }
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(CardError::Cancelled);
    }
    Ok(())
}

/// Write through a temporary sibling and rename, so a failed run never
/// leaves a partial image under the final name.
async fn write_output(
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
    ids: &dyn IdSource,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| CardError::io(dir, e))?;

    let path = dir.join(file_name);
    let mut tmp = TempFile::new(dir.join(format!(".{file_name}.{}.tmp", ids.next_token())));

    tokio::fs::write(&tmp.path, bytes)
        .await
        .map_err(|e| CardError::io(&tmp.path, e))?;
    tokio::fs::rename(&tmp.path, &path)
        .await
        .map_err(|e| CardError::io(&path, e))?;
    tmp.armed = false;
    Ok(path)
}

/// Removes the output's temporary sibling unless it was renamed into place.
///
/// Covers dropped futures too: a deadline or cancellation that fires between
/// the write and the rename still leaves no `.tmp` file behind.
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let path = &self.path;
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "Removed unfinished output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), "Failed to remove unfinished output: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use card_render::{BLACK, EcLevel, WHITE};
    use image::Rgba;

    use super::*;
    use crate::ids::tests::SequenceSource;

    /// Marks one black pixel per character on the baseline, 10px apart.
    struct StampRenderer;

    impl TextRenderer for StampRenderer {
        fn draw(
            &self,
            canvas: &mut RgbaImage,
            text: &str,
            x: f32,
            baseline: f32,
            _size: f32,
            color: Rgba<u8>,
        ) {
            for i in 0..text.chars().count() as u32 {
                let px = x as u32 + 10 * i;
                if px < canvas.width() && (baseline as u32) < canvas.height() {
                    canvas.put_pixel(px, baseline as u32, color);
                }
            }
        }

        fn measure(&self, text: &str, _size: f32) -> f32 {
            10.0 * text.chars().count() as f32
        }

        fn line_height(&self, size: f32) -> f32 {
            size
        }
    }

    /// Sleeps before delegating, to exercise deadlines.
    struct SlowGenerator(Duration);

    impl CodeGenerator for SlowGenerator {
        fn generate(
            &self,
            payload: &str,
            level: EcLevel,
            width: u32,
        ) -> card_render::Result<RgbaImage> {
            std::thread::sleep(self.0);
            QrGenerator.generate(payload, level, width)
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Arc::new(StampRenderer)).with_ids(Arc::new(SequenceSource::default()))
    }

    fn scratch_config() -> (PathBuf, CardConfig) {
        let root = std::env::temp_dir()
            .join(format!("qr-card-pipeline-{}", UuidSource.next_token()));
        let interim = root.join("interim");
        std::fs::create_dir_all(&interim).unwrap();
        let config = CardConfig {
            output_dir: root.join("out"),
            interim_dir: interim,
            ..CardConfig::default()
        };
        (root, config)
    }

    fn interim_entries(config: &CardConfig) -> usize {
        std::fs::read_dir(&config.interim_dir).unwrap().count()
    }

    #[tokio::test]
    async fn run_writes_card_under_derived_name() {
        let (root, config) = scratch_config();
        let path = pipeline().run(&config, CancellationToken::new()).await.unwrap();

        assert_eq!(path, config.output_dir.join("qr-code-my-venue-42.png"));
        let card = image::open(&path).unwrap().to_rgba8();
        assert_eq!(card.dimensions(), (900, 1020));

        // Label stamp above the code, white elsewhere in the header.
        assert_eq!(card.get_pixel(62, 117), &BLACK);
        assert_eq!(card.get_pixel(5, 5), &WHITE);

        // Opaque code replaces the background exactly.
        let code = QrGenerator
            .generate(&config.payload, EcLevel::Medium, 900)
            .unwrap();
        for y in 0..900 {
            for x in 0..900 {
                assert_eq!(card.get_pixel(x, y + 120), code.get_pixel(x, y));
            }
        }
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn identical_runs_are_byte_identical() {
        let (root, config) = scratch_config();
        let mut second = config.clone();
        second.output_dir = root.join("out-2");

        let a = pipeline().run(&config, CancellationToken::new()).await.unwrap();
        let b = Pipeline::new(Arc::new(StampRenderer))
            .run(&second, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn persisted_interim_files_are_removed_after_success() {
        let (root, mut config) = scratch_config();
        let in_memory = pipeline().render(&config, &CancellationToken::new()).await.unwrap();

        config.persist_interim = true;
        let path = pipeline().run(&config, CancellationToken::new()).await.unwrap();

        assert_eq!(interim_entries(&config), 0);
        assert_eq!(image::open(&path).unwrap().to_rgba8(), in_memory);
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn persisted_interim_files_are_removed_after_failure() {
        let (root, mut config) = scratch_config();
        let blocker = root.join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();
        config.output_dir = blocker.join("out");
        config.persist_interim = true;

        let err = pipeline().run(&config, CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CardError::Io { .. }));
        assert_eq!(interim_entries(&config), 0);
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn malformed_payload_fails_before_raster_work() {
        let (root, mut config) = scratch_config();
        config.payload = "no-slashes".into();

        let err = pipeline().run(&config, CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CardError::MalformedPayload { .. }));
        assert!(!config.output_dir.exists());
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn oversized_payload_surfaces_encoding_error() {
        let (root, mut config) = scratch_config();
        config.payload = format!("https://example.ru/{}/1", "v".repeat(3000));

        let err = pipeline().run(&config, CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CardError::Encoding(_)));
        assert!(!config.output_dir.exists());
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn misfitting_offset_is_rejected() {
        let (root, mut config) = scratch_config();
        config.vertical_offset = 500;

        let err = pipeline().run(&config, CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CardError::Config { .. }));
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn cancelled_run_writes_nothing() {
        let (root, config) = scratch_config();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline().run(&config, cancel).await.unwrap_err();

        assert!(matches!(err, CardError::Cancelled));
        assert!(!config.output_dir.exists());
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn deadline_aborts_slow_generation() {
        let (root, mut config) = scratch_config();
        config.timeout = Some(Duration::from_millis(20));
        let slow = pipeline().with_generator(Arc::new(SlowGenerator(Duration::from_millis(300))));

        let err = slow.run(&config, CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CardError::Timeout(_)));
        assert!(!config.output_dir.exists());
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn render_keeps_card_geometry() {
        let (root, mut config) = scratch_config();
        config.width = 300;
        config.height = 420;
        config.vertical_offset = 100;

        let card = pipeline().render(&config, &CancellationToken::new()).await.unwrap();

        assert_eq!(card.dimensions(), (300, 420));
        // Rows below the code stay white.
        assert_eq!(card.get_pixel(150, 419), &WHITE);
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn payload_is_checked_before_font() {
        let config = CardConfig {
            payload: "no-slashes".into(),
            font_path: Some(PathBuf::from("/nonexistent/fonts/label.ttf")),
            ..CardConfig::default()
        };
        let err = Pipeline::from_config(&config).err().unwrap();
        assert!(matches!(err, CardError::MalformedPayload { .. }));

        let config = CardConfig {
            payload: "https://example.ru/venue/1".into(),
            ..config
        };
        let err = Pipeline::from_config(&config).err().unwrap();
        assert!(matches!(err, CardError::Io { .. }));
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temporary_file() {
        let (root, config) = scratch_config();
        // A directory already sits under the final name.
        let occupied = config.output_dir.join("qr-code-my-venue-42.png");
        std::fs::create_dir_all(occupied.join("inner")).unwrap();

        let err = pipeline().run(&config, CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CardError::Io { ref path, .. } if *path == occupied));
        let names: Vec<_> = std::fs::read_dir(&config.output_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![occupied.file_name().unwrap().to_owned()]);
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn abandoned_output_write_is_cleaned_up() {
        let (root, _) = scratch_config();
        let written = root.join(".card.png.0.tmp");
        std::fs::write(&written, b"partial").unwrap();
        drop(TempFile::new(written.clone()));
        assert!(!written.exists());

        let renamed = root.join("card.png");
        std::fs::write(&renamed, b"complete").unwrap();
        let mut guard = TempFile::new(renamed.clone());
        guard.armed = false;
        drop(guard);
        assert!(renamed.exists());
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn bundled_font_card_is_fully_opaque() {
        let (root, config) = scratch_config();
        let card = Pipeline::from_config(&config)
            .unwrap()
            .render(&config, &CancellationToken::new())
            .await
            .unwrap();

        // The label is inked above the code and anti-aliased edges stay opaque.
        assert!((0..120).any(|y| (0..900).any(|x| card.get_pixel(x, y)[0] < 128)));
        assert!(card.pixels().all(|p| p[3] == 255));
        std::fs::remove_dir_all(root).unwrap();
    }
}
