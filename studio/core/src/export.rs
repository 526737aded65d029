//! Export Adapter
//!
//! Turns a rendered card into a PNG file:
//!
//! ```text
//! surface ──settle──► RasterCapture ──data: URI──► DownloadSink ──► file
//! ```
//!
//! The adapter is independent of the orchestrator. It only needs something
//! that can be rendered ([`RenderSurface`]), something that can rasterize it
//! ([`RasterCapture`]) and somewhere to put the file ([`DownloadSink`]).
//! Every export captures afresh; nothing is cached between exports.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::busy::BusyCounter;
use crate::card::CardConfig;
use crate::data_uri::{self, DataUriError};
use crate::messages::{Notifier, NotifyLevel, RequestId};
use crate::store::CardStore;

/// Notice shown when a capture fails
pub const EXPORT_FAILED_NOTICE: &str =
    "Could not save image automatically. Please try taking a screenshot!";

/// Default pixel density multiplier
pub const DEFAULT_PIXEL_RATIO: u32 = 3;

/// Default wait before capturing
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Logical card width
pub const CARD_WIDTH: u32 = 400;

/// Logical card height
pub const CARD_HEIGHT: u32 = 560;

// ============================================================================
// Errors
// ============================================================================

/// Errors from rasterizing a surface
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Pixel ratio must be at least 1
    #[error("Invalid pixel ratio: {0}")]
    InvalidPixelRatio(u32),

    /// The scaled surface would be unreasonably large
    #[error("Capture of {width}x{height} pixels exceeds the size limit")]
    TooLarge {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },

    /// Rendering failed
    #[error("Render failed: {0}")]
    Render(String),

    /// PNG encoding failed
    #[error("Encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Errors from delivering a file
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The captured image could not be decoded
    #[error("Invalid image data: {0}")]
    Decode(#[from] DataUriError),

    /// Writing the file failed
    #[error("Failed to write {path}: {source}")]
    Io {
        /// Target path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },
}

// ============================================================================
// Options
// ============================================================================

/// An opaque RGB color
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgbColor {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl RgbColor {
    /// Opaque white
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff);

    /// Create a color
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for RgbColor {
    type Err = String;

    /// Parse `#rrggbb` or `#rgb`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(format!("invalid color '{s}'"));
        }
        let expanded: String = match hex.len() {
            6 => hex.to_string(),
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            _ => return Err(format!("invalid color '{s}' (expected #rrggbb)")),
        };
        let channel = |at: usize| {
            u8::from_str_radix(&expanded[at..at + 2], 16)
                .map_err(|e| format!("invalid color '{s}': {e}"))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Parameters handed to a [`RasterCapture`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Device pixels per logical pixel
    pub pixel_ratio: u32,
    /// Color behind everything (the output is opaque)
    pub background: RgbColor,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            background: RgbColor::WHITE,
        }
    }
}

/// Export configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportConfig {
    /// Device pixels per logical pixel
    pub pixel_ratio: u32,
    /// Background color
    pub background: RgbColor,
    /// Wait before capturing, so transient visual states settle
    pub settle_delay: Duration,
    /// Where downloads go (`None` = the user's download directory)
    pub download_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            background: RgbColor::WHITE,
            settle_delay: DEFAULT_SETTLE_DELAY,
            download_dir: None,
        }
    }
}

impl ExportConfig {
    /// Capture options derived from this config
    #[must_use]
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            pixel_ratio: self.pixel_ratio,
            background: self.background,
        }
    }

    /// Download directory, falling back to the user's download directory
    /// and then the current directory
    #[must_use]
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

// ============================================================================
// Seams
// ============================================================================

/// Something that can be rasterized
pub trait RenderSurface: Send + Sync {
    /// The card as it should appear right now
    fn card(&self) -> Arc<CardConfig>;

    /// Logical size in pixels
    fn size(&self) -> (u32, u32) {
        (CARD_WIDTH, CARD_HEIGHT)
    }
}

/// The session's card, as rendered from its store
///
/// Each call to [`RenderSurface::card`] reads the store's current snapshot.
#[derive(Clone, Debug)]
pub struct CardSurface {
    store: Arc<CardStore>,
}

impl CardSurface {
    /// A surface showing `store`'s card
    #[must_use]
    pub fn new(store: Arc<CardStore>) -> Self {
        Self { store }
    }
}

impl RenderSurface for CardSurface {
    fn card(&self) -> Arc<CardConfig> {
        self.store.snapshot()
    }
}

/// Raster capture service
#[async_trait]
pub trait RasterCapture: Send + Sync {
    /// Rasterize `surface` and return the image as a `data:` URI
    async fn capture(
        &self,
        surface: &dyn RenderSurface,
        options: &CaptureOptions,
    ) -> Result<String, CaptureError>;
}

/// Where exported files go
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Save the image in `data_uri` under `file_name`, returning where it went
    async fn deliver(&self, file_name: &str, data_uri: &str) -> Result<PathBuf, DownloadError>;
}

/// Saves downloads into a directory
#[derive(Clone, Debug)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    /// Save into `dir` (created on first download)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn deliver(&self, file_name: &str, data_uri: &str) -> Result<PathBuf, DownloadError> {
        let decoded = data_uri::parse(data_uri)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| DownloadError::Io {
                path: self.dir.clone(),
                source,
            })?;

        // Write beside the target, then rename into place.
        let target = self.dir.join(file_name);
        let partial = self.dir.join(format!(".{file_name}.part"));
        if let Err(source) = tokio::fs::write(&partial, &decoded.bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(DownloadError::Io {
                path: partial,
                source,
            });
        }
        if let Err(source) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(DownloadError::Io {
                path: target,
                source,
            });
        }

        Ok(target)
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// File name for a card addressed to `recipient`
///
/// Whitespace runs (and path separators) become `_`; a blank recipient
/// becomes `gift`.
#[must_use]
pub fn export_file_name(recipient: &str) -> String {
    let name = recipient
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let name = if name.is_empty() { "gift" } else { &name };
    format!("christmas-card-{name}.png")
}

/// How an export settled
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No surface was given; nothing happened
    NoSurface,
    /// The file was saved
    Saved {
        /// File name handed to the sink
        file_name: String,
        /// Where the sink put it
        path: PathBuf,
    },
    /// Rasterizing failed; no file was written
    CaptureFailed(String),
    /// Saving failed; no file was written
    DownloadFailed(String),
}

/// Captures surfaces and saves them as PNG files
pub struct ExportAdapter<R: RasterCapture, D: DownloadSink> {
    capture: R,
    sink: D,
    config: ExportConfig,
    notifier: Notifier,
    busy: BusyCounter,
}

impl<R: RasterCapture, D: DownloadSink> ExportAdapter<R, D> {
    /// Create an adapter
    pub fn new(capture: R, sink: D, config: ExportConfig) -> Self {
        Self {
            capture,
            sink,
            config,
            notifier: Notifier::disabled(),
            busy: BusyCounter::new(),
        }
    }

    /// Send user-facing notices to `notifier`
    #[must_use]
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Whether an export is in progress
    pub fn is_exporting(&self) -> bool {
        self.busy.is_busy()
    }

    /// Configuration
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Capture `surface` and save it
    ///
    /// `None` is a no-op. Failures are reported as notices and in the
    /// returned outcome; they never propagate.
    pub async fn export(&self, surface: Option<&dyn RenderSurface>) -> ExportOutcome {
        let Some(surface) = surface else {
            tracing::debug!("Export requested without a surface");
            return ExportOutcome::NoSurface;
        };

        let _busy = self.busy.enter(|busy| tracing::debug!(busy, "Export busy state"));
        let request_id = RequestId::new();

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let file_name = export_file_name(&surface.card().recipient);
        tracing::info!(
            request_id = %request_id,
            file_name = %file_name,
            pixel_ratio = self.config.pixel_ratio,
            "Capturing card"
        );

        let data_uri = match self
            .capture
            .capture(surface, &self.config.capture_options())
            .await
        {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Card capture failed");
                self.notifier.notify(NotifyLevel::Error, EXPORT_FAILED_NOTICE);
                return ExportOutcome::CaptureFailed(e.to_string());
            }
        };

        match self.sink.deliver(&file_name, &data_uri).await {
            Ok(path) => {
                tracing::info!(request_id = %request_id, path = %path.display(), "Card saved");
                ExportOutcome::Saved { file_name, path }
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Card download failed");
                self.notifier.notify(NotifyLevel::Error, EXPORT_FAILED_NOTICE);
                ExportOutcome::DownloadFailed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardUpdate;
    use parking_lot::Mutex;

    struct CountingCapture {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl RasterCapture for CountingCapture {
        async fn capture(
            &self,
            surface: &dyn RenderSurface,
            options: &CaptureOptions,
        ) -> Result<String, CaptureError> {
            assert_eq!(options.pixel_ratio, 3);
            assert_eq!(options.background, RgbColor::WHITE);
            if self.fail {
                return Err(CaptureError::Render("surface detached".to_string()));
            }
            let recipient = surface.card().recipient.clone();
            self.calls.lock().push(recipient);
            Ok(data_uri::from_bytes("image/png", b"png"))
        }
    }

    fn config() -> ExportConfig {
        ExportConfig {
            settle_delay: Duration::ZERO,
            ..ExportConfig::default()
        }
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("Jo Ann"), "christmas-card-Jo_Ann.png");
        assert_eq!(export_file_name(""), "christmas-card-gift.png");
        assert_eq!(export_file_name("   "), "christmas-card-gift.png");
        assert_eq!(export_file_name("Mary  Jo\tLee"), "christmas-card-Mary_Jo_Lee.png");
        assert_eq!(export_file_name("../etc"), "christmas-card-.._etc.png");
    }

    #[test]
    fn test_rgb_color_parsing() {
        assert_eq!("#ffffff".parse::<RgbColor>().unwrap(), RgbColor::WHITE);
        assert_eq!("#fff".parse::<RgbColor>().unwrap(), RgbColor::WHITE);
        assert_eq!(
            "1a2b3c".parse::<RgbColor>().unwrap(),
            RgbColor::new(0x1a, 0x2b, 0x3c)
        );
        assert!("#12345".parse::<RgbColor>().is_err());
        assert!("#zzzzzz".parse::<RgbColor>().is_err());
        assert_eq!(RgbColor::new(0x1a, 0x2b, 0x3c).to_string(), "#1a2b3c");
    }

    #[test]
    fn test_export_config_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.pixel_ratio, 3);
        assert_eq!(config.settle_delay, Duration::from_millis(200));
        assert_eq!(config.background, RgbColor::WHITE);
    }

    #[tokio::test]
    async fn test_export_without_surface_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = ExportAdapter::new(
            CountingCapture {
                calls: Mutex::new(Vec::new()),
                fail: false,
            },
            DirectoryDownloads::new(dir.path()),
            config(),
        );

        assert_eq!(adapter.export(None).await, ExportOutcome::NoSurface);
        assert!(adapter.capture.calls.lock().is_empty());
        assert!(!adapter.is_exporting());
    }

    #[tokio::test]
    async fn test_export_saves_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CardStore::new());
        store.update(CardUpdate::new().recipient("Jo Ann"));
        let surface = CardSurface::new(Arc::clone(&store));

        let adapter = ExportAdapter::new(
            CountingCapture {
                calls: Mutex::new(Vec::new()),
                fail: false,
            },
            DirectoryDownloads::new(dir.path()),
            config(),
        );

        let outcome = adapter.export(Some(&surface)).await;
        let expected = dir.path().join("christmas-card-Jo_Ann.png");
        assert_eq!(
            outcome,
            ExportOutcome::Saved {
                file_name: "christmas-card-Jo_Ann.png".to_string(),
                path: expected.clone(),
            }
        );
        assert_eq!(std::fs::read(&expected).unwrap(), b"png");
        assert!(!adapter.is_exporting());
    }

    #[tokio::test]
    async fn test_capture_failure_notifies_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let surface = CardSurface::new(Arc::new(CardStore::new()));

        let adapter = ExportAdapter::new(
            CountingCapture {
                calls: Mutex::new(Vec::new()),
                fail: true,
            },
            DirectoryDownloads::new(dir.path()),
            config(),
        )
        .with_notifier(Notifier::new(tx));

        let outcome = adapter.export(Some(&surface)).await;
        assert!(matches!(outcome, ExportOutcome::CaptureFailed(_)));
        assert!(!adapter.is_exporting());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.level, NotifyLevel::Error);
        assert_eq!(notice.message, EXPORT_FAILED_NOTICE);
    }

    #[tokio::test]
    async fn test_each_export_recaptures() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CardStore::new());
        let surface = CardSurface::new(Arc::clone(&store));
        let adapter = ExportAdapter::new(
            CountingCapture {
                calls: Mutex::new(Vec::new()),
                fail: false,
            },
            DirectoryDownloads::new(dir.path()),
            config(),
        );

        adapter.export(Some(&surface)).await;
        store.update(CardUpdate::new().recipient("Sam"));
        adapter.export(Some(&surface)).await;

        assert_eq!(
            *adapter.capture.calls.lock(),
            vec![String::new(), "Sam".to_string()]
        );
        assert!(dir.path().join("christmas-card-gift.png").exists());
        assert!(dir.path().join("christmas-card-Sam.png").exists());
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("christmas-card-Jo.png");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep.txt"), b"occupied").unwrap();

        let sink = DirectoryDownloads::new(dir.path());
        assert_eq!(sink.dir(), dir.path());
        let uri = data_uri::from_bytes("image/png", b"png");
        let result = sink.deliver("christmas-card-Jo.png", &uri).await;

        assert!(matches!(result, Err(DownloadError::Io { ref path, .. }) if *path == blocker));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["christmas-card-Jo.png".to_string()]);
        assert!(blocker.join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_download_rejects_bad_data() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectoryDownloads::new(dir.path().join("nested"));
        let result = sink.deliver("card.png", "not a data uri").await;
        assert!(matches!(result, Err(DownloadError::Decode(_))));
        assert!(!dir.path().join("nested").exists());
    }
}
