//! Extraction configuration.
//!
//! [`ExtractOptions`] is a builder carrying every setting of an extraction
//! run: the sampling interval, where and in which format images are written,
//! output geometry, JPEG quality, and an optional progress callback.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesift::{ExtractOptions, OutputFormat, ProgressCallback, ProgressInfo};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{} decoded, {} written", info.frames_decoded, info.frames_emitted);
//!     }
//! }
//!
//! let options = ExtractOptions::new()
//!     .with_interval_ms(500)
//!     .with_output_folder("thumbs")
//!     .with_output_format(OutputFormat::Jpeg)
//!     .with_resolution(Some(320), None)
//!     .with_maintain_aspect_ratio(true)
//!     .with_progress(Arc::new(LogProgress));
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::conversion::scale_dimension;
use crate::encoder::{DEFAULT_QUALITY, ImageCodec};
use crate::progress::{NoOpProgress, ProgressCallback};

/// Image format of the written files.
///
/// Selected on the command line by index: `0` is bitmap, `1` is JPEG, and
/// every other value falls back to bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// `.bmp`, 24-bit uncompressed.
    #[default]
    Bmp,
    /// `.jpg`, encoded with the MJPEG codec.
    Jpeg,
}

impl OutputFormat {
    /// Map a user-supplied index onto the format table.
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => OutputFormat::Jpeg,
            _ => OutputFormat::Bmp,
        }
    }

    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        self.codec().extension()
    }

    /// Codec used to encode this format.
    pub fn codec(self) -> ImageCodec {
        match self {
            OutputFormat::Bmp => ImageCodec::Bmp,
            OutputFormat::Jpeg => ImageCodec::Mjpeg,
        }
    }
}

/// Output geometry for emitted images.
///
/// The decoded geometry is used unless both dimensions are given. Zero counts
/// as not given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOutputOptions {
    /// Target width.
    pub width: Option<u32>,
    /// Target height.
    pub height: Option<u32>,
    /// When only one dimension is given, derive the other from the source
    /// aspect ratio. Off by default, in which case a single dimension is
    /// ignored.
    pub maintain_aspect_ratio: bool,
}

impl FrameOutputOptions {
    /// Resolve the final `(width, height)` for a source of the given size.
    pub fn resolve_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        let width = self.width.filter(|&w| w > 0);
        let height = self.height.filter(|&h| h > 0);
        match (width, height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) if self.maintain_aspect_ratio => {
                (w, scale_dimension(w, source_width, source_height))
            }
            (None, Some(h)) if self.maintain_aspect_ratio => {
                (scale_dimension(h, source_height, source_width), h)
            }
            _ => (source_width, source_height),
        }
    }
}

/// Settings for one extraction run.
///
/// A default-constructed value writes every decoded frame as a bitmap in the
/// current directory at source resolution.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) interval_ms: u64,
    pub(crate) output_folder: PathBuf,
    pub(crate) output_format: OutputFormat,
    pub(crate) frame_output: FrameOutputOptions,
    pub(crate) quality: u8,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) batch_size: u64,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("interval_ms", &self.interval_ms)
            .field("output_folder", &self.output_folder)
            .field("output_format", &self.output_format)
            .field("frame_output", &self.frame_output)
            .field("quality", &self.quality)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Interval 0, current directory, bitmap, source geometry, quality 100.
    pub fn new() -> Self {
        Self {
            interval_ms: 0,
            output_folder: PathBuf::from("."),
            output_format: OutputFormat::Bmp,
            frame_output: FrameOutputOptions::default(),
            quality: DEFAULT_QUALITY,
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    /// Minimum milliseconds between emitted frames. `0` emits every frame.
    #[must_use]
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Directory images are written into. It must already exist.
    #[must_use]
    pub fn with_output_folder<P: Into<PathBuf>>(mut self, folder: P) -> Self {
        self.output_folder = folder.into();
        self
    }

    /// Image format of the written files.
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Output resolution. Applied only when both dimensions are nonzero,
    /// unless [`with_maintain_aspect_ratio`](ExtractOptions::with_maintain_aspect_ratio)
    /// is on.
    #[must_use]
    pub fn with_resolution(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.frame_output.width = width;
        self.frame_output.height = height;
        self
    }

    /// Whether a single given dimension scales the other proportionally.
    /// Defaults to `false`.
    #[must_use]
    pub fn with_maintain_aspect_ratio(mut self, maintain: bool) -> Self {
        self.frame_output.maintain_aspect_ratio = maintain;
        self
    }

    /// JPEG quality, 0–100 (clamped). Ignored by bitmap output.
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Fire the progress callback every `size` decoded video frames.
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Minimum milliseconds between emitted frames.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Destination directory.
    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    /// Image format of written files.
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Geometry settings.
    pub fn frame_output(&self) -> &FrameOutputOptions {
        &self.frame_output
    }

    /// JPEG quality.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Path of the image with sequence number `index`.
    pub fn output_path(&self, index: u64) -> PathBuf {
        self.output_folder
            .join(format!("{index:06}.{}", self.output_format.extension()))
    }
}
