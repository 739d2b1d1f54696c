//! # framesift
//!
//! Sift still frames out of video files at a fixed time cadence.
//!
//! `framesift` decodes a video with FFmpeg (via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate), decides frame
//! by frame whether enough presentation time has passed since the last kept
//! frame, and writes every kept frame to disk as a numbered bitmap or JPEG:
//! `000000.bmp`, `000001.bmp`, and so on.
//!
//! ## Quick Start
//!
//! ### One image per second
//!
//! ```no_run
//! use framesift::{ExtractOptions, FrameExtractor, OutputFormat};
//!
//! let options = ExtractOptions::new()
//!     .with_interval_ms(1000)
//!     .with_output_folder("frames")
//!     .with_output_format(OutputFormat::Jpeg);
//!
//! let summary = FrameExtractor::new(options).run("input.mp4").unwrap();
//! println!("{} of {} frames kept", summary.frames_emitted, summary.frames_decoded);
//! ```
//!
//! ### Thumbnails at a fixed width
//!
//! ```no_run
//! use framesift::{ExtractOptions, FrameExtractor};
//!
//! let options = ExtractOptions::new()
//!     .with_interval_ms(5000)
//!     .with_resolution(Some(320), None)
//!     .with_maintain_aspect_ratio(true);
//! FrameExtractor::new(options).run("input.mkv").unwrap();
//! ```
//!
//! ### Encoding a single buffer
//!
//! ```no_run
//! use framesift::{EncoderSettings, ImageCodec, Pixel, PlaneBuffer, StillImageEncoder};
//!
//! let buffer = PlaneBuffer::new(Pixel::YUV420P, 64, 48).unwrap();
//! let settings = EncoderSettings::new(ImageCodec::Bmp, 64, 48).source_buffer(&buffer);
//! let mut encoder = StillImageEncoder::open(settings).unwrap();
//! let bytes = encoder.encode(&buffer).unwrap();
//! assert!(bytes.starts_with(b"BM"));
//! ```
//!
//! ## Features
//!
//! - **Time-based sampling** with a fallback chain for streams that lack a
//!   frame rate or timestamps
//! - **Bitmap and JPEG output**, plus PNG and H.264 through the encoder API
//! - **Output scaling** with optional aspect ratio preservation
//! - **Progress callbacks** every N decoded frames
//! - **Run summaries** counting decoded, kept, skipped, and failed frames
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
mod conversion;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod metadata;
pub mod plane_buffer;
pub mod progress;
pub mod sampling;
pub mod source;

pub use configuration::{ExtractOptions, FrameOutputOptions, OutputFormat};
pub use encoder::{EncoderSettings, ImageCodec, StillImageEncoder, WriteOutcome};
pub use error::FramesiftError;
pub use extractor::{ExtractionSummary, FrameExtractor};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use ffmpeg_next::{Rational, format::Pixel};
pub use metadata::{AudioMetadata, MediaMetadata, VideoMetadata};
pub use plane_buffer::PlaneBuffer;
pub use progress::{ProgressCallback, ProgressInfo};
pub use sampling::{PacketTimestamps, SamplingClock, SamplingDecision, TimestampRule};
pub use source::{MediaSource, VideoTiming};
