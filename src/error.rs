//! Error types for the `framesift` crate.
//!
//! [`FramesiftError`] is the single error type returned by every fallible
//! operation. Variants carry the path, stream, or upstream FFmpeg message
//! needed to diagnose a failure without extra logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

use crate::encoder::ImageCodec;

/// The unified error type for all `framesift` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramesiftError {
    /// The input could not be opened or its stream information could not be
    /// read.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path passed to [`MediaSource::open`](crate::MediaSource::open).
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The input contains neither an audio nor a video stream.
    #[error("Could not find audio or video stream in {path}")]
    NoMediaStreams {
        /// Path of the rejected input.
        path: PathBuf,
    },

    /// A video packet could not be decoded. Aborts the run.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An audio packet could not be decoded. Aborts the run.
    #[error("Failed to decode audio frame: {0}")]
    AudioDecodeError(String),

    /// No encoder implementation is available for the requested codec.
    #[error("No encoder available for {0:?}")]
    EncoderNotFound(ImageCodec),

    /// The encoder's codec context, destination frame, or conversion context
    /// could not be set up.
    #[error("Failed to open {codec:?} encoder: {reason}")]
    EncoderOpen {
        /// Codec that was being configured.
        codec: ImageCodec,
        /// Underlying reason.
        reason: String,
    },

    /// Color conversion of a source frame failed.
    #[error("Failed to convert frame: {0}")]
    ConversionError(String),

    /// The codec rejected the frame or produced no output bytes.
    #[error("Failed to encode still image: {0}")]
    StillEncodeError(String),

    /// A plane buffer could not hold the requested frame.
    #[error("Invalid plane buffer: {0}")]
    PlaneBufferError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl FramesiftError {
    /// Process exit code the command-line tool reports for this error.
    ///
    /// Setup failures (unopenable input, unreadable stream info, no media
    /// streams) map to `1`; everything that fails mid-run maps to `2`.
    pub fn exit_code(&self) -> i32 {
        match self {
            FramesiftError::FileOpen { .. } | FramesiftError::NoMediaStreams { .. } => 1,
            _ => 2,
        }
    }
}

impl From<FfmpegError> for FramesiftError {
    fn from(error: FfmpegError) -> Self {
        FramesiftError::FfmpegError(error.to_string())
    }
}
