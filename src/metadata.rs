//! Media metadata types.
//!
//! Collected once when a [`MediaSource`](crate::MediaSource) is opened and
//! cached for its lifetime.

use std::time::Duration;

/// Container-level facts plus the selected video and audio streams.
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaMetadata {
    /// Best video stream, if any.
    pub video: Option<VideoMetadata>,
    /// Best audio stream, if any.
    pub audio: Option<AudioMetadata>,
    /// Total duration; zero when the container does not report one.
    pub duration: Duration,
    /// Container format name (e.g. `"avi"`, `"matroska,webm"`).
    pub format: String,
}

/// Metadata for the selected video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Index of the stream in the container.
    pub stream_index: usize,
    /// Coded width in pixels.
    pub width: u32,
    /// Coded height in pixels.
    pub height: u32,
    /// Average frames per second; `0.0` when the stream does not report a
    /// usable average frame rate.
    pub frames_per_second: f64,
    /// Frame count estimated from duration and frame rate; `0` if unknown.
    pub frame_count: u64,
    /// Decoder name (e.g. `"h264"`, `"mpeg4"`).
    pub codec: String,
}

/// Metadata for the selected audio stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct AudioMetadata {
    /// Index of the stream in the container.
    pub stream_index: usize,
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Decoder name (e.g. `"aac"`).
    pub codec: String,
}
