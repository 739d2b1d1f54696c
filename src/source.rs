//! Container access: opening inputs, picking streams, reading packets.
//!
//! [`MediaSource`] opens a media file through FFmpeg's demuxer, selects the
//! best video and audio streams, caches their [`MediaMetadata`], and hands out
//! decoders and raw packets to the extraction loop.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::{Audio as AudioDecoder, Video as VideoDecoder},
    format::context::Input,
    media::Type,
};

use crate::{
    conversion::rational_to_fps,
    error::FramesiftError,
    metadata::{AudioMetadata, MediaMetadata, VideoMetadata},
};

/// Timing facts the sampling clock needs about the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTiming {
    /// Average frame rate as reported by the container. May be `0/0`.
    pub average_frame_rate: Rational,
    /// Time base of packet timestamps.
    pub time_base: Rational,
}

/// An opened media file.
///
/// # Example
///
/// ```no_run
/// use framesift::{FramesiftError, MediaSource};
///
/// let source = MediaSource::open("input.mp4")?;
/// if let Some(video) = &source.metadata().video {
///     println!("{}x{} @ {:.2} fps", video.width, video.height, video.frames_per_second);
/// }
/// # Ok::<(), FramesiftError>(())
/// ```
pub struct MediaSource {
    input_context: Input,
    metadata: MediaMetadata,
    video_stream_index: Option<usize>,
    audio_stream_index: Option<usize>,
    path: PathBuf,
}

impl Debug for MediaSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaSource")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("audio_stream_index", &self.audio_stream_index)
            .finish_non_exhaustive()
    }
}

impl MediaSource {
    /// Open `path`, read its stream information, and select the best video
    /// and audio streams.
    ///
    /// A stream whose decoder cannot be opened is treated as absent. Having
    /// no usable stream at all is not an error here; see
    /// [`has_media_streams`](MediaSource::has_media_streams).
    ///
    /// # Errors
    ///
    /// [`FramesiftError::FileOpen`] if the file cannot be opened or its
    /// stream information cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FramesiftError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening media file: {}", path.display());

        ffmpeg_next::init().map_err(|error| FramesiftError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| FramesiftError::FileOpen {
                path: path.clone(),
                reason: error.to_string(),
            })?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let best_video = input_context
            .streams()
            .best(Type::Video)
            .map(|stream| stream.index());
        let best_audio = input_context
            .streams()
            .best(Type::Audio)
            .map(|stream| stream.index());

        let video = match best_video {
            Some(index) => match probe_video(&input_context, index, duration) {
                Ok(metadata) => Some(metadata),
                Err(error) => {
                    log::warn!("Ignoring video stream {index}: {error}");
                    None
                }
            },
            None => None,
        };

        let audio = match best_audio {
            Some(index) => match probe_audio(&input_context, index) {
                Ok(metadata) => Some(metadata),
                Err(error) => {
                    log::warn!("Ignoring audio stream {index}: {error}");
                    None
                }
            },
            None => None,
        };

        let metadata = MediaMetadata {
            video,
            audio,
            duration,
            format: input_context.format().name().to_string(),
        };

        log::info!(
            "Opened media file: {} (format={}, duration={:.2}s, video={}, audio={})",
            path.display(),
            metadata.format,
            metadata.duration.as_secs_f64(),
            metadata.video.is_some(),
            metadata.audio.is_some(),
        );

        if let Some(video) = &metadata.video {
            log::debug!(
                "Video stream: index={}, {}x{}, {:.2} fps, codec={}, ~{} frames",
                video.stream_index,
                video.width,
                video.height,
                video.frames_per_second,
                video.codec,
                video.frame_count,
            );
        }

        Ok(Self {
            video_stream_index: metadata.video.as_ref().map(|video| video.stream_index),
            audio_stream_index: metadata.audio.as_ref().map(|audio| audio.stream_index),
            input_context,
            metadata,
            path,
        })
    }

    /// Cached metadata.
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` if a decodable video or audio stream was found.
    pub fn has_media_streams(&self) -> bool {
        self.video_stream_index.is_some() || self.audio_stream_index.is_some()
    }

    /// Container index of the selected video stream.
    pub fn video_stream_index(&self) -> Option<usize> {
        self.video_stream_index
    }

    /// Container index of the selected audio stream.
    pub fn audio_stream_index(&self) -> Option<usize> {
        self.audio_stream_index
    }

    /// Frame rate and time base of the selected video stream.
    pub fn video_timing(&self) -> Option<VideoTiming> {
        let stream = self.input_context.stream(self.video_stream_index?)?;
        Some(VideoTiming {
            average_frame_rate: stream.avg_frame_rate(),
            time_base: stream.time_base(),
        })
    }

    /// Open a fresh decoder for the selected video stream.
    pub fn video_decoder(&self) -> Result<Option<VideoDecoder>, FramesiftError> {
        let Some(index) = self.video_stream_index else {
            return Ok(None);
        };
        let stream = self
            .input_context
            .stream(index)
            .ok_or_else(|| FramesiftError::VideoDecodeError(format!("stream {index} vanished")))?;
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()
            .map_err(|e| FramesiftError::VideoDecodeError(format!("cannot open decoder: {e}")))?;
        Ok(Some(decoder))
    }

    /// Open a fresh decoder for the selected audio stream.
    pub fn audio_decoder(&self) -> Result<Option<AudioDecoder>, FramesiftError> {
        let Some(index) = self.audio_stream_index else {
            return Ok(None);
        };
        let stream = self
            .input_context
            .stream(index)
            .ok_or_else(|| FramesiftError::AudioDecodeError(format!("stream {index} vanished")))?;
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .audio()
            .map_err(|e| FramesiftError::AudioDecodeError(format!("cannot open decoder: {e}")))?;
        Ok(Some(decoder))
    }

    /// Read the next compressed packet from any stream. `Ok(None)` at end of
    /// input.
    pub fn read_packet(&mut self) -> Result<Option<Packet>, FramesiftError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input_context) {
            Ok(()) => Ok(Some(packet)),
            Err(FfmpegError::Eof) => Ok(None),
            Err(error) => Err(FramesiftError::from(error)),
        }
    }
}

fn probe_video(
    input_context: &Input,
    index: usize,
    duration: Duration,
) -> Result<VideoMetadata, FfmpegError> {
    let stream = input_context.stream(index).ok_or(FfmpegError::StreamNotFound)?;
    let decoder = CodecContext::from_parameters(stream.parameters())?
        .decoder()
        .video()?;

    let mut frames_per_second = rational_to_fps(stream.avg_frame_rate());
    if frames_per_second == 0.0 {
        frames_per_second = rational_to_fps(stream.rate());
    }
    let frame_count = if frames_per_second > 0.0 {
        (duration.as_secs_f64() * frames_per_second).round() as u64
    } else {
        0
    };

    Ok(VideoMetadata {
        stream_index: index,
        width: decoder.width(),
        height: decoder.height(),
        frames_per_second,
        frame_count,
        codec: decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

fn probe_audio(input_context: &Input, index: usize) -> Result<AudioMetadata, FfmpegError> {
    let stream = input_context.stream(index).ok_or(FfmpegError::StreamNotFound)?;
    let decoder = CodecContext::from_parameters(stream.parameters())?
        .decoder()
        .audio()?;

    Ok(AudioMetadata {
        stream_index: index,
        sample_rate: decoder.rate(),
        channels: decoder.channels(),
        codec: decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}
