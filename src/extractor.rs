//! The extraction loop.
//!
//! [`FrameExtractor`] reads every packet of a [`MediaSource`], decodes the
//! video stream, asks a [`SamplingClock`] whether each decoded frame is due,
//! and writes due frames as numbered images (`000000.bmp`, `000001.bmp`, ...).
//! Audio packets are decoded and counted but never written. After the input
//! is exhausted the decoders are drained through the same path.
//!
//! Decode errors abort the run. A frame that cannot be converted or encoded is
//! dropped with a warning and the run continues; the encoder involved is
//! discarded so the next image starts from fresh codec state.
//!
//! # Example
//!
//! ```no_run
//! use framesift::{ExtractOptions, FrameExtractor, FramesiftError, OutputFormat};
//!
//! let options = ExtractOptions::new()
//!     .with_interval_ms(1000)
//!     .with_output_folder("frames")
//!     .with_output_format(OutputFormat::Jpeg);
//! let summary = FrameExtractor::new(options).run("input.mp4")?;
//! println!("wrote {} images", summary.outputs.len());
//! # Ok::<(), FramesiftError>(())
//! ```

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Error as FfmpegError,
    decoder::{Audio as AudioDecoder, Video as VideoDecoder},
    frame::{Audio as AudioFrame, Video as VideoFrame},
};

use crate::{
    configuration::ExtractOptions,
    encoder::{EncoderSettings, StillImageEncoder, WriteOutcome},
    error::FramesiftError,
    plane_buffer::PlaneBuffer,
    progress::ProgressTracker,
    sampling::{PacketTimestamps, SamplingClock},
    source::MediaSource,
};

/// Counters and outputs of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct ExtractionSummary {
    /// Video frames produced by the decoder.
    pub frames_decoded: u64,
    /// Frames encoded successfully; equals the next unused sequence number.
    pub frames_emitted: u64,
    /// Frames the sampling clock did not select.
    pub frames_skipped: u64,
    /// Selected frames dropped because conversion or encoding failed.
    pub frames_failed: u64,
    /// Encoded images whose file could not be written.
    pub write_failures: u64,
    /// Audio frames produced by the decoder.
    pub audio_frames_decoded: u64,
    /// Files written, in sequence order.
    pub outputs: Vec<PathBuf>,
}

/// Runs extractions with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct FrameExtractor {
    options: ExtractOptions,
}

impl FrameExtractor {
    /// Create an extractor.
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// The options every run uses.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Open `input` and extract images from it.
    ///
    /// # Errors
    ///
    /// - [`FramesiftError::FileOpen`] if the input cannot be opened.
    /// - [`FramesiftError::NoMediaStreams`] if it has no decodable audio or
    ///   video stream.
    /// - [`FramesiftError::VideoDecodeError`] /
    ///   [`FramesiftError::AudioDecodeError`] on a decode failure.
    pub fn run<P: AsRef<Path>>(&self, input: P) -> Result<ExtractionSummary, FramesiftError> {
        let mut source = MediaSource::open(input)?;
        self.run_source(&mut source)
    }

    /// Extract images from an already opened source.
    ///
    /// # Errors
    ///
    /// As [`run`](FrameExtractor::run), minus the open failure.
    pub fn run_source(
        &self,
        source: &mut MediaSource,
    ) -> Result<ExtractionSummary, FramesiftError> {
        if !source.has_media_streams() {
            return Err(FramesiftError::NoMediaStreams {
                path: source.path().to_path_buf(),
            });
        }

        let mut video_decoder = source.video_decoder()?;
        let mut audio_decoder = source.audio_decoder()?;
        let video_index = source.video_stream_index();
        let audio_index = source.audio_stream_index();

        let clock = source.video_timing().map(|timing| {
            SamplingClock::new(
                self.options.interval_ms,
                timing.average_frame_rate,
                timing.time_base,
            )
        });
        let total_frames = source.metadata().video.as_ref().map(|video| video.frame_count);

        log::info!(
            "Extracting from {} every {} ms as {:?} into {}",
            source.path().display(),
            self.options.interval_ms,
            self.options.output_format,
            self.options.output_folder.display(),
        );

        let mut run = ExtractionRun {
            options: &self.options,
            clock,
            buffer: None,
            encoder: None,
            tracker: ProgressTracker::new(
                self.options.progress.clone(),
                total_frames,
                self.options.batch_size,
            ),
            summary: ExtractionSummary::default(),
        };

        let mut video_frame = VideoFrame::empty();
        let mut audio_frame = AudioFrame::empty();

        loop {
            let packet = match source.read_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(error) => {
                    log::warn!("Stopping at unreadable packet: {error}");
                    break;
                }
            };

            let stream = Some(packet.stream());
            if stream == video_index {
                if let Some(decoder) = video_decoder.as_mut() {
                    decoder
                        .send_packet(&packet)
                        .map_err(|e| FramesiftError::VideoDecodeError(e.to_string()))?;
                    let timestamps = PacketTimestamps {
                        pts: packet.pts(),
                        dts: packet.dts(),
                    };
                    run.drain_video(decoder, &mut video_frame, timestamps)?;
                }
            } else if stream == audio_index {
                if let Some(decoder) = audio_decoder.as_mut() {
                    decoder
                        .send_packet(&packet)
                        .map_err(|e| FramesiftError::AudioDecodeError(e.to_string()))?;
                    run.drain_audio(decoder, &mut audio_frame)?;
                }
            }
        }

        if let Some(decoder) = video_decoder.as_mut() {
            decoder
                .send_eof()
                .map_err(|e| FramesiftError::VideoDecodeError(e.to_string()))?;
            run.drain_video(decoder, &mut video_frame, PacketTimestamps::default())?;
        }
        if let Some(decoder) = audio_decoder.as_mut() {
            decoder
                .send_eof()
                .map_err(|e| FramesiftError::AudioDecodeError(e.to_string()))?;
            run.drain_audio(decoder, &mut audio_frame)?;
        }

        run.tracker.finish();
        let summary = run.summary;
        log::info!(
            "Extraction finished: {} decoded, {} emitted, {} skipped, {} failed, {} unwritten",
            summary.frames_decoded,
            summary.frames_emitted,
            summary.frames_skipped,
            summary.frames_failed,
            summary.write_failures,
        );
        Ok(summary)
    }
}

/// Mutable state of one run.
struct ExtractionRun<'a> {
    options: &'a ExtractOptions,
    clock: Option<SamplingClock>,
    buffer: Option<PlaneBuffer>,
    /// Reused while its settings match; dropped after any failure.
    encoder: Option<StillImageEncoder>,
    tracker: ProgressTracker,
    summary: ExtractionSummary,
}

/// `true` for the "no frame right now" results of `receive_frame`.
fn is_drained(error: &FfmpegError) -> bool {
    matches!(
        error,
        FfmpegError::Eof | FfmpegError::Other { errno: ffmpeg_next::error::EAGAIN }
    )
}

impl ExtractionRun<'_> {
    fn drain_video(
        &mut self,
        decoder: &mut VideoDecoder,
        frame: &mut VideoFrame,
        timestamps: PacketTimestamps,
    ) -> Result<(), FramesiftError> {
        loop {
            match decoder.receive_frame(frame) {
                Ok(()) => self.handle_video_frame(frame, timestamps)?,
                Err(error) if is_drained(&error) => return Ok(()),
                Err(error) => return Err(FramesiftError::VideoDecodeError(error.to_string())),
            }
        }
    }

    fn drain_audio(
        &mut self,
        decoder: &mut AudioDecoder,
        frame: &mut AudioFrame,
    ) -> Result<(), FramesiftError> {
        loop {
            match decoder.receive_frame(frame) {
                Ok(()) => self.summary.audio_frames_decoded += 1,
                Err(error) if is_drained(&error) => return Ok(()),
                Err(error) => return Err(FramesiftError::AudioDecodeError(error.to_string())),
            }
        }
    }

    fn handle_video_frame(
        &mut self,
        frame: &VideoFrame,
        timestamps: PacketTimestamps,
    ) -> Result<(), FramesiftError> {
        self.summary.frames_decoded += 1;

        let buffer = match self.buffer.take() {
            Some(buffer) if buffer.matches(frame) => buffer,
            previous => {
                if previous.is_some() {
                    log::debug!(
                        "Decoded geometry changed to {:?} {}x{}",
                        frame.format(),
                        frame.width(),
                        frame.height(),
                    );
                }
                PlaneBuffer::for_frame(frame)?
            }
        };
        self.buffer.insert(buffer).copy_from(frame)?;

        let emit = match self.clock.as_mut() {
            Some(clock) => {
                let decision = clock.evaluate(timestamps);
                log::trace!(
                    "Frame {} at {} us via {:?}: emit={}",
                    self.summary.frames_decoded,
                    decision.presentation_time_us,
                    decision.rule,
                    decision.emit,
                );
                decision.emit
            }
            None => true,
        };

        if emit {
            self.emit();
        } else {
            self.summary.frames_skipped += 1;
        }
        self.tracker.decoded();
        Ok(())
    }

    /// Encode the buffered frame as the next image in the sequence.
    fn emit(&mut self) {
        let Some(buffer) = self.buffer.as_ref() else {
            return;
        };

        let (width, height) = self
            .options
            .frame_output
            .resolve_dimensions(buffer.width(), buffer.height());
        let settings = EncoderSettings::new(self.options.output_format.codec(), width, height)
            .source_buffer(buffer)
            .quality(self.options.quality);

        let mut encoder = match self.encoder.take() {
            Some(encoder) if *encoder.settings() == settings => encoder,
            _ => match StillImageEncoder::open(settings) {
                Ok(encoder) => encoder,
                Err(error) => {
                    log::warn!("Dropping frame {}: {error}", self.summary.frames_decoded);
                    self.summary.frames_failed += 1;
                    return;
                }
            },
        };

        let path = self.options.output_path(self.summary.frames_emitted);
        match encoder.encode_to_file(buffer, &path) {
            Ok(outcome) => {
                self.summary.frames_emitted += 1;
                let written = match outcome {
                    WriteOutcome::Written(bytes) => {
                        log::debug!("Wrote {} ({bytes} bytes)", path.display());
                        self.summary.outputs.push(path.clone());
                        Some(path)
                    }
                    WriteOutcome::WriteFailed(_) => {
                        self.summary.write_failures += 1;
                        None
                    }
                };
                self.tracker.emitted(written);
                self.encoder = Some(encoder);
            }
            Err(error) => {
                log::warn!("Dropping frame {}: {error}", self.summary.frames_decoded);
                self.summary.frames_failed += 1;
            }
        }
    }
}
