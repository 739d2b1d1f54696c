//! Single-shot still image encoding.
//!
//! [`StillImageEncoder`] turns the contents of a [`PlaneBuffer`] into one
//! encoded image (BMP, JPEG, PNG, or a lone H.264 access unit). Each encoder
//! owns an FFmpeg codec context, a bicubic scaling context from the source
//! pixel format to the codec's pixel format, and one destination frame that is
//! overwritten on every call.
//!
//! # Example
//!
//! ```no_run
//! use framesift::{
//!     EncoderSettings, FramesiftError, ImageCodec, Pixel, PlaneBuffer, StillImageEncoder,
//! };
//!
//! let buffer = PlaneBuffer::new(Pixel::YUV420P, 320, 240)?;
//! let settings = EncoderSettings::new(ImageCodec::Bmp, 160, 120).source_buffer(&buffer);
//! let mut encoder = StillImageEncoder::open(settings)?;
//! encoder.encode_to_file(&buffer, "thumb.bmp")?;
//! # Ok::<(), FramesiftError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    fs,
    path::Path,
};

use ffmpeg_next::{
    Dictionary, Packet, Rational,
    codec::{
        Compliance, Id, context::Context as CodecContext,
        encoder::video::Encoder as OpenedVideoEncoder,
    },
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::error::FramesiftError;
use crate::plane_buffer::PlaneBuffer;

/// Bit rate handed to every codec. Intra-only image codecs ignore it.
pub const NOMINAL_BIT_RATE: usize = 400_000;
/// Group-of-pictures size handed to every codec.
pub const GOP_SIZE: u32 = 10;
/// Quality used when none is configured.
pub const DEFAULT_QUALITY: u8 = 100;

/// Codecs a [`StillImageEncoder`] can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageCodec {
    /// H.264 / AVC with the `slow` preset.
    H264,
    /// Motion JPEG; produces a baseline JPEG file per frame.
    Mjpeg,
    /// Windows bitmap, 24-bit BGR.
    Bmp,
    /// Portable Network Graphics.
    Png,
}

impl ImageCodec {
    fn codec_id(self) -> Id {
        match self {
            ImageCodec::H264 => Id::H264,
            ImageCodec::Mjpeg => Id::MJPEG,
            ImageCodec::Bmp => Id::BMP,
            ImageCodec::Png => Id::PNG,
        }
    }

    /// Pixel format the codec is opened with.
    pub fn pixel_format(self) -> Pixel {
        match self {
            ImageCodec::H264 => Pixel::YUV420P,
            ImageCodec::Mjpeg => Pixel::YUVJ420P,
            ImageCodec::Bmp => Pixel::BGR24,
            // The PNG encoder has no planar YUV input.
            ImageCodec::Png => Pixel::RGB24,
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageCodec::H264 => "h264",
            ImageCodec::Mjpeg => "jpg",
            ImageCodec::Bmp => "bmp",
            ImageCodec::Png => "png",
        }
    }
}

/// Everything needed to build a [`StillImageEncoder`].
///
/// The source side describes the [`PlaneBuffer`]s that will be fed to
/// [`encode`](StillImageEncoder::encode); it defaults to YUV 4:2:0 planar at
/// the output geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Target codec.
    pub codec: ImageCodec,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Pixel format of incoming buffers.
    pub source_format: Pixel,
    /// Width of incoming buffers.
    pub source_width: u32,
    /// Height of incoming buffers.
    pub source_height: u32,
    /// 0–100, mapped onto the JPEG compression control.
    pub quality: u8,
}

impl EncoderSettings {
    /// Settings for `codec` at `width` × `height` with a same-size YUV 4:2:0
    /// source and full quality.
    pub fn new(codec: ImageCodec, width: u32, height: u32) -> Self {
        Self {
            codec,
            width,
            height,
            source_format: Pixel::YUV420P,
            source_width: width,
            source_height: height,
            quality: DEFAULT_QUALITY,
        }
    }

    /// Describe the incoming buffers explicitly.
    #[must_use]
    pub fn source(mut self, format: Pixel, width: u32, height: u32) -> Self {
        self.source_format = format;
        self.source_width = width;
        self.source_height = height;
        self
    }

    /// Take the source description from an existing buffer.
    #[must_use]
    pub fn source_buffer(self, buffer: &PlaneBuffer) -> Self {
        self.source(buffer.format(), buffer.width(), buffer.height())
    }

    /// Set the quality knob. Values above 100 are clamped.
    #[must_use]
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    /// Whether buffers shaped like `buffer` can be fed to an encoder built
    /// from these settings.
    pub fn accepts(&self, buffer: &PlaneBuffer) -> bool {
        buffer.format() == self.source_format
            && buffer.width() == self.source_width
            && buffer.height() == self.source_height
    }
}

/// What happened to the bytes of a successful encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file now holds exactly this many bytes.
    Written(usize),
    /// The destination could not be written; nothing reached disk.
    WriteFailed(String),
}

impl WriteOutcome {
    /// `true` for [`WriteOutcome::Written`].
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written(_))
    }
}

/// A configured codec, scaler, and destination frame for single images.
pub struct StillImageEncoder {
    settings: EncoderSettings,
    encoder: OpenedVideoEncoder,
    scaler: ScalingContext,
    destination: VideoFrame,
    frames_submitted: i64,
}

impl Debug for StillImageEncoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StillImageEncoder")
            .field("settings", &self.settings)
            .field("frames_submitted", &self.frames_submitted)
            .finish_non_exhaustive()
    }
}

impl StillImageEncoder {
    /// Find, configure, and open the codec, then allocate the destination
    /// frame and scaling context.
    ///
    /// # Errors
    ///
    /// - [`FramesiftError::EncoderNotFound`] if FFmpeg has no encoder for the
    ///   codec.
    /// - [`FramesiftError::EncoderOpen`] if the codec refuses the
    ///   configuration or an allocation fails.
    pub fn open(settings: EncoderSettings) -> Result<Self, FramesiftError> {
        crate::ffmpeg::initialize()?;

        let codec_kind = settings.codec;
        let open_error = |reason: String| FramesiftError::EncoderOpen {
            codec: codec_kind,
            reason,
        };

        if settings.width == 0 || settings.height == 0 {
            return Err(open_error(format!(
                "invalid output size {}x{}",
                settings.width, settings.height
            )));
        }

        let codec = ffmpeg_next::encoder::find(codec_kind.codec_id())
            .ok_or(FramesiftError::EncoderNotFound(codec_kind))?;

        let mut encoder = CodecContext::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| open_error(format!("cannot create codec context: {e}")))?;

        let pixel = codec_kind.pixel_format();
        encoder.set_width(settings.width);
        encoder.set_height(settings.height);
        encoder.set_format(pixel);
        encoder.set_bit_rate(NOMINAL_BIT_RATE);
        encoder.set_time_base(Rational::new(1, 25));
        encoder.set_gop(GOP_SIZE);

        let mut options = Dictionary::new();
        match codec_kind {
            ImageCodec::H264 => options.set("preset", "slow"),
            ImageCodec::Mjpeg => {
                encoder.compliance(Compliance::Experimental);
                encoder.set_qcompress(f32::from(settings.quality) / 100.0);
            }
            ImageCodec::Bmp | ImageCodec::Png => {}
        }

        let encoder = encoder
            .open_as_with(codec, options)
            .map_err(|e| open_error(format!("cannot open encoder: {e}")))?;

        let destination = VideoFrame::new(pixel, settings.width, settings.height);
        if destination.planes() == 0 {
            return Err(open_error("cannot allocate destination frame".to_string()));
        }

        let scaler = ScalingContext::get(
            settings.source_format,
            settings.source_width,
            settings.source_height,
            pixel,
            settings.width,
            settings.height,
            ScalingFlags::BICUBIC,
        )
        .map_err(|e| open_error(format!("cannot create scaler: {e}")))?;

        log::debug!(
            "Opened {:?} encoder {}x{} from {:?} {}x{}",
            codec_kind,
            settings.width,
            settings.height,
            settings.source_format,
            settings.source_width,
            settings.source_height,
        );

        Ok(Self {
            settings,
            encoder,
            scaler,
            destination,
            frames_submitted: 0,
        })
    }

    /// Settings this encoder was opened with.
    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Convert `source` and encode it into one image.
    ///
    /// The codec is given exactly one frame; a codec that needs a flush
    /// before producing output is reported as a failure.
    ///
    /// # Errors
    ///
    /// - [`FramesiftError::ConversionError`] if `source` does not match the
    ///   encoder's source settings or scaling fails.
    /// - [`FramesiftError::StillEncodeError`] if the codec rejects the frame
    ///   or returns no bytes.
    pub fn encode(&mut self, source: &PlaneBuffer) -> Result<Vec<u8>, FramesiftError> {
        if !self.settings.accepts(source) {
            return Err(FramesiftError::ConversionError(format!(
                "expected {:?} {}x{}, got {:?} {}x{}",
                self.settings.source_format,
                self.settings.source_width,
                self.settings.source_height,
                source.format(),
                source.width(),
                source.height(),
            )));
        }

        // The codec may still reference the previous picture.
        let status =
            unsafe { ffmpeg_sys_next::av_frame_make_writable(self.destination.as_mut_ptr()) };
        if status < 0 {
            return Err(FramesiftError::ConversionError(format!(
                "destination frame is not writable: {}",
                ffmpeg_next::Error::from(status)
            )));
        }

        self.scaler
            .run(source.as_frame(), &mut self.destination)
            .map_err(|e| FramesiftError::ConversionError(e.to_string()))?;

        self.destination.set_pts(Some(self.frames_submitted));
        self.frames_submitted += 1;

        self.encoder
            .send_frame(&self.destination)
            .map_err(|e| FramesiftError::StillEncodeError(format!("send_frame failed: {e}")))?;

        let mut packet = Packet::empty();
        self.encoder.receive_packet(&mut packet).map_err(|e| {
            FramesiftError::StillEncodeError(format!("codec produced no output: {e}"))
        })?;

        match packet.data() {
            Some(bytes) if !bytes.is_empty() => Ok(bytes.to_vec()),
            _ => Err(FramesiftError::StillEncodeError(
                "codec produced an empty packet".to_string(),
            )),
        }
    }

    /// Encode `source` and write the image to `path`, creating or
    /// truncating it.
    ///
    /// Only encoding failures are errors. If the file cannot be written the
    /// failure is logged and returned as [`WriteOutcome::WriteFailed`].
    pub fn encode_to_file<P: AsRef<Path>>(
        &mut self,
        source: &PlaneBuffer,
        path: P,
    ) -> Result<WriteOutcome, FramesiftError> {
        let path = path.as_ref();
        let bytes = self.encode(source)?;
        match fs::write(path, &bytes) {
            Ok(()) => Ok(WriteOutcome::Written(bytes.len())),
            Err(error) => {
                log::warn!("Could not write {}: {error}", path.display());
                Ok(WriteOutcome::WriteFailed(error.to_string()))
            }
        }
    }
}
