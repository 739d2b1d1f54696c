//! Owned multi-plane pixel storage.
//!
//! A [`PlaneBuffer`] holds up to four pixel planes with their line strides for
//! a single (format, width, height) triple. The extraction loop allocates one
//! when the video geometry becomes known and overwrites it with every decoded
//! frame, so per-frame decoding never allocates pixel memory. Planes are
//! released when the buffer is dropped.

use ffmpeg_next::{format::Pixel, frame::Video as VideoFrame};

use crate::error::FramesiftError;

/// Maximum number of planes a buffer can carry.
pub const MAX_PLANES: usize = 4;

/// Raw decoded pixels in a fixed format and geometry.
pub struct PlaneBuffer {
    frame: VideoFrame,
}

impl std::fmt::Debug for PlaneBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaneBuffer")
            .field("format", &self.format())
            .field("width", &self.width())
            .field("height", &self.height())
            .field("strides", &self.strides())
            .finish()
    }
}

impl PlaneBuffer {
    /// Allocate zeroed planes for `format` at `width` × `height`.
    ///
    /// # Errors
    ///
    /// [`FramesiftError::PlaneBufferError`] for a zero dimension, an unknown
    /// pixel format, or a failed allocation.
    pub fn new(format: Pixel, width: u32, height: u32) -> Result<Self, FramesiftError> {
        if width == 0 || height == 0 {
            return Err(FramesiftError::PlaneBufferError(format!(
                "cannot allocate a {width}x{height} buffer"
            )));
        }
        if format == Pixel::None {
            return Err(FramesiftError::PlaneBufferError(
                "pixel format is unknown".to_string(),
            ));
        }

        let mut frame = VideoFrame::new(format, width, height);
        if frame.planes() == 0 {
            return Err(FramesiftError::PlaneBufferError(format!(
                "allocation failed for {format:?} {width}x{height}"
            )));
        }
        for index in 0..frame.planes().min(MAX_PLANES) {
            frame.data_mut(index).fill(0);
        }

        log::debug!("Allocated plane buffer: {format:?} {width}x{height}");
        Ok(Self { frame })
    }

    /// Allocate a buffer shaped like a decoded frame.
    pub fn for_frame(frame: &VideoFrame) -> Result<Self, FramesiftError> {
        Self::new(frame.format(), frame.width(), frame.height())
    }

    /// Pixel format of every plane set written into this buffer.
    pub fn format(&self) -> Pixel {
        self.frame.format()
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Number of populated planes (1 to 4).
    pub fn plane_count(&self) -> usize {
        self.frame.planes().min(MAX_PLANES)
    }

    /// Line strides of all four slots; unused slots are zero.
    pub fn strides(&self) -> [usize; MAX_PLANES] {
        let mut strides = [0; MAX_PLANES];
        for (index, stride) in strides.iter_mut().enumerate().take(self.plane_count()) {
            *stride = self.frame.stride(index);
        }
        strides
    }

    /// Bytes of plane `index`, `stride × plane height` long.
    ///
    /// # Panics
    ///
    /// If `index >= self.plane_count()`.
    pub fn plane(&self, index: usize) -> &[u8] {
        self.frame.data(index)
    }

    /// Mutable bytes of plane `index`.
    ///
    /// # Panics
    ///
    /// If `index >= self.plane_count()`.
    pub fn plane_mut(&mut self, index: usize) -> &mut [u8] {
        self.frame.data_mut(index)
    }

    /// Whether `frame` has this buffer's format and geometry.
    pub fn matches(&self, frame: &VideoFrame) -> bool {
        frame.format() == self.format()
            && frame.width() == self.width()
            && frame.height() == self.height()
    }

    /// Overwrite the planes with the pixels of `frame`.
    ///
    /// Rows are copied one by one so differing strides (decoder alignment
    /// padding versus this buffer's) are handled.
    ///
    /// # Errors
    ///
    /// [`FramesiftError::PlaneBufferError`] when `frame` does not match this
    /// buffer's format and geometry.
    pub fn copy_from(&mut self, frame: &VideoFrame) -> Result<(), FramesiftError> {
        if !self.matches(frame) {
            return Err(FramesiftError::PlaneBufferError(format!(
                "frame {:?} {}x{} does not fit buffer {:?} {}x{}",
                frame.format(),
                frame.width(),
                frame.height(),
                self.format(),
                self.width(),
                self.height(),
            )));
        }

        let planes = frame.planes().min(self.plane_count());
        for index in 0..planes {
            let source_stride = frame.stride(index);
            let destination_stride = self.frame.stride(index);
            let row_bytes = source_stride.min(destination_stride);
            let rows = frame.plane_height(index).min(self.frame.plane_height(index)) as usize;

            let source = frame.data(index);
            let destination = self.frame.data_mut(index);
            for row in 0..rows {
                let from = row * source_stride;
                let to = row * destination_stride;
                destination[to..to + row_bytes].copy_from_slice(&source[from..from + row_bytes]);
            }
        }
        Ok(())
    }

    pub(crate) fn as_frame(&self) -> &VideoFrame {
        &self.frame
    }
}
