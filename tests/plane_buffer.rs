//! Plane buffer allocation and copy tests.

use ffmpeg_next::frame::Video as VideoFrame;
use framesift::{FramesiftError, Pixel, PlaneBuffer};

fn init() {
    ffmpeg_next::init().expect("initialise FFmpeg");
}

#[test]
fn allocates_planes_for_yuv420p() {
    init();
    let buffer = PlaneBuffer::new(Pixel::YUV420P, 320, 240).expect("allocate");

    assert_eq!(buffer.format(), Pixel::YUV420P);
    assert_eq!((buffer.width(), buffer.height()), (320, 240));
    assert_eq!(buffer.plane_count(), 3);

    let strides = buffer.strides();
    assert!(strides[0] >= 320);
    assert!(strides[1] >= 160);
    assert!(strides[2] >= 160);
    assert_eq!(strides[3], 0);

    assert!(buffer.plane(0).len() >= 320 * 240);
    assert!(buffer.plane(0).iter().all(|&byte| byte == 0));
}

#[test]
fn packed_formats_have_one_plane() {
    init();
    let buffer = PlaneBuffer::new(Pixel::RGB24, 16, 16).expect("allocate");
    assert_eq!(buffer.plane_count(), 1);
    assert!(buffer.strides()[0] >= 48);
}

#[test]
fn rejects_empty_geometry_and_unknown_format() {
    init();
    assert!(matches!(
        PlaneBuffer::new(Pixel::YUV420P, 0, 240),
        Err(FramesiftError::PlaneBufferError(_))
    ));
    assert!(matches!(
        PlaneBuffer::new(Pixel::YUV420P, 320, 0),
        Err(FramesiftError::PlaneBufferError(_))
    ));
    assert!(matches!(
        PlaneBuffer::new(Pixel::None, 320, 240),
        Err(FramesiftError::PlaneBufferError(_))
    ));
}

#[test]
fn copies_pixels_row_by_row() {
    init();
    let mut frame = VideoFrame::new(Pixel::YUV420P, 64, 32);
    let stride = frame.stride(0);
    for (row, chunk) in frame.data_mut(0).chunks_mut(stride).enumerate() {
        chunk.fill(row as u8);
    }
    frame.data_mut(1).fill(7);
    frame.data_mut(2).fill(9);

    let mut buffer = PlaneBuffer::for_frame(&frame).expect("allocate");
    assert!(buffer.matches(&frame));
    buffer.copy_from(&frame).expect("copy");

    let buffer_stride = buffer.strides()[0];
    for row in 0..32 {
        let start = row * buffer_stride;
        assert!(buffer.plane(0)[start..start + 64].iter().all(|&byte| byte == row as u8));
    }
    assert_eq!(buffer.plane(1)[0], 7);
    assert_eq!(buffer.plane(2)[0], 9);
}

#[test]
fn copy_rejects_a_different_triple() {
    init();
    let mut buffer = PlaneBuffer::new(Pixel::YUV420P, 64, 32).expect("allocate");

    let wider = VideoFrame::new(Pixel::YUV420P, 128, 32);
    assert!(!buffer.matches(&wider));
    assert!(matches!(
        buffer.copy_from(&wider),
        Err(FramesiftError::PlaneBufferError(_))
    ));

    let other_format = VideoFrame::new(Pixel::RGB24, 64, 32);
    assert!(!buffer.matches(&other_format));
    assert!(buffer.copy_from(&other_format).is_err());
}
