//! Shared helpers for integration tests.
//!
//! Inputs are generated on the fly instead of shipping fixtures:
//!
//! - [`synthetic_video`]: MPEG-4 Part 2 in AVI at 25 fps, video only;
//! - [`synthetic_video_with_audio`]: MPEG-4 with B-frames plus a PCM track,
//!   in Matroska;
//! - [`video_with_truncated_packet`]: raw YUV in AVI with one short packet.
//!
//! Builds of FFmpeg without the needed encoder or muxer make these return
//! `None`, and callers skip.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    ChannelLayout, Packet, Rational,
    codec::{
        Id,
        context::Context as CodecContext,
        encoder::{audio::Encoder as AudioEncoder, video::Encoder as VideoEncoder},
    },
    format::{
        Pixel, Sample, context::Output, flag::Flags as FormatFlags, sample::Type as SampleType,
    },
    frame::{Audio as AudioFrame, Video as VideoFrame},
};

pub const WIDTH: u32 = 320;
pub const HEIGHT: u32 = 240;
pub const FRAMES_PER_SECOND: i32 = 25;
pub const SAMPLE_RATE: i32 = 8000;

pub const RAW_WIDTH: u32 = 64;
pub const RAW_HEIGHT: u32 = 48;

const VIDEO_STREAM: usize = 0;
const AUDIO_STREAM: usize = 1;

/// Write `frame_count` frames of a moving gradient to `directory/input.avi`.
pub fn synthetic_video(directory: &Path, frame_count: usize) -> Option<PathBuf> {
    skip_on_error(directory.join("input.avi"), |path| {
        write_video(path, frame_count, 0, false)
    })
}

/// Write `frame_count` gradient frames encoded with up to two B-frames, plus
/// one mono PCM chunk per frame, to `directory/input.mkv`.
pub fn synthetic_video_with_audio(directory: &Path, frame_count: usize) -> Option<PathBuf> {
    skip_on_error(directory.join("input.mkv"), |path| {
        write_video(path, frame_count, 2, true)
    })
}

/// Write `frame_count` raw YUV 4:2:0 frames to `directory/truncated.avi`,
/// cutting packet `truncated_index` down to a few bytes.
pub fn video_with_truncated_packet(
    directory: &Path,
    frame_count: usize,
    truncated_index: usize,
) -> Option<PathBuf> {
    skip_on_error(directory.join("truncated.avi"), |path| {
        write_raw_video(path, frame_count, truncated_index)
    })
}

fn skip_on_error<F>(path: PathBuf, write: F) -> Option<PathBuf>
where
    F: FnOnce(&Path) -> Result<(), String>,
{
    match write(&path) {
        Ok(()) => Some(path),
        Err(reason) => {
            eprintln!("Skipping: cannot generate test video ({reason})");
            None
        }
    }
}

fn open_output(path: &Path) -> Result<(Output, bool), String> {
    ffmpeg_next::init().map_err(|e| e.to_string())?;
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);

    let output = ffmpeg_next::format::output(path).map_err(|e| e.to_string())?;
    let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);
    Ok((output, needs_global_header))
}

fn add_video_stream(
    output: &mut Output,
    codec_id: Id,
    format: Pixel,
    (width, height): (u32, u32),
    max_b_frames: usize,
    global_header: bool,
) -> Result<VideoEncoder, String> {
    let time_base = Rational::new(1, FRAMES_PER_SECOND);
    let codec = ffmpeg_next::encoder::find(codec_id).ok_or("video encoder not available")?;
    let mut stream = output.add_stream(codec).map_err(|e| e.to_string())?;

    let mut encoder = CodecContext::from_parameters(stream.parameters())
        .map_err(|e| e.to_string())?
        .encoder()
        .video()
        .map_err(|e| e.to_string())?;
    encoder.set_width(width);
    encoder.set_height(height);
    encoder.set_format(format);
    encoder.set_time_base(time_base);
    encoder.set_frame_rate(Some(Rational::new(FRAMES_PER_SECOND, 1)));
    encoder.set_bit_rate(400_000);
    encoder.set_max_b_frames(max_b_frames);
    if global_header {
        unsafe {
            (*encoder.as_mut_ptr()).flags |= ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
        }
    }

    let encoder = encoder.open_as(codec).map_err(|e| e.to_string())?;
    stream.set_parameters(&encoder);
    stream.set_time_base(time_base);
    stream.set_avg_frame_rate(Rational::new(FRAMES_PER_SECOND, 1));
    Ok(encoder)
}

fn add_audio_stream(output: &mut Output, global_header: bool) -> Result<AudioEncoder, String> {
    let codec =
        ffmpeg_next::encoder::find(Id::PCM_S16LE).ok_or("pcm_s16le encoder not available")?;
    let mut stream = output.add_stream(codec).map_err(|e| e.to_string())?;

    let mut encoder = CodecContext::from_parameters(stream.parameters())
        .map_err(|e| e.to_string())?
        .encoder()
        .audio()
        .map_err(|e| e.to_string())?;
    encoder.set_rate(SAMPLE_RATE);
    encoder.set_channel_layout(ChannelLayout::MONO);
    encoder.set_format(Sample::I16(SampleType::Packed));
    encoder.set_time_base(Rational::new(1, SAMPLE_RATE));
    if global_header {
        unsafe {
            (*encoder.as_mut_ptr()).flags |= ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
        }
    }

    let encoder = encoder.open_as(codec).map_err(|e| e.to_string())?;
    stream.set_parameters(&encoder);
    stream.set_time_base(Rational::new(1, SAMPLE_RATE));
    Ok(encoder)
}

fn stream_time_base(output: &Output, index: usize) -> Result<Rational, String> {
    output
        .stream(index)
        .map(|stream| stream.time_base())
        .ok_or_else(|| format!("stream {index} vanished"))
}

/// Move every pending packet from `receive` into the muxer.
fn write_pending<F>(
    output: &mut Output,
    mut receive: F,
    stream_index: usize,
    encoder_time_base: Rational,
) -> Result<(), String>
where
    F: FnMut(&mut Packet) -> bool,
{
    let stream_time_base = stream_time_base(output, stream_index)?;
    let mut packet = Packet::empty();
    while receive(&mut packet) {
        packet.set_stream(stream_index);
        packet.rescale_ts(encoder_time_base, stream_time_base);
        packet.write_interleaved(output).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn write_video(
    path: &Path,
    frame_count: usize,
    max_b_frames: usize,
    with_audio: bool,
) -> Result<(), String> {
    let (mut output, global_header) = open_output(path)?;
    let video_time_base = Rational::new(1, FRAMES_PER_SECOND);
    let audio_time_base = Rational::new(1, SAMPLE_RATE);

    let mut video = add_video_stream(
        &mut output,
        Id::MPEG4,
        Pixel::YUV420P,
        (WIDTH, HEIGHT),
        max_b_frames,
        global_header,
    )?;
    let mut audio = if with_audio {
        Some(add_audio_stream(&mut output, global_header)?)
    } else {
        None
    };
    output.write_header().map_err(|e| e.to_string())?;

    let samples_per_frame = (SAMPLE_RATE / FRAMES_PER_SECOND) as usize;
    let mut frame = VideoFrame::new(Pixel::YUV420P, WIDTH, HEIGHT);
    let mut chunk = AudioFrame::new(
        Sample::I16(SampleType::Packed),
        samples_per_frame,
        ChannelLayout::MONO,
    );
    chunk.set_rate(SAMPLE_RATE as u32);

    for index in 0..frame_count {
        paint(&mut frame, index);
        frame.set_pts(Some(index as i64));
        video.send_frame(&frame).map_err(|e| e.to_string())?;
        write_pending(
            &mut output,
            |packet| video.receive_packet(packet).is_ok(),
            VIDEO_STREAM,
            video_time_base,
        )?;

        if let Some(audio) = audio.as_mut() {
            tone(&mut chunk, index);
            chunk.set_pts(Some((index * samples_per_frame) as i64));
            audio.send_frame(&chunk).map_err(|e| e.to_string())?;
            write_pending(
                &mut output,
                |packet| audio.receive_packet(packet).is_ok(),
                AUDIO_STREAM,
                audio_time_base,
            )?;
        }
    }

    video.send_eof().map_err(|e| e.to_string())?;
    write_pending(
        &mut output,
        |packet| video.receive_packet(packet).is_ok(),
        VIDEO_STREAM,
        video_time_base,
    )?;
    if let Some(audio) = audio.as_mut() {
        audio.send_eof().map_err(|e| e.to_string())?;
        write_pending(
            &mut output,
            |packet| audio.receive_packet(packet).is_ok(),
            AUDIO_STREAM,
            audio_time_base,
        )?;
    }

    output.write_trailer().map_err(|e| e.to_string())
}

fn write_raw_video(path: &Path, frame_count: usize, truncated_index: usize) -> Result<(), String> {
    let (mut output, global_header) = open_output(path)?;
    let time_base = Rational::new(1, FRAMES_PER_SECOND);
    let mut encoder = add_video_stream(
        &mut output,
        Id::RAWVIDEO,
        Pixel::YUV420P,
        (RAW_WIDTH, RAW_HEIGHT),
        0,
        global_header,
    )?;
    output.write_header().map_err(|e| e.to_string())?;
    let stream_time_base = stream_time_base(&output, VIDEO_STREAM)?;

    let mut frame = VideoFrame::new(Pixel::YUV420P, RAW_WIDTH, RAW_HEIGHT);
    let mut packet = Packet::empty();
    for index in 0..frame_count {
        frame.data_mut(0).fill((16 + index * 20) as u8);
        frame.data_mut(1).fill(128);
        frame.data_mut(2).fill(128);
        frame.set_pts(Some(index as i64));
        encoder.send_frame(&frame).map_err(|e| e.to_string())?;
        while encoder.receive_packet(&mut packet).is_ok() {
            let mut written = if index == truncated_index {
                let data = packet.data().ok_or("raw packet has no payload")?;
                let mut short = Packet::copy(&data[..data.len().min(100)]);
                short.set_pts(packet.pts());
                short.set_dts(packet.dts());
                short
            } else {
                packet.clone()
            };
            written.set_stream(VIDEO_STREAM);
            written.rescale_ts(time_base, stream_time_base);
            written.write_interleaved(&mut output).map_err(|e| e.to_string())?;
        }
    }

    output.write_trailer().map_err(|e| e.to_string())
}

/// Horizontal luma ramp shifted by the frame index, neutral chroma.
fn paint(frame: &mut VideoFrame, index: usize) {
    let stride = frame.stride(0);
    let luma = frame.data_mut(0);
    for y in 0..HEIGHT as usize {
        for x in 0..WIDTH as usize {
            luma[y * stride + x] = ((x + y + index * 8) % 220 + 16) as u8;
        }
    }
    for plane in 1..3 {
        frame.data_mut(plane).fill(128);
    }
}

/// Sawtooth on the single channel, offset by the chunk index.
fn tone(chunk: &mut AudioFrame, index: usize) {
    for (offset, sample) in chunk.plane_mut::<i16>(0).iter_mut().enumerate() {
        *sample = (((offset + index * 7) % 64) as i16 - 32) * 256;
    }
}

/// Image files in `directory` with extension `extension`, sorted by name.
pub fn written_images(directory: &Path, extension: &str) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(directory)
        .expect("read output directory")
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .collect();
    images.sort();
    images
}
