//! In-process decoder built on ffmpeg-next
//!
//! Implements the same contract as the external decoder library: a status
//! returning `init`, pulls that yield "frame" or "nothing", and conversion of
//! the current frame into a caller-owned RGB24 buffer.

use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::format::context::Input as FormatContext;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::media::Type as MediaType;
use ffmpeg_next::software::scaling::{Context as ScalerContext, Flags as ScalerFlags};
use ffmpeg_next::util::frame::video::Video as VideoFrameFFmpeg;

use super::config::{ScalingAlgorithm, StreamConfig};
use super::{CodecLibrary, NativeCodec};
use crate::error::{Error, Result};

/// Status when no frame is current or the handle is not initialized
const STATUS_NO_FRAME: i32 = -1;

/// AVERROR(EINVAL)
const STATUS_INVALID_ARGUMENT: i32 = -22;

/// Hands out FFmpeg-backed decoder handles
#[derive(Debug, Clone, Default)]
pub struct FfmpegLibrary {
    thread_count: u32,
    scaling: ScalingAlgorithm,
}

impl FfmpegLibrary {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            thread_count: config.thread_count,
            scaling: config.scaling,
        }
    }
}

impl CodecLibrary for FfmpegLibrary {
    type Codec = FfmpegCodec;

    fn alloc(&self) -> Result<FfmpegCodec> {
        Ok(FfmpegCodec {
            thread_count: self.thread_count,
            scaling: self.scaling,
            stream: None,
        })
    }
}

/// One FFmpeg decoding session
pub struct FfmpegCodec {
    thread_count: u32,
    scaling: ScalingAlgorithm,
    stream: Option<OpenStream>,
}

struct OpenStream {
    /// Input format context
    input: FormatContext,

    /// Video stream index
    stream_index: usize,

    /// Video decoder
    decoder: ffmpeg::decoder::Video,

    /// RGB24 converter, absent when frames already are RGB24
    scaler: Option<ScalerContext>,

    /// Current decoded frame
    decoded: VideoFrameFFmpeg,

    /// Scratch frame for scaler output
    converted: VideoFrameFFmpeg,

    /// Whether `decoded` holds a frame
    has_frame: bool,

    /// EOF sent to the decoder, only buffered frames remain
    draining: bool,

    width: u32,
    height: u32,
}

impl OpenStream {
    fn open(path: &Path, thread_count: u32, scaling: ScalingAlgorithm) -> Result<Self> {
        // Initialize FFmpeg (safe to call multiple times)
        ffmpeg::init()?;

        let input = ffmpeg::format::input(path)?;
        log::debug!("Opened file: {:?}", path);

        let (stream_index, codec_params) = {
            let stream = input
                .streams()
                .best(MediaType::Video)
                .ok_or(ffmpeg::Error::StreamNotFound)?;
            (stream.index(), stream.parameters())
        };

        let mut decoder_ctx = CodecContext::from_parameters(codec_params)?;

        // Set threading options
        if thread_count > 0 {
            unsafe {
                (*decoder_ctx.as_mut_ptr()).thread_count = thread_count as i32;
            }
        }

        let decoder = decoder_ctx.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();
        let source_format = decoder.format();

        log::info!(
            "Video stream {}: {}x{} {:?}",
            stream_index,
            width,
            height,
            source_format
        );

        let scaler = if source_format != Pixel::RGB24 {
            let scaler = ScalerContext::get(
                source_format,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                scaler_flags(scaling),
            )?;
            log::debug!("Scaler initialized: {:?} -> RGB24", source_format);
            Some(scaler)
        } else {
            None
        };

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            decoded: VideoFrameFFmpeg::empty(),
            converted: VideoFrameFFmpeg::empty(),
            has_frame: false,
            draining: false,
            width,
            height,
        })
    }

    /// Decode until one frame is available or the input runs dry
    fn decode_next(&mut self) -> Result<bool> {
        loop {
            match self.decoder.receive_frame(&mut self.decoded) {
                Ok(()) => return Ok(true),
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => {}
                Err(ffmpeg::Error::Eof) => return Ok(false),
                Err(e) => return Err(e.into()),
            }

            if self.draining {
                return Ok(false);
            }

            match self.next_video_packet() {
                Some(packet) => self.decoder.send_packet(&packet)?,
                None => {
                    log::debug!("End of input, flushing decoder");
                    self.decoder.send_eof()?;
                    self.draining = true;
                }
            }
        }
    }

    fn next_video_packet(&mut self) -> Option<ffmpeg::Packet> {
        let index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == index)
            .map(|(_, packet)| packet)
    }

    /// Copy the current frame into `dest` as tightly packed RGB24
    fn write_rgb(&mut self, dest: &mut [u8]) -> Result<()> {
        let row = self.width as usize * 3;
        if row == 0 || dest.len() != row * self.height as usize {
            return Err(invalid_argument(format!(
                "destination holds {} bytes, frame needs {}",
                dest.len(),
                row * self.height as usize
            )));
        }

        // Stream size is fixed at open; a resized frame cannot be written
        if self.decoded.width() != self.width || self.decoded.height() != self.height {
            return Err(invalid_argument(format!(
                "frame is {}x{}, stream is {}x{}",
                self.decoded.width(),
                self.decoded.height(),
                self.width,
                self.height
            )));
        }

        let source = match self.scaler {
            Some(ref mut scaler) => {
                scaler.run(&self.decoded, &mut self.converted)?;
                &self.converted
            }
            None => &self.decoded,
        };

        copy_rows(source.data(0), source.stride(0), row, dest)
    }
}

/// Copy `dest.len() / row` rows out of a plane whose rows are `stride`
/// bytes apart, dropping the padding
fn copy_rows(plane: &[u8], stride: usize, row: usize, dest: &mut [u8]) -> Result<()> {
    let rows = dest.len() / row;
    if rows == 0 {
        return Ok(());
    }
    let needed = stride * (rows - 1) + row;
    if stride < row || plane.len() < needed {
        return Err(invalid_argument(format!(
            "plane holds {} bytes, {} rows of {} need {}",
            plane.len(),
            rows,
            row,
            needed
        )));
    }

    for (y, out) in dest.chunks_exact_mut(row).enumerate() {
        let start = y * stride;
        out.copy_from_slice(&plane[start..start + row]);
    }
    Ok(())
}

fn invalid_argument(message: String) -> Error {
    Error::FFmpeg {
        code: STATUS_INVALID_ARGUMENT,
        message,
    }
}

impl NativeCodec for FfmpegCodec {
    fn init(&mut self, path: &Path) -> i32 {
        match OpenStream::open(path, self.thread_count, self.scaling) {
            Ok(stream) => {
                self.stream = Some(stream);
                0
            }
            Err(e) => {
                log::warn!("FFmpeg open failed for {}: {}", path.display(), e);
                status_of(&e)
            }
        }
    }

    fn width(&self) -> i32 {
        self.stream.as_ref().map_or(0, |s| s.width as i32)
    }

    fn height(&self) -> i32 {
        self.stream.as_ref().map_or(0, |s| s.height as i32)
    }

    fn next_frame(&mut self) -> bool {
        let stream = match self.stream.as_mut() {
            Some(s) => s,
            None => return false,
        };

        stream.has_frame = match stream.decode_next() {
            Ok(got) => got,
            Err(e) => {
                // Reported as an empty pull; the fetcher's retry absorbs it
                log::warn!("decode failed: {}", e);
                false
            }
        };
        stream.has_frame
    }

    fn convert_to_rgb(&mut self, dest: &mut [u8]) -> i32 {
        let stream = match self.stream.as_mut() {
            Some(s) if s.has_frame => s,
            _ => return STATUS_NO_FRAME,
        };

        match stream.write_rgb(dest) {
            Ok(()) => 0,
            Err(e) => {
                log::error!("RGB conversion failed: {}", e);
                status_of(&e)
            }
        }
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("FFmpeg stream closed");
        }
    }
}

fn status_of(err: &Error) -> i32 {
    match err {
        Error::FFmpeg { code, .. } if *code != 0 => *code,
        _ => STATUS_NO_FRAME,
    }
}

fn scaler_flags(scaling: ScalingAlgorithm) -> ScalerFlags {
    match scaling {
        ScalingAlgorithm::Point => ScalerFlags::POINT,
        ScalingAlgorithm::Bilinear => ScalerFlags::BILINEAR,
        ScalingAlgorithm::Bicubic => ScalerFlags::BICUBIC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::StreamDimensions;
    use crate::stream::VideoTexture;
    use crate::test_support::RecordingGl;
    use std::io::Write;

    /// 4x2 4:2:0 clip with one flat luma level per frame
    fn write_y4m(levels: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".y4m").tempfile().unwrap();
        file.write_all(b"YUV4MPEG2 W4 H2 F25:1 Ip A1:1 C420jpeg\n").unwrap();
        for &level in levels {
            file.write_all(b"FRAME\n").unwrap();
            file.write_all(&[level; 8]).unwrap();
            file.write_all(&[128; 4]).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn mean(pixels: &[u8]) -> u32 {
        pixels.iter().map(|&b| b as u32).sum::<u32>() / pixels.len() as u32
    }

    #[test]
    fn test_scaler_flags() {
        assert_eq!(scaler_flags(ScalingAlgorithm::Point), ScalerFlags::POINT);
        assert_eq!(scaler_flags(ScalingAlgorithm::Bicubic), ScalerFlags::BICUBIC);
    }

    #[test]
    fn test_uninitialized_codec() {
        let mut codec = FfmpegLibrary::default().alloc().unwrap();
        assert_eq!(codec.width(), 0);
        assert_eq!(codec.height(), 0);
        assert!(!codec.next_frame());
        assert_eq!(codec.convert_to_rgb(&mut [0u8; 12]), STATUS_NO_FRAME);
        codec.release();
    }

    #[test]
    fn test_init_unreadable_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut codec = FfmpegLibrary::new(&StreamConfig::default()).alloc().unwrap();

        // an empty file is not a media container
        assert_ne!(codec.init(file.path()), 0);
        assert_eq!(codec.width(), 0);
        codec.release();
    }

    #[test]
    fn test_decode_y4m_frames() {
        let file = write_y4m(&[40, 120, 200]);
        let mut codec = FfmpegLibrary::default().alloc().unwrap();

        assert_eq!(codec.init(file.path()), 0);
        assert_eq!(codec.width(), 4);
        assert_eq!(codec.height(), 2);

        let mut means = Vec::new();
        while codec.next_frame() {
            let mut rgb = vec![0u8; 4 * 2 * 3];
            assert_eq!(codec.convert_to_rgb(&mut rgb), 0);
            means.push(mean(&rgb));
        }
        assert_eq!(means.len(), 3);
        assert!(means[0] < means[1] && means[1] < means[2], "{:?}", means);

        // drained decoder keeps reporting no frame
        assert!(!codec.next_frame());
        assert_eq!(codec.convert_to_rgb(&mut [0u8; 24]), STATUS_NO_FRAME);
        codec.release();
    }

    #[test]
    fn test_convert_rejects_wrong_buffer() {
        let file = write_y4m(&[90]);
        let mut codec = FfmpegLibrary::default().alloc().unwrap();
        assert_eq!(codec.init(file.path()), 0);
        assert!(codec.next_frame());

        assert_eq!(codec.convert_to_rgb(&mut [0u8; 23]), STATUS_INVALID_ARGUMENT);
        codec.release();
    }

    #[test]
    fn test_video_texture_over_ffmpeg() {
        let file = write_y4m(&[40, 120, 200]);
        let gl = RecordingGl::new();
        let mut video = VideoTexture::open(
            &FfmpegLibrary::default(),
            gl.clone(),
            file.path(),
            &StreamConfig::default(),
        )
        .unwrap();

        assert_eq!(
            video.dimensions(),
            StreamDimensions {
                width: 4,
                height: 2
            }
        );
        assert!(video.advance().unwrap());
        assert!(video.advance().unwrap());
        assert!(video.advance().unwrap());
        assert!(!video.advance().unwrap());

        assert_eq!(gl.last_upload().unwrap().len(), 24);
        assert_eq!(video.frames_uploaded(), 3);
        assert_eq!(video.statistics().frames_delivered, 3);
    }

    #[test]
    fn test_copy_rows_strips_padding() {
        // two rows of 6 bytes, padded to 8
        let plane = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        let mut dest = [0u8; 12];
        copy_rows(&plane, 8, 6, &mut dest).unwrap();
        assert_eq!(dest, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_copy_rows_short_plane() {
        // plane for a smaller frame than the destination expects
        let plane = [0u8; 10];
        let mut dest = [0u8; 12];
        let err = copy_rows(&plane, 8, 6, &mut dest).unwrap_err();
        assert_eq!(status_of(&err), STATUS_INVALID_ARGUMENT);
    }

    #[test]
    fn test_status_of() {
        let err = Error::FFmpeg {
            code: -1094995529,
            message: "Invalid data found".to_string(),
        };
        assert_eq!(status_of(&err), -1094995529);
        assert_eq!(status_of(&Error::Memory), STATUS_NO_FRAME);
    }
}
