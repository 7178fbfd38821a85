use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameGrab, FrameSource};

/// Live frame source decoded via ffmpeg-next (libavformat + libavdevice).
///
/// The source string is either a capture device index (`"0"`), a device
/// path, a video file, or a network stream URL. Each decoded frame is
/// converted to RGB24.
pub struct FfmpegCamera {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    flushing: bool,
    ended: bool,
}

// Safety: FfmpegCamera is owned by exactly one frame loop at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    /// Opens the source. Failure here is fatal for the session.
    pub fn open(source: &str) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = open_input(source)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| format!("No video stream found in '{source}'"))?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!("Opened camera source '{source}' ({width}x{height})");

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            flushing: false,
            ended: false,
        })
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;
        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        Ok(Some(Frame::new(pixels, self.width, self.height, 3)))
    }
}

impl FrameSource for FfmpegCamera {
    fn grab_frame(&mut self) -> Result<FrameGrab, Box<dyn std::error::Error>> {
        if self.ended {
            return Ok(FrameGrab::Ended);
        }

        if let Some(frame) = self.try_receive()? {
            return Ok(FrameGrab::Frame(frame));
        }

        if self.flushing {
            self.ended = true;
            return Ok(FrameGrab::Ended);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                return match self.try_receive()? {
                    Some(frame) => Ok(FrameGrab::Frame(frame)),
                    None => {
                        self.ended = true;
                        Ok(FrameGrab::Ended)
                    }
                };
            };

            if stream.index() != self.stream_index {
                continue;
            }

            // A corrupt packet is a transient hiccup, not the end of the stream.
            if self.decoder.send_packet(&packet).is_err() {
                return Ok(FrameGrab::Empty);
            }

            if let Some(frame) = self.try_receive()? {
                return Ok(FrameGrab::Frame(frame));
            }
        }
    }

    fn close(&mut self) {
        self.ended = true;
    }
}

/// How a configured camera source string should be opened.
#[derive(Debug, PartialEq, Eq)]
enum SourceKind {
    /// Capture device by index, opened through the platform capture format.
    Device(u32),
    /// File path, device path or stream URL, probed by libavformat.
    Location(String),
}

fn classify_source(source: &str) -> SourceKind {
    let trimmed = source.trim();
    match trimmed.parse::<u32>() {
        Ok(index) => SourceKind::Device(index),
        Err(_) => SourceKind::Location(trimmed.to_string()),
    }
}

fn open_input(
    source: &str,
) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
    match classify_source(source) {
        SourceKind::Location(location) => Ok(ffmpeg_next::format::input(&location)?),
        SourceKind::Device(index) => {
            ffmpeg_next::device::register_all();
            let (format_name, device) = capture_device(index);
            let format = ffmpeg_next::device::input::video()
                .find(|f| f.name() == format_name)
                .ok_or_else(|| format!("capture format '{format_name}' is not available"))?;
            let ctx = ffmpeg_next::format::open_with(
                &device,
                &ffmpeg_next::format::Format::Input(format),
                ffmpeg_next::Dictionary::new(),
            )?;
            Ok(ctx.input())
        }
    }
}

/// Platform capture format and device name for a camera index.
fn capture_device(index: u32) -> (&'static str, String) {
    #[cfg(target_os = "macos")]
    {
        ("avfoundation", index.to_string())
    }
    #[cfg(target_os = "windows")]
    {
        ("dshow", format!("video={index}"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        ("video4linux2,v4l2", format!("/dev/video{index}"))
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping the per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32) {
        ffmpeg_next::init().unwrap();
        let fps = 30;

        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        for i in 0..num_frames {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            let value = ((i * 40) % 256) as u8;
            rgb_frame.data_mut(0).fill(value);

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));
            encoder.send_frame(&yuv_frame).unwrap();

            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(&mut octx).unwrap();
            }
        }

        encoder.send_eof().unwrap();
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
            encoded.write_interleaved(&mut octx).unwrap();
        }
        octx.write_trailer().unwrap();
    }

    #[rstest]
    #[case::index("0", SourceKind::Device(0))]
    #[case::padded_index(" 2 ", SourceKind::Device(2))]
    #[case::file("clips/door.mp4", SourceKind::Location("clips/door.mp4".into()))]
    #[case::stream("rtsp://cam/live", SourceKind::Location("rtsp://cam/live".into()))]
    #[case::negative("-1", SourceKind::Location("-1".into()))]
    fn test_classify_source(#[case] source: &str, #[case] expected: SourceKind) {
        assert_eq!(classify_source(source), expected);
    }

    #[test]
    fn test_open_nonexistent_file_fails() {
        assert!(FfmpegCamera::open("/nonexistent/clip.mp4").is_err());
    }

    #[test]
    fn test_file_source_yields_rgb_frames_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 5, 160, 120);

        let mut camera = FfmpegCamera::open(path.to_str().unwrap()).unwrap();
        let mut frames = 0;
        loop {
            match camera.grab_frame().unwrap() {
                FrameGrab::Frame(frame) => {
                    assert_eq!(frame.channels(), 3);
                    assert_eq!(frame.data().len(), 160 * 120 * 3);
                    frames += 1;
                }
                FrameGrab::Empty => continue,
                FrameGrab::Ended => break,
            }
        }
        assert_eq!(frames, 5);
        assert!(matches!(camera.grab_frame().unwrap(), FrameGrab::Ended));
    }

    #[test]
    fn test_closed_source_reports_ended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 2, 64, 48);

        let mut camera = FfmpegCamera::open(path.to_str().unwrap()).unwrap();
        camera.close();
        assert!(matches!(camera.grab_frame().unwrap(), FrameGrab::Ended));
    }
}
