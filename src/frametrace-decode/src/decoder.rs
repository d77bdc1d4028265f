use ffmpeg_next::ffi;

use frametrace_queue::FrameQueue;

use crate::error::DecodeError;
use crate::filter::FrameFilter;
use crate::hwaccel::{self, HwDeviceContext};
use crate::seek;

/// Opens a container, decodes its best video stream, and feeds RGB24 frames
/// into a [`FrameQueue`].
///
/// One `Decoder` is created per run and driven from a single thread; it is
/// not `Sync` and makes no attempt to be — concurrency lives entirely on the
/// OCR-worker side of the queue.
pub struct Decoder {
    input_ctx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::codec::decoder::Video,
    video_stream_index: usize,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    frame_filter: FrameFilter,
    time_base: f64,
    avg_frame_rate: f64,
    width: u32,
    height: u32,
    eof_sent: bool,

    // Kept alive for the lifetime of the decoder even though nothing reads
    // them again after open(): dropping the device context or the pixel
    // format box early would leave the codec's get_format callback pointing
    // at freed memory.
    _hw_device_ctx: Option<HwDeviceContext>,
    hw_pixel_format: Option<ffi::AVPixelFormat>,
    _hw_pixfmt_box: Option<Box<ffi::AVPixelFormat>>,
}

// The raw AVCodecContext/AVFormatContext pointers inside the ffmpeg-next
// types are only ever touched from the thread that owns this Decoder.
unsafe impl Send for Decoder {}

impl Decoder {
    /// Open `path`, select its best video stream, and attempt hardware
    /// decoding before falling back to software. If `starting_frame` is
    /// greater than zero, seeks there (recovering via binary search if the
    /// container refuses a direct seek).
    pub fn open(path: &str, frame_filter: FrameFilter, starting_frame: i64) -> Result<Self, DecodeError> {
        ffmpeg_next::init().map_err(|e| DecodeError::Open {
            path: path.to_string(),
            source: e,
        })?;

        let input_ctx = ffmpeg_next::format::input(&path).map_err(|e| DecodeError::Open {
            path: path.to_string(),
            source: e,
        })?;

        let stream = input_ctx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| DecodeError::NoVideoStream(path.to_string()))?;
        let video_stream_index = stream.index();

        let rational_fps = stream.avg_frame_rate();
        let avg_frame_rate = if rational_fps.denominator() > 0 {
            rational_fps.numerator() as f64 / rational_fps.denominator() as f64
        } else {
            tracing::warn!(path, "stream has no average frame rate, assuming 25fps");
            25.0
        };
        let tb = stream.time_base();
        let time_base = tb.numerator() as f64 / tb.denominator() as f64;

        let mut decoder_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(DecodeError::CodecOpen)?;

        let codec_id = unsafe { (*decoder_ctx.as_ptr()).codec_id };
        let codec_ptr = unsafe { ffi::avcodec_find_decoder(codec_id) };

        let mut hw_device_ctx = None;
        let mut hw_pixel_format = None;
        let mut hw_pixfmt_box: Option<Box<ffi::AVPixelFormat>> = None;

        if !codec_ptr.is_null() {
            if let Some(hw) = hwaccel::probe(codec_ptr) {
                let fmt_box = Box::new(hw.hw_pixel_format);
                unsafe {
                    let ctx_ptr = decoder_ctx.as_mut_ptr();
                    (*ctx_ptr).hw_device_ctx = hw.device_ctx.new_ref();
                    (*ctx_ptr).opaque = fmt_box.as_ref() as *const ffi::AVPixelFormat as *mut std::ffi::c_void;
                    (*ctx_ptr).get_format = Some(negotiate_pixel_format);
                }
                hw_pixfmt_box = Some(fmt_box);
                hw_pixel_format = Some(hw.hw_pixel_format);
                hw_device_ctx = Some(hw.device_ctx);
            }
        }

        let decoder = match decoder_ctx.decoder().video() {
            Ok(decoder) => decoder,
            Err(e) if hw_device_ctx.is_some() => {
                tracing::error!(error = %e, "hardware decoder init failed, retrying in software mode");
                hw_device_ctx = None;
                hw_pixel_format = None;
                hw_pixfmt_box = None;
                let mut sw_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
                    .map_err(DecodeError::CodecOpen)?;
                sw_ctx.decoder().video().map_err(DecodeError::CodecOpen)?
            }
            Err(e) => return Err(DecodeError::CodecOpen(e)),
        };

        let width = decoder.width();
        let height = decoder.height();

        let mut this = Self {
            input_ctx,
            decoder,
            video_stream_index,
            scaler: None,
            frame_filter,
            time_base,
            avg_frame_rate,
            width,
            height,
            eof_sent: false,
            _hw_device_ctx: hw_device_ctx,
            hw_pixel_format,
            _hw_pixfmt_box: hw_pixfmt_box,
        };

        if starting_frame > 0 {
            this.seek_to_frame(starting_frame)?;
        }

        Ok(this)
    }

    /// Output frame width after colour conversion, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Output frame height after colour conversion, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGB24 stride for a frame of this decoder's dimensions.
    pub fn bytes_per_line(&self) -> usize {
        self.width as usize * 3
    }

    /// Best-effort total frame count, estimated from the container's
    /// reported duration. `None` when the container doesn't report one.
    pub fn estimated_frame_count(&self) -> Option<i64> {
        let duration = self.input_ctx.duration();
        if duration <= 0 {
            return None;
        }
        let seconds = duration as f64 / ffi::AV_TIME_BASE as f64;
        Some((seconds * self.avg_frame_rate).round() as i64)
    }

    fn frame_number_for(&self, pts: i64) -> i64 {
        (pts as f64 * self.time_base * self.avg_frame_rate).round() as i64
    }

    /// Translate `frame_number` to a stream timestamp and seek there,
    /// recovering via binary search (§ seek controller) if the direct seek
    /// fails.
    pub fn seek_to_frame(&mut self, frame_number: i64) -> Result<(), DecodeError> {
        if frame_number <= 0 {
            return Ok(());
        }
        let target_ts = (frame_number as f64 / self.avg_frame_rate / self.time_base).round() as i64;

        if self.input_ctx.seek(target_ts, ..=target_ts).is_err() {
            tracing::warn!(frame_number, target_ts, "direct seek failed, recovering via binary search");
            let max = {
                let d = self.input_ctx.duration();
                if d > 0 {
                    d
                } else {
                    target_ts
                }
            };

            let input_ctx = &mut self.input_ctx;
            let mut last_seek_err = None;
            seek::recover(0, max, 0, &mut |ts| match input_ctx.seek(ts, ..=ts) {
                Ok(()) => {
                    last_seek_err = None;
                    true
                }
                Err(e) => {
                    last_seek_err = Some(e);
                    false
                }
            });

            if let Some(e) = last_seek_err {
                return Err(DecodeError::Seek(e));
            }
        }

        self.decoder.flush();
        self.eof_sent = false;
        self.scaler = None;
        Ok(())
    }

    /// Drive decoding to completion, delivering filtered, colour-converted
    /// frames to `queue`. `should_stop` is polled after every delivered
    /// frame so an external shutdown request can end the loop promptly.
    /// Returns once the container is exhausted, the queue's producer side
    /// shuts down, or `should_stop` returns `true`.
    pub fn run(
        &mut self,
        queue: &FrameQueue,
        starting_frame: i64,
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<(), DecodeError> {
        loop {
            if should_stop() {
                return Ok(());
            }

            let frame = match self.next_decoded_frame()? {
                Some(frame) => frame,
                None => return Ok(()),
            };

            let picture_type = unsafe { ffmpeg_next::picture::Type::from((*frame.as_ptr()).pict_type) };
            if !self.frame_filter.contains(picture_type) {
                continue;
            }

            let frame_number = self.frame_number_for(frame.pts().unwrap_or(0));
            if frame_number < starting_frame {
                continue;
            }

            let rgb = self.to_rgb24(frame)?;

            let Some(mut buffer) = queue.take_producer() else {
                return Ok(());
            };
            buffer.fill(
                frame_number,
                rgb.width(),
                rgb.height(),
                rgb.stride(0),
                rgb.data(0),
            );
            queue.return_consumer(buffer);
        }
    }

    /// Pull the next decoded frame, feeding packets and flushing at EOF as
    /// needed. `Ok(None)` means the container is fully drained.
    fn next_decoded_frame(&mut self) -> Result<Option<ffmpeg_next::util::frame::Video>, DecodeError> {
        loop {
            let mut frame = ffmpeg_next::util::frame::Video::empty();
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => return Ok(Some(frame)),
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {}
                Err(ffmpeg_next::Error::Eof) => return Ok(None),
                Err(e) => {
                    tracing::warn!(error = %e, "decode error, skipping frame");
                    continue;
                }
            }

            if self.eof_sent {
                return Ok(None);
            }

            loop {
                let mut packet = ffmpeg_next::codec::packet::Packet::empty();
                match packet.read(&mut self.input_ctx) {
                    Ok(()) => {
                        if packet.stream() != self.video_stream_index {
                            continue;
                        }
                        if let Err(e) = self.decoder.send_packet(&packet) {
                            tracing::warn!(error = %e, "decoder rejected packet, skipping");
                            continue;
                        }
                        break;
                    }
                    Err(ffmpeg_next::Error::Eof) => {
                        self.decoder.send_eof().map_err(DecodeError::Ffmpeg)?;
                        self.eof_sent = true;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read packet, skipping");
                        continue;
                    }
                }
            }
        }
    }

    fn to_rgb24(
        &mut self,
        frame: ffmpeg_next::util::frame::Video,
    ) -> Result<ffmpeg_next::util::frame::Video, DecodeError> {
        let sw_frame = if self.is_hw_frame(&frame) {
            self.transfer_hw_frame(&frame)?
        } else {
            frame
        };

        let scaler = self.scaler_for(sw_frame.format())?;
        let mut out = ffmpeg_next::util::frame::Video::empty();
        scaler.run(&sw_frame, &mut out).map_err(DecodeError::Scaler)?;
        Ok(out)
    }

    fn is_hw_frame(&self, frame: &ffmpeg_next::util::frame::Video) -> bool {
        match self.hw_pixel_format {
            Some(fmt) => unsafe { (*frame.as_ptr()).format == fmt as i32 },
            None => false,
        }
    }

    fn transfer_hw_frame(
        &self,
        hw_frame: &ffmpeg_next::util::frame::Video,
    ) -> Result<ffmpeg_next::util::frame::Video, DecodeError> {
        let mut sw_frame = ffmpeg_next::util::frame::Video::empty();
        let ret = unsafe { ffi::av_hwframe_transfer_data(sw_frame.as_mut_ptr(), hw_frame.as_ptr(), 0) };
        if ret < 0 {
            return Err(DecodeError::Ffmpeg(ffmpeg_next::Error::from(ret)));
        }
        Ok(sw_frame)
    }

    fn scaler_for(
        &mut self,
        src_format: ffmpeg_next::format::Pixel,
    ) -> Result<&mut ffmpeg_next::software::scaling::Context, DecodeError> {
        if self.scaler.is_none() {
            let scaler = ffmpeg_next::software::scaling::Context::get(
                src_format,
                self.width,
                self.height,
                ffmpeg_next::format::Pixel::RGB24,
                self.width,
                self.height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )
            .map_err(DecodeError::Scaler)?;
            self.scaler = Some(scaler);
        }
        Ok(self.scaler.as_mut().unwrap())
    }
}

/// Installed as the codec context's `get_format` callback when hardware
/// acceleration is active. Picks the hardware pixel format stashed in
/// `opaque` when FFmpeg offers it, otherwise defers to FFmpeg's own choice.
unsafe extern "C" fn negotiate_pixel_format(
    ctx: *mut ffi::AVCodecContext,
    formats: *const ffi::AVPixelFormat,
) -> ffi::AVPixelFormat {
    let opaque = (*ctx).opaque as *const ffi::AVPixelFormat;
    if !opaque.is_null() {
        let wanted = *opaque;
        let mut cursor = formats;
        while *cursor != ffi::AVPixelFormat::AV_PIX_FMT_NONE {
            if *cursor == wanted {
                return wanted;
            }
            cursor = cursor.add(1);
        }
    }
    *formats
}
