//! Hardware-accelerated decode setup.
//!
//! Enumerates the hardware device types FFmpeg was built with, matches them
//! against the codec's advertised hardware configs, and wires up a device
//! context plus a `get_format` callback so the decoder prefers the hardware
//! surface format when one is available. Initialization failure here is
//! never fatal: the caller falls back to software decoding.

use ffmpeg_next::ffi;

/// RAII wrapper around an `AVBufferRef*` hardware device context.
pub struct HwDeviceContext {
    ptr: *mut ffi::AVBufferRef,
}

// The buffer is reference-counted by FFmpeg and only ever touched from the
// single decoder thread that owns it.
unsafe impl Send for HwDeviceContext {}

impl HwDeviceContext {
    fn create(device_type: ffi::AVHWDeviceType) -> Option<Self> {
        let mut ptr: *mut ffi::AVBufferRef = std::ptr::null_mut();
        let ret = unsafe {
            ffi::av_hwdevice_ctx_create(&mut ptr, device_type, std::ptr::null(), std::ptr::null_mut(), 0)
        };
        if ret < 0 || ptr.is_null() {
            None
        } else {
            Some(Self { ptr })
        }
    }

    /// A new reference to the buffer, suitable for handing to a decoder
    /// context (which takes ownership of the ref it's given).
    pub fn new_ref(&self) -> *mut ffi::AVBufferRef {
        unsafe { ffi::av_buffer_ref(self.ptr) }
    }
}

impl Drop for HwDeviceContext {
    fn drop(&mut self) {
        unsafe { ffi::av_buffer_unref(&mut self.ptr) };
    }
}

/// The result of a successful hardware-acceleration probe: an owned device
/// context plus the pixel format the decoder will emit for hardware frames.
pub struct HwAccel {
    pub device_ctx: HwDeviceContext,
    pub hw_pixel_format: ffi::AVPixelFormat,
}

/// Walk every hardware device type this FFmpeg build knows about, and for
/// each one check whether `codec` advertises a config that uses it via
/// `AV_CODEC_HW_CONFIG_METHOD_HW_DEVICE_CTX`. Returns the first match.
pub fn probe(codec: *const ffi::AVCodec) -> Option<HwAccel> {
    let mut device_type = ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_NONE;
    loop {
        device_type = unsafe { ffi::av_hwdevice_iterate_types(device_type) };
        if device_type == ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_NONE {
            return None;
        }

        if let Some(hw_pixel_format) = matching_hw_config(codec, device_type) {
            match HwDeviceContext::create(device_type) {
                Some(device_ctx) => {
                    tracing::info!(?device_type, "hardware-acceleration device created");
                    return Some(HwAccel { device_ctx, hw_pixel_format });
                }
                None => {
                    tracing::debug!(?device_type, "hardware device context creation failed, trying next");
                    continue;
                }
            }
        }
    }
}

fn matching_hw_config(
    codec: *const ffi::AVCodec,
    device_type: ffi::AVHWDeviceType,
) -> Option<ffi::AVPixelFormat> {
    let mut idx = 0;
    loop {
        let config = unsafe { ffi::avcodec_get_hw_config(codec, idx) };
        if config.is_null() {
            return None;
        }
        let config = unsafe { &*config };
        let supports_device_ctx =
            (config.methods as u32 & ffi::AV_CODEC_HW_CONFIG_METHOD_HW_DEVICE_CTX as u32) != 0;
        if config.device_type == device_type && supports_device_ctx {
            return Some(config.pix_fmt);
        }
        idx += 1;
    }
}
