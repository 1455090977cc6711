//! FFI bindings for the C++ libfreenect2 shim

use std::ffi::CStr;
use std::time::Duration;

use libc::{c_char, c_int, size_t};
use tracing::{info, warn};

use crate::device::{CaptureDevice, FrameSet};
use crate::frame::{FrameFormat, FrameType, KinectFrame};
use crate::{CaptureError, InputPipeline, KinectConfig};

/// C frame view (matches kinect_shim.h); valid until `kinect_release_frames`
#[repr(C)]
pub struct CFrame {
    pub data: *const u8,
    pub width: size_t,
    pub height: size_t,
    pub bytes_per_pixel: size_t,
    pub format: c_int,
    pub sequence: u32,
    pub timestamp: u32,
}

#[repr(C)]
pub struct CFrameSet {
    pub color: CFrame,
    pub ir: CFrame,
    pub depth: CFrame,
}

/// C pipeline enum
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum CPipeline {
    Cpu = 0,
    OpenGl = 1,
    Cuda = 2,
}

const WAIT_OK: c_int = 0;
const WAIT_TIMEOUT: c_int = 1;

extern "C" {
    fn kinect_open(pipeline: CPipeline, gpu_device_id: c_int) -> c_int;
    fn kinect_start() -> c_int;
    fn kinect_stop();
    fn kinect_close();
    fn kinect_wait_for_frames(timeout_ms: c_int, out: *mut CFrameSet) -> c_int;
    fn kinect_release_frames();
    fn kinect_serial_number() -> *const c_char;
    fn kinect_last_error() -> *const c_char;
}

fn last_error() -> String {
    unsafe {
        let ptr = kinect_last_error();
        if ptr.is_null() {
            "unknown error".to_string()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

/// Copy a C frame into an owned frame
///
/// # Safety
/// `frame.data` must point at `width * height * bytes_per_pixel` bytes.
unsafe fn copy_frame(frame_type: FrameType, frame: &CFrame) -> KinectFrame {
    let len = frame.width * frame.height * frame.bytes_per_pixel;
    let data = if frame.data.is_null() {
        Vec::new()
    } else {
        std::slice::from_raw_parts(frame.data, len).to_vec()
    };
    KinectFrame {
        frame_type,
        width: frame.width as u32,
        height: frame.height as u32,
        bytes_per_pixel: frame.bytes_per_pixel as u32,
        format: FrameFormat::from_raw(frame.format),
        sequence: frame.sequence,
        timestamp: frame.timestamp,
        data,
    }
}

/// Kinect v2 opened through libfreenect2
pub struct Freenect2Device {
    serial: String,
    streaming: bool,
}

impl Freenect2Device {
    /// Open the default device with the configured pipeline
    pub fn open(config: &KinectConfig) -> Result<Self, CaptureError> {
        let pipeline = match config.pipeline {
            InputPipeline::Cpu => CPipeline::Cpu,
            InputPipeline::OpenGl => CPipeline::OpenGl,
            InputPipeline::Cuda => CPipeline::Cuda,
            InputPipeline::Other => return Err(CaptureError::UnsupportedPipeline(config.pipeline)),
        };

        let ret = unsafe { kinect_open(pipeline, config.gpu_device_id) };
        match ret {
            0 => {}
            1 => return Err(CaptureError::NoDevice),
            _ => return Err(CaptureError::Open(last_error())),
        }

        let serial = unsafe {
            let ptr = kinect_serial_number();
            if ptr.is_null() {
                String::new()
            } else {
                CStr::from_ptr(ptr).to_string_lossy().into_owned()
            }
        };
        info!("Opened Kinect {} ({} pipeline)", serial, config.pipeline);

        Ok(Self {
            serial,
            streaming: false,
        })
    }
}

impl CaptureDevice for Freenect2Device {
    fn serial_number(&self) -> &str {
        &self.serial
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let ret = unsafe { kinect_start() };
        if ret != 0 {
            return Err(CaptureError::Stream(last_error()));
        }
        self.streaming = true;
        Ok(())
    }

    fn wait_for_frames(&mut self, timeout: Duration) -> Result<FrameSet, CaptureError> {
        if !self.streaming {
            return Err(CaptureError::NotStarted);
        }

        let timeout_ms = timeout.as_millis().min(c_int::MAX as u128) as c_int;
        let mut set = std::mem::MaybeUninit::<CFrameSet>::uninit();
        let ret = unsafe { kinect_wait_for_frames(timeout_ms, set.as_mut_ptr()) };
        match ret {
            WAIT_OK => {}
            WAIT_TIMEOUT => return Err(CaptureError::Timeout(timeout_ms as u64)),
            _ => return Err(CaptureError::Stream(last_error())),
        }

        let frames = unsafe {
            let set = set.assume_init();
            let frames = FrameSet {
                color: copy_frame(FrameType::Color, &set.color),
                ir: copy_frame(FrameType::Ir, &set.ir),
                depth: copy_frame(FrameType::Depth, &set.depth),
            };
            kinect_release_frames();
            frames
        };
        Ok(frames)
    }

    fn stop(&mut self) {
        if self.streaming {
            unsafe { kinect_stop() };
            self.streaming = false;
        }
    }
}

impl Drop for Freenect2Device {
    fn drop(&mut self) {
        if self.streaming {
            warn!("Kinect dropped while streaming");
            self.stop();
        }
        unsafe { kinect_close() };
    }
}
