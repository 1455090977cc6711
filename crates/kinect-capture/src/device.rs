//! Capture device abstraction and simulated sensor

use std::time::Duration;

use tracing::{debug, info};

use crate::frame::{FrameFormat, FrameType, KinectFrame};
use crate::CaptureError;

pub const COLOR_WIDTH: u32 = 1920;
pub const COLOR_HEIGHT: u32 = 1080;
pub const DEPTH_WIDTH: u32 = 512;
pub const DEPTH_HEIGHT: u32 = 424;

/// Synchronised colour, IR and depth frames
#[derive(Debug, Clone)]
pub struct FrameSet {
    pub color: KinectFrame,
    pub ir: KinectFrame,
    pub depth: KinectFrame,
}

impl FrameSet {
    pub fn frames(&self) -> [&KinectFrame; 3] {
        [&self.color, &self.ir, &self.depth]
    }

    pub fn into_frames(self) -> [KinectFrame; 3] {
        [self.color, self.ir, self.depth]
    }
}

/// Sensor that can stream frame sets
pub trait CaptureDevice: Send {
    /// Device serial number
    fn serial_number(&self) -> &str;

    /// Begin streaming
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Block until the next frame set or the timeout
    fn wait_for_frames(&mut self, timeout: Duration) -> Result<FrameSet, CaptureError>;

    /// Stop streaming
    fn stop(&mut self);
}

/// Deterministic stand-in for a Kinect v2
///
/// Colour frames are a BGRX gradient shifted by the sequence number; IR and
/// depth frames are float ramps.
pub struct SimulatedKinect {
    serial: String,
    frame_interval: Duration,
    streaming: bool,
    sequence: u32,
}

impl SimulatedKinect {
    /// Simulated device at ~30fps
    pub fn new() -> Self {
        Self {
            serial: "SIMULATED-000000".to_string(),
            frame_interval: Duration::from_millis(33),
            streaming: false,
            sequence: 0,
        }
    }

    /// Override the delay between frame sets
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    fn color_frame(&self) -> KinectFrame {
        let mut data = Vec::with_capacity((COLOR_WIDTH * COLOR_HEIGHT * 4) as usize);
        for y in 0..COLOR_HEIGHT {
            for x in 0..COLOR_WIDTH {
                let blue = ((x + self.sequence) % 256) as u8;
                let green = (y % 256) as u8;
                let red = ((x / 8 + y / 8) % 256) as u8;
                data.extend_from_slice(&[blue, green, red, 0xFF]);
            }
        }
        KinectFrame {
            frame_type: FrameType::Color,
            width: COLOR_WIDTH,
            height: COLOR_HEIGHT,
            bytes_per_pixel: 4,
            format: FrameFormat::Bgrx,
            sequence: self.sequence,
            timestamp: self.sequence.wrapping_mul(267),
            data,
        }
    }

    fn float_frame(&self, frame_type: FrameType, scale: f32) -> KinectFrame {
        let mut data = Vec::with_capacity((DEPTH_WIDTH * DEPTH_HEIGHT * 4) as usize);
        for y in 0..DEPTH_HEIGHT {
            for x in 0..DEPTH_WIDTH {
                let value = (x + y) as f32 * scale;
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        KinectFrame {
            frame_type,
            width: DEPTH_WIDTH,
            height: DEPTH_HEIGHT,
            bytes_per_pixel: 4,
            format: FrameFormat::Float,
            sequence: self.sequence,
            timestamp: self.sequence.wrapping_mul(267),
            data,
        }
    }
}

impl Default for SimulatedKinect {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for SimulatedKinect {
    fn serial_number(&self) -> &str {
        &self.serial
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        info!("Simulated Kinect {} started", self.serial);
        self.streaming = true;
        Ok(())
    }

    fn wait_for_frames(&mut self, timeout: Duration) -> Result<FrameSet, CaptureError> {
        if !self.streaming {
            return Err(CaptureError::NotStarted);
        }
        if self.frame_interval > timeout {
            std::thread::sleep(timeout);
            return Err(CaptureError::Timeout(timeout.as_millis() as u64));
        }
        if !self.frame_interval.is_zero() {
            std::thread::sleep(self.frame_interval);
        }

        self.sequence = self.sequence.wrapping_add(1);
        debug!("Simulated frame set {}", self.sequence);
        Ok(FrameSet {
            color: self.color_frame(),
            ir: self.float_frame(FrameType::Ir, 16.0),
            depth: self.float_frame(FrameType::Depth, 4.5),
        })
    }

    fn stop(&mut self) {
        if self.streaming {
            info!("Simulated Kinect {} stopped", self.serial);
            self.streaming = false;
        }
    }
}
