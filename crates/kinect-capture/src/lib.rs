//! Kinect Capture Library
//!
//! Records colour, infrared and depth frames from a Kinect v2 sensor.
//! Supports:
//! - Start/stop recording on a background thread
//! - Saving raw frames to disk
//! - Converting colour frames to GestureNet input (160x160 RGB)
//!
//! The hardware binding lives behind the `freenect2` feature; a simulated
//! device is always available.

pub mod device;
#[cfg(feature = "freenect2")]
pub mod ffi;
pub mod frame;
pub mod gesturenet;
pub mod recorder;

pub use device::{CaptureDevice, FrameSet, SimulatedKinect};
pub use frame::{FrameFormat, FrameType, KinectFrame};
pub use gesturenet::{GestureNetFrame, GestureNetPixel};
pub use recorder::Kinect;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capture error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open device: {0}")]
    Open(String),

    #[error("No Kinect device connected")]
    NoDevice,

    #[error("Input pipeline {0} is not supported")]
    UnsupportedPipeline(InputPipeline),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Waited {0}ms for a frame")]
    Timeout(u64),

    #[error("Device not started")]
    NotStarted,

    #[error("Recorder is busy")]
    Busy,

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image encoding failed: {0}")]
    Image(String),
}

/// Depth packet processing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputPipeline {
    Cuda,
    OpenGl,
    Cpu,
    Other,
}

impl fmt::Display for InputPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputPipeline::Cuda => "CUDA",
            InputPipeline::OpenGl => "OpenGL",
            InputPipeline::Cpu => "CPU",
            InputPipeline::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Kinect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KinectConfig {
    /// Packet pipeline
    pub pipeline: InputPipeline,
    /// GPU used by the CUDA pipeline
    pub gpu_device_id: i32,
    /// Directory frames are written to
    pub image_output_dir: PathBuf,
    /// How long to wait for a frame set (milliseconds)
    pub frame_timeout_ms: u64,
    /// Write every frame captured while recording
    pub save_recorded_frames: bool,
}

impl Default for KinectConfig {
    fn default() -> Self {
        Self {
            pipeline: InputPipeline::Cpu,
            gpu_device_id: 0,
            image_output_dir: PathBuf::from("kinect-frames"),
            frame_timeout_ms: 10_000,
            save_recorded_frames: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_names() {
        assert_eq!(InputPipeline::OpenGl.to_string(), "OpenGL");
        assert_eq!(
            CaptureError::UnsupportedPipeline(InputPipeline::Other).to_string(),
            "Input pipeline Other is not supported"
        );
    }

    #[test]
    fn test_default_config() {
        let config = KinectConfig::default();
        assert_eq!(config.pipeline, InputPipeline::Cpu);
        assert_eq!(config.frame_timeout_ms, 10_000);
        assert!(!config.save_recorded_frames);
    }
}
