//! Kinect frame types and disk output

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::CaptureError;

/// Stream a frame came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Color,
    Ir,
    Depth,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameType::Color => "Color",
            FrameType::Ir => "Infrared",
            FrameType::Depth => "Depth",
        };
        f.write_str(name)
    }
}

/// Pixel layout of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Invalid,
    Raw,
    /// 4-byte float per pixel (IR and depth)
    Float,
    Bgrx,
    Rgbx,
    Gray,
}

impl FrameFormat {
    /// Map the libfreenect2 `Frame::Format` value
    pub fn from_raw(value: i32) -> Self {
        match value {
            1 => FrameFormat::Raw,
            2 => FrameFormat::Float,
            4 => FrameFormat::Bgrx,
            5 => FrameFormat::Rgbx,
            6 => FrameFormat::Gray,
            _ => FrameFormat::Invalid,
        }
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameFormat::Invalid => "Invalid",
            FrameFormat::Raw => "Raw",
            FrameFormat::Float => "Float",
            FrameFormat::Bgrx => "BGRX",
            FrameFormat::Rgbx => "RGBX",
            FrameFormat::Gray => "Gray",
        };
        f.write_str(name)
    }
}

/// One captured frame, owned
#[derive(Debug, Clone)]
pub struct KinectFrame {
    pub frame_type: FrameType,
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    pub format: FrameFormat,
    /// Device sequence number
    pub sequence: u32,
    /// Device timestamp (0.125ms units on Kinect v2)
    pub timestamp: u32,
    pub data: Vec<u8>,
}

impl KinectFrame {
    /// Bytes covered by width, height and pixel size
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_pixel as usize
    }

    /// `Color-1920x1080-BGRX-seq12.bin`
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}x{}-{}-seq{}.bin",
            self.frame_type, self.width, self.height, self.format, self.sequence
        )
    }

    /// Write the raw pixel bytes under `output_dir`
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf, CaptureError> {
        let len = self.byte_len();
        if self.data.len() < len {
            return Err(CaptureError::Stream(format!(
                "{} frame holds {} bytes, expected {}",
                self.frame_type,
                self.data.len(),
                len
            )));
        }

        let file_path = output_dir.join(self.file_name());
        info!("Saving frame to {}", file_path.display());
        std::fs::write(&file_path, &self.data[..len]).map_err(|source| CaptureError::Io {
            path: file_path.clone(),
            source,
        })?;
        Ok(file_path)
    }
}
