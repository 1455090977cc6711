//! GestureNet input frames
//!
//! GestureNet expects 160x160 RGB images. Kinect colour frames are
//! 1920x1080 BGRX, so each output pixel averages a block of source pixels:
//! 12 columns wide and 6 or 7 rows tall.

use std::path::{Path, PathBuf};

use image::RgbImage;
use ndarray::Array3;
use tracing::info;

use crate::frame::{FrameFormat, FrameType, KinectFrame};
use crate::CaptureError;

pub const WIDTH_IN_PIXELS: usize = 160;
pub const HEIGHT_IN_PIXELS: usize = 160;
pub const BYTES_PER_PIXEL: usize = 3;

/// Bytes per Kinect colour pixel (B, G, R, unused)
const BGRX_BYTES: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GestureNetPixel {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl GestureNetPixel {
    pub fn to_bytes(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Convert one BGRX pixel; the X byte is ignored but must be present
    pub fn from_bgrx(chunk: &[u8]) -> Result<Self, CaptureError> {
        if chunk.len() != BGRX_BYTES {
            return Err(CaptureError::Conversion(format!(
                "Cannot convert chunk of length {} to a GestureNetPixel",
                chunk.len()
            )));
        }
        Ok(Self {
            blue: chunk[0],
            green: chunk[1],
            red: chunk[2],
        })
    }
}

pub type PixelRow = Vec<GestureNetPixel>;

/// 160x160 RGB frame ready for GestureNet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureNetFrame {
    rows: Vec<PixelRow>,
}

/// `[start, end)` of source indices that map onto output index `i`
fn block_bounds(i: usize, source_len: usize, target_len: usize) -> (usize, usize) {
    (i * source_len / target_len, (i + 1) * source_len / target_len)
}

/// Average the BGRX pixels in `rows x cols` of a tightly packed buffer
fn average_block(
    data: &[u8],
    row_stride: usize,
    rows: (usize, usize),
    cols: (usize, usize),
) -> Result<GestureNetPixel, CaptureError> {
    let (mut blue_sum, mut green_sum, mut red_sum) = (0u32, 0u32, 0u32);
    for row in rows.0..rows.1 {
        let start = row * row_stride + cols.0 * BGRX_BYTES;
        let end = row * row_stride + cols.1 * BGRX_BYTES;
        for chunk in data[start..end].chunks_exact(BGRX_BYTES) {
            let pixel = GestureNetPixel::from_bgrx(chunk)?;
            blue_sum += pixel.blue as u32;
            green_sum += pixel.green as u32;
            red_sum += pixel.red as u32;
        }
    }
    let count = ((rows.1 - rows.0) * (cols.1 - cols.0)) as u32;
    Ok(GestureNetPixel {
        blue: (blue_sum / count) as u8,
        green: (green_sum / count) as u8,
        red: (red_sum / count) as u8,
    })
}

impl GestureNetFrame {
    /// Build from 160 rows of 160 pixels
    pub fn from_rows(rows: Vec<PixelRow>) -> Result<Self, CaptureError> {
        if rows.len() != HEIGHT_IN_PIXELS || rows.iter().any(|r| r.len() != WIDTH_IN_PIXELS) {
            return Err(CaptureError::Conversion(format!(
                "GestureNet frames are {}x{} pixels",
                WIDTH_IN_PIXELS, HEIGHT_IN_PIXELS
            )));
        }
        Ok(Self { rows })
    }

    /// Downscale one BGRX row to 160 pixels by averaging runs of columns
    pub fn from_kinect_row(data: &[u8]) -> Result<PixelRow, CaptureError> {
        if data.len() % BGRX_BYTES != 0 || data.len() / BGRX_BYTES < WIDTH_IN_PIXELS {
            return Err(CaptureError::Conversion(format!(
                "Row of {} bytes is not at least {} BGRX pixels",
                data.len(),
                WIDTH_IN_PIXELS
            )));
        }
        let row_pixel_count = data.len() / BGRX_BYTES;
        (0..WIDTH_IN_PIXELS)
            .map(|x| {
                let cols = block_bounds(x, row_pixel_count, WIDTH_IN_PIXELS);
                average_block(data, data.len(), (0, 1), cols)
            })
            .collect()
    }

    /// Convert a Kinect colour frame
    pub fn from_kinect_frame(frame: &KinectFrame) -> Result<Self, CaptureError> {
        if frame.frame_type != FrameType::Color {
            return Err(CaptureError::Conversion(format!(
                "Cannot convert frame from {} to GestureNetFrame",
                frame.frame_type
            )));
        }
        if frame.format != FrameFormat::Bgrx || frame.bytes_per_pixel as usize != BGRX_BYTES {
            return Err(CaptureError::Conversion(format!(
                "Expected BGRX colour data, got {}",
                frame.format
            )));
        }

        let width = frame.width as usize;
        let height = frame.height as usize;
        if width < WIDTH_IN_PIXELS
            || height < HEIGHT_IN_PIXELS
            || frame.data.len() < frame.byte_len()
        {
            return Err(CaptureError::Conversion(format!(
                "Colour frame {}x{} is too small",
                width, height
            )));
        }

        let row_stride = width * BGRX_BYTES;
        let rows = (0..HEIGHT_IN_PIXELS)
            .map(|y| {
                let source_rows = block_bounds(y, height, HEIGHT_IN_PIXELS);
                (0..WIDTH_IN_PIXELS)
                    .map(|x| {
                        let source_cols = block_bounds(x, width, WIDTH_IN_PIXELS);
                        average_block(&frame.data, row_stride, source_rows, source_cols)
                    })
                    .collect::<Result<PixelRow, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rows })
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<GestureNetPixel> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Interleaved RGB bytes, row-major
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(WIDTH_IN_PIXELS * HEIGHT_IN_PIXELS * BYTES_PER_PIXEL);
        for row in &self.rows {
            for pixel in row {
                bytes.extend_from_slice(&pixel.to_bytes());
            }
        }
        bytes
    }

    /// Planar `[3, 160, 160]` tensor scaled to `[0, 1]`
    pub fn to_chw_tensor(&self) -> Array3<f32> {
        Array3::from_shape_fn((BYTES_PER_PIXEL, HEIGHT_IN_PIXELS, WIDTH_IN_PIXELS), |(c, y, x)| {
            let pixel = self.rows[y][x].to_bytes();
            pixel[c] as f32 / 255.0
        })
    }

    /// Write `160x160-RGB-seq{N}.bin` plus a PNG preview; returns the .bin path
    pub fn save_frame(&self, output_dir: &Path, sequence: u32) -> Result<PathBuf, CaptureError> {
        let stem = format!("{}x{}-RGB-seq{}", WIDTH_IN_PIXELS, HEIGHT_IN_PIXELS, sequence);
        let file_path = output_dir.join(format!("{}.bin", stem));
        let bytes = self.to_rgb_bytes();

        info!("Saving GestureNet frame to {}", file_path.display());
        std::fs::write(&file_path, &bytes).map_err(|source| CaptureError::Io {
            path: file_path.clone(),
            source,
        })?;

        let preview = RgbImage::from_raw(WIDTH_IN_PIXELS as u32, HEIGHT_IN_PIXELS as u32, bytes)
            .ok_or_else(|| CaptureError::Image("RGB buffer size mismatch".to_string()))?;
        preview
            .save(output_dir.join(format!("{}.png", stem)))
            .map_err(|e| CaptureError::Image(e.to_string()))?;

        Ok(file_path)
    }
}
