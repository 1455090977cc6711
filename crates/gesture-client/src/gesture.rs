//! GestureNet inference on a captured colour frame

use kinect_capture::gesturenet::{BYTES_PER_PIXEL, HEIGHT_IN_PIXELS, WIDTH_IN_PIXELS};
use kinect_capture::{GestureNetFrame, KinectFrame};
use tracing::{info, warn};
use triton_client::{
    DataType, InferInput, InferOptions, InferRequestedOutput, InferenceServerClient,
};

use crate::config::ClientConfig;
use crate::validate::check_statistics;
use crate::RunError;

/// GestureNet input shape, channels first
pub const INPUT_SHAPE: [i64; 3] = [
    BYTES_PER_PIXEL as i64,
    HEIGHT_IN_PIXELS as i64,
    WIDTH_IN_PIXELS as i64,
];

/// Build the `[3, 160, 160]` FP32 input from a colour frame
///
/// Without a frame the tensor is all zeros so the request shape still
/// exercises the server.
pub fn gesture_input(
    name: &str,
    frame: Option<&GestureNetFrame>,
) -> Result<InferInput, RunError> {
    let mut input = InferInput::new(name, &INPUT_SHAPE, DataType::Fp32);
    match frame {
        Some(frame) => {
            input.set_data_from_array(&frame.to_chw_tensor())?;
        }
        None => {
            warn!("No colour frame captured, sending a blank GestureNet input");
            let blank = vec![0f32; INPUT_SHAPE.iter().product::<i64>() as usize];
            input.set_data(&blank)?;
        }
    }
    Ok(input)
}

/// Convert `color`, send it to the gesture model and return its scores
pub async fn run_gesture(
    client: &InferenceServerClient,
    config: &ClientConfig,
    color: Option<&KinectFrame>,
    save_input: bool,
) -> Result<Vec<f32>, RunError> {
    let frame = color.map(GestureNetFrame::from_kinect_frame).transpose()?;
    if let (true, Some(frame), Some(color)) = (save_input, frame.as_ref(), color) {
        frame.save_frame(&config.kinect.image_output_dir, color.sequence)?;
    }

    let input = gesture_input(&config.gesture_input, frame.as_ref())?;
    let outputs = [InferRequestedOutput::new(config.gesture_output.clone())];
    let result = client
        .infer(
            &config.gesture_model,
            &[input],
            Some(&outputs[..]),
            &InferOptions::default(),
        )
        .await?;

    let statistics = client
        .get_inference_statistics(&config.gesture_model, "")
        .await?;
    check_statistics(&statistics)?;

    let scores = result.as_vec::<f32>(&config.gesture_output)?;
    let best = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(class, score)| (class, *score));
    info!(
        "{} {:?} = {:?}",
        config.gesture_output,
        result.shape(&config.gesture_output)?,
        scores
    );
    if let Some((class, score)) = best {
        info!("Top gesture class {} (score {:.3})", class, score);
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinect_capture::{FrameFormat, FrameType};

    #[test]
    fn test_blank_input_has_full_shape() {
        let input = gesture_input("input_1", None).unwrap();
        assert_eq!(input.shape(), &[3, 160, 160]);
        assert_eq!(input.raw_data().unwrap().len(), 3 * 160 * 160 * 4);
    }

    #[test]
    fn test_input_from_frame() {
        let color = KinectFrame {
            frame_type: FrameType::Color,
            width: 1920,
            height: 1080,
            bytes_per_pixel: 4,
            format: FrameFormat::Bgrx,
            sequence: 1,
            timestamp: 0,
            data: [0u8, 0, 255, 0].repeat(1920 * 1080),
        };
        let frame = GestureNetFrame::from_kinect_frame(&color).unwrap();
        let input = gesture_input("input_1", Some(&frame)).unwrap();

        let raw = input.raw_data().unwrap();
        // first element is the red plane
        assert_eq!(&raw[..4], &1.0f32.to_le_bytes());
        // first element of the blue plane
        let blue_start = 2 * 160 * 160 * 4;
        assert_eq!(&raw[blue_start..blue_start + 4], &0.0f32.to_le_bytes());
    }
}
