//! Sum/difference validation run
//!
//! Sends `INPUT0` = 0..15 and `INPUT1` = ones to a paired model and expects
//! `OUTPUT0 = INPUT0 + INPUT1` and `OUTPUT1 = INPUT0 - INPUT1`.

use thiserror::Error;
use tracing::info;
use triton_client::{
    summarize, ClientError, DataType, InferInput, InferOptions, InferRequestedOutput,
    InferResult, InferenceServerClient, ModelStatisticsResponse,
};

use crate::RunError;

const ELEMENTS: usize = 16;

/// Server answered, but not with what was expected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("FAILED: Inference Statistics (expected 1 model, got {0})")]
    StatisticsCount(usize),

    #[error("sync infer error: incorrect sum at {index}: {lhs} + {rhs} != {actual}")]
    IncorrectSum {
        index: usize,
        lhs: i32,
        rhs: i32,
        actual: i32,
    },

    #[error("sync infer error: incorrect difference at {index}: {lhs} - {rhs} != {actual}")]
    IncorrectDifference {
        index: usize,
        lhs: i32,
        rhs: i32,
        actual: i32,
    },

    #[error("output holds {actual} elements, expected {expected}")]
    Length { expected: usize, actual: usize },
}

/// Inputs for the paired model, plus the raw values for checking
pub fn sum_difference_inputs() -> Result<(Vec<i32>, Vec<i32>, Vec<InferInput>), ClientError> {
    let input0: Vec<i32> = (0..ELEMENTS as i32).collect();
    let input1 = vec![1i32; ELEMENTS];
    let shape = [1, ELEMENTS as i64];

    let mut in0 = InferInput::new("INPUT0", &shape, DataType::Int32);
    in0.set_data(&input0)?;
    let mut in1 = InferInput::new("INPUT1", &shape, DataType::Int32);
    in1.set_data(&input1)?;

    Ok((input0, input1, vec![in0, in1]))
}

/// Exactly one entry is expected for a single queried model
pub fn check_statistics(statistics: &ModelStatisticsResponse) -> Result<(), ValidationError> {
    for summary in summarize(statistics) {
        match serde_json::to_string(&summary) {
            Ok(json) => info!("Model statistics: {}", json),
            Err(_) => info!("Model statistics: {:?}", summary),
        }
    }

    match statistics.model_stats.len() {
        1 => Ok(()),
        n => Err(ValidationError::StatisticsCount(n)),
    }
}

/// Element-wise comparison against the hand-computed expectation
pub fn check_sum_difference(
    input0: &[i32],
    input1: &[i32],
    output0: &[i32],
    output1: &[i32],
) -> Result<(), ValidationError> {
    for output in [output0, output1] {
        if output.len() != input0.len() {
            return Err(ValidationError::Length {
                expected: input0.len(),
                actual: output.len(),
            });
        }
    }

    for (index, (&lhs, &rhs)) in input0.iter().zip(input1).enumerate() {
        info!("{} + {} = {}", lhs, rhs, output0[index]);
        info!("{} - {} = {}", lhs, rhs, output1[index]);
        if lhs.wrapping_add(rhs) != output0[index] {
            return Err(ValidationError::IncorrectSum {
                index,
                lhs,
                rhs,
                actual: output0[index],
            });
        }
        if lhs.wrapping_sub(rhs) != output1[index] {
            return Err(ValidationError::IncorrectDifference {
                index,
                lhs,
                rhs,
                actual: output1[index],
            });
        }
    }
    Ok(())
}

fn check_result(input0: &[i32], input1: &[i32], result: &InferResult) -> Result<(), RunError> {
    // Both outputs are read right after the call that produced them
    let output0 = result.as_vec::<i32>("OUTPUT0")?;
    let output1 = result.as_vec::<i32>("OUTPUT1")?;
    check_sum_difference(input0, input1, &output0, &output1)?;
    Ok(())
}

/// Run the paired-model check: explicit outputs, statistics, server default
pub async fn run_check(client: &InferenceServerClient, model_name: &str) -> Result<(), RunError> {
    let (input0, input1, inputs) = sum_difference_inputs()?;

    let outputs = [
        InferRequestedOutput::new("OUTPUT0"),
        InferRequestedOutput::new("OUTPUT1"),
    ];
    let options = InferOptions {
        headers: vec![("test".to_string(), "1".to_string())],
        ..Default::default()
    };
    let result = client
        .infer(model_name, &inputs, Some(&outputs[..]), &options)
        .await?;

    let statistics = client.get_inference_statistics(model_name, "").await?;
    check_statistics(&statistics)?;

    check_result(&input0, &input1, &result)?;

    let result = client
        .infer(model_name, &inputs, None, &InferOptions::default())
        .await?;
    check_result(&input0, &input1, &result)?;

    info!("PASS: infer");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use triton_client::ModelStatistics;

    #[test]
    fn test_expected_values_pass() {
        let (input0, input1, inputs) = sum_difference_inputs().unwrap();
        assert_eq!(inputs.len(), 2);
        let sum: Vec<i32> = input0.iter().zip(&input1).map(|(a, b)| a + b).collect();
        let diff: Vec<i32> = input0.iter().zip(&input1).map(|(a, b)| a - b).collect();
        assert_eq!(check_sum_difference(&input0, &input1, &sum, &diff), Ok(()));
    }

    #[test]
    fn test_wrong_difference_is_reported() {
        let (input0, input1, _) = sum_difference_inputs().unwrap();
        let sum: Vec<i32> = input0.iter().zip(&input1).map(|(a, b)| a + b).collect();
        let err = check_sum_difference(&input0, &input1, &sum, &sum).unwrap_err();
        assert_eq!(
            err,
            ValidationError::IncorrectDifference {
                index: 0,
                lhs: 0,
                rhs: 1,
                actual: 1
            }
        );
    }

    #[test]
    fn test_short_output_is_reported() {
        let (input0, input1, _) = sum_difference_inputs().unwrap();
        let err = check_sum_difference(&input0, &input1, &[1, 2], &[]).unwrap_err();
        assert!(matches!(err, ValidationError::Length { expected: 16, actual: 2 }));
    }

    #[test]
    fn test_statistics_count() {
        let one = ModelStatisticsResponse {
            model_stats: vec![ModelStatistics::default()],
        };
        assert!(check_statistics(&one).is_ok());

        let two = ModelStatisticsResponse {
            model_stats: vec![ModelStatistics::default(), ModelStatistics::default()],
        };
        assert_eq!(check_statistics(&two), Err(ValidationError::StatisticsCount(2)));

        let none = ModelStatisticsResponse::default();
        assert_eq!(check_statistics(&none), Err(ValidationError::StatisticsCount(0)));
    }
}
