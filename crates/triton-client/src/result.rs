//! Response-side tensor access

use ndarray::{ArrayD, IxDyn};
use triton_proto::inference::model_infer_response::InferOutputTensor;
use triton_proto::ModelInferResponse;

use crate::datatype::{decode_raw, DataType, TensorElement};
use crate::input::element_count;
use crate::ClientError;

/// Outputs of one inference call, retrievable by name
#[derive(Debug, Clone)]
pub struct InferResult {
    response: ModelInferResponse,
}

impl InferResult {
    pub fn new(response: ModelInferResponse) -> Self {
        Self { response }
    }

    pub fn model_name(&self) -> &str {
        &self.response.model_name
    }

    pub fn model_version(&self) -> &str {
        &self.response.model_version
    }

    pub fn id(&self) -> &str {
        &self.response.id
    }

    /// Names of every returned output, in response order
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.response.outputs.iter().map(|o| o.name.as_str())
    }

    /// Raw output descriptor
    pub fn output(&self, name: &str) -> Option<&InferOutputTensor> {
        self.response.outputs.iter().find(|o| o.name == name)
    }

    pub fn shape(&self, name: &str) -> Result<&[i64], ClientError> {
        self.output(name)
            .map(|o| o.shape.as_slice())
            .ok_or_else(|| ClientError::OutputNotFound(name.to_string()))
    }

    pub fn datatype(&self, name: &str) -> Result<DataType, ClientError> {
        let output = self
            .output(name)
            .ok_or_else(|| ClientError::OutputNotFound(name.to_string()))?;
        output.datatype.parse()
    }

    /// Decode an output as a flat vector of `T`
    pub fn as_vec<T: TensorElement>(&self, name: &str) -> Result<Vec<T>, ClientError> {
        let index = self
            .response
            .outputs
            .iter()
            .position(|o| o.name == name)
            .ok_or_else(|| ClientError::OutputNotFound(name.to_string()))?;
        let output = &self.response.outputs[index];

        let datatype: DataType = output.datatype.parse()?;
        if datatype != T::DATATYPE {
            return Err(ClientError::DatatypeMismatch {
                name: name.to_string(),
                expected: datatype,
                actual: T::DATATYPE,
            });
        }

        // raw_output_contents is either empty or has one entry per output
        let values = match self.response.raw_output_contents.get(index) {
            Some(raw) => decode_raw::<T>(raw).ok_or_else(|| ClientError::MisalignedOutput {
                name: name.to_string(),
                len: raw.len(),
                element_size: datatype.element_size().unwrap_or(0),
            })?,
            None => output
                .contents
                .as_ref()
                .map(T::from_contents)
                .unwrap_or_default(),
        };

        let expected = element_count(name, &output.shape)?;
        if values.len() != expected {
            return Err(ClientError::ElementCount {
                name: name.to_string(),
                expected,
                actual: values.len(),
            });
        }
        Ok(values)
    }

    /// Decode an output into an n-dimensional array with its reported shape
    pub fn as_array<T: TensorElement>(&self, name: &str) -> Result<ArrayD<T>, ClientError> {
        let values = self.as_vec::<T>(name)?;
        let shape = self.shape(name)?;
        let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();
        ArrayD::from_shape_vec(IxDyn(&dims), values).map_err(|_| ClientError::InvalidShape {
            name: name.to_string(),
            shape: shape.to_vec(),
        })
    }

    /// Underlying protobuf response
    pub fn get_response(&self) -> &ModelInferResponse {
        &self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::encode_raw;
    use triton_proto::InferTensorContents;

    fn output(name: &str, datatype: &str, shape: &[i64]) -> InferOutputTensor {
        InferOutputTensor {
            name: name.to_string(),
            datatype: datatype.to_string(),
            shape: shape.to_vec(),
            ..Default::default()
        }
    }

    fn sum_difference_response() -> InferResult {
        InferResult::new(ModelInferResponse {
            model_name: "simple".to_string(),
            outputs: vec![
                output("OUTPUT0", "INT32", &[1, 4]),
                output("OUTPUT1", "INT32", &[1, 4]),
            ],
            raw_output_contents: vec![
                encode_raw(&[1i32, 2, 3, 4]),
                encode_raw(&[-1i32, 0, 1, 2]),
            ],
            ..Default::default()
        })
    }

    #[test]
    fn test_outputs_by_name() {
        let result = sum_difference_response();
        assert_eq!(result.as_vec::<i32>("OUTPUT1").unwrap(), vec![-1, 0, 1, 2]);
        assert_eq!(result.as_vec::<i32>("OUTPUT0").unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(result.shape("OUTPUT0").unwrap(), &[1, 4]);
        assert_eq!(
            result.output_names().collect::<Vec<_>>(),
            vec!["OUTPUT0", "OUTPUT1"]
        );
    }

    #[test]
    fn test_missing_output() {
        let result = sum_difference_response();
        assert!(matches!(
            result.as_vec::<i32>("activation_18"),
            Err(ClientError::OutputNotFound(_))
        ));
    }

    #[test]
    fn test_wrong_element_type() {
        let result = sum_difference_response();
        assert!(matches!(
            result.as_vec::<f32>("OUTPUT0"),
            Err(ClientError::DatatypeMismatch { .. })
        ));
    }

    #[test]
    fn test_typed_contents_fallback() {
        let mut tensor = output("activation_18", "FP32", &[1, 2]);
        tensor.contents = Some(InferTensorContents {
            fp32_contents: vec![0.25, 0.75],
            ..Default::default()
        });
        let result = InferResult::new(ModelInferResponse {
            outputs: vec![tensor],
            ..Default::default()
        });
        assert_eq!(result.as_vec::<f32>("activation_18").unwrap(), vec![0.25, 0.75]);
        let array = result.as_array::<f32>("activation_18").unwrap();
        assert_eq!(array.shape(), &[1, 2]);
    }

    #[test]
    fn test_short_payload_is_rejected() {
        let result = InferResult::new(ModelInferResponse {
            outputs: vec![output("OUTPUT0", "INT32", &[1, 4])],
            raw_output_contents: vec![encode_raw(&[1i32, 2])],
            ..Default::default()
        });
        assert!(matches!(
            result.as_vec::<i32>("OUTPUT0"),
            Err(ClientError::ElementCount { expected: 4, actual: 2, .. })
        ));
    }

    #[test]
    fn test_huge_output_shape_is_an_error() {
        let result = InferResult::new(ModelInferResponse {
            outputs: vec![output("OUTPUT0", "INT32", &[i64::MAX, 4])],
            raw_output_contents: vec![encode_raw(&[7i32])],
            ..Default::default()
        });
        assert!(matches!(
            result.as_vec::<i32>("OUTPUT0"),
            Err(ClientError::InvalidShape { .. })
        ));
        assert!(result.as_array::<i32>("OUTPUT0").is_err());
    }
}
