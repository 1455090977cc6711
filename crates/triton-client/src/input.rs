//! Request-side tensor descriptors

use ndarray::{ArrayBase, Data, Dimension};
use triton_proto::inference::model_infer_request::{InferInputTensor, InferRequestedOutputTensor};

use crate::datatype::{encode_raw, DataType, TensorElement};
use crate::ClientError;

/// Named, shaped, typed input buffer for one inference request
#[derive(Debug, Clone)]
pub struct InferInput {
    name: String,
    shape: Vec<i64>,
    datatype: DataType,
    raw: Option<Vec<u8>>,
}

impl InferInput {
    /// Describe an input slot; data is attached separately
    pub fn new(name: impl Into<String>, shape: &[i64], datatype: DataType) -> Self {
        Self {
            name: name.into(),
            shape: shape.to_vec(),
            datatype,
            raw: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    pub fn datatype(&self) -> DataType {
        self.datatype
    }

    /// Replace the shape; previously attached data is dropped
    pub fn set_shape(&mut self, shape: &[i64]) {
        self.shape = shape.to_vec();
        self.raw = None;
    }

    /// Number of elements the shape describes
    pub fn element_count(&self) -> Result<usize, ClientError> {
        element_count(&self.name, &self.shape)
    }

    /// Attach a flat buffer, checked against datatype and shape
    pub fn set_data<T: TensorElement>(&mut self, data: &[T]) -> Result<&mut Self, ClientError> {
        if T::DATATYPE != self.datatype {
            return Err(ClientError::DatatypeMismatch {
                name: self.name.clone(),
                expected: self.datatype,
                actual: T::DATATYPE,
            });
        }
        let expected = self.element_count()?;
        if data.len() != expected {
            return Err(ClientError::ElementCount {
                name: self.name.clone(),
                expected,
                actual: data.len(),
            });
        }
        self.raw = Some(encode_raw(data));
        Ok(self)
    }

    /// Attach an ndarray; its shape must equal the declared shape
    pub fn set_data_from_array<T, S, D>(
        &mut self,
        array: &ArrayBase<S, D>,
    ) -> Result<&mut Self, ClientError>
    where
        T: TensorElement,
        S: Data<Elem = T>,
        D: Dimension,
    {
        let array_shape: Vec<i64> = array.shape().iter().map(|d| *d as i64).collect();
        if array_shape != self.shape {
            return Err(ClientError::InvalidShape {
                name: self.name.clone(),
                shape: array_shape,
            });
        }
        // Logical (row-major) order regardless of memory layout
        let flat: Vec<T> = array.iter().copied().collect();
        self.set_data(&flat)
    }

    /// Encoded payload, if any
    pub fn raw_data(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }

    pub(crate) fn to_proto(&self) -> Result<(InferInputTensor, Vec<u8>), ClientError> {
        let raw = self
            .raw
            .clone()
            .ok_or_else(|| ClientError::MissingInputData(self.name.clone()))?;
        let tensor = InferInputTensor {
            name: self.name.clone(),
            datatype: self.datatype.as_str().to_string(),
            shape: self.shape.clone(),
            ..Default::default()
        };
        Ok((tensor, raw))
    }
}

/// Output the caller wants back; no list at all means "all outputs"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferRequestedOutput {
    name: String,
}

impl InferRequestedOutput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn to_proto(&self) -> InferRequestedOutputTensor {
        InferRequestedOutputTensor {
            name: self.name.clone(),
            ..Default::default()
        }
    }
}

/// Product of `shape`; zero, negative or overflowing dims are rejected
pub(crate) fn element_count(name: &str, shape: &[i64]) -> Result<usize, ClientError> {
    shape
        .iter()
        .try_fold(1usize, |count, &dim| {
            let dim = usize::try_from(dim).ok().filter(|d| *d > 0)?;
            count.checked_mul(dim)
        })
        .ok_or_else(|| ClientError::InvalidShape {
            name: name.to_string(),
            shape: shape.to_vec(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_set_data_checks_count() {
        let mut input = InferInput::new("INPUT0", &[1, 16], DataType::Int32);
        let data: Vec<i32> = (0..16).collect();
        assert!(input.set_data(&data).is_ok());
        assert_eq!(input.raw_data().map(|r| r.len()), Some(64));

        let err = input.set_data(&data[..15]).unwrap_err();
        assert!(matches!(
            err,
            ClientError::ElementCount { expected: 16, actual: 15, .. }
        ));
    }

    #[test]
    fn test_set_data_checks_datatype() {
        let mut input = InferInput::new("input_1", &[3, 160, 160], DataType::Fp32);
        let err = input.set_data(&[0i32; 3 * 160 * 160]).unwrap_err();
        assert!(matches!(err, ClientError::DatatypeMismatch { .. }));
    }

    #[test]
    fn test_rejects_non_positive_dims() {
        let mut input = InferInput::new("INPUT0", &[1, 0], DataType::Int32);
        assert!(matches!(
            input.set_data::<i32>(&[]),
            Err(ClientError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_overflowing_shape_is_rejected() {
        assert!(matches!(
            element_count("OUTPUT0", &[i64::MAX, 4]),
            Err(ClientError::InvalidShape { .. })
        ));
        assert_eq!(element_count("OUTPUT0", &[1, 16]).unwrap(), 16);
    }

    #[test]
    fn test_set_data_from_array() {
        let array = Array2::from_shape_fn((1, 16), |(_, j)| j as i32);
        let mut input = InferInput::new("INPUT0", &[1, 16], DataType::Int32);
        input.set_data_from_array(&array).unwrap();
        let raw = input.raw_data().unwrap();
        assert_eq!(&raw[4..8], &1i32.to_le_bytes());

        let mut wrong = InferInput::new("INPUT0", &[16, 1], DataType::Int32);
        assert!(wrong.set_data_from_array(&array).is_err());
    }

    #[test]
    fn test_missing_data_is_reported() {
        let input = InferInput::new("INPUT1", &[1, 16], DataType::Int32);
        assert!(matches!(
            input.to_proto(),
            Err(ClientError::MissingInputData(name)) if name == "INPUT1"
        ));
    }

    #[test]
    fn test_set_shape_drops_data() {
        let mut input = InferInput::new("INPUT0", &[2], DataType::Int64);
        input.set_data(&[1i64, 2]).unwrap();
        input.set_shape(&[1, 2]);
        assert!(input.raw_data().is_none());
    }
}
