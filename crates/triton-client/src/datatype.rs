//! Tensor datatypes and element encoding

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use triton_proto::InferTensorContents;

use crate::ClientError;

/// Tensor element type, named as on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Fp16,
    Fp32,
    Fp64,
    Bytes,
}

impl DataType {
    /// Wire representation (e.g. "FP32")
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Bool => "BOOL",
            DataType::Uint8 => "UINT8",
            DataType::Uint16 => "UINT16",
            DataType::Uint32 => "UINT32",
            DataType::Uint64 => "UINT64",
            DataType::Int8 => "INT8",
            DataType::Int16 => "INT16",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::Fp16 => "FP16",
            DataType::Fp32 => "FP32",
            DataType::Fp64 => "FP64",
            DataType::Bytes => "BYTES",
        }
    }

    /// Size of one element in bytes, `None` for variable-length BYTES
    pub fn element_size(&self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Uint8 | DataType::Int8 => Some(1),
            DataType::Uint16 | DataType::Int16 | DataType::Fp16 => Some(2),
            DataType::Uint32 | DataType::Int32 | DataType::Fp32 => Some(4),
            DataType::Uint64 | DataType::Int64 | DataType::Fp64 => Some(8),
            DataType::Bytes => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ClientError;

    /// Accepts the wire names as well as model-config style `TYPE_FP32`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("TYPE_").unwrap_or(s);
        let datatype = match name {
            "BOOL" => DataType::Bool,
            "UINT8" => DataType::Uint8,
            "UINT16" => DataType::Uint16,
            "UINT32" => DataType::Uint32,
            "UINT64" => DataType::Uint64,
            "INT8" => DataType::Int8,
            "INT16" => DataType::Int16,
            "INT32" => DataType::Int32,
            "INT64" => DataType::Int64,
            "FP16" => DataType::Fp16,
            "FP32" => DataType::Fp32,
            "FP64" => DataType::Fp64,
            "BYTES" | "STRING" => DataType::Bytes,
            _ => return Err(ClientError::UnknownDatatype(s.to_string())),
        };
        Ok(datatype)
    }
}

/// Fixed-width numeric type that can be carried in a tensor
pub trait TensorElement: Copy + Sized {
    /// Datatype this element maps to
    const DATATYPE: DataType;

    /// Append the little-endian encoding
    fn write_le(&self, out: &mut Vec<u8>);

    /// Decode from exactly `DATATYPE.element_size()` little-endian bytes
    fn read_le(chunk: &[u8]) -> Self;

    /// Pull values out of typed (non-raw) contents
    fn from_contents(contents: &InferTensorContents) -> Vec<Self>;

    /// Store values into typed (non-raw) contents
    fn into_contents(values: &[Self], contents: &mut InferTensorContents);
}

macro_rules! tensor_element {
    ($ty:ty, $datatype:expr, $field:ident, $wire:ty) => {
        impl TensorElement for $ty {
            const DATATYPE: DataType = $datatype;

            fn write_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(chunk: &[u8]) -> Self {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                bytes.copy_from_slice(chunk);
                <$ty>::from_le_bytes(bytes)
            }

            fn from_contents(contents: &InferTensorContents) -> Vec<Self> {
                contents.$field.iter().map(|v| *v as $ty).collect()
            }

            fn into_contents(values: &[Self], contents: &mut InferTensorContents) {
                contents.$field = values.iter().map(|v| *v as $wire).collect();
            }
        }
    };
}

tensor_element!(u8, DataType::Uint8, uint_contents, u32);
tensor_element!(u16, DataType::Uint16, uint_contents, u32);
tensor_element!(u32, DataType::Uint32, uint_contents, u32);
tensor_element!(u64, DataType::Uint64, uint64_contents, u64);
tensor_element!(i8, DataType::Int8, int_contents, i32);
tensor_element!(i16, DataType::Int16, int_contents, i32);
tensor_element!(i32, DataType::Int32, int_contents, i32);
tensor_element!(i64, DataType::Int64, int64_contents, i64);
tensor_element!(f32, DataType::Fp32, fp32_contents, f32);
tensor_element!(f64, DataType::Fp64, fp64_contents, f64);

/// Encode a slice as a raw little-endian payload
pub fn encode_raw<T: TensorElement>(values: &[T]) -> Vec<u8> {
    let size = T::DATATYPE.element_size().unwrap_or(0);
    let mut out = Vec::with_capacity(values.len() * size);
    for value in values {
        value.write_le(&mut out);
    }
    out
}

/// Decode a raw little-endian payload, `None` if it does not split evenly
pub fn decode_raw<T: TensorElement>(raw: &[u8]) -> Option<Vec<T>> {
    let size = T::DATATYPE.element_size()?;
    if raw.len() % size != 0 {
        return None;
    }
    Some(raw.chunks_exact(size).map(T::read_le).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_and_config_names() {
        assert_eq!("FP32".parse::<DataType>().unwrap(), DataType::Fp32);
        assert_eq!("TYPE_FP32".parse::<DataType>().unwrap(), DataType::Fp32);
        assert_eq!("INT32".parse::<DataType>().unwrap(), DataType::Int32);
        assert!("FLOAT".parse::<DataType>().is_err());
    }

    #[test]
    fn test_element_sizes() {
        assert_eq!(DataType::Int32.element_size(), Some(4));
        assert_eq!(DataType::Fp64.element_size(), Some(8));
        assert_eq!(DataType::Bytes.element_size(), None);
    }

    #[test]
    fn test_raw_encoding_is_little_endian() {
        let raw = encode_raw(&[1i32, -1]);
        assert_eq!(raw, vec![1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(decode_raw::<i32>(&raw), Some(vec![1, -1]));
    }

    #[test]
    fn test_decode_rejects_partial_element() {
        assert_eq!(decode_raw::<f32>(&[0, 0, 128]), None);
    }

    #[test]
    fn test_typed_contents() {
        let mut contents = InferTensorContents::default();
        i32::into_contents(&[3, 4, 5], &mut contents);
        assert_eq!(contents.int_contents, vec![3, 4, 5]);
        assert_eq!(i32::from_contents(&contents), vec![3, 4, 5]);
    }
}
