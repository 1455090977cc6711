//! Client Error Types

use thiserror::Error;

use crate::datatype::DataType;

/// Errors raised while talking to an inference server
#[derive(Debug, Error)]
pub enum ClientError {
    /// URL could not be turned into a gRPC endpoint
    #[error("Invalid server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Channel could not be established
    #[error("gRPC channel creation failed for {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tonic::transport::Error,
    },

    /// Server answered with a non-OK status
    #[error("Server returned {}: {}", .0.code(), .0.message())]
    Rpc(#[from] tonic::Status),

    /// Datatype string not recognised
    #[error("Unknown datatype: {0}")]
    UnknownDatatype(String),

    /// Tensor element type does not match the declared datatype
    #[error("Datatype mismatch for {name}: expected {expected}, got {actual}")]
    DatatypeMismatch {
        name: String,
        expected: DataType,
        actual: DataType,
    },

    /// Number of elements does not match the shape
    #[error("Element count mismatch for {name}: shape requires {expected}, got {actual}")]
    ElementCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Shape contains a non-positive dimension
    #[error("Invalid shape for {name}: {shape:?}")]
    InvalidShape { name: String, shape: Vec<i64> },

    /// Input was never given data
    #[error("Input {0} has no data")]
    MissingInputData(String),

    /// Requested output is absent from the response
    #[error("Output {0} not found in response")]
    OutputNotFound(String),

    /// Raw output payload cannot be split into whole elements
    #[error("Output {name} payload of {len} bytes is not a multiple of {element_size}")]
    MisalignedOutput {
        name: String,
        len: usize,
        element_size: usize,
    },

    /// Header name or value is not valid gRPC metadata
    #[error("Invalid request header: {0}")]
    InvalidHeader(String),
}

impl ClientError {
    /// Whether the error happened before any request reached the server
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ClientError::InvalidUrl { .. } | ClientError::Connect { .. })
    }
}
