//! Triton Inference Client
//!
//! Async gRPC client for servers speaking the KServe v2 / Triton protocol:
//! - Tensor descriptors with shape and datatype checking
//! - Inference with an explicit output list or the server default
//! - Model statistics queries

mod client;
mod datatype;
mod error;
mod input;
mod result;
pub mod statistics;

#[cfg(feature = "test-server")]
pub mod testing;

pub use client::{ClientOptions, InferOptions, InferenceServerClient};
pub use datatype::{decode_raw, encode_raw, DataType, TensorElement};
pub use error::ClientError;
pub use input::{InferInput, InferRequestedOutput};
pub use result::InferResult;
pub use statistics::{summarize, ModelStatsSummary};

pub use triton_proto::{ModelStatistics, ModelStatisticsResponse};
