//! Triton Inference Protocol Bindings
//!
//! Generated from the `inference` package (KServe v2 gRPC protocol as served
//! by Triton). Only the health, inference and statistics RPCs are included.

pub mod inference {
    tonic::include_proto!("inference");
}

pub use inference::grpc_inference_service_client::GrpcInferenceServiceClient;
pub use inference::grpc_inference_service_server::{
    GrpcInferenceService, GrpcInferenceServiceServer,
};
pub use inference::{
    InferParameter, InferStatistics, InferTensorContents, ModelInferRequest, ModelInferResponse,
    ModelStatistics, ModelStatisticsRequest, ModelStatisticsResponse, StatisticDuration,
};
