//! gRPC Client for Triton-compatible Inference Servers
//!
//! Thin async wrapper around the generated `GRPCInferenceService` stub.

use std::time::Duration;

use tonic::metadata::{MetadataKey, MetadataValue};
use tonic::transport::{Channel, Endpoint};
use tonic::Request;
use tracing::{debug, info};
use triton_proto::inference::{ModelReadyRequest, ServerLiveRequest, ServerReadyRequest};
use triton_proto::{
    GrpcInferenceServiceClient, ModelInferRequest, ModelStatisticsRequest,
    ModelStatisticsResponse,
};

use crate::input::{InferInput, InferRequestedOutput};
use crate::result::InferResult;
use crate::ClientError;

/// Default time allowed for establishing the channel
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Connection options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout for establishing the channel
    pub connect_timeout: Duration,
    /// Per-request deadline, none by default
    pub request_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            request_timeout: None,
        }
    }
}

/// Per-call options for `infer`
#[derive(Debug, Clone, Default)]
pub struct InferOptions {
    /// Model version, empty selects the server's policy
    pub model_version: String,
    /// Request identifier echoed back by the server
    pub request_id: String,
    /// Extra headers sent as gRPC metadata
    pub headers: Vec<(String, String)>,
}

/// Client for one inference endpoint
#[derive(Debug, Clone)]
pub struct InferenceServerClient {
    inner: GrpcInferenceServiceClient<Channel>,
    url: String,
}

impl InferenceServerClient {
    /// Connect to `url` (`host:port`, scheme optional)
    ///
    /// The channel is established eagerly so an unreachable endpoint fails
    /// here rather than on the first call.
    pub async fn connect(url: &str, options: &ClientOptions) -> Result<Self, ClientError> {
        let endpoint_url = if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };

        let mut endpoint =
            Endpoint::from_shared(endpoint_url).map_err(|e| ClientError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        endpoint = endpoint.connect_timeout(options.connect_timeout);
        if let Some(timeout) = options.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }

        info!("Connecting to inference server at {}", url);
        let channel = endpoint
            .connect()
            .await
            .map_err(|source| ClientError::Connect {
                url: url.to_string(),
                source,
            })?;

        Ok(Self {
            inner: GrpcInferenceServiceClient::new(channel),
            url: url.to_string(),
        })
    }

    /// Endpoint this client talks to
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn is_server_live(&self) -> Result<bool, ClientError> {
        let response = self.inner.clone().server_live(ServerLiveRequest {}).await?;
        Ok(response.into_inner().live)
    }

    pub async fn is_server_ready(&self) -> Result<bool, ClientError> {
        let response = self
            .inner
            .clone()
            .server_ready(ServerReadyRequest {})
            .await?;
        Ok(response.into_inner().ready)
    }

    pub async fn is_model_ready(
        &self,
        model_name: &str,
        version: &str,
    ) -> Result<bool, ClientError> {
        let response = self
            .inner
            .clone()
            .model_ready(ModelReadyRequest {
                name: model_name.to_string(),
                version: version.to_string(),
            })
            .await?;
        Ok(response.into_inner().ready)
    }

    /// Run inference on `model_name`
    ///
    /// `outputs == None` lets the server return every output of the model.
    pub async fn infer(
        &self,
        model_name: &str,
        inputs: &[InferInput],
        outputs: Option<&[InferRequestedOutput]>,
        options: &InferOptions,
    ) -> Result<InferResult, ClientError> {
        let mut tensors = Vec::with_capacity(inputs.len());
        let mut raw_input_contents = Vec::with_capacity(inputs.len());
        for input in inputs {
            let (tensor, raw) = input.to_proto()?;
            tensors.push(tensor);
            raw_input_contents.push(raw);
        }

        let message = ModelInferRequest {
            model_name: model_name.to_string(),
            model_version: options.model_version.clone(),
            id: options.request_id.clone(),
            inputs: tensors,
            outputs: outputs
                .unwrap_or_default()
                .iter()
                .map(InferRequestedOutput::to_proto)
                .collect(),
            raw_input_contents,
            ..Default::default()
        };

        let mut request = Request::new(message);
        for (key, value) in &options.headers {
            let key = MetadataKey::from_bytes(key.to_ascii_lowercase().as_bytes())
                .map_err(|_| ClientError::InvalidHeader(key.clone()))?;
            let value = MetadataValue::try_from(value.as_str())
                .map_err(|_| ClientError::InvalidHeader(value.clone()))?;
            request.metadata_mut().insert(key, value);
        }

        debug!(
            "Inferring {} with {} input(s), {} requested output(s)",
            model_name,
            inputs.len(),
            outputs.map(|o| o.len()).unwrap_or(0)
        );
        let response = self.inner.clone().model_infer(request).await?;
        Ok(InferResult::new(response.into_inner()))
    }

    /// Aggregate usage counters; an empty `model_name` asks for every model
    pub async fn get_inference_statistics(
        &self,
        model_name: &str,
        version: &str,
    ) -> Result<ModelStatisticsResponse, ClientError> {
        let response = self
            .inner
            .clone()
            .model_statistics(ModelStatisticsRequest {
                name: model_name.to_string(),
                version: version.to_string(),
            })
            .await?;
        Ok(response.into_inner())
    }
}
