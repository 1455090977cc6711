//! In-process inference server for integration tests
//!
//! Serves two models over real gRPC on a loopback port:
//! - `simple`: INT32 `INPUT0`/`INPUT1` → `OUTPUT0` (sum), `OUTPUT1` (difference)
//! - `GestureNet`: FP32 `input_1` [3,160,160] → `activation_18` [1,6]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};
use tracing::debug;
use triton_proto::inference::model_infer_request::InferInputTensor;
use triton_proto::inference::model_infer_response::InferOutputTensor;
use triton_proto::inference::{
    ModelReadyRequest, ModelReadyResponse, ServerLiveRequest, ServerLiveResponse,
    ServerReadyRequest, ServerReadyResponse,
};
use triton_proto::{
    GrpcInferenceService, GrpcInferenceServiceServer, InferStatistics, ModelInferRequest,
    ModelInferResponse, ModelStatistics, ModelStatisticsRequest, ModelStatisticsResponse,
    StatisticDuration,
};

use crate::datatype::{decode_raw, encode_raw, TensorElement};

pub const SIMPLE_MODEL: &str = "simple";
pub const GESTURE_MODEL: &str = "GestureNet";

const GESTURE_CLASSES: usize = 6;

/// Output descriptors paired with their raw little-endian contents
type ModelOutputs = Vec<(InferOutputTensor, Vec<u8>)>;

/// Knobs for provoking client-side failures
#[derive(Debug, Clone)]
pub struct ServerBehavior {
    /// Statistics entries returned per queried model
    pub stats_entries_per_model: usize,
    /// Return a sum where the difference belongs
    pub corrupt_difference: bool,
}

impl Default for ServerBehavior {
    fn default() -> Self {
        Self {
            stats_entries_per_model: 1,
            corrupt_difference: false,
        }
    }
}

#[derive(Debug, Default)]
struct ServerState {
    inference_counts: HashMap<String, u64>,
    last_headers: HashMap<String, String>,
}

struct FixtureService {
    behavior: ServerBehavior,
    state: Arc<Mutex<ServerState>>,
}

/// Running fixture server; shut down on drop
pub struct TestServer {
    addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Bind a loopback port and start serving
    pub async fn spawn(behavior: ServerBehavior) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(ServerState::default()));
        let service = FixtureService {
            behavior,
            state: state.clone(),
        };
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let result = tonic::transport::Server::builder()
                .add_service(GrpcInferenceServiceServer::new(service))
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                debug!("Fixture server exited: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// `host:port` of the fixture
    pub fn url(&self) -> String {
        self.addr.to_string()
    }

    /// Metadata of the most recent inference request
    pub fn last_headers(&self) -> HashMap<String, String> {
        self.state
            .lock()
            .map(|s| s.last_headers.clone())
            .unwrap_or_default()
    }

    /// Successful inferences served for `model`
    pub fn inference_count(&self, model: &str) -> u64 {
        self.state
            .lock()
            .map(|s| s.inference_counts.get(model).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn find_input<'a>(
    request: &'a ModelInferRequest,
    name: &str,
) -> Result<(&'a InferInputTensor, &'a [u8]), Status> {
    let index = request
        .inputs
        .iter()
        .position(|t| t.name == name)
        .ok_or_else(|| Status::invalid_argument(format!("expected input '{}'", name)))?;
    let raw = request
        .raw_input_contents
        .get(index)
        .ok_or_else(|| Status::invalid_argument(format!("input '{}' has no raw contents", name)))?;
    Ok((&request.inputs[index], raw.as_slice()))
}

fn decode_input<T: TensorElement>(
    request: &ModelInferRequest,
    name: &str,
) -> Result<(Vec<i64>, Vec<T>), Status> {
    let (tensor, raw) = find_input(request, name)?;
    if tensor.datatype != T::DATATYPE.as_str() {
        return Err(Status::invalid_argument(format!(
            "input '{}' has datatype {}, expected {}",
            name,
            tensor.datatype,
            T::DATATYPE
        )));
    }
    let values = decode_raw::<T>(raw)
        .ok_or_else(|| Status::invalid_argument(format!("input '{}' is misaligned", name)))?;
    let expected: i64 = tensor.shape.iter().product();
    if values.len() as i64 != expected {
        return Err(Status::invalid_argument(format!(
            "input '{}' holds {} elements, shape needs {}",
            name,
            values.len(),
            expected
        )));
    }
    Ok((tensor.shape.clone(), values))
}

fn output_tensor(name: &str, datatype: &str, shape: Vec<i64>) -> InferOutputTensor {
    InferOutputTensor {
        name: name.to_string(),
        datatype: datatype.to_string(),
        shape,
        ..Default::default()
    }
}

impl FixtureService {
    fn simple(&self, request: &ModelInferRequest) -> Result<ModelOutputs, Status> {
        let (shape0, input0) = decode_input::<i32>(request, "INPUT0")?;
        let (shape1, input1) = decode_input::<i32>(request, "INPUT1")?;
        if shape0 != shape1 {
            return Err(Status::invalid_argument("INPUT0 and INPUT1 shapes differ"));
        }

        let sum: Vec<i32> = input0
            .iter()
            .zip(&input1)
            .map(|(a, b)| a.wrapping_add(*b))
            .collect();
        let difference: Vec<i32> = input0
            .iter()
            .zip(&input1)
            .map(|(a, b)| {
                if self.behavior.corrupt_difference {
                    a.wrapping_add(*b)
                } else {
                    a.wrapping_sub(*b)
                }
            })
            .collect();

        Ok(vec![
            (output_tensor("OUTPUT0", "INT32", shape0.clone()), encode_raw(&sum)),
            (output_tensor("OUTPUT1", "INT32", shape0), encode_raw(&difference)),
        ])
    }

    fn gesture(&self, request: &ModelInferRequest) -> Result<ModelOutputs, Status> {
        let (shape, pixels) = decode_input::<f32>(request, "input_1")?;
        if shape != [3, 160, 160] {
            return Err(Status::invalid_argument(format!(
                "input_1 must be [3,160,160], got {:?}",
                shape
            )));
        }

        let plane = pixels.len() / 3;
        let means: Vec<f32> = pixels
            .chunks(plane)
            .map(|c| c.iter().sum::<f32>() / plane as f32)
            .collect();
        let scores: Vec<f32> = (0..GESTURE_CLASSES).map(|k| means[k % 3]).collect();

        Ok(vec![(
            output_tensor("activation_18", "FP32", vec![1, GESTURE_CLASSES as i64]),
            encode_raw(&scores),
        )])
    }

    fn is_known(model: &str) -> bool {
        model == SIMPLE_MODEL || model == GESTURE_MODEL
    }

    fn stats_for(&self, model: &str, count: u64) -> ModelStatistics {
        ModelStatistics {
            name: model.to_string(),
            version: "1".to_string(),
            inference_count: count,
            execution_count: count,
            inference_stats: Some(InferStatistics {
                success: Some(StatisticDuration { count, ns: count * 1_000 }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[tonic::async_trait]
impl GrpcInferenceService for FixtureService {
    async fn server_live(
        &self,
        _request: Request<ServerLiveRequest>,
    ) -> Result<Response<ServerLiveResponse>, Status> {
        Ok(Response::new(ServerLiveResponse { live: true }))
    }

    async fn server_ready(
        &self,
        _request: Request<ServerReadyRequest>,
    ) -> Result<Response<ServerReadyResponse>, Status> {
        Ok(Response::new(ServerReadyResponse { ready: true }))
    }

    async fn model_ready(
        &self,
        request: Request<ModelReadyRequest>,
    ) -> Result<Response<ModelReadyResponse>, Status> {
        let ready = Self::is_known(&request.into_inner().name);
        Ok(Response::new(ModelReadyResponse { ready }))
    }

    async fn model_infer(
        &self,
        request: Request<ModelInferRequest>,
    ) -> Result<Response<ModelInferResponse>, Status> {
        let headers: HashMap<String, String> = request
            .metadata()
            .iter()
            .filter_map(|entry| match entry {
                tonic::metadata::KeyAndValueRef::Ascii(key, value) => value
                    .to_str()
                    .ok()
                    .map(|v| (key.as_str().to_string(), v.to_string())),
                tonic::metadata::KeyAndValueRef::Binary(_, _) => None,
            })
            .collect();
        let request = request.into_inner();

        let produced = match request.model_name.as_str() {
            SIMPLE_MODEL => self.simple(&request)?,
            GESTURE_MODEL => self.gesture(&request)?,
            other => {
                return Err(Status::not_found(format!(
                    "Request for unknown model: '{}' is not found",
                    other
                )))
            }
        };

        let requested: Vec<&str> = request.outputs.iter().map(|o| o.name.as_str()).collect();
        for name in &requested {
            if !produced.iter().any(|(t, _)| t.name == *name) {
                return Err(Status::invalid_argument(format!(
                    "unexpected inference output '{}' for model '{}'",
                    name, request.model_name
                )));
            }
        }

        let (outputs, raw_output_contents): (Vec<_>, Vec<_>) = produced
            .into_iter()
            .filter(|(t, _)| requested.is_empty() || requested.contains(&t.name.as_str()))
            .unzip();

        if let Ok(mut state) = self.state.lock() {
            *state
                .inference_counts
                .entry(request.model_name.clone())
                .or_insert(0) += 1;
            state.last_headers = headers;
        }

        Ok(Response::new(ModelInferResponse {
            model_name: request.model_name,
            model_version: "1".to_string(),
            id: request.id,
            outputs,
            raw_output_contents,
            ..Default::default()
        }))
    }

    async fn model_statistics(
        &self,
        request: Request<ModelStatisticsRequest>,
    ) -> Result<Response<ModelStatisticsResponse>, Status> {
        let name = request.into_inner().name;
        let counts = self
            .state
            .lock()
            .map(|s| s.inference_counts.clone())
            .unwrap_or_default();
        let count_of = |m: &str| counts.get(m).copied().unwrap_or(0);

        let model_stats = if name.is_empty() {
            [SIMPLE_MODEL, GESTURE_MODEL]
                .iter()
                .map(|m| self.stats_for(m, count_of(m)))
                .collect()
        } else if Self::is_known(&name) {
            (0..self.behavior.stats_entries_per_model)
                .map(|_| self.stats_for(&name, count_of(&name)))
                .collect()
        } else {
            return Err(Status::not_found(format!(
                "requested model '{}' is not available",
                name
            )));
        };

        Ok(Response::new(ModelStatisticsResponse { model_stats }))
    }
}
