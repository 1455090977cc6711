//! End-to-end tests against the in-process sum/difference server

use std::time::{Duration, Instant};

use triton_client::testing::{ServerBehavior, TestServer, GESTURE_MODEL, SIMPLE_MODEL};
use triton_client::{
    ClientError, ClientOptions, DataType, InferInput, InferOptions, InferRequestedOutput,
    InferenceServerClient,
};

fn simple_inputs() -> (Vec<i32>, Vec<i32>, Vec<InferInput>) {
    let input0: Vec<i32> = (0..16).collect();
    let input1 = vec![1i32; 16];

    let mut in0 = InferInput::new("INPUT0", &[1, 16], DataType::Int32);
    in0.set_data(&input0).unwrap();
    let mut in1 = InferInput::new("INPUT1", &[1, 16], DataType::Int32);
    in1.set_data(&input1).unwrap();

    (input0, input1, vec![in0, in1])
}

async fn connect(server: &TestServer) -> InferenceServerClient {
    InferenceServerClient::connect(&server.url(), &ClientOptions::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sum_and_difference_with_explicit_outputs() {
    let server = TestServer::spawn(ServerBehavior::default()).await.unwrap();
    let client = connect(&server).await;
    let (input0, input1, inputs) = simple_inputs();

    let outputs = [
        InferRequestedOutput::new("OUTPUT0"),
        InferRequestedOutput::new("OUTPUT1"),
    ];
    let result = client
        .infer(SIMPLE_MODEL, &inputs, Some(&outputs[..]), &InferOptions::default())
        .await
        .unwrap();

    let output0 = result.as_vec::<i32>("OUTPUT0").unwrap();
    let output1 = result.as_vec::<i32>("OUTPUT1").unwrap();
    for i in 0..16 {
        assert_eq!(output0[i], input0[i] + input1[i]);
        assert_eq!(output1[i], input0[i] - input1[i]);
    }
}

#[tokio::test]
async fn test_server_default_outputs() {
    let server = TestServer::spawn(ServerBehavior::default()).await.unwrap();
    let client = connect(&server).await;
    let (_, _, inputs) = simple_inputs();

    let result = client
        .infer(SIMPLE_MODEL, &inputs, None, &InferOptions::default())
        .await
        .unwrap();

    let names: Vec<&str> = result.output_names().collect();
    assert_eq!(names, vec!["OUTPUT0", "OUTPUT1"]);
    assert_eq!(result.shape("OUTPUT1").unwrap(), &[1, 16]);
}

#[tokio::test]
async fn test_single_requested_output() {
    let server = TestServer::spawn(ServerBehavior::default()).await.unwrap();
    let client = connect(&server).await;
    let (_, _, inputs) = simple_inputs();

    let outputs = [InferRequestedOutput::new("OUTPUT1")];
    let result = client
        .infer(SIMPLE_MODEL, &inputs, Some(&outputs[..]), &InferOptions::default())
        .await
        .unwrap();

    assert!(result.output("OUTPUT0").is_none());
    assert_eq!(result.as_vec::<i32>("OUTPUT1").unwrap()[0], -1);
}

#[tokio::test]
async fn test_statistics_for_one_model() {
    let server = TestServer::spawn(ServerBehavior::default()).await.unwrap();
    let client = connect(&server).await;
    let (_, _, inputs) = simple_inputs();
    client
        .infer(SIMPLE_MODEL, &inputs, None, &InferOptions::default())
        .await
        .unwrap();

    let stats = client.get_inference_statistics(SIMPLE_MODEL, "").await.unwrap();
    assert_eq!(stats.model_stats.len(), 1);
    assert_eq!(stats.model_stats[0].inference_count, 1);

    let all = client.get_inference_statistics("", "").await.unwrap();
    assert_eq!(all.model_stats.len(), 2);
}

#[tokio::test]
async fn test_headers_reach_server() {
    let server = TestServer::spawn(ServerBehavior::default()).await.unwrap();
    let client = connect(&server).await;
    let (_, _, inputs) = simple_inputs();

    let options = InferOptions {
        headers: vec![("test".to_string(), "1".to_string())],
        ..Default::default()
    };
    client.infer(SIMPLE_MODEL, &inputs, None, &options).await.unwrap();

    assert_eq!(server.last_headers().get("test").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn test_unknown_model_is_rpc_error() {
    let server = TestServer::spawn(ServerBehavior::default()).await.unwrap();
    let client = connect(&server).await;
    let (_, _, inputs) = simple_inputs();

    let err = client
        .infer("missing", &inputs, None, &InferOptions::default())
        .await
        .unwrap_err();
    match err {
        ClientError::Rpc(status) => assert_eq!(status.code(), tonic::Code::NotFound),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_gesture_model_fixed_shape() {
    let server = TestServer::spawn(ServerBehavior::default()).await.unwrap();
    let client = connect(&server).await;

    let mut input = InferInput::new("input_1", &[3, 160, 160], DataType::Fp32);
    input.set_data(&vec![0.5f32; 3 * 160 * 160]).unwrap();
    let outputs = [InferRequestedOutput::new("activation_18")];

    let result = client
        .infer(GESTURE_MODEL, &[input], Some(&outputs[..]), &InferOptions::default())
        .await
        .unwrap();
    let scores = result.as_vec::<f32>("activation_18").unwrap();
    assert_eq!(scores.len(), 6);
    assert!(scores.iter().all(|s| (*s - 0.5).abs() < 1e-6));
}

#[tokio::test]
async fn test_health_checks() {
    let server = TestServer::spawn(ServerBehavior::default()).await.unwrap();
    let client = connect(&server).await;

    assert!(client.is_server_live().await.unwrap());
    assert!(client.is_server_ready().await.unwrap());
    assert!(client.is_model_ready(SIMPLE_MODEL, "").await.unwrap());
    assert!(!client.is_model_ready("missing", "").await.unwrap());
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_on_connect() {
    // Bind then drop so the port is known to be closed
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let started = Instant::now();
    let options = ClientOptions {
        connect_timeout: Duration::from_secs(2),
        request_timeout: None,
    };
    let err = InferenceServerClient::connect(&addr.to_string(), &options)
        .await
        .unwrap_err();

    assert!(err.is_connection_error());
    assert!(started.elapsed() < Duration::from_secs(5));
}
