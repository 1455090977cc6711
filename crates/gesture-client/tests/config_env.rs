//! Environment layer of the client configuration
//!
//! Kept in its own test binary: environment variables are process-wide.

use std::io::Write;

use gesture_client::ClientConfig;

#[test]
fn test_environment_overrides_file_and_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "url = \"triton:9001\"\ncapture_duration_ms = 250\n\n[kinect]\nframe_timeout_ms = 1000"
    )
    .unwrap();

    std::env::set_var("KINECT_TRITON_URL", "envhost:9");
    std::env::set_var("KINECT_TRITON_KINECT__FRAME_TIMEOUT_MS", "42");
    let config = ClientConfig::load(Some(file.path()));
    std::env::remove_var("KINECT_TRITON_URL");
    std::env::remove_var("KINECT_TRITON_KINECT__FRAME_TIMEOUT_MS");

    let config = config.unwrap();
    assert_eq!(config.url, "envhost:9");
    assert_eq!(config.kinect.frame_timeout_ms, 42);
    // file layer still applies where the environment is silent
    assert_eq!(config.capture_duration_ms, 250);
    // defaults fill the rest
    assert_eq!(config.model_name, "simple");
    assert_eq!(config.kinect.image_output_dir, std::path::PathBuf::from("kinect-frames"));
}
