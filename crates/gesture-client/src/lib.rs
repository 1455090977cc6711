//! Kinect → Triton Client
//!
//! Connects to an inference server, records a short Kinect session and
//! checks what the server returns:
//! - `check`: sum/difference outputs of a paired model
//! - `gesture`: GestureNet scores for the last colour frame
//! - `record`: frame sets written to disk, no server involved

pub mod cli;
pub mod config;
pub mod gesture;
pub mod validate;

pub use cli::{Cli, Command};
pub use config::ClientConfig;
pub use validate::ValidationError;

use kinect_capture::{CaptureDevice, CaptureError, Kinect, SimulatedKinect};
use thiserror::Error;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use triton_client::{ClientError, InferenceServerClient};

/// Exit code for a validation failure or any error after connecting
pub const EXIT_FAILURE: u8 = 1;
/// Exit code when the inference server cannot be reached; kept apart from
/// [`EXIT_FAILURE`] so callers can tell an unreachable server from a failed
/// validation
pub const EXIT_CONNECTION: u8 = 2;

/// Terminal failure of a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Connection(ClientError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Connection(_) => EXIT_CONNECTION,
            _ => EXIT_FAILURE,
        }
    }
}

/// Initialize logging
pub fn init_logging(level: &str, json: bool) {
    let level: Level = level.parse().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if result.is_err() {
        eprintln!("Tracing subscriber already set");
    }
}

#[cfg(feature = "freenect2")]
fn open_hardware(config: &ClientConfig) -> Result<Box<dyn CaptureDevice>, CaptureError> {
    let device = kinect_capture::ffi::Freenect2Device::open(&config.kinect)?;
    Ok(Box::new(device))
}

#[cfg(not(feature = "freenect2"))]
fn open_hardware(_config: &ClientConfig) -> Result<Box<dyn CaptureDevice>, CaptureError> {
    Err(CaptureError::Open(
        "built without libfreenect2 support; set simulate = true".to_string(),
    ))
}

/// Open the configured sensor
pub fn open_device(config: &ClientConfig) -> Result<Box<dyn CaptureDevice>, CaptureError> {
    if !config.simulate {
        return open_hardware(config);
    }
    info!("Using simulated Kinect");
    Ok(Box::new(SimulatedKinect::new()))
}

/// Start recording, wait for the configured duration, stop
///
/// Stopping joins the recorder thread, which can wait up to one frame
/// timeout, so it runs on the blocking pool.
pub async fn capture_session(
    mut kinect: Kinect,
    config: &ClientConfig,
) -> Result<Kinect, RunError> {
    info!("Starting recording");
    kinect.start_recording();
    tokio::time::sleep(config.capture_duration()).await;

    let kinect = tokio::task::spawn_blocking(move || {
        kinect.stop_recording();
        kinect
    })
    .await
    .map_err(|e| CaptureError::Stream(format!("recorder stop task failed: {}", e)))?;
    info!("Stopped recording ({} frame sets)", kinect.frames_recorded());
    Ok(kinect)
}

/// Connect eagerly; failure here is terminal before any inference call
pub async fn connect(config: &ClientConfig) -> Result<InferenceServerClient, RunError> {
    InferenceServerClient::connect(&config.url, &config.client_options())
        .await
        .map_err(RunError::Connection)
}

/// Execute one command end to end
pub async fn run(command: &Command, config: &ClientConfig) -> Result<(), RunError> {
    match command {
        Command::Record { frames } => {
            let mut kinect = Kinect::new(config.kinect.clone(), open_device(config)?)?;
            let saved = kinect.save_frames(*frames)?;
            info!("Saved {} frames", saved);
            Ok(())
        }
        Command::Check { .. } => {
            let client = connect(config).await?;
            let kinect = Kinect::new(config.kinect.clone(), open_device(config)?)?;
            capture_session(kinect, config).await?;
            validate::run_check(&client, &config.model_name).await
        }
        Command::Gesture { save_input, .. } => {
            let client = connect(config).await?;
            let kinect = Kinect::new(config.kinect.clone(), open_device(config)?)?;
            let kinect = capture_session(kinect, config).await?;
            let color = kinect.latest_color_frame();
            gesture::run_gesture(&client, config, color.as_ref(), *save_input).await?;
            Ok(())
        }
    }
}
