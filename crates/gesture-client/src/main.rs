//! Kinect Triton Client - Main Entry Point

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use gesture_client::{init_logging, run, Cli, ClientConfig, EXIT_FAILURE};
use tracing::{error, info};

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::load(cli.config.as_deref()).with_context(|| {
        format!(
            "loading configuration{}",
            cli.config
                .as_ref()
                .map(|p| format!(" from {}", p.display()))
                .unwrap_or_default()
        )
    })?;
    cli.apply(&mut config);
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    init_logging(&config.log_level, config.log_json);
    info!("=== Kinect Triton Client v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Inference server: {}", config.url);

    match run(&cli.command(), &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
