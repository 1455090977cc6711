use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ClientConfig;

#[derive(Parser, Debug)]
#[command(
    name = "kinect-triton-client",
    version,
    about = "Records a Kinect session and checks inference results from a Triton server"
)]
pub struct Cli {
    /// triton-server URL. Default is localhost:8001.
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log: Option<String>,

    /// Recording length in milliseconds
    #[arg(long)]
    pub capture_ms: Option<u64>,

    /// Directory captured frames are written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Record, then validate sum/difference outputs of a paired model
    Check {
        /// Model to validate
        #[arg(long)]
        model: Option<String>,
    },
    /// Record, then classify the last colour frame with GestureNet
    Gesture {
        /// Gesture model name
        #[arg(long)]
        model: Option<String>,

        /// Also write the converted 160x160 input frame
        #[arg(long)]
        save_input: bool,
    },
    /// Save frame sets to disk
    Record {
        /// Number of frame sets
        #[arg(short = 'n', long, default_value_t = 10)]
        frames: u32,
    },
}

impl Cli {
    /// Subcommand to run; `check` when none was given
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Check { model: None })
    }

    /// Overlay command-line flags on a loaded configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(log) = &self.log {
            config.log_level = log.clone();
        }
        if let Some(ms) = self.capture_ms {
            config.capture_duration_ms = ms;
        }
        if let Some(dir) = &self.output_dir {
            config.kinect.image_output_dir = dir.clone();
        }
        match &self.command {
            Some(Command::Check { model: Some(model) }) => config.model_name = model.clone(),
            Some(Command::Gesture {
                model: Some(model), ..
            }) => config.gesture_model = model.clone(),
            _ => {}
        }
    }
}
