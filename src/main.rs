//! Face-tracking pan/tilt mount application.

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use pan_tilt_tracker::app::Pipeline;
use pan_tilt_tracker::config::Config;
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long)]
    cam: Option<i32>,

    /// Actuator device file
    #[arg(long)]
    device: Option<PathBuf>,

    /// Haar cascade classifier file
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Disable temporal smoothing of detections
    #[arg(long)]
    no_smoothing: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Pan/Tilt Face Tracker");

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    // Command line overrides
    if let Some(cam) = args.cam {
        config.camera.index = cam;
    }
    if let Some(device) = args.device {
        config.servo.device_path = device;
    }
    if let Some(cascade) = args.cascade {
        config.detection.cascade_path = cascade;
    }
    if args.no_smoothing {
        config.detection.smoothing = false;
    }

    config.validate()?;

    let pipeline = Pipeline::new(&config)?;

    // Run until interrupted
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })?;
    let _ = shutdown_rx.recv();

    info!("Shutdown requested");
    pipeline.stop();
    pipeline.join()?;
    info!("Shutdown complete");

    Ok(())
}
