//! Face-tracking pan/tilt mount library.
//!
//! Aims a dual-axis servo mount at a detected human face using:
//! - `OpenCV` for camera capture, lens undistortion and Haar-cascade
//!   face detection
//! - Monocular distance estimation and law-of-cosines triangulation to
//!   turn a face box into pan/tilt angles
//! - A rate-limited, low-pass-filtered motion controller speaking the
//!   ServoBlaster line protocol
//!
//! The pipeline runs as four independently-clocked stages (capture,
//! detection, solving, motion control), each on its own thread, handing
//! data forward through single-slot overwrite channels: a slow consumer
//! always sees the latest value, never a backlog.
//!
//! # Examples
//!
//! ## Running the full pipeline
//!
//! ```no_run
//! use pan_tilt_tracker::app::Pipeline;
//! use pan_tilt_tracker::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! config.validate()?;
//!
//! let pipeline = Pipeline::new(&config)?;
//! // ... run until shutdown is requested ...
//! pipeline.stop();
//! pipeline.join()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Solving angles for a face box
//!
//! ```
//! use pan_tilt_tracker::config::{CameraConfig, GeometryConfig};
//! use pan_tilt_tracker::face_detection::FaceBox;
//! use pan_tilt_tracker::triangulation::PositionSolver;
//!
//! let solver = PositionSolver::new(&CameraConfig::default(), &GeometryConfig::default());
//! let angles = solver.solve(FaceBox {
//!     x: 300.0,
//!     y: 190.0,
//!     w: 100.0,
//!     h: 100.0,
//! });
//! println!("pan {:.2}°, tilt {:.2}°", angles.horizontal, angles.vertical);
//! ```

/// Single-slot overwrite channels connecting the pipeline stages
pub mod channel;

/// Stage lifecycle management and worker threads
pub mod stage;

/// Camera capture with lens undistortion
pub mod capture;

/// Haar-cascade face detection and temporal smoothing
pub mod face_detection;

/// First-order low-pass filtering
pub mod filters;

/// Image-space to pan/tilt angle triangulation
pub mod triangulation;

/// Servo motion control and the actuator device protocol
pub mod servo_control;

/// Error types and result handling
pub mod error;

/// Pipeline assembly
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
