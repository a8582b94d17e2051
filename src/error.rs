//! Error types for the pan/tilt tracker.

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Camera could not be opened or stopped delivering frames
    #[error("Camera error: {0}")]
    Camera(String),

    /// Cascade classifier could not be loaded
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Actuator device could not be opened or written
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Stage lifecycle fault (bad transition, failed spawn)
    #[error("Stage error: {0}")]
    Stage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
