//! Configuration management for the pan/tilt tracker

use crate::constants::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera capture and calibration configuration
    pub camera: CameraConfig,

    /// Face detection configuration
    pub detection: DetectionConfig,

    /// Physical geometry used by the position solver
    pub geometry: GeometryConfig,

    /// Servo motion control configuration
    pub servo: ServoConfig,
}

/// Camera capture and lens calibration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Capture device index
    pub index: i32,

    /// Frame width in pixels
    pub frame_width: i32,

    /// Frame height in pixels
    pub frame_height: i32,

    /// Nominal capture rate in frames per second
    pub frame_rate: f64,

    /// Focal length along x in pixels
    pub focal_x: f64,

    /// Focal length along y in pixels
    pub focal_y: f64,

    /// Principal point x in pixels
    pub center_x: f64,

    /// Principal point y in pixels
    pub center_y: f64,

    /// Lens distortion coefficients (k1, k2, p1, p2, k3)
    pub distortion: [f64; 5],
}

/// Face detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Path to the Haar cascade classifier file
    pub cascade_path: PathBuf,

    /// Image pyramid scale factor (must be > 1.0)
    pub scale_factor: f64,

    /// Minimum face size in pixels (square)
    pub min_face_size: i32,

    /// Apply temporal smoothing to detected boxes
    pub smoothing: bool,

    /// Smoothing filter time constant in seconds
    pub smoothing_rc: f64,
}

/// Physical geometry of the camera/actuator rig
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Assumed real face width in millimetres
    pub face_width_mm: f64,

    /// Actuator position relative to the camera in millimetres:
    /// [lateral, depth, vertical]
    pub actuator_offset: [f64; 3],

    /// Horizontal angle trim in degrees
    pub horizontal_trim: f64,

    /// Vertical angle trim in degrees
    pub vertical_trim: f64,
}

/// Servo motion control parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServoConfig {
    /// Path to the actuator device file
    pub device_path: PathBuf,

    /// Controller update rate in Hz
    pub update_rate: f64,

    /// Maximum slew rate in degrees per second
    pub ramp_speed: f64,

    /// Controller output filter time constant in seconds
    pub filter_rc: f64,

    /// Lowest valid PWM value (inclusive)
    pub pwm_min: i32,

    /// Highest valid PWM value (exclusive)
    pub pwm_max: i32,

    /// Angle both axes are driven to at startup, in degrees
    pub start_angle: f64,

    /// Horizontal (pan) axis
    pub horizontal: AxisConfig,

    /// Vertical (tilt) axis
    pub vertical: AxisConfig,
}

/// Per-axis actuator mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Actuator channel number
    pub channel: u8,

    /// Degrees-to-PWM slope
    pub slope: f64,

    /// Degrees-to-PWM intercept
    pub intercept: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            detection: DetectionConfig::default(),
            geometry: GeometryConfig::default(),
            servo: ServoConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            frame_rate: DEFAULT_FRAME_RATE,
            focal_x: DEFAULT_FOCAL_X,
            focal_y: DEFAULT_FOCAL_Y,
            center_x: DEFAULT_CENTER_X,
            center_y: DEFAULT_CENTER_Y,
            distortion: DEFAULT_DISTORTION,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cascade_path: PathBuf::from(DEFAULT_CASCADE_PATH),
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            smoothing: true,
            smoothing_rc: DEFAULT_DETECTION_RC,
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            face_width_mm: DEFAULT_FACE_WIDTH_MM,
            actuator_offset: [0.0, 0.0, 0.0],
            horizontal_trim: 0.0,
            vertical_trim: 0.0,
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_SERVO_DEVICE),
            update_rate: DEFAULT_SERVO_RATE,
            ramp_speed: DEFAULT_RAMP_SPEED,
            filter_rc: DEFAULT_CONTROLLER_RC,
            pwm_min: DEFAULT_PWM_MIN,
            pwm_max: DEFAULT_PWM_MAX,
            start_angle: DEFAULT_START_ANGLE,
            horizontal: AxisConfig {
                channel: DEFAULT_HORIZONTAL_CHANNEL,
                slope: DEFAULT_HORIZONTAL_SLOPE,
                intercept: DEFAULT_HORIZONTAL_INTERCEPT,
            },
            vertical: AxisConfig {
                channel: DEFAULT_VERTICAL_CHANNEL,
                slope: DEFAULT_VERTICAL_SLOPE,
                intercept: DEFAULT_VERTICAL_INTERCEPT,
            },
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Camera geometry
        if self.camera.frame_width <= 0 || self.camera.frame_height <= 0 {
            return Err(Error::ConfigError(
                "Frame dimensions must be greater than 0".to_string(),
            ));
        }
        if self.camera.frame_rate <= 0.0 {
            return Err(Error::ConfigError(
                "Frame rate must be greater than 0".to_string(),
            ));
        }
        if self.camera.focal_x <= 0.0 || self.camera.focal_y <= 0.0 {
            return Err(Error::ConfigError(
                "Focal lengths must be greater than 0".to_string(),
            ));
        }

        // Detection parameters
        if self.detection.cascade_path.as_os_str().is_empty() {
            return Err(Error::ConfigError("Cascade path must not be empty".to_string()));
        }
        if self.detection.scale_factor <= 1.0 {
            return Err(Error::ConfigError(
                "Scale factor must be greater than 1.0".to_string(),
            ));
        }
        if self.detection.min_face_size <= 0 {
            return Err(Error::ConfigError(
                "Minimum face size must be greater than 0".to_string(),
            ));
        }
        if self.detection.smoothing_rc < 0.0 {
            return Err(Error::ConfigError(
                "Smoothing time constant must not be negative".to_string(),
            ));
        }

        // Solver geometry
        if self.geometry.face_width_mm <= 0.0 {
            return Err(Error::ConfigError(
                "Face width must be greater than 0".to_string(),
            ));
        }

        // Servo parameters
        if self.servo.device_path.as_os_str().is_empty() {
            return Err(Error::ConfigError("Device path must not be empty".to_string()));
        }
        if self.servo.update_rate <= 0.0 {
            return Err(Error::ConfigError(
                "Servo update rate must be greater than 0".to_string(),
            ));
        }
        if self.servo.ramp_speed <= 0.0 {
            return Err(Error::ConfigError(
                "Ramp speed must be greater than 0".to_string(),
            ));
        }
        if self.servo.filter_rc < 0.0 {
            return Err(Error::ConfigError(
                "Servo filter time constant must not be negative".to_string(),
            ));
        }
        if self.servo.pwm_min < 0 || self.servo.pwm_min >= self.servo.pwm_max {
            return Err(Error::ConfigError(
                "PWM range must satisfy 0 <= pwm_min < pwm_max".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Pan/Tilt Tracker Configuration

# Camera capture and lens calibration
camera:
  index: 0
  frame_width: 640
  frame_height: 480
  frame_rate: 30.0
  focal_x: 673.9683892
  focal_y: 676.08466459
  center_x: 343.68638231
  center_y: 245.31865398
  distortion: [0.0544787247, 0.123043244, -0.000452559581, 0.00547011732, -0.683110234]

# Face detection
detection:
  cascade_path: "assets/haarcascade_frontalface_alt2.xml"
  scale_factor: 1.1
  min_face_size: 60
  smoothing: true
  smoothing_rc: 0.05

# Physical rig geometry (millimetres / degrees)
geometry:
  face_width_mm: 150.0
  actuator_offset: [0.0, 0.0, 0.0]
  horizontal_trim: 0.0
  vertical_trim: 0.0

# Servo motion control
servo:
  device_path: "/dev/servoblaster"
  update_rate: 100.0
  ramp_speed: 100.0
  filter_rc: 0.1
  pwm_min: 90
  pwm_max: 226
  start_angle: 1.0
  horizontal:
    channel: 1
    slope: 1.2290352706
    intercept: 166.3342587025
  vertical:
    channel: 3
    slope: -1.2517764093
    intercept: 166.7882520133
"#;
