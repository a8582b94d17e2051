//! Constants used throughout the application

/// Default camera resolution
pub const DEFAULT_FRAME_WIDTH: i32 = 640;
pub const DEFAULT_FRAME_HEIGHT: i32 = 480;

/// Default camera frame rate (vision stages pace themselves off this)
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Default camera intrinsics, from the bench calibration of the reference rig
pub const DEFAULT_FOCAL_X: f64 = 673.968_389_2;
pub const DEFAULT_FOCAL_Y: f64 = 676.084_664_59;
pub const DEFAULT_CENTER_X: f64 = 343.686_382_31;
pub const DEFAULT_CENTER_Y: f64 = 245.318_653_98;

/// Default lens distortion coefficients (k1, k2, p1, p2, k3)
pub const DEFAULT_DISTORTION: [f64; 5] = [
    5.447_872_47e-2,
    1.230_432_44e-1,
    -4.525_595_81e-4,
    5.470_117_32e-3,
    -6.831_102_34e-1,
];

/// Physical width of an average adult face in millimeters
pub const DEFAULT_FACE_WIDTH_MM: f64 = 150.0;

/// Default multiscale classifier parameters
pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;
pub const DEFAULT_MIN_FACE_SIZE: i32 = 60;

/// Default detection smoothing time constant in seconds
pub const DEFAULT_DETECTION_RC: f64 = 0.05;

/// Default servo update rate in Hz
pub const DEFAULT_SERVO_RATE: f64 = 100.0;

/// Default maximum angular ramp speed in degrees per second
pub const DEFAULT_RAMP_SPEED: f64 = 100.0;

/// Default controller smoothing time constant in seconds
pub const DEFAULT_CONTROLLER_RC: f64 = 0.1;

/// Default PWM command bounds, valid range is [min, max)
pub const DEFAULT_PWM_MIN: i32 = 90;
pub const DEFAULT_PWM_MAX: i32 = 226;

/// Default startup angle written to both axes before the control loop runs
pub const DEFAULT_START_ANGLE: f64 = 1.0;

/// Default per-axis angle-to-PWM mappings for the reference mount
pub const DEFAULT_HORIZONTAL_CHANNEL: u8 = 1;
pub const DEFAULT_HORIZONTAL_SLOPE: f64 = 1.229_035_270_6;
pub const DEFAULT_HORIZONTAL_INTERCEPT: f64 = 166.334_258_702_5;
pub const DEFAULT_VERTICAL_CHANNEL: u8 = 3;
pub const DEFAULT_VERTICAL_SLOPE: f64 = -1.251_776_409_3;
pub const DEFAULT_VERTICAL_INTERCEPT: f64 = 166.788_252_013_3;

/// Default actuator device path (ServoBlaster compatible)
pub const DEFAULT_SERVO_DEVICE: &str = "/dev/servoblaster";

/// Default cascade classifier model path
pub const DEFAULT_CASCADE_PATH: &str = "assets/haarcascade_frontalface_alt2.xml";
