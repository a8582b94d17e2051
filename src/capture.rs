//! Camera capture with lens undistortion.
//!
//! Opens the capture device once at startup, derives the undistortion
//! lookup maps from the calibrated intrinsics, and hands out grayscale,
//! distortion-corrected frames.

use crate::channel::StateChannel;
use crate::config::CameraConfig;
use crate::stage::Stage;
use crate::{Error, Result};
use log::{debug, info};
use opencv::{
    calib3d,
    core::{Mat, Scalar, Size, BORDER_CONSTANT, CV_32FC1},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use std::time::{Duration, Instant};

/// One grayscale, undistortion-corrected camera frame.
///
/// The all-zero default (no pixels) stands in before the first capture;
/// downstream consumers treat it as "nothing seen yet".
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Row-major 8-bit grayscale pixels
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Frame {
    /// Whether this frame carries any pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Blocking source of fixed-resolution, pre-undistorted grayscale frames.
pub trait FrameSource: Send {
    /// Capture the next frame. Blocks until one is available.
    fn grab(&mut self) -> Result<Frame>;
}

/// Webcam frame source applying the calibrated undistortion per frame.
pub struct UndistortedCamera {
    capture: VideoCapture,
    map_x: Mat,
    map_y: Mat,
    frames: u32,
    window_start: Instant,
}

impl UndistortedCamera {
    /// Open the capture device and precompute the undistortion maps.
    /// Failure to acquire the camera is fatal.
    pub fn new(config: &CameraConfig) -> Result<Self> {
        info!("Opening camera {}", config.index);
        let mut capture = VideoCapture::new(config.index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::Camera(format!(
                "Failed to open camera {}",
                config.index
            )));
        }

        capture.set(CAP_PROP_FRAME_WIDTH, f64::from(config.frame_width))?;
        capture.set(CAP_PROP_FRAME_HEIGHT, f64::from(config.frame_height))?;
        // Smallest buffer for lowest latency; tracking wants fresh frames
        capture.set(CAP_PROP_BUFFERSIZE, 1.0)?;

        let camera_matrix = Mat::from_slice_2d(&[
            [config.focal_x, 0.0, config.center_x],
            [0.0, config.focal_y, config.center_y],
            [0.0, 0.0, 1.0],
        ])?;
        let distortion = Mat::from_slice_2d(&[config.distortion])?;
        let size = Size::new(config.frame_width, config.frame_height);

        let refined_matrix = calib3d::get_optimal_new_camera_matrix(
            &camera_matrix,
            &distortion,
            size,
            0.0,
            size,
            None,
            false,
        )?;

        let mut map_x = Mat::default();
        let mut map_y = Mat::default();
        calib3d::init_undistort_rectify_map(
            &camera_matrix,
            &distortion,
            &Mat::default(),
            &refined_matrix,
            size,
            CV_32FC1,
            &mut map_x,
            &mut map_y,
        )?;

        info!(
            "Camera {} open at {}x{}, undistortion maps ready",
            config.index, config.frame_width, config.frame_height
        );

        Ok(Self {
            capture,
            map_x,
            map_y,
            frames: 0,
            window_start: Instant::now(),
        })
    }

    fn count_frame(&mut self) {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            debug!(
                "capture: {:.1} fps",
                f64::from(self.frames) / elapsed.as_secs_f64()
            );
            self.frames = 0;
            self.window_start = Instant::now();
        }
    }
}

impl FrameSource for UndistortedCamera {
    fn grab(&mut self) -> Result<Frame> {
        let mut raw = Mat::default();
        if !self.capture.read(&mut raw)? || raw.empty() {
            return Err(Error::Camera("Camera returned no frame".to_string()));
        }

        let mut gray = Mat::default();
        imgproc::cvt_color(&raw, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

        let mut corrected = Mat::default();
        imgproc::remap(
            &gray,
            &mut corrected,
            &self.map_x,
            &self.map_y,
            imgproc::INTER_LINEAR,
            BORDER_CONSTANT,
            Scalar::default(),
        )?;

        self.count_frame();

        Ok(Frame {
            data: corrected.data_bytes()?.to_vec(),
            width: corrected.cols(),
            height: corrected.rows(),
        })
    }
}

/// Pipeline stage publishing one captured frame per cycle.
pub struct CaptureStage<S: FrameSource> {
    source: S,
    output: StateChannel<Frame>,
}

impl<S: FrameSource> CaptureStage<S> {
    pub fn new(source: S, output: StateChannel<Frame>) -> Self {
        Self { source, output }
    }
}

impl<S: FrameSource> Stage for CaptureStage<S> {
    fn cycle(&mut self) -> Result<()> {
        let frame = self.source.grab()?;
        self.output.publish(frame);
        Ok(())
    }
}
