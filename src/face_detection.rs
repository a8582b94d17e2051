//! Haar-cascade face localization with temporal smoothing.

use crate::capture::Frame;
use crate::channel::StateChannel;
use crate::config::DetectionConfig;
use crate::filters::low_pass;
use crate::stage::Stage;
use crate::{Error, Result};
use log::{info, trace};
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::{
    CascadeClassifier, CASCADE_DO_CANNY_PRUNING, CASCADE_DO_ROUGH_SEARCH,
    CASCADE_FIND_BIGGEST_OBJECT, CASCADE_SCALE_IMAGE,
};
use opencv::prelude::*;
use std::time::Duration;

/// Face bounding box in pixel coordinates.
///
/// Coordinates are `f64` so temporal smoothing keeps sub-pixel precision.
/// A box with non-positive width or height means "no face seen yet"
/// (the all-zero default).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FaceBox {
    /// Whether this box describes an actual detection.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.w > 0.0 && self.h > 0.0
    }
}

/// Locates at most one face per frame (the largest candidate).
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Option<FaceBox>>;
}

/// Haar-cascade face locator.
pub struct CascadeFaceLocator {
    classifier: CascadeClassifier,
    scale_factor: f64,
    min_size: i32,
}

impl CascadeFaceLocator {
    /// Load the cascade model. A missing or empty model is fatal.
    pub fn new(config: &DetectionConfig) -> Result<Self> {
        let path = config.cascade_path.to_str().ok_or_else(|| {
            Error::Classifier("Cascade path is not valid UTF-8".to_string())
        })?;
        let classifier = CascadeClassifier::new(path)?;
        if classifier.empty()? {
            return Err(Error::Classifier(format!(
                "Failed to load cascade classifier from {path}"
            )));
        }
        info!("Cascade classifier loaded from {path}");

        Ok(Self {
            classifier,
            scale_factor: config.scale_factor,
            min_size: config.min_face_size,
        })
    }
}

impl FaceLocator for CascadeFaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Option<FaceBox>> {
        if frame.is_empty() {
            return Ok(None);
        }

        let image = Mat::new_rows_cols_with_data(frame.height, frame.width, &frame.data)?;

        let mut candidates: Vector<Rect> = Vector::new();
        self.classifier.detect_multi_scale(
            &image,
            &mut candidates,
            self.scale_factor,
            3,
            CASCADE_SCALE_IMAGE
                | CASCADE_DO_CANNY_PRUNING
                | CASCADE_FIND_BIGGEST_OBJECT
                | CASCADE_DO_ROUGH_SEARCH,
            Size::new(self.min_size, self.min_size),
            Size::new(0, 0),
        )?;

        Ok(largest_candidate(&candidates))
    }
}

/// Pick the largest rectangle by area. The biggest-object search flags
/// usually leave a single candidate; this settles the rest.
fn largest_candidate(candidates: &Vector<Rect>) -> Option<FaceBox> {
    candidates
        .iter()
        .max_by_key(|r| r.width * r.height)
        .map(|r| FaceBox {
            x: f64::from(r.x),
            y: f64::from(r.y),
            w: f64::from(r.width),
            h: f64::from(r.height),
        })
}

/// Per-coordinate first-order smoothing of successive face boxes.
struct BoxSmoother {
    rc: f64,
    dt: f64,
    last: FaceBox,
}

impl BoxSmoother {
    fn new(rc: f64, dt: f64) -> Self {
        Self {
            rc,
            dt,
            last: FaceBox::default(),
        }
    }

    fn apply(&mut self, raw: FaceBox) -> FaceBox {
        let smoothed = FaceBox {
            x: low_pass(raw.x, self.last.x, self.rc, self.dt),
            y: low_pass(raw.y, self.last.y, self.rc, self.dt),
            w: low_pass(raw.w, self.last.w, self.rc, self.dt),
            h: low_pass(raw.h, self.last.h, self.rc, self.dt),
        };
        self.last = smoothed;
        smoothed
    }
}

/// Pipeline stage running the locator over the latest frame and publishing
/// smoothed boxes.
///
/// Cycles with no detection publish nothing: downstream keeps the last
/// known box, and the smoother state is untouched.
pub struct DetectionStage<L: FaceLocator> {
    locator: L,
    input: StateChannel<Frame>,
    output: StateChannel<FaceBox>,
    wait: Duration,
    smoother: Option<BoxSmoother>,
}

impl<L: FaceLocator> DetectionStage<L> {
    /// `frame_period` is the nominal camera period; it bounds the input
    /// wait and is the smoothing filter's `dt`.
    pub fn new(
        locator: L,
        input: StateChannel<Frame>,
        output: StateChannel<FaceBox>,
        config: &DetectionConfig,
        frame_period: Duration,
    ) -> Self {
        let smoother = config
            .smoothing
            .then(|| BoxSmoother::new(config.smoothing_rc, frame_period.as_secs_f64()));
        Self {
            locator,
            input,
            output,
            wait: frame_period,
            smoother,
        }
    }
}

impl<L: FaceLocator> Stage for DetectionStage<L> {
    fn cycle(&mut self) -> Result<()> {
        // Proceed with the latest frame whether or not a new one arrived
        self.input.wait_timeout(self.wait);
        let frame = self.input.read();
        if frame.is_empty() {
            return Ok(());
        }

        if let Some(raw) = self.locator.locate(&frame)? {
            let smoothed = match &mut self.smoother {
                Some(smoother) => smoother.apply(raw),
                None => raw,
            };
            trace!(
                "face at ({:.1}, {:.1}) size {:.1}x{:.1}",
                smoothed.x,
                smoothed.y,
                smoothed.w,
                smoothed.h
            );
            self.output.publish(smoothed);
        }

        Ok(())
    }
}
