//! Pipeline assembly: channels, hardware acquisition and stage wiring.

use crate::capture::{CaptureStage, Frame, FrameSource, UndistortedCamera};
use crate::channel::StateChannel;
use crate::config::Config;
use crate::face_detection::{CascadeFaceLocator, DetectionStage, FaceBox, FaceLocator};
use crate::servo_control::{ActuatorSink, ServoBlaster, ServoController};
use crate::stage::StageHandle;
use crate::triangulation::{AngleTarget, PositionSolver, SolverStage};
use crate::Result;
use log::info;
use std::time::Duration;

/// The running tracker: four stages on their own threads, joined by
/// single-slot state channels (frames, face boxes, angle targets).
pub struct Pipeline {
    stages: Vec<StageHandle>,
}

impl Pipeline {
    /// Acquire the camera, classifier and actuator device, then start
    /// all stages. Any acquisition failure aborts construction; there is
    /// no retry.
    pub fn new(config: &Config) -> Result<Self> {
        let camera = UndistortedCamera::new(&config.camera)?;
        let locator = CascadeFaceLocator::new(&config.detection)?;
        let sink = ServoBlaster::open(&config.servo.device_path)?;
        Self::assemble(camera, locator, sink, config)
    }

    /// Wire the stages around explicit components. Lets tests and
    /// alternative devices run the full pipeline without real hardware.
    pub fn assemble<F, L, A>(source: F, locator: L, sink: A, config: &Config) -> Result<Self>
    where
        F: FrameSource + 'static,
        L: FaceLocator + 'static,
        A: ActuatorSink + 'static,
    {
        let frames: StateChannel<Frame> = StateChannel::new();
        let faces: StateChannel<FaceBox> = StateChannel::new();
        let angles: StateChannel<AngleTarget> = StateChannel::new();

        let frame_period = Duration::from_secs_f64(1.0 / config.camera.frame_rate);
        let control_period = Duration::from_secs_f64(1.0 / config.servo.update_rate);

        let capture = CaptureStage::new(source, frames.clone());
        let detection = DetectionStage::new(
            locator,
            frames,
            faces.clone(),
            &config.detection,
            frame_period,
        );
        let solver = SolverStage::new(
            PositionSolver::new(&config.camera, &config.geometry),
            faces,
            angles.clone(),
            frame_period,
        );
        let controller = ServoController::new(sink, angles, &config.servo)?;

        // Capture paces itself on the camera, the vision stages on their
        // input channels; only the controller runs on a fixed period.
        let stages = vec![
            StageHandle::spawn("capture", None, capture)?,
            StageHandle::spawn("detection", None, detection)?,
            StageHandle::spawn("solver", None, solver)?,
            StageHandle::spawn("controller", Some(control_period), controller)?,
        ];
        info!("Pipeline running with {} stages", stages.len());

        Ok(Self { stages })
    }

    /// Lifecycle handles of the running stages.
    #[must_use]
    pub fn stages(&self) -> &[StageHandle] {
        &self.stages
    }

    /// Suspend every stage; state and hardware are retained.
    pub fn pause(&self) {
        for stage in &self.stages {
            stage.control().pause();
        }
    }

    /// Resume every paused stage.
    pub fn resume(&self) {
        for stage in &self.stages {
            stage.control().resume();
        }
    }

    /// Request a cooperative stop of every stage.
    pub fn stop(&self) {
        for stage in &self.stages {
            stage.stop();
        }
    }

    /// Stop and wait for all stages to tear down.
    pub fn join(self) -> Result<()> {
        for stage in self.stages {
            stage.join()?;
        }
        Ok(())
    }
}
