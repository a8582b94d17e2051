//! Servo motion control and the ServoBlaster device sink.
//!
//! The controller turns angle targets into a bounded-rate, smoothed
//! motion: per cycle it steps each axis toward its target by at most one
//! increment, low-pass filters the stepped angle, maps it to a PWM value
//! and writes the command if it falls inside the valid range. NaN targets
//! hold the current position; NaN angles map to the minimum PWM.

use crate::channel::StateChannel;
use crate::config::{AxisConfig, ServoConfig};
use crate::filters::LowPass;
use crate::stage::Stage;
use crate::triangulation::AngleTarget;
use crate::{Error, Result};
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// One actuator command: a channel and a PWM position value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCommand {
    pub channel: u8,
    pub pwm: i32,
}

/// Destination for validated servo commands.
pub trait ActuatorSink: Send {
    fn write_command(&mut self, command: ServoCommand) -> Result<()>;
}

/// ServoBlaster device file sink speaking the `"<channel>=<pwm>\n"` line
/// protocol, one flushed write per command.
pub struct ServoBlaster {
    device: File,
}

impl ServoBlaster {
    /// Open the device file. Failure is fatal; the driver owns retries, if
    /// any, at the system level.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let device = OpenOptions::new().write(true).open(&path).map_err(|e| {
            Error::Actuator(format!(
                "Failed to open actuator device {}: {e}",
                path.as_ref().display()
            ))
        })?;
        info!("Actuator device {} open", path.as_ref().display());
        Ok(Self { device })
    }
}

impl ActuatorSink for ServoBlaster {
    fn write_command(&mut self, command: ServoCommand) -> Result<()> {
        writeln!(self.device, "{}={}", command.channel, command.pwm)?;
        self.device.flush()?;
        Ok(())
    }
}

/// Map an angle in degrees to a PWM value. NaN maps to `pwm_min` so a
/// degenerate solve can never push an unbounded value at the hardware.
#[must_use]
pub fn angle_to_pwm(angle: f64, slope: f64, intercept: f64, pwm_min: i32) -> i32 {
    if angle.is_nan() {
        return pwm_min;
    }
    (slope * angle + intercept).round() as i32
}

/// Per-axis motion state: the ramped angle and its output filter.
struct Axis {
    config: AxisConfig,
    current: f64,
    filter: LowPass,
}

impl Axis {
    fn new(config: AxisConfig, start_angle: f64, rc: f64, dt: f64) -> Self {
        Self {
            config,
            current: start_angle,
            filter: LowPass::seeded(rc, dt, start_angle),
        }
    }

    /// One ramp-and-filter step. The step is a fixed increment, not a
    /// clamp to target, so the angle may overshoot by at most one step
    /// and correct on the next cycle. NaN targets compare false both
    /// ways and hold the current angle.
    fn advance(&mut self, target: f64, increment: f64) -> f64 {
        if target > self.current {
            self.current += increment;
        } else if target < self.current {
            self.current -= increment;
        }
        self.filter.apply(self.current)
    }
}

/// Motion control stage driving both axes at a fixed rate.
pub struct ServoController<S: ActuatorSink> {
    sink: S,
    input: StateChannel<AngleTarget>,
    horizontal: Axis,
    vertical: Axis,
    increment: f64,
    pwm_min: i32,
    pwm_max: i32,
}

impl<S: ActuatorSink> ServoController<S> {
    /// Build the controller and drive both axes to the configured start
    /// angle. The startup commands go through the same map-and-validate
    /// path as cycle commands.
    pub fn new(sink: S, input: StateChannel<AngleTarget>, config: &ServoConfig) -> Result<Self> {
        let dt = 1.0 / config.update_rate;
        let mut controller = Self {
            sink,
            input,
            horizontal: Axis::new(
                config.horizontal.clone(),
                config.start_angle,
                config.filter_rc,
                dt,
            ),
            vertical: Axis::new(
                config.vertical.clone(),
                config.start_angle,
                config.filter_rc,
                dt,
            ),
            increment: config.ramp_speed / config.update_rate,
            pwm_min: config.pwm_min,
            pwm_max: config.pwm_max,
        };
        controller.map_and_write(config.start_angle, config.start_angle)?;
        Ok(controller)
    }

    fn map_and_write(&mut self, horizontal_angle: f64, vertical_angle: f64) -> Result<()> {
        let horizontal = ServoCommand {
            channel: self.horizontal.config.channel,
            pwm: angle_to_pwm(
                horizontal_angle,
                self.horizontal.config.slope,
                self.horizontal.config.intercept,
                self.pwm_min,
            ),
        };
        let vertical = ServoCommand {
            channel: self.vertical.config.channel,
            pwm: angle_to_pwm(
                vertical_angle,
                self.vertical.config.slope,
                self.vertical.config.intercept,
                self.pwm_min,
            ),
        };
        self.write_validated(horizontal)?;
        self.write_validated(vertical)
    }

    /// Write only commands inside `[pwm_min, pwm_max)`; anything else is
    /// dropped for this cycle and the actuator holds its last accepted
    /// position.
    fn write_validated(&mut self, command: ServoCommand) -> Result<()> {
        if (self.pwm_min..self.pwm_max).contains(&command.pwm) {
            self.sink.write_command(command)?;
        } else {
            debug!(
                "dropping out-of-range pwm {} for channel {}",
                command.pwm, command.channel
            );
        }
        Ok(())
    }
}

impl<S: ActuatorSink> Stage for ServoController<S> {
    fn cycle(&mut self) -> Result<()> {
        let target = self.input.read();
        let increment = self.increment;
        let horizontal_angle = self.horizontal.advance(target.horizontal, increment);
        let vertical_angle = self.vertical.advance(target.vertical, increment);
        self.map_and_write(horizontal_angle, vertical_angle)
    }
}
