//! Monocular distance estimation and pan/tilt angle triangulation.
//!
//! Converts a face box in image space into the pair of angles the
//! actuator mount must turn through to face the target, assuming a known
//! physical face width. Degenerate geometry (no face yet, face plane
//! behind the actuator) produces NaN, which flows downstream untouched;
//! the motion controller is the one place NaN gets handled.

use crate::channel::StateChannel;
use crate::config::{CameraConfig, GeometryConfig};
use crate::face_detection::FaceBox;
use crate::stage::Stage;
use crate::Result;
use log::trace;
use std::time::Duration;

/// Pan/tilt target angles in degrees. Either component may be NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct AngleTarget {
    pub horizontal: f64,
    pub vertical: f64,
}

/// Converts face boxes into mount angles using law-of-cosines
/// triangulation around the camera/actuator baseline.
pub struct PositionSolver {
    face_width: f64,
    res_x: f64,
    res_y: f64,
    focal_x: f64,
    focal_y: f64,
    offset: [f64; 3],
    horizontal_trim: f64,
    vertical_trim: f64,
}

impl PositionSolver {
    #[must_use]
    pub fn new(camera: &CameraConfig, geometry: &GeometryConfig) -> Self {
        Self {
            face_width: geometry.face_width_mm,
            res_x: f64::from(camera.frame_width),
            res_y: f64::from(camera.frame_height),
            focal_x: camera.focal_x,
            focal_y: camera.focal_y,
            offset: geometry.actuator_offset,
            horizontal_trim: geometry.horizontal_trim,
            vertical_trim: geometry.vertical_trim,
        }
    }

    /// Solve both axes for one face box.
    #[must_use]
    pub fn solve(&self, face: FaceBox) -> AngleTarget {
        // The vertical axis mirrors the image y direction
        let h = -face.h;
        let center_x = face.x + face.w / 2.0;
        let center_y = face.y - h / 2.0;

        let horizontal =
            self.solve_axis(center_x, self.res_x, face.w, self.focal_x, self.offset[0])
                - self.horizontal_trim;
        let vertical = self.solve_axis(center_y, self.res_y, h, self.focal_y, self.offset[2])
            - self.vertical_trim;

        AngleTarget {
            horizontal,
            vertical,
        }
    }

    /// One axis of the triangulation. `axis_offset` is the actuator's
    /// displacement from the camera along this axis; `self.offset[1]` is
    /// the shared depth displacement.
    fn solve_axis(&self, center: f64, res: f64, size: f64, focal: f64, axis_offset: f64) -> f64 {
        // Camera-to-face distance from the known physical face width
        let c1 = self.face_width * focal / size;
        // Physical off-axis displacement of the face from the optical axis
        let a1 = (center - res / 2.0) * ((self.face_width / 2.0) / (size / 2.0));
        // Distance to the face plane; NaN when the estimate is inconsistent
        let b1 = (c1 * c1 - a1 * a1).sqrt();

        // Same triangle, re-rooted at the actuator
        let a2 = axis_offset - a1;
        let b2 = b1 - self.offset[1];
        let c2 = (a2 * a2 + b2 * b2).sqrt();

        let mut angle = ((b2 * b2 + c2 * c2 - a2 * a2) / (2.0 * b2 * c2)).acos();
        if a1 > axis_offset {
            angle = -angle;
        }

        angle.to_degrees()
    }
}

/// Pipeline stage turning the latest face box into an angle target.
///
/// Publishes every cycle, including NaN results; the controller decides
/// what a NaN target means.
pub struct SolverStage {
    solver: PositionSolver,
    input: StateChannel<FaceBox>,
    output: StateChannel<AngleTarget>,
    wait: Duration,
}

impl SolverStage {
    pub fn new(
        solver: PositionSolver,
        input: StateChannel<FaceBox>,
        output: StateChannel<AngleTarget>,
        wait: Duration,
    ) -> Self {
        Self {
            solver,
            input,
            output,
            wait,
        }
    }
}

impl Stage for SolverStage {
    fn cycle(&mut self) -> Result<()> {
        self.input.wait_timeout(self.wait);
        let face = self.input.read();
        let angles = self.solver.solve(face);
        trace!(
            "angles: horizontal {:.2} vertical {:.2}",
            angles.horizontal,
            angles.vertical
        );
        self.output.publish(angles);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_670() -> CameraConfig {
        CameraConfig {
            focal_x: 670.0,
            focal_y: 670.0,
            ..CameraConfig::default()
        }
    }

    fn zero_offset() -> GeometryConfig {
        GeometryConfig::default()
    }

    fn solver() -> PositionSolver {
        PositionSolver::new(&camera_670(), &zero_offset())
    }

    /// A box whose center sits exactly on the optical axis, for a 640x480
    /// image: columns centered on 320, rows centered on 240.
    fn centered_box(size: f64) -> FaceBox {
        FaceBox {
            x: 320.0 - size / 2.0,
            y: 240.0 - size / 2.0,
            w: size,
            h: size,
        }
    }

    #[test]
    fn test_centered_face_gives_exact_zero_for_any_size() {
        for size in [50.0, 100.0, 137.0, 200.0] {
            let angles = solver().solve(centered_box(size));
            assert_eq!(angles.horizontal, 0.0, "size {size}");
            assert_eq!(angles.vertical, 0.0, "size {size}");
        }
    }

    #[test]
    fn test_horizontal_sign_convention() {
        // Face left of center turns the mount to positive pan
        let mut left = centered_box(100.0);
        left.x -= 80.0;
        let mut right = centered_box(100.0);
        right.x += 80.0;

        let s = solver();
        assert!(s.solve(left).horizontal > 0.0);
        assert!(s.solve(right).horizontal < 0.0);
    }

    #[test]
    fn test_vertical_sign_convention() {
        // Image y grows downward; a face above center solves negative
        let mut above = centered_box(100.0);
        above.y -= 80.0;
        let mut below = centered_box(100.0);
        below.y += 80.0;

        let s = solver();
        assert!(s.solve(above).vertical < 0.0);
        assert!(s.solve(below).vertical > 0.0);
    }

    #[test]
    fn test_reference_box_horizontal_angle() {
        // 100x100 box at (300, 190): center (350, 240), 30 px right of
        // axis. a1 = 45 mm and c1 = 1005 mm, both exact in f64.
        let angles = solver().solve(FaceBox {
            x: 300.0,
            y: 190.0,
            w: 100.0,
            h: 100.0,
        });

        let a1: f64 = 45.0;
        let c1: f64 = 1005.0;
        let b1 = (c1 * c1 - a1 * a1).sqrt();
        let c2 = (a1 * a1 + b1 * b1).sqrt();
        let expected = -((b1 * b1 + c2 * c2 - a1 * a1) / (2.0 * b1 * c2))
            .acos()
            .to_degrees();

        assert_eq!(angles.horizontal, expected);
        // Vertically dead-center: rows 190..290 straddle 240
        assert_eq!(angles.vertical, 0.0);
    }

    #[test]
    fn test_zero_size_box_propagates_nan() {
        let angles = solver().solve(FaceBox::default());
        assert!(angles.horizontal.is_nan());
        assert!(angles.vertical.is_nan());
    }

    #[test]
    fn test_face_plane_at_actuator_depth_is_degenerate() {
        // Centered 150 px box puts the face plane at exactly 670 mm;
        // an actuator at that depth collapses the triangle to a point.
        let geometry = GeometryConfig {
            actuator_offset: [0.0, 670.0, 0.0],
            ..GeometryConfig::default()
        };
        let s = PositionSolver::new(&camera_670(), &geometry);
        let angles = s.solve(centered_box(150.0));
        assert!(angles.horizontal.is_nan());
        assert!(angles.vertical.is_nan());
    }

    #[test]
    fn test_trim_shifts_angles() {
        let geometry = GeometryConfig {
            horizontal_trim: 2.5,
            vertical_trim: -1.0,
            ..GeometryConfig::default()
        };
        let s = PositionSolver::new(&camera_670(), &geometry);
        let angles = s.solve(centered_box(100.0));
        assert_eq!(angles.horizontal, -2.5);
        assert_eq!(angles.vertical, 1.0);
    }

    #[test]
    fn test_lateral_offset_breaks_symmetry() {
        let geometry = GeometryConfig {
            actuator_offset: [100.0, 0.0, 0.0],
            ..GeometryConfig::default()
        };
        let s = PositionSolver::new(&camera_670(), &geometry);
        // Centered face seen from an actuator mounted to the side
        let angles = s.solve(centered_box(100.0));
        assert!(angles.horizontal > 0.0);
        assert_eq!(angles.vertical, 0.0);
    }

    #[test]
    fn test_stage_publishes_every_cycle() {
        let faces = StateChannel::new();
        let angles: StateChannel<AngleTarget> = StateChannel::new();
        let mut stage = SolverStage::new(
            solver(),
            faces.clone(),
            angles.clone(),
            Duration::from_millis(1),
        );

        // No face yet: still publishes (NaN)
        stage.cycle().unwrap();
        assert!(angles.read().horizontal.is_nan());

        faces.publish(centered_box(100.0));
        stage.cycle().unwrap();
        assert_eq!(angles.read().horizontal, 0.0);
    }
}
