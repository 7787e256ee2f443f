use robguide_calib::Axis;
use robguide_capture::synthetic::{SceneHandle, Stripe};
use robguide_scan::Side;

/// An error reported by a robot.
#[derive(thiserror::Error, Debug)]
pub enum RobotError {
    /// The motion command failed.
    #[error("Robot motion failed: {0}")]
    Motion(String),

    /// The axis cannot reach the offset.
    #[error("Offset {offset} is out of reach for axis {axis}")]
    OutOfReach {
        /// The commanded axis.
        axis: Axis,
        /// The commanded offset.
        offset: f64,
    },
}

/// Moves the robot carrying the sensor during calibration.
pub trait RobotMotion {
    /// Moves `axis` to `offset` from the nominal pose and blocks until the robot has settled.
    fn move_axis(&mut self, axis: Axis, offset: f64) -> Result<(), RobotError>;
}

impl<T: RobotMotion + ?Sized> RobotMotion for &mut T {
    fn move_axis(&mut self, axis: Axis, offset: f64) -> Result<(), RobotError> {
        (**self).move_axis(axis, offset)
    }
}

/// A robot whose motion shifts the stripes of a synthetic scene linearly.
///
/// Each camera sees one stripe at `nominal + Σ sensitivity[axis] · offset[axis]`.
#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    scene: SceneHandle,
    nominal: [f64; 2],
    sensitivity: [[f64; 2]; 6],
    offsets: [f64; 6],
    reach: f64,
}

impl SimulatedRobot {
    /// Creates a robot at its nominal pose and places the stripes accordingly.
    ///
    /// # Arguments
    ///
    /// * `scene` - The scene rendered by the synthetic frame source.
    /// * `nominal` - Stripe positions of the left and right camera at the nominal pose.
    /// * `sensitivity` - Stripe displacement of the left and right camera per unit of each
    ///   axis, in [`Axis::ALL`] order.
    pub fn new(scene: SceneHandle, nominal: [f64; 2], sensitivity: [[f64; 2]; 6]) -> Self {
        let robot = Self {
            scene,
            nominal,
            sensitivity,
            offsets: [0.0; 6],
            reach: f64::INFINITY,
        };
        robot.place_stripes();
        robot
    }

    /// Limits the offset any axis may be moved to.
    pub fn with_reach(mut self, reach: f64) -> Self {
        self.reach = reach;
        self
    }

    /// Current offset of an axis.
    pub fn offset(&self, axis: Axis) -> f64 {
        self.offsets[axis.index()]
    }

    fn place_stripes(&self) {
        let stripes = Side::BOTH
            .iter()
            .map(|&side| {
                let shift: f64 = self
                    .sensitivity
                    .iter()
                    .zip(&self.offsets)
                    .map(|(s, offset)| s[side.index()] * offset)
                    .sum();
                Stripe::new(side, self.nominal[side.index()] + shift)
            })
            .collect();
        self.scene.set_stripes(stripes);
    }
}

impl RobotMotion for SimulatedRobot {
    fn move_axis(&mut self, axis: Axis, offset: f64) -> Result<(), RobotError> {
        if offset.is_nan() || offset.abs() > self.reach {
            return Err(RobotError::OutOfReach { axis, offset });
        }
        log::debug!("moving axis {axis} to {offset}");
        self.offsets[axis.index()] = offset;
        self.place_stripes();
        Ok(())
    }
}
