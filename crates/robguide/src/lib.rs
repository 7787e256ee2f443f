#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use robguide_scan as scan;

#[doc(inline)]
pub use robguide_capture as capture;

#[doc(inline)]
pub use robguide_peaks as peaks;

#[doc(inline)]
pub use robguide_calib as calib;

/// Sensor wide configuration.
pub mod config;

/// Error types of the sensor workflows.
pub mod error;

/// Project and job hierarchy.
pub mod project;

/// Robot motion used during calibration.
pub mod robot;

/// The sensor: intrinsic model, capture controller and status indicator.
pub mod sensor;

/// Sequences and their calibration, measurement and live workflows.
pub mod sequence;

/// Status indication of the sensor.
pub mod status;

pub use crate::config::SensorConfig;
pub use crate::error::RobguideError;
pub use crate::project::{Job, Project};
pub use crate::robot::{RobotError, RobotMotion, SimulatedRobot};
pub use crate::sensor::Sensor;
pub use crate::sequence::{Measurement, Sequence};
pub use crate::status::{NullIndicator, SensorStatus, StatusIndicator};
