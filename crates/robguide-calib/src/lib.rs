#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the calibration module.
pub mod error;

/// Per camera optical geometry loaded from the intrinsic record.
pub mod intrinsic;

/// Observation tables and the fitted sensitivity matrix.
pub mod extrinsic;

/// Least squares line fitting.
pub mod linefit;

/// Sweep positions used to collect calibration observations.
pub mod sweep;

pub use crate::error::{CalibrationError, CalibrationLoadError};
pub use crate::extrinsic::{Axis, AxisFit, ExtrinsicCalibration, Observation, SensitivityMatrix};
pub use crate::intrinsic::{CameraGeometry, IntrinsicModel};
pub use crate::linefit::LineFit;
pub use crate::sweep::SweepConfig;
