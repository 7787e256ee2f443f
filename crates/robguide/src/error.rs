use robguide_calib::{Axis, CalibrationError};
use robguide_capture::CaptureError;
use robguide_peaks::PeakError;
use robguide_scan::Side;

use crate::robot::RobotError;

/// An error type for the sensor workflows.
#[derive(thiserror::Error, Debug)]
pub enum RobguideError {
    /// Capturing a scan failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// A peak threshold was rejected.
    #[error(transparent)]
    Peak(#[from] PeakError),

    /// Loading, fitting or using the calibration failed.
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// The robot failed to move.
    #[error(transparent)]
    Robot(#[from] RobotError),

    /// The configuration file could not be read.
    #[error("Failed to read the configuration file")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for the configuration.
    #[error("Failed to parse the configuration file")]
    Config(#[from] serde_json::Error),

    /// The sequence has no sensor attached.
    #[error("The sequence has no sensor")]
    NoSensor,

    /// The sensor attached to the sequence no longer exists.
    #[error("The sensor of the sequence has been dropped")]
    SensorDropped,

    /// A single shot capture was requested while the sensor streams.
    #[error("The sensor is streaming")]
    SensorBusy,

    /// A calibration scan showed no peak on one side.
    #[error("No {side} peak at offset {offset} of axis {axis}")]
    MissingPeak {
        /// The axis being calibrated.
        axis: Axis,
        /// The commanded offset.
        offset: f64,
        /// The side without a peak.
        side: Side,
    },

    /// A measurement needs a peak on both sides.
    #[error("A peak is needed on both sides")]
    NoPeakPair,

    /// An index did not address an element.
    #[error("Index {index} is out of range for {len} elements")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of elements.
        len: usize,
    },
}
