use std::path::PathBuf;

use crate::extrinsic::Axis;

/// An error raised while loading the intrinsic calibration record.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationLoadError {
    /// The record file could not be read.
    #[error("Failed to read the intrinsic record {}", path.display())]
    Missing {
        /// Path of the record file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The record file holds no record.
    #[error("The intrinsic record is empty")]
    Empty,

    /// The record does not have the expected number of fields.
    #[error("The intrinsic record has {found} fields, expected {expected}")]
    FieldCount {
        /// Number of fields of a well formed record.
        expected: usize,
        /// Number of fields found.
        found: usize,
    },

    /// A field is not a finite number.
    #[error("Field {field} of the intrinsic record is not a finite number: {value:?}")]
    Malformed {
        /// Name of the field.
        field: &'static str,
        /// The raw text of the field.
        value: String,
    },

    /// A field that must be strictly positive is not.
    #[error("Field {field} of the intrinsic record must be positive, got {value}")]
    NonPositive {
        /// Name of the field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// An error type for the calibration module.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    /// The intrinsic record could not be loaded.
    #[error(transparent)]
    Load(#[from] CalibrationLoadError),

    /// An axis has too few distinct positions to fit a line.
    #[error("Axis {axis} has {observations} observations at {distinct_positions} distinct offsets")]
    InsufficientData {
        /// The axis that cannot be fitted.
        axis: Axis,
        /// Number of observations recorded for the axis.
        observations: usize,
        /// Number of distinct offsets among them.
        distinct_positions: usize,
    },

    /// The distinct offsets of an axis are too close together to fit a line.
    #[error("The offsets recorded for axis {axis} are too close together to fit a line")]
    DegenerateSpread {
        /// The axis that cannot be fitted.
        axis: Axis,
    },

    /// An observation holds a value that is not a finite number.
    #[error("Observation for axis {axis} is not finite")]
    InvalidObservation {
        /// The axis the observation was recorded for.
        axis: Axis,
    },

    /// A configuration value was rejected.
    #[error("Invalid calibration configuration: {0}")]
    InvalidConfiguration(String),

    /// The sensitivity matrix has not been fitted or set.
    #[error("The sensitivity matrix is not calibrated")]
    NotCalibrated,

    /// Both sides are insensitive to the axis, its offset cannot be recovered.
    #[error("Axis {axis} has zero sensitivity on both sides")]
    DegenerateSensitivity {
        /// The insensitive axis.
        axis: Axis,
    },

    /// The two camera rays do not intersect.
    #[error("The camera rays are parallel")]
    ParallelRays,
}
