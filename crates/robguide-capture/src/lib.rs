#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the capture module.
///
/// Defines [`FrameSourceError`] and [`IlluminationError`] for the hardware collaborators and
/// [`CaptureError`] for the capture state machine.
pub mod error;

/// Hardware capability traits: the frame source and the scan illumination.
pub mod source;

/// The capture state machine, single-shot and continuous.
///
/// See [`controller::CaptureController`].
pub mod controller;

/// Smoothed capture cycle rate.
pub mod cycle_rate;

/// Synthetic frame source and illumination for running the pipeline without hardware.
pub mod synthetic;

pub use crate::controller::{
    CaptureConfig, CaptureController, CaptureHandle, CapturePhase, CaptureStats, StoppedCapture,
};
pub use crate::error::{CaptureError, FrameSourceError, IlluminationError};
pub use crate::source::{FrameSource, IlluminationControl, RawFrame};
