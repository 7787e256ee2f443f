use crate::controller::CapturePhase;

/// An error reported by a frame source while capturing one frame.
///
/// Frame source errors are treated as transient and retried by the capture controller.
#[derive(thiserror::Error, Debug)]
pub enum FrameSourceError {
    /// The camera read failed.
    #[error("Failed to read the frame. {0}")]
    Io(#[from] std::io::Error),

    /// No frame arrived in time.
    #[error("Timed out waiting for a frame")]
    Timeout,

    /// The device reported an error.
    #[error("Frame source device error: {0}")]
    Device(String),
}

/// An error reported while switching the scan illumination.
#[derive(thiserror::Error, Debug)]
pub enum IlluminationError {
    /// The output line could not be driven.
    #[error("Failed to switch the scan illumination. {0}")]
    Io(#[from] std::io::Error),

    /// The device reported an error.
    #[error("Illumination device error: {0}")]
    Device(String),
}

/// An error type for the capture state machine.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    /// The frame source kept failing until the retry budget of a phase was exhausted.
    #[error("Capture failed while {phase} after {attempts} attempts. {source}")]
    CaptureFailure {
        /// The phase in which the capture failed.
        phase: CapturePhase,
        /// Number of capture attempts made.
        attempts: u32,
        /// The error of the last attempt.
        #[source]
        source: FrameSourceError,
    },

    /// The frame does not contain the configured scan row.
    #[error("Frame of {width}x{height} does not hold row {row} with {expected} samples")]
    InvalidFrame {
        /// Width of the received frame.
        width: usize,
        /// Height of the received frame.
        height: usize,
        /// The configured scan row.
        row: usize,
        /// Expected stereo row width.
        expected: usize,
    },

    /// Switching the illumination failed.
    #[error(transparent)]
    Illumination(#[from] IlluminationError),

    /// Building the differenced scan failed.
    #[error(transparent)]
    Scan(#[from] robguide_scan::ScanError),

    /// An error for an invalid configuration.
    #[error("Invalid capture configuration: {0}")]
    InvalidConfig(String),

    /// The continuous capture thread panicked and the hardware handles are lost.
    #[error("The capture thread panicked")]
    CaptureThreadPanicked,
}
