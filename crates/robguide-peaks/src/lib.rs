#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the peaks module.
pub mod error;

/// Peak detection on a single line of samples.
///
/// See [`find::find_peaks`] for the detection rules.
pub mod find;

/// The configurable peak engine working on stereo scans.
pub mod engine;

pub use crate::engine::{PeakEngine, PeakThresholds, ScanPeaks};
pub use crate::error::PeakError;
pub use crate::find::find_peaks;
