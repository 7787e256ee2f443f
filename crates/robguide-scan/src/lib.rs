#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the scan module.
pub mod error;

/// Scan lines and lit-minus-unlit differencing.
///
/// See [`scan::DifferencedScan`] for the stereo pair produced by one capture cycle.
pub mod scan;

/// Single-slot, latest-value buffer shared between the capture loop and its readers.
pub mod buffer;

pub use crate::buffer::{ScanBuffer, ScanReader, ScanSnapshot};
pub use crate::error::ScanError;
pub use crate::scan::{difference_row, DifferencedScan, ScanLine, Side};
