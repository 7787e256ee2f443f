use robguide_scan::{DifferencedScan, ScanLine, Side};
use serde::{Deserialize, Serialize};

use crate::error::PeakError;
use crate::find::find_peaks;

/// Thresholds applied by [`find_peaks`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakThresholds {
    /// Minimum width of a peak at half its prominence, in samples.
    pub minimum_width: f64,
    /// Minimum prominence of a peak, in intensity levels.
    pub minimum_height: f64,
    /// Minimum distance between two peaks, in samples.
    pub minimum_distance: usize,
}

impl Default for PeakThresholds {
    fn default() -> Self {
        Self {
            minimum_width: 1.0,
            minimum_height: 50.0,
            minimum_distance: 10,
        }
    }
}

impl PeakThresholds {
    /// Checks that every threshold is usable.
    ///
    /// Width and height must be finite and not negative, the distance must be at least 1.
    pub fn validate(&self) -> Result<(), PeakError> {
        check_level("minimum_width", self.minimum_width)?;
        check_level("minimum_height", self.minimum_height)?;
        if self.minimum_distance == 0 {
            return Err(PeakError::InvalidThreshold {
                name: "minimum_distance",
                value: 0.0,
            });
        }
        Ok(())
    }
}

fn check_level(name: &'static str, value: f64) -> Result<(), PeakError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PeakError::InvalidThreshold { name, value });
    }
    Ok(())
}

/// Peak indices found on both lines of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPeaks {
    /// Peaks of the left line.
    pub left: Vec<usize>,
    /// Peaks of the right line.
    pub right: Vec<usize>,
}

impl ScanPeaks {
    /// Peaks of the given side.
    pub fn side(&self, side: Side) -> &[usize] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// The lowest-index peak of the given side, if any.
    pub fn first(&self, side: Side) -> Option<usize> {
        self.side(side).first().copied()
    }

    /// Whether both sides have at least one peak.
    pub fn is_complete(&self) -> bool {
        !self.left.is_empty() && !self.right.is_empty()
    }
}

/// A peak detector with adjustable thresholds.
///
/// # Examples
///
/// ```
/// use robguide_peaks::PeakEngine;
/// use robguide_scan::ScanLine;
///
/// let mut engine = PeakEngine::default();
/// engine.set_minimum_height(20.0).unwrap();
///
/// let line = ScanLine::new(vec![0, 0, 30, 0, 0]);
/// assert_eq!(engine.find(&line), vec![2]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PeakEngine {
    thresholds: PeakThresholds,
}

impl PeakEngine {
    /// Creates an engine with the given thresholds.
    pub fn new(thresholds: PeakThresholds) -> Result<Self, PeakError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    /// The current thresholds.
    #[inline]
    pub fn thresholds(&self) -> &PeakThresholds {
        &self.thresholds
    }

    /// Sets the minimum peak width. Invalid values leave the engine unchanged.
    pub fn set_minimum_width(&mut self, width: f64) -> Result<(), PeakError> {
        check_level("minimum_width", width)?;
        self.thresholds.minimum_width = width;
        Ok(())
    }

    /// Sets the minimum peak prominence. Invalid values leave the engine unchanged.
    pub fn set_minimum_height(&mut self, height: f64) -> Result<(), PeakError> {
        check_level("minimum_height", height)?;
        self.thresholds.minimum_height = height;
        Ok(())
    }

    /// Sets the minimum distance between peaks. Invalid values leave the engine unchanged.
    pub fn set_minimum_distance(&mut self, distance: usize) -> Result<(), PeakError> {
        if distance == 0 {
            return Err(PeakError::InvalidThreshold {
                name: "minimum_distance",
                value: 0.0,
            });
        }
        self.thresholds.minimum_distance = distance;
        Ok(())
    }

    /// Finds the peaks of one line.
    pub fn find(&self, line: &ScanLine) -> Vec<usize> {
        find_peaks(line.as_slice(), &self.thresholds)
    }

    /// Finds the peaks of both lines of a scan.
    pub fn find_scan(&self, scan: &DifferencedScan) -> ScanPeaks {
        ScanPeaks {
            left: self.find(scan.left()),
            right: self.find(scan.right()),
        }
    }
}
