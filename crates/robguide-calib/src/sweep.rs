use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Evenly spaced axis offsets visited during a calibration sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First offset of the sweep.
    pub initial_offset: f64,
    /// Last offset of the sweep.
    pub final_offset: f64,
    /// Number of positions, both ends included.
    pub steps: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            initial_offset: -30.0,
            final_offset: 30.0,
            steps: 21,
        }
    }
}

impl SweepConfig {
    /// Creates a validated sweep.
    pub fn new(
        initial_offset: f64,
        final_offset: f64,
        steps: usize,
    ) -> Result<Self, CalibrationError> {
        let sweep = Self {
            initial_offset,
            final_offset,
            steps,
        };
        sweep.validate()?;
        Ok(sweep)
    }

    /// Checks that the bounds are finite and the sweep has at least one step.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.steps == 0 {
            return Err(CalibrationError::InvalidConfiguration(
                "sweep step count must be at least 1".to_string(),
            ));
        }
        if !self.initial_offset.is_finite() || !self.final_offset.is_finite() {
            return Err(CalibrationError::InvalidConfiguration(format!(
                "sweep bounds must be finite, got {} to {}",
                self.initial_offset, self.final_offset
            )));
        }
        Ok(())
    }

    /// The sweep positions from the initial to the final offset.
    ///
    /// # Examples
    ///
    /// ```
    /// use robguide_calib::SweepConfig;
    ///
    /// let sweep = SweepConfig::new(-1.0, 1.0, 5).unwrap();
    /// assert_eq!(sweep.positions(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    /// ```
    pub fn positions(&self) -> Vec<f64> {
        match self.steps {
            0 => Vec::new(),
            1 => vec![self.initial_offset],
            n => {
                let step = (self.final_offset - self.initial_offset) / (n - 1) as f64;
                let mut positions: Vec<f64> = (0..n)
                    .map(|i| self.initial_offset + i as f64 * step)
                    .collect();
                positions[n - 1] = self.final_offset;
                positions
            }
        }
    }
}
