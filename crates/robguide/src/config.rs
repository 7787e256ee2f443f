use std::path::{Path, PathBuf};
use std::time::Duration;

use robguide_calib::SweepConfig;
use robguide_capture::CaptureConfig;
use robguide_peaks::PeakThresholds;
use serde::{Deserialize, Serialize};

use crate::error::RobguideError;

/// Configuration of a sensor and its workflows.
///
/// Every field has a default, a configuration file only needs to list what it changes:
///
/// ```
/// use robguide::SensorConfig;
///
/// let config: SensorConfig =
///     serde_json::from_str(r#"{ "thresholds": { "minimum_height": 30.0 } }"#).unwrap();
/// assert_eq!(config.thresholds.minimum_height, 30.0);
/// assert_eq!(config.capture.h_resolution, 1280);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// The capture state machine.
    pub capture: CaptureConfig,
    /// Peak detection thresholds of new sequences.
    pub thresholds: PeakThresholds,
    /// Calibration sweep of new jobs.
    pub sweep: SweepConfig,
    /// Path of the intrinsic calibration record.
    pub intrinsic_path: PathBuf,
    /// Sleep between two polls of the scan buffer in live mode, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            thresholds: PeakThresholds::default(),
            sweep: SweepConfig::default(),
            intrinsic_path: PathBuf::from("cal.csv"),
            poll_interval_ms: 1,
        }
    }
}

impl SensorConfig {
    /// Reads and validates a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RobguideError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section of the configuration.
    pub fn validate(&self) -> Result<(), RobguideError> {
        self.capture.validate()?;
        self.thresholds.validate()?;
        self.sweep.validate()?;
        Ok(())
    }

    /// Sleep between two polls of the scan buffer in live mode.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
