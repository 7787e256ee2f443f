use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{info, warn};
use robguide_calib::{Axis, AxisFit, ExtrinsicCalibration};
use robguide_capture::CaptureStats;
use robguide_peaks::{PeakEngine, PeakThresholds, ScanPeaks};
use robguide_scan::{ScanSnapshot, Side};

use crate::error::RobguideError;
use crate::robot::RobotMotion;
use crate::sensor::Sensor;

/// One measurement taken by a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Sequence number of the scan the measurement was taken from.
    pub sequence: u64,
    /// Peaks found on both lines.
    pub peaks: ScanPeaks,
    /// Sensor frame point `[x, y, 0]` in mm triangulated from the first peak of each side, if
    /// both sides show one.
    pub point: Option<[f64; 3]>,
}

/// A measurement step: a sensor, its extrinsic calibration and its peak detection.
///
/// The sequence only refers to its sensor, several sequences may share one and the sensor is
/// owned elsewhere.
#[derive(Debug)]
pub struct Sequence {
    name: String,
    sensor: Option<Weak<Mutex<Sensor>>>,
    calibration: ExtrinsicCalibration,
    peaks: PeakEngine,
}

impl Default for Sequence {
    fn default() -> Self {
        Self {
            name: "robguide-sequence".to_string(),
            sensor: None,
            calibration: ExtrinsicCalibration::new(),
            peaks: PeakEngine::default(),
        }
    }
}

fn lock(sensor: &Mutex<Sensor>) -> MutexGuard<'_, Sensor> {
    sensor.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Sequence {
    /// Creates a sequence without a sensor and with default peak thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequence without a sensor using the given peak thresholds.
    pub fn with_thresholds(thresholds: PeakThresholds) -> Result<Self, RobguideError> {
        Ok(Self {
            peaks: PeakEngine::new(thresholds)?,
            ..Default::default()
        })
    }

    /// Name of the sequence.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the sequence.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Attaches a sensor, replacing any previous one.
    pub fn set_sensor(&mut self, sensor: &Arc<Mutex<Sensor>>) {
        self.sensor = Some(Arc::downgrade(sensor));
    }

    /// Detaches the sensor.
    pub fn remove_sensor(&mut self) {
        self.sensor = None;
    }

    /// Whether a sensor is attached and still alive.
    pub fn has_sensor(&self) -> bool {
        self.sensor
            .as_ref()
            .is_some_and(|sensor| sensor.strong_count() > 0)
    }

    /// The extrinsic calibration of the sequence.
    #[inline]
    pub fn calibration(&self) -> &ExtrinsicCalibration {
        &self.calibration
    }

    /// Mutable access to the calibration, to import a matrix or reset it.
    #[inline]
    pub fn calibration_mut(&mut self) -> &mut ExtrinsicCalibration {
        &mut self.calibration
    }

    /// The peak engine of the sequence.
    #[inline]
    pub fn peak_engine(&self) -> &PeakEngine {
        &self.peaks
    }

    /// Mutable access to the peak engine, to adjust its thresholds.
    #[inline]
    pub fn peak_engine_mut(&mut self) -> &mut PeakEngine {
        &mut self.peaks
    }

    fn sensor(&self) -> Result<Arc<Mutex<Sensor>>, RobguideError> {
        self.sensor
            .as_ref()
            .ok_or(RobguideError::NoSensor)?
            .upgrade()
            .ok_or(RobguideError::SensorDropped)
    }

    /// Calibrates the sequence against the robot.
    ///
    /// The calibration is reset, then every axis is swept through `positions`: at each
    /// position the robot moves, the sensor takes a scan and the first peak of each side is
    /// recorded. Each axis returns to 0 before the next one is swept. Finally the sensitivity
    /// matrix is fitted.
    ///
    /// # Arguments
    ///
    /// * `positions` - The axis offsets to visit.
    /// * `robot` - The robot carrying the sensor.
    ///
    /// # Returns
    ///
    /// The fits of every axis.
    pub fn calibrate(
        &mut self,
        positions: &[f64],
        robot: &mut dyn RobotMotion,
    ) -> Result<Vec<AxisFit>, RobguideError> {
        let sensor = self.sensor()?;
        let mut sensor = lock(&sensor);

        info!(
            "calibrating {} over {} positions per axis",
            self.name,
            positions.len()
        );
        self.calibration.reset();

        for axis in Axis::ALL {
            let swept = self.sweep_axis(&mut sensor, axis, positions, robot);
            let returned = robot.move_axis(axis, 0.0);
            match (swept, returned) {
                (Err(e), Err(back)) => {
                    warn!("axis {axis} could not return to 0 after a failed sweep: {back}");
                    return Err(e);
                }
                (Err(e), Ok(())) => return Err(e),
                (Ok(()), returned) => returned?,
            }
        }

        Ok(self.calibration.fit()?)
    }

    fn sweep_axis(
        &mut self,
        sensor: &mut Sensor,
        axis: Axis,
        positions: &[f64],
        robot: &mut dyn RobotMotion,
    ) -> Result<(), RobguideError> {
        info!("sweeping axis {axis}");
        for &offset in positions {
            robot.move_axis(axis, offset)?;
            let snapshot = sensor.grab_scan()?;
            let peaks = self.peaks.find_scan(&snapshot.scan);

            let first = |side: Side| {
                peaks
                    .first(side)
                    .ok_or(RobguideError::MissingPeak { axis, offset, side })
            };
            let (left, right) = (first(Side::Left)?, first(Side::Right)?);
            self.calibration
                .record(axis, offset, left as f64, right as f64)?;
        }
        Ok(())
    }

    /// Takes a scan and triangulates the first peak pair through the intrinsic model.
    pub fn measure(&self) -> Result<Measurement, RobguideError> {
        let sensor = self.sensor()?;
        let mut sensor = lock(&sensor);

        let snapshot = sensor.grab_scan()?;
        let peaks = self.peaks.find_scan(&snapshot.scan);
        let point = match (peaks.first(Side::Left), peaks.first(Side::Right)) {
            (Some(left), Some(right)) => Some(
                sensor
                    .intrinsics()
                    .triangulate(left as f64, right as f64)?,
            ),
            _ => None,
        };

        Ok(Measurement {
            sequence: snapshot.sequence,
            peaks,
            point,
        })
    }

    /// Converts the first peak pair of a scan into an offset of `axis` through the fitted
    /// sensitivity matrix.
    pub fn estimate_offset(&self, axis: Axis, peaks: &ScanPeaks) -> Result<f64, RobguideError> {
        let (Some(left), Some(right)) = (peaks.first(Side::Left), peaks.first(Side::Right)) else {
            return Err(RobguideError::NoPeakPair);
        };
        Ok(self
            .calibration
            .estimate_offset(axis, left as f64, right as f64)?)
    }

    /// Streams scans and hands each new one with its peaks to `on_scan`.
    ///
    /// Continuous capture runs until `on_scan` breaks or the capture loop fails; capture is
    /// stopped in both cases. Scans published before the call are skipped.
    ///
    /// # Returns
    ///
    /// The statistics of the capture loop, or the error that ended it.
    pub fn live_mode<F>(&self, mut on_scan: F) -> Result<CaptureStats, RobguideError>
    where
        F: FnMut(&ScanSnapshot, &ScanPeaks) -> ControlFlow<()>,
    {
        let sensor = self.sensor()?;
        let (mut reader, poll_interval) = {
            let mut sensor = lock(&sensor);
            sensor.start_continuous()?;
            (sensor.buffer().subscribe(), sensor.config().poll_interval())
        };

        loop {
            if let Some(snapshot) = reader.poll() {
                let peaks = self.peaks.find_scan(&snapshot.scan);
                if on_scan(&snapshot, &peaks).is_break() {
                    break;
                }
                continue;
            }
            if lock(&sensor).streaming_finished() {
                break;
            }
            std::thread::sleep(poll_interval);
        }

        let stats = lock(&sensor).stop_continuous()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let sequence = Sequence::new();
        assert_eq!(sequence.name(), "robguide-sequence");
        assert!(!sequence.has_sensor());
        assert!(!sequence.calibration().is_valid());
        assert_eq!(
            sequence.peak_engine().thresholds(),
            &PeakThresholds::default()
        );
    }

    #[test]
    fn test_without_sensor() {
        let mut sequence = Sequence::new();
        sequence.rename("weld seam");
        assert_eq!(sequence.name(), "weld seam");
        assert!(matches!(sequence.measure(), Err(RobguideError::NoSensor)));
        assert!(matches!(
            sequence.live_mode(|_, _| ControlFlow::Break(())),
            Err(RobguideError::NoSensor)
        ));
    }

    #[test]
    fn test_estimate_needs_calibration_and_peaks() {
        let sequence = Sequence::new();
        let peaks = ScanPeaks {
            left: vec![10],
            right: vec![],
        };
        assert!(matches!(
            sequence.estimate_offset(Axis::X, &peaks),
            Err(RobguideError::NoPeakPair)
        ));

        let peaks = ScanPeaks {
            left: vec![10],
            right: vec![20],
        };
        assert!(matches!(
            sequence.estimate_offset(Axis::X, &peaks),
            Err(RobguideError::Calibration(
                robguide_calib::CalibrationError::NotCalibrated
            ))
        ));
    }

    #[test]
    fn test_invalid_thresholds() {
        let res = Sequence::with_thresholds(PeakThresholds {
            minimum_distance: 0,
            ..Default::default()
        });
        assert!(matches!(res, Err(RobguideError::Peak(_))));
    }
}
