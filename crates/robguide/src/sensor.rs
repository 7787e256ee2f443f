use robguide_calib::{CalibrationError, IntrinsicModel};
use robguide_capture::{
    CaptureController, CaptureError, CaptureHandle, CaptureStats, FrameSource,
    IlluminationControl, StoppedCapture,
};
use robguide_scan::{ScanBuffer, ScanSnapshot};

use crate::config::SensorConfig;
use crate::error::RobguideError;
use crate::status::{NullIndicator, SensorStatus, StatusIndicator};

type BoxedSource = Box<dyn FrameSource + Send>;
type BoxedIllumination = Box<dyn IlluminationControl + Send>;

enum CaptureState {
    Ready(CaptureController<BoxedSource, BoxedIllumination>),
    Streaming(CaptureHandle<BoxedSource, BoxedIllumination>),
    // the capture thread panicked and took the hardware with it
    Lost,
}

/// A structured light sensor: its intrinsic model, its capture hardware and its status light.
///
/// The sensor either takes single shots or streams continuously on a dedicated capture
/// thread. Scans of both modes are published into the same [`ScanBuffer`].
pub struct Sensor {
    config: SensorConfig,
    intrinsics: IntrinsicModel,
    indicator: Box<dyn StatusIndicator>,
    buffer: ScanBuffer,
    state: CaptureState,
}

impl Sensor {
    /// Creates a sensor, loading the intrinsic record from `config.intrinsic_path`.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or the intrinsic record cannot be loaded.
    pub fn new<S, L>(
        config: SensorConfig,
        source: S,
        illumination: L,
    ) -> Result<Self, RobguideError>
    where
        S: FrameSource + Send + 'static,
        L: IlluminationControl + Send + 'static,
    {
        let intrinsics = IntrinsicModel::load(&config.intrinsic_path, config.capture.h_resolution)
            .map_err(CalibrationError::from)?;
        Self::with_intrinsics(config, intrinsics, source, illumination)
    }

    /// Creates a sensor with an already loaded intrinsic model.
    pub fn with_intrinsics<S, L>(
        config: SensorConfig,
        intrinsics: IntrinsicModel,
        source: S,
        illumination: L,
    ) -> Result<Self, RobguideError>
    where
        S: FrameSource + Send + 'static,
        L: IlluminationControl + Send + 'static,
    {
        config.validate()?;
        if intrinsics.h_resolution() != config.capture.h_resolution {
            return Err(CalibrationError::InvalidConfiguration(format!(
                "intrinsic model has {} pixels per line, capture has {}",
                intrinsics.h_resolution(),
                config.capture.h_resolution
            ))
            .into());
        }

        let controller = CaptureController::new(
            config.capture.clone(),
            Box::new(source) as BoxedSource,
            Box::new(illumination) as BoxedIllumination,
        )?;
        let buffer = controller.buffer().clone();

        let mut indicator: Box<dyn StatusIndicator> = Box::new(NullIndicator);
        indicator.show(SensorStatus::Idle);

        Ok(Self {
            config,
            intrinsics,
            indicator,
            buffer,
            state: CaptureState::Ready(controller),
        })
    }

    /// Replaces the status indicator and shows the current status on it.
    pub fn with_indicator(mut self, indicator: impl StatusIndicator + 'static) -> Self {
        self.indicator = Box::new(indicator);
        let status = if self.is_streaming() {
            SensorStatus::Scanning
        } else {
            SensorStatus::Idle
        };
        self.indicator.show(status);
        self
    }

    /// The sensor configuration.
    #[inline]
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// The intrinsic model of the camera pair.
    #[inline]
    pub fn intrinsics(&self) -> &IntrinsicModel {
        &self.intrinsics
    }

    /// The buffer every scan of the sensor is published into.
    #[inline]
    pub fn buffer(&self) -> &ScanBuffer {
        &self.buffer
    }

    /// Whether the sensor is streaming continuously.
    pub fn is_streaming(&self) -> bool {
        matches!(self.state, CaptureState::Streaming(_))
    }

    /// Whether a continuous capture has ended on its own, because a cycle failed.
    ///
    /// The error is returned by [`Sensor::stop_continuous`].
    pub fn streaming_finished(&self) -> bool {
        match &self.state {
            CaptureState::Streaming(handle) => handle.is_finished(),
            _ => false,
        }
    }

    /// Takes a single scan.
    ///
    /// # Errors
    ///
    /// [`RobguideError::SensorBusy`] while streaming, or the capture error of the cycle.
    pub fn grab_scan(&mut self) -> Result<ScanSnapshot, RobguideError> {
        let controller = match &mut self.state {
            CaptureState::Ready(controller) => controller,
            CaptureState::Streaming(_) => return Err(RobguideError::SensorBusy),
            CaptureState::Lost => return Err(CaptureError::CaptureThreadPanicked.into()),
        };

        self.indicator.show(SensorStatus::Active);
        let result = controller.capture_once();
        self.indicator.show(SensorStatus::Idle);
        Ok(result?)
    }

    /// Starts streaming on a dedicated capture thread.
    pub fn start_continuous(&mut self) -> Result<(), RobguideError> {
        match std::mem::replace(&mut self.state, CaptureState::Lost) {
            CaptureState::Ready(controller) => {
                log::info!("starting continuous capture");
                self.state = CaptureState::Streaming(controller.spawn());
                self.indicator.show(SensorStatus::Scanning);
                Ok(())
            }
            state @ CaptureState::Streaming(_) => {
                self.state = state;
                Err(RobguideError::SensorBusy)
            }
            CaptureState::Lost => Err(CaptureError::CaptureThreadPanicked.into()),
        }
    }

    /// Stops streaming and waits for the capture thread.
    ///
    /// # Returns
    ///
    /// The statistics of the capture loop, or the error that ended it. When the sensor is not
    /// streaming the statistics of the single shots are returned.
    pub fn stop_continuous(&mut self) -> Result<CaptureStats, RobguideError> {
        match std::mem::replace(&mut self.state, CaptureState::Lost) {
            CaptureState::Streaming(handle) => {
                let StoppedCapture { controller, result } = handle.stop()?;
                self.state = CaptureState::Ready(controller);
                self.indicator.show(SensorStatus::Idle);

                let stats = result?;
                log::info!(
                    "continuous capture stopped after {} cycles at {:.1} Hz",
                    stats.cycles,
                    stats.cycle_hz
                );
                Ok(stats)
            }
            CaptureState::Ready(controller) => {
                let stats = controller.stats();
                self.state = CaptureState::Ready(controller);
                Ok(stats)
            }
            CaptureState::Lost => Err(CaptureError::CaptureThreadPanicked.into()),
        }
    }
}

impl Drop for Sensor {
    fn drop(&mut self) {
        let state = std::mem::replace(&mut self.state, CaptureState::Lost);
        if let CaptureState::Streaming(handle) = state {
            match handle.stop() {
                Ok(StoppedCapture { result: Err(e), .. }) => {
                    log::warn!("capture loop ended with an error: {e}")
                }
                Err(e) => log::error!("failed to stop the capture thread: {e}"),
                Ok(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use robguide_capture::synthetic::{SyntheticLamp, SyntheticStripeSource};
    use robguide_capture::CaptureConfig;

    use super::*;

    const RECORD: &str = "-50,0,1.1,8,50,0,2.0,8,0.003";

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<SensorStatus>>>);

    impl StatusIndicator for Recorder {
        fn show(&mut self, status: SensorStatus) {
            self.0.lock().unwrap().push(status);
        }
    }

    fn test_sensor() -> (Sensor, SyntheticLamp) {
        let config = SensorConfig {
            capture: CaptureConfig {
                h_resolution: 64,
                v_resolution: 1,
                scan_row: 0,
                max_attempts: 2,
                illumination_settle_ms: 0,
            },
            ..Default::default()
        };
        let lamp = SyntheticLamp::new();
        let source = SyntheticStripeSource::new(64, 1, lamp.clone());
        let intrinsics = IntrinsicModel::from_record(RECORD, 64).unwrap();
        let sensor = Sensor::with_intrinsics(config, intrinsics, source, lamp.clone()).unwrap();
        (sensor, lamp)
    }

    #[test]
    fn test_resolution_mismatch() {
        let lamp = SyntheticLamp::new();
        let source = SyntheticStripeSource::new(64, 1, lamp.clone());
        let intrinsics = IntrinsicModel::from_record(RECORD, 1280).unwrap();
        let config = SensorConfig {
            capture: CaptureConfig {
                h_resolution: 64,
                v_resolution: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let res = Sensor::with_intrinsics(config, intrinsics, source, lamp);
        assert!(matches!(res, Err(RobguideError::Calibration(_))));
    }

    #[test]
    fn test_missing_intrinsic_record() {
        let dir = tempfile::tempdir().unwrap();
        let config = SensorConfig {
            intrinsic_path: dir.path().join("cal.csv"),
            ..Default::default()
        };
        let lamp = SyntheticLamp::new();
        let source = SyntheticStripeSource::new(1280, 32, lamp.clone());
        assert!(matches!(
            Sensor::new(config, source, lamp),
            Err(RobguideError::Calibration(CalibrationError::Load(_)))
        ));
    }

    #[test]
    fn test_single_shot_status() {
        let (sensor, _lamp) = test_sensor();
        let recorder = Recorder::default();
        let mut sensor = sensor.with_indicator(recorder.clone());

        let snapshot = sensor.grab_scan().unwrap();
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(sensor.buffer().sequence(), 1);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![SensorStatus::Idle, SensorStatus::Active, SensorStatus::Idle]
        );
    }

    #[test]
    fn test_streaming_lifecycle() {
        let (sensor, lamp) = test_sensor();
        let recorder = Recorder::default();
        let mut sensor = sensor.with_indicator(recorder.clone());

        sensor.start_continuous().unwrap();
        assert!(sensor.is_streaming());
        assert!(matches!(sensor.grab_scan(), Err(RobguideError::SensorBusy)));
        assert!(matches!(
            sensor.start_continuous(),
            Err(RobguideError::SensorBusy)
        ));

        while sensor.buffer().sequence() < 3 {
            std::thread::yield_now();
        }

        let stats = sensor.stop_continuous().unwrap();
        assert!(stats.cycles >= 3);
        assert!(!sensor.is_streaming());
        assert!(!lamp.is_lit());
        assert_eq!(
            recorder.0.lock().unwrap().last(),
            Some(&SensorStatus::Idle)
        );

        // the controller is back for single shots
        assert!(sensor.grab_scan().is_ok());
    }

    #[test]
    fn test_drop_stops_streaming() {
        let (mut sensor, lamp) = test_sensor();
        sensor.start_continuous().unwrap();
        drop(sensor);
        assert!(!lamp.is_lit());
    }
}
