use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info, warn};
use robguide_scan::{DifferencedScan, ScanBuffer, ScanSnapshot};
use serde::{Deserialize, Serialize};

use crate::cycle_rate::CycleRate;
use crate::error::CaptureError;
use crate::source::{FrameSource, IlluminationControl, RawFrame};

/// Configuration of the capture state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Number of samples per camera in one scan line.
    pub h_resolution: usize,
    /// Number of rows the camera delivers per frame.
    pub v_resolution: usize,
    /// Row of the frame used as the scan line.
    pub scan_row: usize,
    /// Capture attempts per phase before the cycle fails.
    pub max_attempts: u32,
    /// Time given to the illumination to settle after switching, in milliseconds.
    pub illumination_settle_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            h_resolution: 1280,
            v_resolution: 32,
            scan_row: 0,
            max_attempts: 3,
            illumination_settle_ms: 50,
        }
    }
}

impl CaptureConfig {
    /// Number of samples in one side-by-side stereo row.
    #[inline]
    pub fn stereo_width(&self) -> usize {
        2 * self.h_resolution
    }

    /// Settle time after switching the illumination.
    #[inline]
    pub fn illumination_settle(&self) -> Duration {
        Duration::from_millis(self.illumination_settle_ms)
    }

    /// Checks the configuration for values the state machine cannot work with.
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.h_resolution == 0 {
            return Err(CaptureError::InvalidConfig(
                "h_resolution must be positive".to_string(),
            ));
        }
        if self.scan_row >= self.v_resolution {
            return Err(CaptureError::InvalidConfig(format!(
                "scan_row {} is outside the {} frame rows",
                self.scan_row, self.v_resolution
            )));
        }
        if self.max_attempts == 0 {
            return Err(CaptureError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The phase of the capture cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    /// No cycle in progress, illumination off.
    Idle,
    /// Illumination on, capturing the lit frame.
    CapturingLit,
    /// Illumination off, capturing the unlit frame.
    CapturingUnlit,
}

impl std::fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapturePhase::Idle => write!(f, "idle"),
            CapturePhase::CapturingLit => write!(f, "capturing lit frame"),
            CapturePhase::CapturingUnlit => write!(f, "capturing unlit frame"),
        }
    }
}

/// Counters of the capture controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CaptureStats {
    /// Completed and published cycles.
    pub cycles: u64,
    /// Cycles that failed.
    pub failures: u64,
    /// Frame captures that failed and were retried.
    pub retries: u64,
    /// Smoothed rate of completed cycles per second.
    pub cycle_hz: f32,
}

/// Drives the illumination and the frame source through lit/unlit capture cycles and
/// publishes the differenced scans into a [`ScanBuffer`].
///
/// Each cycle switches the illumination on, captures the lit frame, switches it off,
/// captures the unlit frame and publishes `clamp(lit - unlit, 0, 255)`. Which slot a frame
/// lands in is decided by the controller's own phase, never by reading the illumination
/// state back from hardware.
pub struct CaptureController<S: FrameSource, L: IlluminationControl> {
    config: CaptureConfig,
    source: S,
    illumination: L,
    buffer: ScanBuffer,
    phase: CapturePhase,
    stats: CaptureStats,
    rate: CycleRate,
}

impl<S: FrameSource, L: IlluminationControl> CaptureController<S, L> {
    /// Creates a controller and switches the illumination off.
    ///
    /// # Arguments
    ///
    /// * `config` - The capture configuration.
    /// * `source` - The camera delivering raw frames.
    /// * `illumination` - The switchable scan illumination.
    pub fn new(
        config: CaptureConfig,
        source: S,
        mut illumination: L,
    ) -> Result<Self, CaptureError> {
        config.validate()?;
        illumination.set(false)?;

        Ok(Self {
            config,
            source,
            illumination,
            buffer: ScanBuffer::new(),
            phase: CapturePhase::Idle,
            stats: CaptureStats::default(),
            rate: CycleRate::new(),
        })
    }

    /// The buffer the controller publishes into.
    #[inline]
    pub fn buffer(&self) -> &ScanBuffer {
        &self.buffer
    }

    /// The capture configuration.
    #[inline]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// The current phase of the capture cycle.
    #[inline]
    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// The controller counters.
    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            cycle_hz: self.rate.hz(),
            ..self.stats
        }
    }

    /// Consumes the controller and returns the frame source and the illumination.
    pub fn into_parts(self) -> (S, L) {
        (self.source, self.illumination)
    }

    /// Runs one capture cycle and publishes its scan.
    ///
    /// On failure the buffer keeps its last published value and the illumination is
    /// switched off.
    pub fn capture_once(&mut self) -> Result<ScanSnapshot, CaptureError> {
        let scan = match self.cycle() {
            Ok(scan) => scan,
            Err(err) => {
                self.stats.failures += 1;
                self.phase = CapturePhase::Idle;
                if let Err(off_err) = self.illumination.set(false) {
                    error!("Failed to switch the illumination off after a failed cycle: {off_err}");
                }
                error!("Capture cycle failed: {err}");
                return Err(err);
            }
        };

        let snapshot = self.buffer.publish(scan);
        self.stats.cycles += 1;
        self.rate.tick();
        debug!("Published scan {}", snapshot.sequence);

        Ok(snapshot)
    }

    /// Runs capture cycles until `stop` is set or a cycle fails.
    ///
    /// The stop flag is checked between full cycles only, and the illumination is switched
    /// off before returning.
    pub fn run_continuous(&mut self, stop: &AtomicBool) -> Result<CaptureStats, CaptureError> {
        info!("Continuous capture started");

        let result = loop {
            if stop.load(Ordering::SeqCst) {
                break Ok(());
            }
            if let Err(err) = self.capture_once() {
                break Err(err);
            }
        };

        self.phase = CapturePhase::Idle;
        let off = self.illumination.set(false);
        if let (Err(_), Err(off_err)) = (&result, &off) {
            error!("Failed to switch the illumination off after continuous capture: {off_err}");
        }

        let stats = self.stats();
        info!(
            "Continuous capture stopped after {} cycles ({:.1} Hz, {} retries)",
            stats.cycles, stats.cycle_hz, stats.retries
        );

        result?;
        off?;
        Ok(stats)
    }

    fn cycle(&mut self) -> Result<DifferencedScan, CaptureError> {
        self.switch(CapturePhase::CapturingLit)?;
        let lit = self.capture_row()?;

        self.switch(CapturePhase::CapturingUnlit)?;
        let unlit = self.capture_row()?;

        self.phase = CapturePhase::Idle;
        Ok(DifferencedScan::from_rows(&lit, &unlit)?)
    }

    fn switch(&mut self, phase: CapturePhase) -> Result<(), CaptureError> {
        self.illumination.set(phase == CapturePhase::CapturingLit)?;
        self.phase = phase;

        let settle = self.config.illumination_settle();
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
        Ok(())
    }

    fn capture_row(&mut self) -> Result<Vec<u8>, CaptureError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.source.capture_frame() {
                Ok(frame) => return self.extract_row(&frame),
                Err(err) if attempts < self.config.max_attempts => {
                    self.stats.retries += 1;
                    warn!(
                        "Frame capture failed while {} (attempt {attempts}/{}), retrying: {err}",
                        self.phase, self.config.max_attempts
                    );
                }
                Err(source) => {
                    return Err(CaptureError::CaptureFailure {
                        phase: self.phase,
                        attempts,
                        source,
                    })
                }
            }
        }
    }

    fn extract_row(&self, frame: &RawFrame) -> Result<Vec<u8>, CaptureError> {
        let expected = self.config.stereo_width();
        match frame.row(self.config.scan_row) {
            Some(row) if frame.width == expected => Ok(row.to_vec()),
            _ => Err(CaptureError::InvalidFrame {
                width: frame.width,
                height: frame.height,
                row: self.config.scan_row,
                expected,
            }),
        }
    }
}

impl<S, L> CaptureController<S, L>
where
    S: FrameSource + Send + 'static,
    L: IlluminationControl + Send + 'static,
{
    /// Moves the controller onto a dedicated capture thread running continuous mode.
    ///
    /// The thread owns the frame source and the illumination exclusively; results are only
    /// shared through the scan buffer.
    pub fn spawn(self) -> CaptureHandle<S, L> {
        let stop = Arc::new(AtomicBool::new(false));
        let buffer = self.buffer.clone();

        let thread = std::thread::spawn({
            let stop = stop.clone();
            move || {
                let mut controller = self;
                let result = controller.run_continuous(&stop);
                StoppedCapture { controller, result }
            }
        });

        CaptureHandle {
            stop,
            buffer,
            thread,
        }
    }
}

/// The controller returned by a stopped capture thread, with the outcome of its loop.
pub struct StoppedCapture<S: FrameSource, L: IlluminationControl> {
    /// The controller, ready for further use.
    pub controller: CaptureController<S, L>,
    /// The statistics of the loop, or the error that ended it.
    pub result: Result<CaptureStats, CaptureError>,
}

/// Handle to a capture thread started with [`CaptureController::spawn`].
pub struct CaptureHandle<S: FrameSource, L: IlluminationControl> {
    stop: Arc<AtomicBool>,
    buffer: ScanBuffer,
    thread: JoinHandle<StoppedCapture<S, L>>,
}

impl<S: FrameSource, L: IlluminationControl> CaptureHandle<S, L> {
    /// The buffer the capture thread publishes into.
    #[inline]
    pub fn buffer(&self) -> &ScanBuffer {
        &self.buffer
    }

    /// Whether the capture loop has exited, either because it was stopped or because a
    /// cycle failed.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Signals the loop to stop after its current cycle and waits for it.
    pub fn stop(self) -> Result<StoppedCapture<S, L>, CaptureError> {
        self.stop.store(true, Ordering::SeqCst);
        self.thread
            .join()
            .map_err(|_| CaptureError::CaptureThreadPanicked)
    }
}
