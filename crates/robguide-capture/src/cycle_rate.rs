use std::time::Instant;

/// The smoothing factor for the rate estimate.
const SMOOTHING: f32 = 0.95;

/// Exponentially smoothed rate of completed capture cycles.
///
/// # Examples
///
/// ```
/// use robguide_capture::cycle_rate::CycleRate;
///
/// let mut rate = CycleRate::new();
/// for _ in 0..10 {
///     rate.tick();
/// }
/// assert!(rate.hz() >= 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct CycleRate {
    last_time: Option<Instant>,
    hz: f32,
}

impl CycleRate {
    /// Creates a counter that has not seen any cycle yet.
    pub fn new() -> Self {
        Self {
            last_time: None,
            hz: 0.0,
        }
    }

    /// The smoothed number of cycles per second, 0 until two cycles completed.
    #[inline]
    pub fn hz(&self) -> f32 {
        self.hz
    }

    /// Records the completion of one cycle.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(last_time) = self.last_time {
            let elapsed = now.duration_since(last_time).as_secs_f32();
            if elapsed > 0.0 {
                let instant_hz = 1.0 / elapsed;
                self.hz = if self.hz == 0.0 {
                    instant_hz
                } else {
                    self.hz * SMOOTHING + instant_hz * (1.0 - SMOOTHING)
                };
            }
        }
        self.last_time = Some(now);
    }
}

impl Default for CycleRate {
    fn default() -> Self {
        Self::new()
    }
}
