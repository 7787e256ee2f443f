/// What the sensor is doing, as shown on its status light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStatus {
    /// Waiting for a command.
    Idle,
    /// Taking single shots or calibrating.
    Active,
    /// Streaming scans continuously.
    Scanning,
}

impl SensorStatus {
    /// RGB colour of the status light: green, blue or red.
    pub fn color(self) -> [u8; 3] {
        match self {
            SensorStatus::Idle => [0, 255, 0],
            SensorStatus::Active => [0, 0, 255],
            SensorStatus::Scanning => [255, 0, 0],
        }
    }
}

impl std::fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorStatus::Idle => write!(f, "idle"),
            SensorStatus::Active => write!(f, "active"),
            SensorStatus::Scanning => write!(f, "scanning"),
        }
    }
}

/// Something that shows the status of the sensor, typically an RGB light.
pub trait StatusIndicator: Send {
    /// Shows a new status.
    fn show(&mut self, status: SensorStatus);
}

/// An indicator that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIndicator;

impl StatusIndicator for NullIndicator {
    fn show(&mut self, _status: SensorStatus) {}
}

impl<T: StatusIndicator + ?Sized> StatusIndicator for Box<T> {
    fn show(&mut self, status: SensorStatus) {
        (**self).show(status)
    }
}
