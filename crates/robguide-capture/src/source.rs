use crate::error::{FrameSourceError, IlluminationError};

/// A raw 8-bit intensity frame as delivered by the camera.
///
/// The stereo camera delivers the left and right images side by side, so one row holds
/// `2 × h_resolution` samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Row-major samples.
    pub data: Vec<u8>,
    /// Number of samples per row.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl RawFrame {
    /// Creates a frame, returning `None` if `data` does not hold `width × height` samples.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            data,
            width,
            height,
        })
    }

    /// The samples of row `y`, if the frame holds it.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        let start = y.checked_mul(self.width)?;
        self.data.get(start..start + self.width)
    }
}

/// A camera able to capture one raw frame on demand.
pub trait FrameSource {
    /// Captures one frame.
    ///
    /// Errors are considered transient: the capture controller discards the attempt and
    /// retries within its retry budget.
    fn capture_frame(&mut self) -> Result<RawFrame, FrameSourceError>;
}

/// The switchable scan illumination.
pub trait IlluminationControl {
    /// Switches the illumination on or off.
    ///
    /// The new state must be in effect before the next frame capture completes.
    fn set(&mut self, on: bool) -> Result<(), IlluminationError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn capture_frame(&mut self) -> Result<RawFrame, FrameSourceError> {
        (**self).capture_frame()
    }
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn capture_frame(&mut self) -> Result<RawFrame, FrameSourceError> {
        (**self).capture_frame()
    }
}

impl<T: IlluminationControl + ?Sized> IlluminationControl for Box<T> {
    fn set(&mut self, on: bool) -> Result<(), IlluminationError> {
        (**self).set(on)
    }
}

impl<T: IlluminationControl + ?Sized> IlluminationControl for &mut T {
    fn set(&mut self, on: bool) -> Result<(), IlluminationError> {
        (**self).set(on)
    }
}
