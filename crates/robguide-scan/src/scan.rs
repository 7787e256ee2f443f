use crate::error::ScanError;

/// One of the two cameras of the stereo sensor, as seen from the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The left camera, first half of the stereo row.
    Left,
    /// The right camera, second half of the stereo row.
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// Column index of the side, 0 for left and 1 for right.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// A single row of 8-bit intensity samples from one camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanLine(Vec<u8>);

impl ScanLine {
    /// Wraps a row of samples.
    pub fn new(samples: Vec<u8>) -> Self {
        Self(samples)
    }

    /// Creates a scan line of `len` samples all set to `value`.
    pub fn from_value(len: usize, value: u8) -> Self {
        Self(vec![value; len])
    }

    /// The samples of the line.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of samples in the line.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the line holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the line and returns its samples.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for ScanLine {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Subtract an unlit row from a lit row, clamping the result to `[0, 255]`.
///
/// The subtraction is carried out in `i16` so that samples darker in the lit row than in the
/// unlit row clamp to zero instead of wrapping around.
///
/// # Arguments
///
/// * `lit` - The row captured with the scan illumination on.
/// * `unlit` - The row captured with the scan illumination off.
///
/// # Returns
///
/// The differenced row, or [`ScanError::LengthMismatch`] when the rows differ in length.
///
/// # Examples
///
/// ```
/// use robguide_scan::difference_row;
///
/// let diff = difference_row(&[200, 10, 0], &[50, 40, 0]).unwrap();
/// assert_eq!(diff, vec![150, 0, 0]);
/// ```
pub fn difference_row(lit: &[u8], unlit: &[u8]) -> Result<Vec<u8>, ScanError> {
    if lit.len() != unlit.len() {
        return Err(ScanError::LengthMismatch {
            lit: lit.len(),
            unlit: unlit.len(),
        });
    }

    Ok(lit
        .iter()
        .zip(unlit)
        .map(|(&on, &off)| (on as i16 - off as i16).clamp(0, 255) as u8)
        .collect())
}

/// A lit-minus-unlit stereo scan, split into its left and right camera lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifferencedScan {
    left: ScanLine,
    right: ScanLine,
}

impl DifferencedScan {
    /// Creates a scan from already differenced left and right lines.
    pub fn new(left: ScanLine, right: ScanLine) -> Result<Self, ScanError> {
        if left.len() != right.len() {
            return Err(ScanError::SideMismatch {
                left: left.len(),
                right: right.len(),
            });
        }
        Ok(Self { left, right })
    }

    /// Differences two side-by-side stereo rows and splits the result at the midpoint.
    ///
    /// # Arguments
    ///
    /// * `lit` - The stereo row (left half then right half) captured with illumination on.
    /// * `unlit` - The stereo row captured with illumination off.
    pub fn from_rows(lit: &[u8], unlit: &[u8]) -> Result<Self, ScanError> {
        let mut diff = difference_row(lit, unlit)?;
        if diff.len() % 2 != 0 {
            return Err(ScanError::OddLength(diff.len()));
        }

        let right = diff.split_off(diff.len() / 2);
        Ok(Self {
            left: ScanLine::new(diff),
            right: ScanLine::new(right),
        })
    }

    /// The line of the given side.
    #[inline]
    pub fn side(&self, side: Side) -> &ScanLine {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// The left camera line.
    #[inline]
    pub fn left(&self) -> &ScanLine {
        &self.left
    }

    /// The right camera line.
    #[inline]
    pub fn right(&self) -> &ScanLine {
        &self.right
    }

    /// Number of samples per side.
    #[inline]
    pub fn resolution(&self) -> usize {
        self.left.len()
    }
}
