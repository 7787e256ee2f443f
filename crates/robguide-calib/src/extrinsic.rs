use robguide_scan::Side;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::linefit::{LineFit, LineMoments};

/// A robot axis: three translations followed by three rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Translation along x.
    X,
    /// Translation along y.
    Y,
    /// Translation along z.
    Z,
    /// Rotation about x.
    A,
    /// Rotation about y.
    B,
    /// Rotation about z.
    C,
}

impl Axis {
    /// All axes in calibration order.
    pub const ALL: [Axis; 6] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B, Axis::C];

    /// Position of the axis in [`Axis::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Single letter name of the axis.
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::A => "A",
            Axis::B => "B",
            Axis::C => "C",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One calibration observation: the commanded axis offset and the peak seen by each camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Commanded axis offset, in mm for translations and radians for rotations.
    pub offset: f64,
    /// Peak pixel on the left line.
    pub left: f64,
    /// Peak pixel on the right line.
    pub right: f64,
}

impl Observation {
    /// Peak pixel of the given side.
    #[inline]
    pub fn pixel(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Pixel displacement per unit of robot axis motion, for every axis and camera.
///
/// Row `2k` holds the left camera and row `2k + 1` the right camera of axis `k`, in
/// [`Axis::ALL`] order. Column 0 is the slope in pixels per unit offset, column 1 the pixel
/// position at zero offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensitivityMatrix {
    rows: [[f64; 2]; 12],
}

impl SensitivityMatrix {
    /// Number of rows of the matrix.
    pub const ROWS: usize = 12;

    /// Creates a matrix from its rows.
    pub fn from_rows(rows: [[f64; 2]; 12]) -> Self {
        Self { rows }
    }

    /// The rows of the matrix.
    #[inline]
    pub fn rows(&self) -> &[[f64; 2]; 12] {
        &self.rows
    }

    /// Row holding the given axis and side.
    #[inline]
    pub fn row_index(axis: Axis, side: Side) -> usize {
        2 * axis.index() + side.index()
    }

    /// Slope of the pixel position of `side` with respect to `axis`.
    #[inline]
    pub fn sensitivity(&self, axis: Axis, side: Side) -> f64 {
        self.rows[Self::row_index(axis, side)][0]
    }

    /// Pixel position of `side` at zero offset of `axis`.
    #[inline]
    pub fn intercept(&self, axis: Axis, side: Side) -> f64 {
        self.rows[Self::row_index(axis, side)][1]
    }

    /// Expected pixel position of `side` at the given offset of `axis`.
    pub fn predict(&self, axis: Axis, side: Side, offset: f64) -> f64 {
        self.intercept(axis, side) + self.sensitivity(axis, side) * offset
    }

    fn is_finite(&self) -> bool {
        self.rows.iter().flatten().all(|v| v.is_finite())
    }
}

/// The line fits of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFit {
    /// The fitted axis.
    pub axis: Axis,
    /// Fit of the left peak against the offset.
    pub left: LineFit,
    /// Fit of the right peak against the offset.
    pub right: LineFit,
}

/// Collects calibration observations per axis and fits the [`SensitivityMatrix`].
///
/// The collection is a plain accumulator: the caller moves the robot, extracts the peaks and
/// records them here. Until a fit is committed (or a matrix is set) the calibration is invalid
/// and [`ExtrinsicCalibration::matrix`] fails.
///
/// # Examples
///
/// ```
/// use robguide_calib::{Axis, ExtrinsicCalibration};
///
/// let mut calibration = ExtrinsicCalibration::new();
/// for axis in Axis::ALL {
///     for offset in [-1.0, 0.0, 1.0] {
///         calibration.record(axis, offset, 600.0 + offset, 700.0 - offset).unwrap();
///     }
/// }
/// calibration.fit().unwrap();
/// assert!(calibration.is_valid());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtrinsicCalibration {
    observations: [Vec<Observation>; 6],
    matrix: SensitivityMatrix,
    valid: bool,
}

impl ExtrinsicCalibration {
    /// Creates an empty, invalid calibration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observation to the table of `axis`.
    ///
    /// # Errors
    ///
    /// Fails with [`CalibrationError::InvalidObservation`] when a value is not finite.
    pub fn record(
        &mut self,
        axis: Axis,
        offset: f64,
        left: f64,
        right: f64,
    ) -> Result<(), CalibrationError> {
        if !(offset.is_finite() && left.is_finite() && right.is_finite()) {
            return Err(CalibrationError::InvalidObservation { axis });
        }
        self.observations[axis.index()].push(Observation {
            offset,
            left,
            right,
        });
        Ok(())
    }

    /// The observations of `axis` in recording order.
    #[inline]
    pub fn observations(&self, axis: Axis) -> &[Observation] {
        &self.observations[axis.index()]
    }

    /// Total number of observations over all axes.
    pub fn observation_count(&self) -> usize {
        self.observations.iter().map(Vec::len).sum()
    }

    /// Fits the sensitivity matrix from the recorded observations.
    ///
    /// Every axis is fitted before anything is committed: if one axis fails, the previous
    /// matrix and validity are left as they were.
    ///
    /// # Returns
    ///
    /// The fits of every axis in [`Axis::ALL`] order.
    ///
    /// # Errors
    ///
    /// [`CalibrationError::InsufficientData`] when an axis has fewer than two distinct offsets,
    /// [`CalibrationError::DegenerateSpread`] when they are too close together to fit.
    pub fn fit(&mut self) -> Result<Vec<AxisFit>, CalibrationError> {
        let fits = Axis::ALL
            .iter()
            .map(|&axis| self.fit_axis(axis))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = [[0.0; 2]; 12];
        for fit in &fits {
            for (side, line) in [(Side::Left, fit.left), (Side::Right, fit.right)] {
                rows[SensitivityMatrix::row_index(fit.axis, side)] = [line.slope, line.intercept];
            }
            log::info!(
                "axis {}: left {:.4} px/unit (rms {:.3}), right {:.4} px/unit (rms {:.3})",
                fit.axis,
                fit.left.slope,
                fit.left.rms,
                fit.right.slope,
                fit.right.rms
            );
        }

        self.matrix = SensitivityMatrix::from_rows(rows);
        self.valid = true;
        Ok(fits)
    }

    fn fit_axis(&self, axis: Axis) -> Result<AxisFit, CalibrationError> {
        let observations = self.observations(axis);

        let mut offsets: Vec<f64> = observations.iter().map(|o| o.offset).collect();
        offsets.sort_by(f64::total_cmp);
        offsets.dedup();

        if offsets.len() < 2 {
            return Err(CalibrationError::InsufficientData {
                axis,
                observations: observations.len(),
                distinct_positions: offsets.len(),
            });
        }

        let side_fit = |side: Side| {
            observations
                .iter()
                .map(|o| (o.offset, o.pixel(side)))
                .collect::<LineMoments>()
                .fit()
                .ok_or(CalibrationError::DegenerateSpread { axis })
        };

        Ok(AxisFit {
            axis,
            left: side_fit(Side::Left)?,
            right: side_fit(Side::Right)?,
        })
    }

    /// Replaces the matrix with an externally obtained one and marks the calibration valid.
    pub fn set(&mut self, matrix: SensitivityMatrix) -> Result<(), CalibrationError> {
        if !matrix.is_finite() {
            return Err(CalibrationError::InvalidConfiguration(
                "sensitivity matrix holds non-finite values".to_string(),
            ));
        }
        self.matrix = matrix;
        self.valid = true;
        Ok(())
    }

    /// The fitted matrix.
    ///
    /// # Errors
    ///
    /// [`CalibrationError::NotCalibrated`] until a fit was committed or a matrix was set.
    pub fn matrix(&self) -> Result<&SensitivityMatrix, CalibrationError> {
        if !self.valid {
            return Err(CalibrationError::NotCalibrated);
        }
        Ok(&self.matrix)
    }

    /// Whether a matrix has been committed since creation or the last reset.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Clears every observation table and invalidates the matrix.
    pub fn reset(&mut self) {
        for table in self.observations.iter_mut() {
            table.clear();
        }
        self.matrix = SensitivityMatrix::default();
        self.valid = false;
    }

    /// Estimates the offset of `axis` from a pair of observed peaks.
    ///
    /// Both cameras contribute to a least squares estimate weighted by their sensitivity, so
    /// a camera that barely sees the axis barely influences the result.
    ///
    /// # Arguments
    ///
    /// * `axis` - The axis whose offset is estimated.
    /// * `left` - Observed peak pixel on the left line.
    /// * `right` - Observed peak pixel on the right line.
    pub fn estimate_offset(
        &self,
        axis: Axis,
        left: f64,
        right: f64,
    ) -> Result<f64, CalibrationError> {
        let matrix = self.matrix()?;

        let (mut num, mut den) = (0.0, 0.0);
        for (side, pixel) in [(Side::Left, left), (Side::Right, right)] {
            let slope = matrix.sensitivity(axis, side);
            num += slope * (pixel - matrix.intercept(axis, side));
            den += slope * slope;
        }

        if den < 1e-12 {
            return Err(CalibrationError::DegenerateSensitivity { axis });
        }
        Ok(num / den)
    }
}
