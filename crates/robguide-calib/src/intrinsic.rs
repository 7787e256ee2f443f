use std::path::Path;

use robguide_scan::Side;

use crate::error::{CalibrationError, CalibrationLoadError};

/// Field names of the intrinsic record, in record order.
const FIELDS: [&str; 9] = [
    "offset_x_l",
    "offset_y_l",
    "beta_0_l",
    "focal_l",
    "offset_x_r",
    "offset_y_r",
    "beta_0_r",
    "focal_r",
    "pixel_size",
];

/// Fixed optical geometry of one camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraGeometry {
    /// Lens position along the sensor x axis in mm.
    pub offset_x: f64,
    /// Lens position along the sensor y axis in mm.
    pub offset_y: f64,
    /// Boresight angle of the camera in radians, measured from the sensor x axis.
    pub beta_0: f64,
    /// Focal length in mm.
    pub focal_length: f64,
}

impl CameraGeometry {
    /// Angular field of view in radians of a line of `h_resolution` pixels of `pixel_size` mm.
    pub fn angular_fov(&self, h_resolution: usize, pixel_size: f64) -> f64 {
        2.0 * ((h_resolution as f64 * pixel_size) / (2.0 * self.focal_length)).atan()
    }
}

/// The intrinsic model of the stereo camera pair.
///
/// The model is loaded once from a record of nine comma separated values
///
/// ```text
/// offset_x_l, offset_y_l, beta_0_l, focal_l, offset_x_r, offset_y_r, beta_0_r, focal_r, pixel_size
/// ```
///
/// and is immutable afterwards.
///
/// # Examples
///
/// ```
/// use robguide_calib::IntrinsicModel;
/// use robguide_scan::Side;
///
/// let model =
///     IntrinsicModel::from_record("-50,0,1.1,8,50,0,2.0,8,0.003", 1280).unwrap();
/// assert_eq!(model.camera(Side::Right).focal_length, 8.0);
/// assert!(model.angular_fov(Side::Left) > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicModel {
    left: CameraGeometry,
    right: CameraGeometry,
    pixel_size: f64,
    h_resolution: usize,
}

impl IntrinsicModel {
    /// Parses an intrinsic record.
    ///
    /// # Arguments
    ///
    /// * `record` - The nine comma separated fields.
    /// * `h_resolution` - Number of pixels per camera line.
    ///
    /// # Errors
    ///
    /// Fails when the record does not hold exactly nine finite numbers, or when a focal length,
    /// the pixel size or the resolution is not strictly positive.
    pub fn from_record(record: &str, h_resolution: usize) -> Result<Self, CalibrationLoadError> {
        let record = record.trim();
        if record.is_empty() {
            return Err(CalibrationLoadError::Empty);
        }

        let raw: Vec<&str> = record.split(',').map(str::trim).collect();
        if raw.len() != FIELDS.len() {
            return Err(CalibrationLoadError::FieldCount {
                expected: FIELDS.len(),
                found: raw.len(),
            });
        }

        let mut values = [0.0; 9];
        for ((value, text), field) in values.iter_mut().zip(&raw).zip(FIELDS) {
            *value = match text.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    return Err(CalibrationLoadError::Malformed {
                        field,
                        value: text.to_string(),
                    })
                }
            };
        }

        for index in [3, 7, 8] {
            if values[index] <= 0.0 {
                return Err(CalibrationLoadError::NonPositive {
                    field: FIELDS[index],
                    value: values[index],
                });
            }
        }
        if h_resolution == 0 {
            return Err(CalibrationLoadError::NonPositive {
                field: "h_resolution",
                value: 0.0,
            });
        }

        Ok(Self {
            left: CameraGeometry {
                offset_x: values[0],
                offset_y: values[1],
                beta_0: values[2],
                focal_length: values[3],
            },
            right: CameraGeometry {
                offset_x: values[4],
                offset_y: values[5],
                beta_0: values[6],
                focal_length: values[7],
            },
            pixel_size: values[8],
            h_resolution,
        })
    }

    /// Loads the intrinsic record from a file.
    ///
    /// The first non-empty line of the file is the record.
    pub fn load(path: impl AsRef<Path>, h_resolution: usize) -> Result<Self, CalibrationLoadError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| CalibrationLoadError::Missing {
                path: path.to_path_buf(),
                source,
            })?;

        let record = contents
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or(CalibrationLoadError::Empty)?;

        let model = Self::from_record(record, h_resolution)?;
        log::debug!(
            "loaded intrinsic record from {}: fov left {:.4} rad, right {:.4} rad",
            path.display(),
            model.angular_fov(Side::Left),
            model.angular_fov(Side::Right)
        );
        Ok(model)
    }

    /// The geometry of one camera.
    #[inline]
    pub fn camera(&self, side: Side) -> &CameraGeometry {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Pixel pitch in mm, shared by both cameras.
    #[inline]
    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    /// Number of pixels per camera line.
    #[inline]
    pub fn h_resolution(&self) -> usize {
        self.h_resolution
    }

    /// Angular field of view of one camera in radians.
    pub fn angular_fov(&self, side: Side) -> f64 {
        self.camera(side).angular_fov(self.h_resolution, self.pixel_size)
    }

    /// Direction in radians, from the sensor x axis, of the ray seen by a pixel.
    ///
    /// The line centre at `(h_resolution - 1) / 2` looks along the boresight `beta_0`, pixels
    /// to either side deviate by the pinhole angle `atan(d · pixel_size / focal_length)`.
    pub fn pixel_angle(&self, side: Side, pixel: f64) -> f64 {
        let camera = self.camera(side);
        let centre = (self.h_resolution as f64 - 1.0) / 2.0;
        camera.beta_0 - ((pixel - centre) * self.pixel_size / camera.focal_length).atan()
    }

    /// Intersects the rays of a left and a right pixel in the light plane.
    ///
    /// # Arguments
    ///
    /// * `left` - Pixel position on the left line.
    /// * `right` - Pixel position on the right line.
    ///
    /// # Returns
    ///
    /// The point `[x, y, 0]` in mm in the sensor frame, or [`CalibrationError::ParallelRays`].
    pub fn triangulate(&self, left: f64, right: f64) -> Result<[f64; 3], CalibrationError> {
        let ray = |side: Side, pixel: f64| {
            let camera = self.camera(side);
            let angle = self.pixel_angle(side, pixel);
            (
                [camera.offset_x, camera.offset_y],
                [angle.cos(), angle.sin()],
            )
        };
        let cross = |a: [f64; 2], b: [f64; 2]| a[0] * b[1] - a[1] * b[0];

        let (origin_l, dir_l) = ray(Side::Left, left);
        let (origin_r, dir_r) = ray(Side::Right, right);

        let denom = cross(dir_l, dir_r);
        if denom.abs() < 1e-12 {
            return Err(CalibrationError::ParallelRays);
        }

        let baseline = [origin_r[0] - origin_l[0], origin_r[1] - origin_l[1]];
        let t = cross(baseline, dir_r) / denom;

        Ok([origin_l[0] + t * dir_l[0], origin_l[1] + t * dir_l[1], 0.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    const RECORD: &str =
        "-50.0, 0.0, 1.1071487177940904, 8.0, 50.0, 0.0, 2.0344439357957027, 8.0, 0.003";

    #[test]
    fn test_parse_record() {
        let model = IntrinsicModel::from_record(RECORD, 1280).unwrap();
        assert_eq!(model.camera(Side::Left).offset_x, -50.0);
        assert_eq!(model.camera(Side::Right).offset_x, 50.0);
        assert_eq!(model.pixel_size(), 0.003);
        assert_eq!(model.h_resolution(), 1280);
    }

    #[test]
    fn test_angular_fov_closed_form() {
        let model = IntrinsicModel::from_record(RECORD, 1280).unwrap();
        let expected = 2.0 * (1280.0 * 0.003 / (2.0 * 8.0f64)).atan();
        assert_relative_eq!(model.angular_fov(Side::Left), expected, epsilon = 1e-12);
        assert_relative_eq!(model.angular_fov(Side::Right), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_focal_rejected() {
        let res = IntrinsicModel::from_record("0,0,0,0,0,0,0,8,0.003", 1280);
        assert!(matches!(
            res,
            Err(CalibrationLoadError::NonPositive { field: "focal_l", .. })
        ));
        let res = IntrinsicModel::from_record("0,0,0,8,0,0,0,8,-0.1", 1280);
        assert!(matches!(
            res,
            Err(CalibrationLoadError::NonPositive { field: "pixel_size", .. })
        ));
    }

    #[test]
    fn test_malformed_records() {
        assert!(matches!(
            IntrinsicModel::from_record("", 1280),
            Err(CalibrationLoadError::Empty)
        ));
        assert!(matches!(
            IntrinsicModel::from_record("1,2,3", 1280),
            Err(CalibrationLoadError::FieldCount {
                expected: 9,
                found: 3
            })
        ));
        assert!(matches!(
            IntrinsicModel::from_record("0,0,abc,8,0,0,0,8,0.003", 1280),
            Err(CalibrationLoadError::Malformed { field: "beta_0_l", .. })
        ));
        assert!(matches!(
            IntrinsicModel::from_record("0,0,0,8,0,0,NaN,8,0.003", 1280),
            Err(CalibrationLoadError::Malformed { field: "beta_0_r", .. })
        ));
        assert!(IntrinsicModel::from_record(RECORD, 0).is_err());
    }

    #[test]
    fn test_pixel_angle() {
        let model = IntrinsicModel::from_record(RECORD, 1280).unwrap();
        let beta = model.camera(Side::Left).beta_0;
        assert_relative_eq!(model.pixel_angle(Side::Left, 639.5), beta, epsilon = 1e-12);
        // pixels right of the centre rotate the ray clockwise
        assert!(model.pixel_angle(Side::Left, 1000.0) < beta);
        let half_fov = model.angular_fov(Side::Left) / 2.0;
        assert_relative_eq!(
            model.pixel_angle(Side::Left, -0.5),
            beta + half_fov,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_triangulate_boresight() {
        // both boresights point at (0, 100)
        let model = IntrinsicModel::from_record(RECORD, 1280).unwrap();
        let point = model.triangulate(639.5, 639.5).unwrap();
        assert_relative_eq!(point[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(point[1], 100.0, epsilon = 1e-9);
        assert_eq!(point[2], 0.0);
    }

    #[test]
    fn test_triangulate_parallel() {
        let record = format!("-50,0,{FRAC_PI_2},8,50,0,{FRAC_PI_2},8,0.003");
        let model = IntrinsicModel::from_record(&record, 1280).unwrap();
        assert!(matches!(
            model.triangulate(639.5, 639.5),
            Err(CalibrationError::ParallelRays)
        ));
    }
}
