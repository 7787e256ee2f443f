/// A line `y = slope · x + intercept` fitted by least squares.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineFit {
    /// Slope of the line.
    pub slope: f64,
    /// Value of the line at `x = 0`.
    pub intercept: f64,
    /// Root mean square of the residuals.
    pub rms: f64,
}

/// Running means and centred second moments of a set of points.
///
/// The moments are updated around the running means. Only a spread of exactly zero fails to fit.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineMoments {
    n: usize,
    mean_x: f64,
    mean_y: f64,
    /// $\sum_i (x_i - \bar x)^2$
    cxx: f64,
    /// $\sum_i (x_i - \bar x)(y_i - \bar y)$
    cxy: f64,
    /// $\sum_i (y_i - \bar y)^2$
    cyy: f64,
}

impl LineMoments {
    /// Adds one point.
    pub fn push(&mut self, x: f64, y: f64) {
        self.n += 1;
        let n = self.n as f64;
        let dx = x - self.mean_x;
        let dy = y - self.mean_y;
        self.mean_x += dx / n;
        self.mean_y += dy / n;
        self.cxx += dx * (x - self.mean_x);
        self.cxy += dx * (y - self.mean_y);
        self.cyy += dy * (y - self.mean_y);
    }

    /// Number of points added so far.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether no point was added.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Fits a line through the points.
    ///
    /// # Returns
    ///
    /// `None` when fewer than two points were added or all of them share the same `x`.
    pub fn fit(&self) -> Option<LineFit> {
        if self.n < 2 || self.cxx <= 0.0 {
            return None;
        }

        let slope = self.cxy / self.cxx;
        let intercept = self.mean_y - slope * self.mean_x;
        let sse = (self.cyy - slope * self.cxy).max(0.0);

        Some(LineFit {
            slope,
            intercept,
            rms: (sse / self.n as f64).sqrt(),
        })
    }
}

impl FromIterator<(f64, f64)> for LineMoments {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        let mut moments = Self::default();
        for (x, y) in iter {
            moments.push(x, y);
        }
        moments
    }
}

/// Fits a least squares line through `(x, y)` points.
///
/// # Examples
///
/// ```
/// use robguide_calib::linefit::fit_line;
///
/// let fit = fit_line([(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!((fit.intercept - 1.0).abs() < 1e-12);
/// ```
pub fn fit_line(points: impl IntoIterator<Item = (f64, f64)>) -> Option<LineFit> {
    points.into_iter().collect::<LineMoments>().fit()
}
