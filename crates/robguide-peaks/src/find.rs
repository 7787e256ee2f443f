use crate::engine::PeakThresholds;

/// Finds the peaks of a line of samples.
///
/// A peak is a local maximum, a sample strictly higher than both neighbours or the middle of a
/// flat run strictly higher than the samples around it. Samples at either end of the line are
/// never peaks. The candidates then go through three filters, in this order:
///
/// 1. Height: the prominence of the candidate, its height above the higher of the two lowest
///    points separating it from a higher sample on either side, must reach `minimum_height`.
/// 2. Width: the width of the peak at half its prominence, linearly interpolated between
///    samples, must reach `minimum_width`.
/// 3. Distance: of the candidates left, those closer than `minimum_distance` samples to a
///    higher kept peak are dropped. Of two equally high peaks the lower index is kept.
///
/// # Arguments
///
/// * `samples` - The line to search.
/// * `thresholds` - The detection thresholds.
///
/// # Returns
///
/// The indices of the peaks in increasing order.
///
/// # Examples
///
/// ```
/// use robguide_peaks::{find_peaks, PeakThresholds};
///
/// let line = [0, 0, 10, 80, 120, 80, 10, 0, 0];
/// let peaks = find_peaks(&line, &PeakThresholds::default());
/// assert_eq!(peaks, vec![4]);
/// ```
pub fn find_peaks(samples: &[u8], thresholds: &PeakThresholds) -> Vec<usize> {
    let candidates: Vec<usize> = local_maxima(samples)
        .into_iter()
        .filter(|&peak| {
            let bases = prominence(samples, peak);
            bases.prominence >= thresholds.minimum_height
                && half_prominence_width(samples, peak, &bases) >= thresholds.minimum_width
        })
        .collect();

    select_by_distance(samples, &candidates, thresholds.minimum_distance)
}

fn local_maxima(x: &[u8]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }

    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(x: &[u8], peaks: &[usize], distance: usize) -> Vec<usize> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks.to_vec();
    }

    // highest first, lower index first among equals
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[b]].cmp(&x[peaks[a]]).then(a.cmp(&b)));

    let mut keep = vec![true; peaks.len()];
    for &j in &order {
        if !keep[j] {
            continue;
        }
        for k in (0..j).rev() {
            if peaks[j] - peaks[k] >= distance {
                break;
            }
            keep[k] = false;
        }
        for k in j + 1..peaks.len() {
            if peaks[k] - peaks[j] >= distance {
                break;
            }
            keep[k] = false;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&peak, keep)| keep.then_some(peak))
        .collect()
}

struct Bases {
    prominence: f64,
    left: usize,
    right: usize,
}

fn prominence(x: &[u8], peak: usize) -> Bases {
    let height = x[peak];

    let mut left = peak;
    let mut left_min = height;
    for i in (0..=peak).rev() {
        if x[i] > height {
            break;
        }
        if x[i] < left_min {
            left_min = x[i];
            left = i;
        }
    }

    let mut right = peak;
    let mut right_min = height;
    for (i, &v) in x.iter().enumerate().skip(peak) {
        if v > height {
            break;
        }
        if v < right_min {
            right_min = v;
            right = i;
        }
    }

    Bases {
        prominence: (height - left_min.max(right_min)) as f64,
        left,
        right,
    }
}

fn half_prominence_width(x: &[u8], peak: usize, bases: &Bases) -> f64 {
    let level = x[peak] as f64 - 0.5 * bases.prominence;
    let at = |i: usize| x[i] as f64;

    let mut i = peak;
    while bases.left < i && at(i) > level {
        i -= 1;
    }
    let mut left = i as f64;
    if at(i) < level {
        left += (level - at(i)) / (at(i + 1) - at(i));
    }

    let mut i = peak;
    while i < bases.right && at(i) > level {
        i += 1;
    }
    let mut right = i as f64;
    if at(i) < level {
        right -= (level - at(i)) / (at(i - 1) - at(i));
    }

    right - left
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(width: f64, height: f64, distance: usize) -> PeakThresholds {
        PeakThresholds {
            minimum_width: width,
            minimum_height: height,
            minimum_distance: distance,
        }
    }

    fn gaussian(len: usize, bumps: &[(f64, f64, f64)]) -> Vec<u8> {
        (0..len)
            .map(|x| {
                let v: f64 = bumps
                    .iter()
                    .map(|&(center, sigma, amplitude)| {
                        let d = x as f64 - center;
                        amplitude * (-d * d / (2.0 * sigma * sigma)).exp()
                    })
                    .sum();
                v.round().clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    #[test]
    fn test_single_bump() {
        let line = gaussian(1280, &[(640.0, 1.7, 100.0)]);
        assert_eq!(find_peaks(&line, &thresholds(1.0, 50.0, 10)), vec![640]);
    }

    #[test]
    fn test_close_bumps_keep_lower_index() {
        let line = gaussian(1280, &[(640.0, 1.0, 100.0), (645.0, 1.0, 100.0)]);
        assert_eq!(find_peaks(&line, &thresholds(1.0, 50.0, 10)), vec![640]);
        assert_eq!(find_peaks(&line, &thresholds(1.0, 50.0, 5)), vec![640, 645]);
    }

    #[test]
    fn test_distance_prefers_higher() {
        let line = gaussian(200, &[(100.0, 1.0, 80.0), (104.0, 1.0, 120.0)]);
        assert_eq!(find_peaks(&line, &thresholds(1.0, 50.0, 10)), vec![104]);
    }

    #[test]
    fn test_flat_lines() {
        let t = thresholds(1.0, 50.0, 10);
        assert!(find_peaks(&[0; 1280], &t).is_empty());
        assert!(find_peaks(&[200; 64], &t).is_empty());
        assert!(find_peaks(&[], &t).is_empty());
        assert!(find_peaks(&[0, 255], &t).is_empty());
    }

    #[test]
    fn test_weak_shoulder_does_not_suppress_neighbour() {
        // the shoulder at 13 has a prominence of 5 and must not shadow the stripe at 20
        let mut line = vec![0, 200];
        line.extend([190; 11]);
        line.push(195);
        line.extend([100; 6]);
        line.extend([150, 100, 0, 0]);
        assert_eq!(line[13], 195);
        assert_eq!(line[20], 150);

        assert_eq!(prominence(&line, 13).prominence, 5.0);
        let bases = prominence(&line, 20);
        assert_eq!(bases.prominence, 50.0);
        assert_eq!(half_prominence_width(&line, 20, &bases), 1.0);

        assert_eq!(find_peaks(&line, &PeakThresholds::default()), vec![1, 20]);
    }

    #[test]
    fn test_edges_are_not_peaks() {
        let line = [200, 100, 0, 0, 0, 100, 200];
        assert!(find_peaks(&line, &thresholds(0.0, 0.0, 1)).is_empty());
    }

    #[test]
    fn test_plateau_midpoint() {
        let line = [0, 0, 60, 60, 60, 0, 0];
        assert_eq!(find_peaks(&line, &thresholds(3.0, 50.0, 1)), vec![3]);
        assert!(find_peaks(&line, &thresholds(3.5, 50.0, 1)).is_empty());

        let even = [0, 70, 70, 70, 70, 0];
        assert_eq!(find_peaks(&even, &thresholds(1.0, 50.0, 1)), vec![2]);
    }

    #[test]
    fn test_plateau_at_threshold_height() {
        let line = [0, 0, 50, 50, 50, 0, 0];
        assert_eq!(find_peaks(&line, &thresholds(1.0, 50.0, 10)), vec![3]);
        assert!(find_peaks(&line, &thresholds(1.0, 50.5, 10)).is_empty());
    }

    #[test]
    fn test_prominence_over_raised_floor() {
        // the peak at 4 is separated from the higher one by a saddle at 100
        let line = [0, 200, 100, 100, 140, 100, 100, 0];
        let bases = prominence(&line, 4);
        assert_eq!(bases.prominence, 40.0);
        assert_eq!(prominence(&line, 1).prominence, 200.0);
        assert_eq!(find_peaks(&line, &thresholds(1.0, 50.0, 1)), vec![1]);
        assert_eq!(find_peaks(&line, &thresholds(1.0, 40.0, 1)), vec![1, 4]);
    }

    #[test]
    fn test_width_filter() {
        let narrow = [0, 0, 0, 200, 0, 0, 0];
        let bases = prominence(&narrow, 3);
        assert_eq!(half_prominence_width(&narrow, 3, &bases), 1.0);
        assert!(find_peaks(&narrow, &thresholds(1.5, 50.0, 1)).is_empty());

        let wide = gaussian(100, &[(50.0, 4.0, 200.0)]);
        assert_eq!(find_peaks(&wide, &thresholds(8.0, 50.0, 1)), vec![50]);
    }

    #[test]
    fn test_local_maxima_rejects_shoulders() {
        // a rising edge into a plateau that keeps rising is not a peak
        assert_eq!(local_maxima(&[0, 5, 5, 9, 0]), vec![3]);
        assert_eq!(local_maxima(&[0, 5, 5, 5, 5]), Vec::<usize>::new());
    }
}
