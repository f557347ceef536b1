//! Percentiles over per-iteration conversion timings

/// Linearly interpolated percentile of `samples`, `p` in `0.0..=100.0`.
///
/// # Examples
///
/// ```
/// use converter_harness::stats::percentile;
///
/// let durations = vec![120.0, 80.0, 100.0];
/// assert_eq!(percentile(&durations, 50.0), Some(100.0));
/// ```
pub fn percentile(samples: &[f64], p: f64) -> Option<f64> {
    if samples.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let fraction = rank - lower as f64;
    Some(sorted[lower] + fraction * (sorted[upper] - sorted[lower]))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PercentileSummary {
    pub min: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl PercentileSummary {
    /// `None` for an empty slice
    ///
    /// ```
    /// use converter_harness::stats::PercentileSummary;
    ///
    /// let summary = PercentileSummary::from_samples(&[4.0, 2.0, 6.0]).unwrap();
    /// assert_eq!(summary.mean, 4.0);
    /// assert_eq!(summary.p50, 4.0);
    /// ```
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        // Sample standard deviation
        let variance = if count > 1 {
            sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64
        } else {
            0.0
        };

        Some(Self {
            min: sorted[0],
            p50: percentile(&sorted, 50.0)?,
            p95: percentile(&sorted, 95.0)?,
            max: sorted[count - 1],
            mean,
            std_dev: variance.sqrt(),
            count,
        })
    }

    /// std_dev / mean, infinite when the mean is zero
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            f64::INFINITY
        } else {
            self.std_dev / self.mean
        }
    }
}
