use serde::{Deserialize, Serialize};

/// Sequence of sampled values of one observable.
#[derive(Debug, Default)]
pub struct TimeSeries {
    vals: Vec<f64>,
}

/// Summary of a [`TimeSeries`].
///
/// Statistics of fewer than two values are NaN.
#[derive(Debug, Serialize, Deserialize)]
pub struct TimeSeriesReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub sem: f64,
    pub min: f64,
    pub max: f64,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, val: f64) {
        self.vals.push(val);
    }

    pub fn report(&self) -> TimeSeriesReport {
        TimeSeriesReport {
            n_vals: self.vals.len(),
            mean: compute_mean(&self.vals),
            std_dev: compute_var(&self.vals).sqrt(),
            sem: compute_sem(&self.vals),
            min: self.vals.iter().copied().fold(f64::NAN, f64::min),
            max: self.vals.iter().copied().fold(f64::NAN, f64::max),
        }
    }
}

fn compute_mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn compute_var(vals: &[f64]) -> f64 {
    let n_vals = vals.len();
    if n_vals < 2 {
        return f64::NAN;
    }
    let mean = compute_mean(vals);
    vals.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / (n_vals - 1) as f64
}

/// Standard error of the mean of correlated samples, by the Flyvbjerg-Petersen
/// blocking method.
///
/// Pairs of neighbors are averaged until the squared error estimate stops
/// growing beyond its own uncertainty.
fn compute_sem(vals: &[f64]) -> f64 {
    let mut blk_vals = vals.to_vec();
    let mut sem2_ests = Vec::new();
    let mut sem2_errs = Vec::new();

    while blk_vals.len() >= 2 {
        let n_vals = blk_vals.len() as f64;
        let sem2_est = compute_var(&blk_vals) / n_vals;
        sem2_ests.push(sem2_est);
        sem2_errs.push(sem2_est * (2.0 / (n_vals - 1.0)).sqrt());

        blk_vals = blk_vals
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect();
    }

    for (idx, &sem2_est) in sem2_ests.iter().enumerate() {
        let max_low = sem2_ests[idx..]
            .iter()
            .zip(&sem2_errs[idx..])
            .map(|(est, err)| est - err)
            .fold(f64::NEG_INFINITY, f64::max);
        if sem2_est > max_low {
            return sem2_est.sqrt();
        }
    }

    sem2_ests.last().copied().unwrap_or(f64::NAN).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_series_has_no_spread() {
        let mut series = TimeSeries::new();
        for _ in 0..64 {
            series.push(3.0);
        }
        let report = series.report();
        assert_eq!(report.n_vals, 64);
        assert_eq!(report.mean, 3.0);
        assert_eq!(report.std_dev, 0.0);
        assert_eq!(report.sem, 0.0);
        assert_eq!((report.min, report.max), (3.0, 3.0));
    }

    #[test]
    fn alternating_series() {
        let mut series = TimeSeries::new();
        for i in 0..32 {
            series.push(if i % 2 == 0 { 1.0 } else { 3.0 });
        }
        let report = series.report();
        assert_eq!(report.mean, 2.0);
        assert!((report.std_dev - (32.0f64 / 31.0).sqrt()).abs() < 1e-12);
        assert!(report.sem.is_finite());
        assert_eq!((report.min, report.max), (1.0, 3.0));
    }

    #[test]
    fn empty_series_is_nan() {
        let report = TimeSeries::new().report();
        assert_eq!(report.n_vals, 0);
        assert!(report.mean.is_nan());
        assert!(report.std_dev.is_nan());
        assert!(report.sem.is_nan());
    }
}
