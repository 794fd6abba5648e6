//! Descriptive statistics over stamp series.
//!
//! Quantiles use linear interpolation between closest ranks:
//! ```text
//! h = (n - 1) * q
//! Q = x[floor(h)] + (h - floor(h)) * (x[floor(h) + 1] - x[floor(h)])
//! ```

use crate::data::Series;

/// Quantile `q` in `[0, 1]` of sorted, NaN-free data. NaN when empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let q = q.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Summary statistics of one series.
///
/// `lower_bound` / `upper_bound` are the quantiles at the requested
/// percentile range and drive outlier trimming in the plots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p1: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p99: f64,
    pub max: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Summary {
    /// Summarise `values`, skipping NaN. `ptile_range` is in percent.
    pub fn compute(values: &[f64], ptile_range: (f64, f64)) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let mean = if n == 0 {
            f64::NAN
        } else {
            sorted.iter().sum::<f64>() / n as f64
        };
        let std = if n < 2 {
            f64::NAN
        } else {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        };

        Summary {
            count: n,
            mean,
            std,
            min: sorted.first().copied().unwrap_or(f64::NAN),
            p1: quantile(&sorted, 0.01),
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.50),
            p75: quantile(&sorted, 0.75),
            p99: quantile(&sorted, 0.99),
            max: sorted.last().copied().unwrap_or(f64::NAN),
            lower_bound: quantile(&sorted, ptile_range.0 / 100.0),
            upper_bound: quantile(&sorted, ptile_range.1 / 100.0),
        }
    }

    pub fn iqr(&self) -> f64 {
        self.p75 - self.p25
    }

    /// Every location and spread statistic multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Summary {
            count: self.count,
            mean: self.mean * factor,
            std: self.std * factor,
            min: self.min * factor,
            p1: self.p1 * factor,
            p25: self.p25 * factor,
            p50: self.p50 * factor,
            p75: self.p75 * factor,
            p99: self.p99 * factor,
            max: self.max * factor,
            lower_bound: self.lower_bound * factor,
            upper_bound: self.upper_bound * factor,
        }
    }
}

/// Summaries of several series, keyed by series name.
pub fn describe(series: &[Series], ptile_range: (f64, f64)) -> Vec<(String, Summary)> {
    series
        .iter()
        .map(|s| (s.name.clone(), Summary::compute(&s.values, ptile_range)))
        .collect()
}

/// Display factor and unit label for data with the given spread (seconds).
pub fn scale_data(spread: f64) -> (f64, &'static str) {
    if spread < 1e-6 {
        (1e9, "[ns]")
    } else if spread < 1e-3 {
        (1e6, "[us]")
    } else if spread < 1.0 {
        (1e3, "[ms]")
    } else {
        (1.0, "[s]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_buckets() {
        assert_eq!(scale_data(5e-7), (1e9, "[ns]"));
        assert_eq!(scale_data(5e-4), (1e6, "[us]"));
        assert_eq!(scale_data(0.5), (1e3, "[ms]"));
        assert_eq!(scale_data(5.0), (1.0, "[s]"));
    }

    #[test]
    fn scale_boundaries_go_to_the_larger_unit() {
        assert_eq!(scale_data(1e-6).1, "[us]");
        assert_eq!(scale_data(1e-3).1, "[ms]");
        assert_eq!(scale_data(1.0).1, "[s]");
    }

    #[test]
    fn quantiles_interpolate_linearly() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&data, 0.0), 1.0);
        assert_eq!(quantile(&data, 1.0), 4.0);
        assert_eq!(quantile(&data, 0.5), 2.5);
        assert!((quantile(&data, 0.25) - 1.75).abs() < 1e-12);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn summary_matches_describe() {
        let values: Vec<f64> = (1..=101).map(f64::from).collect();
        let s = Summary::compute(&values, (0.0, 100.0));
        assert_eq!(s.count, 101);
        assert_eq!(s.mean, 51.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 101.0);
        assert_eq!(s.p50, 51.0);
        assert_eq!(s.p25, 26.0);
        assert_eq!(s.p75, 76.0);
        assert_eq!(s.p1, 2.0);
        assert_eq!(s.p99, 100.0);
        assert_eq!(s.lower_bound, 1.0);
        assert_eq!(s.upper_bound, 101.0);
        assert_eq!(s.iqr(), 50.0);
        assert!((s.std - 29.300170647967224).abs() < 1e-9);
    }

    #[test]
    fn nan_is_skipped_and_empty_input_is_nan() {
        let s = Summary::compute(&[f64::NAN, 2.0, 4.0], (1.0, 99.0));
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, 3.0);

        let empty = Summary::compute(&[], (0.0, 100.0));
        assert_eq!(empty.count, 0);
        assert!(empty.mean.is_nan() && empty.min.is_nan() && empty.upper_bound.is_nan());
    }

    #[test]
    fn scaling_keeps_count() {
        let s = Summary::compute(&[0.001, 0.002, 0.003], (0.0, 100.0)).scaled(1e3);
        assert_eq!(s.count, 3);
        assert!((s.p50 - 2.0).abs() < 1e-12);
    }
}
