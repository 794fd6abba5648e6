use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::data::Series;
use crate::error::{Error, Result};
use crate::stats::quantile;

/// Point budget for auto-sampling.
pub const MAX_POINTS: usize = 2000;

/// File extensions rendered as vectors, where every point costs output size.
pub const VECTOR_EXTENSIONS: [&str; 4] = ["svg", "ps", "eps", "pdf"];

/// How to thin a series before drawing it. Statistics are always computed
/// on the full series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sampling {
    /// Cap interactive and vector output at [`MAX_POINTS`].
    #[default]
    Auto,
    Disabled,
    /// Keep every n-th row. `Stride(0)` disables sampling.
    Stride(usize),
    /// Median of each time bucket.
    TimeBucket(Duration),
}

impl FromStr for Sampling {
    type Err = Error;

    /// `auto`, `off`, an integer stride, or a bucket such as `5Min`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "auto" => Ok(Sampling::Auto),
            "off" | "none" => Ok(Sampling::Disabled),
            _ => match s.parse::<usize>() {
                Ok(0) => Ok(Sampling::Disabled),
                Ok(n) => Ok(Sampling::Stride(n)),
                Err(_) => parse_bucket(s).map(Sampling::TimeBucket),
            },
        }
    }
}

/// Parse a bucket width: a count followed by `ms`, `s`/`S`, `min`/`Min`/`T`,
/// `h`/`H` or `d`/`D`. A missing count means one.
pub fn parse_bucket(s: &str) -> Result<Duration> {
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (count, unit) = s.split_at(split);
    let count: i64 = if count.is_empty() {
        1
    } else {
        count
            .parse()
            .map_err(|_| Error::Sampling(format!("bad bucket count in '{s}'")))?
    };
    let duration = match unit {
        "ms" | "L" => Duration::milliseconds(count),
        "s" | "S" => Duration::seconds(count),
        "min" | "Min" | "T" => Duration::minutes(count),
        "h" | "H" => Duration::hours(count),
        "d" | "D" => Duration::days(count),
        _ => return Err(Error::Sampling(format!("unknown bucket unit in '{s}'"))),
    };
    if duration <= Duration::zero() {
        return Err(Error::Sampling(format!("bucket '{s}' is empty")));
    }
    Ok(duration)
}

/// Whether `Auto` should thin the data for this output.
fn autosample(path: Option<&Path>) -> bool {
    match path {
        None => true,
        Some(path) => path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| VECTOR_EXTENSIONS.contains(&e.as_str())),
    }
}

/// Thin `series` for drawing. `path` is the output file, `None` when the
/// plot is shown interactively.
pub fn sample_series(series: &Series, sampling: &Sampling, path: Option<&Path>) -> Series {
    match *sampling {
        Sampling::Disabled | Sampling::Stride(0) => series.clone(),
        Sampling::Stride(n) => stride(series, n),
        Sampling::TimeBucket(width) => bucket_median(series, width),
        Sampling::Auto => {
            if autosample(path) && series.len() > MAX_POINTS {
                stride(series, series.len().div_ceil(MAX_POINTS))
            } else {
                series.clone()
            }
        }
    }
}

fn stride(series: &Series, n: usize) -> Series {
    let keep = |i: &usize| i % n == 0;
    Series::new(
        series.name.clone(),
        (0..series.len()).filter(keep).map(|i| series.index[i]).collect(),
        (0..series.len()).filter(keep).map(|i| series.values[i]).collect(),
    )
}

fn bucket_median(series: &Series, width: Duration) -> Series {
    let width_us = width.num_microseconds().unwrap_or(i64::MAX).max(1);

    let mut index = Vec::new();
    let mut values = Vec::new();
    let mut bucket: Option<i64> = None;
    let mut pending: Vec<f64> = Vec::new();

    let mut flush = |bucket: i64, pending: &mut Vec<f64>| {
        pending.retain(|v| !v.is_nan());
        if pending.is_empty() {
            return;
        }
        pending.sort_unstable_by(|a, b| a.total_cmp(b));
        if let Some(start) = DateTime::<Utc>::from_timestamp_micros(bucket * width_us) {
            index.push(start);
            values.push(quantile(pending, 0.5));
        }
        pending.clear();
    };

    for (t, &v) in series.index.iter().zip(&series.values) {
        let b = t.timestamp_micros().div_euclid(width_us);
        match bucket {
            Some(current) if current == b => {}
            Some(current) => {
                flush(current, &mut pending);
                bucket = Some(b);
            }
            None => bucket = Some(b),
        }
        pending.push(v);
    }
    if let Some(current) = bucket {
        flush(current, &mut pending);
    }

    Series::new(series.name.clone(), index, values)
}
