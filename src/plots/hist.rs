use eframe::egui::Color32;

use crate::data::Series;
use crate::error::{Error, Result};
use crate::stats::Summary;

use super::{save_if_requested, unit_for, widen, Figure, Layer, LineStyle, PlotOptions, Style};

pub const DEFAULT_PTILE_RANGE: (f64, f64) = (0.0, 100.0);
pub const BINS: usize = 500;
const KDE_POINTS: usize = 200;

/// Histogram of `series`, trimmed to the percentile range and normalised to
/// a density. Returns the figure and the unscaled summary.
pub fn hist(series: &Series, options: &PlotOptions) -> Result<(Figure, Summary)> {
    let stats = Summary::compute(&series.values, options.ptile_range.unwrap_or(DEFAULT_PTILE_RANGE));
    if stats.count == 0 {
        return Err(Error::Render(format!("series '{}' has no values", series.name)));
    }

    let (scale, unit) = unit_for(options, stats.p99 - stats.p1);
    let scaled = stats.scaled(scale);
    let (lo, hi) = widen(scaled.lower_bound, scaled.upper_bound);

    let values: Vec<f64> = series
        .values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| v * scale)
        .collect();
    let (width, counts) = bin(&values, lo, hi, BINS);
    let in_range: usize = counts.iter().sum();
    let norm = if in_range == 0 {
        0.0
    } else {
        1.0 / (in_range as f64 * width)
    };
    let bars: Vec<[f64; 2]> = counts
        .iter()
        .enumerate()
        .map(|(i, &c)| [lo + (i as f64 + 0.5) * width, c as f64 * norm])
        .collect();

    let color = options
        .styles
        .as_ref()
        .and_then(|s| s.color_for(&series.name))
        .unwrap_or(Color32::from_rgb(0, 0, 255));

    let mut figure = Figure::new(&options.title, (500, 350));
    figure.x_label = format!(
        "{} {} (min={:.1}, med={:.1}, IQR={:.1})",
        options.x_label,
        unit,
        scaled.min,
        scaled.p50,
        scaled.iqr()
    );
    figure.x_range = Some((lo, hi));
    figure.y_ticks = options.y_ticks;
    figure.layers.push(Layer::Bars {
        name: series.name.clone(),
        bars: bars.clone(),
        width,
        color,
        alpha: options.transparency,
    });

    if options.kde {
        if let Some(points) = kde(&bars, &counts, scaled.std, lo, hi) {
            figure.layers.push(Layer::Line {
                name: "kde".to_string(),
                points,
                style: Style {
                    color: Color32::BLACK,
                    line: LineStyle::Dashed,
                },
                alpha: 1.0,
            });
        }
    }

    save_if_requested(&figure, options)?;
    Ok((figure, stats))
}

/// Equal-width bins over `[lo, hi]`, the last bin closed. Values outside the
/// range are ignored.
fn bin(values: &[f64], lo: f64, hi: f64, bins: usize) -> (f64, Vec<usize>) {
    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        if v < lo || v > hi {
            continue;
        }
        let i = (((v - lo) / width) as usize).min(bins - 1);
        counts[i] += 1;
    }
    (width, counts)
}

/// Gaussian kernel density estimate evaluated from the binned counts, with
/// Scott's rule bandwidth.
fn kde(bars: &[[f64; 2]], counts: &[usize], std: f64, lo: f64, hi: f64) -> Option<Vec<[f64; 2]>> {
    let n: usize = counts.iter().sum();
    if n < 2 || !(std > 0.0) {
        return None;
    }
    let bandwidth = std * (n as f64).powf(-0.2);
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    let step = (hi - lo) / (KDE_POINTS - 1) as f64;
    let points = (0..KDE_POINTS)
        .map(|i| {
            let x = lo + i as f64 * step;
            let density: f64 = bars
                .iter()
                .zip(counts)
                .filter(|(_, &c)| c > 0)
                .map(|(bar, &c)| {
                    let z = (x - bar[0]) / bandwidth;
                    c as f64 * (-0.5 * z * z).exp()
                })
                .sum();
            [x, density * norm]
        })
        .collect();
    Some(points)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::plots::UnitScale;

    fn series(values: Vec<f64>) -> Series {
        let t = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        Series::new("rtt", vec![t; values.len()], values)
    }

    #[test]
    fn histogram_is_a_density() {
        let values: Vec<f64> = (0..1000).map(|i| 1e-3 + (i % 100) as f64 * 1e-6).collect();
        let (figure, stats) = hist(&series(values), &PlotOptions::default()).unwrap();
        assert_eq!(stats.count, 1000);

        let Layer::Bars { bars, width, .. } = &figure.layers[0] else {
            panic!("first layer should be bars");
        };
        assert_eq!(bars.len(), BINS);
        let area: f64 = bars.iter().map(|b| b[1] * width).sum();
        assert!((area - 1.0).abs() < 1e-9, "area {area}");
        // spread p99 - p1 is ~1e-4 s: microseconds.
        assert!(figure.x_label.starts_with("XLabel [us] (min=1000.0, med="));
        assert!(matches!(figure.layers[1], Layer::Line { .. }));
    }

    #[test]
    fn percentile_range_trims_the_axis() {
        let mut values: Vec<f64> = (0..100).map(f64::from).collect();
        values.push(1e6);
        let options = PlotOptions {
            ptile_range: Some((1.0, 99.0)),
            unit: Some(UnitScale::new("s", 1.0)),
            kde: false,
            ..PlotOptions::default()
        };
        let (figure, stats) = hist(&series(values), &options).unwrap();
        let (lo, hi) = figure.x_range.unwrap();
        assert_eq!(lo, stats.lower_bound);
        assert_eq!(hi, stats.upper_bound);
        assert!(hi < 1e6);
        assert_eq!(figure.layers.len(), 1);
    }

    #[test]
    fn constant_series_still_plots() {
        let (figure, _) = hist(&series(vec![2.0; 10]), &PlotOptions::default()).unwrap();
        let (lo, hi) = figure.x_range.unwrap();
        assert!(hi > lo);
    }

    #[test]
    fn empty_series_is_an_error() {
        assert!(hist(&series(vec![f64::NAN]), &PlotOptions::default()).is_err());
    }
}
