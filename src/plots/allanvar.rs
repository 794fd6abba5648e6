use eframe::egui::Color32;

use crate::data::Series;
use crate::error::{Error, Result};
use crate::stats::quantile;

use super::{save_if_requested, Axis, Figure, Layer, LineStyle, PlotOptions, Style};

/// Allan variance of `values` at dyadic aggregation scales.
///
/// Returns `(taus, variances)` with `taus` in samples: `T = 2^k` for
/// `k = 1 ..= floor(log2 n) - 2`. The smoothed estimate averages over every
/// block origin and only keeps scales with at least three blocks. NaN
/// samples are ignored.
pub fn compute_allanvar(values: &[f64], smoothed: bool) -> (Vec<usize>, Vec<f64>) {
    let data: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = data.len();
    if n < 2 {
        return (Vec::new(), Vec::new());
    }
    let max_k = n.ilog2().saturating_sub(2);
    let limit = if smoothed { n / 3 } else { n / 2 };
    let taus: Vec<usize> = (1..=max_k)
        .map(|k| 1usize << k)
        .filter(|&t| t <= limit)
        .collect();

    let mut cumsum = Vec::with_capacity(n + 1);
    cumsum.push(0.0);
    for v in &data {
        let last = cumsum[cumsum.len() - 1];
        cumsum.push(last + v);
    }

    let variances = taus
        .iter()
        .map(|&t| {
            if smoothed {
                (0..t).map(|origin| block_variance(&cumsum, t, origin)).sum::<f64>() / t as f64
            } else {
                block_variance(&cumsum, t, 0)
            }
        })
        .collect();
    (taus, variances)
}

/// `0.5 * mean((m[j+1] - m[j])^2)` over the means of consecutive `t`-sized
/// blocks starting at `origin`. Zero with fewer than two blocks.
fn block_variance(cumsum: &[f64], t: usize, origin: usize) -> f64 {
    let n = cumsum.len() - 1;
    let means: Vec<f64> = (origin..)
        .step_by(t)
        .take_while(|start| start + t <= n)
        .map(|start| (cumsum[start + t] - cumsum[start]) / t as f64)
        .collect();
    if means.len() < 2 {
        return 0.0;
    }
    let ss: f64 = means.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    ss / (means.len() - 1) as f64 / 2.0
}

/// Sampling period of the series: median spacing of its index, in seconds.
fn sampling_period(series: &Series) -> Option<f64> {
    let mut steps: Vec<f64> = (1..series.len())
        .map(|i| series.epoch_seconds(i) - series.epoch_seconds(i - 1))
        .collect();
    if steps.is_empty() {
        return None;
    }
    steps.sort_unstable_by(|a, b| a.total_cmp(b));
    Some(quantile(&steps, 0.5))
}

/// Allan deviation plot of `series` on log-log axes.
///
/// The curve is `sqrt(var / period)` against `T * period`. Returns the figure
/// and the raw variances.
pub fn allanvar(series: &Series, smoothed: bool, options: &PlotOptions) -> Result<(Figure, Vec<f64>)> {
    let (taus, variances) = compute_allanvar(&series.values, smoothed);

    let mut figure = Figure::new(&options.title, (500, 350));
    figure.x_label = format!("{} [s]", options.x_label);
    figure.y_label = options.y_label.clone();
    figure.x_axis = Axis::Log10;
    figure.y_axis = Axis::Log10;
    figure.y_ticks = options.y_ticks;

    if taus.is_empty() {
        log::warn!("{} has too few points for an Allan variance", series.name);
        return Ok((figure, variances));
    }

    let period = sampling_period(series)
        .filter(|p| *p > 0.0)
        .ok_or_else(|| Error::Render(format!("{} has no positive sampling period", series.name)))?;
    log::debug!(
        "allan variance of {} over {} scales, period {period} s",
        series.name,
        taus.len()
    );

    let points = taus
        .iter()
        .zip(&variances)
        .map(|(&t, &var)| [(t as f64 * period).log10(), (var / period).sqrt().log10()])
        .filter(|p| p[0].is_finite() && p[1].is_finite())
        .collect();
    let color = options
        .styles
        .as_ref()
        .and_then(|s| s.color_for(&series.name))
        .unwrap_or(Color32::from_rgb(255, 0, 0));
    figure.layers.push(Layer::Line {
        name: series.name.clone(),
        points,
        style: Style {
            color,
            line: LineStyle::Solid,
        },
        alpha: 1.0,
    });

    save_if_requested(&figure, options)?;
    Ok((figure, variances))
}
