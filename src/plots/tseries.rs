use crate::data::Series;
use crate::error::{Error, Result};
use crate::stats::{describe, Summary};

use super::sampling::sample_series;
use super::{save_if_requested, unit_for, widen, Axis, Figure, Layer, PlotOptions, PlotStyles};

pub const DEFAULT_PTILE_RANGE: (f64, f64) = (1.0, 99.0);

/// Time series plot of one or more series sharing a unit.
///
/// The y axis is limited to the union of the per-series percentile bounds.
/// Styles, when given, must cover every series name.
pub fn tseries(series: &[Series], options: &PlotOptions) -> Result<(Figure, Vec<(String, Summary)>)> {
    if series.is_empty() {
        return Err(Error::Render("no series to plot".to_string()));
    }
    let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
    let styles = match &options.styles {
        Some(styles) => {
            styles.validate_for(&names)?;
            styles.clone()
        }
        None => PlotStyles::palette(&names),
    };

    let stats = describe(series, options.ptile_range.unwrap_or(DEFAULT_PTILE_RANGE));
    let lower = stats
        .iter()
        .map(|(_, s)| s.lower_bound)
        .filter(|v| !v.is_nan())
        .reduce(f64::min);
    let upper = stats
        .iter()
        .map(|(_, s)| s.upper_bound)
        .filter(|v| !v.is_nan())
        .reduce(f64::max);
    let (Some(lower), Some(upper)) = (lower, upper) else {
        return Err(Error::Render("series have no values".to_string()));
    };
    let (scale, unit) = unit_for(options, upper - lower);

    let mut figure = Figure::new(&options.title, (800, 300));
    figure.x_label = options.x_label.clone();
    figure.y_label = format!("{} {}", options.y_label, unit);
    figure.x_axis = Axis::Time;
    figure.y_range = Some(widen(lower * scale, upper * scale));
    figure.y_ticks = options.y_ticks;

    let path = options.path.as_deref();
    for s in series {
        let sampled = sample_series(s, &options.sampling, path);
        log::debug!("plotting {} of {} points of {}", sampled.len(), s.len(), s.name);
        let points = (0..sampled.len())
            .filter(|&i| sampled.values[i].is_finite())
            .map(|i| [sampled.epoch_seconds(i), sampled.values[i] * scale])
            .collect();
        figure.layers.push(Layer::Line {
            name: s.name.clone(),
            points,
            style: styles.get(&s.name).copied().unwrap_or_default(),
            alpha: options.transparency,
        });
    }

    save_if_requested(&figure, options)?;
    Ok((figure, stats))
}
