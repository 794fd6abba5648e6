//! Plot preparation: scaling, trimming, down-sampling and styling of stamp
//! series into a [`Figure`], which is then shown by the viewer or written
//! to disk by [`render`].
//!
//! ```text
//!   Series ──► stats::Summary ──► scale / trim ──► sampling ──► Figure
//!                                                                 │
//!                                                ┌────────────────┴──────┐
//!                                                ▼                       ▼
//!                                          ui::plot (egui)        render (PNG)
//! ```
pub mod allanvar;
pub mod hist;
pub mod render;
pub mod sampling;
pub mod styles;
pub mod tseries;

use std::path::PathBuf;

use eframe::egui::Color32;

pub use allanvar::{allanvar, compute_allanvar};
pub use hist::hist;
pub use sampling::Sampling;
pub use styles::{LineStyle, PlotStyles, Style};
pub use tseries::tseries;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Explicit display unit, e.g. `("us", 1e6)`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitScale {
    pub label: String,
    pub factor: f64,
}

impl UnitScale {
    pub fn new(label: impl Into<String>, factor: f64) -> Self {
        UnitScale {
            label: label.into(),
            factor,
        }
    }

    /// Label as shown on an axis, `[label]`.
    pub fn bracketed(&self) -> String {
        format!("[{}]", self.label)
    }
}

/// Options shared by every plot function.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Percentile range used for outlier trimming. `None` uses the plot's
    /// own default.
    pub ptile_range: Option<(f64, f64)>,
    /// Display unit. `None` picks one from the spread of the data.
    pub unit: Option<UnitScale>,
    pub sampling: Sampling,
    /// Also write the figure to this PNG file.
    pub path: Option<PathBuf>,
    pub styles: Option<PlotStyles>,
    /// Opacity in `[0, 1]` of histogram fills and time series lines.
    pub transparency: f32,
    /// Histogram only: overlay a kernel density estimate.
    pub kde: bool,
    pub y_ticks: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        PlotOptions {
            title: "Title".to_string(),
            x_label: "XLabel".to_string(),
            y_label: "YLabel".to_string(),
            ptile_range: None,
            unit: None,
            sampling: Sampling::Auto,
            path: None,
            styles: None,
            transparency: 0.3,
            kde: true,
            y_ticks: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Figure – renderer independent description of a plot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Linear,
    /// Values are seconds since the epoch.
    Time,
    /// Values are already `log10` of the data.
    Log10,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Line {
        name: String,
        points: Vec<[f64; 2]>,
        style: Style,
        alpha: f32,
    },
    /// Histogram bars: `[center, height]`, all `width` wide.
    Bars {
        name: String,
        bars: Vec<[f64; 2]>,
        width: f64,
        color: Color32,
        alpha: f32,
    },
}

impl Layer {
    pub fn name(&self) -> &str {
        match self {
            Layer::Line { name, .. } | Layer::Bars { name, .. } => name,
        }
    }

    /// `(x_min, x_max, y_min, y_max)` over finite coordinates.
    fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        let corners: Vec<[f64; 2]> = match self {
            Layer::Line { points, .. } => points.clone(),
            Layer::Bars { bars, width, .. } => bars
                .iter()
                .flat_map(|&[x, h]| [[x - width / 2.0, 0.0], [x + width / 2.0, h]])
                .collect(),
        };
        corners
            .iter()
            .filter(|p| p[0].is_finite() && p[1].is_finite())
            .fold(None, |acc, p| {
                let (x0, x1, y0, y1) = acc.unwrap_or((p[0], p[0], p[1], p[1]));
                Some((x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1])))
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    pub y_ticks: bool,
    pub layers: Vec<Layer>,
    /// Output size in pixels when rendered to a file.
    pub size: (u32, u32),
}

impl Figure {
    pub fn new(title: impl Into<String>, size: (u32, u32)) -> Self {
        Figure {
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            x_axis: Axis::Linear,
            y_axis: Axis::Linear,
            x_range: None,
            y_range: None,
            y_ticks: true,
            layers: Vec::new(),
            size,
        }
    }

    /// Visible bounds: explicit ranges where set, data extent elsewhere.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let extent = self
            .layers
            .iter()
            .filter_map(Layer::extent)
            .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1), a.2.min(b.2), a.3.max(b.3)));
        let (x0, x1) = self.x_range.or(extent.map(|e| (e.0, e.1)))?;
        let (y0, y1) = self.y_range.or(extent.map(|e| (e.2, e.3)))?;
        Some((x0, x1, y0, y1))
    }
}

/// Widen a degenerate `[lo, hi]` interval so it can be drawn.
pub(crate) fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

/// Axis unit: the explicit override or one picked from `spread`.
pub(crate) fn unit_for(options: &PlotOptions, spread: f64) -> (f64, String) {
    match &options.unit {
        Some(unit) => (unit.factor, unit.bracketed()),
        None => {
            let (factor, label) = crate::stats::scale_data(spread);
            (factor, label.to_string())
        }
    }
}

/// Write the figure to `options.path` when one is set.
pub(crate) fn save_if_requested(figure: &Figure, options: &PlotOptions) -> crate::Result<()> {
    if let Some(path) = &options.path {
        render::save_png(figure, path)?;
    }
    Ok(())
}
