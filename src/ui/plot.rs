use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, GridMark, Line, Plot, PlotPoints, Points};

use clockstats::plots::{Axis, Layer, LineStyle};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Figure plot (central panel)
// ---------------------------------------------------------------------------

/// Render the prepared figure in the central panel.
pub fn figure_plot(ui: &mut Ui, state: &AppState) {
    let Some(figure) = &state.figure else {
        ui.centered_and_justified(|ui: &mut Ui| {
            if state.files.is_empty() {
                ui.heading("Open a stamp file to plot it  (File → Open…)");
            } else {
                ui.heading("Nothing to plot for this selection");
            }
        });
        return;
    };

    ui.heading(&figure.title);

    let mut plot = Plot::new("figure_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label(figure.x_label.clone())
        .y_axis_label(figure.y_label.clone())
        .show_axes([true, figure.y_ticks])
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if figure.x_axis != Axis::Linear {
        plot = plot.x_axis_formatter(axis_formatter(figure.x_axis));
    }
    if figure.y_axis != Axis::Linear {
        plot = plot.y_axis_formatter(axis_formatter(figure.y_axis));
    }
    if let Some((lo, hi)) = figure.x_range {
        plot = plot.include_x(lo).include_x(hi);
    }
    if let Some((lo, hi)) = figure.y_range {
        plot = plot.include_y(lo).include_y(hi);
    }

    plot.show(ui, |plot_ui| {
        for layer in &figure.layers {
            match layer {
                Layer::Bars {
                    name,
                    bars,
                    width,
                    color,
                    alpha,
                } => {
                    let bars: Vec<Bar> = bars
                        .iter()
                        .map(|&[x, h]| Bar::new(x, h).width(*width))
                        .collect();
                    plot_ui.bar_chart(
                        BarChart::new(bars)
                            .name(name)
                            .color(color.gamma_multiply(*alpha)),
                    );
                }
                Layer::Line {
                    name,
                    points,
                    style,
                    alpha,
                } => {
                    let color = style.color.gamma_multiply(*alpha);
                    let series: PlotPoints = points.iter().copied().collect();
                    match line_style(style.line) {
                        Some(dash) => {
                            plot_ui.line(Line::new(series).name(name).color(color).width(1.5).style(dash));
                        }
                        None => {
                            plot_ui.points(Points::new(series).name(name).color(color).radius(2.0));
                        }
                    }
                }
            }
        }
    });
}

/// egui_plot dash pattern; `None` for marker-only series.
fn line_style(style: LineStyle) -> Option<egui_plot::LineStyle> {
    match style {
        LineStyle::Solid => Some(egui_plot::LineStyle::Solid),
        LineStyle::Dashed => Some(egui_plot::LineStyle::dashed_loose()),
        LineStyle::Dotted => Some(egui_plot::LineStyle::dotted_dense()),
        LineStyle::DashDot => Some(egui_plot::LineStyle::dashed_dense()),
        LineStyle::Points => None,
    }
}

/// Tick labels for epoch-second and log10 axes.
fn axis_formatter(axis: Axis) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String + 'static {
    move |mark: GridMark, _range: &RangeInclusive<f64>| match axis {
        Axis::Linear => format!("{}", mark.value),
        Axis::Log10 => format!("1e{:.1}", mark.value),
        Axis::Time => {
            let secs = mark.value.floor();
            let nanos = ((mark.value - secs) * 1e9) as u32;
            DateTime::<Utc>::from_timestamp(secs as i64, nanos)
                .map(|t| t.format("%m-%d %H:%M:%S").to_string())
                .unwrap_or_default()
        }
    }
}
