//! Raster output of a [`Figure`]: frame, grid, bars, lines, title, axis
//! labels and tick labels. Glyphs come from egui's bundled fonts so saved
//! images read like the viewer.

use std::path::Path;

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use chrono::{DateTime, Utc};
use eframe::egui::{Color32, FontDefinitions};
use image::{ImageFormat, Rgb, RgbImage};

use crate::error::{Error, Result};

use super::{widen, Axis, Figure, Layer, LineStyle};

// Plot area insets: room for the title above, tick labels and the x label
// below, tick labels and the upright y label on the left.
const LEFT: u32 = 72;
const RIGHT: u32 = 24;
const TOP: u32 = 32;
const BOTTOM: u32 = 48;

const GRID_DIVISIONS: u32 = 5;
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const FRAME: Rgb<u8> = Rgb([0, 0, 0]);

const FONT_NAME: &str = "Ubuntu-Light";
const TITLE_PX: f32 = 16.0;
const LABEL_PX: f32 = 13.0;
const TICK_PX: f32 = 11.0;

/// Write `figure` as a PNG image.
pub fn save_png(figure: &Figure, path: &Path) -> Result<()> {
    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Png) => {}
        _ => {
            return Err(Error::Render(format!(
                "{} is not a .png path",
                path.display()
            )))
        }
    }
    rasterize(figure)?.save_with_format(path, ImageFormat::Png)?;
    log::info!("saved plot '{}' to {}", figure.title, path.display());
    Ok(())
}

/// Maps data coordinates onto the plot area.
struct Frame {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn px(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.left + (x - self.x0) / (self.x1 - self.x0) * self.width,
            self.top + (self.y1 - y) / (self.y1 - self.y0) * self.height,
        )
    }
}

fn load_font() -> Result<FontVec> {
    let definitions = FontDefinitions::default();
    let data = definitions
        .font_data
        .get(FONT_NAME)
        .ok_or_else(|| Error::Render(format!("font {FONT_NAME} is not bundled")))?;
    FontVec::try_from_vec_and_index(data.font.to_vec(), data.index)
        .map_err(|e| Error::Render(format!("font {FONT_NAME}: {e}")))
}

pub fn rasterize(figure: &Figure) -> Result<RgbImage> {
    let font = load_font()?;
    let (w, h) = (
        figure.size.0.max(LEFT + RIGHT + 2),
        figure.size.1.max(TOP + BOTTOM + 2),
    );
    let mut img = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
    let (right, bottom) = (w - RIGHT, h - BOTTOM);

    let grid_x = |i: u32| LEFT + (right - LEFT) * i / GRID_DIVISIONS;
    let grid_y = |i: u32| TOP + (bottom - TOP) * i / GRID_DIVISIONS;
    for i in 0..=GRID_DIVISIONS {
        for yy in TOP..=bottom {
            img.put_pixel(grid_x(i), yy, GRID);
        }
        if figure.y_ticks {
            for xx in LEFT..=right {
                img.put_pixel(xx, grid_y(i), GRID);
            }
        }
    }

    let bounds = figure
        .bounds()
        .filter(|b| [b.0, b.1, b.2, b.3].iter().all(|v| v.is_finite()));
    if let Some((x0, x1, y0, y1)) = bounds {
        let (x0, x1) = widen(x0, x1);
        let (y0, y1) = widen(y0, y1);
        let frame = Frame {
            x0,
            x1,
            y0,
            y1,
            left: f64::from(LEFT),
            top: f64::from(TOP),
            width: f64::from(right - LEFT),
            height: f64::from(bottom - TOP),
        };
        let clip = (i64::from(LEFT), i64::from(TOP), i64::from(right), i64::from(bottom));
        for layer in &figure.layers {
            match layer {
                Layer::Bars {
                    bars,
                    width,
                    color,
                    alpha,
                    ..
                } => {
                    for &[x, height] in bars {
                        if height <= 0.0 {
                            continue;
                        }
                        let (ax, ay) = frame.px(x - width / 2.0, height);
                        let (bx, by) = frame.px(x + width / 2.0, y0.max(0.0));
                        fill(&mut img, clip, (ax, ay), (bx, by), *color, *alpha);
                    }
                }
                Layer::Line {
                    points,
                    style,
                    alpha,
                    ..
                } => {
                    let pixels: Vec<(f64, f64)> =
                        points.iter().map(|p| frame.px(p[0], p[1])).collect();
                    if style.line == LineStyle::Points {
                        for &(x, y) in &pixels {
                            marker(&mut img, clip, x, y, style.color, *alpha);
                        }
                    } else {
                        let mut step = 0usize;
                        for pair in pixels.windows(2) {
                            if let Some((a, b)) = clip_segment(pair[0], pair[1], clip) {
                                line(&mut img, clip, a, b, style.color, *alpha, style.line, &mut step);
                            }
                        }
                    }
                }
            }
        }

        let span = (x1 - x0, y1 - y0);
        for i in 0..=GRID_DIVISIONS {
            let fraction = f64::from(i) / f64::from(GRID_DIVISIONS);
            let label = tick_label(figure.x_axis, x0 + fraction * span.0, span.0);
            let width = text_width(&font, TICK_PX, &label);
            let x = grid_x(i) as f32 - width / 2.0;
            draw_text(&mut img, &font, TICK_PX, (x, bottom as f32 + 4.0), &label, false);

            if figure.y_ticks {
                let label = tick_label(figure.y_axis, y1 - fraction * span.1, span.1);
                let width = text_width(&font, TICK_PX, &label);
                let at = (LEFT as f32 - 4.0 - width, grid_y(i) as f32 - TICK_PX / 2.0);
                draw_text(&mut img, &font, TICK_PX, at, &label, false);
            }
        }
    }

    let title_width = text_width(&font, TITLE_PX, &figure.title);
    draw_text(&mut img, &font, TITLE_PX, ((w as f32 - title_width) / 2.0, 6.0), &figure.title, false);

    let plot_mid = (LEFT + right) as f32 / 2.0;
    let x_label_width = text_width(&font, LABEL_PX, &figure.x_label);
    let at = (plot_mid - x_label_width / 2.0, h as f32 - LABEL_PX - 6.0);
    draw_text(&mut img, &font, LABEL_PX, at, &figure.x_label, false);

    let y_label_width = text_width(&font, LABEL_PX, &figure.y_label);
    let at = (4.0, (TOP + bottom) as f32 / 2.0 + y_label_width / 2.0);
    draw_text(&mut img, &font, LABEL_PX, at, &figure.y_label, true);

    for x in LEFT..=right {
        img.put_pixel(x, TOP, FRAME);
        img.put_pixel(x, bottom, FRAME);
    }
    for y in TOP..=bottom {
        img.put_pixel(LEFT, y, FRAME);
        img.put_pixel(right, y, FRAME);
    }
    Ok(img)
}

/// Tick text for `value` on an axis spanning `span`.
fn tick_label(axis: Axis, value: f64, span: f64) -> String {
    match axis {
        Axis::Log10 => format!("1e{value:.1}"),
        Axis::Time => DateTime::<Utc>::from_timestamp(value.round() as i64, 0)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_default(),
        Axis::Linear => {
            let magnitude = value.abs().max(span.abs());
            if magnitude >= 1e5 || magnitude < 1e-2 {
                format!("{value:.2e}")
            } else {
                let step = span / f64::from(GRID_DIVISIONS);
                let decimals = (1.0 - step.log10().floor()).clamp(0.0, 4.0) as usize;
                format!("{value:.decimals$}")
            }
        }
    }
}

fn text_width(font: &FontVec, size: f32, text: &str) -> f32 {
    let scaled = font.as_scaled(PxScale::from(size));
    let mut previous = None;
    let mut width = 0.0;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

/// Draw `text` in black with the top left of its box at `at`. An `upright`
/// run reads bottom to top with `at` as its bottom left corner.
fn draw_text(img: &mut RgbImage, font: &FontVec, size: f32, at: (f32, f32), text: &str, upright: bool) {
    let scaled = font.as_scaled(PxScale::from(size));
    let clip = (0, 0, i64::from(img.width()) - 1, i64::from(img.height()) - 1);
    let (ox, oy) = (at.0.round() as i64, at.1.round() as i64);
    let mut caret = 0.0;
    let mut previous = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scaled.scale(), point(caret, scaled.ascent()));
        caret += scaled.h_advance(id);
        previous = Some(id);

        let Some(outline) = font.outline_glyph(glyph) else {
            continue;
        };
        let corner = outline.px_bounds().min;
        outline.draw(|gx, gy, coverage| {
            let u = corner.x as i64 + i64::from(gx);
            let v = corner.y as i64 + i64::from(gy);
            let (x, y) = if upright { (ox + v, oy - u) } else { (ox + u, oy + v) };
            blend(img, clip, x, y, Color32::BLACK, coverage);
        });
    }
}

type Clip = (i64, i64, i64, i64);

/// Liang-Barsky clip of the segment `a`-`b` to `clip`, in pixel space.
/// `None` when the segment misses the area or is not finite.
fn clip_segment(a: (f64, f64), b: (f64, f64), clip: Clip) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    if ![a.0, a.1, b.0, b.1, dx, dy].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (xmin, ymin, xmax, ymax) = (clip.0 as f64, clip.1 as f64, clip.2 as f64, clip.3 as f64);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, a.0 - xmin), (dx, xmax - a.0), (-dy, a.1 - ymin), (dy, ymax - a.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

fn blend(img: &mut RgbImage, clip: Clip, x: i64, y: i64, color: Color32, alpha: f32) {
    if x < clip.0 || y < clip.1 || x > clip.2 || y > clip.3 {
        return;
    }
    let a = alpha.clamp(0.0, 1.0);
    let px = img.get_pixel_mut(x as u32, y as u32);
    for (c, new) in px.0.iter_mut().zip([color.r(), color.g(), color.b()]) {
        *c = (f32::from(*c) * (1.0 - a) + f32::from(new) * a).round() as u8;
    }
}

fn fill(img: &mut RgbImage, clip: Clip, a: (f64, f64), b: (f64, f64), color: Color32, alpha: f32) {
    let (x0, x1) = (a.0.min(b.0).round() as i64, a.0.max(b.0).round() as i64);
    let (y0, y1) = (a.1.min(b.1).round() as i64, a.1.max(b.1).round() as i64);
    for y in y0.max(clip.1)..=y1.min(clip.3) {
        for x in x0.max(clip.0)..=x1.min(clip.2) {
            blend(img, clip, x, y, color, alpha);
        }
    }
}

fn marker(img: &mut RgbImage, clip: Clip, x: f64, y: f64, color: Color32, alpha: f32) {
    let inside = |v: f64, lo: i64, hi: i64| (lo as f64 - 1.0..=hi as f64 + 1.0).contains(&v);
    if !inside(x, clip.0, clip.2) || !inside(y, clip.1, clip.3) {
        return;
    }
    let (x, y) = (x.round() as i64, y.round() as i64);
    for dy in -1..=1 {
        for dx in -1..=1 {
            blend(img, clip, x + dx, y + dy, color, alpha);
        }
    }
}

/// On/off run lengths in pixels. Empty means solid.
fn dash_pattern(style: LineStyle) -> &'static [usize] {
    match style {
        LineStyle::Solid | LineStyle::Points => &[],
        LineStyle::Dashed => &[6, 4],
        LineStyle::Dotted => &[1, 3],
        LineStyle::DashDot => &[6, 3, 1, 3],
    }
}

/// Bresenham line between two points inside the plot area. `step` carries
/// the dash phase across segments.
#[allow(clippy::too_many_arguments)]
fn line(
    img: &mut RgbImage,
    clip: Clip,
    from: (f64, f64),
    to: (f64, f64),
    color: Color32,
    alpha: f32,
    style: LineStyle,
    step: &mut usize,
) {
    let pattern = dash_pattern(style);
    let period: usize = pattern.iter().sum();
    let (mut x, mut y) = (from.0.round() as i64, from.1.round() as i64);
    let (x1, y1) = (to.0.round() as i64, to.1.round() as i64);
    let (dx, dy) = ((x1 - x).abs(), -(y1 - y).abs());
    let (sx, sy) = (if x < x1 { 1 } else { -1 }, if y < y1 { 1 } else { -1 });
    let mut err = dx + dy;

    loop {
        let on = period == 0 || {
            let mut phase = *step % period;
            let mut on = true;
            for &run in pattern {
                if phase < run {
                    break;
                }
                phase -= run;
                on = !on;
            }
            on
        };
        if on {
            blend(img, clip, x, y, color, alpha);
        }
        *step += 1;
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plots::Style;

    fn figure(line: LineStyle) -> Figure {
        let mut fig = Figure::new("t", (200, 150));
        fig.layers.push(Layer::Line {
            name: "diag".into(),
            points: vec![[0.0, 0.0], [1.0, 1.0]],
            style: Style {
                color: Color32::from_rgb(255, 0, 0),
                line,
            },
            alpha: 1.0,
        });
        fig
    }

    fn red_pixels(img: &RgbImage) -> usize {
        img.pixels().filter(|p| p.0 == [255, 0, 0]).count()
    }

    /// Text-coloured pixels in the half-open box `x0..x1` by `y0..y1`.
    fn ink(img: &RgbImage, (x0, x1): (u32, u32), (y0, y1): (u32, u32)) -> usize {
        (y0..y1)
            .flat_map(|y| (x0..x1).map(move |x| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y).0.iter().all(|&c| c < 192))
            .count()
    }

    #[test]
    fn dashes_leave_gaps() {
        let solid = red_pixels(&rasterize(&figure(LineStyle::Solid)).unwrap());
        let dashed = red_pixels(&rasterize(&figure(LineStyle::Dashed)).unwrap());
        assert!(solid > 50);
        assert!(dashed < solid && dashed > solid / 3);
    }

    #[test]
    fn bars_are_blended() {
        let mut fig = Figure::new("h", (200, 150));
        fig.layers.push(Layer::Bars {
            name: "h".into(),
            bars: vec![[0.5, 1.0]],
            width: 1.0,
            color: Color32::from_rgb(0, 0, 255),
            alpha: 0.5,
        });
        let img = rasterize(&fig).unwrap();
        assert_eq!(img.get_pixel(100, 75).0, [128, 128, 255]);
    }

    #[test]
    fn segments_are_clipped_to_the_plot_area() {
        let clip = (10, 10, 110, 60);
        let (a, b) = clip_segment((60.0, 35.0), (60.0, 1e300), clip).unwrap();
        assert_eq!(a, (60.0, 35.0));
        assert_eq!(b, (60.0, 60.0));

        let (a, b) = clip_segment((-1e300, 35.0), (1e300, 35.0), clip).unwrap();
        assert_eq!((a.0, b.0), (10.0, 110.0));

        assert!(clip_segment((0.0, 0.0), (5.0, 5.0), clip).is_none());
        assert!(clip_segment((0.0, 0.0), (f64::INFINITY, 5.0), clip).is_none());
        assert!(clip_segment((20.0, 20.0), (f64::NAN, 5.0), clip).is_none());
    }

    #[test]
    fn far_outliers_are_drawn_to_the_frame() {
        let mut fig = figure(LineStyle::Solid);
        fig.y_range = Some((0.0, 1.0));
        fig.layers.push(Layer::Line {
            name: "spike".into(),
            points: vec![[0.0, 0.5], [0.5, 1e300], [1.0, 0.5], [1.0, f64::INFINITY]],
            style: Style {
                color: Color32::from_rgb(0, 0, 255),
                line: LineStyle::Dotted,
            },
            alpha: 1.0,
        });
        let img = rasterize(&fig).unwrap();
        assert!(img.pixels().any(|p| p.0 == [0, 0, 255]));
    }

    #[test]
    fn titles_and_labels_are_drawn() {
        let mut fig = figure(LineStyle::Solid);
        let (w, h) = fig.size;
        let blank = rasterize(&Figure::new("", (w, h))).unwrap();
        assert_eq!(ink(&blank, (0, w), (0, TOP)), 0);
        assert_eq!(ink(&blank, (0, LEFT), (0, h)), 0);

        fig.title = "Round trip".into();
        fig.x_label = "time".into();
        fig.y_label = "rtt [ms]".into();
        let img = rasterize(&fig).unwrap();
        assert!(ink(&img, (0, w), (0, TOP)) > 20, "title");
        assert!(ink(&img, (0, 24), (TOP, h - BOTTOM)) > 20, "y label");
        assert!(ink(&img, (LEFT + 1, w - RIGHT), (h - 22, h)) > 10, "x label");
        assert!(ink(&img, (LEFT + 1, w), (h - BOTTOM + 2, h - 24)) > 10, "x ticks");
    }

    #[test]
    fn tick_labels_follow_the_axis() {
        assert_eq!(tick_label(Axis::Log10, -3.0, 4.0), "1e-3.0");
        assert_eq!(tick_label(Axis::Time, 1_330_000_016.0, 60.0), "12:26:56");
        assert_eq!(tick_label(Axis::Linear, 0.5, 1.0), "0.50");
        assert_eq!(tick_label(Axis::Linear, 250.0, 500.0), "250");
        assert_eq!(tick_label(Axis::Linear, 2e-6, 1e-6), "2.00e-6");
    }

    #[test]
    fn writes_a_decodable_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.png");
        let mut fig = figure(LineStyle::Dotted);
        fig.x_label = "x".into();
        save_png(&fig, &path).unwrap();
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!((img.width(), img.height()), (200, 150));
        assert!(ink(&img, (0, 200), (0, TOP)) > 0);

        assert!(matches!(
            save_png(&figure(LineStyle::Solid), &dir.path().join("plot.svg")),
            Err(Error::Render(_))
        ));
    }
}
