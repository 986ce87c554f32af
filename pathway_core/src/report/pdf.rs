//! Multi-page PDF output of figures
//!
//! Every figure gets its own page, sized to the figure. Text uses the builtin Helvetica font,
//! so labels are restricted to what its standard encoding can show.
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point, Polygon, Pt, Rgb, TextMatrix,
};
use tracing::{debug, warn};

use crate::plot::{Artist, Axes, Color, Figure, LegendPlacement, Panel, PieChart, Scale};
use crate::report::ReportError;

const MM_PER_INCH: f64 = 25.4;
const MM_PER_PT: f64 = 25.4 / 72.0;
/// Average Helvetica glyph width as a fraction of the font size
const GLYPH_WIDTH: f64 = 0.5;
const TICK_FONT: f64 = 8.0;
const LABEL_FONT: f64 = 10.0;
const TITLE_FONT: f64 = 12.0;
const LEGEND_FONT: f64 = 8.0;
const GRID_COLOR: Color = Color::rgb(0.85, 0.85, 0.85);

/// A PDF report under construction
///
/// Pages are kept in memory and written on [`PdfReport::close`]. A report that is dropped
/// without being closed still writes the pages added so far.
pub struct PdfReport {
    path: PathBuf,
    title: String,
    state: Option<ReportState>,
}

struct ReportState {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    pages: usize,
}

impl PdfReport {
    /// Start a report that will be written to `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        PdfReport {
            path,
            title,
            state: None,
        }
    }

    /// Number of pages added so far
    pub fn page_count(&self) -> usize {
        self.state.as_ref().map(|s| s.pages).unwrap_or(0)
    }

    /// Append a figure as a new page
    pub fn add_figure(&mut self, figure: &Figure) -> Result<(), ReportError> {
        let width = Mm((figure.width * MM_PER_INCH) as f32);
        let height = Mm((figure.height * MM_PER_INCH) as f32);
        let (mut state, layer) = match self.state.take() {
            None => {
                let (doc, page, layer) = PdfDocument::new(&self.title, width, height, "figure");
                let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
                let layer = doc.get_page(page).get_layer(layer);
                (ReportState { doc, font, pages: 0 }, layer)
            }
            Some(state) => {
                let (page, layer) = state.doc.add_page(width, height, "figure");
                let layer = state.doc.get_page(page).get_layer(layer);
                (state, layer)
            }
        };
        let canvas = Canvas {
            layer,
            font: &state.font,
        };
        let page = Frame {
            left: 0.0,
            bottom: 0.0,
            width: figure.width * MM_PER_INCH,
            height: figure.height * MM_PER_INCH,
        };
        match &figure.panel {
            Panel::Axes(axes) => draw_axes(&canvas, page, axes),
            Panel::Pie(pie) => draw_pie(&canvas, page, pie),
        }
        state.pages += 1;
        debug!(path = %self.path.display(), page = state.pages, "added report page");
        self.state = Some(state);
        Ok(())
    }

    /// Write the report and release it
    pub fn close(mut self) -> Result<(), ReportError> {
        self.flush()
    }

    fn flush(&mut self) -> Result<(), ReportError> {
        let state = match self.state.take() {
            Some(state) => state,
            // an empty report still gets a blank page so the file is a valid PDF
            None => {
                let (doc, _, _) =
                    PdfDocument::new(&self.title, Mm(215.9), Mm(279.4), "figure");
                let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
                ReportState { doc, font, pages: 0 }
            }
        };
        let mut writer = BufWriter::new(File::create(&self.path)?);
        state.doc.save(&mut writer)?;
        debug!(path = %self.path.display(), "report written");
        Ok(())
    }
}

impl Drop for PdfReport {
    fn drop(&mut self) {
        if self.state.is_some() {
            if let Err(e) = self.flush() {
                warn!(path = %self.path.display(), error = %e, "failed to write report");
            }
        }
    }
}

/// Rectangle on the page (mm, origin lower left)
#[derive(Clone, Copy, Debug)]
struct Frame {
    left: f64,
    bottom: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn right(&self) -> f64 {
        self.left + self.width
    }

    fn top(&self) -> f64 {
        self.bottom + self.height
    }

    fn at(&self, fx: f64, fy: f64) -> (f64, f64) {
        (self.left + fx * self.width, self.bottom + fy * self.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Align {
    Left,
    Center,
    Right,
}

struct Canvas<'a> {
    layer: PdfLayerReference,
    font: &'a IndirectFontRef,
}

impl Canvas<'_> {
    fn stroke(&self, points: &[(f64, f64)], color: Color, width_pt: f64, closed: bool) {
        if points.len() < 2 {
            return;
        }
        self.layer.set_outline_color(pdf_color(color));
        self.layer.set_outline_thickness(width_pt as f32);
        self.layer.add_line(Line {
            points: points.iter().map(|&(x, y)| (point(x, y), false)).collect(),
            is_closed: closed,
        });
    }

    fn fill(&self, points: &[(f64, f64)], color: Color) {
        if points.len() < 3 {
            return;
        }
        self.layer.set_fill_color(pdf_color(color));
        self.layer.add_polygon(Polygon {
            rings: vec![points.iter().map(|&(x, y)| (point(x, y), false)).collect()],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }

    fn fill_rect(&self, x0: f64, y0: f64, x1: f64, y1: f64, color: Color) {
        self.fill(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1)], color);
    }

    /// Single line of text with its baseline at `y`
    fn text(&self, text: &str, size: f64, x: f64, y: f64, align: Align) {
        let x = match align {
            Align::Left => x,
            Align::Center => x - text_width(text, size) / 2.0,
            Align::Right => x - text_width(text, size),
        };
        self.layer.set_fill_color(pdf_color(Color::BLACK));
        self.layer
            .use_text(text, size as f32, Mm(x as f32), Mm(y as f32), self.font);
    }

    /// Single line of text rotated by 90 degrees, centred on `y`
    fn vertical_text(&self, text: &str, size: f64, x: f64, y: f64) {
        let y = y - text_width(text, size) / 2.0;
        self.layer.set_fill_color(pdf_color(Color::BLACK));
        self.layer.begin_text_section();
        self.layer.set_font(self.font, size as f32);
        self.layer.set_text_matrix(TextMatrix::TranslateRotate(
            Pt((x / MM_PER_PT) as f32),
            Pt((y / MM_PER_PT) as f32),
            90.0,
        ));
        self.layer.write_text(text, self.font);
        self.layer.end_text_section();
    }
}

fn point(x: f64, y: f64) -> Point {
    Point::new(Mm(x as f32), Mm(y as f32))
}

fn pdf_color(color: Color) -> printpdf::Color {
    printpdf::Color::Rgb(Rgb::new(
        color.r as f32,
        color.g as f32,
        color.b as f32,
        None,
    ))
}

/// Estimated width (mm) of a line of text
fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * GLYPH_WIDTH * MM_PER_PT
}

/// Position of `value` along an axis with the given limits, as a fraction of the axis length
///
/// Degenerate limits put every value in the middle of the axis.
fn axis_fraction(value: f64, limits: (f64, f64), scale: Scale) -> f64 {
    let (lo, hi) = limits;
    let (offset, span) = match scale {
        Scale::Linear => (value - lo, hi - lo),
        Scale::Log => {
            if value <= 0.0 {
                return f64::NEG_INFINITY;
            }
            (value.log10() - lo.log10(), hi.log10() - lo.log10())
        }
    };
    if !(span.is_finite() && span > 0.0) {
        return 0.5;
    }
    offset / span
}

// region Axes

fn draw_axes(canvas: &Canvas, page: Frame, axes: &Axes) {
    let x_limits = axes.x_limits();
    let y_limits = axes.y_limits();
    let x_ticks = axes.x_ticks();
    let y_ticks = axes.y_ticks();
    let legend = axes.legend_entries();

    let tick_label_width = y_ticks
        .iter()
        .map(|(_, label)| text_width(label, TICK_FONT))
        .fold(0.0, f64::max);
    let y_label_room = if axes.y.label.is_some() { 8.0 } else { 0.0 };
    let left = (page.width * 0.1).max(tick_label_width + y_label_room + 4.0);
    let bottom = if x_ticks.is_empty() && axes.x.label.is_none() {
        page.height * 0.1
    } else {
        (page.height * 0.11).max(16.0)
    };
    let top = if axes.title.is_some() {
        page.height * 0.1
    } else {
        page.height * 0.05
    };
    let legend_width = legend
        .iter()
        .map(|(label, _)| text_width(label, LEGEND_FONT))
        .fold(0.0, f64::max)
        + 12.0;
    let right = match axes.legend {
        Some(LegendPlacement::OutsideRight) if !legend.is_empty() => legend_width + 6.0,
        _ => page.width * 0.05,
    };
    let frame = Frame {
        left,
        bottom,
        width: (page.width - left - right).max(10.0),
        height: (page.height - bottom - top).max(10.0),
    };
    let fx = |x: f64| axis_fraction(x, x_limits, axes.x.scale);
    let fy = |y: f64| axis_fraction(y, y_limits, axes.y.scale);
    let inside = |f: f64| (-1e-9..=1.0 + 1e-9).contains(&f);

    // grid
    if axes.x.grid {
        for (x, _) in &x_ticks {
            let f = fx(*x);
            if inside(f) {
                canvas.stroke(&[frame.at(f, 0.0), frame.at(f, 1.0)], GRID_COLOR, 0.5, false);
            }
        }
    }
    if axes.y.grid {
        for (y, _) in &y_ticks {
            let f = fy(*y);
            if inside(f) {
                canvas.stroke(&[frame.at(0.0, f), frame.at(1.0, f)], GRID_COLOR, 0.5, false);
            }
        }
    }

    for artist in &axes.artists {
        match artist {
            Artist::Rectangles { color, rects, .. } => {
                for rect in rects {
                    let x0 = fx(rect.x0).clamp(0.0, 1.0);
                    let x1 = fx(rect.x1).clamp(0.0, 1.0);
                    let y0 = fy(rect.y0).clamp(0.0, 1.0);
                    let y1 = fy(rect.y1).clamp(0.0, 1.0);
                    if x0 == x1 || y0 == y1 {
                        continue;
                    }
                    let (px0, py0) = frame.at(x0, y0);
                    let (px1, py1) = frame.at(x1, y1);
                    canvas.fill_rect(px0, py0, px1, py1, *color);
                }
            }
            Artist::Line {
                color,
                width,
                points,
                ..
            } => {
                let points: Vec<(f64, f64)> = points
                    .iter()
                    .map(|&(x, y)| (fx(x), fy(y)))
                    .filter(|(x, y)| x.is_finite() && y.is_finite())
                    .map(|(x, y)| frame.at(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0)))
                    .collect();
                canvas.stroke(&points, *color, *width, false);
            }
            Artist::Markers {
                color,
                size,
                points,
                ..
            } => {
                let half = size * MM_PER_PT / 2.0;
                for &(x, y) in points {
                    let (x, y) = (fx(x), fy(y));
                    if !(inside(x) && inside(y)) {
                        continue;
                    }
                    let (px, py) = frame.at(x, y);
                    canvas.fill_rect(px - half, py - half, px + half, py + half, *color);
                }
            }
            Artist::Text { x, y, text, size } => {
                let (px, py) = frame.at(fx(*x), fy(*y));
                // the last line sits on the anchor, earlier lines stack upwards
                let lines: Vec<&str> = text.split('\n').collect();
                let leading = size * 1.2 * MM_PER_PT;
                for (k, line) in lines.iter().enumerate() {
                    let offset = (lines.len() - 1 - k) as f64 * leading;
                    canvas.text(line, *size, px, py + offset, Align::Left);
                }
            }
        }
    }

    if axes.spines {
        canvas.stroke(
            &[
                (frame.left, frame.bottom),
                (frame.right(), frame.bottom),
                (frame.right(), frame.top()),
                (frame.left, frame.top()),
            ],
            Color::BLACK,
            0.8,
            true,
        );
    }

    // ticks and labels
    let tick_length = 1.2;
    for (x, label) in &x_ticks {
        let f = fx(*x);
        if !inside(f) {
            continue;
        }
        let (px, py) = frame.at(f, 0.0);
        canvas.stroke(&[(px, py), (px, py - tick_length)], Color::BLACK, 0.6, false);
        canvas.text(label, TICK_FONT, px, py - tick_length - 3.5, Align::Center);
    }
    for (y, label) in &y_ticks {
        let f = fy(*y);
        if !inside(f) {
            continue;
        }
        let (px, py) = frame.at(0.0, f);
        canvas.stroke(&[(px, py), (px - tick_length, py)], Color::BLACK, 0.6, false);
        canvas.text(label, TICK_FONT, px - tick_length - 1.0, py - 1.0, Align::Right);
    }
    if let Some(label) = &axes.x.label {
        let (px, _) = frame.at(0.5, 0.0);
        canvas.text(label, LABEL_FONT, px, frame.bottom - 11.0, Align::Center);
    }
    if let Some(label) = &axes.y.label {
        let (_, py) = frame.at(0.0, 0.5);
        let x = frame.left - tick_label_width - tick_length - 3.0;
        canvas.vertical_text(label, LABEL_FONT, x, py);
    }
    if let Some(title) = &axes.title {
        canvas.text(title, TITLE_FONT, frame.left + frame.width / 2.0, frame.top() + 3.0, Align::Center);
    }

    if let Some(placement) = axes.legend {
        if !legend.is_empty() {
            draw_legend(canvas, frame, placement, &legend, legend_width);
        }
    }
}

fn draw_legend(
    canvas: &Canvas,
    frame: Frame,
    placement: LegendPlacement,
    entries: &[(&str, Color)],
    width: f64,
) {
    let row = LEGEND_FONT * 1.6 * MM_PER_PT;
    let height = row * entries.len() as f64 + 2.0;
    let (left, top) = match placement {
        LegendPlacement::UpperRight => (frame.right() - width - 2.0, frame.top() - 2.0),
        LegendPlacement::OutsideRight => (
            frame.right() + 2.0,
            frame.bottom + frame.height / 2.0 + height / 2.0,
        ),
    };
    let bottom = top - height;
    canvas.fill_rect(left, bottom, left + width, top, Color::rgb(1.0, 1.0, 1.0));
    canvas.stroke(
        &[(left, bottom), (left + width, bottom), (left + width, top), (left, top)],
        Color::GREY,
        0.5,
        true,
    );
    for (k, (label, color)) in entries.iter().enumerate() {
        let baseline = top - 1.0 - row * (k + 1) as f64 + row * 0.3;
        canvas.fill_rect(left + 2.0, baseline, left + 6.0, baseline + 2.5, *color);
        canvas.text(label, LEGEND_FONT, left + 8.0, baseline, Align::Left);
    }
}

// endregion Axes

// region Pie

fn draw_pie(canvas: &Canvas, page: Frame, pie: &PieChart) {
    let center = (page.left + page.width / 2.0, page.bottom + page.height * 0.47);
    let radius = page.width.min(page.height) * 0.3;
    let fractions = pie.fractions();
    // slices run counter-clockwise starting at 12 o'clock
    let mut start = std::f64::consts::FRAC_PI_2;
    for (slice, fraction) in pie.slices.iter().zip(fractions) {
        if fraction <= 0.0 {
            continue;
        }
        let sweep = fraction * std::f64::consts::TAU;
        let steps = ((sweep / 0.05).ceil() as usize).max(2);
        let mut points = vec![center];
        for k in 0..=steps {
            let angle = start + sweep * k as f64 / steps as f64;
            points.push((
                center.0 + radius * angle.cos(),
                center.1 + radius * angle.sin(),
            ));
        }
        canvas.fill(&points, slice.color);
        canvas.stroke(&points, Color::rgb(1.0, 1.0, 1.0), 0.8, true);

        let middle = start + sweep / 2.0;
        let (lx, ly) = (
            center.0 + radius * 1.12 * middle.cos(),
            center.1 + radius * 1.12 * middle.sin(),
        );
        let align = if middle.cos() < -1e-9 {
            Align::Right
        } else if middle.cos() > 1e-9 {
            Align::Left
        } else {
            Align::Center
        };
        canvas.text(
            &format!("{} ({:.1}%)", slice.label, fraction * 100.0),
            LEGEND_FONT,
            lx,
            ly - 1.0,
            align,
        );
        start += sweep;
    }
    if let Some(title) = &pie.title {
        canvas.text(
            title,
            TITLE_FONT,
            center.0,
            page.top() - page.height * 0.08,
            Align::Center,
        );
    }
}

// endregion Pie

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{text_page, Axes, PieSlice, Rect, Ticks};
    use tempfile::tempdir;

    fn page_count(path: &Path) -> usize {
        lopdf::Document::load(path).unwrap().get_pages().len()
    }

    fn bar_figure() -> Figure {
        let mut axes = Axes::default();
        axes.title = Some("bars".to_string());
        axes.y.scale = Scale::Log;
        axes.y.grid = true;
        axes.x.ticks = Ticks::Labeled(vec![(0.0, "R1".to_string()), (1.0, "R2".to_string())]);
        axes.y.label = Some("demand [M]".to_string());
        axes.add(Artist::Rectangles {
            label: Some("capacity".to_string()),
            color: Color::BLUE,
            rects: vec![Rect::bar(0.0, 0.8, 1e-6, 1e-4), Rect::bar(1.0, 0.8, 1e-6, 1e-3)],
        });
        axes.add(Artist::Markers {
            label: Some("measured".to_string()),
            color: Color::RED,
            size: 5.0,
            points: vec![(0.0, 5e-5)],
        });
        axes.legend = Some(LegendPlacement::OutsideRight);
        Figure::with_axes(7.0, 4.0, axes)
    }

    #[test]
    fn one_page_per_figure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let mut report = PdfReport::create(&path);
        report.add_figure(&bar_figure()).unwrap();
        report.add_figure(&text_page("A + B <=> C")).unwrap();
        report
            .add_figure(&Figure::with_pie(
                5.0,
                5.0,
                PieChart {
                    title: Some("volume".to_string()),
                    slices: vec![
                        PieSlice {
                            label: "R1".to_string(),
                            value: 2.0,
                            color: Color::palette(0),
                        },
                        PieSlice {
                            label: "R2".to_string(),
                            value: 1.0,
                            color: Color::palette(1),
                        },
                    ],
                },
            ))
            .unwrap();
        assert_eq!(report.page_count(), 3);
        report.close().unwrap();
        assert_eq!(page_count(&path), 3);
    }

    #[test]
    fn dropped_report_is_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.pdf");
        {
            let mut report = PdfReport::create(&path);
            report.add_figure(&bar_figure()).unwrap();
        }
        assert_eq!(page_count(&path), 1);
    }

    #[test]
    fn empty_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        PdfReport::create(&path).close().unwrap();
        assert_eq!(page_count(&path), 1);
    }

    #[test]
    fn fractions_along_axes() {
        assert_eq!(axis_fraction(5.0, (0.0, 10.0), Scale::Linear), 0.5);
        assert!((axis_fraction(1e-4, (1e-6, 1e-2), Scale::Log) - 0.5).abs() < 1e-12);
        assert_eq!(axis_fraction(0.0, (1e-6, 1e-2), Scale::Log), f64::NEG_INFINITY);
        // a single compound pinned to one concentration
        assert_eq!(axis_fraction(1e-3, (1e-3, 1e-3), Scale::Log), 0.5);
        assert_eq!(axis_fraction(2.0, (2.0, 2.0), Scale::Linear), 0.5);
        assert_eq!(axis_fraction(1.0, (0.0, 1.0), Scale::Log), 0.5);
    }
}
