//! SVG documents for bar and pie charts
//!
//! Layout mirrors a 9 inch wide figure at 100 dpi whose height grows with
//! the number of categories (at least 3.5 inches, 0.6 inches per entry).

use super::{format_value, Orientation, SeriesPoint};

const WIDTH: f64 = 900.0;
const MIN_HEIGHT: f64 = 350.0;
const ROW_HEIGHT: f64 = 60.0;
const BAR_COLOR: &str = "#2f855a";
const FONT: &str = "font-family=\"DejaVu Sans, Arial, sans-serif\"";

/// Default matplotlib color cycle, used for pie wedges
const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

fn figure_height(entries: usize) -> f64 {
    (entries as f64 * ROW_HEIGHT).max(MIN_HEIGHT)
}

/// Escape text for inclusion in SVG character data or attribute values
pub fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

struct Canvas {
    height: f64,
    body: String,
}

impl Canvas {
    fn new(height: f64, title: &str) -> Self {
        let mut canvas = Self {
            height,
            body: String::new(),
        };
        canvas.body.push_str(&format!(
            "<rect x=\"0\" y=\"0\" width=\"{:.0}\" height=\"{:.0}\" fill=\"#ffffff\"/>\n",
            WIDTH, height
        ));
        canvas.text(WIDTH / 2.0, 30.0, title, "middle", 16, "");
        canvas
    }

    fn text(&mut self, x: f64, y: f64, content: &str, anchor: &str, size: u32, extra: &str) {
        self.body.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"{}\" dominant-baseline=\"middle\" font-size=\"{}\" {} {}>{}</text>\n",
            x,
            y,
            anchor,
            size,
            FONT,
            extra,
            escape_xml(content)
        ));
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: &str) {
        self.body.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>\n",
            x, y, width, height, fill
        ));
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.body.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"#333333\" stroke-width=\"1\"/>\n",
            x1, y1, x2, y2
        ));
    }

    fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\">\n{body}</svg>\n",
            w = WIDTH,
            h = self.height,
            body = self.body
        )
    }
}

/// Value range of the axis, always including zero
fn value_range(points: &[SeriesPoint]) -> (f64, f64) {
    let min = points.iter().map(|p| p.value).fold(0.0_f64, f64::min);
    let max = points.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    if (max - min).abs() < f64::EPSILON {
        (min, min + 1.0)
    } else {
        (min, max)
    }
}

fn label_width(points: &[SeriesPoint]) -> f64 {
    let longest = points
        .iter()
        .map(|p| p.label.chars().count())
        .max()
        .unwrap_or(0);
    (longest as f64 * 7.0 + 20.0).clamp(80.0, 260.0)
}

/// Bar chart; `points` are drawn in order, first entry first
pub fn bar_chart(
    points: &[SeriesPoint],
    metric_name: &str,
    title: &str,
    orientation: Orientation,
) -> String {
    let height = figure_height(points.len());
    let mut canvas = Canvas::new(height, title);
    let (vmin, vmax) = value_range(points);
    let count = points.len().max(1) as f64;

    match orientation {
        Orientation::Horizontal => {
            let (x0, x1) = (label_width(points), WIDTH - 80.0);
            let (y0, y1) = (55.0, height - 50.0);
            let scale = |v: f64| x0 + (v - vmin) / (vmax - vmin) * (x1 - x0);
            let band = (y1 - y0) / count;

            for tick in 0..=4 {
                let v = vmin + (vmax - vmin) * tick as f64 / 4.0;
                canvas.line(scale(v), y1, scale(v), y1 + 5.0);
                canvas.text(scale(v), y1 + 15.0, &format_value(v), "middle", 10, "");
            }

            // Inverted category axis: index 0 at the top.
            for (index, point) in points.iter().enumerate() {
                let top = y0 + band * index as f64 + band * 0.1;
                let center = y0 + band * (index as f64 + 0.5);
                let (from, to) = (scale(0.0), scale(point.value));
                canvas.rect(from.min(to), top, (to - from).abs(), band * 0.8, BAR_COLOR);
                canvas.text(x0 - 8.0, center, &point.label, "end", 11, "");
                canvas.text(
                    to + 4.0,
                    center,
                    &format!(" {}", format_value(point.value)),
                    "start",
                    9,
                    "",
                );
            }

            canvas.line(scale(0.0), y0, scale(0.0), y1);
            canvas.line(x0, y1, x1, y1);
            canvas.text((x0 + x1) / 2.0, height - 15.0, metric_name, "middle", 12, "");
        }
        Orientation::Vertical => {
            let longest = points
                .iter()
                .map(|p| p.label.chars().count())
                .max()
                .unwrap_or(0) as f64;
            let bottom = (longest * 5.0 + 40.0).clamp(60.0, 200.0);
            let (x0, x1) = (80.0, WIDTH - 30.0);
            let (y0, y1) = (55.0, height - bottom);
            let scale = |v: f64| y1 - (v - vmin) / (vmax - vmin) * (y1 - y0);
            let band = (x1 - x0) / count;

            for tick in 0..=4 {
                let v = vmin + (vmax - vmin) * tick as f64 / 4.0;
                canvas.line(x0 - 5.0, scale(v), x0, scale(v));
                canvas.text(x0 - 8.0, scale(v), &format_value(v), "end", 10, "");
            }

            for (index, point) in points.iter().enumerate() {
                let left = x0 + band * index as f64 + band * 0.1;
                let center = x0 + band * (index as f64 + 0.5);
                let (from, to) = (scale(0.0), scale(point.value));
                canvas.rect(left, from.min(to), band * 0.8, (to - from).abs(), BAR_COLOR);
                let label_y = y1 + 12.0;
                canvas.text(
                    center,
                    label_y,
                    &point.label,
                    "end",
                    11,
                    &format!("transform=\"rotate(-35 {:.2} {:.2})\"", center, label_y),
                );
                canvas.text(
                    center,
                    to.min(from) - 8.0,
                    &format_value(point.value),
                    "middle",
                    9,
                    "",
                );
            }

            canvas.line(x0, scale(0.0), x1, scale(0.0));
            canvas.line(x0, y0, x0, y1);
            canvas.text(
                20.0,
                (y0 + y1) / 2.0,
                metric_name,
                "middle",
                12,
                &format!("transform=\"rotate(-90 20 {:.2})\"", (y0 + y1) / 2.0),
            );
        }
    }

    canvas.finish()
}

/// Pie chart; wedges start at 3 o'clock and run counterclockwise
///
/// Wedges carry labels only, no value annotations.
pub fn pie_chart(points: &[SeriesPoint], title: &str) -> String {
    let height = figure_height(points.len());
    let mut canvas = Canvas::new(height, title);
    let (cx, cy) = (WIDTH / 2.0, (height + 45.0) / 2.0);
    let radius = ((height - 45.0).min(WIDTH) / 2.0) * 0.7;
    let total: f64 = points.iter().map(|p| p.value).sum();
    let point_at = |angle: f64, r: f64| (cx + r * angle.cos(), cy - r * angle.sin());

    let mut start = 0.0_f64;
    for (index, point) in points.iter().enumerate() {
        let fraction = if total > 0.0 { point.value / total } else { 0.0 };
        let sweep = fraction * std::f64::consts::TAU;
        let color = PALETTE[index % PALETTE.len()];

        if fraction >= 0.9999 {
            canvas.body.push_str(&format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\"/>\n",
                cx, cy, radius, color
            ));
        } else if fraction > 0.0 {
            let (sx, sy) = point_at(start, radius);
            let (ex, ey) = point_at(start + sweep, radius);
            let large_arc = if sweep > std::f64::consts::PI { 1 } else { 0 };
            canvas.body.push_str(&format!(
                "<path d=\"M {:.2} {:.2} L {:.2} {:.2} A {:.2} {:.2} 0 {} 0 {:.2} {:.2} Z\" fill=\"{}\"/>\n",
                cx, cy, sx, sy, radius, radius, large_arc, ex, ey, color
            ));
        }

        let middle = start + sweep / 2.0;
        let (lx, ly) = point_at(middle, radius * 1.1);
        let anchor = if middle.cos() >= 0.0 { "start" } else { "end" };
        canvas.text(lx, ly, &point.label, anchor, 11, "");
        start += sweep;
    }

    canvas.finish()
}
