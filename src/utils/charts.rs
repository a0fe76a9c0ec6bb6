//! Per-epoch training curves as standalone SVG
//!
//! The output has no scripts or external fonts, so it opens in any browser.

use std::fmt::Write;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 500.0;
/// Plot area insets: top, right, bottom, left
const INSET: (f64, f64, f64, f64) = (60.0, 40.0, 80.0, 80.0);
const Y_TICKS: usize = 5;
const FONT: &str = "Arial, sans-serif";

pub const COLOR_PRIMARY: &str = "#3498db";
pub const COLOR_SECONDARY: &str = "#2ecc71";
pub const COLOR_TERTIARY: &str = "#e74c3c";
const GRID: &str = "#ecf0f1";
const INK: &str = "#2c3e50";

/// One named line
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub color: String,
    pub points: Vec<(f64, f64)>,
}

impl DataSeries {
    pub fn new(name: &str, color: &str, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            points: points.into_iter().collect(),
        }
    }
}

/// Y axis scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YAxis {
    /// Fixed 0-100 range with `%` tick labels
    Percent,
    /// 0 to just above the largest value
    Auto,
}

/// Maps data coordinates onto the plot area
struct Frame {
    x_min: f64,
    x_span: f64,
    y_max: f64,
}

impl Frame {
    fn fit(series: &[DataSeries], y_axis: YAxis) -> Self {
        let all = || series.iter().flat_map(|s| s.points.iter());
        let x_min = all().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let x_max = all().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let peak = all().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        let y_max = match y_axis {
            YAxis::Percent => peak.max(100.0),
            YAxis::Auto if peak.is_finite() && peak > 0.0 => peak * 1.1,
            YAxis::Auto => 1.0,
        };
        Self {
            x_min: if x_min.is_finite() { x_min } else { 0.0 },
            x_span: if x_max > x_min { x_max - x_min } else { 1.0 },
            y_max,
        }
    }

    fn plot_width() -> f64 {
        WIDTH - INSET.1 - INSET.3
    }

    fn plot_height() -> f64 {
        HEIGHT - INSET.0 - INSET.2
    }

    fn x(&self, value: f64) -> f64 {
        INSET.3 + (value - self.x_min) / self.x_span * Self::plot_width()
    }

    fn y(&self, value: f64) -> f64 {
        INSET.0 + Self::plot_height() * (1.0 - value / self.y_max)
    }
}

fn text(svg: &mut String, x: f64, y: f64, size: u32, anchor: &str, extra: &str, body: &str) {
    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="{}" font-family="{}" font-size="{}" fill="{}"{}>{}</text>"#,
        x, y, anchor, FONT, size, INK, extra, body
    );
}

fn line(svg: &mut String, from: (f64, f64), to: (f64, f64), color: &str, width: u32) {
    let _ = write!(
        svg,
        r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{}"/>"#,
        from.0, from.1, to.0, to.1, color, width
    );
}

/// Render `series` as one SVG document
pub fn render_line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[DataSeries],
    y_axis: YAxis,
) -> String {
    let frame = Frame::fit(series, y_axis);
    let left = INSET.3;
    let right = WIDTH - INSET.1;
    let bottom = HEIGHT - INSET.2;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}"><rect width="{w}" height="{h}" fill="white"/>"#,
        w = WIDTH,
        h = HEIGHT
    );
    text(&mut svg, WIDTH / 2.0, 35.0, 18, "middle", r#" font-weight="bold""#, &escape_xml(title));

    for tick in 0..=Y_TICKS {
        let value = frame.y_max * tick as f64 / Y_TICKS as f64;
        let y = frame.y(value);
        line(&mut svg, (left, y), (right, y), GRID, 1);
        let label = match y_axis {
            YAxis::Percent => format!("{:.0}%", value),
            YAxis::Auto => format!("{:.3}", value),
        };
        text(&mut svg, left - 10.0, y + 4.0, 12, "end", "", &label);
    }

    line(&mut svg, (left, bottom), (right, bottom), INK, 2);
    line(&mut svg, (left, INSET.0), (left, bottom), INK, 2);
    text(&mut svg, (left + right) / 2.0, HEIGHT - 20.0, 14, "middle", "", &escape_xml(x_label));
    let rotate = format!(r#" transform="rotate(-90 20 {})""#, HEIGHT / 2.0);
    text(&mut svg, 20.0, HEIGHT / 2.0, 14, "middle", &rotate, &escape_xml(y_label));

    for s in series.iter().filter(|s| !s.points.is_empty()) {
        let mut d = String::new();
        for (i, &(x, y)) in s.points.iter().enumerate() {
            let _ = write!(d, "{}{:.2} {:.2} ", if i == 0 { "M" } else { "L" }, frame.x(x), frame.y(y));
        }
        let _ = write!(
            svg,
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="3"/>"#,
            d.trim_end(),
            s.color
        );
        for &(x, y) in &s.points {
            let _ = write!(
                svg,
                r#"<circle cx="{:.2}" cy="{:.2}" r="4" fill="{}" stroke="white" stroke-width="2"/>"#,
                frame.x(x),
                frame.y(y),
                s.color
            );
        }
    }

    // epochs are shared, so the first series labels the x axis
    if let Some(first) = series.first() {
        for &(x, _) in &first.points {
            text(&mut svg, frame.x(x), bottom + 20.0, 11, "middle", "", &format!("{:.0}", x));
        }
    }

    for (row, s) in series.iter().enumerate() {
        let y = INSET.0 + 10.0 + 25.0 * row as f64;
        let _ = write!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="15" height="15" fill="{}"/>"#,
            right - 120.0,
            y,
            s.color
        );
        text(&mut svg, right - 100.0, y + 12.0, 12, "start", "", &escape_xml(&s.name));
    }

    svg.push_str("</svg>");
    svg
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
