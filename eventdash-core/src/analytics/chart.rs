//! Chart geometry for line/area charts.
//!
//! Coordinates live in a virtual canvas with the origin at the top-left, so
//! larger counts get smaller `y` values. Output is a pure function of the
//! series and the canvas.

use serde::Serialize;

use super::bucketing::TimeSeriesBucket;
use crate::config::ChartConfig;

/// Number of labels on the value axis.
pub const TICK_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartGeometry {
    /// Largest count, never below 1
    pub max: i64,
    pub points: Vec<Point>,
    /// `points` followed by the two baseline corners
    pub area: Vec<Point>,
    /// Axis values from top to bottom, ending at 0
    pub ticks: Vec<i64>,
    /// y of the zero line
    pub baseline: f64,
}

impl ChartGeometry {
    /// `"x,y x,y ..."` for an SVG `polyline`.
    pub fn polyline(&self) -> String {
        format_points(&self.points)
    }

    /// `"x,y x,y ..."` for an SVG `polygon`.
    pub fn polygon(&self) -> String {
        format_points(&self.area)
    }
}

fn format_points(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Axis tick values: six evenly stepped labels from `5 * step` down to 0.
pub fn axis_ticks(max: i64) -> Vec<i64> {
    let step = ((max + 4) / 5).max(1);
    (0..TICK_COUNT as i64).rev().map(|i| i * step).collect()
}

pub fn build_geometry(series: &[TimeSeriesBucket], canvas: &ChartConfig) -> ChartGeometry {
    let inner_width = (canvas.width - canvas.padding * 2.0).max(0.0);
    let inner_height = (canvas.height - canvas.padding * 2.0).max(0.0);
    let baseline = canvas.padding + inner_height;
    let max = series.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let spacing = inner_width / (series.len().saturating_sub(1).max(1)) as f64;

    let points: Vec<Point> = series
        .iter()
        .enumerate()
        .map(|(i, bucket)| Point {
            x: canvas.padding + i as f64 * spacing,
            y: baseline - (bucket.count as f64 / max as f64) * inner_height,
        })
        .collect();

    let mut area = points.clone();
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        area.push(Point {
            x: last.x,
            y: baseline,
        });
        area.push(Point {
            x: first.x,
            y: baseline,
        });
    }

    ChartGeometry {
        max,
        points,
        area,
        ticks: axis_ticks(max),
        baseline,
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Standalone SVG document with the area, the line and both axes' labels.
pub fn render_svg(series: &[TimeSeriesBucket], canvas: &ChartConfig, title: &str) -> String {
    let geometry = build_geometry(series, canvas);
    let inner_height = geometry.baseline - canvas.padding;
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {} {}\" width=\"{}\" height=\"{}\">\n",
        canvas.width, canvas.height, canvas.width, canvas.height
    ));
    svg.push_str(&format!("  <title>{}</title>\n", escape_xml(title)));

    let tick_gap = inner_height / (TICK_COUNT - 1) as f64;
    for (i, tick) in geometry.ticks.iter().enumerate() {
        let y = canvas.padding + i as f64 * tick_gap;
        svg.push_str(&format!(
            "  <line x1=\"{}\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" stroke=\"#e5e7eb\"/>\n",
            canvas.padding,
            canvas.width - canvas.padding,
        ));
        svg.push_str(&format!(
            "  <text x=\"2\" y=\"{y}\" font-size=\"10\">{}</text>\n",
            tick
        ));
    }

    svg.push_str(&format!(
        "  <polygon points=\"{}\" fill=\"#6366f1\" fill-opacity=\"0.15\"/>\n",
        geometry.polygon()
    ));
    svg.push_str(&format!(
        "  <polyline points=\"{}\" fill=\"none\" stroke=\"#6366f1\" stroke-width=\"2\"/>\n",
        geometry.polyline()
    ));

    for (point, bucket) in geometry.points.iter().zip(series) {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"10\" text-anchor=\"middle\">{}</text>\n",
            point.x,
            canvas.height - 2.0,
            escape_xml(&bucket.label)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(counts: &[i64]) -> Vec<TimeSeriesBucket> {
        counts
            .iter()
            .enumerate()
            .map(|(i, c)| TimeSeriesBucket {
                label: format!("Mar {}", i + 1),
                count: *c,
            })
            .collect()
    }

    #[test]
    fn test_all_zero_series_is_flat() {
        let canvas = ChartConfig::default();
        let geometry = build_geometry(&series(&[0, 0, 0]), &canvas);
        assert_eq!(geometry.max, 1);
        assert!(geometry.points.iter().all(|p| p.y == 16.0 + 168.0));
        assert_eq!(geometry.ticks, vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_points_span_inner_width() {
        let canvas = ChartConfig::default();
        let geometry = build_geometry(&series(&[0, 5, 10]), &canvas);
        assert_eq!(geometry.max, 10);

        let xs: Vec<f64> = geometry.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![16.0, 300.0, 584.0]);
        let ys: Vec<f64> = geometry.points.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![184.0, 100.0, 16.0]);

        assert_eq!(geometry.polyline(), "16,184 300,100 584,16");
        assert_eq!(
            geometry.polygon(),
            "16,184 300,100 584,16 584,184 16,184"
        );
    }

    #[test]
    fn test_single_point_sits_on_left_padding() {
        let geometry = build_geometry(&series(&[3]), &ChartConfig::default());
        assert_eq!(geometry.points.len(), 1);
        assert_eq!(geometry.points[0].x, 16.0);
        assert_eq!(geometry.points[0].y, 16.0);
        assert_eq!(geometry.area.len(), 3);
    }

    #[test]
    fn test_empty_series() {
        let geometry = build_geometry(&[], &ChartConfig::default());
        assert!(geometry.points.is_empty());
        assert!(geometry.area.is_empty());
        assert_eq!(geometry.polyline(), "");
    }

    #[test]
    fn test_axis_ticks() {
        assert_eq!(axis_ticks(1), vec![5, 4, 3, 2, 1, 0]);
        assert_eq!(axis_ticks(10), vec![10, 8, 6, 4, 2, 0]);
        assert_eq!(axis_ticks(11), vec![15, 12, 9, 6, 3, 0]);
        assert_eq!(axis_ticks(1000).len(), TICK_COUNT);
    }

    #[test]
    fn test_geometry_is_deterministic() {
        let canvas = ChartConfig {
            width: 320.0,
            height: 120.0,
            padding: 8.0,
        };
        let data = series(&[4, 1, 7, 2]);
        assert_eq!(build_geometry(&data, &canvas), build_geometry(&data, &canvas));
    }

    #[test]
    fn test_render_svg() {
        let svg = render_svg(&series(&[1, 2]), &ChartConfig::default(), "Check-ins <daily>");
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<polyline points=\"16,100 584,16\""));
        assert!(svg.contains("Check-ins &lt;daily&gt;"));
        assert!(svg.contains(">Mar 2</text>"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
