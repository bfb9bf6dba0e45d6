//! Text bar chart rendering for value series.

use crate::domain::chart::ChartPoint;

/// Smallest whole-dollar value per `*` that keeps every bar within `max_width`.
pub fn scale_for(points: &[ChartPoint], max_width: usize) -> u64 {
    let max_value = points.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    let width = max_width.max(1) as f64;
    ((max_value / width).ceil() as u64).max(1)
}

pub fn render(title: &str, points: &[ChartPoint], max_width: usize) -> String {
    if points.is_empty() {
        return format!("{title}\n\nNo data points.\n");
    }

    let scale = scale_for(points, max_width);
    let label_width = points.iter().map(|p| p.label.len()).max().unwrap_or(0);

    let mut out = format!("{title}\n\n");
    for point in points {
        let stars = if point.value > 0.0 {
            (point.value / scale as f64).round() as usize
        } else {
            0
        };
        out.push_str(&format!(
            "{:<width$}: {}\n",
            point.label,
            "*".repeat(stars.min(max_width.max(1))),
            width = label_width
        ));
    }
    out.push_str(&format!("\nScale: * = ${}\n", scale));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(label: &str, value: f64) -> ChartPoint {
        ChartPoint {
            label: label.to_string(),
            value,
        }
    }

    #[test]
    fn scale_keeps_largest_bar_within_width() {
        let points = vec![point("a", 1000.0), point("b", 4990.0)];
        assert_eq!(scale_for(&points, 50), 100);
        let points = vec![point("a", 5001.0)];
        assert_eq!(scale_for(&points, 50), 101);
    }

    #[test]
    fn scale_has_floor_of_one_dollar() {
        assert_eq!(scale_for(&[point("a", 3.0)], 50), 1);
        assert_eq!(scale_for(&[point("a", 0.0)], 50), 1);
    }

    #[test]
    fn render_draws_one_line_per_point() {
        let points = vec![
            point("2024-01-01", 100.0),
            point("2024-02-01", 250.0),
            point("2024-03-01", 0.0),
        ];
        let chart = render("Performance of portfolio P", &points, 5);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0], "Performance of portfolio P");
        assert_eq!(lines[2], "2024-01-01: **");
        assert_eq!(lines[3], "2024-02-01: *****");
        assert_eq!(lines[4], "2024-03-01: ");
        assert_eq!(lines[6], "Scale: * = $50");
    }

    #[test]
    fn render_empty_series() {
        let chart = render("T", &[], 50);
        assert!(chart.contains("No data points."));
    }
}
