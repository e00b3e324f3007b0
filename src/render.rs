// 🎨 Renderer - hexgrid choropleths + cumulative time series
//
// Four PNGs, 16×9 inches at 100 DPI:
//   total_value.png       sum of line-item value per region
//   value_per_capita.png  value ÷ population
//   record_count.png      number of transfer records
//   cumulative_value.png  running total per region over time
//
// Map colors use a log scale. A region with no usable value (missing
// population, zero) still gets drawn, in NO_DATA_COLOR.

use crate::aggregator::{RegionSummary, TimeSeriesPoint};
use crate::error::{PipelineError, Result};
use crate::geometry::{bounds, join_geometry, RegionGeometry};
use chrono::{Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DPI: u32 = 100;
pub const WIDTH: u32 = 16 * DPI;
pub const HEIGHT: u32 = 9 * DPI;

const FONT: &str = "sans-serif";
const LEGEND_WIDTH: u32 = 220;

pub const NO_DATA_COLOR: RGBColor = RGBColor(204, 204, 204);

/// Yellow → orange → dark red
const GRADIENT: &[RGBColor] = &[
    RGBColor(255, 255, 204),
    RGBColor(254, 217, 118),
    RGBColor(253, 141, 60),
    RGBColor(227, 26, 28),
    RGBColor(128, 0, 38),
];

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoroplethMetric {
    TotalValue,
    ValuePerCapita,
    RecordCount,
}

impl ChoroplethMetric {
    pub const ALL: [ChoroplethMetric; 3] = [
        ChoroplethMetric::TotalValue,
        ChoroplethMetric::ValuePerCapita,
        ChoroplethMetric::RecordCount,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ChoroplethMetric::TotalValue => "Total value of transferred equipment",
            ChoroplethMetric::ValuePerCapita => "Value of transferred equipment per resident",
            ChoroplethMetric::RecordCount => "Number of transfer records",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ChoroplethMetric::TotalValue => "total_value.png",
            ChoroplethMetric::ValuePerCapita => "value_per_capita.png",
            ChoroplethMetric::RecordCount => "record_count.png",
        }
    }

    pub fn value(&self, summary: &RegionSummary) -> Option<f64> {
        match self {
            ChoroplethMetric::TotalValue => Some(summary.sum_value),
            ChoroplethMetric::ValuePerCapita => summary.value_per_capita(),
            ChoroplethMetric::RecordCount => Some(summary.num_records as f64),
        }
    }

    pub fn format(&self, value: f64) -> String {
        match self {
            ChoroplethMetric::RecordCount => compact_number(value),
            ChoroplethMetric::ValuePerCapita => format!("${:.2}", value),
            ChoroplethMetric::TotalValue => format!("${}", compact_number(value)),
        }
    }
}

/// 1234567 → "1.2M"
pub fn compact_number(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{:.0}", value)
    }
}

// ============================================================================
// LOG COLOR SCALE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogColorScale {
    pub min: f64,
    pub max: f64,
}

impl LogColorScale {
    /// Scale over the strictly positive values; None if there are none
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite() && *v > 0.0)
            .fold(None, |acc, v| match acc {
                None => Some(LogColorScale { min: v, max: v }),
                Some(scale) => Some(LogColorScale {
                    min: scale.min.min(v),
                    max: scale.max.max(v),
                }),
            })
    }

    /// Position on the scale in [0, 1]; None when the value can't be placed
    pub fn position(&self, value: f64) -> Option<f64> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        let (lo, hi) = (self.min.ln(), self.max.ln());
        if (hi - lo).abs() < f64::EPSILON {
            return Some(1.0);
        }
        Some(((value.ln() - lo) / (hi - lo)).clamp(0.0, 1.0))
    }

    pub fn color(&self, value: Option<f64>) -> RGBColor {
        value
            .and_then(|v| self.position(v))
            .map(gradient)
            .unwrap_or(NO_DATA_COLOR)
    }
}

/// Linear interpolation across GRADIENT stops
pub fn gradient(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let segments = (GRADIENT.len() - 1) as f64;
    let scaled = t * segments;
    let idx = (scaled.floor() as usize).min(GRADIENT.len() - 2);
    let local = scaled - idx as f64;

    let RGBColor(r0, g0, b0) = GRADIENT[idx];
    let RGBColor(r1, g1, b1) = GRADIENT[idx + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * local).round() as u8;
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCharts {
    pub total_value: PathBuf,
    pub value_per_capita: PathBuf,
    pub record_count: PathBuf,
    pub cumulative_value: PathBuf,
    /// Summary rows plus shapes dropped by the geometry join
    pub dropped_regions: usize,
}

pub const CUMULATIVE_FILE_NAME: &str = "cumulative_value.png";

/// Render all four charts into `output_dir`
pub fn render_all(
    summaries: &[RegionSummary],
    points: &[TimeSeriesPoint],
    geometries: &[RegionGeometry],
    output_dir: &Path,
) -> Result<RenderedCharts> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| PipelineError::render(&output_dir.display().to_string(), e))?;

    let join = join_geometry(geometries, summaries);
    let map = |metric: ChoroplethMetric| -> Result<PathBuf> {
        let path = output_dir.join(metric.file_name());
        render_choropleth(&join.matched, metric, &path)?;
        tracing::info!(chart = metric.file_name(), "rendered");
        Ok(path)
    };

    let total_value = map(ChoroplethMetric::TotalValue)?;
    let value_per_capita = map(ChoroplethMetric::ValuePerCapita)?;
    let record_count = map(ChoroplethMetric::RecordCount)?;

    let cumulative_value = output_dir.join(CUMULATIVE_FILE_NAME);
    render_time_series(points, &cumulative_value)?;
    tracing::info!(chart = CUMULATIVE_FILE_NAME, "rendered");

    Ok(RenderedCharts {
        total_value,
        value_per_capita,
        record_count,
        cumulative_value,
        dropped_regions: join.dropped(),
    })
}

// ============================================================================
// CHOROPLETH
// ============================================================================

/// Draw one hexgrid map
pub fn render_choropleth(
    matched: &[(&RegionGeometry, &RegionSummary)],
    metric: ChoroplethMetric,
    path: &Path,
) -> Result<()> {
    let chart_name = metric.file_name();
    let err = |e: &dyn std::fmt::Display| PipelineError::render(chart_name, e);

    let scale = LogColorScale::from_values(matched.iter().filter_map(|(_, s)| metric.value(s)));
    let (min_x, min_y, max_x, max_y) =
        bounds(matched.iter().flat_map(|(g, _)| g.rings.iter().flatten()))
            .unwrap_or((-180.0, -85.0, 180.0, 85.0));
    let pad_x = ((max_x - min_x) * 0.05).max(1.0);
    let pad_y = ((max_y - min_y) * 0.05).max(1.0);

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| err(&e))?;
    let (map_area, legend_area) = root.split_horizontally(WIDTH - LEGEND_WIDTH);

    let mut chart = ChartBuilder::on(&map_area)
        .caption(metric.title(), (FONT, 40))
        .margin(30)
        .build_cartesian_2d((min_x - pad_x)..(max_x + pad_x), (min_y - pad_y)..(max_y + pad_y))
        .map_err(|e| err(&e))?;

    let label_style = TextStyle::from((FONT, 18).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));

    for (geometry, summary) in matched {
        let fill = match &scale {
            Some(scale) => scale.color(metric.value(summary)),
            None => NO_DATA_COLOR,
        };

        for ring in &geometry.rings {
            chart
                .draw_series(std::iter::once(Polygon::new(ring.clone(), fill.filled())))
                .map_err(|e| err(&e))?;

            let mut outline = ring.clone();
            if let Some(first) = ring.first() {
                outline.push(*first);
            }
            chart
                .draw_series(std::iter::once(PathElement::new(
                    outline,
                    WHITE.stroke_width(2),
                )))
                .map_err(|e| err(&e))?;
        }

        chart
            .draw_series(std::iter::once(Text::new(
                summary.region_code.clone(),
                geometry.centroid,
                label_style.clone(),
            )))
            .map_err(|e| err(&e))?;
    }

    draw_legend(&legend_area, scale.as_ref(), metric).map_err(|e| err(&e))?;

    root.present().map_err(|e| err(&e))?;
    Ok(())
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    scale: Option<&LogColorScale>,
    metric: ChoroplethMetric,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    const STEPS: i32 = 100;
    let (bar_left, bar_right) = (30, 70);
    let (bar_top, bar_bottom) = (150, HEIGHT as i32 - 200);
    let step_height = (bar_bottom - bar_top) / STEPS;
    let text = (FONT, 18).into_font();

    if let Some(scale) = scale {
        // top = max
        for i in 0..STEPS {
            let t = 1.0 - i as f64 / (STEPS - 1) as f64;
            let y = bar_top + i * step_height;
            area.draw(&Rectangle::new(
                [(bar_left, y), (bar_right, y + step_height)],
                gradient(t).filled(),
            ))?;
        }
        area.draw(&Text::new(metric.format(scale.max), (bar_right + 10, bar_top), text.clone()))?;
        area.draw(&Text::new(
            metric.format(scale.min),
            (bar_right + 10, bar_top + STEPS * step_height - 18),
            text.clone(),
        ))?;
        area.draw(&Text::new("(log scale)", (bar_left, bar_top - 40), text.clone()))?;
    }

    let swatch_top = bar_bottom + 40;
    area.draw(&Rectangle::new(
        [(bar_left, swatch_top), (bar_right, swatch_top + 30)],
        NO_DATA_COLOR.filled(),
    ))?;
    area.draw(&Text::new("No data", (bar_right + 10, swatch_top + 5), text))?;
    Ok(())
}

// ============================================================================
// TIME SERIES
// ============================================================================

/// Per-region cumulative series as (days since first date, value)
fn series_by_region(points: &[TimeSeriesPoint], start: NaiveDate) -> BTreeMap<&str, Vec<(f64, f64)>> {
    let mut series: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for point in points {
        let day = (point.date - start).num_days() as f64;
        series
            .entry(point.region_code.as_str())
            .or_default()
            .push((day, point.cumulative_daily_sum_value));
    }
    series
}

/// One line per region, labelled at its last point
pub fn render_time_series(points: &[TimeSeriesPoint], path: &Path) -> Result<()> {
    let err = |e: &dyn std::fmt::Display| PipelineError::render(CUMULATIVE_FILE_NAME, e);

    let start = points.iter().map(|p| p.date).min();
    let end = points.iter().map(|p| p.date).max();
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            tracing::warn!("no dated records, cumulative chart will be empty");
            let today = chrono::Utc::now().date_naive();
            (today, today)
        }
    };
    let span = ((end - start).num_days() as f64).max(1.0);
    let max_value = points
        .iter()
        .map(|p| p.cumulative_daily_sum_value)
        .fold(0.0, f64::max)
        .max(1.0);

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| err(&e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Cumulative value of transferred equipment", (FONT, 40))
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(90)
        // Room on the right for end-of-line labels
        .build_cartesian_2d(0.0..span * 1.06, 0.0..max_value * 1.05)
        .map_err(|e| err(&e))?;

    let format_day = |day: &f64| {
        (start + Duration::days(day.round() as i64))
            .format("%Y-%m")
            .to_string()
    };
    let format_value = |value: &f64| format!("${}", compact_number(*value));

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(10)
        .y_labels(8)
        .x_label_formatter(&format_day)
        .y_label_formatter(&format_value)
        .label_style((FONT, 18))
        .draw()
        .map_err(|e| err(&e))?;

    let label_style = TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Left, VPos::Center));

    for (idx, (region, series)) in series_by_region(points, start).into_iter().enumerate() {
        let color = Palette99::pick(idx);
        chart
            .draw_series(LineSeries::new(series.iter().copied(), color.stroke_width(2)))
            .map_err(|e| err(&e))?;

        if let Some(&(x, y)) = series.last() {
            chart
                .draw_series(std::iter::once(Text::new(
                    region.to_string(),
                    (x + span * 0.005, y),
                    label_style.clone().color(&color),
                )))
                .map_err(|e| err(&e))?;
        }
    }

    root.present().map_err(|e| err(&e))?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::parse_geometries;
    use crate::geometry::tests::hexgrid;

    fn summary(code: &str, sum_value: f64, num_records: usize, population: Option<u64>) -> RegionSummary {
        RegionSummary {
            region_code: code.to_string(),
            region_name: None,
            sum_value,
            num_records,
            population,
        }
    }

    #[test]
    fn test_log_scale_positions() {
        let scale = LogColorScale::from_values(vec![10.0, 1000.0, 100.0]).unwrap();
        assert_eq!(scale.min, 10.0);
        assert_eq!(scale.max, 1000.0);

        assert_eq!(scale.position(10.0), Some(0.0));
        assert_eq!(scale.position(1000.0), Some(1.0));
        // 100 is halfway on a log scale
        assert!((scale.position(100.0).unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_log_scale_ignores_non_positive() {
        let scale = LogColorScale::from_values(vec![0.0, -5.0, 50.0]).unwrap();
        assert_eq!(scale.min, 50.0);
        assert_eq!(scale.position(50.0), Some(1.0));

        assert!(LogColorScale::from_values(vec![0.0, f64::NAN]).is_none());
    }

    #[test]
    fn test_no_data_color() {
        let scale = LogColorScale::from_values(vec![1.0, 100.0]).unwrap();
        assert_eq!(scale.color(None), NO_DATA_COLOR);
        assert_eq!(scale.color(Some(0.0)), NO_DATA_COLOR);
        assert_ne!(scale.color(Some(50.0)), NO_DATA_COLOR);
    }

    #[test]
    fn test_gradient_endpoints() {
        assert_eq!(gradient(0.0), GRADIENT[0]);
        assert_eq!(gradient(1.0), GRADIENT[GRADIENT.len() - 1]);
        assert_eq!(gradient(0.25), GRADIENT[1]);
        assert_eq!(gradient(7.0), GRADIENT[GRADIENT.len() - 1]);
    }

    #[test]
    fn test_metric_values() {
        let with_pop = summary("CA", 200.0, 4, Some(100));
        let without_pop = summary("GU", 200.0, 4, None);

        assert_eq!(ChoroplethMetric::TotalValue.value(&with_pop), Some(200.0));
        assert_eq!(ChoroplethMetric::RecordCount.value(&with_pop), Some(4.0));
        assert_eq!(ChoroplethMetric::ValuePerCapita.value(&with_pop), Some(2.0));
        assert_eq!(ChoroplethMetric::ValuePerCapita.value(&without_pop), None);
    }

    #[test]
    fn test_file_names_are_distinct() {
        let mut names: Vec<&str> = ChoroplethMetric::ALL.iter().map(|m| m.file_name()).collect();
        names.push(CUMULATIVE_FILE_NAME);
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_compact_number() {
        assert_eq!(compact_number(950.0), "950");
        assert_eq!(compact_number(1_500.0), "1.5K");
        assert_eq!(compact_number(2_300_000.0), "2.3M");
        assert_eq!(compact_number(7_100_000_000.0), "7.1B");
    }

    #[test]
    fn test_series_by_region_offsets_days() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let points = vec![
            TimeSeriesPoint {
                region_code: "AK".to_string(),
                date: start,
                daily_sum_value: 5.0,
                cumulative_daily_sum_value: 5.0,
            },
            TimeSeriesPoint {
                region_code: "AK".to_string(),
                date: NaiveDate::from_ymd_opt(2020, 1, 11).unwrap(),
                daily_sum_value: 5.0,
                cumulative_daily_sum_value: 10.0,
            },
        ];

        let series = series_by_region(&points, start);
        assert_eq!(series["AK"], vec![(0.0, 5.0), (10.0, 10.0)]);
    }

    fn assert_png(path: &Path) {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n']));
    }

    #[test]
    fn test_render_all_writes_four_pngs() {
        let geometries = parse_geometries(hexgrid(), "google_name").unwrap();
        let mut california = summary("CA", 200.0, 2, Some(1_000));
        california.region_name = Some("California".to_string());
        // No population: per-capita map falls back to the no-data color
        let mut texas = summary("TX", 155.0, 3, None);
        texas.region_name = Some("Texas".to_string());
        let summaries = vec![california, texas, summary("ZZ", 1.0, 1, None)];

        let day = |d: u32| NaiveDate::from_ymd_opt(2020, 6, d).unwrap();
        let point = |code: &str, date: NaiveDate, daily: f64, cumulative: f64| TimeSeriesPoint {
            region_code: code.to_string(),
            date,
            daily_sum_value: daily,
            cumulative_daily_sum_value: cumulative,
        };
        let points = vec![
            point("CA", day(1), 100.0, 100.0),
            point("CA", day(20), 100.0, 200.0),
            point("TX", day(5), 125.0, 125.0),
        ];

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("charts");
        let charts = render_all(&summaries, &points, &geometries, &output_dir).unwrap();

        for path in [
            &charts.total_value,
            &charts.value_per_capita,
            &charts.record_count,
            &charts.cumulative_value,
        ] {
            assert!(path.starts_with(&output_dir));
            assert_png(path);
        }
        assert_eq!(
            charts.total_value.file_name().unwrap(),
            ChoroplethMetric::TotalValue.file_name()
        );
        assert_eq!(charts.cumulative_value.file_name().unwrap(), CUMULATIVE_FILE_NAME);
        // ZZ has no shape, Maine has no summary
        assert_eq!(charts.dropped_regions, 2);
    }

    #[test]
    fn test_render_all_with_no_data() {
        let geometries = parse_geometries(hexgrid(), "google_name").unwrap();
        let dir = tempfile::tempdir().unwrap();

        let charts = render_all(&[], &[], &geometries, dir.path()).unwrap();
        assert_png(&charts.total_value);
        assert_png(&charts.cumulative_value);
        assert_eq!(charts.dropped_regions, 3);
    }

    #[test]
    fn test_dimensions_are_16_by_9_inches() {
        assert_eq!(WIDTH, 1600);
        assert_eq!(HEIGHT, 900);
    }
}
