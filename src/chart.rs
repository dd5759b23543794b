use anyhow::Result;
use chrono::NaiveDate;
use plotters::prelude::*;

use crate::metrics::{format_count, Trend};
use crate::{from_days, to_days};

const WIDTH: u32 = 900;
const HEIGHT: u32 = 420;
const BAR_COLOR: RGBColor = RGBColor(99, 110, 250);

/// 每个国家一条折线，x 轴为日期
pub fn line_chart(title: &str, y_desc: &str, trend: &Trend) -> Result<String> {
    let points = trend.values().flatten();
    let (mut x_min, mut x_max) = points
        .clone()
        .map(|(d, _)| to_days(*d))
        .fold((i32::MAX, i32::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)));
    if x_min > x_max {
        return placeholder(title);
    }
    if x_min == x_max {
        x_min -= 1;
        x_max += 1;
    }
    let y_max = upper_bound(points.map(|(_, v)| *v));

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20))
            .margin(15)
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

        chart
            .configure_mesh()
            .x_labels(6)
            .x_label_formatter(&|d| from_days(*d).map(day_label).unwrap_or_default())
            .y_label_formatter(&|v| format_count(*v))
            .y_desc(y_desc)
            .draw()?;

        for (idx, (country, series)) in trend.iter().enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            chart
                .draw_series(LineSeries::new(
                    series.iter().map(|(d, v)| (to_days(*d), *v)),
                    color.stroke_width(2),
                ))?
                .label(country.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
    }
    Ok(svg)
}

/// 按国家的柱状图
pub fn bar_chart(title: &str, y_desc: &str, bars: &[(String, f64)]) -> Result<String> {
    if bars.is_empty() {
        return placeholder(title);
    }
    let y_max = upper_bound(bars.iter().map(|(_, v)| *v));
    let names: Vec<&str> = bars.iter().map(|(c, _)| c.as_str()).collect();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20))
            .margin(15)
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d((0u32..names.len() as u32).into_segmented(), 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(names.len())
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => names
                    .get(*i as usize)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .y_label_formatter(&|v| format_count(*v))
            .y_desc(y_desc)
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BAR_COLOR.filled())
                .margin(10)
                .data(bars.iter().enumerate().map(|(i, (_, v))| (i as u32, *v))),
        )?;

        root.present()?;
    }
    Ok(svg)
}

/// "Reds" 连续色阶：0 为白色，`max` 为深红
pub fn reds(value: f64, max: f64) -> RGBColor {
    const LOW: (f64, f64, f64) = (255.0, 245.0, 240.0);
    const HIGH: (f64, f64, f64) = (103.0, 0.0, 13.0);

    let t = if max > 0.0 && value.is_finite() {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mix = |lo: f64, hi: f64| (lo + (hi - lo) * t).round() as u8;
    RGBColor(mix(LOW.0, HIGH.0), mix(LOW.1, HIGH.1), mix(LOW.2, HIGH.2))
}

/// CSS 颜色字符串
pub fn hex(color: RGBColor) -> String {
    format!("#{:02x}{:02x}{:02x}", color.0, color.1, color.2)
}

fn placeholder(title: &str) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(title, ("sans-serif", 20))?;
        root.draw(&Text::new(
            "No data for the current selection",
            (WIDTH as i32 / 2 - 140, HEIGHT as i32 / 2 - 30),
            ("sans-serif", 16).into_font().color(&BLACK.mix(0.6)),
        ))?;
        root.present()?;
    }
    Ok(svg)
}

fn upper_bound(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.filter(|v| v.is_finite()).fold(0.0, f64::max);
    if max <= 0.0 {
        1.0
    } else {
        max * 1.05
    }
}

fn day_label(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    #[test]
    fn line_chart_renders_svg_with_legend() {
        let mut trend = Trend::new();
        trend.insert("Global".into(), vec![(day(1), 10.0), (day(2), 20.0)]);
        trend.insert("France".into(), vec![(day(1), 3.0)]);

        let svg = line_chart("Total COVID-19 Cases", "Total Cases", &trend).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Total COVID-19 Cases"));
        assert!(svg.contains("France"));
        assert!(svg.contains("Global"));
    }

    #[test]
    fn single_day_line_chart_still_renders() {
        let mut trend = Trend::new();
        trend.insert("Global".into(), vec![(day(5), 1.0)]);
        assert!(line_chart("t", "y", &trend).unwrap().contains("<svg"));
    }

    #[test]
    fn empty_inputs_render_placeholder() {
        let svg = line_chart("Empty", "y", &Trend::new()).unwrap();
        assert!(svg.contains("No data for the current selection"));
        let svg = bar_chart("Empty", "y", &[]).unwrap();
        assert!(svg.contains("No data for the current selection"));
    }

    #[test]
    fn bar_chart_labels_countries() {
        let bars = vec![("France".to_string(), 50.0), ("Global".to_string(), 110.0)];
        let svg = bar_chart("Total Cases by Country", "Total Cases", &bars).unwrap();
        assert!(svg.contains("France"));
        assert!(svg.contains("Global"));
    }

    #[test]
    fn reds_scale_endpoints() {
        assert_eq!(hex(reds(0.0, 100.0)), "#fff5f0");
        assert_eq!(hex(reds(100.0, 100.0)), "#67000d");
        assert_eq!(hex(reds(500.0, 100.0)), "#67000d");
        assert_eq!(hex(reds(5.0, 0.0)), "#fff5f0");
    }
}
