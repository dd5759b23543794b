//! 把筛选后的数据渲染成单页 HTML
//!
//! 页面结构：侧边栏（筛选、更新时间、下载）、四个指标卡片、三个标签页。
//! 标签页只用 CSS 实现，不需要任何脚本。

use std::fmt::Write;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::debug;

use crate::chart::{bar_chart, hex, line_chart, reds};
use crate::config::DashboardConfig;
use crate::metrics::{format_count, format_delta, format_rate, max_by_country, trend, Summary};
use crate::schema::{TOTAL_CASES, TOTAL_DEATHS, VACCINATION_RATE};
use crate::{DataSet, Filter};

const STYLE: &str = r#"
body { margin: 0; font-family: sans-serif; display: flex; color: #262730; }
aside { width: 280px; min-height: 100vh; background: #f0f2f6; padding: 1.5rem; box-sizing: border-box; }
aside select { width: 100%; min-height: 8rem; }
aside input, aside button { width: 100%; margin-bottom: .75rem; }
aside .caption { font-size: .8rem; color: #6b6f7b; }
main { flex: 1; padding: 1.5rem 3rem; }
.metrics { display: grid; grid-template-columns: repeat(4, 1fr); gap: 1rem; }
.metric .label { font-size: .9rem; }
.metric .value { font-size: 2rem; }
.metric .delta { color: #09ab3b; font-size: .9rem; }
.metric .delta.down { color: #ff2b2b; }
.tabs > input { display: none; }
.tabs > label { display: inline-block; padding: .5rem 1rem; cursor: pointer; border-bottom: 2px solid transparent; }
.tabs > input:checked + label { border-bottom-color: #ff4b4b; }
.panel { display: none; }
#tab-trends:checked ~ #panel-trends,
#tab-geo:checked ~ #panel-geo,
#tab-compare:checked ~ #panel-compare { display: block; }
.columns { display: grid; grid-template-columns: 1fr 1fr; gap: 1rem; }
.columns svg { width: 100%; height: auto; }
table.heat td { padding: .25rem .75rem; }
"#;

/// 渲染页面需要的全部数据
#[derive(Debug, Clone)]
pub struct Dashboard {
    /// 侧边栏中可选的所有国家
    pub countries: Vec<String>,
    pub bounds: Option<(NaiveDate, NaiveDate)>,
    pub filter: Filter,
    pub rows: usize,
    pub summary: Summary,
    pub cases_chart: String,
    pub vaccination_chart: String,
    pub cases_bar: String,
    pub deaths_bar: String,
    /// 按病例数从高到低排列
    pub distribution: Vec<(String, f64)>,
    pub source_label: String,
}

impl Dashboard {
    pub fn build(ds: &DataSet, filter: Filter, config: &DashboardConfig) -> Result<Self> {
        let view = filter.apply(ds)?;
        debug!("{} of {} rows selected", view.height(), ds.height());

        let mut distribution = max_by_country(&view, TOTAL_CASES)?;
        distribution.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(Self {
            countries: ds.countries()?,
            bounds: ds.date_range()?,
            rows: view.height(),
            summary: Summary::compute(&view)?,
            cases_chart: line_chart(
                "Total COVID-19 Cases",
                TOTAL_CASES,
                &trend(&view, TOTAL_CASES)?,
            )?,
            vaccination_chart: line_chart(
                "Vaccination Rate Progress",
                VACCINATION_RATE,
                &trend(&view, VACCINATION_RATE)?,
            )?,
            cases_bar: bar_chart(
                "Total Cases by Country",
                TOTAL_CASES,
                &max_by_country(&view, TOTAL_CASES)?,
            )?,
            deaths_bar: bar_chart(
                "Total Deaths by Country",
                TOTAL_DEATHS,
                &max_by_country(&view, TOTAL_DEATHS)?,
            )?,
            distribution,
            filter,
            source_label: config.source_label.clone(),
        })
    }

    pub fn render(&self) -> String {
        let mut html = String::with_capacity(64 * 1024);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>COVID-19 Dashboard</title>\n<link rel=\"icon\" href=\"data:,\">\n");
        let _ = writeln!(html, "<style>{}</style>\n</head>\n<body>", STYLE);

        self.render_sidebar(&mut html);

        html.push_str("<main>\n<h1>🦠 COVID-19 Global Dashboard</h1>\n");
        html.push_str(
            "<p>This dashboard visualizes COVID-19 data across different countries and regions.\n\
             Data is updated regularly from reliable sources.</p>\n",
        );
        self.render_metrics(&mut html);
        self.render_tabs(&mut html);
        html.push_str("</main>\n</body>\n</html>\n");
        html
    }

    fn render_sidebar(&self, html: &mut String) {
        html.push_str("<aside>\n<h2>Filters</h2>\n<form method=\"get\" action=\"/\">\n");
        html.push_str("<input type=\"hidden\" name=\"applied\" value=\"1\">\n");
        html.push_str("<label for=\"country\">Select Countries</label>\n");
        html.push_str("<select id=\"country\" name=\"country\" multiple>\n");
        for country in &self.countries {
            let selected = if self.filter.countries.contains(country) {
                " selected"
            } else {
                ""
            };
            let c = escape(country);
            let _ = writeln!(html, "<option value=\"{c}\"{selected}>{c}</option>");
        }
        html.push_str("</select>\n");

        let (min, max) = match self.bounds {
            Some((min, max)) => (min.to_string(), max.to_string()),
            None => (String::new(), String::new()),
        };
        for (name, label, value) in [
            ("start", "Start Date", self.filter.start),
            ("end", "End Date", self.filter.end),
        ] {
            let value = value.map(|d| d.to_string()).unwrap_or_default();
            let _ = writeln!(
                html,
                "<label for=\"{name}\">{label}</label>\n\
                 <input type=\"date\" id=\"{name}\" name=\"{name}\" value=\"{value}\" min=\"{min}\" max=\"{max}\">"
            );
        }
        html.push_str("<button type=\"submit\">Apply</button>\n</form>\n<hr>\n");

        if let Some((_, last)) = self.bounds {
            let _ = writeln!(html, "<p class=\"caption\">Data last updated: {last}</p>");
        }
        let _ = writeln!(
            html,
            "<p class=\"caption\">Source: {}</p>\n<hr>",
            escape(&self.source_label)
        );
        let _ = writeln!(
            html,
            "<a href=\"/download?{}\" download>Download Data</a> <span class=\"caption\">({} rows)</span>\n</aside>",
            escape(&query_string(&self.filter)),
            self.rows
        );
    }

    fn render_metrics(&self, html: &mut String) {
        let s = &self.summary;
        html.push_str("<section class=\"metrics\">\n");
        metric(
            html,
            "Total Cases",
            &format_count(s.total_cases),
            Some(s.new_cases),
        );
        metric(
            html,
            "Total Deaths",
            &format_count(s.total_deaths),
            Some(s.new_deaths),
        );
        metric(html, "Recovery Rate", &format_rate(s.recovery_rate), None);
        metric(
            html,
            "Vaccination Rate",
            &format_rate(s.vaccination_rate),
            None,
        );
        html.push_str("</section>\n");
    }

    fn render_tabs(&self, html: &mut String) {
        html.push_str("<div class=\"tabs\">\n");
        html.push_str("<input type=\"radio\" name=\"tab\" id=\"tab-trends\" checked><label for=\"tab-trends\">📈 Trends</label>\n");
        html.push_str("<input type=\"radio\" name=\"tab\" id=\"tab-geo\"><label for=\"tab-geo\">🗺️ Geographic</label>\n");
        html.push_str("<input type=\"radio\" name=\"tab\" id=\"tab-compare\"><label for=\"tab-compare\">📊 Comparisons</label>\n");

        let _ = writeln!(
            html,
            "<section class=\"panel\" id=\"panel-trends\">\n\
             <h3>Cases Over Time</h3>\n{}\n\
             <h3>Vaccination Progress</h3>\n{}\n</section>",
            self.cases_chart, self.vaccination_chart
        );

        html.push_str("<section class=\"panel\" id=\"panel-geo\">\n<h3>Global Distribution</h3>\n");
        html.push_str("<table class=\"heat\">\n<tr><th>Country</th><th>Total Cases</th></tr>\n");
        let max = self.distribution.first().map(|(_, v)| *v).unwrap_or(0.0);
        for (country, cases) in &self.distribution {
            let fill = reds(*cases, max);
            let ink = if fill.1 < 128 { "#fff" } else { "#262730" };
            let _ = writeln!(
                html,
                "<tr style=\"background:{};color:{}\"><td>{}</td><td>{}</td></tr>",
                hex(fill),
                ink,
                escape(country),
                format_count(*cases)
            );
        }
        html.push_str("</table>\n</section>\n");

        let _ = writeln!(
            html,
            "<section class=\"panel\" id=\"panel-compare\">\n<div class=\"columns\">\n\
             <div><h3>Cases by Country</h3>\n{}\n</div>\n\
             <div><h3>Deaths by Country</h3>\n{}\n</div>\n</div>\n</section>",
            self.cases_bar, self.deaths_bar
        );
        html.push_str("</div>\n");
    }
}

fn metric(html: &mut String, label: &str, value: &str, delta: Option<f64>) {
    let _ = write!(
        html,
        "<div class=\"metric\"><div class=\"label\">{label}</div><div class=\"value\">{value}</div>"
    );
    if let Some(delta) = delta {
        let class = if delta.round() < 0.0 { "delta down" } else { "delta" };
        let _ = write!(html, "<div class=\"{class}\">{}</div>", format_delta(delta));
    }
    html.push_str("</div>\n");
}

/// 当前筛选条件对应的查询字符串，用于下载链接
///
/// 总是带上 `applied`，这样空的国家列表下载到的也是空表。
pub fn query_string(filter: &Filter) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("applied", "1");
    for country in &filter.countries {
        query.append_pair("country", country);
    }
    if let Some(start) = filter.start {
        query.append_pair("start", &start.to_string());
    }
    if let Some(end) = filter.end {
        query.append_pair("end", &end.to_string());
    }
    query.finish()
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::detect_content;

    fn sample() -> DataSet {
        let text = "\
Country,Date,Total Cases,New Cases,Total Deaths,New Deaths,Recovered,Total Vaccinations,Population,Vaccination Rate
Global,2021-01-01,100,10,5,1,50,20,1000,2.0
Global,2021-01-02,110,10,6,1,60,30,1000,3.0
\"Korea, South\",2021-01-02,7,1,0,0,3,1,50,2.0
<script>,2021-01-02,1,1,0,0,0,0,1,0
";
        detect_content("sample", text.to_string()).load().unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn query_string_round_trips_country_names() {
        let filter = Filter::new(vec!["Korea, South".into(), "Global".into()])
            .between(Some(day(1)), Some(day(2)));
        assert_eq!(
            query_string(&filter),
            "applied=1&country=Korea%2C+South&country=Global&start=2021-01-01&end=2021-01-02"
        );
        assert_eq!(query_string(&Filter::default()), "applied=1");
    }

    #[test]
    fn renders_all_sections() {
        let ds = sample();
        let filter = Filter::resolve(&ds, &[], None, None, &["Global".to_string()]).unwrap();
        let page = Dashboard::build(&ds, filter, &DashboardConfig::default())
            .unwrap()
            .render();

        assert!(page.contains("COVID-19 Global Dashboard"));
        for label in ["Total Cases", "Total Deaths", "Recovery Rate", "Vaccination Rate"] {
            assert!(page.contains(label), "missing tile {label}");
        }
        assert!(page.contains("210"));
        assert!(page.contains("+20"));
        assert!(page.contains("Trends"));
        assert!(page.contains("Geographic"));
        assert!(page.contains("Comparisons"));
        assert!(page.contains("Data last updated: 2021-01-02"));
        assert!(page.contains("<input type=\"hidden\" name=\"applied\" value=\"1\">"));
        assert!(page.contains("<option value=\"Global\" selected>Global</option>"));
        assert!(page.contains("<option value=\"Korea, South\">Korea, South</option>"));
        assert!(page.contains("/download?applied=1&amp;country=Global&amp;start=2021-01-01&amp;end=2021-01-02"));
    }

    #[test]
    fn data_text_is_escaped() {
        let ds = sample();
        let filter = Filter::new(vec!["<script>".into()]);
        let page = Dashboard::build(&ds, filter, &DashboardConfig::default())
            .unwrap()
            .render();
        assert!(!page.contains("<option value=\"<script>\""));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn empty_selection_shows_placeholders() {
        let ds = sample();
        let page = Dashboard::build(&ds, Filter::default(), &DashboardConfig::default())
            .unwrap()
            .render();
        assert!(page.contains("No data for the current selection"));
        assert!(page.contains("n/a"));
    }
}
