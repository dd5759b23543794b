use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;

use crate::schema::{
    COUNTRY, NEW_CASES, NEW_DEATHS, POPULATION, RECOVERED, TOTAL_CASES, TOTAL_DEATHS,
    TOTAL_VACCINATIONS,
};
use crate::{from_days, DataSet};

/// 每个国家按日期排好序的 (日期, 数值)
pub type Trend = BTreeMap<String, Vec<(NaiveDate, f64)>>;

/// 顶部四个指标卡片
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_cases: f64,
    pub new_cases: f64,
    pub total_deaths: f64,
    pub new_deaths: f64,
    /// 百分比，分母为 0 时为 None
    pub recovery_rate: Option<f64>,
    pub vaccination_rate: Option<f64>,
}

impl Summary {
    pub fn compute(ds: &DataSet) -> Result<Self> {
        let total_cases = column_sum(ds, TOTAL_CASES)?;
        let recovered = column_sum(ds, RECOVERED)?;
        let vaccinations = column_sum(ds, TOTAL_VACCINATIONS)?;
        let population = column_sum(ds, POPULATION)?;

        Ok(Self {
            total_cases,
            new_cases: column_sum(ds, NEW_CASES)?,
            total_deaths: column_sum(ds, TOTAL_DEATHS)?,
            new_deaths: column_sum(ds, NEW_DEATHS)?,
            recovery_rate: percentage(recovered, total_cases),
            vaccination_rate: percentage(vaccinations, population),
        })
    }
}

/// 空值不参与求和，空表的和为 0
fn column_sum(ds: &DataSet, name: &str) -> Result<f64> {
    Ok(ds.numeric_column(name)?.sum().unwrap_or(0.0))
}

fn percentage(part: f64, whole: f64) -> Option<f64> {
    if whole == 0.0 {
        None
    } else {
        Some(part / whole * 100.0)
    }
}

/// 按国家分组取 `column` 的最大值，结果按国家名排序
pub fn max_by_country(ds: &DataSet, column: &str) -> Result<Vec<(String, f64)>> {
    let grouped = ds
        .0
        .clone()
        .lazy()
        .group_by([col(COUNTRY)])
        .agg([col(column).max()])
        .collect()?;

    let countries = grouped.column(COUNTRY)?.str()?;
    let values = grouped.column(column)?.f64()?;
    let mut out: Vec<(String, f64)> = countries
        .into_iter()
        .zip(values.into_iter())
        .filter_map(|(c, v)| Some((c?.to_string(), v?)))
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

/// 每个国家 `column` 随时间的变化，跳过空值
pub fn trend(ds: &DataSet, column: &str) -> Result<Trend> {
    let countries = ds.country_column()?;
    let days = ds.day_column()?;
    let values = ds.numeric_column(column)?;

    let mut out = Trend::new();
    for ((country, day), value) in countries
        .into_iter()
        .zip(days.into_iter())
        .zip(values.into_iter())
    {
        if let (Some(country), Some(date), Some(value)) = (country, day.and_then(from_days), value)
        {
            out.entry(country.to_string())
                .or_default()
                .push((date, value));
        }
    }
    for points in out.values_mut() {
        points.sort_by_key(|(date, _)| *date);
    }
    Ok(out)
}

/// 千分位格式，四舍五入到整数，例如 `1,234,567`
pub fn format_count(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// 带符号的变化量，例如 `+1,234` / `-56`
pub fn format_delta(value: f64) -> String {
    if value.round() < 0.0 {
        format_count(value)
    } else {
        format!("+{}", format_count(value))
    }
}

pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.1}%", r),
        None => "n/a".to_string(),
    }
}
