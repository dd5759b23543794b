use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use anyhow::Result;
use chrono::{Days, NaiveDate};
use polars::prelude::*;
use tracing::info;

use crate::error::LoadError;
use crate::fetcher::retrieve_data;
use crate::load::detect_content;
use crate::schema::{COUNTRY, DATE};

pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod load;
pub mod metrics;
pub mod page;
pub mod schema;
pub mod server;

pub use config::DashboardConfig;
pub use filter::Filter;
pub use metrics::Summary;

#[derive(Debug, Clone)]
pub struct DataSet(pub(crate) DataFrame);

impl Deref for DataSet {
    type Target = DataFrame;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DataSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

// DataSet 内部方法
impl DataSet {
    /// DataSet 转换为 CSV，不带行号，日期为 YYYY-MM-DD
    pub fn to_csv(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut df = self.0.clone();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(&mut df)?;
        Ok(String::from_utf8(buf)?)
    }

    /// 排好序、去重后的国家列表
    pub fn countries(&self) -> Result<Vec<String>> {
        let set: BTreeSet<String> = self
            .country_column()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        Ok(set.into_iter().collect())
    }

    /// 数据集覆盖的最早和最晚日期，空数据集返回 None
    pub fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let days = self.day_column()?;
        Ok(match (days.min(), days.max()) {
            (Some(min), Some(max)) => from_days(min).zip(from_days(max)),
            _ => None,
        })
    }

    pub(crate) fn country_column(&self) -> Result<StringChunked> {
        Ok(self.column(COUNTRY)?.str()?.clone())
    }

    pub(crate) fn day_column(&self) -> Result<Int32Chunked> {
        let days = self.column(DATE)?.cast(&DataType::Int32)?;
        Ok(days.i32()?.clone())
    }

    pub(crate) fn numeric_column(&self, name: &str) -> Result<Float64Chunked> {
        Ok(self.column(name)?.f64()?.clone())
    }
}

/// 从 source 中获取数据并解析成 DataSet
///
/// source 可以是本地路径、`file://` 或者 `http(s)://`
pub async fn load<T: AsRef<str>>(source: T) -> Result<DataSet, LoadError> {
    let source = source.as_ref();
    info!("retrieving data from source: {}", source);
    let data = retrieve_data(source).await?;
    detect_content(source, data).load()
}

/// polars 的 Date 以 1970-01-01 为第 0 天，`NaiveDate::default()` 正好是这一天
pub(crate) fn to_days(date: NaiveDate) -> i32 {
    date.signed_duration_since(NaiveDate::default()).num_days() as i32
}

pub(crate) fn from_days(days: i32) -> Option<NaiveDate> {
    let epoch = NaiveDate::default();
    let offset = Days::new(u64::from(days.unsigned_abs()));
    if days >= 0 {
        epoch.checked_add_days(offset)
    } else {
        epoch.checked_sub_days(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_is_day_zero() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(to_days(epoch), 0);
        assert_eq!(from_days(0), Some(epoch));

        let d = NaiveDate::from_ymd_opt(2021, 6, 30).unwrap();
        assert_eq!(to_days(d), 18_808);
        assert_eq!(from_days(to_days(d)), Some(d));

        let before = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap();
        assert_eq!(to_days(before), -1);
        assert_eq!(from_days(-1), Some(before));
    }
}
