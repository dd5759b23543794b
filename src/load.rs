use std::io::Cursor;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::schema::{required_columns, COUNTRY, DATE, NUMERIC_COLUMNS};
use crate::{to_days, DataSet};

/// 推断 schema 时采样的行数
const INFER_SCHEMA_ROWS: usize = 256;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// 按缺失值处理的单元格内容，和 pandas `read_csv` 的默认 na_values 一致
const MISSING_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub trait Load {
    type Error;
    fn load(self) -> Result<DataSet, Self::Error>;
}

#[derive(Debug)]
#[non_exhaustive]
pub enum Loader {
    Csv(CsvLoader),
}

#[derive(Debug)]
pub struct CsvLoader {
    name: String,
    data: String,
}

impl Loader {
    pub fn load(self) -> Result<DataSet, LoadError> {
        match self {
            Loader::Csv(csv) => csv.load(),
        }
    }
}

/// 目前只支持 CSV
pub fn detect_content(name: impl Into<String>, data: String) -> Loader {
    Loader::Csv(CsvLoader {
        name: name.into(),
        data,
    })
}

impl Load for CsvLoader {
    type Error = LoadError;

    fn load(self) -> Result<DataSet, Self::Error> {
        if self.data.trim().is_empty() {
            return Err(LoadError::Empty(self.name));
        }

        let null_values: Vec<String> = MISSING_MARKERS.iter().map(|s| s.to_string()).collect();
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .map_parse_options(|opts| {
                opts.with_null_values(Some(NullValues::AllColumns(null_values.clone())))
            })
            .into_reader_with_file_handle(Cursor::new(self.data.into_bytes()))
            .finish()?;
        debug!("raw schema of {}: {:?}", self.name, df.schema());

        for name in required_columns() {
            if df.column(name).is_err() {
                return Err(LoadError::MissingColumn(name.to_string()));
            }
        }

        normalize_country(&mut df)?;
        normalize_date(&mut df)?;
        normalize_numeric(&mut df)?;

        info!("loaded {} rows from {}", df.height(), self.name);
        Ok(DataSet(df))
    }
}

fn normalize_country(df: &mut DataFrame) -> Result<(), LoadError> {
    let country = df.column(COUNTRY)?.cast(&DataType::String)?;
    if let Some(idx) = country.str()?.into_iter().position(|v| v.is_none()) {
        return Err(LoadError::MissingCountry { row: idx + 1 });
    }
    df.with_column(country)?;
    Ok(())
}

/// 把 Date 列解析成 polars 的 Date 类型（自 1970-01-01 起的天数）
fn normalize_date(df: &mut DataFrame) -> Result<(), LoadError> {
    let raw = df.column(DATE)?.cast(&DataType::String)?;
    let mut days = Vec::with_capacity(raw.len());
    for (idx, value) in raw.str()?.into_iter().enumerate() {
        let value = value.unwrap_or_default();
        let date = parse_date(value).ok_or_else(|| LoadError::InvalidDate {
            row: idx + 1,
            value: value.to_string(),
        })?;
        days.push(to_days(date));
    }
    let dates = Series::new(DATE, days).cast(&DataType::Date)?;
    df.with_column(dates)?;
    Ok(())
}

/// 数值列统一为 Float64，NaN 也当作空值，求和时会被跳过
fn normalize_numeric(df: &mut DataFrame) -> Result<(), LoadError> {
    for name in NUMERIC_COLUMNS {
        let values = df
            .column(name)?
            .strict_cast(&DataType::Float64)
            .map_err(|_| LoadError::NonNumeric {
                column: name.to_string(),
            })?;
        let mut cleaned: Float64Chunked = values
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        cleaned.rename(name);
        df.with_column(cleaned.into_series())?;
    }
    Ok(())
}

/// 解析日期，带时间的格式只保留日期部分
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}
