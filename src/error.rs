use polars::error::PolarsError;
use thiserror::Error;

/// 加载数据集时可能出现的错误
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read data source {name}: {reason}")]
    Unreachable { name: String, reason: String },

    #[error("data source {0} is empty")]
    Empty(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("row {row}: country is missing")]
    MissingCountry { row: usize },

    #[error("row {row}: cannot parse date {value:?}")]
    InvalidDate { row: usize, value: String },

    #[error("column {column} is not numeric")]
    NonNumeric { column: String },

    #[error("malformed csv: {0}")]
    Csv(#[from] PolarsError),
}

/// 请求参数错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid {field} date {value:?}, expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
}
