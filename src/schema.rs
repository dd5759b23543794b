//! 数据集的列名

pub const COUNTRY: &str = "Country";
pub const DATE: &str = "Date";
pub const TOTAL_CASES: &str = "Total Cases";
pub const NEW_CASES: &str = "New Cases";
pub const TOTAL_DEATHS: &str = "Total Deaths";
pub const NEW_DEATHS: &str = "New Deaths";
pub const RECOVERED: &str = "Recovered";
pub const TOTAL_VACCINATIONS: &str = "Total Vaccinations";
pub const POPULATION: &str = "Population";
pub const VACCINATION_RATE: &str = "Vaccination Rate";

/// 所有数值列，加载时统一转换为 Float64
pub const NUMERIC_COLUMNS: [&str; 8] = [
    TOTAL_CASES,
    NEW_CASES,
    TOTAL_DEATHS,
    NEW_DEATHS,
    RECOVERED,
    TOTAL_VACCINATIONS,
    POPULATION,
    VACCINATION_RATE,
];

/// 必须存在的列
pub fn required_columns() -> impl Iterator<Item = &'static str> {
    [COUNTRY, DATE].into_iter().chain(NUMERIC_COLUMNS)
}
