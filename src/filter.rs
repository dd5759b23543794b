use anyhow::Result;
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

use crate::schema::{COUNTRY, DATE};
use crate::DataSet;

/// 侧边栏的筛选条件：国家 + 日期范围（两端都包含）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub countries: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Filter {
    pub fn new(countries: Vec<String>) -> Self {
        Self {
            countries,
            ..Default::default()
        }
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// 按照侧边栏的默认规则补全筛选条件
    ///
    /// 请求里的国家只保留数据中存在的；没有请求任何国家时使用 `defaults`
    /// 中存在的国家，仍然为空则取字母序第一个国家。日期缺省为数据集的
    /// 起止日期，并且会被限制在这个范围内。
    pub fn resolve(
        ds: &DataSet,
        requested: &[String],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        defaults: &[String],
    ) -> Result<Self> {
        let available = ds.countries()?;
        let present = |names: &[String]| -> Vec<String> {
            names
                .iter()
                .filter(|n| available.binary_search(*n).is_ok())
                .cloned()
                .collect()
        };

        let countries = if requested.is_empty() {
            let mut countries = present(defaults);
            if countries.is_empty() {
                countries.extend(available.first().cloned());
            }
            countries
        } else {
            present(requested)
        };

        let (start, end) = match ds.date_range()? {
            Some((min, max)) => (
                Some(start.unwrap_or(min).clamp(min, max)),
                Some(end.unwrap_or(max).clamp(min, max)),
            ),
            None => (start, end),
        };

        Ok(Self {
            countries,
            start,
            end,
        })
    }

    /// 生成 polars 的过滤表达式
    pub fn condition(&self) -> Expr {
        let countries = Series::new("countries", self.countries.as_slice());
        let mut cond = col(COUNTRY).is_in(lit(countries));
        if let Some(start) = self.start {
            cond = cond.and(col(DATE).gt_eq(lit(start)));
        }
        if let Some(end) = self.end {
            cond = cond.and(col(DATE).lt_eq(lit(end)));
        }
        cond
    }

    pub fn apply(&self, ds: &DataSet) -> Result<DataSet> {
        debug!("filtering {} rows with {:?}", ds.height(), self);
        let filtered = ds.0.clone().lazy().filter(self.condition()).collect()?;
        Ok(DataSet(filtered))
    }
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
Global,2021-01-03,125,15,6,0,70,40,1000,4.0
France,2021-01-01,40,4,2,0,10,5,500,1.0
France,2021-01-03,50,10,3,1,20,15,500,3.0
Korea,2021-01-02,7,1,0,0,3,1,50,2.0
";
        detect_content("sample", text.to_string()).load().unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    #[test]
    fn filters_by_country() {
        let ds = sample();
        let out = Filter::new(vec!["France".into()]).apply(&ds).unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(out.countries().unwrap(), vec!["France".to_string()]);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let ds = sample();
        let out = Filter::new(vec!["Global".into()])
            .between(Some(day(2)), Some(day(3)))
            .apply(&ds)
            .unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(out.date_range().unwrap(), Some((day(2), day(3))));
    }

    #[test]
    fn narrowing_is_monotonic() {
        let ds = sample();
        let all = vec!["Global".to_string(), "France".to_string(), "Korea".to_string()];
        let wide = Filter::new(all.clone()).apply(&ds).unwrap().height();
        let by_start = Filter::new(all.clone())
            .between(Some(day(2)), None)
            .apply(&ds)
            .unwrap()
            .height();
        let by_both = Filter::new(all)
            .between(Some(day(2)), Some(day(2)))
            .apply(&ds)
            .unwrap()
            .height();
        let one_country = Filter::new(vec!["Korea".into()])
            .between(Some(day(2)), Some(day(2)))
            .apply(&ds)
            .unwrap()
            .height();

        assert_eq!(wide, ds.height());
        assert!(by_start <= wide);
        assert!(by_both <= by_start);
        assert!(one_country <= by_both);
        assert_eq!(one_country, 1);
    }

    #[test]
    fn empty_selection_and_inverted_range_yield_nothing() {
        let ds = sample();
        assert_eq!(Filter::default().apply(&ds).unwrap().height(), 0);

        let inverted = Filter::new(vec!["Global".into()])
            .between(Some(day(3)), Some(day(1)))
            .apply(&ds)
            .unwrap();
        assert_eq!(inverted.height(), 0);
    }

    #[test]
    fn resolve_uses_defaults_and_clamps_dates() {
        let ds = sample();
        let f = Filter::resolve(
            &ds,
            &[],
            Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            None,
            &["Global".to_string()],
        )
        .unwrap();
        assert_eq!(f.countries, vec!["Global".to_string()]);
        assert_eq!(f.start, Some(day(1)));
        assert_eq!(f.end, Some(day(3)));
    }

    #[test]
    fn resolve_drops_unknown_countries() {
        let ds = sample();
        let f = Filter::resolve(
            &ds,
            &["Atlantis".to_string(), "Korea".to_string()],
            None,
            None,
            &[],
        )
        .unwrap();
        assert_eq!(f.countries, vec!["Korea".to_string()]);
    }

    #[test]
    fn resolve_falls_back_to_first_country() {
        let ds = sample();
        let f = Filter::resolve(&ds, &[], None, None, &["Atlantis".to_string()]).unwrap();
        assert_eq!(f.countries, vec!["France".to_string()]);
    }
}
