use std::io::Write;

use chrono::NaiveDate;
use covid_dashboard::load::detect_content;
use covid_dashboard::metrics::max_by_country;
use covid_dashboard::page::Dashboard;
use covid_dashboard::schema::TOTAL_CASES;
use covid_dashboard::{DashboardConfig, Filter, Summary};

const DATA: &str = "\
Country,Date,Total Cases,New Cases,Total Deaths,New Deaths,Recovered,Total Vaccinations,Population,Vaccination Rate,Continent
Global,2021-01-01,1000,100,50,5,800,300,10000,3.0,World
Global,2021-01-02,1100,100,55,5,900,400,10000,4.0,World
Global,2021-01-03,1250,150,61,6,950,500,10000,5.0,World
\"Korea, South\",2021-01-01,70,7,1,0,60,10,500,2.0,Asia
\"Korea, South\",2021-01-03,80,10,1,0,65,20,500,4.0,Asia
Peru,2021-01-02,300,30,20,2,250,,800,,South America
";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
}

async fn dataset() -> covid_dashboard::DataSet {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DATA.as_bytes()).unwrap();
    covid_dashboard::load(file.path().to_str().unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn loads_from_disk_with_extra_columns() {
    let ds = dataset().await;
    assert_eq!(ds.height(), 6);
    assert!(ds.column("Continent").is_ok());
    assert_eq!(
        ds.countries().unwrap(),
        vec!["Global".to_string(), "Korea, South".to_string(), "Peru".to_string()]
    );
    assert_eq!(ds.date_range().unwrap(), Some((day(1), day(3))));
}

#[tokio::test]
async fn exported_view_reloads_identically() {
    let ds = dataset().await;
    let view = Filter::new(vec!["Korea, South".into(), "Peru".into()])
        .between(Some(day(1)), Some(day(2)))
        .apply(&ds)
        .unwrap();
    assert_eq!(view.height(), 2);

    let csv = view.to_csv().unwrap();
    let reloaded = detect_content("export", csv).load().unwrap();
    assert!(reloaded.equals_missing(&view));
}

#[tokio::test]
async fn full_pipeline_matches_hand_computed_numbers() {
    let ds = dataset().await;
    let filter = Filter::resolve(&ds, &[], Some(day(2)), None, &["Global".to_string()]).unwrap();
    assert_eq!(filter.countries, vec!["Global".to_string()]);

    let view = filter.apply(&ds).unwrap();
    let summary = Summary::compute(&view).unwrap();
    assert_eq!(summary.total_cases, 2350.0);
    assert_eq!(summary.new_cases, 250.0);
    assert_eq!(summary.recovery_rate, Some(1850.0 / 2350.0 * 100.0));

    let everything = Filter::new(ds.countries().unwrap()).apply(&ds).unwrap();
    assert_eq!(
        max_by_country(&everything, TOTAL_CASES).unwrap(),
        vec![
            ("Global".to_string(), 1250.0),
            ("Korea, South".to_string(), 80.0),
            ("Peru".to_string(), 300.0),
        ]
    );

    let page = Dashboard::build(&ds, filter, &DashboardConfig::default())
        .unwrap()
        .render();
    assert!(page.contains("2,350"));
    assert!(page.contains("+250"));
}

#[tokio::test]
async fn bundled_dataset_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/covid-19.csv");
    let ds = covid_dashboard::load(path).await.unwrap();
    assert!(ds.countries().unwrap().contains(&"Global".to_string()));
}
