use anyhow::Result;
use covid_dashboard::metrics::{format_count, max_by_country};
use covid_dashboard::schema::TOTAL_DEATHS;
use covid_dashboard::{Filter, Summary};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let source = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/covid-19.csv".to_string());
    let ds = covid_dashboard::load(&source).await?;

    // 所有国家、最近 30 天
    let countries = ds.countries()?;
    let range = ds.date_range()?;
    let filter = Filter::new(countries).between(
        range.map(|(_, max)| max - chrono::Duration::days(30)),
        range.map(|(_, max)| max),
    );
    let view = filter.apply(&ds)?;

    println!("{:#?}", Summary::compute(&view)?);
    for (country, deaths) in max_by_country(&view, TOTAL_DEATHS)? {
        println!("{:<30} {:>15}", country, format_count(deaths));
    }

    Ok(())
}
