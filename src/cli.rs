//! 命令行：
//! - covid-dashboard serve [--config <json>] [--data <src>] [--host <host>] [--port <port>]
//! - covid-dashboard summary [--data <src>] [--country <name>]... [--start <date>] [--end <date>]
//! - covid-dashboard export  [--data <src>] [--country <name>]... [--start <date>] [--end <date>] --output <file>

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use crate::config::DashboardConfig;
use crate::metrics::{format_count, format_delta, format_rate};
use crate::server::DashboardServer;
use crate::{DataSet, Filter, Summary};

/// COVID-19 dashboard: filter, aggregate and chart a COVID-19 dataset
#[derive(Parser, Debug)]
#[command(name = "covid-dashboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the dashboard over HTTP
    Serve {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Data source (path, file:// or http(s):// URL)
        #[arg(long)]
        data: Option<String>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the headline metrics for a selection
    Summary {
        #[command(flatten)]
        selection: Selection,
    },

    /// Write the selected rows as CSV
    Export {
        #[command(flatten)]
        selection: Selection,

        /// Output CSV file
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct Selection {
    /// Data source (path, file:// or http(s):// URL)
    #[arg(long, default_value = "data/covid-19.csv")]
    pub data: String,

    /// Country to include, can be repeated
    #[arg(long = "country")]
    pub countries: Vec<String>,

    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

impl Selection {
    fn filter(&self, ds: &DataSet) -> Result<Filter> {
        Filter::resolve(
            ds,
            &self.countries,
            self.start,
            self.end,
            &DashboardConfig::default().default_countries,
        )
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve {
            config,
            data,
            host,
            port,
        } => {
            let mut config = match config {
                Some(path) => DashboardConfig::load(path)?,
                None => DashboardConfig::default(),
            };
            if let Some(data) = data {
                config.data_source = data;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            let ds = load_dataset(&config.data_source).await?;
            DashboardServer::new(config, ds).start().await
        }
        Command::Summary { selection } => {
            let ds = load_dataset(&selection.data).await?;
            let view = selection.filter(&ds)?.apply(&ds)?;
            print!("{}", summary_report(&Summary::compute(&view)?));
            Ok(())
        }
        Command::Export { selection, output } => {
            let ds = load_dataset(&selection.data).await?;
            let view = selection.filter(&ds)?.apply(&ds)?;
            tokio::fs::write(&output, view.to_csv()?)
                .await
                .with_context(|| format!("cannot write {}", output.display()))?;
            info!("wrote {} rows to {}", view.height(), output.display());
            Ok(())
        }
    }
}

/// 加载失败时给出统一提示，同时记录具体原因
async fn load_dataset(source: &str) -> Result<DataSet> {
    crate::load(source).await.map_err(|e| {
        error!("failed to load {}: {}", source, e);
        anyhow!(
            "Please ensure your COVID-19 data file is in the correct location! ({})",
            e
        )
    })
}

fn summary_report(s: &Summary) -> String {
    format!(
        "Total Cases       {} ({})\n\
         Total Deaths      {} ({})\n\
         Recovery Rate     {}\n\
         Vaccination Rate  {}\n",
        format_count(s.total_cases),
        format_delta(s.new_cases),
        format_count(s.total_deaths),
        format_delta(s.new_deaths),
        format_rate(s.recovery_rate),
        format_rate(s.vaccination_rate),
    )
}
