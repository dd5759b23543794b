use clap::Parser;
use covid_dashboard::cli::{self, Cli};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    if let Err(e) = cli::run(Cli::parse()).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
