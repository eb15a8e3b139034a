//! CLI entry point for the DVR retention estimator.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = dvr_retention::config::CliArgs::parse();
    let config = dvr_retention::config::AppConfig::load(cli).await?;

    match dvr_retention::run(&config) {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(error) => {
            tracing::error!(error = %error, "estimation failed");
            Err(error.into())
        }
    }
}
