mod backend;
mod candidates;
mod compress;
mod config;
mod shipper;

use std::process::ExitCode;

use chrono::Local;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::ShipperConfig;
use shipper::FatalError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("logship-agent starting");

    let config = match ShipperConfig::from_env() {
        Ok(config) => config,
        Err(e) => return exit_with(FatalError::Config(e)),
    };

    // "today" is the local calendar date at invocation
    let today = Local::now().date_naive();
    let result = shipper::ship(&config, today, || backend::connect(&config.backend)).await;

    match result {
        Ok(report) => {
            info!(
                shipped = ?report.shipped_keys(),
                failed = ?report.failed_files(),
                "logship-agent finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => exit_with(e),
    }
}

fn exit_with(err: FatalError) -> ExitCode {
    error!("{}", err);
    info!("Exiting...");
    ExitCode::from(err.exit_code())
}
