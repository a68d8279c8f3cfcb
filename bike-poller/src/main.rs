use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bike_poller::bicimad::{BiciMadFeed, SessionManager, TokenStore};
use bike_poller::bicing::BicingClient;
use bike_poller::collector::JsonLinesCollector;
use bike_poller::config::{AppConfig, Provider};
use bike_poller::polling::{self, PollSummary, RunError};
use bike_poller::transport::HttpTransport;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    let transport = match HttpTransport::new() {
        Ok(transport) => transport,
        Err(e) => {
            error!("failed to create HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        interval_secs = config.schedule.interval.as_secs(),
        iterations = ?config.schedule.iterations,
        output = %config.output_path.display(),
        "starting poller"
    );

    match config.provider {
        Provider::BiciMad(bicimad) => {
            let store = TokenStore::new(&config.token_path);
            let mut feed = BiciMadFeed::new(SessionManager::new(transport, bicimad, store));
            let mut collector = JsonLinesCollector::new(&config.output_path);
            report(polling::run(&mut feed, &mut collector, &config.schedule).await)
        }
        Provider::Bicing(bicing) => {
            let mut client = BicingClient::new(transport, bicing);
            let mut collector = JsonLinesCollector::new(&config.output_path);
            report(polling::run(&mut client, &mut collector, &config.schedule).await)
        }
    }
}

fn report<E: std::fmt::Display>(result: Result<PollSummary, RunError<E>>) -> ExitCode {
    match result {
        Ok(summary) => {
            info!(forwarded = summary.forwarded, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("polling stopped: {e}");
            ExitCode::FAILURE
        }
    }
}
