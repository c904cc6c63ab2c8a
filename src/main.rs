use std::sync::Arc;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use finledger::{
    api::{self, AppState},
    config::{CliArgs, Config, LoggingConfig},
    storage,
};

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    if logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);
    init_tracing(&config.logging);

    let storage = storage::open(&config.storage).map_err(|e| {
        tracing::error!(error = %e, "Failed to open store");
        e
    })?;

    if config.seed.sample_data {
        storage::seed_sample_data(storage.as_ref())?;
    }

    let metrics = PrometheusBuilder::new().install_recorder()?;
    let state = Arc::new(AppState::new(storage, Some(metrics)));
    let app = api::router(state);

    let addr = config.listen_addr().map_err(|e| {
        tracing::error!(error = %e, host = %config.server.host, "Invalid listen address");
        e
    })?;
    tracing::info!(%addr, backend = ?config.storage.backend, "API listening");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
