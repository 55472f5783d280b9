//! Outreach aggregation service: binary entrypoint.
//! Boots the Axum HTTP server with the aggregation manager, the local
//! directory and the Prometheus exporter.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use outreach_aggregator::api::{self, AppState};
use outreach_aggregator::config::AggregatorConfig;
use outreach_aggregator::directory::InMemoryDirectory;
use outreach_aggregator::external::registry::ProviderRegistry;
use outreach_aggregator::external::AggregationManager;
use outreach_aggregator::metrics::Metrics;

/// Compact logs filtered by `RUST_LOG`. `try_init` leaves an existing
/// subscriber (e.g. the hosting runtime's) in place.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aggregate=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AggregatorConfig::from_env();
    let registry = Arc::new(ProviderRegistry::load_default()?);
    tracing::info!(
        target: "aggregate",
        countries = ?registry.countries(),
        "provider registry loaded"
    );

    let metrics = Metrics::init(&cfg)?;
    let manager = Arc::new(AggregationManager::from_config(cfg, registry)?);
    let directory = Arc::new(InMemoryDirectory::load_default()?);

    let state = AppState { manager, directory };
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
