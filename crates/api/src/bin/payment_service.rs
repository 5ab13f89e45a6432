//! Payment service entry point.

use api::config::PAYMENT_SERVICE_PORT;
use api::{Collaborators, Config, StartupError};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::{InMemoryStore, PostgresStore, RentalStore};

const SERVICE: &str = "payment-service";

async fn run<S: RentalStore>(
    store: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
) -> Result<(), StartupError> {
    let collaborators = Collaborators::from_config(config, &store)?;
    let state = api::create_payment_state(store, collaborators);
    let app = api::create_payment_app(
        state,
        metrics_handle,
        api::cors_layer(config.cors_allow_origin.as_deref()),
    );
    api::server::serve(app, &config.addr(), SERVICE).await
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env(PAYMENT_SERVICE_PORT);

    api::telemetry::init_tracing(&config);
    let metrics_handle = api::telemetry::install_metrics()?;

    match config.postgres() {
        Some(postgres) => {
            let store = PostgresStore::connect(&postgres).await?;
            store.run_migrations().await?;
            tracing::info!(max_connections = postgres.max_connections, "connected to postgres");

            let served = run(store.clone(), &config, metrics_handle).await;
            store.close().await;
            served
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, serving the in-memory demo fleet");
            run(InMemoryStore::with_demo_fleet().await, &config, metrics_handle).await
        }
    }
}
