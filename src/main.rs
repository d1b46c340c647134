use axum::serve;
use dotenvy::dotenv;
use portfolio_services::config::Config;
use portfolio_services::create_router;
use portfolio_services::state::AppState;
use portfolio_services::store::{PgStore, SharedStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_TRACING_LEVEL: &str = "portfolio_services=debug,tower_http=info";
const PRUNING_JOB_CRON_EXPRESSION: &str = "0 * * * * *";

#[tokio::main]
async fn main() {
    _ = dotenv();
    configure_tracing();
    let config = Config::from_env().expect("Reading configuration failed");
    let store = create_store(&config).await;
    let state = AppState::from_config(&config, store).expect("Creating http client failed");
    configure_scheduler(state.clone()).await;
    let listener = create_listener(&config.server_address).await;
    let router = create_router(state);
    serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server failed to start");
}

fn configure_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or(DEFAULT_TRACING_LEVEL.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn create_store(config: &Config) -> Option<SharedStore> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL is not set, running without persistent storage");
        return None;
    };
    let store = PgStore::connect(database_url, config.database_max_connections)
        .await
        .expect("Creating database connection pool failed");
    store.migrate().await.expect("Running database migrations failed");
    Some(Arc::new(store))
}

async fn configure_scheduler(state: AppState) {
    let scheduler = JobScheduler::new()
        .await
        .expect("Creating scheduler failed");
    scheduler
        .add(create_pruning_job(PRUNING_JOB_CRON_EXPRESSION, state))
        .await
        .expect("Adding pruning job to scheduler failed");
    scheduler.start().await.expect("Starting scheduler failed");
}

fn create_pruning_job(cron_expression: &str, state: AppState) -> Job {
    Job::new_async(cron_expression, move |_, _| {
        let state = state.clone();
        Box::pin(async move {
            let pruned = state.prune();
            if pruned > 0 {
                tracing::debug!("Pruned {} expired in-process entries", pruned);
            }
        })
    })
    .expect("Creating pruning job failed")
}

async fn create_listener(server_address: &str) -> TcpListener {
    let listener = TcpListener::bind(&server_address)
        .await
        .expect("Creating tcp listener failed");
    tracing::info!("Listening on address: {}", server_address);
    listener
}
