use clap::Parser;
use countrysim::config::ServerConfig;
use countrysim_api::{AppState, RestApi};
use countrysim_storage::{sample_countries, CountryStore};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // RUST_LOG, when set, overrides --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level().as_str().to_ascii_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting countrysim v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", config.data_dir);
    info!("HTTP API: {}:{}", config.host, config.http_port);

    let store = Arc::new(CountryStore::open(&config.data_dir)?.with_embedding_dim(config.embedding_dim));
    info!(countries = store.len(), "Storage initialized");

    if config.seed {
        let seeded = store.seed(sample_countries())?;
        if seeded > 0 {
            info!(seeded, "Loaded sample countries");
        }
    }
    if let Some(interval) = config.autosave_interval() {
        store.start_background_save(interval);
    }

    let service = Arc::new(config.build_search_service(Arc::clone(&store))?);
    let missing = store.len().saturating_sub(store.embedding_stats().with_embeddings);
    if missing > 0 {
        let report = service.refresh_embeddings(true, &config.refresh_retry()).await;
        info!(
            updated = report.updated,
            errors = report.errors.len(),
            "Generated missing embeddings"
        );
    }

    let state = Arc::new(AppState::new(service).with_refresh_retry(config.refresh_retry()));
    let host = config.host.clone();
    let http_port = config.http_port;
    let static_dir = config.static_dir.clone();
    let http_handle = std::thread::spawn(move || {
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(state, &host, http_port, static_dir).await {
                error!("HTTP server error: {}", e);
            }
        })
    });

    info!("countrysim started successfully");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    store.save()?;
    info!(countries = store.len(), "Snapshot saved");
    Ok(())
}
