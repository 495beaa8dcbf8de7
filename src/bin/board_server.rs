use std::{net::SocketAddr, sync::Arc, time::Duration};

use topsell::{
    board_router, init_logging, log_app_bind, log_app_start, log_registry_loaded,
    logging_config_from_env, BoardState, ChainRegistry, HttpCollectionsFetcher,
    DEFAULT_REFRESH_INTERVAL, DEFAULT_REVALIDATE,
};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let addr: SocketAddr = std::env::var("TOPSELL_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;

    let registry = ChainRegistry::from_env()?;
    let refresh_interval = env_duration_ms("TOPSELL_REFRESH_INTERVAL_MS", DEFAULT_REFRESH_INTERVAL);
    let revalidate = env_duration_secs("TOPSELL_REVALIDATE_SECS", DEFAULT_REVALIDATE);
    log_registry_loaded(
        registry.chains().len(),
        refresh_interval.as_millis() as u64,
        revalidate.as_secs(),
    );

    let fetcher = Arc::new(HttpCollectionsFetcher::new(DEFAULT_FETCH_TIMEOUT)?);
    let state = Arc::new(BoardState::new(
        registry,
        fetcher,
        revalidate,
        refresh_interval,
    ));
    let app = board_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;
    log_app_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
