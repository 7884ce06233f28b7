use daily_tally::{
    clock::SystemClock, errors::StorageError, router, AppState, Config, FileStore, Tracker,
};
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let data_dir = config.data_dir.clone();
    let tracker = tokio::task::spawn_blocking(move || {
        let backend = FileStore::open(data_dir)?;
        info!("storing data in {}", backend.dir().display());
        Ok::<_, StorageError>(Tracker::open(backend, SystemClock))
    })
    .await??;

    let state = AppState::new(tracker);
    spawn_autosave(state.clone(), config.autosave_interval);

    let app = router(state.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match state.with_tracker(|tracker| tracker.save()).await {
        Ok(Ok(())) => info!("saved state on shutdown"),
        Ok(Err(err)) => error!("final save failed: {err}"),
        Err(err) => error!("final save failed: {}", err.message),
    }

    Ok(())
}

/// Picks up midnight while running and re-saves in case a write was missed.
fn spawn_autosave(state: AppState, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match state.with_tracker(|tracker| tracker.autosave()).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => error!("autosave failed: {err}"),
                Err(err) => error!("autosave task failed: {}", err.message),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
