use habit_tracker::{router, select_backend, streak, AppState, Config, HabitTracker, MissedHabits};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let backend = select_backend(&config);
    let tracker = HabitTracker::open(backend, config.data_path.clone()).await;

    if let Err(err) = tracker.refresh().await {
        warn!("initial sync failed: {err}");
    }

    let mut missed = MissedHabits::open(config.visit_path.clone()).await;
    if let Err(err) = missed.check(&tracker, streak::today()).await {
        warn!("missed habit check failed: {err}");
    }

    let app = router(AppState::new(tracker, missed));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
