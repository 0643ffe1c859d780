mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};
use crate::middleware::{ApiAuth, RateLimiter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(revgen_core::load_app_config()?);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!(env = %config.env, addr = %config.bind_addr, "starting review generator server");

    let pool = revgen_db::connect_pool(
        &config.database_url,
        revgen_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    revgen_db::run_migrations(&pool).await?;

    // Keep the handle alive; dropping it stops the cron jobs.
    let _jobs = scheduler::build_scheduler(pool.clone(), Arc::clone(&config)).await?;

    let auth = ApiAuth::from_config(&config)?;
    let limiter = RateLimiter::from_config(&config);
    let app = build_app(AppState::new(pool, Arc::clone(&config))?, auth, limiter);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on SIGINT, or on SIGTERM where the platform has one.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.expect("ctrl-c handler");

    tracing::info!("shutdown signal received");
}
