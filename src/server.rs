//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, click pipeline wiring, and the Axum server
//! lifecycle including graceful shutdown.

use crate::api::middleware::rate_limit::{RateLimit, SWEEP_INTERVAL};
use crate::application::services::{ClickTracker, LinkService, StatsService};
use crate::config::Config;
use crate::domain::batch_persister::BatchPersister;
use crate::domain::click_worker::ClickAggregator;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::fallback_writer::FallbackWriter;
use crate::domain::repositories::{ClickRepository, LinkRepository};
use crate::infrastructure::persistence::{PgClickRepository, PgLinkRepository};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Click aggregator (unless disabled)
/// - Rate limiter sweeper
/// - Axum HTTP server
///
/// On SIGINT or SIGTERM the server stops accepting connections, finishes
/// in-flight requests, then the aggregator drains and flushes its pending
/// clicks before the pool is closed.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection fails
/// - Migrations fail
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let pool_arc = Arc::new(pool.clone());
    let link_repository: Arc<dyn LinkRepository> =
        Arc::new(PgLinkRepository::new(pool_arc.clone()));
    let click_repository: Arc<dyn ClickRepository> =
        Arc::new(PgClickRepository::new(pool_arc));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let fallback = FallbackWriter::new(click_repository.clone(), clock.clone());

    let aggregator = if config.click_worker_enabled {
        let persister = BatchPersister::new(click_repository, fallback.clone(), clock.clone());
        Some(ClickAggregator::spawn(config.worker_settings(), persister))
    } else {
        tracing::info!("Click aggregation disabled; clicks are written synchronously");
        None
    };

    let click_tracker = ClickTracker::new(aggregator.clone(), fallback, clock);

    let state = AppState::new(
        Arc::new(LinkService::new(link_repository.clone())),
        Arc::new(StatsService::new(link_repository)),
        click_tracker,
        config.base_url.clone(),
    );

    let rate_limit = RateLimit::new(config.behind_proxy);
    let sweeper = rate_limit.spawn_sweeper(SWEEP_INTERVAL);
    let app = app_router(state, &rate_limit);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();

    if let Some(aggregator) = aggregator {
        tracing::info!("Flushing pending clicks");
        aggregator.shutdown().await;
    }

    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
