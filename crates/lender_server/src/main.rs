//! lender_server: REST backend for the loan-management platform.
//!
//! Configuration comes from the environment (see `config.rs`); a `.env` file
//! is read first when present.

use std::sync::Arc;

use anyhow::{Context, Result};
use lender_core::validation::PhoneRules;
use lender_core::LenderService;
use lender_postgres::{pg_stores, PgVintageSource};
use lender_server::config::ServerConfig;
use lender_server::middleware::jwt::JwtConfig;
use lender_server::router::build_router;
use lender_server::vintage::{VintageScheduler, VintageSyncJob};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lender_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let current_pool = PgPoolOptions::new()
        .max_connections(config.current_db_max_conns)
        .connect(&config.current_db_url)
        .await
        .context("failed to connect to the current database")?;
    tracing::info!("Connected to current database");

    let mut service = LenderService::new(
        pg_stores(&current_pool),
        PhoneRules::new(config.country_code),
    );

    if let Some(archive_url) = config.archive_target() {
        let archive_pool = PgPoolOptions::new()
            .max_connections(config.archive_db_max_conns)
            .connect(archive_url)
            .await
            .context("failed to connect to the archive database")?;
        service = service.with_archive(pg_stores(&archive_pool));
        tracing::info!("Archive routing enabled");
    }

    if let Some(interval) = config.vintage.interval {
        let job = VintageSyncJob::new(
            Arc::new(PgVintageSource::new(current_pool.clone())),
            &config.vintage.endpoint,
            config.vintage.timeout,
        )?
        .with_max_concurrency(config.vintage.max_concurrency);
        VintageScheduler::new(Arc::new(job), interval).spawn();
        tracing::info!(
            "VintageScheduler spawned (interval={:?}, endpoint={})",
            interval,
            config.vintage.endpoint
        );
    }

    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes());
    let app = build_router(Arc::new(service), jwt_config);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("lender_server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
