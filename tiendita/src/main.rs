//! # tiendita
//!
//! Minimal market REST backend in Rust.
//!
//! Exposes a user directory with hashed-password authentication (`/usuarios`)
//! and CRUD over a product catalog (`/productos`), backed by SQLite.
//!
//! ## Architecture
//!
//! - **Store**: pooled SQLite access via sqlx; parameterized queries only
//! - **Auth**: argon2id credential hashing, optional TOML seed-users file
//! - **HTTP**: Axum router with rate limiting, request IDs, and graceful shutdown

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod auth;
mod config;
mod http;
mod store;

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::{hash_password, load_seed_users};
use crate::config::{AppConfig, Cli};
use crate::http::{router, AppState};
use crate::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("failed to load configuration")?;
    info!(
        bind = %config.bind,
        database_url = %config.database_url,
        users_file = ?config.users_file.as_ref().map(|path| path.display().to_string()),
        "configuration loaded"
    );

    let store = Store::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open store {}", config.database_url))?;
    store
        .ensure_schema()
        .await
        .context("failed to prepare database schema")?;

    if let Some(path) = config.users_file.as_deref() {
        let seeded = seed_users(&store, path)
            .await
            .with_context(|| format!("failed to seed users from {}", path.display()))?;
        info!(users = seeded, path = %path.display(), "seed users loaded");
    }

    let state = AppState { store };
    let app = router(state);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    if config.bind.ip().is_loopback() {
        tracing::warn!(
            bind = %config.bind,
            "binding to loopback; use --bind 0.0.0.0:3000 for LAN access"
        );
    }

    let shutdown = tokio::signal::ctrl_c();
    info!(bind = %config.bind, "tiendita listening");

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = shutdown.await;
        info!("shutting down gracefully");
    })
    .await
    .context("server exited with error")
}

/// Initialize tracing subscriber with `RUST_LOG` env filter (default: `info`).
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

/// Insert seed users that are not already present, hashing each password.
/// Existing names keep their stored credential. Returns the insert count.
async fn seed_users(store: &Store, path: &Path) -> anyhow::Result<usize> {
    let users = load_seed_users(path)?;

    let mut inserted = 0;
    for user in users {
        if store.find_user_by_name(&user.username).await?.is_some() {
            continue;
        }
        let hash = hash_password(&user.password)?;
        store.insert_user(&user.username, &hash).await?;
        inserted += 1;
    }
    Ok(inserted)
}
