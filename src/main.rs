mod auth;
mod config;
mod context;
mod database;
mod entities;
mod error;
mod feedback;
mod floor;
mod mail;
mod menus;
mod orders;
mod reports;
mod router;
mod routes;
mod staff;
mod util;

use axum_login::tower_sessions::ExpiredDeletion;
use tokio::net::TcpListener;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::router::{create_router, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (db, pool) = database::setup_database(&config.database_url).await?;

    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
    );

    let bind_addr = config.bind_addr.clone();
    let app = create_router(db, config, session_store);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(deletion_task.abort_handle()))
        .await?;

    // The deletion task is aborted on shutdown; only its own errors matter.
    match deletion_task.await {
        Ok(result) => result?,
        Err(e) if e.is_cancelled() => {}
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
