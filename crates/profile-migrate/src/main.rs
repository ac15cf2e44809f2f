//! Runs the profile service database migrations and exits

mod config;
mod error;

use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::Config;
use crate::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive("profile_migrate=info".parse()?);

    // JSON output for log collectors when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Config::from_env()?;
    info!(
        max_connections = config.max_connections,
        "Connecting to profile database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    profile_db::migrate::migrate(&pool).await?;
    pool.close().await;

    info!("Migrations applied, exiting");
    Ok(())
}
