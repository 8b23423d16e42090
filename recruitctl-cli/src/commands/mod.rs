//! Subcommand implementations

pub mod bot;
pub mod config;
pub mod import;
pub mod serve;
pub mod worker;

use anyhow::{Context, Result};
use recruitctl_core::RecruitConfig;
use recruitctl_server::db::{create_pool_with_options, migrate};
use sqlx::PgPool;

/// Connect with the configured cap, applying `--database-url` on top of the config.
pub async fn connect(database_url: Option<String>, config: &mut RecruitConfig) -> Result<PgPool> {
    if database_url.is_some() {
        config.database.url = database_url;
    }
    let url = config.database_url()?;
    create_pool_with_options(url, config.database.max_connections)
        .await
        .context("Failed to create database pool")
}

/// Connect and bring the schema up to date.
pub async fn connect_and_migrate(
    database_url: Option<String>,
    config: &mut RecruitConfig,
) -> Result<PgPool> {
    let pool = connect(database_url, config).await?;
    migrate(&pool).await.context("Failed to run migrations")?;
    Ok(pool)
}
