//! Shared helpers for integration tests against a throwaway PostgreSQL
//!
//! Every test starts its own container with the Sparkify migrations
//! applied. The tests are ignored by default because they need Docker:
//!
//! ```text
//! cargo test -p sparkify-etl -- --ignored
//! ```

#![allow(dead_code)]

use anyhow::{Context, Result};
use sparkify_etl::batch::{Batch, ColumnType, Schema, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::info;

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sparkify_etl=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// PostgreSQL container with the destination tables created
pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        init_tracing();
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432.tcp()).await?;
        let url = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        sparkify_etl::db::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            _container: container,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Whether `table` exists in the current schema
pub async fn table_exists(pool: &PgPool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = $1)",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

pub async fn count_rows(pool: &PgPool, table: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Number of files directly inside `dir`
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

/// `id BIGINT PRIMARY KEY, foo TEXT, bar TEXT`
pub async fn create_id_foo_bar(pool: &PgPool, table: &str) -> Result<()> {
    sqlx::query(&format!(
        "CREATE TABLE \"{}\" (id BIGINT PRIMARY KEY, foo TEXT, bar TEXT)",
        table
    ))
    .execute(pool)
    .await?;
    Ok(())
}

pub fn id_foo_bar_schema() -> Schema {
    Schema::from_pairs(&[
        ("id", ColumnType::Integer),
        ("foo", ColumnType::Text),
        ("bar", ColumnType::Text),
    ])
    .unwrap()
}

pub fn id_foo_bar(rows: &[(i64, &str, Option<&str>)]) -> Batch {
    Batch::new(
        id_foo_bar_schema(),
        rows.iter()
            .map(|(id, foo, bar)| {
                vec![
                    Value::Integer(*id),
                    Value::from(*foo),
                    Value::from(bar.map(String::from)),
                ]
            })
            .collect(),
    )
    .unwrap()
}

pub async fn fetch_id_foo_bar(pool: &PgPool, table: &str) -> Result<Vec<(i64, Option<String>, Option<String>)>> {
    let rows = sqlx::query_as(&format!("SELECT id, foo, bar FROM \"{}\" ORDER BY id", table))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
