//! Sparkify ETL Library
//!
//! Loads the Sparkify song catalog and activity logs (newline-delimited
//! JSON) into a PostgreSQL star schema: `songs`, `artists`, `users`, `time`
//! and the `songplays` fact table.
//!
//! # Layers
//!
//! - [`batch`]: typed, schema-checked tabular batches and JSON input
//! - [`shape`], [`dedupe`], [`sanitize`]: column mapping, key filtering and
//!   markup escaping
//! - [`bulk`], [`staging`], [`upsert`], [`resolver`]: `COPY`-based loading
//!   through scratch tables
//! - [`loader`]: the row-by-row and staging strategies behind one trait
//! - [`entities`], [`pipeline`]: per-table extraction and per-file runs
//!
//! # Example
//!
//! ```no_run
//! use sparkify_etl::config::EtlConfig;
//! use sparkify_etl::db;
//! use sparkify_etl::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EtlConfig::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     let pipeline = Pipeline::from_config(&config.pipeline)?;
//!
//!     let report = pipeline
//!         .run(&pool, &config.pipeline.song_data, &config.pipeline.log_data)
//!         .await?;
//!     println!("{} files processed", report.files_processed);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod batch;
pub mod bulk;
pub mod config;
pub mod db;
pub mod dedupe;
pub mod entities;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod resolver;
pub mod sanitize;
pub mod shape;
pub mod staging;
pub mod upsert;

pub use error::{EtlError, Result};
