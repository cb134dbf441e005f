//! Loading strategies
//!
//! A [`Loader`] writes prepared batches into destination tables and resolves
//! song/artist ids for play events. The strategy is picked once per run with
//! [`loader_for`]; entity code never branches on it.

mod row;
mod staging;

pub use row::RowLoader;
pub use staging::StagingLoader;

use crate::batch::Batch;
use crate::bulk::BulkLoader;
use crate::entities::TargetTable;
use crate::error::{EtlError, Result};
use crate::resolver::{SongLookup, SongMatch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Writes batches into destination tables
#[async_trait]
pub trait Loader: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Insert the rows of `batch` whose key is new to `table`; existing rows
    /// are never modified. Returns the number of rows inserted.
    async fn load(&self, conn: &mut PgConnection, table: &TargetTable, batch: &Batch) -> Result<u64>;

    /// Song and artist ids for each lookup, in order
    async fn resolve_songs(
        &self,
        conn: &mut PgConnection,
        lookups: &[SongLookup],
    ) -> Result<Vec<SongMatch>>;
}

/// Which [`Loader`] a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStrategy {
    /// One statement per row
    RowByRow,
    /// Bulk copy into a staging table, then merge
    #[default]
    Staging,
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStrategy::RowByRow => write!(f, "row-by-row"),
            LoadStrategy::Staging => write!(f, "staging"),
        }
    }
}

impl FromStr for LoadStrategy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "row-by-row" | "row" | "insert" => Ok(LoadStrategy::RowByRow),
            "staging" | "bulk" | "copy" => Ok(LoadStrategy::Staging),
            other => Err(EtlError::config(format!(
                "unknown load strategy '{}' (expected 'row-by-row' or 'staging')",
                other
            ))),
        }
    }
}

/// Build the loader for `strategy`. Staging files go to `scratch_dir`.
pub fn loader_for(strategy: LoadStrategy, scratch_dir: &Path) -> Box<dyn Loader> {
    match strategy {
        LoadStrategy::RowByRow => Box::new(RowLoader::new()),
        LoadStrategy::Staging => Box::new(StagingLoader::new(BulkLoader::new(scratch_dir))),
    }
}
