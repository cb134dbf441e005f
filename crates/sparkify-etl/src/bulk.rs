//! Bulk loading through PostgreSQL `COPY`

use crate::batch::Batch;
use crate::error::{EtlError, Result};
use crate::staging::{column_list, quote_ident, StagingArtifact, StagingTable, FIELD_DELIMITER};
use sqlx::postgres::PgCopyIn;
use sqlx::PgConnection;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument, warn};

/// Bytes handed to the copy stream per send
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Where a bulk load writes
#[derive(Debug, Clone, Copy)]
pub enum LoadMode<'a> {
    /// Straight into an existing table
    AppendOnly(&'a str),
    /// Into a staging table owned by the caller
    ViaStaging(&'a StagingTable),
}

impl LoadMode<'_> {
    pub fn table(&self) -> &str {
        match self {
            LoadMode::AppendOnly(table) => table,
            LoadMode::ViaStaging(staging) => staging.name(),
        }
    }
}

/// Serializes batches to scratch files and streams them into tables
#[derive(Debug, Clone)]
pub struct BulkLoader {
    scratch_dir: PathBuf,
}

impl BulkLoader {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Copy `batch` into the table named by `mode` and return the number of
    /// rows the server accepted.
    ///
    /// The table's columns must match the batch's columns by name and
    /// position. The scratch file is gone when this returns, whatever the
    /// outcome.
    #[instrument(skip(self, conn, batch), fields(table = %mode.table(), rows = batch.len()))]
    pub async fn load(&self, conn: &mut PgConnection, batch: &Batch, mode: LoadMode<'_>) -> Result<u64> {
        let table = mode.table();

        let columns = table_columns(conn, table).await?;
        if columns.is_empty() {
            return Err(EtlError::load_failure(table, "table does not exist"));
        }
        let expected = batch.column_names();
        if columns != expected {
            return Err(EtlError::load_failure(
                table,
                format!(
                    "table columns ({}) do not match batch columns ({})",
                    columns.join(", "),
                    expected.join(", ")
                ),
            ));
        }

        let artifact = StagingArtifact::write(batch, &self.scratch_dir, table)?;
        let copied = copy_artifact(conn, table, &expected, &artifact).await?;
        artifact.close()?;

        info!(table, rows = copied, "Bulk copy complete");
        Ok(copied)
    }
}

/// `COPY` statement matching the staging artifact layout
pub fn copy_statement<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    let columns = column_list(columns);
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, HEADER true, DELIMITER '{}', \
         ENCODING 'UTF8', FORCE_NULL ({}))",
        quote_ident(table),
        columns,
        char::from(FIELD_DELIMITER),
        columns
    )
}

/// Column names of `table` in the current schema, in declaration order.
/// Empty when the table does not exist.
pub async fn table_columns(conn: &mut PgConnection, table: &str) -> Result<Vec<String>> {
    let columns = sqlx::query_scalar::<_, String>(
        "SELECT column_name::text FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 \
         ORDER BY ordinal_position",
    )
    .bind(table)
    .fetch_all(conn)
    .await?;
    Ok(columns)
}

async fn copy_artifact(
    conn: &mut PgConnection,
    table: &str,
    columns: &[&str],
    artifact: &StagingArtifact,
) -> Result<u64> {
    let statement = copy_statement(table, columns);
    debug!(%statement, path = %artifact.path().display(), "Starting copy");

    let mut copy = conn
        .copy_in_raw(&statement)
        .await
        .map_err(|e| EtlError::load_failure(table, e))?;

    match stream_file(&mut copy, artifact.path()).await {
        Ok(()) => copy
            .finish()
            .await
            .map_err(|e| EtlError::load_failure(table, e)),
        Err(e) => {
            if let Err(abort_err) = copy.abort(e.to_string()).await {
                warn!(table, error = %abort_err, "Failed to abort copy");
            }
            Err(match e {
                EtlError::Database(db) => EtlError::load_failure(table, db),
                other => other,
            })
        },
    }
}

async fn stream_file(copy: &mut PgCopyIn<&mut PgConnection>, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        copy.send(&buf[..n]).await?;
    }
}
