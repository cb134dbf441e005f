//! Staging tables and the scoped helpers around them
//!
//! A staging table is a constraint-free scratch table the bulk loader copies
//! into before rows are merged somewhere permanent. It is created lazily,
//! emptied before every use and dropped after every use, whatever the
//! outcome of the work done with it.

mod artifact;

pub use artifact::{StagingArtifact, FIELD_DELIMITER};

use crate::batch::Schema;
use crate::error::Result;
use sqlx::{PgConnection, Postgres, Transaction};
use tracing::{debug, warn};

/// Prefix of every staging table name
pub const STAGING_PREFIX: &str = "temp_";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Shape {
    /// Structural copy of an existing table
    CopyOf(String),
    /// Declared from a batch schema
    Declared(Schema),
}

/// A scratch table used for exactly one load or merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingTable {
    name: String,
    shape: Shape,
}

impl StagingTable {
    /// Staging table with the columns of `target`, named `temp_<target>`
    pub fn for_target(target: &str) -> Self {
        Self {
            name: format!("{}{}", STAGING_PREFIX, target),
            shape: Shape::CopyOf(target.to_string()),
        }
    }

    /// Staging table declared from `schema`
    pub fn with_schema(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            shape: Shape::Declared(schema),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create the table if it is missing, then empty it.
    ///
    /// A table orphaned by an earlier interrupted run is reused and cleared
    /// here rather than trusted.
    pub async fn prepare(&self, conn: &mut PgConnection) -> Result<()> {
        let create = match &self.shape {
            Shape::CopyOf(target) => format!(
                "CREATE TABLE IF NOT EXISTS {} AS SELECT * FROM {} WHERE false",
                quote_ident(&self.name),
                quote_ident(target)
            ),
            Shape::Declared(schema) => format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                quote_ident(&self.name),
                schema
                    .columns()
                    .iter()
                    .map(|c| format!("{} {}", quote_ident(&c.name), c.ty.sql_type()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };

        sqlx::query(&create).execute(&mut *conn).await?;
        sqlx::query(&format!("TRUNCATE {}", quote_ident(&self.name)))
            .execute(&mut *conn)
            .await?;

        debug!(table = %self.name, "Prepared staging table");
        Ok(())
    }

    pub async fn drop_table(&self, conn: &mut PgConnection) -> Result<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(&self.name)))
            .execute(conn)
            .await?;
        debug!(table = %self.name, "Dropped staging table");
        Ok(())
    }

    /// Drop the table and hand back `outcome`.
    ///
    /// The drop always runs. When `outcome` already failed, a failed drop is
    /// logged and the original error wins.
    pub async fn release<T>(&self, conn: &mut PgConnection, outcome: Result<T>) -> Result<T> {
        let dropped = self.drop_table(conn).await;
        match (outcome, dropped) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(drop_err)) => {
                warn!(
                    table = %self.name,
                    error = %drop_err,
                    "Failed to drop staging table after an earlier error"
                );
                Err(e)
            },
        }
    }
}

/// Commit `scope` when `outcome` succeeded, roll it back otherwise.
///
/// `scope` is usually a savepoint inside the caller's transaction; rolling it
/// back leaves that transaction usable for cleanup statements.
pub async fn settle<T>(scope: Transaction<'_, Postgres>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            scope.commit().await?;
            Ok(value)
        },
        Err(e) => {
            if let Err(rollback_err) = scope.rollback().await {
                warn!(error = %rollback_err, "Rollback after failed staging step also failed");
            }
            Err(e)
        },
    }
}

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma-separated quoted identifiers
pub fn column_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}
