//! Insert-or-ignore merges through a staging table

use crate::batch::Batch;
use crate::bulk::{BulkLoader, LoadMode};
use crate::dedupe::KeySpec;
use crate::error::Result;
use crate::staging::{column_list, quote_ident, settle, StagingTable};
use sqlx::{Connection, PgConnection};
use tracing::{info, instrument};

/// Merges batches into tables without ever overwriting an existing key
#[derive(Debug, Clone)]
pub struct UpsertMerger {
    loader: BulkLoader,
}

impl UpsertMerger {
    pub fn new(loader: BulkLoader) -> Self {
        Self { loader }
    }

    /// Add the rows of `batch` whose key is not yet in `table`.
    ///
    /// Steps: prepare `temp_<table>`, copy the batch into it, insert one row
    /// per non-null key with `ON CONFLICT DO NOTHING`, drop the staging
    /// table. The first three steps run under a savepoint so a failure can
    /// be undone without poisoning the caller's transaction; the drop runs
    /// on every path. Returns the number of rows inserted.
    ///
    /// Empty batches take the same path.
    #[instrument(skip(self, conn, batch), fields(rows = batch.len(), key = %key))]
    pub async fn upsert(
        &self,
        conn: &mut PgConnection,
        batch: &Batch,
        table: &str,
        key: &KeySpec,
    ) -> Result<u64> {
        key.resolve(batch.schema())?;

        let staging = StagingTable::for_target(table);
        let outcome = {
            let mut scope = conn.begin().await?;
            let merged = self.merge(&mut scope, batch, table, key, &staging).await;
            settle(scope, merged).await
        };
        let inserted = staging.release(conn, outcome).await?;

        info!(table, inserted, "Upsert complete");
        Ok(inserted)
    }

    async fn merge(
        &self,
        conn: &mut PgConnection,
        batch: &Batch,
        table: &str,
        key: &KeySpec,
        staging: &StagingTable,
    ) -> Result<u64> {
        staging.prepare(conn).await?;
        self.loader
            .load(conn, batch, LoadMode::ViaStaging(staging))
            .await?;

        let result = sqlx::query(&merge_statement(table, staging.name(), key))
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}

/// `INSERT ... SELECT DISTINCT ON (key) ... ON CONFLICT (key) DO NOTHING`
pub fn merge_statement(table: &str, staging: &str, key: &KeySpec) -> String {
    let keys = column_list(key.columns());
    let not_null = key
        .columns()
        .iter()
        .map(|c| format!("{} IS NOT NULL", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(" AND ");

    format!(
        "INSERT INTO {table} SELECT DISTINCT ON ({keys}) * FROM {staging} WHERE {not_null} \
         ON CONFLICT ({keys}) DO NOTHING",
        table = quote_ident(table),
        staging = quote_ident(staging),
        keys = keys,
        not_null = not_null,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_statement_single_key() {
        assert_eq!(
            merge_statement("users", "temp_users", &KeySpec::single("user_id")),
            "INSERT INTO \"users\" SELECT DISTINCT ON (\"user_id\") * FROM \"temp_users\" \
             WHERE \"user_id\" IS NOT NULL ON CONFLICT (\"user_id\") DO NOTHING"
        );
    }

    #[test]
    fn test_merge_statement_composite_key() {
        let sql = merge_statement(
            "songplays",
            "temp_songplays",
            &KeySpec::composite(["start_time", "user_id"]),
        );
        assert!(sql.contains("DISTINCT ON (\"start_time\", \"user_id\")"));
        assert!(sql.contains("\"start_time\" IS NOT NULL AND \"user_id\" IS NOT NULL"));
        assert!(sql.ends_with("ON CONFLICT (\"start_time\", \"user_id\") DO NOTHING"));
    }
}
