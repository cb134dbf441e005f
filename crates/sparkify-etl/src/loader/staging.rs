use crate::batch::Batch;
use crate::bulk::BulkLoader;
use crate::entities::TargetTable;
use crate::error::Result;
use crate::loader::Loader;
use crate::resolver::{SongLookup, SongMatch, SongResolver};
use crate::upsert::UpsertMerger;
use async_trait::async_trait;
use sqlx::PgConnection;

/// Bulk strategy: copy into a staging table, merge with insert-or-ignore,
/// resolve songs with one join
#[derive(Debug, Clone)]
pub struct StagingLoader {
    merger: UpsertMerger,
    resolver: SongResolver,
}

impl StagingLoader {
    pub fn new(bulk: BulkLoader) -> Self {
        Self {
            merger: UpsertMerger::new(bulk.clone()),
            resolver: SongResolver::new(bulk),
        }
    }
}

#[async_trait]
impl Loader for StagingLoader {
    fn name(&self) -> &'static str {
        "staging"
    }

    async fn load(&self, conn: &mut PgConnection, table: &TargetTable, batch: &Batch) -> Result<u64> {
        self.merger.upsert(conn, batch, &table.name, &table.key).await
    }

    async fn resolve_songs(
        &self,
        conn: &mut PgConnection,
        lookups: &[SongLookup],
    ) -> Result<Vec<SongMatch>> {
        self.resolver.resolve(conn, lookups).await
    }
}
