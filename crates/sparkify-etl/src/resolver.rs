//! Resolving song and artist ids from play events
//!
//! Log events name a song by title, length and artist name. The catalog
//! keys songs and artists by surrogate ids, so every event is looked up
//! against `songs` on (title, duration) and `artists` on (artist_id, name).

use crate::batch::{Batch, ColumnType, Schema, Value};
use crate::bulk::{BulkLoader, LoadMode};
use crate::error::Result;
use crate::staging::{settle, StagingTable};
use sqlx::{Connection, FromRow, PgConnection};
use tracing::{debug, instrument, warn};

/// Name of the staging table the lookups are copied into
pub const SONG_SELECT_TABLE: &str = "temp_song_select";

/// What a play event knows about its song
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongLookup {
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub artist_name: Option<String>,
}

impl SongLookup {
    pub fn new(
        title: impl Into<Option<String>>,
        duration: impl Into<Option<f64>>,
        artist_name: impl Into<Option<String>>,
    ) -> Self {
        Self {
            title: title.into(),
            duration: duration.into(),
            artist_name: artist_name.into(),
        }
    }
}

/// Ids found for one lookup; `None` means unknown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct MatchRow {
    pub row_idx: i64,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
}

/// Set-based resolver: one copy, one join
#[derive(Debug, Clone)]
pub struct SongResolver {
    loader: BulkLoader,
}

impl SongResolver {
    pub fn new(loader: BulkLoader) -> Self {
        Self { loader }
    }

    /// Schema of the lookup staging table. `row_idx` carries each lookup's
    /// position through the join.
    pub fn lookup_schema() -> Result<Schema> {
        Schema::from_pairs(&[
            ("row_idx", ColumnType::Integer),
            ("title", ColumnType::Text),
            ("duration", ColumnType::Float),
            ("name", ColumnType::Text),
        ])
    }

    /// One [`SongMatch`] per lookup, in lookup order
    #[instrument(skip_all, fields(lookups = lookups.len()))]
    pub async fn resolve(
        &self,
        conn: &mut PgConnection,
        lookups: &[SongLookup],
    ) -> Result<Vec<SongMatch>> {
        let batch = lookup_batch(lookups)?;
        let staging = StagingTable::with_schema(SONG_SELECT_TABLE, batch.schema().clone());

        let outcome = {
            let mut scope = conn.begin().await?;
            let joined = self.join(&mut scope, &batch, &staging).await;
            settle(scope, joined).await
        };
        let rows = staging.release(conn, outcome).await?;

        let matches = assemble_matches(lookups.len(), rows);
        debug!(
            resolved = matches.iter().filter(|m| m.song_id.is_some()).count(),
            "Resolved song lookups"
        );
        Ok(matches)
    }

    async fn join(
        &self,
        conn: &mut PgConnection,
        batch: &Batch,
        staging: &StagingTable,
    ) -> Result<Vec<MatchRow>> {
        staging.prepare(conn).await?;
        self.loader
            .load(conn, batch, LoadMode::ViaStaging(staging))
            .await?;

        let rows = sqlx::query_as::<_, MatchRow>(
            "SELECT t.row_idx, s.song_id, a.artist_id \
             FROM temp_song_select t \
             LEFT JOIN songs s ON s.title = t.title AND s.duration = t.duration \
             LEFT JOIN artists a ON a.artist_id = s.artist_id AND a.name = t.name \
             ORDER BY t.row_idx, s.song_id, a.artist_id",
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }
}

fn lookup_batch(lookups: &[SongLookup]) -> Result<Batch> {
    let rows = lookups
        .iter()
        .enumerate()
        .map(|(idx, lookup)| {
            vec![
                Value::Integer(idx as i64),
                Value::from(lookup.title.clone()),
                Value::from(lookup.duration),
                Value::from(lookup.artist_name.clone()),
            ]
        })
        .collect();
    Batch::new(SongResolver::lookup_schema()?, rows)
}

/// Align joined rows back to lookup positions.
///
/// Rows arrive ordered by `row_idx`; when a lookup matched several catalog
/// rows the first one wins and the ambiguity is logged. Lookups with no row
/// at all stay unresolved.
pub(crate) fn assemble_matches(count: usize, rows: Vec<MatchRow>) -> Vec<SongMatch> {
    let mut matches = vec![SongMatch::default(); count];
    let mut filled = vec![false; count];

    for row in rows {
        let Some(idx) = usize::try_from(row.row_idx).ok().filter(|&i| i < count) else {
            warn!(row_idx = row.row_idx, "Join returned an unknown row index");
            continue;
        };
        if filled[idx] {
            if row.song_id.is_some() {
                warn!(
                    row_idx = idx,
                    kept = ?matches[idx].song_id,
                    ignored = ?row.song_id,
                    "Ambiguous song lookup, keeping first match"
                );
            }
            continue;
        }
        filled[idx] = true;
        matches[idx] = SongMatch {
            artist_id: row.artist_id,
            song_id: row.song_id,
        };
    }

    matches
}
