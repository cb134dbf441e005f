use crate::batch::{Batch, ColumnType, Value};
use crate::entities::TargetTable;
use crate::error::{EtlError, Result};
use crate::loader::Loader;
use crate::resolver::{SongLookup, SongMatch};
use crate::staging::{column_list, quote_ident};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgConnection, Postgres};
use tracing::{debug, instrument, warn};

/// At most two candidates: enough to notice an ambiguous lookup
const SONG_SELECT: &str = "SELECT s.song_id, a.artist_id \
     FROM songs s \
     LEFT JOIN artists a ON a.artist_id = s.artist_id AND a.name = $3 \
     WHERE s.title = $1 AND s.duration = $2 \
     ORDER BY s.song_id, a.artist_id \
     LIMIT 2";

/// Row strategy: one parameterized insert per row, one lookup per event
#[derive(Debug, Clone, Copy, Default)]
pub struct RowLoader;

impl RowLoader {
    pub fn new() -> Self {
        Self
    }
}

/// `INSERT INTO t (...) VALUES ($1, ...) ON CONFLICT (key) DO NOTHING`
pub(crate) fn insert_statement(table: &TargetTable) -> String {
    let names = table.column_names();
    let placeholders = (1..=names.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO NOTHING",
        quote_ident(&table.name),
        column_list(&names),
        placeholders,
        column_list(table.key.columns())
    )
}

/// Bind `value`; nulls are bound with the column's type
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
    ty: ColumnType,
) -> Query<'q, Postgres, PgArguments> {
    match (value, ty) {
        (Value::Text(s), _) => query.bind(s.clone()),
        (Value::Integer(i), _) => query.bind(*i),
        (Value::Float(f), _) => query.bind(*f),
        (Value::Timestamp(t), _) => query.bind(*t),
        (Value::Null, ColumnType::Text) => query.bind(None::<String>),
        (Value::Null, ColumnType::Integer) => query.bind(None::<i64>),
        (Value::Null, ColumnType::Float) => query.bind(None::<f64>),
        (Value::Null, ColumnType::Timestamp) => query.bind(None::<NaiveDateTime>),
    }
}

/// First candidate wins; a second one is logged as ambiguous
fn pick_match(idx: usize, candidates: Vec<(Option<String>, Option<String>)>) -> SongMatch {
    let mut candidates = candidates.into_iter();
    let Some((song_id, artist_id)) = candidates.next() else {
        return SongMatch::default();
    };
    if let Some((ignored, _)) = candidates.next() {
        warn!(
            row_idx = idx,
            kept = ?song_id,
            ignored = ?ignored,
            "Ambiguous song lookup, keeping first match"
        );
    }
    SongMatch { song_id, artist_id }
}

#[async_trait]
impl Loader for RowLoader {
    fn name(&self) -> &'static str {
        "row-by-row"
    }

    #[instrument(skip_all, fields(table = %table.name, rows = batch.len()))]
    async fn load(&self, conn: &mut PgConnection, table: &TargetTable, batch: &Batch) -> Result<u64> {
        if batch.column_names() != table.column_names() {
            return Err(EtlError::schema_mismatch(format!(
                "batch columns ({}) do not match table '{}' ({})",
                batch.column_names().join(", "),
                table.name,
                table.column_names().join(", ")
            )));
        }

        let sql = insert_statement(table);
        let types: Vec<ColumnType> = table.schema.columns().iter().map(|c| c.ty).collect();
        let key = table.key.resolve(batch.schema())?;

        let mut inserted = 0;
        // rows with a null key part never reach the table
        for row in batch.rows().iter().filter(|row| key.iter().all(|&i| !row[i].is_null())) {
            let query = row
                .iter()
                .zip(&types)
                .fold(sqlx::query(&sql), |query, (value, ty)| bind_value(query, value, *ty));
            inserted += query.execute(&mut *conn).await?.rows_affected();
        }

        debug!(inserted, "Row-by-row load complete");
        Ok(inserted)
    }

    #[instrument(skip_all, fields(lookups = lookups.len()))]
    async fn resolve_songs(
        &self,
        conn: &mut PgConnection,
        lookups: &[SongLookup],
    ) -> Result<Vec<SongMatch>> {
        let mut matches = Vec::with_capacity(lookups.len());
        for (idx, lookup) in lookups.iter().enumerate() {
            let found = sqlx::query_as::<_, (Option<String>, Option<String>)>(SONG_SELECT)
                .bind(lookup.title.as_deref())
                .bind(lookup.duration)
                .bind(lookup.artist_name.as_deref())
                .fetch_all(&mut *conn)
                .await?;

            matches.push(pick_match(idx, found));
        }
        Ok(matches)
    }
}
