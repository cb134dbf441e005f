//! Column selection, renaming and reordering

use crate::batch::{Batch, Column, Schema};
use crate::dedupe::{filter_and_dedupe, KeySpec};
use crate::error::{EtlError, Result};
use crate::sanitize::{sanitize_batch, Sanitizer};

/// Ordered `(source, destination)` column pairs.
///
/// The pairs select which source columns survive and fix the order of the
/// output columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pairs: Vec<(String, String)>,
}

impl ColumnMap {
    pub fn new<S, D>(pairs: impl IntoIterator<Item = (S, D)>) -> Self
    where
        S: Into<String>,
        D: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(source, destination)| (source.into(), destination.into()))
                .collect(),
        }
    }

    /// Map that keeps `names` as they are, in the given order
    pub fn identity<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::new(names.into_iter().map(|name| {
            let name = name.as_ref().to_string();
            (name.clone(), name)
        }))
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Project `batch` through `map`.
///
/// Every source column must exist in the batch. Rows are not filtered.
pub fn shape(batch: &Batch, map: &ColumnMap) -> Result<Batch> {
    if map.is_empty() {
        return Err(EtlError::schema_mismatch("column map is empty"));
    }

    let source = batch.schema();
    let mut indices = Vec::with_capacity(map.len());
    let mut columns = Vec::with_capacity(map.len());
    for (from, to) in map.pairs() {
        let index = source.require(from)?;
        indices.push(index);
        columns.push(Column::new(to.clone(), source.columns()[index].ty));
    }

    let schema = Schema::new(columns)?;
    let rows = batch
        .rows()
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();

    Batch::new(schema, rows)
}

/// Shape, drop unusable keys, then sanitize: the full preparation a batch
/// goes through before it reaches a loader.
pub fn prepare(
    batch: &Batch,
    map: &ColumnMap,
    key: Option<&KeySpec>,
    sanitizer: &dyn Sanitizer,
) -> Result<Batch> {
    let shaped = shape(batch, map)?;
    let filtered = match key {
        Some(key) => filter_and_dedupe(&shaped, key)?,
        None => shaped,
    };
    sanitize_batch(filtered, sanitizer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{ColumnType, Value};
    use crate::sanitize::{MarkupSanitizer, PassthroughSanitizer};
    use proptest::prelude::*;

    fn song_batch() -> Batch {
        let schema = Schema::from_pairs(&[
            ("song_id", ColumnType::Text),
            ("title", ColumnType::Text),
            ("artist_name", ColumnType::Text),
            ("year", ColumnType::Integer),
        ])
        .unwrap();
        Batch::new(
            schema,
            vec![
                vec!["S1".into(), "<b>Loud</b>".into(), "Line Renaud".into(), Value::Integer(0)],
                vec!["S1".into(), "Loud again".into(), "Line Renaud".into(), Value::Integer(0)],
                vec![Value::Null, "Orphan".into(), "Nobody".into(), Value::Integer(1999)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_selects_renames_and_reorders() {
        let map = ColumnMap::new([("year", "year"), ("artist_name", "name"), ("song_id", "song_id")]);
        let shaped = shape(&song_batch(), &map).unwrap();

        assert_eq!(shaped.column_names(), vec!["year", "name", "song_id"]);
        assert_eq!(shaped.len(), 3);
        assert_eq!(shaped.rows()[0], vec![Value::Integer(0), "Line Renaud".into(), "S1".into()]);
        assert_eq!(shaped.schema().columns()[0].ty, ColumnType::Integer);
    }

    #[test]
    fn test_shape_missing_source_column() {
        let map = ColumnMap::new([("song_id", "song_id"), ("duration", "duration")]);
        let err = shape(&song_batch(), &map).unwrap_err();
        assert!(matches!(err, EtlError::SchemaMismatch(ref msg) if msg.contains("duration")));
    }

    #[test]
    fn test_shape_rejects_duplicate_destinations() {
        let map = ColumnMap::new([("song_id", "id"), ("title", "id")]);
        assert!(matches!(
            shape(&song_batch(), &map),
            Err(EtlError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_prepare_dedupes_and_sanitizes() {
        let map = ColumnMap::identity(["song_id", "title"]);
        let key = KeySpec::single("song_id");
        let prepared = prepare(&song_batch(), &map, Some(&key), &MarkupSanitizer::new().unwrap()).unwrap();

        assert_eq!(prepared.len(), 1);
        assert_eq!(
            prepared.rows()[0],
            vec![Value::from("S1"), Value::from("&lt;b&gt;Loud&lt;/b&gt;")]
        );
    }

    #[test]
    fn test_prepare_without_key_keeps_every_row() {
        let map = ColumnMap::identity(["song_id"]);
        let prepared = prepare(&song_batch(), &map, None, &PassthroughSanitizer).unwrap();
        assert_eq!(prepared.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_shape_output_follows_map_order(order in Just(vec![0usize, 1, 2, 3]).prop_shuffle(), take in 1usize..=4) {
            let names = ["song_id", "title", "artist_name", "year"];
            let pairs: Vec<(String, String)> = order
                .iter()
                .take(take)
                .map(|&i| (names[i].to_string(), format!("out_{}", names[i])))
                .collect();
            let map = ColumnMap::new(pairs.clone());

            let shaped = shape(&song_batch(), &map).unwrap();
            let expected: Vec<&str> = pairs.iter().map(|(_, d)| d.as_str()).collect();
            prop_assert_eq!(shaped.column_names(), expected);
            prop_assert_eq!(shaped.len(), 3);
        }
    }
}
