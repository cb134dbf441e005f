//! Catalog files: one song per line, carrying its artist

use crate::batch::{read_json_lines, Batch, ColumnType, Schema};
use crate::entities::TargetTable;
use crate::error::Result;
use crate::sanitize::Sanitizer;
use crate::shape::{prepare, ColumnMap};
use std::path::Path;

/// Fields read from a catalog record
pub fn song_source_schema() -> Result<Schema> {
    Schema::from_pairs(&[
        ("song_id", ColumnType::Text),
        ("title", ColumnType::Text),
        ("artist_id", ColumnType::Text),
        ("year", ColumnType::Integer),
        ("duration", ColumnType::Float),
        ("artist_name", ColumnType::Text),
        ("artist_location", ColumnType::Text),
        ("artist_latitude", ColumnType::Float),
        ("artist_longitude", ColumnType::Float),
        ("num_songs", ColumnType::Integer),
    ])
}

pub fn read_song_file(path: impl AsRef<Path>) -> Result<Batch> {
    read_json_lines(path, &song_source_schema()?)
}

pub fn songs_map() -> ColumnMap {
    ColumnMap::identity(["song_id", "title", "artist_id", "year", "duration"])
}

pub fn artists_map() -> ColumnMap {
    ColumnMap::new([
        ("artist_id", "artist_id"),
        ("artist_name", "name"),
        ("artist_location", "location"),
        ("artist_latitude", "latitude"),
        ("artist_longitude", "longitude"),
    ])
}

/// Rows for `songs`
pub fn extract_songs(source: &Batch, table: &TargetTable, sanitizer: &dyn Sanitizer) -> Result<Batch> {
    prepare(source, &songs_map(), Some(&table.key), sanitizer)
}

/// Rows for `artists`
pub fn extract_artists(
    source: &Batch,
    table: &TargetTable,
    sanitizer: &dyn Sanitizer,
) -> Result<Batch> {
    prepare(source, &artists_map(), Some(&table.key), sanitizer)
}
