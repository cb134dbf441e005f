//! Destination tables and the extraction of their rows from source files
//!
//! Each destination table is described by a [`TargetTable`]: its name, its
//! column schema (matching the DDL in `migrations/`) and its primary key.
//! The [`songs`] and [`logs`] modules turn source batches into batches
//! shaped for those tables.

pub mod logs;
pub mod songs;

use crate::batch::{ColumnType, Schema};
use crate::dedupe::KeySpec;
use crate::error::Result;

/// A destination table: name, columns and primary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTable {
    pub name: String,
    pub schema: Schema,
    pub key: KeySpec,
}

impl TargetTable {
    /// Describe a table, checking that its key columns exist
    pub fn new(name: impl Into<String>, schema: Schema, key: KeySpec) -> Result<Self> {
        key.resolve(&schema)?;
        Ok(Self {
            name: name.into(),
            schema,
            key,
        })
    }

    pub fn songs() -> Result<Self> {
        Self::new(
            "songs",
            Schema::from_pairs(&[
                ("song_id", ColumnType::Text),
                ("title", ColumnType::Text),
                ("artist_id", ColumnType::Text),
                ("year", ColumnType::Integer),
                ("duration", ColumnType::Float),
            ])?,
            KeySpec::single("song_id"),
        )
    }

    pub fn artists() -> Result<Self> {
        Self::new(
            "artists",
            Schema::from_pairs(&[
                ("artist_id", ColumnType::Text),
                ("name", ColumnType::Text),
                ("location", ColumnType::Text),
                ("latitude", ColumnType::Float),
                ("longitude", ColumnType::Float),
            ])?,
            KeySpec::single("artist_id"),
        )
    }

    pub fn users() -> Result<Self> {
        Self::new(
            "users",
            Schema::from_pairs(&[
                ("user_id", ColumnType::Integer),
                ("first_name", ColumnType::Text),
                ("last_name", ColumnType::Text),
                ("gender", ColumnType::Text),
                ("level", ColumnType::Text),
            ])?,
            KeySpec::single("user_id"),
        )
    }

    pub fn time() -> Result<Self> {
        Self::new(
            "time",
            Schema::from_pairs(&[
                ("start_time", ColumnType::Timestamp),
                ("hour", ColumnType::Integer),
                ("day", ColumnType::Integer),
                ("week", ColumnType::Integer),
                ("month", ColumnType::Integer),
                ("year", ColumnType::Integer),
                ("weekday", ColumnType::Integer),
            ])?,
            KeySpec::single("start_time"),
        )
    }

    pub fn songplays() -> Result<Self> {
        Self::new(
            "songplays",
            Schema::from_pairs(&[
                ("start_time", ColumnType::Timestamp),
                ("user_id", ColumnType::Integer),
                ("level", ColumnType::Text),
                ("song_id", ColumnType::Text),
                ("artist_id", ColumnType::Text),
                ("session_id", ColumnType::Integer),
                ("location", ColumnType::Text),
                ("user_agent", ColumnType::Text),
            ])?,
            KeySpec::composite(["start_time", "user_id"]),
        )
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;

    #[test]
    fn test_builtin_tables() {
        let tables = [
            TargetTable::songs().unwrap(),
            TargetTable::artists().unwrap(),
            TargetTable::users().unwrap(),
            TargetTable::time().unwrap(),
            TargetTable::songplays().unwrap(),
        ];
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["songs", "artists", "users", "time", "songplays"]);
        assert_eq!(tables[4].key.columns(), ["start_time", "user_id"]);
    }

    #[test]
    fn test_key_must_exist() {
        let schema = Schema::from_pairs(&[("id", ColumnType::Integer)]).unwrap();
        let result = TargetTable::new("t", schema, KeySpec::single("uuid"));
        assert!(matches!(result, Err(EtlError::SchemaMismatch(_))));
    }
}
