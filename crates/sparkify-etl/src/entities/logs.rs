//! Activity logs: one event per line
//!
//! Only `NextSong` events describe plays. They feed `time`, `users` and
//! `songplays`.

use crate::batch::{read_json_lines, Batch, Column, ColumnType, Schema, Value};
use crate::entities::TargetTable;
use crate::error::{EtlError, Result};
use crate::resolver::{SongLookup, SongMatch};
use crate::sanitize::Sanitizer;
use crate::shape::{prepare, ColumnMap};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::path::Path;
use tracing::debug;

/// Page value of song play events
pub const NEXT_SONG: &str = "NextSong";

/// Fields read from a log event. `ts` is epoch milliseconds.
pub fn log_source_schema() -> Result<Schema> {
    Schema::from_pairs(&[
        ("artist", ColumnType::Text),
        ("auth", ColumnType::Text),
        ("firstName", ColumnType::Text),
        ("gender", ColumnType::Text),
        ("itemInSession", ColumnType::Integer),
        ("lastName", ColumnType::Text),
        ("length", ColumnType::Float),
        ("level", ColumnType::Text),
        ("location", ColumnType::Text),
        ("method", ColumnType::Text),
        ("page", ColumnType::Text),
        ("registration", ColumnType::Float),
        ("sessionId", ColumnType::Integer),
        ("song", ColumnType::Text),
        ("status", ColumnType::Integer),
        ("ts", ColumnType::Timestamp),
        ("userAgent", ColumnType::Text),
        ("userId", ColumnType::Integer),
    ])
}

/// Read a log file and keep its `NextSong` events
pub fn read_log_file(path: impl AsRef<Path>) -> Result<Batch> {
    let events = read_json_lines(path, &log_source_schema()?)?;
    next_song_events(events)
}

pub fn next_song_events(events: Batch) -> Result<Batch> {
    let page = events.schema().require("page")?;
    let total = events.len();
    let plays = events.retain(|row| row[page].as_text() == Some(NEXT_SONG));
    debug!(total, plays = plays.len(), "Filtered NextSong events");
    Ok(plays)
}

/// Rows for `time`: one per distinct event timestamp
pub fn extract_time(events: &Batch, table: &TargetTable, sanitizer: &dyn Sanitizer) -> Result<Batch> {
    let ts = events.schema().require("ts")?;
    let mut time = Batch::empty(table.schema.clone());
    for row in events.rows() {
        if let Some(start) = row[ts].as_timestamp() {
            time.push_row(time_row(start))?;
        }
    }
    prepare(
        &time,
        &ColumnMap::identity(table.column_names()),
        Some(&table.key),
        sanitizer,
    )
}

/// `start_time, hour, day, week, month, year, weekday` for one timestamp.
/// `week` is the ISO week; `weekday` counts from Monday = 0.
pub fn time_row(start: NaiveDateTime) -> Vec<Value> {
    vec![
        Value::Timestamp(start),
        Value::Integer(i64::from(start.hour())),
        Value::Integer(i64::from(start.day())),
        Value::Integer(i64::from(start.iso_week().week())),
        Value::Integer(i64::from(start.month())),
        Value::Integer(i64::from(start.year())),
        Value::Integer(i64::from(start.weekday().num_days_from_monday())),
    ]
}

pub fn users_map() -> ColumnMap {
    ColumnMap::new([
        ("userId", "user_id"),
        ("firstName", "first_name"),
        ("lastName", "last_name"),
        ("gender", "gender"),
        ("level", "level"),
    ])
}

/// Rows for `users`. Events without a user id, or with id 0, are skipped.
pub fn extract_users(events: &Batch, table: &TargetTable, sanitizer: &dyn Sanitizer) -> Result<Batch> {
    let user_id = events.schema().require("userId")?;
    let known = events
        .clone()
        .retain(|row| !matches!(row[user_id], Value::Null | Value::Integer(0)));
    prepare(&known, &users_map(), Some(&table.key), sanitizer)
}

/// (song, length, artist) of every event, in event order
pub fn song_lookups(events: &Batch) -> Result<Vec<SongLookup>> {
    let schema = events.schema();
    let (song, length, artist) = (
        schema.require("song")?,
        schema.require("length")?,
        schema.require("artist")?,
    );
    Ok(events
        .rows()
        .iter()
        .map(|row| SongLookup {
            title: row[song].as_text().map(String::from),
            duration: row[length].as_f64(),
            artist_name: row[artist].as_text().map(String::from),
        })
        .collect())
}

pub fn songplays_map() -> ColumnMap {
    ColumnMap::new([
        ("ts", "start_time"),
        ("userId", "user_id"),
        ("level", "level"),
        ("song_id", "song_id"),
        ("artist_id", "artist_id"),
        ("sessionId", "session_id"),
        ("location", "location"),
        ("userAgent", "user_agent"),
    ])
}

/// Rows for `songplays`. `matches` holds one resolved id pair per event.
pub fn extract_songplays(
    events: &Batch,
    matches: &[SongMatch],
    table: &TargetTable,
    sanitizer: &dyn Sanitizer,
) -> Result<Batch> {
    if matches.len() != events.len() {
        return Err(EtlError::schema_mismatch(format!(
            "{} song matches for {} events",
            matches.len(),
            events.len()
        )));
    }

    let song_ids = matches.iter().map(|m| Value::from(m.song_id.clone())).collect();
    let artist_ids = matches.iter().map(|m| Value::from(m.artist_id.clone())).collect();
    let plays = events
        .clone()
        .with_column(Column::new("song_id", ColumnType::Text), song_ids)?
        .with_column(Column::new("artist_id", ColumnType::Text), artist_ids)?;

    prepare(&plays, &songplays_map(), Some(&table.key), sanitizer)
}
