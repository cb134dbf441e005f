//! Both loading strategies leave the same rows behind

mod common;

use anyhow::Result;
use common::TestPostgres;
use sparkify_etl::batch::{Batch, Value};
use sparkify_etl::entities::TargetTable;
use sparkify_etl::loader::{loader_for, LoadStrategy};
use sqlx::PgPool;

type ArtistRow = (String, Option<String>, Option<String>);

/// One artist with an empty location, one with an empty id
fn artists_with_empty_text(table: &TargetTable) -> Result<Batch> {
    Ok(Batch::new(
        table.schema.clone(),
        vec![
            vec![
                Value::from("AR1"),
                Value::from("Casual"),
                Value::from(""),
                Value::Null,
                Value::Null,
            ],
            vec![
                Value::from(""),
                Value::from("EmptyKey"),
                Value::from("x"),
                Value::Null,
                Value::Null,
            ],
        ],
    )?)
}

async fn fetch_artists(pool: &PgPool) -> Result<Vec<ArtistRow>> {
    let rows = sqlx::query_as("SELECT artist_id, name, location FROM artists ORDER BY artist_id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

async fn load_with(pool: &PgPool, strategy: LoadStrategy) -> Result<(u64, Vec<ArtistRow>)> {
    sqlx::query("TRUNCATE artists").execute(pool).await?;
    let scratch = tempfile::tempdir()?;
    let loader = loader_for(strategy, scratch.path());
    let table = TargetTable::artists()?;
    let mut conn = pool.acquire().await?;

    let inserted = loader
        .load(&mut conn, &table, &artists_with_empty_text(&table)?)
        .await?;
    Ok((inserted, fetch_artists(pool).await?))
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_empty_text_loads_the_same_with_both_strategies() -> Result<()> {
    let pg = TestPostgres::start().await?;

    let staged = load_with(pg.pool(), LoadStrategy::Staging).await?;
    let row_by_row = load_with(pg.pool(), LoadStrategy::RowByRow).await?;

    let expected = vec![("AR1".to_string(), Some("Casual".to_string()), None)];
    assert_eq!(staged, (1, expected.clone()));
    assert_eq!(row_by_row, (1, expected));
    Ok(())
}
