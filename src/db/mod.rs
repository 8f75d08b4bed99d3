//! Catalog persistence (`spec.md` §3 "DNSRecord (catalog row)"). Built
//! directly on `sqlx::SqlitePool` with hand-written `CREATE TABLE IF NOT
//! EXISTS` + raw `sqlx::query` calls, in the style of the teacher's own
//! `db/filezone.rs` — not an ORM.

pub mod records;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::ShimikoError;

/// Opens the SQLite pool at `path`, creating the file if it doesn't exist,
/// and ensures the `dns_records` table and its partial unique index exist.
pub async fn connect(path: &str) -> Result<SqlitePool, ShimikoError> {
    let url = format!("sqlite://{path}?mode=rwc");
    debug!(database_path = %path, "opening catalog database");
    let pool = SqlitePoolOptions::new().max_connections(4).connect(&url).await?;
    create_table(&pool).await?;
    Ok(pool)
}

async fn create_table(pool: &SqlitePool) -> Result<(), ShimikoError> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS dns_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            ttl INTEGER NOT NULL,
            records TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    // `spec.md` §3: "Unique index on (name, type) across undeleted rows."
    sqlx::query(
        r#"CREATE UNIQUE INDEX IF NOT EXISTS dns_records_name_type
           ON dns_records (name, type)
           WHERE deleted_at IS NULL"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn create_table_for_tests(pool: &SqlitePool) -> Result<(), ShimikoError> {
    create_table(pool).await
}
