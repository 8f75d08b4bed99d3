//! CRUD for the `dns_records` table, in the concrete async-fn style of the
//! teacher's `db/filezone.rs` (raw `sqlx::query`/`query_as`, no ORM).

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::catalog::DNSRecord;
use crate::error::ShimikoError;

impl TryFrom<SqliteRow> for DNSRecord {
    type Error = ShimikoError;

    fn try_from(row: SqliteRow) -> Result<Self, Self::Error> {
        let records_json: String = row.try_get("records")?;
        let records: Vec<String> = serde_json::from_str(&records_json)
            .map_err(|e| ShimikoError::Other(format!("corrupt records column: {e}")))?;

        Ok(DNSRecord {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
            name: row.try_get("name")?,
            rtype: row.try_get("type")?,
            ttl: row.try_get("ttl")?,
            records,
        })
    }
}

/// Looks up a row by primary key, soft-deleted or not.
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<DNSRecord>, ShimikoError> {
    let row = sqlx::query("SELECT * FROM dns_records WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(DNSRecord::try_from).transpose()
}

/// Looks up the live (not soft-deleted) row for `(name, type)`, the unique
/// key the catalog enforces (`spec.md` §3).
pub async fn get_by_name_type(
    pool: &SqlitePool,
    name: &str,
    rtype: &str,
) -> Result<Option<DNSRecord>, ShimikoError> {
    let row = sqlx::query(
        "SELECT * FROM dns_records WHERE name = ? AND type = ? AND deleted_at IS NULL",
    )
    .bind(name)
    .bind(rtype)
    .fetch_optional(pool)
    .await?;
    row.map(DNSRecord::try_from).transpose()
}

/// Looks up `(name, type)` including a soft-deleted row, used by upsert to
/// decide whether it's reviving a tombstone (`spec.md` §4.6).
pub async fn get_by_name_type_any(
    pool: &SqlitePool,
    name: &str,
    rtype: &str,
) -> Result<Option<DNSRecord>, ShimikoError> {
    let row = sqlx::query("SELECT * FROM dns_records WHERE name = ? AND type = ?")
        .bind(name)
        .bind(rtype)
        .fetch_optional(pool)
        .await?;
    row.map(DNSRecord::try_from).transpose()
}

/// All live rows, ordered by name then type for deterministic listing.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<DNSRecord>, ShimikoError> {
    let rows = sqlx::query(
        "SELECT * FROM dns_records WHERE deleted_at IS NULL ORDER BY name, type",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(DNSRecord::try_from).collect()
}

/// All rows including soft-deleted tombstones, used by the reconciler's
/// deletion purge pass (`spec.md` §5.3).
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<DNSRecord>, ShimikoError> {
    let rows = sqlx::query("SELECT * FROM dns_records ORDER BY name, type")
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(DNSRecord::try_from).collect()
}

/// Inserts a brand-new row, returning it with its assigned id.
pub async fn insert(pool: &SqlitePool, record: &DNSRecord) -> Result<DNSRecord, ShimikoError> {
    let now = Utc::now();
    let records_json = serde_json::to_string(&record.records)
        .map_err(|e| ShimikoError::Other(format!("failed to encode records: {e}")))?;

    let id: i64 = sqlx::query(
        r#"INSERT INTO dns_records (created_at, updated_at, deleted_at, name, type, ttl, records)
           VALUES (?, ?, NULL, ?, ?, ?, ?)"#,
    )
    .bind(now)
    .bind(now)
    .bind(&record.name)
    .bind(&record.rtype)
    .bind(record.ttl)
    .bind(&records_json)
    .execute(pool)
    .await?
    .last_insert_rowid();

    debug!(id, name = %record.name, rtype = %record.rtype, "inserted catalog record");
    get(pool, id)
        .await?
        .ok_or_else(|| ShimikoError::Other(format!("freshly inserted row {id} vanished")))
}

/// Overwrites an existing row's mutable fields in place, bumping
/// `updated_at` and clearing any tombstone.
pub async fn update(pool: &SqlitePool, record: &DNSRecord) -> Result<DNSRecord, ShimikoError> {
    let records_json = serde_json::to_string(&record.records)
        .map_err(|e| ShimikoError::Other(format!("failed to encode records: {e}")))?;

    sqlx::query(
        r#"UPDATE dns_records
           SET updated_at = ?, deleted_at = NULL, name = ?, type = ?, ttl = ?, records = ?
           WHERE id = ?"#,
    )
    .bind(Utc::now())
    .bind(&record.name)
    .bind(&record.rtype)
    .bind(record.ttl)
    .bind(&records_json)
    .bind(record.id)
    .execute(pool)
    .await?;

    get(pool, record.id).await?.ok_or(ShimikoError::NotFound)
}

/// Inserts or reactivates-and-overwrites the row for `record.name` /
/// `record.rtype` (`spec.md` §4.6 "`DNSRecord.Upsert` semantics").
pub async fn upsert(pool: &SqlitePool, record: DNSRecord) -> Result<DNSRecord, ShimikoError> {
    match get_by_name_type_any(pool, &record.name, &record.rtype).await? {
        Some(existing) => update(pool, &record.merged_onto(&existing)).await,
        None => insert(pool, &record).await,
    }
}

/// Marks a row as deleted without removing it, so the reconciler can still
/// see what needs to be retracted from the backend (`spec.md` §4.7).
pub async fn soft_delete(pool: &SqlitePool, id: i64) -> Result<(), ShimikoError> {
    let result = sqlx::query("UPDATE dns_records SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        warn!(id, "soft_delete found no live row to delete");
        return Err(ShimikoError::NotFound);
    }
    Ok(())
}

/// Removes a tombstoned row permanently, once the reconciler has confirmed
/// the backend no longer carries it (`spec.md` §5.3).
pub async fn hard_delete(pool: &SqlitePool, id: i64) -> Result<(), ShimikoError> {
    sqlx::query("DELETE FROM dns_records WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// The soft-deleted rows still awaiting a reconciler purge.
pub async fn list_pending_deletion(pool: &SqlitePool) -> Result<Vec<DNSRecord>, ShimikoError> {
    let rows = sqlx::query("SELECT * FROM dns_records WHERE deleted_at IS NOT NULL ORDER BY name, type")
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(DNSRecord::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(name: &str, rtype: &str) -> DNSRecord {
        DNSRecord {
            id: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            name: name.to_string(),
            rtype: rtype.to_string(),
            ttl: 300,
            records: vec!["10.0.0.1".to_string()],
        }
    }

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        super::super::create_table_for_tests(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let pool = memory_pool().await;
        let inserted = insert(&pool, &new_record("web", "A")).await.unwrap();
        assert!(inserted.id > 0);

        let fetched = get(&pool, inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "web");
        assert_eq!(fetched.records, vec!["10.0.0.1".to_string()]);
    }

    #[tokio::test]
    async fn upsert_inserts_when_absent_and_updates_when_present() {
        let pool = memory_pool().await;
        let first = upsert(&pool, new_record("web", "A")).await.unwrap();

        let mut changed = new_record("web", "A");
        changed.records = vec!["10.0.0.2".to_string()];
        let second = upsert(&pool, changed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.records, vec!["10.0.0.2".to_string()]);
    }

    #[tokio::test]
    async fn soft_deleted_rows_are_excluded_from_list_active() {
        let pool = memory_pool().await;
        let record = insert(&pool, &new_record("web", "A")).await.unwrap();
        soft_delete(&pool, record.id).await.unwrap();

        assert!(list_active(&pool).await.unwrap().is_empty());
        assert_eq!(list_all(&pool).await.unwrap().len(), 1);
        assert_eq!(list_pending_deletion(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_revives_a_soft_deleted_row() {
        let pool = memory_pool().await;
        let record = insert(&pool, &new_record("web", "A")).await.unwrap();
        soft_delete(&pool, record.id).await.unwrap();

        let revived = upsert(&pool, new_record("web", "A")).await.unwrap();
        assert_eq!(revived.id, record.id);
        assert!(revived.deleted_at.is_none());
    }

    #[tokio::test]
    async fn hard_delete_removes_the_row_entirely() {
        let pool = memory_pool().await;
        let record = insert(&pool, &new_record("web", "A")).await.unwrap();
        hard_delete(&pool, record.id).await.unwrap();
        assert!(get(&pool, record.id).await.unwrap().is_none());
    }
}
