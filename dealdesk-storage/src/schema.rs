use crate::error::StorageResult;
use rusqlite::Connection;

/// Creates the cache, queue and metadata tables if they do not exist.
pub(crate) fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS cache_records (
            table_name TEXT NOT NULL,
            id TEXT NOT NULL,
            data_json TEXT NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (table_name, id)
        );

        CREATE TABLE IF NOT EXISTS sync_queue (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            table_name TEXT NOT NULL,
            action TEXT NOT NULL,
            record_id TEXT NOT NULL,
            data_json TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sync_queue_record
            ON sync_queue (table_name, record_id);

        CREATE TABLE IF NOT EXISTS sync_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

pub(crate) fn last_synced_key(table: &str) -> String {
    format!("last_synced:{table}")
}
