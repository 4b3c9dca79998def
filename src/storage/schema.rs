use anyhow::{Context, Result};
use rusqlite::Connection;

/// One row per slot; `payload` holds the whole JSON snapshot.
const SNAPSHOTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS snapshots (
    key        TEXT PRIMARY KEY,
    payload    BLOB NOT NULL,
    updated_at INTEGER NOT NULL
);
";

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(SNAPSHOTS_TABLE)
        .context("creating snapshots table")
}
