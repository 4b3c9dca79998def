use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};

mod schema;

/// Named slots holding whole serialized snapshots. Every write replaces the
/// previous blob for the key.
pub trait SnapshotStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn write(&self, key: &str, payload: &[u8]) -> Result<()>;
    fn remove(&self, key: &str) -> Result<bool>;
}

pub fn encode_snapshot<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).context("serialising snapshot")
}

pub fn decode_snapshot<T: DeserializeOwned>(raw: &[u8]) -> Result<T> {
    serde_json::from_slice(raw).context("parsing snapshot")
}

/// Reads and decodes a slot. Missing, unreadable and undecodable slots all
/// come back as `None`; the caller installs its defaults.
pub fn load_snapshot<T: DeserializeOwned>(store: &dyn SnapshotStore, key: &str) -> Option<T> {
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(?err, key, "failed to read snapshot, using defaults");
            return None;
        }
    };
    match decode_snapshot(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(?err, key, "discarding undecodable snapshot");
            None
        }
    }
}

pub fn save_snapshot<T: Serialize + ?Sized>(
    store: &dyn SnapshotStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let payload = encode_snapshot(value)?;
    store
        .write(key, &payload)
        .with_context(|| format!("writing snapshot {key}"))
}

/// SQLite-backed snapshot slots. Cheap to clone; each call opens its own
/// connection.
#[derive(Clone)]
pub struct StorageHandle {
    path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    /// Creates the parent directory and the schema if needed.
    pub fn open(path: impl Into<PathBuf>, options: &StorageOptions) -> Result<Self> {
        let handle = Self {
            path: Arc::new(path.into()),
            options: Arc::new(options.clone()),
        };
        if let Some(dir) = handle.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating storage directory {}", dir.display()))?;
        }
        handle.with_connection(schema::apply)?;
        tracing::debug!(path = %handle.path.display(), "snapshot database ready");
        Ok(handle)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = Connection::open(self.path.as_path())
            .with_context(|| format!("opening snapshot database {}", self.path.display()))?;
        prepare_connection(&conn, &self.options)?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        self.path.as_path()
    }

    /// Slot names currently stored, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM snapshots ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()
                .context("listing snapshot keys")?;
            Ok(keys)
        })
    }
}

impl SnapshotStore for StorageHandle {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT payload FROM snapshots WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .with_context(|| format!("reading snapshot {key}"))
        })
    }

    fn write(&self, key: &str, payload: &[u8]) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO snapshots (key, payload, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET payload = excluded.payload,
                                                updated_at = excluded.updated_at",
                params![key, payload, now],
            )
            .with_context(|| format!("storing snapshot {key}"))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let removed = conn
                .execute("DELETE FROM snapshots WHERE key = ?1", params![key])
                .with_context(|| format!("removing snapshot {key}"))?;
            Ok(removed > 0)
        })
    }
}

/// In-process store for tests and throwaway sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.slots.lock().keys().cloned().collect()
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.slots.lock().get(key).cloned())
    }

    fn write(&self, key: &str, payload: &[u8]) -> Result<()> {
        self.slots.lock().insert(key.to_string(), payload.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.slots.lock().remove(key).is_some())
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    StorageHandle::open(&paths.database_path, storage)
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    let pragmas = [
        ("journal_mode", "WAL".to_string()),
        ("synchronous", "NORMAL".to_string()),
        ("wal_autocheckpoint", storage.wal_autocheckpoint.to_string()),
    ];
    for (name, value) in pragmas {
        conn.pragma_update(None, name, &value)
            .with_context(|| format!("setting pragma {name}={value}"))?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{ConfigPaths, StorageOptions};
    use tempfile::TempDir;

    pub(crate) fn temp_paths(root: &TempDir) -> ConfigPaths {
        let config_dir = root.path().join("config");
        let config_file = config_dir.join("config.toml");
        ConfigPaths::new(config_dir, config_file, root.path().join("data"))
    }

    pub(crate) fn init_storage() -> anyhow::Result<(TempDir, StorageHandle)> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        let storage = init(&paths, &StorageOptions::default())?;
        Ok((temp, storage))
    }

    #[test]
    fn sqlite_store_replaces_whole_blob() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        assert_eq!(storage.read("RecipeFolders")?, None);

        storage.write("RecipeFolders", b"[1,2,3]")?;
        storage.write("RecipeFolders", b"[]")?;
        assert_eq!(storage.read("RecipeFolders")?, Some(b"[]".to_vec()));
        assert_eq!(storage.keys()?, vec!["RecipeFolders".to_string()]);

        assert!(storage.remove("RecipeFolders")?);
        assert!(!storage.remove("RecipeFolders")?);
        assert_eq!(storage.read("RecipeFolders")?, None);
        Ok(())
    }

    #[test]
    fn slots_are_independent() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        save_snapshot(&storage, "UserProfile", &vec!["a"])?;
        save_snapshot(&storage, "RecipeFolders", &vec!["b", "c"])?;
        let profile: Option<Vec<String>> = load_snapshot(&storage, "UserProfile");
        let folders: Option<Vec<String>> = load_snapshot(&storage, "RecipeFolders");
        assert_eq!(profile, Some(vec!["a".to_string()]));
        assert_eq!(folders, Some(vec!["b".to_string(), "c".to_string()]));
        Ok(())
    }

    #[test]
    fn reopening_sees_previous_writes() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        {
            let storage = init(&paths, &StorageOptions::default())?;
            storage.write("UserProfile", b"{}")?;
        }
        let storage = init(&paths, &StorageOptions::default())?;
        assert_eq!(storage.read("UserProfile")?, Some(b"{}".to_vec()));
        Ok(())
    }

    #[test]
    fn corrupt_snapshot_loads_as_absent() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.write("UserProfile", b"{not json")?;
        let loaded: Option<Vec<String>> = load_snapshot(&store, "UserProfile");
        assert!(loaded.is_none());
        let missing: Option<Vec<String>> = load_snapshot(&store, "Nothing");
        assert!(missing.is_none());
        Ok(())
    }

    #[test]
    fn memory_store_clones_share_slots() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let other = store.clone();
        store.write("k", b"v")?;
        assert_eq!(other.read("k")?, Some(b"v".to_vec()));
        assert_eq!(other.keys(), vec!["k".to_string()]);
        Ok(())
    }
}
