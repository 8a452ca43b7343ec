//! SQLite-backed stores.
//!
//! The same schema serves two roles:
//!
//! - **Worker stores** are private to one worker thread for the duration of a
//!   run. Each one is wrapped in an [`Arena`] together with the volume(s) it
//!   covers. Nothing else opens the file until the merge phase, so there is no
//!   write-path locking at all.
//! - The **canonical store** is the long-lived index. It is only written by the
//!   merge engine (arena-per-worker, merge-commit) and read by the query engine.
//!
//! ## Schema
//!
//! ```text
//! containers(id BLOB PK, volume_id, path, size, hash?, modified_at?, discovered_at,
//!            UNIQUE(volume_id, path))
//! entries(id INTEGER PK, container_id -> containers(id), name, size,
//!         path_in_container, hash?, created_at)
//! store_info(key PK, value)
//! ```
//!
//! Stores run in WAL mode so readers see a consistent snapshot while a merge
//! commits.

use crate::error::{Result, ZipdexError};
use crate::types::{ContainerId, ContainerRecord, EntryDescriptor, EntryRecord, StoreStats, VolumeId};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

const CREATE_CONTAINERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS containers (
    id BLOB PRIMARY KEY,
    volume_id TEXT NOT NULL,
    path TEXT NOT NULL,
    size INTEGER NOT NULL DEFAULT 0,
    hash TEXT,
    modified_at TEXT,
    discovered_at TEXT NOT NULL,
    UNIQUE (volume_id, path)
)
"#;

const CREATE_ENTRIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    container_id BLOB NOT NULL REFERENCES containers(id),
    name TEXT NOT NULL,
    size INTEGER NOT NULL DEFAULT 0,
    path_in_container TEXT NOT NULL,
    hash TEXT,
    created_at TEXT NOT NULL
)
"#;

const CREATE_STORE_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS store_info (
    key TEXT PRIMARY KEY,
    value TEXT
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_containers_volume ON containers(volume_id)",
    "CREATE INDEX IF NOT EXISTS idx_entries_container ON entries(container_id)",
    "CREATE INDEX IF NOT EXISTS idx_entries_name ON entries(name)",
    "CREATE INDEX IF NOT EXISTS idx_entries_hash ON entries(hash)",
];

const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
"#;

const INSERT_CONTAINER: &str = "INSERT INTO containers \
     (id, volume_id, path, size, hash, modified_at, discovered_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const INSERT_ENTRY: &str = "INSERT INTO entries \
     (container_id, name, size, path_in_container, hash, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

pub(crate) const SELECT_CONTAINER_COLUMNS: &str =
    "id, volume_id, path, size, hash, modified_at, discovered_at";

/// Metadata keys stored in `store_info`
pub mod keys {
    pub const SCHEMA_VERSION: &str = "schema_version";

    /// "worker" or "canonical"
    pub const ROLE: &str = "role";

    /// Comma separated volume ids covered by a worker store
    pub const VOLUMES: &str = "volumes";

    pub const WRITER_VERSION: &str = "writer_version";

    /// RFC 3339 timestamp of store creation
    pub const CREATED_AT: &str = "created_at";

    /// RFC 3339 timestamp of the last successful merge (canonical only)
    pub const LAST_MERGE: &str = "last_merge";
}

/// What a store file is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRole {
    Worker,
    Canonical,
}

impl StoreRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreRole::Worker => "worker",
            StoreRole::Canonical => "canonical",
        }
    }
}

/// A single SQLite store file.
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open `path`, creating the file and schema if needed.
    ///
    /// An existing file must carry the current schema version.
    pub fn create(path: &Path, role: StoreRole) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(PRAGMAS)?;
        conn.execute(CREATE_CONTAINERS_TABLE, [])?;
        conn.execute(CREATE_ENTRIES_TABLE, [])?;
        conn.execute(CREATE_STORE_INFO_TABLE, [])?;
        for sql in CREATE_INDEXES {
            conn.execute(sql, [])?;
        }

        let store = Store {
            conn,
            path: path.to_path_buf(),
        };

        match store.info(keys::SCHEMA_VERSION)? {
            Some(_) => store.check_schema()?,
            None => {
                store.set_info(keys::SCHEMA_VERSION, &SCHEMA_VERSION.to_string())?;
                store.set_info(keys::ROLE, role.as_str())?;
                store.set_info(keys::WRITER_VERSION, env!("CARGO_PKG_VERSION"))?;
                store.set_info(keys::CREATED_AT, &Utc::now().to_rfc3339())?;
                debug!(path = %path.display(), role = role.as_str(), "Created store");
            }
        }

        Ok(store)
    }

    /// Open an existing store.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ZipdexError::StoreNotFound {
                path: path.to_path_buf(),
            });
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(PRAGMAS)?;
        let store = Store {
            conn,
            path: path.to_path_buf(),
        };
        store.check_schema()?;
        Ok(store)
    }

    fn check_schema(&self) -> Result<()> {
        let has_info: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'store_info')",
            [],
            |row| row.get(0),
        )?;
        let found = if has_info {
            self.info(keys::SCHEMA_VERSION)?
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(0)
        } else {
            0
        };

        if found != SCHEMA_VERSION {
            return Err(ZipdexError::StoreSchemaMismatch {
                path: self.path.clone(),
                found,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Store a metadata value
    pub fn set_info(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO store_info (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }

    /// Get a metadata value
    pub fn info(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM store_info WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Record a scanned container and its matching entries in one transaction.
    ///
    /// Nothing is written when `entries` is empty. Returns the number of
    /// entries stored.
    pub fn record_container(
        &mut self,
        container: &ContainerRecord,
        entries: &[EntryDescriptor],
    ) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let created_at = Utc::now();
        let tx = self.conn.transaction()?;
        insert_container(&tx, container)?;
        {
            let mut stmt = tx.prepare_cached(INSERT_ENTRY)?;
            for entry in entries {
                stmt.execute(params![
                    container.id,
                    entry.name,
                    entry.size as i64,
                    entry.path_in_container,
                    entry.hash,
                    created_at,
                ])?;
            }
        }
        tx.commit()?;

        Ok(entries.len())
    }

    /// Aggregate counts
    pub fn stats(&self) -> Result<StoreStats> {
        let (volumes, containers): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(DISTINCT volume_id), COUNT(*) FROM containers",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let (entries, total_bytes): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM entries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(StoreStats {
            volumes: volumes as u64,
            containers: containers as u64,
            entries: entries as u64,
            total_bytes: total_bytes as u64,
        })
    }

    /// All containers, in insertion order
    pub fn containers(&self) -> Result<Vec<ContainerRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM containers ORDER BY rowid",
            SELECT_CONTAINER_COLUMNS
        ))?;
        let rows = stmt.query_map([], container_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Look up one container
    pub fn container(&self, id: ContainerId) -> Result<Option<ContainerRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM containers WHERE id = ?1",
                    SELECT_CONTAINER_COLUMNS
                ),
                [id],
                container_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Entries belonging to one container, in insertion order
    pub fn entries_of(&self, id: ContainerId) -> Result<Vec<EntryRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT container_id, name, size, path_in_container, hash, created_at \
             FROM entries WHERE container_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([id], entry_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Whether a container with this volume and path exists
    pub fn contains(&self, volume: &VolumeId, path: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM containers WHERE volume_id = ?1 AND path = ?2)",
            params![volume.as_str(), path],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Delete the given containers and their entries.
    ///
    /// Returns the number of (containers, entries) removed.
    pub fn remove_containers(&mut self, ids: &[ContainerId]) -> Result<(usize, usize)> {
        let tx = self.conn.transaction()?;
        let (mut containers, mut entries) = (0, 0);
        {
            let mut delete_entries = tx.prepare_cached("DELETE FROM entries WHERE container_id = ?1")?;
            let mut delete_container = tx.prepare_cached("DELETE FROM containers WHERE id = ?1")?;
            for id in ids {
                entries += delete_entries.execute(params![id])?;
                containers += delete_container.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok((containers, entries))
    }

    /// Delete every container and entry
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        tx.execute("DELETE FROM containers", [])?;
        tx.commit()?;
        info!(path = %self.path.display(), "Store cleared");
        Ok(())
    }

    /// Close the connection, checkpointing the WAL.
    pub fn close(self) -> Result<PathBuf> {
        let path = self.path.clone();
        self.conn.close().map_err(|(_, e)| ZipdexError::Sqlite(e))?;
        Ok(path)
    }
}

pub(crate) fn insert_container(conn: &Connection, container: &ContainerRecord) -> rusqlite::Result<()> {
    conn.prepare_cached(INSERT_CONTAINER)?.execute(params![
        container.id,
        container.volume_id.as_str(),
        container.path,
        container.size as i64,
        container.hash,
        container.modified_at,
        container.discovered_at,
    ])?;
    Ok(())
}

pub(crate) fn insert_entry(conn: &Connection, entry: &EntryRecord) -> rusqlite::Result<()> {
    conn.prepare_cached(INSERT_ENTRY)?.execute(params![
        entry.container_id,
        entry.name,
        entry.size as i64,
        entry.path_in_container,
        entry.hash,
        entry.created_at,
    ])?;
    Ok(())
}

pub(crate) fn container_from_row(row: &Row<'_>) -> rusqlite::Result<ContainerRecord> {
    Ok(ContainerRecord {
        id: row.get(0)?,
        volume_id: VolumeId::new(row.get::<_, String>(1)?),
        path: row.get(2)?,
        size: row.get::<_, i64>(3)? as u64,
        hash: row.get(4)?,
        modified_at: row.get(5)?,
        discovered_at: row.get(6)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<EntryRecord> {
    Ok(EntryRecord {
        container_id: row.get(0)?,
        name: row.get(1)?,
        size: row.get::<_, i64>(2)? as u64,
        path_in_container: row.get(3)?,
        hash: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Delete a store file together with its `-wal` and `-shm` companions.
pub fn remove_store_files(path: &Path) -> Result<()> {
    for candidate in store_files(path) {
        match fs::remove_file(&candidate) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn store_files(path: &Path) -> [PathBuf; 3] {
    let with_suffix = |suffix: &str| {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };
    [path.to_path_buf(), with_suffix("-wal"), with_suffix("-shm")]
}

/// A worker store together with the volume(s) it covers.
///
/// One arena is owned by exactly one worker thread. When the worker is done,
/// [`Arena::finish`] closes it and hands the file path to the merge engine.
pub struct Arena {
    store: Store,
    volumes: Vec<VolumeId>,
    containers: usize,
    entries: usize,
}

impl Arena {
    /// Create a fresh worker store at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let store = Store::create(path, StoreRole::Worker)?;
        Ok(Arena {
            store,
            volumes: Vec::new(),
            containers: 0,
            entries: 0,
        })
    }

    /// Note that `volume` is being written into this arena.
    pub fn add_volume(&mut self, volume: &VolumeId) -> Result<()> {
        if !self.volumes.contains(volume) {
            self.volumes.push(volume.clone());
            let list = self
                .volumes
                .iter()
                .map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(",");
            self.store.set_info(keys::VOLUMES, &list)?;
        }
        Ok(())
    }

    /// Record one container; see [`Store::record_container`].
    pub fn record(&mut self, container: &ContainerRecord, entries: &[EntryDescriptor]) -> Result<usize> {
        let stored = self.store.record_container(container, entries)?;
        if stored > 0 {
            self.containers += 1;
            self.entries += stored;
        }
        Ok(stored)
    }

    /// Remove containers recorded earlier through this handle.
    pub fn remove_containers(&mut self, ids: &[ContainerId]) -> Result<()> {
        let (containers, entries) = self.store.remove_containers(ids)?;
        self.containers = self.containers.saturating_sub(containers);
        self.entries = self.entries.saturating_sub(entries);
        debug!(containers, entries, "Removed containers from arena");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn volumes(&self) -> &[VolumeId] {
        &self.volumes
    }

    /// Containers recorded through this handle
    pub fn containers_recorded(&self) -> usize {
        self.containers
    }

    /// Entries recorded through this handle
    pub fn entries_recorded(&self) -> usize {
        self.entries
    }

    /// Close the store and return its path for merging.
    pub fn finish(self) -> Result<PathBuf> {
        self.store.close()
    }

    /// Close and delete the store.
    pub fn discard(self) -> Result<()> {
        let path = self.store.close()?;
        remove_store_files(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entries() -> Vec<EntryDescriptor> {
        vec![
            EntryDescriptor::new("Takeout/video_0001.mp4", 300),
            EntryDescriptor::new("Takeout/video_0002.mp4", 200).with_hash("abc"),
        ]
    }

    #[test]
    fn test_create_and_record() {
        let temp = TempDir::new().unwrap();
        let mut store = Store::create(&temp.path().join("s.db"), StoreRole::Worker).unwrap();

        let container = ContainerRecord::new(VolumeId::new("D:"), "D:/a.zip", 1000);
        let stored = store.record_container(&container, &sample_entries()).unwrap();
        assert_eq!(stored, 2);

        let stats = store.stats().unwrap();
        assert_eq!(
            stats,
            StoreStats {
                volumes: 1,
                containers: 1,
                entries: 2,
                total_bytes: 500,
            }
        );

        let loaded = store.container(container.id).unwrap().unwrap();
        assert_eq!(loaded.id, container.id);
        assert_eq!(loaded.path, "D:/a.zip");
        assert_eq!(loaded.size, 1000);

        let entries = store.entries_of(container.id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "video_0001.mp4");
        assert_eq!(entries[1].hash.as_deref(), Some("abc"));
    }

    #[test]
    fn test_empty_container_not_recorded() {
        let temp = TempDir::new().unwrap();
        let mut store = Store::create(&temp.path().join("s.db"), StoreRole::Worker).unwrap();

        let container = ContainerRecord::new(VolumeId::new("D:"), "D:/empty.zip", 10);
        assert_eq!(store.record_container(&container, &[]).unwrap(), 0);
        assert_eq!(store.stats().unwrap().containers, 0);
        assert!(store.container(container.id).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let temp = TempDir::new().unwrap();
        let mut store = Store::create(&temp.path().join("s.db"), StoreRole::Worker).unwrap();

        let first = ContainerRecord::new(VolumeId::new("D:"), "D:/a.zip", 1);
        let second = ContainerRecord::new(VolumeId::new("D:"), "D:/a.zip", 1);
        store.record_container(&first, &sample_entries()).unwrap();
        assert!(store.record_container(&second, &sample_entries()).is_err());

        // The failed transaction left nothing behind
        assert_eq!(store.stats().unwrap().entries, 2);
        assert!(store.contains(&VolumeId::new("D:"), "D:/a.zip").unwrap());
    }

    #[test]
    fn test_open_missing_store() {
        let temp = TempDir::new().unwrap();
        let result = Store::open(&temp.path().join("missing.db"));
        assert!(matches!(result, Err(ZipdexError::StoreNotFound { .. })));
    }

    #[test]
    fn test_schema_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("old.db");
        {
            let store = Store::create(&path, StoreRole::Canonical).unwrap();
            store.set_info(keys::SCHEMA_VERSION, "99").unwrap();
        }

        let result = Store::open(&path);
        assert!(matches!(
            result,
            Err(ZipdexError::StoreSchemaMismatch { found: 99, .. })
        ));
    }

    #[test]
    fn test_foreign_file_is_schema_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("other.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE t (x INTEGER)", []).unwrap();
        }

        let result = Store::open(&path);
        assert!(matches!(
            result,
            Err(ZipdexError::StoreSchemaMismatch { found: 0, .. })
        ));
    }

    #[test]
    fn test_store_info() {
        let temp = TempDir::new().unwrap();
        let store = Store::create(&temp.path().join("s.db"), StoreRole::Canonical).unwrap();

        assert_eq!(store.info(keys::ROLE).unwrap().as_deref(), Some("canonical"));
        assert_eq!(store.info("missing").unwrap(), None);
    }

    #[test]
    fn test_remove_containers() {
        let temp = TempDir::new().unwrap();
        let mut store = Store::create(&temp.path().join("s.db"), StoreRole::Worker).unwrap();
        let first = ContainerRecord::new(VolumeId::new("D:"), "D:/a.zip", 1);
        let second = ContainerRecord::new(VolumeId::new("D:"), "D:/b.zip", 1);
        let other = ContainerRecord::new(VolumeId::new("E:"), "E:/a.zip", 1);
        for container in [&first, &second, &other] {
            store.record_container(container, &sample_entries()).unwrap();
        }

        // Same volume id, only the listed container goes
        assert_eq!(store.remove_containers(&[second.id]).unwrap(), (1, 2));
        let stats = store.stats().unwrap();
        assert_eq!(stats.containers, 2);
        assert_eq!(stats.entries, 4);
        assert!(store.container(first.id).unwrap().is_some());
        assert!(store.container(second.id).unwrap().is_none());

        assert_eq!(store.remove_containers(&[second.id]).unwrap(), (0, 0));
        assert_eq!(store.remove_containers(&[]).unwrap(), (0, 0));
    }

    #[test]
    fn test_arena_remove_containers() {
        let temp = TempDir::new().unwrap();
        let mut arena = Arena::create(&temp.path().join("arena.tmp")).unwrap();
        let kept = ContainerRecord::new(VolumeId::new("D:"), "/mnt/one/a.zip", 1);
        let dropped = ContainerRecord::new(VolumeId::new("D:"), "/mnt/two/a.zip", 1);
        arena.record(&kept, &sample_entries()).unwrap();
        arena.record(&dropped, &sample_entries()).unwrap();

        arena.remove_containers(&[dropped.id]).unwrap();
        assert_eq!(arena.containers_recorded(), 1);
        assert_eq!(arena.entries_recorded(), 2);

        let reopened = Store::open(&arena.finish().unwrap()).unwrap();
        assert!(reopened.container(kept.id).unwrap().is_some());
        assert!(reopened.container(dropped.id).unwrap().is_none());
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let mut store = Store::create(&temp.path().join("s.db"), StoreRole::Canonical).unwrap();
        let container = ContainerRecord::new(VolumeId::new("D:"), "D:/a.zip", 1);
        store.record_container(&container, &sample_entries()).unwrap();

        store.clear().unwrap();
        assert_eq!(store.stats().unwrap(), StoreStats::default());
    }

    #[test]
    fn test_arena_lifecycle() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("arena.tmp");
        let mut arena = Arena::create(&path).unwrap();
        arena.add_volume(&VolumeId::new("D:")).unwrap();
        arena.add_volume(&VolumeId::new("E:")).unwrap();
        arena.add_volume(&VolumeId::new("D:")).unwrap();
        assert_eq!(arena.volumes().len(), 2);

        let container = ContainerRecord::new(VolumeId::new("D:"), "D:/a.zip", 1);
        arena.record(&container, &sample_entries()).unwrap();
        assert_eq!(arena.containers_recorded(), 1);
        assert_eq!(arena.entries_recorded(), 2);

        let finished = arena.finish().unwrap();
        let reopened = Store::open(&finished).unwrap();
        assert_eq!(reopened.info(keys::VOLUMES).unwrap().as_deref(), Some("D:,E:"));
        assert_eq!(reopened.info(keys::ROLE).unwrap().as_deref(), Some("worker"));
    }

    #[test]
    fn test_discard_removes_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("arena.tmp");
        let arena = Arena::create(&path).unwrap();
        arena.discard().unwrap();

        assert!(!path.exists());
        assert!(!temp.path().join("arena.tmp-wal").exists());
        assert!(!temp.path().join("arena.tmp-shm").exists());
    }
}
