//! Core data types for zipdex.
//!
//! These are the records that flow from the scanner into worker stores and
//! from worker stores into the canonical store:
//!
//! - [`ContainerRecord`]: one archive that produced at least one match
//! - [`EntryRecord`]: one matching item inside that archive
//! - [`EntryDescriptor`]: what the scanner reports before anything is stored

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, Prefix};
use uuid::Uuid;

/// Unique identifier for a volume.
///
/// Derived from the volume root: a drive letter such as `D:` for Windows
/// roots (and WSL `/mnt/d` mounts), the root path itself otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeId(pub String);

impl VolumeId {
    /// Create a new volume ID from a string
    pub fn new(id: impl Into<String>) -> Self {
        VolumeId(id.into())
    }

    /// Derive the volume ID for a root directory.
    pub fn from_root(root: &Path) -> Self {
        let mut components = root.components();
        if let Some(Component::Prefix(prefix)) = components.next() {
            match prefix.kind() {
                Prefix::Disk(letter) | Prefix::VerbatimDisk(letter) => {
                    return VolumeId(format!("{}:", (letter as char).to_ascii_uppercase()));
                }
                _ => {}
            }
        }

        // WSL exposes Windows drives as /mnt/<letter>
        let parts: Vec<_> = root
            .components()
            .filter_map(|c| match c {
                Component::Normal(p) => p.to_str(),
                _ => None,
            })
            .collect();
        if let ["mnt", letter] = parts.as_slice() {
            let mut chars = letter.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                if c.is_ascii_alphabetic() {
                    return VolumeId(format!("{}:", c.to_ascii_uppercase()));
                }
            }
        }

        VolumeId(root.to_string_lossy().into_owned())
    }

    /// Get the volume ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VolumeId {
    fn from(s: String) -> Self {
        VolumeId(s)
    }
}

impl From<&str> for VolumeId {
    fn from(s: &str) -> Self {
        VolumeId(s.to_string())
    }
}

/// Opaque 128-bit container identity.
///
/// Random, assigned once when the container row is created and never reused.
/// It is deliberately not `Ord`: it carries no ordering or time information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(Uuid);

impl ContainerId {
    /// Generate a fresh random identity
    pub fn generate() -> Self {
        ContainerId(Uuid::new_v4())
    }

    /// Parse the hyphenated text form
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(ContainerId)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl ToSql for ContainerId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for ContainerId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Uuid::column_result(value).map(ContainerId)
    }
}

/// One matching item as reported by the archive scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDescriptor {
    /// Final path component (e.g., "video_0001.mp4")
    pub name: String,

    /// Uncompressed size in bytes
    pub size: u64,

    /// Full path inside the container (e.g., "Takeout/Google Photos/video_0001.mp4")
    pub path_in_container: String,

    /// BLAKE3 hex digest when hashing is enabled and the entry fits the ceiling
    pub hash: Option<String>,
}

impl EntryDescriptor {
    pub fn new(path_in_container: impl Into<String>, size: u64) -> Self {
        let path_in_container = path_in_container.into();
        let name = path_in_container
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string();
        EntryDescriptor {
            name,
            size,
            path_in_container,
            hash: None,
        }
    }

    /// Set the content hash
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }
}

/// An archive that yielded at least one matching entry.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerRecord {
    pub id: ContainerId,
    pub volume_id: VolumeId,

    /// Full path of the archive file; unique per volume
    pub path: String,

    /// Size of the archive file in bytes
    pub size: u64,
    pub hash: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
}

impl ContainerRecord {
    /// Create a record with a fresh identity, discovered now.
    pub fn new(volume_id: VolumeId, path: impl Into<String>, size: u64) -> Self {
        ContainerRecord {
            id: ContainerId::generate(),
            volume_id,
            path: path.into(),
            size,
            hash: None,
            modified_at: None,
            discovered_at: Utc::now(),
        }
    }

    /// Set the modification time
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified);
        self
    }

    /// Set the container hash
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// File name of the archive without its directory
    pub fn file_name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path)
    }
}

/// A matching item stored under a container.
#[derive(Debug, Clone, Serialize)]
pub struct EntryRecord {
    pub container_id: ContainerId,
    pub name: String,
    pub size: u64,
    pub path_in_container: String,
    pub hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EntryRecord {
    pub fn from_descriptor(container_id: ContainerId, descriptor: EntryDescriptor) -> Self {
        EntryRecord {
            container_id,
            name: descriptor.name,
            size: descriptor.size,
            path_in_container: descriptor.path_in_container,
            hash: descriptor.hash,
            created_at: Utc::now(),
        }
    }

    /// Get the entry extension (lowercase, without the dot), if any
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }
}

/// Lowercase extension of a file name, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Aggregate counts over a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Distinct volumes with at least one container
    pub volumes: u64,
    pub containers: u64,
    pub entries: u64,

    /// Sum of entry sizes in bytes
    pub total_bytes: u64,
}
