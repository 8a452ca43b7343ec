//! Volumes and container discovery.
//!
//! Volume enumeration itself is a collaborator: anything implementing
//! [`VolumeSource`] can feed the orchestrator. Once a volume is assigned to a
//! worker, [`discover_containers`] finds the archives on it.

use crate::config::{DiscoveryMode, ScanConfig};
use crate::error::{Result, ZipdexError};
use crate::types::VolumeId;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Name of the root-level folder searched in takeout mode (compared case-insensitively)
pub const TAKEOUT_DIR: &str = "GoogleTakeout";

/// Information about a volume that can be indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    /// Unique identifier for this volume
    pub id: VolumeId,

    /// Root directory of the volume
    pub root: PathBuf,

    /// Human-readable label (e.g., "Backup")
    pub label: Option<String>,
}

impl VolumeInfo {
    /// Create a volume for `root`, deriving its id.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        VolumeInfo {
            id: VolumeId::from_root(&root),
            root,
            label: None,
        }
    }

    /// Override the derived id
    pub fn with_id(mut self, id: impl Into<VolumeId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the volume label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Supplies the ordered list of volumes to index.
pub trait VolumeSource: Send + Sync {
    fn volumes(&self) -> Result<Vec<VolumeInfo>>;
}

/// A fixed volume list.
#[derive(Debug, Clone, Default)]
pub struct StaticVolumes(pub Vec<VolumeInfo>);

impl StaticVolumes {
    pub fn from_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        StaticVolumes(roots.into_iter().map(VolumeInfo::new).collect())
    }
}

impl VolumeSource for StaticVolumes {
    fn volumes(&self) -> Result<Vec<VolumeInfo>> {
        Ok(self.0.clone())
    }
}

/// Find candidate containers on a volume, sorted by path.
///
/// Fails with `VolumeInaccessible` when the root itself cannot be listed.
/// Unreadable directories below the root are logged and skipped.
pub fn discover_containers(volume: &VolumeInfo, scan: &ScanConfig) -> Result<Vec<PathBuf>> {
    fs::read_dir(&volume.root)
        .map_err(|e| ZipdexError::volume_inaccessible(&volume.id, e.to_string()))?;

    let extensions = scan.container_extension_set();

    let mut found = match scan.discovery {
        DiscoveryMode::Recursive => walk_recursive(volume, scan, &extensions),
        DiscoveryMode::Takeout => walk_takeout(volume, &extensions)?,
    };
    found.sort();

    debug!(volume = %volume.id, containers = found.len(), "Container discovery complete");
    Ok(found)
}

fn walk_recursive(
    volume: &VolumeInfo,
    scan: &ScanConfig,
    extensions: &HashSet<String>,
) -> Vec<PathBuf> {
    let walker = WalkDir::new(&volume.root)
        .follow_links(false)
        .same_file_system(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            !scan.is_excluded_dir(&e.file_name().to_string_lossy())
        });

    let mut found = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                    found.push(entry.into_path());
                }
            }
            Err(e) => {
                warn!(volume = %volume.id, error = %e, "Skipping unreadable path");
            }
        }
    }
    found
}

fn walk_takeout(volume: &VolumeInfo, extensions: &HashSet<String>) -> Result<Vec<PathBuf>> {
    let takeout_dir = fs::read_dir(&volume.root)?
        .filter_map(|e| e.ok())
        .find(|e| {
            e.file_type().map(|t| t.is_dir()).unwrap_or(false)
                && e.file_name().to_string_lossy().eq_ignore_ascii_case(TAKEOUT_DIR)
        })
        .map(|e| e.path());

    let Some(dir) = takeout_dir else {
        debug!(volume = %volume.id, "No {} folder on volume", TAKEOUT_DIR);
        return Ok(Vec::new());
    };

    let mut found = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(volume = %volume.id, error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && has_extension(&path, extensions) {
            found.push(path);
        }
    }
    Ok(found)
}

fn has_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .map(|e| extensions.contains(&e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or(false)
}
