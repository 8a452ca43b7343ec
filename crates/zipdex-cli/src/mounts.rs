//! Mounted volume enumeration.
//!
//! Windows: every existing drive letter `A:` to `Z:`.
//! Unix: `/` plus every mount point directly below `/mnt`, `/media` and
//! `/Volumes` (WSL exposes Windows drives as `/mnt/c`, `/mnt/d`, ...).

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use zipdex_core::{Config, VolumeInfo, VolumeSource};

/// Volumes currently mounted on this machine, minus `volumes.exclude`.
pub struct MountPoints {
    config: Arc<Config>,
}

impl MountPoints {
    pub fn new(config: Arc<Config>) -> Self {
        MountPoints { config }
    }
}

impl VolumeSource for MountPoints {
    fn volumes(&self) -> zipdex_core::Result<Vec<VolumeInfo>> {
        let volumes: Vec<VolumeInfo> = candidate_roots()
            .into_iter()
            .map(VolumeInfo::new)
            .filter(|v| {
                self.config
                    .should_index_volume(&v.root.to_string_lossy())
                    && self.config.should_index_volume(v.id.as_str())
            })
            .collect();

        debug!(count = volumes.len(), "Enumerated mounted volumes");
        Ok(volumes)
    }
}

#[cfg(windows)]
fn candidate_roots() -> Vec<PathBuf> {
    (b'A'..=b'Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
        .filter(|root| root.exists())
        .collect()
}

#[cfg(unix)]
fn candidate_roots() -> Vec<PathBuf> {
    use std::fs;

    let mut roots = vec![PathBuf::from("/")];
    for parent in ["/mnt", "/media", "/Volumes"] {
        let Ok(entries) = fs::read_dir(parent) else {
            continue;
        };
        let mut mounts: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_mount_point(p))
            .collect();
        mounts.sort();
        roots.extend(mounts);
    }
    roots
}

#[cfg(not(any(unix, windows)))]
fn candidate_roots() -> Vec<PathBuf> {
    Vec::new()
}

/// A directory on a different device than its parent.
#[cfg(unix)]
fn is_mount_point(path: &std::path::Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let Some(parent) = path.parent() else {
        return false;
    };
    match (std::fs::metadata(path), std::fs::metadata(parent)) {
        (Ok(meta), Ok(parent_meta)) => meta.is_dir() && meta.dev() != parent_meta.dev(),
        _ => false,
    }
}
