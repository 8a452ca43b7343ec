//! Archive scanner.
//!
//! Opens one container and lists the entries that pass the match predicate.
//! Entry metadata is read from the central directory without decompressing
//! anything; entry data is only read when hashing is enabled.
//!
//! A container that cannot be opened or parsed is never an error for the
//! caller: the fault goes to the progress sink and the scan yields nothing.

use crate::config::ScanConfig;
use crate::error::{Result, ZipdexError};
use crate::progress::{Heartbeat, ProgressEvent, ProgressSink};
use crate::types::{extension_of, EntryDescriptor};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};
use zip::ZipArchive;

/// Which entries are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPredicate {
    /// Every non-directory entry
    AcceptAll,
    /// Entries whose extension (lowercase, no dot) is in the set
    Extensions(HashSet<String>),
}

impl MatchPredicate {
    pub fn from_config(scan: &ScanConfig) -> Self {
        if scan.accept_all {
            MatchPredicate::AcceptAll
        } else {
            MatchPredicate::Extensions(scan.extension_set())
        }
    }

    /// Test an entry name (a final path component or a full entry path).
    pub fn matches(&self, name: &str) -> bool {
        match self {
            MatchPredicate::AcceptAll => true,
            MatchPredicate::Extensions(set) => extension_of(name)
                .map(|ext| set.contains(&ext))
                .unwrap_or(false),
        }
    }
}

/// File-level facts about a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerMeta {
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

impl ContainerMeta {
    /// Stat the container file. Missing metadata is tolerated.
    pub fn probe(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) => ContainerMeta {
                size: meta.len(),
                modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Container metadata unavailable");
                ContainerMeta::default()
            }
        }
    }
}

/// Enumerates matching entries of single containers.
#[derive(Debug, Clone)]
pub struct ArchiveScanner {
    predicate: MatchPredicate,
    hash_ceiling: Option<u64>,
    large_container_threshold: usize,
    heartbeat_interval: Duration,
}

impl ArchiveScanner {
    pub fn new(scan: &ScanConfig) -> Self {
        ArchiveScanner {
            predicate: MatchPredicate::from_config(scan),
            hash_ceiling: scan.hashing.then_some(scan.max_hash_bytes),
            large_container_threshold: scan.large_container_threshold,
            heartbeat_interval: Duration::from_millis(scan.heartbeat_interval_ms),
        }
    }

    pub fn predicate(&self) -> &MatchPredicate {
        &self.predicate
    }

    pub fn hashing(&self) -> bool {
        self.hash_ceiling.is_some()
    }

    /// Scan one container.
    ///
    /// Unreadable containers are reported as
    /// [`ProgressEvent::ContainerUnreadable`] and yield an empty list.
    pub fn scan(&self, path: &Path, sink: &dyn ProgressSink) -> Vec<EntryDescriptor> {
        match self.try_scan(path, sink) {
            Ok(entries) => entries,
            Err(e) => {
                let reason = match e {
                    ZipdexError::ContainerUnreadable { reason, .. } => reason,
                    other => other.to_string(),
                };
                sink.report(ProgressEvent::ContainerUnreadable {
                    path: path.to_path_buf(),
                    reason,
                });
                Vec::new()
            }
        }
    }

    fn try_scan(&self, path: &Path, sink: &dyn ProgressSink) -> Result<Vec<EntryDescriptor>> {
        let unreadable = |reason: String| ZipdexError::ContainerUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| unreadable(e.to_string()))?;

        let total = archive.len();
        let large = total > self.large_container_threshold;
        if large {
            sink.report(ProgressEvent::LargeContainer {
                path: path.to_path_buf(),
                entries: total,
            });
        }
        let mut heartbeat = Heartbeat::new(self.heartbeat_interval);

        let mut matched = Vec::new();
        for index in 0..total {
            if large && heartbeat.tick() {
                sink.report(ProgressEvent::Heartbeat {
                    path: path.to_path_buf(),
                    processed: index as u64,
                    total: total as u64,
                });
            }

            let (name, size) = {
                let entry = archive
                    .by_index_raw(index)
                    .map_err(|e| unreadable(e.to_string()))?;
                if entry.is_dir() {
                    continue;
                }
                (entry.name().to_string(), entry.size())
            };

            let descriptor = EntryDescriptor::new(name, size);
            if !self.predicate.matches(&descriptor.name) {
                continue;
            }

            let descriptor = match self.hash_entry(&mut archive, index, size, path) {
                Some(hash) => descriptor.with_hash(hash),
                None => descriptor,
            };
            trace!(entry = %descriptor.path_in_container, size, "Matched entry");
            matched.push(descriptor);
        }

        sink.report(ProgressEvent::ContainerScanned {
            path: path.to_path_buf(),
            entries: total,
            matched: matched.len(),
        });
        Ok(matched)
    }

    fn hash_entry<R: Read + io::Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        index: usize,
        size: u64,
        path: &Path,
    ) -> Option<String> {
        let ceiling = self.hash_ceiling?;
        if size > ceiling {
            return None;
        }

        let result = archive
            .by_index(index)
            .map_err(io::Error::from)
            .and_then(|mut reader| hash_reader(&mut reader));
        match result {
            Ok(hash) => Some(hash),
            Err(e) => {
                debug!(path = %path.display(), index, error = %e, "Entry not hashed");
                None
            }
        }
    }

    /// Hash the container file itself, honouring the same ceiling as entries.
    pub fn hash_container(&self, path: &Path, size: u64) -> Option<String> {
        let ceiling = self.hash_ceiling?;
        if size > ceiling {
            return None;
        }

        match File::open(path).and_then(|f| hash_reader(&mut BufReader::new(f))) {
            Ok(hash) => Some(hash),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Container not hashed");
                None
            }
        }
    }
}

fn hash_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    io::copy(reader, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}
