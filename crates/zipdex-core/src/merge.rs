//! Merge engine: folds worker stores into the canonical store.
//!
//! Each worker store is copied inside its own canonical transaction, in the
//! order given. A store either lands completely (minus rejected conflicts) or
//! not at all. Identities are copied as-is; they were random to begin with.

use crate::config::Config;
use crate::error::{FailureKind, FailureRecord, Result, ZipdexError};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::store::{self, keys, remove_store_files, Store};
use crate::types::VolumeId;
use chrono::Utc;
use rusqlite::params;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of merging a list of worker stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Worker stores whose transaction committed
    pub stores_merged: usize,
    pub containers_merged: usize,
    pub entries_merged: usize,

    /// Rejected containers and failed stores
    pub failures: Vec<FailureRecord>,
}

impl MergeSummary {
    /// Number of containers rejected as already present
    pub fn conflicts(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::ConflictOnMerge)
            .count()
    }
}

struct StoreMerge {
    containers: usize,
    entries: usize,
    conflicts: Vec<FailureRecord>,
}

/// Copies worker stores into the canonical store.
pub struct MergeEngine {
    config: Arc<Config>,
}

impl MergeEngine {
    pub fn new(config: Arc<Config>) -> Self {
        MergeEngine { config }
    }

    /// Merge `sources` into `canonical`, in order.
    ///
    /// Never fails as a whole: a store that cannot be merged is rolled back,
    /// left on disk and reported in the summary.
    pub fn merge(
        &self,
        sources: &[PathBuf],
        canonical: &mut Store,
        sink: &dyn ProgressSink,
    ) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for source in sources {
            match self.merge_one(source, canonical) {
                Ok(merged) => {
                    summary.stores_merged += 1;
                    summary.containers_merged += merged.containers;
                    summary.entries_merged += merged.entries;
                    summary.failures.extend(merged.conflicts);

                    sink.report(ProgressEvent::StoreMerged {
                        store: source.clone(),
                        containers: merged.containers,
                        entries: merged.entries,
                    });

                    if !self.config.workers.retain_worker_stores {
                        if let Err(e) = remove_store_files(source) {
                            warn!(store = %source.display(), error = %e, "Failed to delete merged worker store");
                        }
                    }
                }
                Err(e) => {
                    warn!(store = %source.display(), error = %e, "Worker store not merged, left on disk");
                    summary.failures.push(FailureRecord {
                        volume: store_label(source),
                        kind: FailureKind::StoreIo,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            stores = summary.stores_merged,
            containers = summary.containers_merged,
            entries = summary.entries_merged,
            failures = summary.failures.len(),
            "Merge complete"
        );
        summary
    }

    #[instrument(skip_all, fields(store = %source.display()))]
    fn merge_one(&self, source: &Path, canonical: &mut Store) -> Result<StoreMerge> {
        let worker = Store::open(source)?;
        let containers = worker.containers()?;

        let tx = canonical.connection_mut().transaction()?;
        let mut merged = StoreMerge {
            containers: 0,
            entries: 0,
            conflicts: Vec::new(),
        };

        for container in containers {
            let exists: bool = tx.query_row(
                "SELECT EXISTS (SELECT 1 FROM containers WHERE volume_id = ?1 AND path = ?2)",
                params![container.volume_id.as_str(), container.path],
                |row| row.get(0),
            )?;
            if exists {
                let conflict = ZipdexError::ConflictOnMerge {
                    volume: container.volume_id.clone(),
                    path: container.path.clone(),
                };
                warn!(error = %conflict, "Rejected container");
                merged
                    .conflicts
                    .push(FailureRecord::new(container.volume_id.clone(), &conflict));
                continue;
            }

            store::insert_container(&tx, &container)?;
            for entry in worker.entries_of(container.id)? {
                store::insert_entry(&tx, &entry)?;
                merged.entries += 1;
            }
            merged.containers += 1;
        }

        tx.execute(
            "INSERT OR REPLACE INTO store_info (key, value) VALUES (?1, ?2)",
            [keys::LAST_MERGE, Utc::now().to_rfc3339().as_str()],
        )?;
        tx.commit()?;
        drop(worker);

        Ok(merged)
    }
}

/// Volume label for store-level failures: the volumes the store covers, or
/// its file name when the store cannot be read.
fn store_label(source: &Path) -> VolumeId {
    let covered = Store::open(source)
        .ok()
        .and_then(|s| s.info(keys::VOLUMES).ok().flatten());
    match covered {
        Some(volumes) => VolumeId::new(volumes),
        None => VolumeId::new(
            source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
    }
}
