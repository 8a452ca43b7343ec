//! Error types for zipdex core operations.
//!
//! Library code returns [`ZipdexError`]; the CLI wraps it in `anyhow`.
//! Several variants never escape the core as `Err` values: a
//! [`ZipdexError::ContainerUnreadable`] is reported through the progress sink
//! and a [`ZipdexError::VolumeInaccessible`] or [`ZipdexError::ConflictOnMerge`]
//! ends up as a [`FailureRecord`] in the run report. A cancelled run still
//! returns its report inside [`ZipdexError::UserCancelled`].

use crate::orchestrator::RunReport;
use crate::types::VolumeId;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ZipdexError
pub type Result<T> = std::result::Result<T, ZipdexError>;

/// Core error types for zipdex operations.
#[derive(Error, Debug)]
pub enum ZipdexError {
    // === Scan Errors ===
    /// A container could not be opened or parsed as an archive
    #[error("cannot read container {path}: {reason}")]
    ContainerUnreadable { path: PathBuf, reason: String },

    /// The root of a volume is missing or cannot be listed
    #[error("volume {volume} is inaccessible: {reason}")]
    VolumeInaccessible { volume: VolumeId, reason: String },

    /// A volume job exceeded the configured per-volume timeout
    #[error("volume {volume} timed out after {seconds}s")]
    VolumeTimedOut { volume: VolumeId, seconds: u64 },

    /// A worker thread panicked while processing a volume
    #[error("worker for volume {volume} panicked: {reason}")]
    WorkerPanicked { volume: VolumeId, reason: String },

    /// The run was cancelled through its cancellation token
    #[error("run cancelled: {completed} volume(s) completed, {skipped} not started")]
    UserCancelled {
        completed: usize,
        skipped: usize,
        /// What the run did before stopping, merge included
        report: Box<RunReport>,
    },

    // === Store Errors ===
    /// The container is already present in the canonical store
    #[error("container {path} on volume {volume} is already indexed")]
    ConflictOnMerge { volume: VolumeId, path: String },

    /// The store file was written by an incompatible schema version
    #[error("store {path} has schema version {found}, expected {expected}")]
    StoreSchemaMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// The store file is missing
    #[error("store not found at {path}")]
    StoreNotFound { path: PathBuf },

    /// SQLite failure
    #[error("store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // === Query Errors ===
    /// Invalid search pattern (e.g., bad regex)
    #[error("invalid search pattern: {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The requested entry does not exist inside the container
    #[error("entry {entry} not found in {container}")]
    EntryNotFound { container: PathBuf, entry: String },

    // === Configuration Errors ===
    /// Configuration file parsing or validation failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive library error outside of the scan path (extraction)
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl ZipdexError {
    /// Classify this error for reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            ZipdexError::ContainerUnreadable { .. } => FailureKind::ContainerUnreadable,
            ZipdexError::VolumeInaccessible { .. } => FailureKind::VolumeInaccessible,
            ZipdexError::VolumeTimedOut { .. } => FailureKind::VolumeTimedOut,
            ZipdexError::WorkerPanicked { .. } => FailureKind::WorkerPanicked,
            ZipdexError::UserCancelled { .. } => FailureKind::UserCancelled,
            ZipdexError::ConflictOnMerge { .. } => FailureKind::ConflictOnMerge,
            ZipdexError::StoreSchemaMismatch { .. }
            | ZipdexError::StoreNotFound { .. }
            | ZipdexError::Sqlite(_) => FailureKind::StoreIo,
            _ => FailureKind::Other,
        }
    }

    /// Returns true if this error only affects a single unit of work and the
    /// surrounding run can carry on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ZipdexError::UserCancelled { .. } | ZipdexError::ConfigError { .. }
        )
    }

    /// Create a volume-inaccessible error
    pub fn volume_inaccessible(volume: &VolumeId, reason: impl Into<String>) -> Self {
        ZipdexError::VolumeInaccessible {
            volume: volume.clone(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        ZipdexError::ConfigError {
            reason: reason.into(),
        }
    }
}

/// Category of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ContainerUnreadable,
    VolumeInaccessible,
    VolumeTimedOut,
    WorkerPanicked,
    UserCancelled,
    ConflictOnMerge,
    StoreIo,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::ContainerUnreadable => "container_unreadable",
            FailureKind::VolumeInaccessible => "volume_inaccessible",
            FailureKind::VolumeTimedOut => "volume_timed_out",
            FailureKind::WorkerPanicked => "worker_panicked",
            FailureKind::UserCancelled => "user_cancelled",
            FailureKind::ConflictOnMerge => "conflict_on_merge",
            FailureKind::StoreIo => "store_io",
            FailureKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// A failure attributed to one volume, as it appears in run and merge reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub volume: VolumeId,
    pub kind: FailureKind,
    pub message: String,
}

impl FailureRecord {
    pub fn new(volume: VolumeId, error: &ZipdexError) -> Self {
        FailureRecord {
            volume,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use crate::merge::MergeSummary;

    #[test]
    fn test_kind_classification() {
        let err = ZipdexError::ConflictOnMerge {
            volume: VolumeId::new("D:"),
            path: "D:\\takeout.zip".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::ConflictOnMerge);
        assert!(err.is_recoverable());

        let err = ZipdexError::UserCancelled {
            completed: 1,
            skipped: 2,
            report: Box::new(RunReport {
                mode: RunMode::Sequential,
                volumes: Vec::new(),
                merge: MergeSummary::default(),
                elapsed_ms: 0,
            }),
        };
        assert_eq!(err.to_string(), "run cancelled: 1 volume(s) completed, 2 not started");
        assert_eq!(err.kind(), FailureKind::UserCancelled);
        assert!(!err.is_recoverable());

        let err = ZipdexError::StoreNotFound {
            path: PathBuf::from("/tmp/none.db"),
        };
        assert_eq!(err.kind(), FailureKind::StoreIo);
    }

    #[test]
    fn test_failure_record_carries_message() {
        let volume = VolumeId::new("/mnt/e");
        let err = ZipdexError::volume_inaccessible(&volume, "No such file or directory");
        let record = FailureRecord::new(volume.clone(), &err);

        assert_eq!(record.volume, volume);
        assert_eq!(record.kind, FailureKind::VolumeInaccessible);
        assert!(record.message.contains("No such file or directory"));
        assert_eq!(record.kind.to_string(), "volume_inaccessible");
    }
}
