//! # zipdex Core Library
//!
//! This crate scans zip archives spread across many volumes, records the
//! entries that match a predicate, and answers searches over the result.
//!
//! ## Architecture
//!
//! Indexing follows an arena-per-worker, merge-commit strategy: every worker
//! writes into its own private store (an [`Arena`]), and only after all
//! workers have joined are the arenas folded into the canonical store, one
//! transaction per arena.
//!
//! - **Types** (`types`): Container and entry records, identifiers
//! - **Volume** (`volume`): Volume roots and container discovery
//! - **Scanner** (`scanner`): Lists matching entries of one archive
//! - **Store** (`store`): SQLite-backed worker and canonical stores
//! - **Orchestrator** (`orchestrator`): Runs volume jobs sequentially or in parallel
//! - **Merge** (`merge`): Folds worker stores into the canonical store
//! - **Search** (`search`): Read-only queries over the canonical store
//! - **Extract** (`extract`): Copies one entry out of an archive
//! - **Progress** (`progress`): Observer trait for status events
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zipdex_core::{Config, Orchestrator, QueryEngine, SearchQuery, StaticVolumes, Store, StoreRole};
//!
//! let config = Arc::new(Config::default());
//! let mut canonical = Store::create(&config.canonical_store_path()?, StoreRole::Canonical)?;
//!
//! let volumes = StaticVolumes::from_roots(["/mnt/d", "/mnt/e"]);
//! let report = Orchestrator::new(config).run_source(&volumes, &mut canonical)?;
//! println!("{} containers merged", report.merge.containers_merged);
//!
//! let engine = QueryEngine::from_store(canonical);
//! for hit in engine.search(&SearchQuery::substring("video_000"))? {
//!     println!("{} :: {}", hit.container_path, hit.path_in_container);
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod orchestrator;
pub mod progress;
pub mod scanner;
pub mod search;
pub mod store;
pub mod types;
pub mod volume;

// Re-export commonly used types
pub use config::{Config, DiscoveryMode, RunMode};
pub use error::{FailureKind, FailureRecord, Result, ZipdexError};
pub use extract::{Extraction, Extractor};
pub use merge::{MergeEngine, MergeSummary};
pub use orchestrator::{CancellationToken, Orchestrator, RunReport, VolumeReport, VolumeStatus};
pub use progress::{
    ChannelProgress, LineProgress, LoggingProgress, NoProgress, ProgressEvent, ProgressSink,
    SharedProgress,
};
pub use scanner::{ArchiveScanner, MatchPredicate};
pub use search::{
    ContainerSummary, DuplicateGroup, QueryEngine, SearchFilter, SearchHit, SearchQuery,
    ValidationReport, VolumeSummary,
};
pub use store::{Arena, Store, StoreRole};
pub use types::{ContainerId, ContainerRecord, EntryDescriptor, EntryRecord, StoreStats, VolumeId};
pub use volume::{discover_containers, StaticVolumes, VolumeInfo, VolumeSource};
