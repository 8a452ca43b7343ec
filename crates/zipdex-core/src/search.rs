//! Search over the canonical store.
//!
//! This module provides read-only queries against the merged index:
//! - Substring matching on entry names (case-insensitive)
//! - Regular expression matching (case-insensitive)
//! - Filtering by size range and extension
//! - Container listings, duplicate detection and summary counts
//!
//! ## Consistency
//!
//! Every search runs inside one read transaction. The store is in WAL mode,
//! so a merge committing at the same time is either fully visible or not at
//! all.
//!
//! ## Performance
//!
//! Substring patterns are pushed into SQL as a `LIKE` prefilter. Names with
//! non-ASCII characters always pass the prefilter, since `LIKE` only folds
//! ASCII case (the Kelvin sign lowercases to `k`, for one). The final
//! match always happens in Rust. Large candidate sets are filtered in
//! parallel with Rayon.

use crate::error::{Result, ZipdexError};
use crate::store::{self, keys, Store, SELECT_CONTAINER_COLUMNS};
use crate::types::{extension_of, ContainerId, ContainerRecord, EntryRecord, StoreStats, VolumeId};
use rayon::prelude::*;
use regex::Regex;
use rusqlite::params;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Candidate count above which filtering runs in parallel
const PARALLEL_THRESHOLD: usize = 10_000;

/// A compiled search query ready for matching.
///
/// Queries are compiled once and can be reused for multiple searches.
#[derive(Clone)]
pub struct SearchQuery {
    /// The matcher implementation
    matcher: Arc<dyn Matcher>,

    /// Filters applied after matching
    filters: Vec<SearchFilter>,

    /// Maximum number of hits (None = unlimited)
    limit: Option<usize>,
}

impl std::fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchQuery")
            .field("filters", &self.filters)
            .field("limit", &self.limit)
            .finish()
    }
}

impl SearchQuery {
    /// Create a substring search query (case-insensitive).
    ///
    /// # Example
    /// ```
    /// use zipdex_core::SearchQuery;
    /// let query = SearchQuery::substring("video_000");
    /// ```
    pub fn substring(pattern: &str) -> Self {
        SearchQuery {
            matcher: Arc::new(SubstringMatcher::new(pattern)),
            filters: Vec::new(),
            limit: None,
        }
    }

    /// Create a regex search query, matched case-insensitively against entry names.
    ///
    /// # Example
    /// ```
    /// use zipdex_core::SearchQuery;
    /// let query = SearchQuery::regex(r"^video_\d+\.mp4$").unwrap();
    /// ```
    pub fn regex(pattern: &str) -> Result<Self> {
        let re =
            Regex::new(&format!("(?i){}", pattern)).map_err(|e| ZipdexError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(SearchQuery {
            matcher: Arc::new(RegexMatcher {
                regex: re,
                blank: pattern.trim().is_empty(),
            }),
            filters: Vec::new(),
            limit: None,
        })
    }

    /// Add a filter to the query.
    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Cap the number of hits (0 = unlimited).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// Check if an entry matches this query.
    pub fn matches(&self, name: &str, size: u64) -> bool {
        self.matcher.matches(name) && self.filters.iter().all(|f| f.matches(name, size))
    }

    /// A blank pattern matches nothing.
    pub fn is_blank(&self) -> bool {
        self.matcher.is_blank()
    }

    fn min_size(&self) -> Option<u64> {
        self.filters
            .iter()
            .filter_map(|f| match f {
                SearchFilter::MinSize(s) => Some(*s),
                _ => None,
            })
            .max()
    }

    fn max_size(&self) -> Option<u64> {
        self.filters
            .iter()
            .filter_map(|f| match f {
                SearchFilter::MaxSize(s) => Some(*s),
                _ => None,
            })
            .min()
    }
}

/// Filters to narrow search results.
#[derive(Debug, Clone)]
pub enum SearchFilter {
    /// Only match entries with one of these extensions
    Extensions(Vec<String>),

    /// Only match entries at least this large
    MinSize(u64),

    /// Only match entries at most this large
    MaxSize(u64),
}

impl SearchFilter {
    /// Check if an entry matches this filter.
    pub fn matches(&self, name: &str, size: u64) -> bool {
        match self {
            SearchFilter::Extensions(exts) => extension_of(name).map_or(false, |e| {
                exts.iter()
                    .any(|ext| e.eq_ignore_ascii_case(ext.trim_start_matches('.')))
            }),
            SearchFilter::MinSize(min) => size >= *min,
            SearchFilter::MaxSize(max) => size <= *max,
        }
    }
}

// === Matcher Implementations ===

trait Matcher: Send + Sync {
    fn matches(&self, name: &str) -> bool;

    /// True when the pattern is empty or whitespace
    fn is_blank(&self) -> bool;

    /// Optional SQL `LIKE` pattern that every matching ASCII name satisfies
    fn like_hint(&self) -> Option<String> {
        None
    }
}

/// Case-insensitive substring matcher.
struct SubstringMatcher {
    pattern_lower: String,
}

impl SubstringMatcher {
    fn new(pattern: &str) -> Self {
        SubstringMatcher {
            pattern_lower: pattern.to_lowercase(),
        }
    }
}

impl Matcher for SubstringMatcher {
    fn matches(&self, name: &str) -> bool {
        !self.is_blank() && name.to_lowercase().contains(&self.pattern_lower)
    }

    fn is_blank(&self) -> bool {
        self.pattern_lower.trim().is_empty()
    }

    fn like_hint(&self) -> Option<String> {
        // SQLite LIKE only folds ASCII case in the pattern too
        if !self.pattern_lower.is_ascii() {
            return None;
        }
        let mut like = String::with_capacity(self.pattern_lower.len() + 2);
        like.push('%');
        for c in self.pattern_lower.chars() {
            if matches!(c, '%' | '_' | '\\') {
                like.push('\\');
            }
            like.push(c);
        }
        like.push('%');
        Some(like)
    }
}

/// Regular expression matcher.
struct RegexMatcher {
    regex: Regex,
    blank: bool,
}

impl Matcher for RegexMatcher {
    fn matches(&self, name: &str) -> bool {
        !self.blank && self.regex.is_match(name)
    }

    fn is_blank(&self) -> bool {
        self.blank
    }
}

/// One matching entry with its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub container_id: ContainerId,
    pub volume_id: VolumeId,
    pub container_path: String,
    pub entry_name: String,
    pub entry_size: u64,
    pub path_in_container: String,
}

/// A container with its entry count.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerSummary {
    #[serde(flatten)]
    pub container: ContainerRecord,
    pub entry_count: u64,
}

/// Entries sharing one content hash.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub hash: String,
    pub entry_size: u64,
    pub hits: Vec<SearchHit>,
}

/// Per-volume totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeSummary {
    pub volume_id: VolumeId,
    pub containers: u64,
    pub entries: u64,
    pub total_bytes: u64,
}

/// Problems found by [`QueryEngine::validate`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Indexed containers whose file is no longer on disk
    pub missing_containers: Vec<ContainerRecord>,

    /// Entries pointing at a container that does not exist
    pub orphaned_entries: u64,

    /// Messages from `PRAGMA integrity_check` other than "ok"
    pub integrity_errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_healthy(&self) -> bool {
        self.missing_containers.is_empty()
            && self.orphaned_entries == 0
            && self.integrity_errors.is_empty()
    }

    /// Number of distinct problems
    pub fn issue_count(&self) -> usize {
        self.missing_containers.len()
            + usize::from(self.orphaned_entries > 0)
            + self.integrity_errors.len()
    }
}

const SELECT_HITS: &str = "SELECT c.id, c.volume_id, c.path, e.name, e.size, e.path_in_container \
     FROM entries e JOIN containers c ON c.id = e.container_id \
     WHERE (?1 IS NULL OR e.name LIKE ?1 ESCAPE '\\' OR e.name GLOB '*[^ -~]*') \
       AND (?2 IS NULL OR e.size >= ?2) \
       AND (?3 IS NULL OR e.size <= ?3) \
     ORDER BY e.size DESC, e.id";

fn hit_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchHit> {
    Ok(SearchHit {
        container_id: row.get(0)?,
        volume_id: VolumeId::new(row.get::<_, String>(1)?),
        container_path: row.get(2)?,
        entry_name: row.get(3)?,
        entry_size: row.get::<_, i64>(4)? as u64,
        path_in_container: row.get(5)?,
    })
}

/// Read-only queries over a canonical store.
pub struct QueryEngine {
    store: Store,
}

impl QueryEngine {
    /// Open the canonical store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(QueryEngine {
            store: Store::open(path)?,
        })
    }

    pub fn from_store(store: Store) -> Self {
        QueryEngine { store }
    }

    /// Find entries matching `query`, largest first.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        if query.is_blank() {
            return Ok(Vec::new());
        }

        let conn = self.store.connection();
        let tx = conn.unchecked_transaction()?;
        let candidates = {
            let mut stmt = tx.prepare_cached(SELECT_HITS)?;
            let rows = stmt.query_map(
                params![
                    query.matcher.like_hint(),
                    query.min_size().map(|s| s as i64),
                    query.max_size().map(|s| s as i64),
                ],
                hit_from_row,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;

        let candidate_count = candidates.len();
        let mut hits: Vec<SearchHit> = if candidate_count > PARALLEL_THRESHOLD {
            candidates
                .into_par_iter()
                .filter(|h| query.matches(&h.entry_name, h.entry_size))
                .collect()
        } else {
            candidates
                .into_iter()
                .filter(|h| query.matches(&h.entry_name, h.entry_size))
                .collect()
        };

        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }
        debug!(candidates = candidate_count, hits = hits.len(), "Search complete");
        Ok(hits)
    }

    /// Volume, container, entry and byte counts
    pub fn summary(&self) -> Result<StoreStats> {
        self.store.stats()
    }

    /// Containers with their entry counts, most recently discovered first.
    pub fn list_containers(&self, limit: Option<usize>) -> Result<Vec<ContainerSummary>> {
        let columns = SELECT_CONTAINER_COLUMNS
            .split(", ")
            .map(|c| format!("c.{}", c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {}, (SELECT COUNT(*) FROM entries e WHERE e.container_id = c.id) \
             FROM containers c ORDER BY c.discovered_at DESC, c.path LIMIT ?1",
            columns
        );
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let conn = self.store.connection();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([limit], |row| {
            Ok(ContainerSummary {
                container: store::container_from_row(row)?,
                entry_count: row.get::<_, i64>(7)? as u64,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// When the last worker store was merged (RFC 3339)
    pub fn last_merge(&self) -> Result<Option<String>> {
        self.store.info(keys::LAST_MERGE)
    }

    /// Look up one container
    pub fn container(&self, id: ContainerId) -> Result<Option<ContainerRecord>> {
        self.store.container(id)
    }

    /// Entries of one container, optionally narrowed by a case-insensitive name filter.
    pub fn container_entries(
        &self,
        id: ContainerId,
        name_filter: Option<&str>,
    ) -> Result<Vec<EntryRecord>> {
        let entries = self.store.entries_of(id)?;
        let filter = name_filter
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty());
        Ok(match filter {
            Some(f) => entries
                .into_iter()
                .filter(|e| e.name.to_lowercase().contains(&f))
                .collect(),
            None => entries,
        })
    }

    /// Groups of two or more entries with the same content hash, largest first.
    pub fn duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        let conn = self.store.connection();
        let mut stmt = conn.prepare(
            "SELECT e.hash, c.id, c.volume_id, c.path, e.name, e.size, e.path_in_container \
             FROM entries e JOIN containers c ON c.id = e.container_id \
             WHERE e.hash IN (SELECT hash FROM entries WHERE hash IS NOT NULL \
                              GROUP BY hash HAVING COUNT(*) > 1) \
             ORDER BY e.hash, c.volume_id, c.path, e.path_in_container",
        )?;
        let rows = stmt.query_map([], |row| {
            let hash: String = row.get(0)?;
            let hit = SearchHit {
                container_id: row.get(1)?,
                volume_id: VolumeId::new(row.get::<_, String>(2)?),
                container_path: row.get(3)?,
                entry_name: row.get(4)?,
                entry_size: row.get::<_, i64>(5)? as u64,
                path_in_container: row.get(6)?,
            };
            Ok((hash, hit))
        })?;

        let mut groups: Vec<DuplicateGroup> = Vec::new();
        for row in rows {
            let (hash, hit) = row?;
            match groups.last_mut() {
                Some(group) if group.hash == hash => group.hits.push(hit),
                _ => groups.push(DuplicateGroup {
                    hash,
                    entry_size: hit.entry_size,
                    hits: vec![hit],
                }),
            }
        }
        groups.sort_by(|a, b| b.entry_size.cmp(&a.entry_size).then_with(|| a.hash.cmp(&b.hash)));
        Ok(groups)
    }

    /// Container, entry and byte totals for each volume, ordered by volume id.
    pub fn volumes(&self) -> Result<Vec<VolumeSummary>> {
        let conn = self.store.connection();
        let mut stmt = conn.prepare_cached(
            "SELECT c.volume_id, COUNT(DISTINCT c.id), COUNT(e.id), COALESCE(SUM(e.size), 0) \
             FROM containers c LEFT JOIN entries e ON e.container_id = c.id \
             GROUP BY c.volume_id ORDER BY c.volume_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(VolumeSummary {
                volume_id: VolumeId::new(row.get::<_, String>(0)?),
                containers: row.get::<_, i64>(1)? as u64,
                entries: row.get::<_, i64>(2)? as u64,
                total_bytes: row.get::<_, i64>(3)? as u64,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Check the index against the disk and itself.
    ///
    /// Containers on volumes that are not mounted right now are reported as
    /// missing too.
    pub fn validate(&self) -> Result<ValidationReport> {
        let conn = self.store.connection();

        let mut stmt = conn.prepare("PRAGMA integrity_check")?;
        let messages = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let integrity_errors: Vec<String> =
            messages.into_iter().filter(|message| message != "ok").collect();

        let orphaned_entries: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries \
             WHERE container_id NOT IN (SELECT id FROM containers)",
            [],
            |row| row.get(0),
        )?;

        let missing_containers: Vec<ContainerRecord> = self
            .store
            .containers()?
            .into_iter()
            .filter(|c| !Path::new(&c.path).exists())
            .collect();

        let report = ValidationReport {
            missing_containers,
            orphaned_entries: orphaned_entries as u64,
            integrity_errors,
        };
        debug!(issues = report.issue_count(), "Validation complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreRole;
    use crate::types::EntryDescriptor;
    use tempfile::TempDir;

    fn populated_engine(temp: &TempDir) -> QueryEngine {
        let path = temp.path().join("canonical.db");
        let mut store = Store::create(&path, StoreRole::Canonical).unwrap();

        let a = ContainerRecord::new(VolumeId::new("D:"), "D:/takeout-1.zip", 5000);
        store
            .record_container(
                &a,
                &[
                    EntryDescriptor::new("Photos/video_0001.mp4", 300).with_hash("h1"),
                    EntryDescriptor::new("Photos/video_0002.MP4", 900),
                    EntryDescriptor::new("Photos/holiday.mkv", 50).with_hash("h2"),
                ],
            )
            .unwrap();

        let b = ContainerRecord::new(VolumeId::new("E:"), "E:/backup.zip", 7000);
        store
            .record_container(
                &b,
                &[
                    EntryDescriptor::new("VIDEO_0003.mp4", 600).with_hash("h1"),
                    EntryDescriptor::new("100%_done.mp4", 10),
                ],
            )
            .unwrap();

        QueryEngine::from_store(store)
    }

    #[test]
    fn test_substring_search_orders_by_size() {
        let temp = TempDir::new().unwrap();
        let engine = populated_engine(&temp);

        let hits = engine.search(&SearchQuery::substring("video_000")).unwrap();
        let names: Vec<_> = hits.iter().map(|h| h.entry_name.as_str()).collect();
        assert_eq!(names, vec!["video_0002.MP4", "VIDEO_0003.mp4", "video_0001.mp4"]);
        assert_eq!(hits[0].volume_id.as_str(), "D:");
        assert_eq!(hits[0].container_path, "D:/takeout-1.zip");
        assert_eq!(hits[0].path_in_container, "Photos/video_0002.MP4");
    }

    #[test]
    fn test_blank_pattern_matches_nothing() {
        let temp = TempDir::new().unwrap();
        let engine = populated_engine(&temp);

        assert!(engine.search(&SearchQuery::substring("")).unwrap().is_empty());
        assert!(engine.search(&SearchQuery::substring("   ")).unwrap().is_empty());
        assert!(engine.search(&SearchQuery::regex("").unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_like_wildcards_are_literal() {
        let temp = TempDir::new().unwrap();
        let engine = populated_engine(&temp);

        let hits = engine.search(&SearchQuery::substring("100%")).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(engine.search(&SearchQuery::substring("0_d")).unwrap().is_empty());
    }

    #[test]
    fn test_regex_search() {
        let temp = TempDir::new().unwrap();
        let engine = populated_engine(&temp);

        let hits = engine
            .search(&SearchQuery::regex(r"^video_\d{4}\.mp4$").unwrap())
            .unwrap();
        assert_eq!(hits.len(), 3);

        let err = SearchQuery::regex("video_(").unwrap_err();
        assert!(matches!(err, ZipdexError::InvalidPattern { .. }));
    }

    #[test]
    fn test_filters_and_limit() {
        let temp = TempDir::new().unwrap();
        let engine = populated_engine(&temp);

        let query = SearchQuery::substring("o")
            .with_filter(SearchFilter::MinSize(100))
            .with_filter(SearchFilter::MaxSize(700));
        let hits = engine.search(&query).unwrap();
        let sizes: Vec<_> = hits.iter().map(|h| h.entry_size).collect();
        assert_eq!(sizes, vec![600, 300]);

        let query = SearchQuery::substring("o")
            .with_filter(SearchFilter::Extensions(vec![".MKV".to_string()]));
        let hits = engine.search(&query).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry_name, "holiday.mkv");

        let query = SearchQuery::substring("video").with_limit(2);
        assert_eq!(engine.search(&query).unwrap().len(), 2);
    }

    #[test]
    fn test_summary_and_listing() {
        let temp = TempDir::new().unwrap();
        let engine = populated_engine(&temp);

        let stats = engine.summary().unwrap();
        assert_eq!(stats.volumes, 2);
        assert_eq!(stats.containers, 2);
        assert_eq!(stats.entries, 5);
        assert_eq!(stats.total_bytes, 1860);

        let containers = engine.list_containers(None).unwrap();
        assert_eq!(containers.len(), 2);
        let total: u64 = containers.iter().map(|c| c.entry_count).sum();
        assert_eq!(total, 5);
        assert_eq!(engine.list_containers(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_container_lookup() {
        let temp = TempDir::new().unwrap();
        let engine = populated_engine(&temp);
        let listed = engine.list_containers(None).unwrap();
        let first = &listed[0].container;

        let found = engine.container(first.id).unwrap().unwrap();
        assert_eq!(found.path, first.path);
        assert!(engine.container(ContainerId::generate()).unwrap().is_none());

        let all = engine.container_entries(first.id, None).unwrap();
        let some = engine.container_entries(first.id, Some("VIDEO")).unwrap();
        assert!(!all.is_empty());
        assert!(some.iter().all(|e| e.name.to_lowercase().contains("video")));
    }

    #[test]
    fn test_duplicates() {
        let temp = TempDir::new().unwrap();
        let engine = populated_engine(&temp);

        let groups = engine.duplicates().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].hash, "h1");
        assert_eq!(groups[0].hits.len(), 2);
    }

    #[test]
    fn test_non_ascii_names_reach_the_matcher() {
        let temp = TempDir::new().unwrap();
        let mut store = Store::create(&temp.path().join("k.db"), StoreRole::Canonical).unwrap();
        let container = ContainerRecord::new(VolumeId::new("D:"), "D:/k.zip", 1);
        store
            .record_container(
                &container,
                &[
                    EntryDescriptor::new("\u{212A}ing.mp4", 20),
                    EntryDescriptor::new("KING.mkv", 10),
                    EntryDescriptor::new("queen.mp4", 5),
                ],
            )
            .unwrap();
        let engine = QueryEngine::from_store(store);

        let query = SearchQuery::substring("king");
        assert!(query.matches("\u{212A}ing.mp4", 20));
        let names: Vec<_> = engine
            .search(&query)
            .unwrap()
            .into_iter()
            .map(|h| h.entry_name)
            .collect();
        assert_eq!(names, vec!["\u{212A}ing.mp4".to_string(), "KING.mkv".to_string()]);
    }

    #[test]
    fn test_volume_totals() {
        let temp = TempDir::new().unwrap();
        let engine = populated_engine(&temp);

        let volumes = engine.volumes().unwrap();
        assert_eq!(
            volumes,
            vec![
                VolumeSummary {
                    volume_id: VolumeId::new("D:"),
                    containers: 1,
                    entries: 3,
                    total_bytes: 1250,
                },
                VolumeSummary {
                    volume_id: VolumeId::new("E:"),
                    containers: 1,
                    entries: 2,
                    total_bytes: 610,
                },
            ]
        );
        let total: u64 = volumes.iter().map(|v| v.total_bytes).sum();
        assert_eq!(total, engine.summary().unwrap().total_bytes);
    }

    #[test]
    fn test_validate() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("present.zip");
        std::fs::write(&present, b"zip bytes").unwrap();

        let mut store = Store::create(&temp.path().join("v.db"), StoreRole::Canonical).unwrap();
        let here = ContainerRecord::new(
            VolumeId::new("T:"),
            present.to_string_lossy().into_owned(),
            9,
        );
        let gone = ContainerRecord::new(VolumeId::new("T:"), temp.path().join("gone.zip").to_string_lossy().into_owned(), 9);
        store.record_container(&here, &[EntryDescriptor::new("a.mp4", 1)]).unwrap();
        store.record_container(&gone, &[EntryDescriptor::new("b.mp4", 1)]).unwrap();

        let engine = QueryEngine::from_store(store);
        let report = engine.validate().unwrap();
        assert_eq!(report.missing_containers.len(), 1);
        assert_eq!(report.missing_containers[0].id, gone.id);
        assert_eq!(report.orphaned_entries, 0);
        assert!(report.integrity_errors.is_empty());
        assert!(!report.is_healthy());

        let conn = engine.store.connection();
        conn.execute_batch("PRAGMA foreign_keys = OFF").unwrap();
        let orphan = EntryRecord::from_descriptor(ContainerId::generate(), EntryDescriptor::new("lost.mp4", 1));
        store::insert_entry(conn, &orphan).unwrap();

        let report = engine.validate().unwrap();
        assert_eq!(report.orphaned_entries, 1);
        assert_eq!(report.issue_count(), 2);
    }

    #[test]
    fn test_healthy_index_validates() {
        let temp = TempDir::new().unwrap();
        let engine = QueryEngine::from_store(
            Store::create(&temp.path().join("empty.db"), StoreRole::Canonical).unwrap(),
        );
        let report = engine.validate().unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.issue_count(), 0);
    }

    #[test]
    fn test_parallel_filtering_matches_sequential() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.db");
        let mut store = Store::create(&path, StoreRole::Canonical).unwrap();
        let entries: Vec<_> = (0..PARALLEL_THRESHOLD + 10)
            .map(|i| EntryDescriptor::new(format!("clip_{:05}.mp4", i), i as u64))
            .collect();
        let container = ContainerRecord::new(VolumeId::new("D:"), "D:/big.zip", 1);
        store.record_container(&container, &entries).unwrap();
        let engine = QueryEngine::from_store(store);

        let hits = engine
            .search(&SearchQuery::regex(r"clip_\d+5\.mp4").unwrap())
            .unwrap();
        assert_eq!(hits.len(), (PARALLEL_THRESHOLD + 10) / 10);
        assert!(hits.windows(2).all(|w| w[0].entry_size >= w[1].entry_size));
    }
}
