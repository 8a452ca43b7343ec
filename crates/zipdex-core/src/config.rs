//! Configuration management for zipdex.
//!
//! A single [`Config`] value is built once (defaults, then the TOML file, then
//! CLI overrides) and handed to the orchestrator, scanner and merge engine
//! constructors. Nothing in the core reads configuration from ambient state.

use crate::error::{Result, ZipdexError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Video extensions matched by default (without the leading dot).
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "3gp", "3g2", "asf", "divx", "f4v",
    "m2ts", "mts", "ogv", "rm", "rmvb", "vob", "xvid", "mpg", "mpeg", "m1v", "m2v",
];

/// Directory names pruned during recursive container discovery.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "System Volume Information",
    "$RECYCLE.BIN",
    "Windows",
    "Program Files",
    "Program Files (x86)",
    ".git",
    "__pycache__",
    "node_modules",
];

/// Main configuration structure for zipdex.
///
/// ## Example Configuration File (zipdex.toml)
///
/// ```toml
/// [general]
/// max_results = 500
///
/// [scan]
/// discovery = "recursive"
/// extensions = ["mp4", "mkv"]
/// hashing = true
/// max_hash_bytes = 104857600
///
/// [workers]
/// mode = "parallel"
/// max_workers = 4
/// volume_timeout_secs = 3600
///
/// [volumes]
/// roots = ["/mnt/d", "/mnt/e"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// What to look for and how
    pub scan: ScanConfig,

    /// Worker pool and merge behaviour
    pub workers: WorkerConfig,

    /// Volumes to index
    pub volumes: VolumesConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Maximum number of search results to return (0 = unlimited)
    pub max_results: usize,

    /// Directory holding the canonical store and worker stores (None = default location)
    pub index_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            max_results: 10000,
            index_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// How containers are found on a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Walk the whole volume
    Recursive,
    /// Only archives directly inside a root-level `GoogleTakeout` folder
    Takeout,
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub discovery: DiscoveryMode,

    /// Extensions identifying container files
    pub container_extensions: Vec<String>,

    /// Directory names skipped during recursive discovery
    pub excluded_dirs: Vec<String>,

    /// Entry extensions to record
    pub extensions: Vec<String>,

    /// Record every non-directory entry, ignoring `extensions`
    pub accept_all: bool,

    /// Hash entries and containers with BLAKE3
    pub hashing: bool,

    /// Entries larger than this are not hashed
    pub max_hash_bytes: u64,

    /// Containers with more entries than this get progress heartbeats
    pub large_container_threshold: usize,

    /// Minimum interval between heartbeats
    pub heartbeat_interval_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            discovery: DiscoveryMode::Recursive,
            container_extensions: vec!["zip".to_string()],
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            accept_all: false,
            hashing: false,
            max_hash_bytes: 100 * 1024 * 1024,
            large_container_threshold: 1000,
            heartbeat_interval_ms: 2000,
        }
    }
}

impl ScanConfig {
    /// Normalized entry extension set (lowercase, no leading dot).
    pub fn extension_set(&self) -> HashSet<String> {
        normalize_extensions(&self.extensions)
    }

    /// Normalized container extension set.
    pub fn container_extension_set(&self) -> HashSet<String> {
        normalize_extensions(&self.container_extensions)
    }

    /// Check if a directory name is pruned during discovery.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == name)
    }
}

/// Sequential or parallel volume processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Sequential,
    Parallel,
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub mode: RunMode,

    /// Upper bound on worker threads (0 = available parallelism)
    pub max_workers: usize,

    /// Per-volume timeout in seconds (0 = no timeout)
    pub volume_timeout_secs: u64,

    /// Keep worker store files after a successful merge
    pub retain_worker_stores: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            mode: RunMode::Parallel,
            max_workers: 0,
            volume_timeout_secs: 0,
            retain_worker_stores: false,
        }
    }
}

/// Volume selection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VolumesConfig {
    /// Explicit volume roots (empty = enumerate mount points)
    pub roots: Vec<PathBuf>,

    /// Volume roots to skip
    pub exclude: Vec<String>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| ZipdexError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ZipdexError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scan.container_extensions.is_empty() {
            return Err(ZipdexError::config("scan.container_extensions is empty"));
        }
        if !self.scan.accept_all && self.scan.extensions.is_empty() {
            return Err(ZipdexError::config(
                "scan.extensions is empty and scan.accept_all is off; nothing would match",
            ));
        }
        if self.scan.hashing && self.scan.max_hash_bytes == 0 {
            return Err(ZipdexError::config("scan.max_hash_bytes must be > 0"));
        }
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "zipdex")
            .ok_or_else(|| ZipdexError::config("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("zipdex.toml"))
    }

    /// Get the default data directory path.
    pub fn default_data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "zipdex")
            .ok_or_else(|| ZipdexError::config("Could not determine data directory"))?;

        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the index directory (from config or default).
    pub fn index_dir(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.general.index_path {
            Ok(path.clone())
        } else {
            Self::default_data_dir()
        }
    }

    /// Path of the canonical store inside the index directory.
    pub fn canonical_store_path(&self) -> Result<PathBuf> {
        Ok(self.index_dir()?.join("zipdex.db"))
    }

    /// Effective worker count for `volume_count` volumes.
    pub fn worker_count(&self, volume_count: usize) -> usize {
        let limit = if self.workers.max_workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.workers.max_workers
        };
        limit.min(volume_count).max(1)
    }

    /// Per-volume timeout, if configured.
    pub fn volume_timeout(&self) -> Option<Duration> {
        match self.workers.volume_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Check if a volume root should be indexed.
    pub fn should_index_volume(&self, root: &str) -> bool {
        !self
            .volumes
            .exclude
            .iter()
            .any(|v| root.eq_ignore_ascii_case(v))
    }
}

fn normalize_extensions(exts: &[String]) -> HashSet<String> {
    exts.iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.workers.mode, RunMode::Parallel);
        assert_eq!(config.general.max_results, 10000);
        assert!(config.scan.extension_set().contains("mp4"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let mut config = Config::default();
        config.general.max_results = 5000;
        config.workers.mode = RunMode::Sequential;
        config.scan.discovery = DiscoveryMode::Takeout;
        config.volumes.roots = vec![PathBuf::from("/mnt/d")];

        config.save_to(&config_path).unwrap();
        let loaded = Config::load_from(&config_path).unwrap();

        assert_eq!(loaded.general.max_results, 5000);
        assert_eq!(loaded.workers.mode, RunMode::Sequential);
        assert_eq!(loaded.scan.discovery, DiscoveryMode::Takeout);
        assert_eq!(loaded.volumes.roots, vec![PathBuf::from("/mnt/d")]);
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.general.max_results, 10000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "[workers]\nmax_workers = 3\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.workers.max_workers, 3);
        assert_eq!(config.scan.container_extensions, vec!["zip".to_string()]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "[scan]\ncontainer_extensions = []\n").unwrap();

        let result = Config::load_from(&config_path);
        assert!(matches!(result, Err(ZipdexError::ConfigError { .. })));
    }

    #[test]
    fn test_extension_normalization() {
        let mut config = Config::default();
        config.scan.extensions = vec![".MP4".to_string(), " mkv ".to_string(), "".to_string()];

        let set = config.scan.extension_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains("mp4"));
        assert!(set.contains("mkv"));
    }

    #[test]
    fn test_worker_count_is_bounded() {
        let mut config = Config::default();
        config.workers.max_workers = 4;

        assert_eq!(config.worker_count(100), 4);
        assert_eq!(config.worker_count(2), 2);
        assert_eq!(config.worker_count(0), 1);

        config.workers.max_workers = 0;
        assert!(config.worker_count(1000) >= 1);
    }

    #[test]
    fn test_should_index_volume() {
        let mut config = Config::default();
        assert!(config.should_index_volume("/mnt/c"));

        config.volumes.exclude = vec!["/mnt/C".to_string()];
        assert!(!config.should_index_volume("/mnt/c"));
        assert!(config.should_index_volume("/mnt/d"));
    }
}
