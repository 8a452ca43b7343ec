//! Application state management.

use anyhow::{anyhow, bail, Context};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use zipdex_core::{Config, ContainerId, ContainerRecord, QueryEngine, Store, StoreRole};

/// Shared application state.
pub struct App {
    /// Configuration, shared with the core
    pub config: Arc<Config>,

    /// Location of the canonical store
    pub store_path: PathBuf,
}

impl App {
    /// Create a new application instance.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store_path = config.canonical_store_path()?;
        debug!(store = %store_path.display(), "Application initialized");

        Ok(App {
            config: Arc::new(config),
            store_path,
        })
    }

    pub fn index_exists(&self) -> bool {
        self.store_path.exists()
    }

    /// Open the canonical store, creating it on first use.
    pub fn open_or_create_store(&self) -> anyhow::Result<Store> {
        if self.index_exists() {
            Ok(Store::open(&self.store_path)?)
        } else {
            info!(store = %self.store_path.display(), "Creating index");
            Ok(Store::create(&self.store_path, StoreRole::Canonical)?)
        }
    }

    /// Query engine over the index, or `None` if nothing was indexed yet.
    pub fn engine(&self) -> anyhow::Result<Option<QueryEngine>> {
        if !self.index_exists() {
            return Ok(None);
        }
        let engine = QueryEngine::open(&self.store_path)
            .with_context(|| format!("Failed to open index at {}", self.store_path.display()))?;
        Ok(Some(engine))
    }

    /// Query engine, or a friendly error when the index is missing.
    pub fn require_engine(&self) -> anyhow::Result<QueryEngine> {
        self.engine()?
            .ok_or_else(|| anyhow!("Index is empty. Run 'zipdex index' first."))
    }

    /// Look up an archive by the ID printed by `archives`.
    pub fn resolve_container(
        &self,
        engine: &QueryEngine,
        id: &str,
    ) -> anyhow::Result<ContainerRecord> {
        let Some(container_id) = ContainerId::parse(id) else {
            bail!("'{}' is not a valid archive ID", id);
        };
        engine
            .container(container_id)?
            .ok_or_else(|| anyhow!("No archive with ID {}", container_id))
    }
}
