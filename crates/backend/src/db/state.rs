//! Application state storage for per-resource [`ListMetadata`].
//!
//! Kept apart from the entry tables: it is tiny, read on every lookup, and
//! must be replaced atomically. The JSON document is loaded once, served from
//! memory afterwards, and rewritten via temp file + rename.

use std::{collections::HashMap, path::PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
  db::connection::Result,
  domain::{metadata::ListMetadata, resource::ResourceType},
};

#[async_trait]
pub trait MetadataStore: Send + Sync {
  /// Current metadata, or the empty default if none was ever written.
  async fn load(&self, resource_type: ResourceType) -> Result<ListMetadata>;

  async fn save(&self, resource_type: ResourceType, metadata: &ListMetadata) -> Result<()>;
}

type StateMap = HashMap<ResourceType, ListMetadata>;

/// JSON file backed metadata store
pub struct JsonStateStore {
  path: PathBuf,
  cache: RwLock<Option<StateMap>>,
}

impl JsonStateStore {
  pub fn new(path: PathBuf) -> Self {
    Self {
      path,
      cache: RwLock::new(None),
    }
  }

  async fn read_file(&self) -> Result<StateMap> {
    match tokio::fs::read(&self.path).await {
      Ok(bytes) => match serde_json::from_slice(&bytes) {
        Ok(state) => Ok(state),
        Err(e) => {
          // A corrupt state file only costs a full refresh
          warn!(path = %self.path.display(), err = %e, "Discarding unreadable state file");
          Ok(StateMap::new())
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StateMap::new()),
      Err(e) => Err(e.into()),
    }
  }

  async fn write_file(&self, state: &StateMap) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = self.path.with_extension("json.tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
    tokio::fs::rename(&tmp, &self.path).await?;
    Ok(())
  }
}

#[async_trait]
impl MetadataStore for JsonStateStore {
  async fn load(&self, resource_type: ResourceType) -> Result<ListMetadata> {
    if let Some(state) = self.cache.read().await.as_ref() {
      return Ok(state.get(&resource_type).cloned().unwrap_or_default());
    }

    let mut cache = self.cache.write().await;
    if cache.is_none() {
      *cache = Some(self.read_file().await?);
    }
    Ok(
      cache
        .as_ref()
        .and_then(|state| state.get(&resource_type).cloned())
        .unwrap_or_default(),
    )
  }

  async fn save(&self, resource_type: ResourceType, metadata: &ListMetadata) -> Result<()> {
    let mut cache = self.cache.write().await;
    let mut state = match cache.take() {
      Some(state) => state,
      None => self.read_file().await?,
    };
    state.insert(resource_type, metadata.clone());

    let written = self.write_file(&state).await;
    // Keep memory in step with disk only when the write landed
    if written.is_ok() {
      debug!(resource = %resource_type, checksum = %metadata.checksum, "Saved list metadata");
      *cache = Some(state);
    }
    written
  }
}
