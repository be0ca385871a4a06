//! In-memory working set of known-bad entries.
//!
//! Built lazily on the first lookup, tagged with the metadata checksum it was
//! built from, and rebuilt from scratch whenever that checksum moves on.
//! Entries are held in their matcher key form, so lookups compare normalized
//! candidate keys against normalized entries.

use std::{collections::HashSet, sync::Arc};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
  db::{EntryStore, Result},
  domain::resource::Matcher,
};

/// Snapshot of the store at one checksum, plus sentinel entries
#[derive(Debug, Default)]
pub struct WorkingSet {
  checksum: String,
  entries: HashSet<String>,
}

impl WorkingSet {
  pub fn checksum(&self) -> &str {
    &self.checksum
  }

  pub fn contains(&self, entry: &str) -> bool {
    self.entries.contains(entry)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

pub struct WorkingSetCache {
  store: Arc<dyn EntryStore>,
  matcher: Matcher,
  sentinels: Vec<String>,
  chunk_size: usize,
  /// Held across a rebuild so concurrent lookups share one build
  current: Mutex<Option<Arc<WorkingSet>>>,
}

impl WorkingSetCache {
  pub fn new(store: Arc<dyn EntryStore>, matcher: Matcher, sentinels: Vec<String>, chunk_size: usize) -> Self {
    Self {
      store,
      matcher,
      sentinels: sentinels.iter().filter_map(|s| matcher.entry_key(s)).collect(),
      chunk_size: chunk_size.max(1),
      current: Mutex::new(None),
    }
  }

  /// The working set for `checksum`, rebuilding it if the cached one is
  /// tagged with anything else.
  pub async fn current_set(&self, checksum: &str) -> Result<Arc<WorkingSet>> {
    let mut current = self.current.lock().await;
    if let Some(set) = current.as_ref().filter(|set| set.checksum == checksum) {
      return Ok(Arc::clone(set));
    }

    let set = Arc::new(self.build(checksum).await?);
    *current = Some(Arc::clone(&set));
    Ok(set)
  }

  async fn build(&self, checksum: &str) -> Result<WorkingSet> {
    debug!(checksum, "Rebuilding working set");
    let stored = self.store.load_all().await?;

    let mut entries = HashSet::with_capacity(stored.len() + self.sentinels.len());
    // Stores written by this build already hold keys; this covers older data
    for (i, entry) in stored.iter().enumerate() {
      if let Some(key) = self.matcher.entry_key(entry) {
        entries.insert(key);
      }
      if (i + 1) % self.chunk_size == 0 {
        tokio::task::yield_now().await;
      }
    }
    entries.extend(self.sentinels.iter().cloned());

    info!(checksum, entries = entries.len(), "Working set rebuilt");
    Ok(WorkingSet {
      checksum: checksum.to_string(),
      entries,
    })
  }
}
