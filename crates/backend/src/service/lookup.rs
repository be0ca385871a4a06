//! The query path: "is this URL phishing?"
//!
//! Lookups never fail. Any store or metadata error is logged and the URL is
//! reported as not phishing, so an internal fault never blocks navigation.

use std::sync::Arc;

use tracing::{error, trace};

use super::cache::WorkingSetCache;
use crate::{
  db::{EntryStore, MetadataStore, Result},
  domain::{
    config::{LookupConfig, LookupMode},
    resource::ResourceDescriptor,
  },
};

pub struct PhishingDetector {
  descriptor: ResourceDescriptor,
  mode: LookupMode,
  sentinels: Vec<String>,
  store: Arc<dyn EntryStore>,
  metadata: Arc<dyn MetadataStore>,
  cache: WorkingSetCache,
}

impl PhishingDetector {
  /// Construction performs no I/O; the working set is built by the first
  /// cached lookup.
  pub fn new(
    descriptor: ResourceDescriptor,
    lookup: &LookupConfig,
    chunk_size: usize,
    store: Arc<dyn EntryStore>,
    metadata: Arc<dyn MetadataStore>,
  ) -> Self {
    let matcher = descriptor.matcher;
    let cache = WorkingSetCache::new(Arc::clone(&store), matcher, lookup.sentinels.clone(), chunk_size);
    Self {
      descriptor,
      mode: lookup.mode,
      sentinels: lookup.sentinels.iter().filter_map(|s| matcher.entry_key(s)).collect(),
      store,
      metadata,
      cache,
    }
  }

  /// True if `url` matches a known phishing entry.
  pub async fn is_phishing(&self, url: &str) -> bool {
    match self.check(url).await {
      Ok(hit) => {
        trace!(url, hit, mode = ?self.mode, "Phishing lookup");
        hit
      }
      Err(e) => {
        error!(url, err = %e, "Phishing lookup failed, treating as not phishing");
        false
      }
    }
  }

  async fn check(&self, url: &str) -> Result<bool> {
    let matcher = self.descriptor.matcher;

    match self.mode {
      LookupMode::Exact => {
        // Domain lists reduce to a few point lookups; links check the href only
        let keys = match matcher.membership_keys(url) {
          Some(keys) => keys,
          None => matcher.exact_key(url).into_iter().collect(),
        };
        if keys.iter().any(|key| self.sentinels.contains(key)) {
          return Ok(true);
        }
        for key in &keys {
          if self.store.contains(key).await? {
            return Ok(true);
          }
        }
        Ok(false)
      }
      LookupMode::Scan => {
        if self.sentinels.iter().any(|s| matcher.matches(url, s)) {
          return Ok(true);
        }
        self
          .store
          .find_first_matching(&|entry: &str| matcher.matches(url, entry))
          .await
      }
      LookupMode::Cached => {
        let checksum = self.metadata.load(self.descriptor.resource_type).await?.checksum;
        let set = self.cache.current_set(&checksum).await?;

        Ok(match matcher.membership_keys(url) {
          Some(keys) => keys.iter().any(|key| set.contains(key)),
          // Prefix semantics need a per-entry comparison
          None => set.iter().any(|entry| matcher.matches(url, entry)),
        })
      }
    }
  }
}
