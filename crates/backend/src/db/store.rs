//! The persistent entry store.
//!
//! [`EntryStore`] is what the sync actor and the lookup path depend on.
//! [`LanceEntryStore`] implements it over [`PhishingDb`], writing in chunks
//! and yielding to the runtime between chunks so multi-hundred-thousand entry
//! refreshes don't monopolize the executor.
//!
//! Entries are stored in their matcher key form ([`Matcher::entry_key`]), so
//! point lookups with a normalized candidate key find mixed-case or
//! scheme-prefixed list lines.
//!
//! Multi-chunk replaces are not atomic: a failure after the clear leaves a
//! partially populated table and reports the error. Callers treat the update
//! as failed and leave metadata untouched, so the next cycle redoes it.

use std::{ops::ControlFlow, path::PathBuf};

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::{
  db::connection::{PhishingDb, Result},
  domain::resource::{Matcher, ResourceType},
  fetch::{ByteStream, entry_batches},
};

/// Predicate evaluated per stored entry during a scan
pub type EntryPredicate<'a> = &'a (dyn Fn(&str) -> bool + Send + Sync);

#[async_trait]
pub trait EntryStore: Send + Sync {
  /// Clear the store, then insert every entry. Returns entries written.
  async fn replace_all(&self, entries: Vec<String>) -> Result<usize>;

  /// Insert entries without clearing; existing keys are left as-is.
  async fn append(&self, entries: Vec<String>) -> Result<usize>;

  /// Clear the store, then fill it from a newline-delimited byte stream.
  async fn replace_from_stream(&self, bytes: ByteStream) -> Result<usize>;

  /// Exact key lookup.
  async fn contains(&self, entry: &str) -> Result<bool>;

  /// Every stored entry.
  async fn load_all(&self) -> Result<Vec<String>>;

  /// True as soon as one entry satisfies `predicate`; the rest are not read.
  async fn find_first_matching(&self, predicate: EntryPredicate<'_>) -> Result<bool>;

  /// Number of stored entries.
  async fn count(&self) -> Result<usize>;
}

/// LanceDB-backed entry store for one resource type.
///
/// Construction performs no I/O; the connection is opened by the first
/// operation and reused afterwards.
pub struct LanceEntryStore {
  db_path: PathBuf,
  resource_type: ResourceType,
  chunk_size: usize,
  db: OnceCell<PhishingDb>,
}

impl LanceEntryStore {
  pub fn new(db_path: PathBuf, resource_type: ResourceType, chunk_size: usize) -> Self {
    Self {
      db_path,
      resource_type,
      chunk_size: chunk_size.max(1),
      db: OnceCell::new(),
    }
  }

  async fn db(&self) -> Result<&PhishingDb> {
    self
      .db
      .get_or_try_init(|| PhishingDb::open_at_path(self.db_path.clone()))
      .await
  }

  /// Write entries in chunks, yielding between them
  async fn write_chunked(&self, db: &PhishingDb, entries: &[String]) -> Result<usize> {
    let matcher: Matcher = self.resource_type.matcher();
    let mut written = 0;
    for chunk in entries.chunks(self.chunk_size) {
      let keys: Vec<String> = chunk.iter().filter_map(|e| matcher.entry_key(e)).collect();
      db.upsert_entries(self.resource_type, &keys).await?;
      written += keys.len();
      debug!(resource = %self.resource_type, written, total = entries.len(), "Wrote entry chunk");
      tokio::task::yield_now().await;
    }
    Ok(written)
  }

  /// Reclaim superseded versions after a successful write. A failure here
  /// leaves the data intact, so it doesn't fail the write.
  async fn compact(&self, db: &PhishingDb) {
    if let Err(e) = db.compact_entries(self.resource_type).await {
      warn!(resource = %self.resource_type, err = %e, "Failed to compact entry table after write");
    }
  }

  async fn replace_all_inner(&self, entries: &[String]) -> Result<usize> {
    let db = self.db().await?;
    db.clear_entries(self.resource_type).await?;
    let written = self.write_chunked(db, entries).await?;
    self.compact(db).await;
    Ok(written)
  }

  async fn append_inner(&self, entries: &[String]) -> Result<usize> {
    let db = self.db().await?;
    let written = self.write_chunked(db, entries).await?;
    self.compact(db).await;
    Ok(written)
  }

  async fn replace_from_stream_inner(&self, bytes: ByteStream) -> Result<usize> {
    let db = self.db().await?;
    db.clear_entries(self.resource_type).await?;

    let mut batches = entry_batches(bytes);
    let mut pending: Vec<String> = Vec::with_capacity(self.chunk_size);
    let mut written = 0;

    while let Some(batch) = batches.try_next().await? {
      pending.extend(batch);
      while pending.len() >= self.chunk_size {
        let rest = pending.split_off(self.chunk_size);
        written += self.write_chunked(db, &pending).await?;
        pending = rest;
      }
    }

    if !pending.is_empty() {
      written += self.write_chunked(db, &pending).await?;
    }

    self.compact(db).await;
    Ok(written)
  }
}

#[async_trait]
impl EntryStore for LanceEntryStore {
  async fn replace_all(&self, entries: Vec<String>) -> Result<usize> {
    let result = self.replace_all_inner(&entries).await;

    match &result {
      Ok(written) => info!(resource = %self.resource_type, written, "Replaced all entries"),
      Err(e) => error!(resource = %self.resource_type, err = %e, "Replace failed, store may be partially filled"),
    }
    result
  }

  async fn append(&self, entries: Vec<String>) -> Result<usize> {
    let result = self.append_inner(&entries).await;

    match &result {
      Ok(written) => info!(resource = %self.resource_type, written, "Appended entries"),
      Err(e) => error!(resource = %self.resource_type, err = %e, "Append failed"),
    }
    result
  }

  async fn replace_from_stream(&self, bytes: ByteStream) -> Result<usize> {
    let result = self.replace_from_stream_inner(bytes).await;
    match &result {
      Ok(written) => info!(resource = %self.resource_type, written, "Replaced entries from stream"),
      Err(e) => error!(resource = %self.resource_type, err = %e, "Streaming replace failed, store may be partially filled"),
    }
    result
  }

  async fn contains(&self, entry: &str) -> Result<bool> {
    self
      .db()
      .await?
      .has_entry(self.resource_type, entry)
      .await
      .inspect_err(|e| error!(resource = %self.resource_type, err = %e, "Entry lookup failed"))
  }

  async fn load_all(&self) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    self
      .db()
      .await?
      .scan_entries(self.resource_type, |entry| {
        entries.push(entry.to_string());
        ControlFlow::Continue(())
      })
      .await
      .inspect_err(|e| error!(resource = %self.resource_type, err = %e, "Entry scan failed"))?;
    Ok(entries)
  }

  async fn find_first_matching(&self, predicate: EntryPredicate<'_>) -> Result<bool> {
    self
      .db()
      .await?
      .scan_entries(self.resource_type, |entry| {
        if predicate(entry) {
          ControlFlow::Break(())
        } else {
          ControlFlow::Continue(())
        }
      })
      .await
      .inspect_err(|e| error!(resource = %self.resource_type, err = %e, "Entry scan failed"))
  }

  async fn count(&self) -> Result<usize> {
    self.db().await?.count_entries(self.resource_type).await
  }
}
