// Entry table operations
//
// Each resource type has one table with a single `entry` column. The entry
// value is the key, so writes go through merge_insert (insert-if-absent) and
// repeated entries collapse onto one row.

use std::{collections::HashSet, ops::ControlFlow, sync::Arc};

use arrow_array::{Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::{
  query::{ExecutableQuery, QueryBase},
  table::{CompactionOptions, Duration, OptimizeAction},
};
use tracing::{debug, trace};

use crate::{
  db::{
    connection::{DbError, PhishingDb, Result},
    schema::entries_schema,
  },
  domain::resource::ResourceType,
};

impl PhishingDb {
  /// Remove every entry for a resource type
  #[tracing::instrument(level = "trace", skip(self))]
  pub async fn clear_entries(&self, resource_type: ResourceType) -> Result<()> {
    let table = self.entries_table(resource_type).await?;
    table.delete("entry IS NOT NULL").await?;
    Ok(())
  }

  /// Insert entries that aren't already present, as one write
  #[tracing::instrument(level = "trace", skip(self, entries), fields(count = entries.len()))]
  pub async fn upsert_entries(&self, resource_type: ResourceType, entries: &[String]) -> Result<()> {
    // merge_insert rejects duplicate keys within one source batch
    let mut seen = HashSet::with_capacity(entries.len());
    let unique: Vec<&str> = entries
      .iter()
      .map(String::as_str)
      .filter(|e| !e.is_empty() && seen.insert(*e))
      .collect();

    if unique.is_empty() {
      return Ok(());
    }

    let table = self.entries_table(resource_type).await?;
    let batch = RecordBatch::try_new(entries_schema(), vec![Arc::new(StringArray::from(unique))])?;
    let batches = RecordBatchIterator::new(vec![Ok(batch)], entries_schema());

    let mut merge_insert = table.merge_insert(&["entry"]);
    merge_insert.when_not_matched_insert_all();
    merge_insert.execute(Box::new(batches)).await?;
    Ok(())
  }

  /// Merge small fragments and drop every superseded table version.
  ///
  /// Each delete and merge_insert leaves a version behind, so a daily full
  /// refresh would otherwise grow the table directory without bound. Readers
  /// still holding a pruned version see an I/O error, which the lookup path
  /// already treats as "not phishing".
  #[tracing::instrument(level = "trace", skip(self))]
  pub async fn compact_entries(&self, resource_type: ResourceType) -> Result<()> {
    let table = self.entries_table(resource_type).await?;

    let compacted = table
      .optimize(OptimizeAction::Compact {
        options: CompactionOptions::default(),
        remap_options: None,
      })
      .await?;
    let pruned = table
      .optimize(OptimizeAction::Prune {
        older_than: Some(Duration::zero()),
        delete_unverified: Some(true),
        error_if_tagged_old_versions: Some(false),
      })
      .await?;

    debug!(
      resource = %resource_type,
      fragments_removed = compacted.compaction.map(|c| c.fragments_removed).unwrap_or(0),
      old_versions = pruned.prune.as_ref().map(|p| p.old_versions).unwrap_or(0),
      bytes_removed = pruned.prune.as_ref().map(|p| p.bytes_removed).unwrap_or(0),
      "Compacted entry table"
    );
    Ok(())
  }

  /// Point lookup by exact entry value
  #[tracing::instrument(level = "trace", skip(self))]
  pub async fn has_entry(&self, resource_type: ResourceType, entry: &str) -> Result<bool> {
    let table = self.entries_table(resource_type).await?;
    let count = table
      .count_rows(Some(format!("entry = '{}'", escape_sql(entry))))
      .await?;
    Ok(count > 0)
  }

  /// Number of stored entries
  #[tracing::instrument(level = "trace", skip(self))]
  pub async fn count_entries(&self, resource_type: ResourceType) -> Result<usize> {
    let table = self.entries_table(resource_type).await?;
    Ok(table.count_rows(None).await?)
  }

  /// Visit stored entries batch by batch until `visit` breaks.
  ///
  /// Returns true if the scan stopped early. Batches not yet read when the
  /// visitor breaks are never pulled from the table.
  #[tracing::instrument(level = "trace", skip(self, visit))]
  pub async fn scan_entries<F>(&self, resource_type: ResourceType, mut visit: F) -> Result<bool>
  where
    F: FnMut(&str) -> ControlFlow<()> + Send,
  {
    let table = self.entries_table(resource_type).await?;
    let mut stream = table.query().execute().await?;
    let mut batches = 0usize;

    while let Some(batch) = stream.try_next().await? {
      batches += 1;
      let column = entry_column(&batch)?;
      for row in 0..column.len() {
        if column.is_null(row) {
          continue;
        }
        if visit(column.value(row)).is_break() {
          trace!(batches, "Entry scan stopped early");
          return Ok(true);
        }
      }
    }

    trace!(batches, "Entry scan complete");
    Ok(false)
  }
}

/// Escape single quotes in SQL strings
fn escape_sql(s: &str) -> String {
  s.replace('\'', "''")
}

fn entry_column(batch: &RecordBatch) -> Result<&StringArray> {
  batch
    .column_by_name("entry")
    .and_then(|c| c.as_any().downcast_ref::<StringArray>())
    .ok_or_else(|| DbError::InvalidInput("entry column missing or not utf8".to_string()))
}
