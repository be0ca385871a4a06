use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sync bookkeeping for one resource type.
///
/// Written only after the entries it describes are durably stored, so a
/// non-empty checksum always refers to data that is actually present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListMetadata {
  /// Most recently confirmed remote checksum (opaque token)
  pub checksum: String,
  /// Wall-clock time of the last update that produced or confirmed data
  pub timestamp: DateTime<Utc>,
  /// Build that performed the last refresh
  pub application_version: String,
  /// Rows in the store after the last refresh
  pub entry_count: usize,
}

impl ListMetadata {
  /// True until the first successful sync.
  pub fn is_empty(&self) -> bool {
    self.checksum.is_empty()
  }
}

/// Trim a raw line into a storable entry, dropping blanks.
pub fn normalize_entry(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_string())
}
