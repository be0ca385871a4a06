use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{metadata::ListMetadata, resource::ResourceDescriptor};

/// What a sync cycle has to do after comparing checksums
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
  /// Remote list unchanged
  NoOp,
  /// Append the "new today" delta
  Incremental(String),
  /// Replace everything with the full list
  Full(String),
}

impl UpdatePlan {
  pub fn kind(&self) -> &'static str {
    match self {
      UpdatePlan::NoOp => "noop",
      UpdatePlan::Incremental(_) => "incremental",
      UpdatePlan::Full(_) => "full",
    }
  }
}

/// Decide how to bring the local mirror up to `remote_checksum`.
///
/// Deltas only ever add entries, so the incremental path is limited to a
/// fresh, non-empty mirror written by the same application version. Anything
/// else (stale, upgraded, empty) gets a full replace, which is the only way
/// retracted entries leave the store.
pub fn plan(
  previous: &ListMetadata,
  remote_checksum: &str,
  app_version: &str,
  now: DateTime<Utc>,
  update_interval: Duration,
  descriptor: &ResourceDescriptor,
) -> UpdatePlan {
  if remote_checksum == previous.checksum {
    return UpdatePlan::NoOp;
  }

  // A timestamp in the future (clock skew) counts as fresh
  let age = (now - previous.timestamp).to_std().unwrap_or(Duration::ZERO);
  let fresh = age <= update_interval;

  if fresh && previous.application_version == app_version && previous.entry_count > 0 {
    UpdatePlan::Incremental(descriptor.delta_url.clone())
  } else {
    UpdatePlan::Full(descriptor.full_url.clone())
  }
}
