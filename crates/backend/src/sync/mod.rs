//! List synchronization: update planning and the errors a sync cycle can hit.

pub mod planner;

pub use planner::{UpdatePlan, plan};

use crate::{db::DbError, fetch::FetchError};

/// A failed sync attempt. Every variant is retryable within a cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
  #[error("Checksum fetch failed: {0}")]
  Checksum(#[source] FetchError),
  #[error("List fetch failed: {0}")]
  Fetch(#[source] FetchError),
  #[error("Store update failed: {0}")]
  Store(#[from] DbError),
}
