//! Message types for the sync actor
//!
//! Triggers flow in through an `mpsc` channel. State is published on a
//! `watch` channel and cycle outcomes on a `broadcast` channel so any number
//! of host components can observe them.

use crate::domain::resource::ResourceType;

/// Why a sync cycle was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
  /// Periodic timer
  Tick,
  /// Host asked for an update-if-needed (session activation, CLI)
  Explicit,
}

/// Where the actor is in its cycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
  #[default]
  Idle,
  Checking,
  Updating,
  /// Attempt `attempt` failed; waiting to retry or about to give up
  Failed { attempt: u32 },
}

impl SyncState {
  /// A cycle is in flight
  pub fn is_busy(&self) -> bool {
    !matches!(self, SyncState::Idle)
  }
}

/// Outcome of a completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
  /// Store and metadata were refreshed
  Updated {
    resource: ResourceType,
    /// "incremental" or "full"
    plan: &'static str,
    entry_count: usize,
  },
  /// Remote checksum matched; nothing was written
  UpToDate { resource: ResourceType },
  /// Every attempt failed; the cycle was dropped
  Failed {
    resource: ResourceType,
    attempts: u32,
    error: String,
  },
}

impl SyncEvent {
  pub fn is_failure(&self) -> bool {
    matches!(self, SyncEvent::Failed { .. })
  }
}
