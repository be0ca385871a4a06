//! Handle for talking to the sync actor
//!
//! Cheap to clone. Triggers are fire-and-forget: while a cycle is in flight
//! they are dropped rather than queued.

use tokio::sync::{broadcast, mpsc, watch};
use tracing::debug;

use super::message::{SyncEvent, SyncState, SyncTrigger};

#[derive(Clone, Debug)]
pub struct SyncHandle {
  tx: mpsc::Sender<SyncTrigger>,
  state: watch::Receiver<SyncState>,
  events: broadcast::Sender<SyncEvent>,
}

impl SyncHandle {
  pub fn new(
    tx: mpsc::Sender<SyncTrigger>,
    state: watch::Receiver<SyncState>,
    events: broadcast::Sender<SyncEvent>,
  ) -> Self {
    Self { tx, state, events }
  }

  /// Request a cycle.
  ///
  /// Returns `Ok(false)` when the trigger was dropped because a cycle is
  /// already running or one is already queued.
  pub fn trigger(&self, trigger: SyncTrigger) -> Result<bool, SendError> {
    if self.state.borrow().is_busy() {
      debug!(?trigger, "Sync in flight, dropping trigger");
      return Ok(false);
    }

    match self.tx.try_send(trigger) {
      Ok(()) => Ok(true),
      Err(mpsc::error::TrySendError::Full(_)) => {
        debug!(?trigger, "Trigger already queued, dropping");
        Ok(false)
      }
      Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::ActorGone),
    }
  }

  /// Run a sync cycle if one is due
  pub fn trigger_update_if_needed(&self) -> Result<bool, SendError> {
    self.trigger(SyncTrigger::Explicit)
  }

  /// Current actor state
  pub fn state(&self) -> SyncState {
    self.state.borrow().clone()
  }

  /// Receive a [`SyncEvent`] for every completed cycle from now on
  pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
    self.events.subscribe()
  }

  /// Watch state transitions
  pub fn watch_state(&self) -> watch::Receiver<SyncState> {
    self.state.clone()
  }
}

/// Error when sending to an actor
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
  #[error("Actor has shut down")]
  ActorGone,
}
