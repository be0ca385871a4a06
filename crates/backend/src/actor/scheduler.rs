use std::{
  collections::HashMap,
  sync::{LazyLock, Mutex, PoisonError},
  time::Duration,
};

use tokio::{
  task::AbortHandle,
  time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{handle::SyncHandle, message::SyncTrigger};

/// Live periodic triggers keyed by list name, shared by every service
/// instance in the process.
static REGISTRY: LazyLock<Mutex<HashMap<String, AbortHandle>>> = LazyLock::new(Default::default);

/// Periodic tick source for a sync actor.
///
/// A service may be rebuilt while the previous instance's timer is still
/// running. Registering always aborts the earlier timer under the same key so
/// ticks never pile up.
pub struct PeriodicTrigger;

impl PeriodicTrigger {
  /// Start ticking `handle` every `period`, replacing any existing trigger
  /// under `key`. The first tick fires one full period from now.
  pub fn register(key: &str, period: Duration, handle: SyncHandle, cancel: CancellationToken) {
    let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);

    let task = tokio::spawn(tick_loop(key.to_string(), period, handle, cancel));
    if let Some(previous) = registry.insert(key.to_string(), task.abort_handle()) {
      previous.abort();
      info!(key, "Replaced existing periodic trigger");
    } else {
      info!(key, period_secs = period.as_secs(), "Periodic trigger registered");
    }
  }
}

async fn tick_loop(key: String, period: Duration, handle: SyncHandle, cancel: CancellationToken) {
  // interval() panics on a zero period
  let mut timer = interval(period.max(Duration::from_millis(1)));
  timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

  // Skip the immediate tick
  timer.tick().await;

  loop {
    tokio::select! {
      biased;

      _ = cancel.cancelled() => {
        debug!(key = %key, "Periodic trigger stopped (cancelled)");
        break;
      }

      _ = timer.tick() => {
        match handle.trigger(SyncTrigger::Tick) {
          Ok(sent) => debug!(key = %key, sent, "Periodic tick"),
          Err(_) => {
            debug!(key = %key, "Sync actor gone, stopping periodic trigger");
            break;
          }
        }
      }
    }
  }
}
