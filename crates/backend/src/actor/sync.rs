//! The sync actor
//!
//! Owns one resource's update cycle:
//!
//! ```text
//! Idle -> Checking -> (NoOp) ---------------> Idle
//!                  -> Updating -> save meta -> Idle
//!         ^  any error                |
//!         +---- Failed{attempt} <-----+   (up to max_attempts, then Idle)
//! ```
//!
//! Only this task mutates the entry store, so store writes never overlap.

use std::sync::Arc;

use chrono::Utc;
use tokio::{
  sync::{broadcast, mpsc, watch},
  time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
  handle::SyncHandle,
  message::{SyncEvent, SyncState, SyncTrigger},
};
use crate::{
  db::{EntryStore, MetadataStore},
  domain::{config::SyncConfig, metadata::ListMetadata, resource::ResourceDescriptor},
  fetch::ListFetcher,
  sync::{SyncError, UpdatePlan, plan},
};

/// Capacity of the trigger channel. One queued trigger is enough since a
/// cycle always re-reads the latest remote state.
const TRIGGER_CHANNEL_SIZE: usize = 1;
const EVENT_CHANNEL_SIZE: usize = 16;

/// Collaborators and settings for a [`SyncActor`]
#[derive(Clone)]
pub struct SyncContext {
  pub descriptor: ResourceDescriptor,
  pub config: SyncConfig,
  pub store: Arc<dyn EntryStore>,
  pub metadata: Arc<dyn MetadataStore>,
  pub fetcher: Arc<dyn ListFetcher>,
  /// Build version recorded in metadata; a change forces a full refresh
  pub app_version: String,
}

/// Result of one successful attempt
enum CycleOutcome {
  UpToDate,
  Updated { plan: &'static str, entry_count: usize },
}

pub struct SyncActor {
  ctx: SyncContext,
  trigger_rx: mpsc::Receiver<SyncTrigger>,
  state_tx: watch::Sender<SyncState>,
  events: broadcast::Sender<SyncEvent>,
  /// When the last cycle finished; in memory only
  last_check: Option<Instant>,
  cancel: CancellationToken,
}

impl SyncActor {
  /// Spawn the actor and return a handle to it
  pub fn spawn(ctx: SyncContext, cancel: CancellationToken) -> SyncHandle {
    let (tx, trigger_rx) = mpsc::channel(TRIGGER_CHANNEL_SIZE);
    let (state_tx, state_rx) = watch::channel(SyncState::Idle);
    let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

    let actor = Self {
      ctx,
      trigger_rx,
      state_tx,
      events: events.clone(),
      last_check: None,
      cancel,
    };
    tokio::spawn(actor.run());

    SyncHandle::new(tx, state_rx, events)
  }

  async fn run(mut self) {
    let resource = self.ctx.descriptor.resource_type;
    info!(%resource, list = %self.ctx.descriptor.name, "SyncActor started");

    let cancel = self.cancel.clone();
    loop {
      tokio::select! {
        biased;

        _ = cancel.cancelled() => {
          info!(%resource, "SyncActor shutting down (cancelled)");
          break;
        }

        trigger = self.trigger_rx.recv() => {
          let Some(trigger) = trigger else {
            info!(%resource, "SyncActor shutting down (channel closed)");
            break;
          };
          self.handle_trigger(trigger).await;
        }
      }
    }

    self.set_state(SyncState::Idle);
    info!(%resource, "SyncActor stopped");
  }

  async fn handle_trigger(&mut self, trigger: SyncTrigger) {
    let resource = self.ctx.descriptor.resource_type;

    if let Some(last) = self.last_check {
      let since = last.elapsed();
      if since < self.ctx.config.min_recheck() {
        debug!(%resource, ?trigger, since_ms = since.as_millis() as u64, "Checked recently, dropping trigger");
        return;
      }
    }

    debug!(%resource, ?trigger, "Starting sync cycle");
    let cancel = self.cancel.clone();
    tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        warn!(%resource, "Sync cycle interrupted by shutdown");
        return;
      }
      _ = self.run_cycle() => {}
    }

    self.last_check = Some(Instant::now());

    // Triggers that raced in while the cycle ran are dropped, not replayed
    let mut dropped = 0;
    while self.trigger_rx.try_recv().is_ok() {
      dropped += 1;
    }
    if dropped > 0 {
      debug!(%resource, dropped, "Dropped triggers received during cycle");
    }
    self.set_state(SyncState::Idle);
  }

  /// Run attempts until one succeeds or the attempt budget is spent
  async fn run_cycle(&self) {
    let resource = self.ctx.descriptor.resource_type;
    let max_attempts = self.ctx.config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
      match self.attempt().await {
        Ok(CycleOutcome::UpToDate) => {
          info!(%resource, "List up to date");
          self.publish(SyncEvent::UpToDate { resource });
          return;
        }
        Ok(CycleOutcome::Updated { plan, entry_count }) => {
          info!(%resource, plan, entry_count, "List updated");
          self.publish(SyncEvent::Updated {
            resource,
            plan,
            entry_count,
          });
          return;
        }
        Err(e) => {
          self.set_state(SyncState::Failed { attempt });

          if attempt >= max_attempts {
            error!(%resource, attempts = attempt, err = %e, "Sync failed, giving up until next trigger");
            self.publish(SyncEvent::Failed {
              resource,
              attempts: attempt,
              error: e.to_string(),
            });
            return;
          }

          warn!(
            %resource,
            attempt,
            max_attempts,
            retry_in_ms = self.ctx.config.retry_delay().as_millis() as u64,
            err = %e,
            "Sync attempt failed, retrying"
          );
          tokio::time::sleep(self.ctx.config.retry_delay()).await;
          attempt += 1;
        }
      }
    }
  }

  /// One Checking -> (Updating) pass
  async fn attempt(&self) -> Result<CycleOutcome, SyncError> {
    let resource = self.ctx.descriptor.resource_type;
    self.set_state(SyncState::Checking);

    let previous = self.ctx.metadata.load(resource).await?;
    let remote_checksum = self
      .ctx
      .fetcher
      .fetch_checksum(&self.ctx.descriptor.checksum_url)
      .await
      .map_err(SyncError::Checksum)?;

    let plan = plan(
      &previous,
      &remote_checksum,
      &self.ctx.app_version,
      Utc::now(),
      self.ctx.config.update_interval(),
      &self.ctx.descriptor,
    );
    debug!(%resource, plan = plan.kind(), previous = %previous.checksum, remote = %remote_checksum, "Planned update");

    match &plan {
      UpdatePlan::NoOp => return Ok(CycleOutcome::UpToDate),
      UpdatePlan::Incremental(url) => {
        self.set_state(SyncState::Updating);
        let delta = self.ctx.fetcher.fetch_lines(url).await.map_err(SyncError::Fetch)?;
        self.ctx.store.append(delta).await?;
      }
      UpdatePlan::Full(url) => {
        self.set_state(SyncState::Updating);
        self.replace(url).await?;
      }
    }

    let entry_count = self.ctx.store.count().await?;
    let metadata = ListMetadata {
      checksum: remote_checksum,
      timestamp: Utc::now(),
      application_version: self.ctx.app_version.clone(),
      entry_count,
    };
    self.ctx.metadata.save(resource, &metadata).await?;

    Ok(CycleOutcome::Updated {
      plan: plan.kind(),
      entry_count,
    })
  }

  async fn replace(&self, url: &str) -> Result<usize, SyncError> {
    if self.ctx.config.stream_full_list {
      let bytes = self.ctx.fetcher.fetch_stream(url).await.map_err(SyncError::Fetch)?;
      Ok(self.ctx.store.replace_from_stream(bytes).await?)
    } else {
      let entries = self.ctx.fetcher.fetch_lines(url).await.map_err(SyncError::Fetch)?;
      Ok(self.ctx.store.replace_all(entries).await?)
    }
  }

  fn set_state(&self, state: SyncState) {
    self.state_tx.send_replace(state);
  }

  fn publish(&self, event: SyncEvent) {
    // No subscribers is fine
    let _ = self.events.send(event);
  }
}
