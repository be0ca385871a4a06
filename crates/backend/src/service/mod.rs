//! Host-facing service layer.
//!
//! [`PhishingService`] is what a host embeds: it owns the sync actor, its
//! periodic trigger and the lookup path, and exposes the handful of calls a
//! host needs. Building one touches no storage; the database is opened by
//! the first sync or lookup.
//!
//! - [`cache`] - lazily built, checksum-tagged working set
//! - [`lookup`] - `is_phishing` in exact, cached or scan mode

pub mod cache;
pub mod lookup;


use std::{path::Path, sync::Arc};

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
  actor::{
    PeriodicTrigger, SyncActor, SyncContext, SyncHandle,
    message::{SyncEvent, SyncState},
  },
  db::{JsonStateStore, LanceEntryStore, MetadataStore, Result},
  domain::{
    config::{Config, ConfigError},
    metadata::ListMetadata,
    resource::ResourceType,
  },
  fetch::HttpFetcher,
};
use lookup::PhishingDetector;

/// Version recorded in list metadata
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct PhishingService {
  resource: ResourceType,
  sync: SyncHandle,
  detector: PhishingDetector,
  metadata: Arc<dyn MetadataStore>,
  cancel: CancellationToken,
}

impl PhishingService {
  /// Build the service over the on-disk store in `data_dir`.
  ///
  /// Fails only on configuration errors (no registered descriptor), which
  /// are not worth retrying.
  pub fn start(config: &Config, data_dir: &Path, cancel: CancellationToken) -> std::result::Result<Self, ConfigError> {
    let descriptor = config.sync.descriptor()?;
    let resource = descriptor.resource_type;

    let ctx = SyncContext {
      store: Arc::new(LanceEntryStore::new(
        data_dir.join("lancedb"),
        resource,
        config.sync.chunk_size,
      )),
      metadata: Arc::new(JsonStateStore::new(data_dir.join("state.json"))),
      fetcher: Arc::new(HttpFetcher::new(config.sync.request_timeout())),
      descriptor,
      config: config.sync.clone(),
      app_version: APP_VERSION.to_string(),
    };

    info!(%resource, data_dir = %data_dir.display(), lookup = ?config.lookup.mode, "Starting phishing service");
    Ok(Self::from_context(ctx, config, cancel))
  }

  /// Build the service from explicit collaborators
  pub(crate) fn from_context(ctx: SyncContext, config: &Config, cancel: CancellationToken) -> Self {
    let resource = ctx.descriptor.resource_type;
    let detector = PhishingDetector::new(
      ctx.descriptor.clone(),
      &config.lookup,
      ctx.config.chunk_size,
      Arc::clone(&ctx.store),
      Arc::clone(&ctx.metadata),
    );
    let metadata = Arc::clone(&ctx.metadata);
    let period = ctx.config.update_interval();
    let list_name = ctx.descriptor.name.clone();

    let sync = SyncActor::spawn(ctx, cancel.child_token());
    PeriodicTrigger::register(&list_name, period, sync.clone(), cancel.child_token());

    Self {
      resource,
      sync,
      detector,
      metadata,
      cancel,
    }
  }

  pub fn resource(&self) -> ResourceType {
    self.resource
  }

  /// Fire-and-forget request to run a sync cycle if one is due.
  ///
  /// Returns false when the request was dropped (cycle in flight, or the
  /// service is shut down).
  pub fn trigger_update_if_needed(&self) -> bool {
    match self.sync.trigger_update_if_needed() {
      Ok(accepted) => accepted,
      Err(e) => {
        warn!(resource = %self.resource, err = %e, "Sync trigger not delivered");
        false
      }
    }
  }

  /// True if `url` matches a known phishing entry. Never fails.
  pub async fn is_phishing(&self, url: &str) -> bool {
    self.detector.is_phishing(url).await
  }

  /// Cycle outcomes from now on
  pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
    self.sync.subscribe()
  }

  pub fn state(&self) -> SyncState {
    self.sync.state()
  }

  /// Follow state transitions (e.g. to wait for `Idle`)
  pub fn watch_state(&self) -> watch::Receiver<SyncState> {
    self.sync.watch_state()
  }

  /// Metadata of the last successful update
  pub async fn metadata(&self) -> Result<ListMetadata> {
    self.metadata.load(self.resource).await
  }

  /// Stop the sync actor and periodic trigger
  pub fn shutdown(&self) {
    info!(resource = %self.resource, "Shutting down phishing service");
    self.cancel.cancel();
  }
}
