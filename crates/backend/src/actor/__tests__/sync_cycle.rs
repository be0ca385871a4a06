//! Sync cycle tests: planning outcomes, single-flight, retry and re-check
//! throttling, driven through a live `SyncActor` with in-memory fakes.

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use chrono::{TimeDelta, Utc};
  use pretty_assertions::assert_eq;

  use crate::{
    actor::{
      __tests__::helpers::{
        APP_VERSION, FailingStore, MemoryEntryStore, MemoryMetadataStore, SyncTestContext, next_event, wait_idle,
      },
      message::{SyncEvent, SyncState},
    },
    domain::{metadata::ListMetadata, resource::ResourceType},
  };

  fn metadata(checksum: &str, age: TimeDelta, version: &str, entry_count: usize) -> ListMetadata {
    ListMetadata {
      checksum: checksum.to_string(),
      timestamp: Utc::now() - age,
      application_version: version.to_string(),
      entry_count,
    }
  }

  fn seeded(meta: ListMetadata, entries: &[&str]) -> SyncTestContext {
    let mut ctx = SyncTestContext::new();
    ctx.metadata = Arc::new(MemoryMetadataStore::with(ResourceType::Domains, meta));
    ctx.store = Arc::new(MemoryEntryStore::with_entries(entries));
    ctx
  }

  // ==========================================================================
  // Update plans
  // ==========================================================================

  #[tokio::test]
  async fn test_first_sync_is_full() {
    let ctx = SyncTestContext::new();
    ctx.serve_remote("c1", "a.com\r\nb.com\n\n  c.com  \n", "");

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    assert!(handle.trigger_update_if_needed().unwrap());

    assert_eq!(
      next_event(&mut events).await,
      SyncEvent::Updated {
        resource: ResourceType::Domains,
        plan: "full",
        entry_count: 3,
      }
    );
    assert_eq!(ctx.store.snapshot(), vec!["a.com", "b.com", "c.com"]);

    let saved = ctx.metadata.get(ctx.resource());
    assert_eq!(saved.checksum, "c1");
    assert_eq!(saved.application_version, APP_VERSION);
    assert_eq!(saved.entry_count, 3);
    assert_eq!(ctx.fetcher.calls(&ctx.descriptor.delta_url), 0);
  }

  #[tokio::test]
  async fn test_unchanged_checksum_writes_nothing() {
    let previous = metadata("c1", TimeDelta::days(3), "0.0.1", 2);
    let ctx = seeded(previous.clone(), &["a.com", "b.com"]);
    ctx.serve_remote("c1\n", "x.com", "y.com");

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();

    assert_eq!(
      next_event(&mut events).await,
      SyncEvent::UpToDate {
        resource: ResourceType::Domains
      }
    );
    assert_eq!(ctx.store.writes(), 0);
    assert_eq!(ctx.metadata.saves(), 0);
    assert_eq!(ctx.metadata.get(ctx.resource()), previous, "timestamp must not move");
    assert_eq!(ctx.fetcher.calls(&ctx.descriptor.full_url), 0);
  }

  #[tokio::test]
  async fn test_incremental_appends_delta() {
    let ctx = seeded(metadata("c1", TimeDelta::hours(2), APP_VERSION, 2), &["a.com", "b.com"]);
    ctx.serve_remote("c2", "only-in-full.com", "c.com\nd.com\n");

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();

    assert_eq!(
      next_event(&mut events).await,
      SyncEvent::Updated {
        resource: ResourceType::Domains,
        plan: "incremental",
        entry_count: 4,
      }
    );
    assert_eq!(ctx.store.snapshot(), vec!["a.com", "b.com", "c.com", "d.com"]);
    assert_eq!(ctx.fetcher.calls(&ctx.descriptor.full_url), 0);
    assert_eq!(ctx.metadata.get(ctx.resource()).checksum, "c2");
  }

  #[tokio::test]
  async fn test_stale_mirror_full_replace_drops_residue() {
    let ctx = seeded(
      metadata("c1", TimeDelta::days(2), APP_VERSION, 2),
      &["old.com", "keep.com"],
    );
    ctx.serve_remote("c2", "keep.com\nnew.com", "delta.com");

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();

    let event = next_event(&mut events).await;
    assert!(matches!(event, SyncEvent::Updated { plan: "full", entry_count: 2, .. }));
    assert_eq!(ctx.store.snapshot(), vec!["keep.com", "new.com"]);
  }

  #[tokio::test]
  async fn test_version_change_forces_full_refresh() {
    let ctx = seeded(
      metadata("c1", TimeDelta::minutes(5), "0.9.0", 2),
      &["false-positive.com", "keep.com"],
    );
    ctx.serve_remote("c2", "keep.com", "added.com");

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();

    let event = next_event(&mut events).await;
    assert!(matches!(event, SyncEvent::Updated { plan: "full", .. }));
    assert_eq!(ctx.store.snapshot(), vec!["keep.com"]);
    assert_eq!(ctx.metadata.get(ctx.resource()).application_version, APP_VERSION);
  }

  #[tokio::test]
  async fn test_buffered_full_list_when_streaming_disabled() {
    let mut ctx = SyncTestContext::new();
    ctx.config.stream_full_list = false;
    ctx.serve_remote("c1", "a.com\nb.com", "");

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();

    assert!(matches!(next_event(&mut events).await, SyncEvent::Updated { entry_count: 2, .. }));
    assert_eq!(ctx.store.snapshot(), vec!["a.com", "b.com"]);
  }

  // ==========================================================================
  // Single-flight and throttling
  // ==========================================================================

  #[tokio::test]
  async fn test_triggers_during_update_are_dropped() {
    let mut ctx = SyncTestContext::new();
    ctx.store = Arc::new(MemoryEntryStore::with_write_delay(Duration::from_millis(200)));
    ctx.serve_remote("c1", "a.com", "");

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    assert!(handle.trigger_update_if_needed().unwrap());

    let mut state = handle.watch_state();
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| *s == SyncState::Updating))
      .await
      .expect("reaches Updating")
      .unwrap();

    assert!(!handle.trigger_update_if_needed().unwrap(), "second trigger is dropped");
    assert!(!handle.trigger_update_if_needed().unwrap());

    assert!(matches!(next_event(&mut events).await, SyncEvent::Updated { .. }));
    wait_idle(&handle).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(ctx.store.writes(), 1);
    assert_eq!(ctx.fetcher.calls(&ctx.descriptor.checksum_url), 1);
    assert!(events.try_recv().is_err(), "no second cycle");
  }

  #[tokio::test]
  async fn test_recent_check_drops_trigger() {
    let mut ctx = SyncTestContext::new();
    ctx.config.min_recheck_secs = 300;
    ctx.serve_remote("c1", "a.com", "");

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();
    next_event(&mut events).await;
    wait_idle(&handle).await;

    // Accepted by the channel, then dropped by the actor
    ctx.serve_remote("c2", "b.com", "");
    handle.trigger_update_if_needed().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(events.try_recv().is_err());
    assert_eq!(ctx.fetcher.calls(&ctx.descriptor.checksum_url), 1);
    assert_eq!(ctx.metadata.get(ctx.resource()).checksum, "c1");
  }

  #[tokio::test]
  async fn test_next_trigger_runs_after_recheck_window() {
    let ctx = SyncTestContext::new();
    ctx.serve_remote("c1", "a.com", "");

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();
    next_event(&mut events).await;
    wait_idle(&handle).await;

    handle.trigger_update_if_needed().unwrap();
    assert!(matches!(next_event(&mut events).await, SyncEvent::UpToDate { .. }));
    assert_eq!(ctx.fetcher.calls(&ctx.descriptor.checksum_url), 2);
  }

  // ==========================================================================
  // Retry
  // ==========================================================================

  #[tokio::test]
  async fn test_retry_recovers_within_budget() {
    let ctx = SyncTestContext::new();
    ctx.serve_remote("c1", "a.com", "");
    ctx.fetcher.fail(&ctx.descriptor.checksum_url, 2);

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();

    assert!(matches!(next_event(&mut events).await, SyncEvent::Updated { .. }));
    assert_eq!(ctx.fetcher.calls(&ctx.descriptor.checksum_url), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_retry_waits_for_retry_delay() {
    let mut ctx = SyncTestContext::new();
    ctx.config.retry_delay_secs = 300;
    ctx.serve_remote("c1", "a.com", "");
    ctx.fetcher.fail(&ctx.descriptor.checksum_url, 1);

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();

    // No timeouts here: with time paused they would fire before the retry
    let mut state = handle.watch_state();
    state
      .wait_for(|s| *s == SyncState::Failed { attempt: 1 })
      .await
      .unwrap();
    let failed_at = tokio::time::Instant::now();

    tokio::time::sleep(Duration::from_secs(299)).await;
    assert_eq!(ctx.fetcher.calls(&ctx.descriptor.checksum_url), 1, "retried before the delay");

    let event = events.recv().await.unwrap();
    assert!(matches!(event, SyncEvent::Updated { .. }), "got {event:?}");
    assert_eq!(ctx.fetcher.calls(&ctx.descriptor.checksum_url), 2);
    assert!(failed_at.elapsed() >= Duration::from_secs(300));
  }

  #[tokio::test]
  async fn test_retries_exhausted_drop_cycle() {
    let ctx = SyncTestContext::new();
    ctx.serve_remote("c1", "a.com", "");
    ctx.fetcher.fail(&ctx.descriptor.full_url, 10);

    let handle = ctx.spawn();
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();

    match next_event(&mut events).await {
      SyncEvent::Failed { attempts, error, .. } => {
        assert_eq!(attempts, 3);
        assert!(error.contains("503"), "unexpected error: {error}");
      }
      other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(ctx.fetcher.calls(&ctx.descriptor.full_url), 3);
    assert_eq!(ctx.metadata.saves(), 0);
    wait_idle(&handle).await;
    assert_eq!(handle.state(), SyncState::Idle);
  }

  #[tokio::test]
  async fn test_store_failure_leaves_metadata_untouched() {
    let previous = metadata("c1", TimeDelta::hours(1), APP_VERSION, 5);
    let mut ctx = SyncTestContext::new();
    ctx.metadata = Arc::new(MemoryMetadataStore::with(ResourceType::Domains, previous.clone()));
    ctx.serve_remote("c2", "a.com", "b.com");

    let handle = ctx.spawn_with_store(Arc::new(FailingStore));
    let mut events = handle.subscribe();
    handle.trigger_update_if_needed().unwrap();

    assert!(next_event(&mut events).await.is_failure());
    assert_eq!(ctx.metadata.get(ctx.resource()), previous);
  }

  #[tokio::test]
  async fn test_shutdown_stops_actor() {
    let ctx = SyncTestContext::new();
    let handle = ctx.spawn();

    ctx.cancel.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.trigger_update_if_needed().is_err());
  }
}
