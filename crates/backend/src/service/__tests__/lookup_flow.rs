//! Service-level lookup tests: matcher semantics through each lookup mode,
//! fail-open behavior and cache refresh after a sync.

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::Utc;
  use tokio_util::sync::CancellationToken;

  use crate::{
    actor::__tests__::helpers::{
      APP_VERSION, FailingStore, MemoryEntryStore, MemoryMetadataStore, SyncTestContext, next_event,
    },
    db::EntryStore,
    domain::{
      config::{Config, LookupMode},
      metadata::ListMetadata,
      resource::{ResourceType, lookup},
    },
    service::PhishingService,
  };

  fn synced_metadata(checksum: &str, entry_count: usize) -> ListMetadata {
    ListMetadata {
      checksum: checksum.to_string(),
      timestamp: Utc::now(),
      application_version: APP_VERSION.to_string(),
      entry_count,
    }
  }

  fn config(mode: LookupMode) -> Config {
    let mut config = Config::default();
    config.lookup.mode = mode;
    config
  }

  fn build_service(ctx: &SyncTestContext, store: Arc<dyn EntryStore>, mode: LookupMode) -> PhishingService {
    PhishingService::from_context(ctx.context(store), &config(mode), ctx.cancel.child_token())
  }

  fn domains_ctx(entries: &[&str]) -> SyncTestContext {
    let mut ctx = SyncTestContext::new();
    ctx.metadata = Arc::new(MemoryMetadataStore::with(
      ResourceType::Domains,
      synced_metadata("c1", entries.len()),
    ));
    ctx.store = Arc::new(MemoryEntryStore::with_entries(entries));
    ctx
  }

  fn links_ctx(entries: &[&str]) -> SyncTestContext {
    let mut ctx = SyncTestContext::new();
    ctx.descriptor = lookup(ResourceType::Links, 0).unwrap().with_overrides(
      Some("mem://links/full"),
      Some("mem://links/checksum"),
      Some("mem://links/delta"),
    );
    ctx.metadata = Arc::new(MemoryMetadataStore::with(
      ResourceType::Links,
      synced_metadata("c1", entries.len()),
    ));
    ctx.store = Arc::new(MemoryEntryStore::with_entries(entries));
    ctx
  }

  /// Sync `full` through the actor into a store that keeps key forms
  async fn synced_ctx(resource: ResourceType, full: &str) -> SyncTestContext {
    let mut ctx = SyncTestContext::new();
    if resource == ResourceType::Links {
      ctx.descriptor = lookup(ResourceType::Links, 0).unwrap().with_overrides(
        Some("mem://links/full"),
        Some("mem://links/checksum"),
        Some("mem://links/delta"),
      );
    }
    ctx.store = Arc::new(MemoryEntryStore::keyed(resource.matcher()));
    ctx.serve_remote("c1", full, "");

    let service = build_service(&ctx, ctx.store.clone(), LookupMode::Cached);
    let mut events = service.subscribe();
    assert!(service.trigger_update_if_needed());
    assert!(!next_event(&mut events).await.is_failure());
    service.shutdown();
    ctx
  }

  const ALL_MODES: [LookupMode; 3] = [LookupMode::Cached, LookupMode::Exact, LookupMode::Scan];

  // ==========================================================================
  // Domain matcher
  // ==========================================================================

  #[tokio::test]
  async fn test_domain_hostname_match_all_modes() {
    let ctx = domains_ctx(&["phish.com"]);
    for mode in ALL_MODES {
      let service = build_service(&ctx, ctx.store.clone(), mode);
      assert!(service.is_phishing("http://phish.com/testing-param").await, "{mode:?}");
      assert!(service.is_phishing("HTTPS://PHISH.COM").await, "{mode:?}");
      assert!(!service.is_phishing("http://notphish.com").await, "{mode:?}");
      assert!(!service.is_phishing("http://phish.com.evil.net").await, "{mode:?}");
    }
  }

  #[tokio::test]
  async fn test_domain_path_entries_cached_and_scan() {
    let ctx = domains_ctx(&["host.com/bad"]);
    for mode in [LookupMode::Cached, LookupMode::Scan] {
      let service = build_service(&ctx, ctx.store.clone(), mode);
      assert!(service.is_phishing("http://host.com/bad").await, "{mode:?}");
      assert!(service.is_phishing("http://host.com/bad/deeper").await, "{mode:?}");
      assert!(!service.is_phishing("http://host.com/badly").await, "{mode:?}");
      assert!(!service.is_phishing("http://host.com/").await, "{mode:?}");
    }
  }

  #[tokio::test]
  async fn test_raw_domain_lines_agree_across_modes() {
    let ctx = synced_ctx(ResourceType::Domains, "Phish.com\nhost.com/bad/\nHTTPS://Scheme.net\n").await;
    assert_eq!(ctx.store.snapshot(), vec!["host.com/bad", "phish.com", "scheme.net"]);

    for mode in ALL_MODES {
      let service = build_service(&ctx, ctx.store.clone(), mode);
      assert!(service.is_phishing("http://phish.com/x").await, "{mode:?}");
      assert!(service.is_phishing("http://host.com/bad").await, "{mode:?}");
      assert!(service.is_phishing("http://HOST.com/bad/deeper").await, "{mode:?}");
      assert!(service.is_phishing("https://scheme.net/login").await, "{mode:?}");
      assert!(!service.is_phishing("http://host.com/badly").await, "{mode:?}");
      assert!(!service.is_phishing("http://host.com/").await, "{mode:?}");
    }
  }

  #[tokio::test]
  async fn test_raw_link_lines_agree_across_modes() {
    let ctx = synced_ctx(
      ResourceType::Links,
      "site.com/Login\nhttp://other.net/a?b=1&amp;c=2\nsite.com/path/\n",
    )
    .await;
    assert_eq!(ctx.resource(), ResourceType::Links);

    for mode in ALL_MODES {
      let service = build_service(&ctx, ctx.store.clone(), mode);
      assert!(service.is_phishing("https://site.com/login").await, "{mode:?}");
      assert!(service.is_phishing("https://SITE.com/Login/").await, "{mode:?}");
      assert!(service.is_phishing("http://other.net/a?b=1&c=2").await, "{mode:?}");
      assert!(service.is_phishing("https://site.com/path").await, "{mode:?}");
      assert!(!service.is_phishing("https://site.com/login2").await, "{mode:?}");
    }
  }

  #[tokio::test]
  async fn test_sentinel_always_detected() {
    let ctx = domains_ctx(&[]);
    for mode in ALL_MODES {
      let service = build_service(&ctx, ctx.store.clone(), mode);
      assert!(
        service.is_phishing("https://phishing.testcategory.com/").await,
        "{mode:?}"
      );
    }
  }

  // ==========================================================================
  // Link matcher
  // ==========================================================================

  #[tokio::test]
  async fn test_link_prefix_semantics() {
    let ctx = links_ctx(&["site.com/login", "other.net/a?b=1&amp;c=2"]);
    for mode in [LookupMode::Cached, LookupMode::Scan] {
      let service = build_service(&ctx, ctx.store.clone(), mode);
      assert!(service.is_phishing("https://site.com/login").await, "{mode:?}");
      assert!(service.is_phishing("https://site.com/login/page").await, "{mode:?}");
      assert!(service.is_phishing("https://site.com/login?x=1").await, "{mode:?}");
      assert!(service.is_phishing("https://site.com/login#y").await, "{mode:?}");
      assert!(!service.is_phishing("https://site.com/login2").await, "{mode:?}");
      assert!(service.is_phishing("http://other.net/a?b=1&c=2").await, "{mode:?}");
    }
  }

  #[tokio::test]
  async fn test_link_exact_mode_matches_href_only() {
    let ctx = links_ctx(&["site.com/login"]);
    let service = build_service(&ctx, ctx.store.clone(), LookupMode::Exact);
    assert!(service.is_phishing("https://site.com/login").await);
    assert!(service.is_phishing("https://site.com/login/").await);
    assert!(!service.is_phishing("https://site.com/login/page").await);
  }

  // ==========================================================================
  // Failure handling and freshness
  // ==========================================================================

  #[tokio::test]
  async fn test_store_failure_fails_open() {
    let ctx = domains_ctx(&[]);
    for mode in ALL_MODES {
      let service = build_service(&ctx, Arc::new(FailingStore), mode);
      assert!(!service.is_phishing("http://phish.com").await, "{mode:?}");
    }
  }

  #[tokio::test]
  async fn test_cached_lookup_sees_sync_results() {
    let ctx = SyncTestContext::new();
    ctx.serve_remote("c1", "fresh-phish.com\n", "");
    let service = build_service(&ctx, ctx.store.clone(), LookupMode::Cached);

    assert!(!service.is_phishing("http://fresh-phish.com").await);

    let mut events = service.subscribe();
    assert!(service.trigger_update_if_needed());
    assert!(!next_event(&mut events).await.is_failure());

    assert!(service.is_phishing("http://fresh-phish.com").await);
    let metadata = service.metadata().await.unwrap();
    assert_eq!(metadata.checksum, "c1");
    assert_eq!(metadata.entry_count, 1);
  }

  #[tokio::test]
  async fn test_shutdown_drops_triggers() {
    let ctx = SyncTestContext::new();
    let service = PhishingService::from_context(
      ctx.context(ctx.store.clone()),
      &Config::default(),
      CancellationToken::new(),
    );

    service.shutdown();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!service.trigger_update_if_needed());
  }
}
