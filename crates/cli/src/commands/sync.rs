//! One-shot sync command

use std::time::Duration;

use anyhow::{Context, Result, bail};
use phishguard::{PhishingService, RuntimeConfig, SyncEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Generous bound for a full download of the largest list
const SYNC_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Run a single sync cycle and report its outcome.
pub async fn cmd_sync(runtime_config: RuntimeConfig, json_output: bool) -> Result<()> {
  let cancel = CancellationToken::new();
  let service = PhishingService::start(&runtime_config.config, &runtime_config.data_dir, cancel.child_token())
    .context("Invalid sync configuration")?;

  let mut events = service.subscribe();
  if !service.trigger_update_if_needed() {
    service.shutdown();
    bail!("Sync request was not accepted");
  }

  let outcome = tokio::time::timeout(SYNC_TIMEOUT, async {
    loop {
      match events.recv().await {
        Ok(event) => return Some(event),
        Err(RecvError::Lagged(_)) => continue,
        Err(RecvError::Closed) => return None,
      }
    }
  })
  .await;

  service.shutdown();

  let event = match outcome {
    Ok(Some(event)) => event,
    Ok(None) => bail!("Sync actor stopped before finishing"),
    Err(_) => bail!("Sync did not finish within {} minutes", SYNC_TIMEOUT.as_secs() / 60),
  };

  if json_output {
    println!("{}", serde_json::to_string_pretty(&event_json(&event))?);
  } else {
    match &event {
      SyncEvent::Updated {
        resource,
        plan,
        entry_count,
      } => println!("{}: {} update applied, {} entries", resource, plan, entry_count),
      SyncEvent::UpToDate { resource } => println!("{}: already up to date", resource),
      SyncEvent::Failed { resource, attempts, error } => {
        eprintln!("{}: sync failed after {} attempts: {}", resource, attempts, error)
      }
    }
  }

  if event.is_failure() {
    std::process::exit(1);
  }
  Ok(())
}

fn event_json(event: &SyncEvent) -> serde_json::Value {
  match event {
    SyncEvent::Updated {
      resource,
      plan,
      entry_count,
    } => serde_json::json!({
      "resource": resource.as_str(),
      "outcome": "updated",
      "plan": plan,
      "entryCount": entry_count,
    }),
    SyncEvent::UpToDate { resource } => serde_json::json!({
      "resource": resource.as_str(),
      "outcome": "upToDate",
    }),
    SyncEvent::Failed { resource, attempts, error } => serde_json::json!({
      "resource": resource.as_str(),
      "outcome": "failed",
      "attempts": attempts,
      "error": error,
    }),
  }
}
