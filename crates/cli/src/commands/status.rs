//! Status command

use anyhow::{Context, Result};
use phishguard::{APP_VERSION, PhishingService, RuntimeConfig};
use tokio_util::sync::CancellationToken;

/// Print what the local mirror currently holds
pub async fn cmd_status(runtime_config: RuntimeConfig, json_output: bool) -> Result<()> {
  let cancel = CancellationToken::new();
  let service = PhishingService::start(&runtime_config.config, &runtime_config.data_dir, cancel.child_token())
    .context("Invalid sync configuration")?;
  let meta = service.metadata().await;
  service.shutdown();
  let meta = meta.context("Failed to read list metadata")?;

  let config = &runtime_config.config;
  if json_output {
    let status = serde_json::json!({
      "resource": service.resource().as_str(),
      "dataDir": runtime_config.data_dir,
      "lookupMode": config.lookup.mode,
      "appVersion": APP_VERSION,
      "metadata": meta,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    return Ok(());
  }

  println!("Resource:      {}", service.resource());
  println!("Data dir:      {}", runtime_config.data_dir.display());
  println!("Lookup mode:   {:?}", config.lookup.mode);
  println!("Version:       {}", APP_VERSION);
  println!();

  if meta.is_empty() {
    println!("Never synced. Run `phishguard sync` or start the daemon.");
    return Ok(());
  }

  println!("Checksum:      {}", meta.checksum);
  println!("Last update:   {}", meta.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
  println!("Synced by:     {}", meta.application_version);
  println!("Entries:       {}", meta.entry_count);
  if meta.application_version != APP_VERSION {
    println!();
    println!("Next sync will do a full refresh (written by a different version).");
  }
  Ok(())
}
