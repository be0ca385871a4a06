//! URL check command

use anyhow::{Context, Result};
use phishguard::{PhishingService, RuntimeConfig};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Check each URL against the local mirror.
///
/// Exits with status 1 if any URL is a known phishing entry.
pub async fn cmd_check(runtime_config: RuntimeConfig, urls: Vec<String>, json_output: bool) -> Result<()> {
  let cancel = CancellationToken::new();
  let service = PhishingService::start(&runtime_config.config, &runtime_config.data_dir, cancel.child_token())
    .context("Invalid sync configuration")?;

  match service.metadata().await {
    Ok(meta) if meta.is_empty() => {
      eprintln!("Warning: the local list has never been synced; run `phishguard sync` first");
    }
    Ok(_) => {}
    Err(e) => warn!("Could not read list metadata: {}", e),
  }

  let mut results = Vec::with_capacity(urls.len());
  for url in urls {
    let phishing = service.is_phishing(&url).await;
    results.push((url, phishing));
  }
  service.shutdown();

  if json_output {
    let items: Vec<_> = results
      .iter()
      .map(|(url, phishing)| serde_json::json!({ "url": url, "phishing": phishing }))
      .collect();
    println!("{}", serde_json::to_string_pretty(&items)?);
  } else {
    for (url, phishing) in &results {
      let verdict = if *phishing { "PHISHING" } else { "ok" };
      println!("{:<8} {}", verdict, url);
    }
  }

  if results.iter().any(|(_, phishing)| *phishing) {
    std::process::exit(1);
  }
  Ok(())
}
