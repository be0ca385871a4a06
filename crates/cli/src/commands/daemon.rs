//! Daemon command

use anyhow::{Context, Result};
use phishguard::{Daemon, RuntimeConfig};

/// Run or spawn the sync daemon.
///
/// Without `--foreground` the current process only spawns a detached child
/// (`daemon --background`) and exits.
pub async fn cmd_daemon(runtime_config: RuntimeConfig, foreground: bool, background: bool) -> Result<()> {
  if !foreground && !background {
    let pid = Daemon::spawn_background().context("Failed to spawn daemon")?;
    println!("Daemon started (PID {})", pid);
    println!("Logs: {}", runtime_config.data_dir.display());
    return Ok(());
  }

  Daemon::new(runtime_config).run().await.context("Daemon failed")
}
