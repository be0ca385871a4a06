//! Daemon lifecycle management.
//!
//! The daemon keeps the local mirror fresh for as long as it runs:
//!
//! ```text
//! Daemon (Supervisor)
//!   ├── PhishingService
//!   │     ├── SyncActor
//!   │     └── PeriodicTrigger
//!   ├── event logger (SyncEvent -> tracing)
//!   └── log cleanup (daily, retention from config)
//! ```
//!
//! # Lifecycle
//!
//! 1. Create master `CancellationToken`
//! 2. Build the `PhishingService` (no storage access yet)
//! 3. Fire one explicit trigger so a stale mirror is refreshed at startup
//! 4. Run until ctrl-c, then cancel children and wait for them

use std::{path::PathBuf, time::Duration};

use tokio::{signal, sync::broadcast::error::RecvError, time::interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
  actor::message::SyncEvent,
  dirs,
  domain::config::{Config, ConfigError},
  service::PhishingService,
};

// ============================================================================
// Configuration
// ============================================================================

/// Daemon runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Base directory for the entry database, state file and logs
  pub data_dir: PathBuf,
  pub config: Config,
}

impl RuntimeConfig {
  pub async fn load() -> Self {
    // Auto-create user config on first run if it doesn't exist
    Self::ensure_user_config().await;

    Self {
      data_dir: dirs::default_data_dir(),
      config: Config::load_global().await,
    }
  }

  /// Ensure user config file exists, creating it with defaults if not.
  async fn ensure_user_config() {
    let Some(user_config_path) = Config::user_config_path() else {
      return;
    };

    if user_config_path.exists() {
      return;
    }

    if let Some(parent) = user_config_path.parent()
      && let Err(e) = tokio::fs::create_dir_all(parent).await
    {
      warn!("Failed to create config directory: {}", e);
      return;
    }

    match tokio::fs::write(&user_config_path, Config::generate_template()).await {
      Ok(()) => info!("Created user config: {:?}", user_config_path),
      Err(e) => warn!("Failed to create user config: {}", e),
    }
  }
}

/// The phishguard daemon.
pub struct Daemon {
  runtime_config: RuntimeConfig,
}

impl Daemon {
  pub fn new(runtime_config: RuntimeConfig) -> Self {
    Self { runtime_config }
  }

  /// Spawn a detached daemon process using the current executable.
  ///
  /// This re-executes the current binary with `daemon --background`,
  /// ensuring a clean process with its own Tokio runtime.
  pub fn spawn_background() -> std::io::Result<u32> {
    use std::process::{Command, Stdio};

    let exe = std::env::current_exe()?;
    let child = Command::new(&exe)
      .arg("daemon")
      .arg("--background")
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()?;

    let pid = child.id();
    info!("Spawned daemon process with PID {}", pid);
    Ok(pid)
  }

  /// Run until ctrl-c.
  ///
  /// Only a configuration error (unknown resource) stops it early; sync
  /// failures are retried and logged by the service.
  pub async fn run(self) -> Result<(), ConfigError> {
    let config = &self.runtime_config.config;
    info!("Starting phishguard daemon");
    info!("Data dir: {:?}", self.runtime_config.data_dir);

    // Master cancellation token - propagates to all children
    let cancel = CancellationToken::new();

    let service = PhishingService::start(config, &self.runtime_config.data_dir, cancel.child_token())?;

    let events = tokio::spawn(log_events(service.subscribe(), cancel.child_token()));
    let cleanup = tokio::spawn(cleanup_logs_daily(
      self.runtime_config.data_dir.clone(),
      config.daemon.log_retention_days,
      cancel.child_token(),
    ));

    if !service.trigger_update_if_needed() {
      warn!("Initial sync trigger was dropped");
    }

    // Handle ctrl-c gracefully
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
      if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        return;
      }
      info!("Received ctrl-c, shutting down...");
      cancel_for_signal.cancel();
    });

    cancel.cancelled().await;

    info!("Shutting down...");
    service.shutdown();
    let _ = events.await;
    let _ = cleanup.await;

    info!("Daemon shutdown complete");
    Ok(())
  }
}

/// Mirror sync outcomes into the log
async fn log_events(mut events: tokio::sync::broadcast::Receiver<SyncEvent>, cancel: CancellationToken) {
  loop {
    tokio::select! {
      biased;

      _ = cancel.cancelled() => break,

      event = events.recv() => match event {
        Ok(SyncEvent::Updated { resource, plan, entry_count }) => {
          info!(%resource, plan, entry_count, "Phishing list refreshed");
        }
        Ok(SyncEvent::UpToDate { resource }) => debug!(%resource, "Phishing list unchanged"),
        Ok(SyncEvent::Failed { resource, attempts, error }) => {
          error!(%resource, attempts, err = %error, "Phishing list refresh failed");
        }
        Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event logger lagged"),
        Err(RecvError::Closed) => break,
      },
    }
  }
}

async fn cleanup_logs_daily(data_dir: PathBuf, retention_days: u64, cancel: CancellationToken) {
  if retention_days == 0 {
    return;
  }

  let mut timer = interval(Duration::from_secs(24 * 3600));
  loop {
    tokio::select! {
      biased;

      _ = cancel.cancelled() => break,

      // The first tick fires immediately, which doubles as the startup pass
      _ = timer.tick() => {
        let deleted = cleanup_old_logs(&data_dir, retention_days);
        if deleted > 0 {
          info!("Cleaned up {} old log files", deleted);
        }
      }
    }
  }
}

/// Delete `phishguard.log*` files older than the retention period.
fn cleanup_old_logs(data_dir: &std::path::Path, retention_days: u64) -> usize {
  use std::time::SystemTime;

  let retention_secs = retention_days * 24 * 3600;
  let now = SystemTime::now();
  let mut deleted = 0;

  let entries = match std::fs::read_dir(data_dir) {
    Ok(e) => e,
    Err(e) => {
      warn!("Failed to read log directory {:?}: {}", data_dir, e);
      return 0;
    }
  };

  for entry in entries.flatten() {
    let path = entry.path();
    if path.is_dir() {
      continue;
    }

    let is_log = path
      .file_name()
      .and_then(|n| n.to_str())
      .is_some_and(|name| name.starts_with("phishguard.log"));
    if !is_log {
      continue;
    }

    let age = entry
      .metadata()
      .and_then(|m| m.modified())
      .ok()
      .and_then(|modified| now.duration_since(modified).ok());

    if age.is_some_and(|age| age.as_secs() > retention_secs) {
      if let Err(e) = std::fs::remove_file(&path) {
        warn!("Failed to delete old log file {:?}: {}", path, e);
      } else {
        debug!("Deleted old log file: {:?}", path);
        deleted += 1;
      }
    }
  }

  deleted
}
