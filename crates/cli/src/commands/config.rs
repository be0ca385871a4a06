//! Config commands

use anyhow::{Context, Result};
use phishguard::config::Config;

/// Show the effective configuration
pub async fn cmd_config_show() -> Result<()> {
  match Config::user_config_path() {
    Some(path) if path.exists() => println!("# Config file: {}\n", path.display()),
    Some(path) => println!("# No config file at {} (using defaults)\n", path.display()),
    None => println!("# No config directory available (using defaults)\n"),
  }

  let config = Config::load_global().await;
  let rendered = toml::to_string_pretty(&config).context("Failed to serialize config")?;
  println!("{}", rendered);
  Ok(())
}

/// Write the commented default config to the user config path
pub async fn cmd_config_init(force: bool) -> Result<()> {
  let path = Config::user_config_path().context("Could not determine config directory")?;

  if path.exists() && !force {
    eprintln!("Config already exists at {}", path.display());
    eprintln!("Use --force to overwrite");
    std::process::exit(1);
  }

  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("Failed to create {}", parent.display()))?;
  }
  tokio::fs::write(&path, Config::generate_template())
    .await
    .with_context(|| format!("Failed to write {}", path.display()))?;

  println!("Created config: {}", path.display());
  Ok(())
}
