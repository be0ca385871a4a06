//! phishguard CLI - local phishing-list mirror and URL checks

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::{cmd_check, cmd_config_init, cmd_config_show, cmd_daemon, cmd_status, cmd_sync};
use logging::{init_cli_logging, init_daemon_logging};
use phishguard::RuntimeConfig;

#[derive(Parser)]
#[command(name = "phishguard")]
#[command(about = "Keep a local phishing list in sync and check URLs against it")]
#[command(after_help = "\
QUICK START:
  phishguard sync                 # Download the list once
  phishguard check example.com    # Check a URL (exit 1 if phishing)
  phishguard daemon               # Keep the list fresh in the background

COMMON WORKFLOWS:
  phishguard status               # Show what the local mirror holds
  phishguard config init          # Write a commented config file")]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

/// Subcommands for `phishguard config`
#[derive(Subcommand)]
enum ConfigCommand {
  /// Show the effective configuration
  Show,
  /// Write the default config file
  Init {
    /// Overwrite an existing config file
    #[arg(long)]
    force: bool,
  },
}

#[derive(Subcommand)]
enum Commands {
  /// Start the sync daemon
  Daemon {
    /// Stay attached and log to the console
    #[arg(short, long)]
    foreground: bool,
    /// Internal: run as the detached child
    #[arg(long, hide = true)]
    background: bool,
  },
  /// Run one sync cycle and wait for it to finish
  Sync {
    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
  },
  /// Check URLs against the local list
  Check {
    /// URLs or hostnames to check
    #[arg(required = true)]
    urls: Vec<String>,
    /// Print results as JSON
    #[arg(long)]
    json: bool,
  },
  /// Show local list metadata
  Status {
    /// Print as JSON
    #[arg(long)]
    json: bool,
  },
  /// Manage configuration
  Config {
    #[command(subcommand)]
    command: ConfigCommand,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  // Config commands inspect the file as-is, without first-run creation
  if let Commands::Config { command } = cli.command {
    init_cli_logging();
    return match command {
      ConfigCommand::Show => cmd_config_show().await,
      ConfigCommand::Init { force } => cmd_config_init(force).await,
    };
  }

  let runtime_config = RuntimeConfig::load().await;

  // Daemon modes log per the daemon config; everything else logs to console
  let _guard = match &cli.command {
    Commands::Daemon { foreground, background } if *foreground || *background => {
      init_daemon_logging(*foreground, &runtime_config.config.daemon)
    }
    _ => {
      init_cli_logging();
      None
    }
  };

  match cli.command {
    Commands::Daemon { foreground, background } => cmd_daemon(runtime_config, foreground, background).await,
    Commands::Sync { json } => cmd_sync(runtime_config, json).await,
    Commands::Check { urls, json } => cmd_check(runtime_config, urls, json).await,
    Commands::Status { json } => cmd_status(runtime_config, json).await,
    Commands::Config { .. } => unreachable!("handled above"),
  }
}
