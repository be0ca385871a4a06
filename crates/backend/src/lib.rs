mod actor;
mod daemon;
mod db;
mod fetch;
mod service;
mod sync;

mod domain;
pub use domain::{config, metadata, resource};

pub mod dirs;

pub use actor::message::{SyncEvent, SyncState};
pub use daemon::{Daemon, RuntimeConfig};
pub use db::DbError;
pub use fetch::FetchError;
pub use service::{APP_VERSION, PhishingService};
