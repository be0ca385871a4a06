//! CLI command implementations

mod check;
mod config;
mod daemon;
mod status;
mod sync;

pub use check::cmd_check;
pub use config::{cmd_config_init, cmd_config_show};
pub use daemon::cmd_daemon;
pub use status::cmd_status;
pub use sync::cmd_sync;
