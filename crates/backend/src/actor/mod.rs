//! Actor-based sync orchestration
//!
//! Instead of guarding the store with shared locks, one long-lived task per
//! resource owns the update cycle and everything else talks to it through
//! channels.
//!
//! # Actors
//!
//! - [`SyncActor`]: consumes triggers, plans and applies list updates, retries
//!   failed cycles
//! - [`PeriodicTrigger`]: process-wide timer feeding `Tick` triggers
//!
//! Hosts hold a [`SyncHandle`]: `trigger_update_if_needed()` is
//! fire-and-forget, state is observable through a `watch` channel and cycle
//! outcomes through a `broadcast` channel.

pub mod handle;
pub mod message;
mod scheduler;
mod sync;

#[cfg(test)]
pub(crate) mod __tests__;

pub use handle::{SendError, SyncHandle};
pub use scheduler::PeriodicTrigger;
pub use sync::{SyncActor, SyncContext};
