mod connection;
mod entries;
mod schema;
mod state;
mod store;

pub use connection::{DbError, Result};
pub use state::{JsonStateStore, MetadataStore};
pub use store::{EntryPredicate, EntryStore, LanceEntryStore};
