use std::path::PathBuf;

use lancedb::{Connection, connect};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  db::schema::entries_schema,
  domain::resource::ResourceType,
  fetch::FetchError,
};

#[derive(Error, Debug)]
pub enum DbError {
  #[error("LanceDB error: {0}")]
  Lance(#[from] lancedb::Error),
  #[error("Arrow error: {0}")]
  Arrow(#[from] arrow::error::ArrowError),
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("Source stream failed: {0}")]
  Source(#[from] FetchError),
  #[error("Invalid input: {0}")]
  InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Resource types that get an entries table on open
const RESOURCE_TYPES: [ResourceType; 2] = [ResourceType::Domains, ResourceType::Links];

/// Database connection holding the phishing entry tables
pub struct PhishingDb {
  pub path: PathBuf,
  pub connection: Connection,
}

impl PhishingDb {
  /// Open or create the database at `db_path`
  pub async fn open_at_path(db_path: PathBuf) -> Result<Self> {
    // Ensure directory exists
    if let Some(parent) = db_path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }

    info!(path = %db_path.display(), "Opening database connection");
    let connection = match connect(db_path.to_string_lossy().as_ref()).execute().await {
      Ok(conn) => {
        debug!(path = %db_path.display(), "Database connection established");
        conn
      }
      Err(e) => {
        error!(path = %db_path.display(), err = %e, "Failed to connect to database");
        return Err(e.into());
      }
    };

    let db = Self {
      path: db_path,
      connection,
    };

    debug!("Initializing database schema");
    db.ensure_tables().await?;

    Ok(db)
  }

  /// Ensure every resource type has an entries table
  async fn ensure_tables(&self) -> Result<()> {
    let table_names = self.connection.table_names().execute().await?;
    debug!(existing_tables = table_names.len(), "Checking required tables");

    for resource_type in RESOURCE_TYPES {
      let name = resource_type.table_name();
      if !table_names.contains(&name) {
        debug!(table = %name, "Creating entries table");
        self
          .connection
          .create_empty_table(name.as_str(), entries_schema())
          .execute()
          .await?;
      }
    }

    Ok(())
  }

  /// Get the entries table for a resource type
  pub async fn entries_table(&self, resource_type: ResourceType) -> Result<lancedb::Table> {
    Ok(
      self
        .connection
        .open_table(resource_type.table_name())
        .execute()
        .await?,
    )
  }
}
