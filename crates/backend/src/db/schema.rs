use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

/// Schema for a resource's entries table.
///
/// One row per entry; the entry string is both key and value.
pub fn entries_schema() -> Arc<Schema> {
  Arc::new(Schema::new(vec![Field::new("entry", DataType::Utf8, false)]))
}
