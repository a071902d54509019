//! Schema aggregation for a request's table list.

use crate::error::{DatabaseError, DatabaseResult};
use crate::store::RelationalStore;
use std::sync::Arc;

/// Separator placed between per-table fragments in a schema blob.
pub const FRAGMENT_SEPARATOR: &str = "\n";

/// Collects CREATE TABLE fragments for an ordered table list.
#[derive(Clone)]
pub struct SchemaAggregator {
    store: Arc<dyn RelationalStore>,
}

impl SchemaAggregator {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    /// Fetch one fragment per table, in order, and join them.
    ///
    /// Fails with `SchemaNotFound` for the first missing table and with
    /// `SchemaFetch` for any other lookup failure. No partial blob is ever
    /// returned.
    pub async fn aggregate<S: AsRef<str>>(&self, tables: &[S]) -> DatabaseResult<String> {
        let mut fragments = Vec::with_capacity(tables.len());
        for table in tables {
            let table = table.as_ref();
            match self.store.fetch_schema(table).await {
                Ok(Some(fragment)) => {
                    tracing::debug!(table = %table, bytes = fragment.len(), "Fetched schema fragment");
                    fragments.push(fragment);
                }
                Ok(None) => return Err(DatabaseError::SchemaNotFound(table.to_string())),
                Err(err @ DatabaseError::SchemaNotFound(_)) => return Err(err),
                Err(err) => {
                    return Err(DatabaseError::SchemaFetch {
                        table: table.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(fragments.join(FRAGMENT_SEPARATOR))
    }
}
