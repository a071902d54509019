//! Incoming request normalization.

use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

/// A normalized request for a SQL query.
///
/// The question and every table name are trimmed on construction. Table order
/// is preserved exactly as supplied and duplicates are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlRequest {
    /// The natural-language question.
    pub question: String,
    /// Tables the query may reference, in caller order.
    pub tables: Vec<String>,
    /// Whether the resolved query should also be executed.
    pub request_data: bool,
}

impl SqlRequest {
    /// Build a request, trimming the question and each table name.
    pub fn new<S: AsRef<str>>(question: &str, tables: &[S], request_data: bool) -> Self {
        Self {
            question: question.trim().to_string(),
            tables: tables.iter().map(|t| t.as_ref().trim().to_string()).collect(),
            request_data,
        }
    }

    /// Check the caller contract: at least one table must be named.
    pub fn validate(&self) -> crate::Result<()> {
        if self.tables.is_empty() {
            return Err(crate::Error::InvalidRequest(
                "at least one table is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Derive the cache key for this request.
    pub fn fingerprint(&self) -> crate::Result<Fingerprint> {
        Fingerprint::derive(&self.question, &self.tables)
    }
}
