//! Cache key derivation for (question, tables) pairs.
//!
//! The fingerprint is the SHA-256 digest of
//! `trim(question) + " Tables: " + join(trimmed_tables, ",")`, UTF-8 encoded
//! and rendered as lowercase hex. The exact input bytes are part of the
//! contract: keys written by one process must be found by any other.
//!
//! Table order is significant. `["a", "b"]` and `["b", "a"]` produce
//! different fingerprints, so the same question asked with a reordered table
//! list is a separate cache entry.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Separator between the question and the table list in the hashed input.
const TABLES_SEPARATOR: &str = " Tables: ";

/// A SHA-256 fingerprint of a normalized request.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Derive the fingerprint of a question asked against an ordered table list.
    ///
    /// Both the question and every table name are trimmed. Fails with
    /// `InvalidRequest` when `tables` is empty.
    pub fn derive<S: AsRef<str>>(question: &str, tables: &[S]) -> crate::Result<Self> {
        if tables.is_empty() {
            return Err(crate::Error::InvalidRequest(
                "at least one table is required".to_string(),
            ));
        }
        Ok(Self::compute(canonical_input(question, tables).as_bytes()))
    }

    /// Hash raw input bytes.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Encode as lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Build the exact string that gets hashed.
pub fn canonical_input<S: AsRef<str>>(question: &str, tables: &[S]) -> String {
    let tables: Vec<&str> = tables.iter().map(|t| t.as_ref().trim()).collect();
    format!("{}{}{}", question.trim(), TABLES_SEPARATOR, tables.join(","))
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
