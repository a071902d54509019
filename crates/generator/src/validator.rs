//! Candidate SQL screening.

use regex::Regex;
use std::sync::LazyLock;

/// Reason attached to a rejected candidate.
pub const MODIFIER_REASON: &str = "Query contains modifier statements";

static MODIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:create|update|delete)\b").expect("modifier pattern is valid")
});

/// Outcome of screening one candidate query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validation {
    pub accepted: bool,
    /// Empty when accepted.
    pub reason: String,
}

impl Validation {
    fn accept() -> Self {
        Self {
            accepted: true,
            reason: String::new(),
        }
    }

    fn reject(reason: &str) -> Self {
        Self {
            accepted: false,
            reason: reason.to_string(),
        }
    }
}

/// Reject candidates containing the whole words `create`, `update` or
/// `delete` in any case. This is a keyword screen, not a SQL parser:
/// identifiers such as `updated_at` pass, and so does anything else.
pub fn validate(candidate: &str) -> Validation {
    if MODIFIER_PATTERN.is_match(candidate) {
        Validation::reject(MODIFIER_REASON)
    } else {
        Validation::accept()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_modifiers() {
        for candidate in [
            "DELETE FROM setting",
            "UPDATE setting SET x=1",
            "CREATE TABLE t(x int)",
            "select 1; delete from setting",
        ] {
            let validation = validate(candidate);
            assert!(!validation.accepted, "{candidate} should be rejected");
            assert_eq!(validation.reason, MODIFIER_REASON);
        }
    }

    #[test]
    fn test_accepts_word_fragments() {
        let validation = validate("SELECT * FROM setting WHERE updated_at > now()");
        assert_eq!(validation, Validation::accept());
        assert!(validate("SELECT created, deleted_flag FROM audit").accepted);
    }

    #[test]
    fn test_accepts_non_modifier_statements() {
        // Only the three keywords are screened.
        assert!(validate("DROP TABLE setting").accepted);
        assert!(validate("").accepted);
    }
}
