//! Input validation helpers
//!
//! Centralized text length constants and validation functions. Lengths are
//! counted in characters, not bytes.

// ── Text length limits ──────────────────────────────────────────────

/// Dish names, staff names
pub const MAX_NAME_LEN: usize = 200;

/// Status notes, order notes, rating feedback
pub const MAX_NOTE_LEN: usize = 500;

/// Cancellation reason, special instructions
pub const MAX_SHORT_NOTE_LEN: usize = 200;

/// Notification title
pub const MAX_TITLE_LEN: usize = 100;

/// Notification message body
pub const MAX_MESSAGE_LEN: usize = 500;

/// Payment proof reference (URL / image path)
pub const MAX_URL_LEN: usize = 2048;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    check_len(value, field, max_len)
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: Option<&str>,
    field: &str,
    max_len: usize,
) -> Result<(), String> {
    match value {
        Some(v) => check_len(v, field, max_len),
        None => Ok(()),
    }
}

fn check_len(value: &str, field: &str, max_len: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len > max_len {
        return Err(format!("{field} is too long ({len} chars, max {max_len})"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("Paneer Tikka", "name", MAX_NAME_LEN).is_ok());
        assert!(validate_required_text("   ", "name", MAX_NAME_LEN).is_err());
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        let err = validate_required_text(&long, "title", MAX_TITLE_LEN).unwrap_err();
        assert!(err.contains("title is too long"));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // 100 multi-byte chars fit a 100 char limit
        let rupees = "₹".repeat(MAX_TITLE_LEN);
        assert!(validate_required_text(&rupees, "title", MAX_TITLE_LEN).is_ok());
    }

    #[test]
    fn test_optional_text() {
        assert!(validate_optional_text(None, "notes", MAX_NOTE_LEN).is_ok());
        let long = "n".repeat(MAX_NOTE_LEN + 1);
        assert!(validate_optional_text(Some(&long), "notes", MAX_NOTE_LEN).is_err());
    }
}
