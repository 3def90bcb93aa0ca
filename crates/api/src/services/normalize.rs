//! Trimming and presence checks for free-text customer fields.

/// Longest accepted free-text field.
const MAX_FIELD_LENGTH: usize = 255;

/// Trim a required field, rejecting empty or oversized values.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    if trimmed.chars().count() > MAX_FIELD_LENGTH {
        return Err(format!("{field} must be at most {MAX_FIELD_LENGTH} characters"));
    }
    Ok(trimmed.to_owned())
}

/// Trim an optional field; blank becomes `None`.
pub(crate) fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("name", "  Alice  ").unwrap(), "Alice");
        assert_eq!(required_text("name", "   ").unwrap_err(), "name is required");
        assert!(required_text("name", &"a".repeat(MAX_FIELD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("address", None), Ok(None));
        assert_eq!(optional_text("address", Some("  ")), Ok(None));
        assert_eq!(
            optional_text("address", Some(" 1 Main St ")),
            Ok(Some("1 Main St".to_owned()))
        );
        assert!(optional_text("address", Some(&"a".repeat(MAX_FIELD_LENGTH + 1))).is_err());
    }
}
