//! Centralized validation and helper functions.

/// Security-related constants for input validation
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Largest release metadata document accepted from an update endpoint
pub const MAX_METADATA_BYTES: usize = 4 * 1024 * 1024;

/// Hex length of an MD5 digest
pub const MD5_HEX_LEN: usize = 32;

/// Hex length of a SHA-256 digest
pub const SHA256_HEX_LEN: usize = 64;

/// Validation error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Filename too long: exceeds {MAX_FILENAME_LENGTH} characters")]
    FilenameTooLong,
    #[error("Invalid filename: contains path traversal or invalid characters")]
    InvalidFilename,
    #[error("Empty filename provided")]
    EmptyFilename,
}

/// Trim user-entered text the way the entry forms always have.
#[must_use]
pub fn normalize_field(value: &str) -> String {
    value.trim().to_string()
}

/// Require a non-blank value for a named field.
///
/// # Errors
///
/// Returns `ValidationError::MissingField` naming `field` if `value` is
/// empty or whitespace only.
pub fn require_field(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Validate that a string is a hex digest of the given length.
///
/// # Examples
///
/// ```
/// use tool_shelf::utils::validation::{is_valid_hex_digest, MD5_HEX_LEN};
///
/// assert!(is_valid_hex_digest("6aef897c3d6ff0c78aff06ac189178dd", MD5_HEX_LEN));
/// assert!(!is_valid_hex_digest("not-a-digest", MD5_HEX_LEN));
/// assert!(!is_valid_hex_digest("6aef897c3d6ff0c78aff06ac189178d", MD5_HEX_LEN)); // 31 chars
/// ```
#[must_use]
pub fn is_valid_hex_digest(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Secure filename validation to prevent directory traversal.
///
/// Release asset names come from a remote document and end up as file
/// names on disk, so they are checked before use:
/// - Checking length limits
/// - Preventing directory traversal (../, ..\\)
/// - Removing potentially dangerous characters
/// - Ensuring filename is not empty after sanitization
///
/// # Errors
///
/// Returns `ValidationError::EmptyFilename` if the filename is empty,
/// `ValidationError::FilenameTooLong` if it exceeds the limit, or
/// `ValidationError::InvalidFilename` if it contains invalid characters.
pub fn validate_filename(filename: &str) -> Result<String, ValidationError> {
    if filename.trim().is_empty() {
        return Err(ValidationError::EmptyFilename);
    }

    if filename.len() > MAX_FILENAME_LENGTH {
        return Err(ValidationError::FilenameTooLong);
    }

    // Prevent directory traversal attacks
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(ValidationError::InvalidFilename);
    }

    // Check for null bytes and other control characters
    if filename.contains('\0') || filename.chars().any(|c| ('\x01'..='\x1F').contains(&c)) {
        return Err(ValidationError::InvalidFilename);
    }

    // Keep only characters that are safe on every supported platform
    let sanitized = filename
        .chars()
        .filter(|c| {
            c.is_ascii_alphanumeric() || *c == '.' || *c == '-' || *c == '_' || *c == ' ' || *c == '+'
        })
        .collect::<String>();

    if sanitized.trim().is_empty() {
        return Err(ValidationError::InvalidFilename);
    }

    // No hidden files
    if sanitized.starts_with('.') {
        return Err(ValidationError::InvalidFilename);
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_field() {
        assert!(require_field("name", "ChatGPT").is_ok());
        assert_eq!(
            require_field("name", ""),
            Err(ValidationError::MissingField("name"))
        );
        assert_eq!(
            require_field("url", "   \t"),
            Err(ValidationError::MissingField("url"))
        );
    }

    #[test]
    fn test_missing_field_message_names_field() {
        let err = ValidationError::MissingField("url");
        assert_eq!(err.to_string(), "Missing required field: url");
    }

    #[test]
    fn test_normalize_field() {
        assert_eq!(normalize_field("  Notes \n"), "Notes");
        assert_eq!(normalize_field(""), "");
    }

    #[test]
    fn test_is_valid_hex_digest() {
        assert!(is_valid_hex_digest(&"ab".repeat(32), SHA256_HEX_LEN));
        assert!(is_valid_hex_digest("AABBCCDD11223344556677889900AABB", MD5_HEX_LEN));
        assert!(!is_valid_hex_digest("", MD5_HEX_LEN));
        assert!(!is_valid_hex_digest("6aef897c3d6ff0c78aff06ac189178dg", MD5_HEX_LEN));
        assert!(!is_valid_hex_digest(&"ab".repeat(32), MD5_HEX_LEN));
    }

    #[test]
    fn test_validate_filename_safe() {
        assert!(validate_filename("tool-shelf-1.2.0-linux.tar.gz").is_ok());
        assert!(validate_filename("ToolShelf Setup.exe").is_ok());
        assert!(validate_filename("app_mac.zip").is_ok());
    }

    #[test]
    fn test_validate_filename_dangerous() {
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("..\\windows\\system32").is_err());
        assert!(validate_filename("bin/tool").is_err());
        assert!(validate_filename("test\0.zip").is_err());
        assert!(validate_filename("test\x01.zip").is_err());
        assert!(validate_filename(&"a".repeat(300)).is_err());
        assert_eq!(validate_filename("   "), Err(ValidationError::EmptyFilename));
        assert!(validate_filename(".hidden").is_err());
    }

    #[test]
    fn test_validate_filename_sanitization() {
        assert_eq!(validate_filename("app@#$%v2.zip").unwrap(), "appv2.zip");
        assert_eq!(validate_filename("app-1.0_x64.msi").unwrap(), "app-1.0_x64.msi");
    }
}
