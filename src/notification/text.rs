//! Sanitizing of user-configurable notification text.

/// Maximum length for notification titles and bodies.
const MAX_TEXT_LENGTH: usize = 100;

/// Truncates text and strips control characters.
///
/// Returns `None` if nothing printable is left.
pub fn sanitize_text(text: &str) -> Option<String> {
    let truncated: String = text.chars().take(MAX_TEXT_LENGTH).collect();
    let sanitized: String = truncated.chars().filter(|c| !c.is_control()).collect();

    if sanitized.trim().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Sanitizes `text`, falling back to `default` if nothing is left.
pub fn sanitize_or(text: &str, default: &str) -> String {
    sanitize_text(text).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_valid() {
        assert_eq!(sanitize_text("時間です"), Some("時間です".to_string()));
    }

    #[test]
    fn test_sanitize_truncates_long() {
        let long_text = "a".repeat(150);
        assert_eq!(sanitize_text(&long_text).unwrap().len(), MAX_TEXT_LENGTH);
    }

    #[test]
    fn test_sanitize_removes_control_chars() {
        assert_eq!(sanitize_text("time\n\r\tup"), Some("timeup".to_string()));
    }

    #[test]
    fn test_sanitize_empty() {
        assert!(sanitize_text("").is_none());
        assert!(sanitize_text("\n\t").is_none());
        assert!(sanitize_text("   ").is_none());
    }

    #[test]
    fn test_sanitize_or_default() {
        assert_eq!(sanitize_or("\n", "fallback"), "fallback");
    }
}
