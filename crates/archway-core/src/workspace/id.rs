//! Workspace identifiers.

/// Numeric workspace identifier, unique per tenant.
pub type WorkspaceId = u64;

/// Extracts the leading run of ASCII digits from a directory name.
///
/// Returns `0` when the name has no leading digits (or the digits overflow),
/// which callers treat as "not a workspace directory".
///
/// ```
/// use archway_core::workspace::parse_workspace_id;
///
/// assert_eq!(parse_workspace_id("005-billing-system"), 5);
/// assert_eq!(parse_workspace_id("abc"), 0);
/// ```
pub fn parse_workspace_id(name: &str) -> WorkspaceId {
    let digits: &str = match name.find(|c: char| !c.is_ascii_digit()) {
        Some(end) => &name[..end],
        None => name,
    };

    digits.parse().unwrap_or(0)
}

/// Returns true when the name consists only of ASCII digits.
pub fn is_numeric_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workspace_id() {
        assert_eq!(parse_workspace_id("abc"), 0);
        assert_eq!(parse_workspace_id("0"), 0);
        assert_eq!(parse_workspace_id("0-system"), 0);
        assert_eq!(parse_workspace_id("001"), 1);
        assert_eq!(parse_workspace_id("001-system"), 1);
        assert_eq!(parse_workspace_id("42"), 42);
        assert_eq!(parse_workspace_id(""), 0);
    }

    #[test]
    fn test_parse_workspace_id_overflow_is_sentinel() {
        assert_eq!(parse_workspace_id("99999999999999999999999"), 0);
    }

    #[test]
    fn test_is_numeric_name() {
        assert!(is_numeric_name("123"));
        assert!(!is_numeric_name("123-abc"));
        assert!(!is_numeric_name(""));
    }
}
