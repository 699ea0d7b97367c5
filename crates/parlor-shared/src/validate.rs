//! Input validation for the auth flows.
//!
//! The UI surfaces these as user-facing form errors; the server re-checks
//! them before touching the account directory.

/// Minimal email shape check: one `@`, a non-empty local part, and a dotted
/// domain.  Commas are rejected because the credentials file is
/// comma-delimited.
pub fn is_valid_email(raw: &str) -> bool {
    if raw.contains(',') || raw.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = raw.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return false,
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Password policy: at least 8 characters with at least one letter and one
/// digit.
pub fn is_valid_password(raw: &str) -> bool {
    raw.chars().count() >= 8
        && raw.chars().any(|c| c.is_alphabetic())
        && raw.chars().any(|c| c.is_ascii_digit())
}
