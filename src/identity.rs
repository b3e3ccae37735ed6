//! Identity-string canonicalization.
//!
//! Historical records stored "no value" a dozen different ways and mixed
//! ids, emails, and display names in the same columns. Everything is
//! normalized through here exactly once, at the boundary, so the decision
//! code only ever compares canonical strings.

/// Values that mean "nothing here" in old records.
pub const EMPTY_SENTINELS: &[&str] =
    &["null", "none", "false", "undefined", "unassigned", "n/a"];

/// Length of a canonical hex record identifier.
pub const IDENTIFIER_LEN: usize = 24;

/// Trim, lowercase, and collapse sentinel spellings to the empty string.
pub fn normalize(value: &str) -> String {
    let trimmed = value.trim().to_lowercase();
    if EMPTY_SENTINELS.contains(&trimmed.as_str()) {
        String::new()
    } else {
        trimmed
    }
}

/// [`normalize`] over an optional value; `None` normalizes to empty.
pub fn normalize_opt(value: Option<&str>) -> String {
    value.map(normalize).unwrap_or_default()
}

/// Cheap shape test; real validation belongs to whoever issued the address.
pub fn looks_like_email(value: &str) -> bool {
    value.contains('@')
}

/// Whether the value is shaped like a canonical record id: exactly 24 hex
/// digits.
pub fn looks_like_identifier(value: &str) -> bool {
    value.len() == IDENTIFIER_LEN && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// The part of an email before the `@`, or the empty string for anything
/// that is not email-shaped.
pub fn email_local_part(email: &str) -> &str {
    match email.split_once('@') {
        Some((local, _)) => local,
        None => "",
    }
}
