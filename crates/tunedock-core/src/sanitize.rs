//! Input sanitizers for caller-supplied tokens.
//!
//! Caller identities and folder names end up in filesystem paths and
//! object-store keys, so both are reduced to a conservative character set
//! before anything else sees them.

/// Identity used when the caller supplies no usable token.
pub const PUBLIC_IDENTITY: &str = "public";

const MAX_IDENTITY_LEN: usize = 64;
const MAX_FOLDER_LEN: usize = 64;
const MAX_ERROR_MESSAGE_LEN: usize = 512;

/// Resolve a raw identity hint into a caller identity.
///
/// Keeps alphanumerics, hyphen and underscore; anything else is dropped.
/// Falls back to [`PUBLIC_IDENTITY`] when nothing survives. Total function.
pub fn resolve_identity(hint: Option<&str>) -> String {
    let cleaned: String = hint
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_IDENTITY_LEN)
        .collect();

    if cleaned.is_empty() {
        PUBLIC_IDENTITY.to_string()
    } else {
        cleaned
    }
}

/// Sanitize a folder label: alphanumerics, space, hyphen, underscore.
/// Returns `None` when nothing usable remains.
pub fn sanitize_folder(input: Option<&str>) -> Option<String> {
    let cleaned: String = input
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .take(MAX_FOLDER_LEN)
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Bound an error message to the persisted column size, on a char boundary.
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        message.to_string()
    } else {
        message.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
    }
}
