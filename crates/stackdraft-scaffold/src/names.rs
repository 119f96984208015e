//! Name derivation for generated artifacts.
//!
//! All three derivations share one pass: keep ASCII alphanumerics,
//! collapse whitespace runs into a single separator, strip everything
//! else, trim leading/trailing separators.

pub const FALLBACK_CONSTANT: &str = "BINDING";
pub const FALLBACK_RESOURCE: &str = "binding";
pub const FALLBACK_PROJECT: &str = "scaffold-app";

/// Environment-constant name for a binding: `"My D1 Database"` →
/// `MY_D1_DATABASE`. Empty or punctuation-only labels fall back to
/// [`FALLBACK_CONSTANT`].
pub fn constant_name(label: &str) -> String {
    derive(label, '_', true).unwrap_or_else(|| FALLBACK_CONSTANT.to_string())
}

/// Provisioned-resource slug for a binding: `"My D1 Database"` →
/// `my-d1-database`.
pub fn resource_slug(label: &str) -> String {
    derive(label, '-', false).unwrap_or_else(|| FALLBACK_RESOURCE.to_string())
}

/// Project slug derived from the diagram title, with a fixed default
/// when the title yields nothing.
pub fn project_name(title: &str) -> String {
    derive(title, '-', false).unwrap_or_else(|| FALLBACK_PROJECT.to_string())
}

fn derive(raw: &str, separator: char, uppercase: bool) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push(separator);
            }
            pending_separator = false;
            out.push(if uppercase {
                ch.to_ascii_uppercase()
            } else {
                ch.to_ascii_lowercase()
            });
        } else if ch.is_whitespace() {
            pending_separator = true;
        }
        // Any other character is stripped without acting as a separator.
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
