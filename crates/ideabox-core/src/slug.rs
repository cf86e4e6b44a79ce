//! URL slug generation.
//!
//! Slugs are derived from titles and must be unique within a tenant.
//! Collisions are resolved with a numeric suffix: `my-idea`, `my-idea-2`,
//! `my-idea-3`, and so on.

use std::collections::HashSet;

/// Used when a title contains no ASCII alphanumerics at all.
pub const FALLBACK_SLUG: &str = "idea";

/// Lowercase the title, keep ASCII alphanumerics and collapse everything
/// else into single dashes. Non-ASCII letters are dropped without splitting
/// the word they belong to.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if !ch.is_alphanumeric() {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Pick the first candidate not present in `taken`.
pub fn disambiguate<S: AsRef<str>>(base: &str, taken: &[S]) -> String {
    let taken: HashSet<&str> = taken.iter().map(|s| s.as_ref()).collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    (2u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}
