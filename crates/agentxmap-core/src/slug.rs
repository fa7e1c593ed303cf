//! Organization name → URL slug normalization.

const SEPARATOR: char = '-';

/// Convert a human-readable name into a URL-safe slug.
///
/// ASCII letters are lower-cased, every run of other characters becomes a
/// single `-`, and separators are trimmed from both ends. The function is
/// total and idempotent; input without any ASCII alphanumerics yields an
/// empty string.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push(SEPARATOR);
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
