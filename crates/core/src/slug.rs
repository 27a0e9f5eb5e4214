//! URL slugs derived from display names.

/// Lowercase the name and replace each run of whitespace with a single `-`.
///
/// Punctuation is kept as-is, so `"MacBook Pro 16\""` becomes `macbook-pro-16"`.
/// Leading and trailing whitespace is dropped.
///
/// ```
/// use emporium_core::slug::slugify;
///
/// assert_eq!(slugify("iPhone 15 Pro"), "iphone-15-pro");
/// assert_eq!(slugify("  Home \t & Garden "), "home-&-garden");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases() {
        assert_eq!(slugify("Electronics"), "electronics");
    }

    #[test]
    fn test_collapses_whitespace_runs() {
        assert_eq!(slugify("Smart   Home\n Devices"), "smart-home-devices");
    }

    #[test]
    fn test_empty() {
        assert_eq!(slugify("   "), "");
    }
}
