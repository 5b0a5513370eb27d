//! Slug generation
//!
//! Shared helper for deriving URL-friendly slugs from titles and names.
//! Handles Unicode input by keeping non-ASCII characters intact, so
//! titles in any script produce usable slugs.

/// Generate a URL-friendly slug from arbitrary text
///
/// Converts the text to lowercase, replaces spaces and ASCII punctuation
/// with hyphens, collapses consecutive hyphens, and trims hyphens from
/// both ends. Non-ASCII characters are preserved.
pub fn generate_slug(text: &str) -> String {
    let slug: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else if c == ' ' || c == '_' || c == '-' {
                '-'
            } else if !c.is_ascii() {
                // Keep non-ASCII characters (CJK, accented letters, ...)
                c
            } else {
                // Replace other ASCII punctuation with a hyphen
                '-'
            }
        })
        .collect();

    // Collapse consecutive hyphens and trim from the ends
    let mut result = String::new();
    let mut prev_hyphen = false;

    for c in slug.chars() {
        if c == '-' {
            if !prev_hyphen && !result.is_empty() {
                result.push(c);
                prev_hyphen = true;
            }
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
    }

    #[test]
    fn test_punctuation_stripped() {
        let slug = generate_slug("Hello, World!");
        assert!(!slug.contains(','));
        assert!(!slug.contains('!'));
        assert_eq!(slug, "hello-world");
    }

    #[test]
    fn test_uppercase() {
        assert_eq!(generate_slug("UPPERCASE"), "uppercase");
    }

    #[test]
    fn test_consecutive_separators_collapse() {
        assert_eq!(generate_slug("a  --  b"), "a-b");
    }

    #[test]
    fn test_leading_trailing_trimmed() {
        assert_eq!(generate_slug("  hello  "), "hello");
        assert_eq!(generate_slug("!!hello!!"), "hello");
    }

    #[test]
    fn test_unicode_preserved() {
        assert_eq!(generate_slug("日本語 タイトル"), "日本語-タイトル");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(generate_slug(""), "");
        assert_eq!(generate_slug("!!!"), "");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Slugs never start or end with a hyphen and never contain runs
        /// of hyphens.
        #[test]
        fn slug_shape(text in ".{0,80}") {
            let slug = generate_slug(&text);
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        /// Slug generation is idempotent.
        #[test]
        fn slug_idempotent(text in ".{0,80}") {
            let once = generate_slug(&text);
            let twice = generate_slug(&once);
            prop_assert_eq!(once, twice);
        }

        /// ASCII slugs contain only lowercase alphanumerics and hyphens.
        #[test]
        fn ascii_slugs_are_clean(text in "[ -~]{0,80}") {
            let slug = generate_slug(&text);
            for c in slug.chars() {
                prop_assert!(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
            }
        }
    }
}
