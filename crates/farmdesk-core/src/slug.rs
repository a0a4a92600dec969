//! URL-safe slug generation.

/// Convert arbitrary text into a slug.
///
/// Output contains only lowercase ASCII letters and digits, with every
/// run of other characters collapsed into a single `-` and no leading
/// or trailing `-`. Applying it twice yields the same result.
pub fn to_slug(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Whether `s` is already in slug form.
pub fn is_slug(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('-')
        && !s.ends_with('-')
        && !s.contains("--")
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(to_slug("Green Valley Co-op"), "green-valley-co-op");
        assert_eq!(to_slug("  Kisumu   North  "), "kisumu-north");
        assert_eq!(to_slug("Zone #4 / Maize"), "zone-4-maize");
    }

    #[test]
    fn non_ascii_letters_become_separators() {
        assert_eq!(to_slug("Café Olé"), "caf-ol");
        assert_eq!(to_slug("日本"), "");
    }

    #[test]
    fn empty_and_symbol_only_input() {
        assert_eq!(to_slug(""), "");
        assert_eq!(to_slug("---"), "");
        assert!(!is_slug(""));
    }

    proptest! {
        #[test]
        fn slug_is_idempotent(input in ".*") {
            let once = to_slug(&input);
            prop_assert_eq!(to_slug(&once), once);
        }

        #[test]
        fn slug_shape(input in ".*") {
            let slug = to_slug(&input);
            prop_assert!(slug.is_empty() || is_slug(&slug), "bad slug: {:?}", slug);
        }
    }
}
