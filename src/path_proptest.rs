//! Property-based tests for path and repository URL helpers.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{clean, is_within, parse_repository_url, relative_to};
    use proptest::prelude::*;
    use std::path::Path;

    // ============================================================================
    // parse_repository_url property tests
    // ============================================================================

    proptest! {
        /// Property: owner and name are non-empty and never end in `.git`
        #[test]
        fn parsed_url_has_owner_and_name(
            host in "[a-z]{1,10}\\.(com|org|io)",
            owner in "[a-zA-Z0-9][a-zA-Z0-9-]{0,15}",
            repo in "[a-zA-Z0-9][a-zA-Z0-9_-]{0,15}",
            suffix in prop::bool::ANY,
        ) {
            let url = format!(
                "https://{}/{}/{}{}",
                host,
                owner,
                repo,
                if suffix { ".git" } else { "" }
            );
            let parsed = parse_repository_url(&url).unwrap();
            prop_assert!(!parsed.owner.is_empty());
            prop_assert!(!parsed.name.is_empty());
            prop_assert!(!parsed.name.ends_with(".git"));
            prop_assert_eq!(parsed.owner, owner);
            prop_assert_eq!(parsed.name, repo);
        }

        /// Property: a URL with a single path segment is always rejected
        #[test]
        fn single_segment_url_is_rejected(owner in "[a-zA-Z0-9-]{1,15}") {
            let url = format!("https://github.com/{}", owner);
            prop_assert!(parse_repository_url(&url).is_err());
        }
    }

    // ============================================================================
    // is_within property tests
    // ============================================================================

    proptest! {
        /// Property: any file below a directory is within it
        #[test]
        fn files_below_prefix_are_within(
            prefix in "[a-z]{1,8}(/[a-z]{1,8}){0,3}",
            rest in "[a-z]{1,8}(/[a-z]{1,8}){0,3}\\.ts",
        ) {
            let file = format!("{}/{}", prefix, rest);
            prop_assert!(is_within(&prefix, &file));
        }

        /// Property: a sibling sharing a name prefix is never within
        #[test]
        fn sibling_with_shared_prefix_is_not_within(
            prefix in "[a-z]{1,8}/[a-z]{1,8}",
            extra in "[a-z0-9]{1,5}",
            file in "[a-z]{1,8}\\.ts",
        ) {
            let sibling = format!("{}{}/{}", prefix, extra, file);
            prop_assert!(!is_within(&prefix, &sibling));
        }
    }

    // ============================================================================
    // clean / relative_to property tests
    // ============================================================================

    proptest! {
        /// Property: clean is idempotent
        #[test]
        fn clean_is_idempotent(input in "(/)?([a-z]{1,5}|\\.|\\.\\.)(/([a-z]{1,5}|\\.|\\.\\.)){0,6}") {
            let once = clean(Path::new(&input));
            let twice = clean(&once);
            prop_assert_eq!(once, twice);
        }

        /// Property: relative_to inverts join for normal components
        #[test]
        fn relative_to_inverts_join(rel in "[a-z]{1,8}(/[a-z]{1,8}){0,4}") {
            let base = Path::new("/repo");
            let joined = base.join(&rel);
            prop_assert_eq!(relative_to(base, &joined), Some(rel));
        }
    }
}
