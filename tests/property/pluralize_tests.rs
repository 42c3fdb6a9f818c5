//! Property-based tests for pluralization

use proptest::prelude::*;
use schema_mock::routes::{apply_suffix_rules, collection_path, irregular_plural, pluralize};

proptest! {
    /// Consonant + y becomes ies
    #[test]
    fn test_consonant_y(stem in "[a-z]{0,6}", consonant in "[b-df-hj-np-tv-xz]") {
        let word = format!("{}{}y", stem, consonant);
        let plural = apply_suffix_rules(&word);
        prop_assert_eq!(plural, format!("{}{}ies", stem, consonant));
    }

    /// Sibilant endings take es
    #[test]
    fn test_sibilant_endings(stem in "[a-z]{1,6}", ending in prop::sample::select(vec!["s", "x", "z", "ch", "sh"])) {
        let word = format!("{}{}", stem, ending);
        prop_assert_eq!(apply_suffix_rules(&word), format!("{}es", word));
    }

    /// Suffix rules only ever lengthen a word
    #[test]
    fn test_suffix_rules_lengthen(word in "[a-z]{1,12}") {
        let plural = apply_suffix_rules(&word);
        prop_assert!(plural.len() > word.len());
        let keep = word.len().saturating_sub(2);
        prop_assert!(plural.starts_with(&word[..keep]));
    }

    /// Capitalisation of the first letter survives
    #[test]
    fn test_case_preserved(word in "[A-Z][a-z]{1,10}") {
        let plural = pluralize(&word);
        prop_assert!(plural.chars().next().unwrap().is_uppercase());
    }

    /// Collection paths are lowercase and live under the base path
    #[test]
    fn test_collection_path_shape(noun in "[A-Z][a-z]{2,8}([A-Z][a-z]{2,8})?") {
        let path = collection_path("/api", &noun);
        prop_assert!(path.starts_with("/api/"));
        prop_assert_eq!(path.to_lowercase(), path.clone());
        prop_assert!(!path.ends_with('/'));
    }
}

#[test]
fn test_irregular_table_before_rules() {
    assert_eq!(irregular_plural("person").as_deref(), Some("people"));
    assert_eq!(pluralize("Person"), "People");
    assert_eq!(apply_suffix_rules("person"), "persons");
    assert_eq!(pluralize("category"), "categories");
    assert!(irregular_plural("category").is_none());
}
