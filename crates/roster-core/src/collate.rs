//! Locale-style string ordering used by table sorting.
//!
//! Strings compare on base letters first (accents and case ignored), then on
//! accents, then on case with lowercase ahead of uppercase. Byte order breaks
//! any remaining tie so the ordering is total.

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

fn primary_key(value: &str) -> String {
    value.nfd().filter(|ch| !is_combining_mark(*ch)).flat_map(char::to_lowercase).collect()
}

fn accent_key(value: &str) -> String {
    value.nfd().flat_map(char::to_lowercase).collect()
}

fn case_key(value: &str) -> Vec<bool> {
    value.nfd().filter(|ch| !is_combining_mark(*ch)).map(char::is_uppercase).collect()
}

#[must_use]
pub fn compare(left: &str, right: &str) -> Ordering {
    if left == right {
        return Ordering::Equal;
    }
    primary_key(left)
        .cmp(&primary_key(right))
        .then_with(|| accent_key(left).cmp(&accent_key(right)))
        .then_with(|| case_key(left).cmp(&case_key(right)))
        .then_with(|| left.cmp(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut values: Vec<&str>) -> Vec<&str> {
        values.sort_by(|a, b| compare(a, b));
        values
    }

    #[test]
    fn case_is_secondary_to_letters() {
        assert_eq!(
            sorted(vec!["beta", "Alpha", "alpha", "Beta"]),
            vec!["alpha", "Alpha", "beta", "Beta"]
        );
    }

    #[test]
    fn accents_sort_with_their_base_letter() {
        assert_eq!(
            sorted(vec!["Québec", "Quebec", "Ottawa", "Rimouski"]),
            vec!["Ottawa", "Quebec", "Québec", "Rimouski"]
        );
        assert_eq!(compare("Édouard", "Eve"), Ordering::Less);
    }

    #[test]
    fn empty_string_sorts_first() {
        assert_eq!(compare("", "0"), Ordering::Less);
        assert_eq!(compare("", ""), Ordering::Equal);
    }
}
