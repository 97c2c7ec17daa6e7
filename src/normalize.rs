// normalize.rs
//! Text normalization and canonical keys for free-text organization and event names.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));
static NON_ALNUM_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("non-alphanumeric pattern compiles"));

/// Trims and collapses internal whitespace runs to a single space.
pub fn normalize(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Canonical identity key: normalized, lowercased, punctuation runs folded to one space.
///
/// An empty key means "no entity" and callers must skip it.
pub fn canonical_key(text: &str) -> String {
    let lowered = normalize(text).to_lowercase();
    NON_ALNUM_RUN.replace_all(&lowered, " ").trim().to_string()
}

/// Node identifier fragment: the canonical key with underscores for spaces.
pub fn slug(text: &str) -> String {
    let key = canonical_key(text).replace(' ', "_");
    if key.is_empty() {
        "unknown".to_string()
    } else {
        key
    }
}

/// Display label. All-caps survey input is title-cased, anything with
/// lowercase letters in it is kept as typed.
pub fn pretty_label(text: &str) -> String {
    let normalized = normalize(text);
    if is_all_caps(&normalized) {
        title_case(&normalized.to_lowercase())
    } else {
        normalized
    }
}

fn is_all_caps(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;
    for c in text.chars() {
        let cased = c.is_uppercase() || c.is_lowercase();
        if cased && !previous_cased {
            out.extend(c.to_uppercase());
        } else if cased {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        previous_cased = cased;
    }
    out
}

/// First value that is non-empty after normalization, in iteration order.
pub fn first_non_empty<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| normalize(v.as_ref()))
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

/// Most frequent non-empty normalized value. On a tie the value seen first wins.
pub fn most_common_non_empty<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    // value -> (count, first position)
    let mut tally: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        let value = normalize(value.as_ref());
        if value.is_empty() {
            continue;
        }
        tally.entry(value).or_insert((0, position)).0 += 1;
    }

    tally
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, _)| value)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  Acme \t  Health\nGroup "), "Acme Health Group");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn canonical_key_strips_case_and_punctuation() {
        assert_eq!(canonical_key("Acme, Inc."), "acme inc");
        assert_eq!(canonical_key("ACME INC"), "acme inc");
        assert_eq!(canonical_key("  acme   inc "), "acme inc");
        assert_eq!(canonical_key("--!!--"), "");
    }

    #[test]
    fn most_common_handles_many_distinct_values() {
        let mut values: Vec<String> = (0..20_000).map(|i| format!("value {i}")).collect();
        values.push("value 19999".to_string());
        values.push("value 7".to_string());
        // two-way tie at 2 votes, "value 7" appeared first
        assert_eq!(most_common_non_empty(&values), "value 7");
    }

    #[test]
    fn canonical_key_is_idempotent() {
        let samples = [
            "Acme, Inc.",
            "  O'Neil & Sons -- Ltd ",
            "Café Münster",
            "2024 Summit (Spring)",
            "",
            "___",
        ];
        for sample in samples {
            let once = canonical_key(sample);
            assert_eq!(canonical_key(&once), once, "input: {sample:?}");
        }
    }

    #[test]
    fn slug_uses_underscores_and_unknown_fallback() {
        assert_eq!(slug("Acme, Inc."), "acme_inc");
        assert_eq!(slug("..."), "unknown");
        assert_eq!(slug(""), "unknown");
    }

    #[test]
    fn pretty_label_title_cases_only_all_caps() {
        assert_eq!(pretty_label("ACME HEALTH INC."), "Acme Health Inc.");
        assert_eq!(pretty_label("3M CO"), "3M Co");
        assert_eq!(pretty_label("eBay Foundation"), "eBay Foundation");
        assert_eq!(pretty_label("  iHeart  Media "), "iHeart Media");
        assert_eq!(pretty_label("2024"), "2024");
    }

    #[test]
    fn first_non_empty_skips_blanks() {
        assert_eq!(first_non_empty(["", "  ", " Seattle ", "Tacoma"]), "Seattle");
        assert_eq!(first_non_empty(Vec::<String>::new()), "");
    }

    #[test]
    fn most_common_excludes_empty_values() {
        assert_eq!(most_common_non_empty(["", "Health", "Health"]), "Health");
        assert_eq!(most_common_non_empty(["", " "]), "");
    }

    #[test]
    fn most_common_tie_goes_to_first_seen() {
        assert_eq!(most_common_non_empty(["Education", "Health"]), "Education");
        assert_eq!(
            most_common_non_empty(["Health", "Education", "Education", "Health"]),
            "Health"
        );
    }

    proptest! {
        #[test]
        fn canonical_key_is_idempotent_for_any_text(text in any::<String>()) {
            let once = canonical_key(&text);
            prop_assert_eq!(canonical_key(&once), once);
        }

        #[test]
        fn canonical_key_is_lowercase_ascii(text in "\\PC{0,64}") {
            let key = canonical_key(&text);
            prop_assert!(key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '));
            prop_assert!(!key.starts_with(' ') && !key.ends_with(' ') && !key.contains("  "));
        }
    }
}
