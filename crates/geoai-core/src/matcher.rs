//! Attribute matching between entity values and question targets.

use crate::model::value::{AttributeValue, normalize};
use serde::{Deserialize, Serialize};

/// String comparison policy applied after trimming and lowercasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Normalized strings must be equal.
    #[default]
    Exact,
    /// The entity string must contain the normalized target.
    Fuzzy,
}

impl MatchPolicy {
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exact" => Some(MatchPolicy::Exact),
            "fuzzy" | "contains" => Some(MatchPolicy::Fuzzy),
            _ => None,
        }
    }

    fn compare(self, entity: &str, target: &str) -> bool {
        let entity = normalize(entity);
        let target = normalize(target);
        match self {
            MatchPolicy::Exact => entity == target,
            MatchPolicy::Fuzzy => !target.is_empty() && entity.contains(&target),
        }
    }
}

/// Returns whether `entity_value` satisfies `target`.
///
/// A missing entity value never matches, and mismatched shapes are a non-match rather
/// than an error.
pub fn matches(entity_value: Option<&AttributeValue>, target: &AttributeValue, policy: MatchPolicy) -> bool {
    let Some(entity_value) = entity_value else {
        return false;
    };

    match (entity_value, target) {
        (AttributeValue::List(items), AttributeValue::String(wanted)) => {
            items.iter().any(|item| policy.compare(item, wanted))
        }
        (AttributeValue::String(actual), AttributeValue::String(wanted)) => {
            policy.compare(actual, wanted)
        }
        (AttributeValue::Bool(actual), AttributeValue::Bool(wanted)) => actual == wanted,
        (AttributeValue::Number(actual), AttributeValue::Number(wanted)) => actual == wanted,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(entity: impl Into<AttributeValue>, target: impl Into<AttributeValue>) -> bool {
        matches(Some(&entity.into()), &target.into(), MatchPolicy::Exact)
    }

    #[test]
    fn missing_value_never_matches() {
        assert!(!matches(None, &AttributeValue::from("asia"), MatchPolicy::Exact));
        assert!(!matches(None, &AttributeValue::from("asia"), MatchPolicy::Fuzzy));
    }

    #[test]
    fn strings_compare_case_insensitively_after_trim() {
        assert!(check("  Asia", "asia "));
        assert!(!check("Asia", "europe"));
    }

    #[test]
    fn exact_policy_rejects_substrings() {
        assert!(!check("southeast asia", "asia"));
        assert!(matches(
            Some(&AttributeValue::from("Southeast Asia")),
            &AttributeValue::from("asia"),
            MatchPolicy::Fuzzy
        ));
    }

    #[test]
    fn lists_match_any_element() {
        assert!(check(vec!["Red", "White"], "white"));
        assert!(!check(vec!["Red", "White"], "blue"));
        assert!(!check(Vec::<&str>::new(), "blue"));
    }

    #[test]
    fn fuzzy_lists_match_element_substrings() {
        let flag = AttributeValue::from(vec!["dark green", "white"]);
        assert!(matches(Some(&flag), &AttributeValue::from("green"), MatchPolicy::Fuzzy));
        assert!(!matches(Some(&flag), &AttributeValue::from("green"), MatchPolicy::Exact));
    }

    #[test]
    fn fuzzy_empty_target_does_not_match_everything() {
        assert!(!matches(
            Some(&AttributeValue::from("asia")),
            &AttributeValue::from("  "),
            MatchPolicy::Fuzzy
        ));
    }

    #[test]
    fn scalars_use_exact_equality() {
        assert!(check(true, true));
        assert!(!check(true, false));
        assert!(check(3.0, 3.0));
        assert!(!check(3.0, 3.5));
    }

    #[test]
    fn mismatched_shapes_are_non_matches() {
        assert!(!check(true, "true"));
        assert!(!check("3", 3.0));
        assert!(!check("red", vec!["red"]));
    }

    #[test]
    fn policy_parses_aliases() {
        assert_eq!(MatchPolicy::from_label("EXACT"), Some(MatchPolicy::Exact));
        assert_eq!(MatchPolicy::from_label("contains"), Some(MatchPolicy::Fuzzy));
        assert_eq!(MatchPolicy::from_label("regex"), None);
    }
}
