use core::fmt;
use serde::{Deserialize, Serialize};

/// Typed attribute payload carried by entities and question targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<String>),
}

impl AttributeValue {
    /// Converts a loosely typed JSON value into an attribute value.
    ///
    /// `null`, objects and nested arrays have no attribute representation and yield `None`.
    /// Scalar array elements are stringified so the result is always a list of strings.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Number(number) => number.as_f64().map(Self::Number),
            Value::String(text) => Some(Self::String(text.clone())),
            Value::Array(items) => Some(Self::List(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(text) => Some(text.clone()),
                        Value::Bool(flag) => Some(flag.to_string()),
                        Value::Number(number) => Some(number.to_string()),
                        _ => None,
                    })
                    .collect(),
            )),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Stable textual form used to compare values across entities.
    ///
    /// Strings are trimmed and lowercased so two values that the matcher treats as equal
    /// share a key. List elements are sorted and deduplicated: `["red", "white"]` and
    /// `["White", "red"]` hold the same set and answer every question alike.
    pub fn canonical_key(&self) -> String {
        match self {
            Self::Bool(flag) => format!("b:{flag}"),
            Self::Number(number) => format!("n:{number}"),
            Self::String(text) => format!("s:{}", normalize(text)),
            Self::List(items) => {
                let mut parts: Vec<String> = items.iter().map(|item| normalize(item)).collect();
                parts.sort_unstable();
                parts.dedup();
                format!("l:[{}]", parts.join("|"))
            }
        }
    }

    /// Individual scalar keys, one per list element for list values.
    pub fn element_keys(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.iter().map(|item| format!("s:{}", normalize(item))).collect(),
            other => vec![other.canonical_key()],
        }
    }
}

pub(crate) fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Number(number) => write!(f, "{number}"),
            Self::String(text) => f.write_str(text),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::AttributeValue;
    use serde_json::json;

    #[test]
    fn from_json_skips_null_and_objects() {
        assert_eq!(AttributeValue::from_json(&json!(null)), None);
        assert_eq!(AttributeValue::from_json(&json!({"a": 1})), None);
        assert_eq!(
            AttributeValue::from_json(&json!(true)),
            Some(AttributeValue::Bool(true))
        );
    }

    #[test]
    fn from_json_stringifies_list_scalars() {
        let value = AttributeValue::from_json(&json!(["red", 3, false, null])).unwrap();
        assert_eq!(
            value,
            AttributeValue::List(vec!["red".into(), "3".into(), "false".into()])
        );
    }

    #[test]
    fn canonical_key_ignores_case_and_padding() {
        let a = AttributeValue::from(" Asia ");
        let b = AttributeValue::from("asia");
        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_ne!(
            AttributeValue::Bool(true).canonical_key(),
            AttributeValue::from("true").canonical_key()
        );
    }

    #[test]
    fn list_key_ignores_order_and_repeats() {
        let a = AttributeValue::from(vec!["red", "white"]);
        let b = AttributeValue::from(vec!["White", "red", "red"]);
        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_ne!(
            a.canonical_key(),
            AttributeValue::from(vec!["red", "white", "blue"]).canonical_key()
        );
    }

    #[test]
    fn untagged_serde_picks_matching_variant() {
        let values: Vec<AttributeValue> =
            serde_json::from_str(r#"[true, 2.5, "europe", ["red", "white"]]"#).unwrap();
        assert_eq!(values[0], AttributeValue::Bool(true));
        assert_eq!(values[1], AttributeValue::Number(2.5));
        assert_eq!(values[2], AttributeValue::from("europe"));
        assert_eq!(values[3], AttributeValue::from(vec!["red", "white"]));
    }
}
