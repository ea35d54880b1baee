use super::value::AttributeValue;
use serde::{Deserialize, Serialize};

/// Catalog question bound to a single attribute/value target.
///
/// `text` doubles as the question's identity within a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(alias = "question")]
    pub text: String,
    pub attribute: String,
    pub value: AttributeValue,
    /// Static importance in `(0, 1]`.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Coarse topic phase; lower stages are meant to be asked first.
    #[serde(default)]
    pub stage: u8,
}

fn default_weight() -> f64 {
    1.0
}

impl Question {
    pub fn new(
        text: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            text: text.into(),
            attribute: attribute.into(),
            value: value.into(),
            weight: default_weight(),
            stage: 0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_stage(mut self, stage: u8) -> Self {
        self.stage = stage;
        self
    }

    pub fn id(&self) -> &str {
        &self.text
    }
}
