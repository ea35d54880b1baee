use super::value::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable catalog record for one candidate answer.
///
/// Per-game weights live in the belief state, never on the entity itself, so a catalog
/// can be shared across any number of games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Entity {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::Entity;
    use crate::model::value::AttributeValue;

    #[test]
    fn builder_collects_attributes() {
        let entity = Entity::new(7, "Japan")
            .with_attribute("continent", "asia")
            .with_attribute("isIsland", true);
        assert_eq!(entity.attribute("continent"), Some(&AttributeValue::from("asia")));
        assert_eq!(entity.attribute("isIsland"), Some(&AttributeValue::Bool(true)));
        assert!(entity.attribute("climate").is_none());
    }
}
