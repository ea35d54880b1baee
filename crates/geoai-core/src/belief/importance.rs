//! Static per-attribute discriminative power derived from the entity catalog.

use crate::model::Entity;
use std::collections::{BTreeMap, HashMap};

/// Neutral importance for attributes absent from the catalog.
const UNKNOWN_IMPORTANCE: f64 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct AttributeImportance {
    scores: BTreeMap<String, f64>,
}

impl AttributeImportance {
    /// Scores each attribute as the mean of value diversity and Gini impurity.
    ///
    /// List attributes contribute one observation per element.
    pub fn from_entities<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        let mut observations: HashMap<&str, HashMap<String, usize>> = HashMap::new();
        for entity in entities {
            for (attribute, value) in &entity.attributes {
                let counts = observations.entry(attribute.as_str()).or_default();
                for key in value.element_keys() {
                    *counts.entry(key).or_insert(0) += 1;
                }
            }
        }

        let scores = observations
            .into_iter()
            .filter_map(|(attribute, counts)| {
                let total: usize = counts.values().sum();
                if total == 0 {
                    return None;
                }
                let total_f = total as f64;
                let diversity = counts.len() as f64 / total_f;
                let gini = 1.0
                    - counts
                        .values()
                        .map(|count| {
                            let p = *count as f64 / total_f;
                            p * p
                        })
                        .sum::<f64>();
                Some((attribute.to_string(), 0.5 * diversity + 0.5 * gini))
            })
            .collect();

        Self { scores }
    }

    pub fn get(&self, attribute: &str) -> f64 {
        self.scores.get(attribute).copied().unwrap_or(UNKNOWN_IMPORTANCE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(attribute, score)| (attribute.as_str(), *score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varied_attributes_outrank_constant_ones() {
        let entities = vec![
            Entity::new(0, "a").with_attribute("continent", "asia").with_attribute("planet", "earth"),
            Entity::new(1, "b").with_attribute("continent", "europe").with_attribute("planet", "earth"),
            Entity::new(2, "c").with_attribute("continent", "africa").with_attribute("planet", "earth"),
        ];
        let importance = AttributeImportance::from_entities(&entities);
        assert!(importance.get("continent") > importance.get("planet"));
        // 1 distinct / 3 observations, zero impurity
        assert!((importance.get("planet") - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_attribute_is_neutral() {
        let importance = AttributeImportance::from_entities(&[] as &[Entity]);
        assert_eq!(importance.get("anything"), UNKNOWN_IMPORTANCE);
        assert_eq!(importance.iter().count(), 0);
    }

    #[test]
    fn list_elements_count_individually() {
        let entities = vec![
            Entity::new(0, "a").with_attribute("flagColors", vec!["red", "white"]),
            Entity::new(1, "b").with_attribute("flagColors", vec!["red"]),
        ];
        let importance = AttributeImportance::from_entities(&entities);
        // observations: red, white, red -> diversity 2/3, gini 1 - (4/9 + 1/9)
        let expected = 0.5 * (2.0 / 3.0) + 0.5 * (1.0 - 5.0 / 9.0);
        assert!((importance.get("flagColors") - expected).abs() < 1e-12);
    }
}
