//! Catalog loading and question bank generation.

use geoai_core::model::{AttributeValue, Entity, Question};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Record keys that describe an entity rather than an attribute of it.
const METADATA_KEYS: [&str; 4] = ["id", "name", "emoji", "info"];

/// Weight and stage for attributes absent from [`ATTRIBUTE_PROFILES`].
const DEFAULT_PROFILE: AttributeProfile = AttributeProfile {
    weight: 0.7,
    stage: 2,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeProfile {
    pub weight: f64,
    pub stage: u8,
}

/// Broad geography first, then physical traits, culture and finally trivia.
const ATTRIBUTE_PROFILES: &[(&str, AttributeProfile)] = &[
    ("continent", AttributeProfile { weight: 1.0, stage: 0 }),
    ("region", AttributeProfile { weight: 0.9, stage: 0 }),
    ("landlocked", AttributeProfile { weight: 0.8, stage: 1 }),
    ("hasCoast", AttributeProfile { weight: 0.8, stage: 1 }),
    ("isIsland", AttributeProfile { weight: 0.9, stage: 1 }),
    ("hasMountains", AttributeProfile { weight: 0.6, stage: 1 }),
    ("climate", AttributeProfile { weight: 0.7, stage: 1 }),
    ("population", AttributeProfile { weight: 0.7, stage: 2 }),
    ("language", AttributeProfile { weight: 0.9, stage: 2 }),
    ("driveSide", AttributeProfile { weight: 0.7, stage: 2 }),
    ("government", AttributeProfile { weight: 0.6, stage: 2 }),
    ("mainReligion", AttributeProfile { weight: 0.5, stage: 2 }),
    ("flagColors", AttributeProfile { weight: 0.6, stage: 3 }),
    ("famousFor", AttributeProfile { weight: 0.5, stage: 3 }),
];

pub fn attribute_profile(attribute: &str) -> AttributeProfile {
    ATTRIBUTE_PROFILES
        .iter()
        .find(|(name, _)| *name == attribute)
        .map(|(_, profile)| *profile)
        .unwrap_or(DEFAULT_PROFILE)
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read catalog {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse catalog {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("catalog {path:?} record {index}: {message}")]
    Record {
        path: PathBuf,
        index: usize,
        message: String,
    },
    #[error("catalog {path:?} contains no usable records")]
    Empty { path: PathBuf },
}

/// Reads an entity catalog: a JSON array of flat objects.
pub fn load_entities(path: impl AsRef<Path>) -> Result<Vec<Arc<Entity>>, DatasetError> {
    let path = path.as_ref();
    let raw: Value = read_json(path)?;
    parse_entities(&raw, path)
}

/// Converts decoded catalog records into entities.
///
/// Records without a numeric `id` are numbered by position. Attributes whose value has no
/// typed representation (null, nested objects) are skipped.
pub fn parse_entities(raw: &Value, path: &Path) -> Result<Vec<Arc<Entity>>, DatasetError> {
    let records = raw.as_array().ok_or_else(|| DatasetError::Record {
        path: path.to_path_buf(),
        index: 0,
        message: "top level must be an array of objects".to_string(),
    })?;

    let mut entities = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let record_error = |message: &str| DatasetError::Record {
            path: path.to_path_buf(),
            index,
            message: message.to_string(),
        };
        let fields = record
            .as_object()
            .ok_or_else(|| record_error("record must be an object"))?;
        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| record_error("record needs a non-empty string `name`"))?;
        let id = match fields.get("id").and_then(Value::as_u64) {
            Some(id) => u32::try_from(id).map_err(|_| record_error("`id` does not fit in 32 bits"))?,
            None => u32::try_from(index).map_err(|_| record_error("too many records"))?,
        };

        let attributes: BTreeMap<String, AttributeValue> = fields
            .iter()
            .filter(|(key, _)| !METADATA_KEYS.contains(&key.as_str()))
            .filter_map(|(key, value)| AttributeValue::from_json(value).map(|value| (key.clone(), value)))
            .collect();

        entities.push(Arc::new(Entity {
            id,
            name: name.to_string(),
            attributes,
        }));
    }

    if entities.is_empty() {
        return Err(DatasetError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(entities)
}

/// Reads a question bank: a JSON array of `{question, attribute, value, weight?, stage?}`.
pub fn load_questions(path: impl AsRef<Path>) -> Result<Vec<Question>, DatasetError> {
    let path = path.as_ref();
    let questions: Vec<Question> = read_json(path)?;
    if questions.is_empty() {
        return Err(DatasetError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(questions)
}

/// One question per distinct attribute value seen in `entities`.
///
/// List attributes yield a question per element. Boolean attributes only get the `true`
/// question since its complement carries the same information. Output is ordered by
/// attribute name, then by first appearance of the value.
pub fn generate_questions(entities: &[Arc<Entity>]) -> Vec<Question> {
    let mut values: BTreeMap<&str, Vec<(String, AttributeValue)>> = BTreeMap::new();
    for entity in entities {
        for (attribute, value) in &entity.attributes {
            let seen = values.entry(attribute.as_str()).or_default();
            for target in question_targets(value) {
                let key = target.canonical_key();
                if !seen.iter().any(|(existing, _)| *existing == key) {
                    seen.push((key, target));
                }
            }
        }
    }

    let mut questions = Vec::new();
    for (attribute, targets) in values {
        let profile = attribute_profile(attribute);
        for (_, value) in targets {
            let text = match &value {
                AttributeValue::Bool(_) => format!("Is {attribute} true?"),
                other => format!("Is the {attribute} {other}?"),
            };
            questions.push(
                Question::new(text, attribute, value)
                    .with_weight(profile.weight)
                    .with_stage(profile.stage),
            );
        }
    }
    questions
}

fn question_targets(value: &AttributeValue) -> Vec<AttributeValue> {
    match value {
        AttributeValue::List(items) => items
            .iter()
            .map(|item| AttributeValue::String(item.clone()))
            .collect(),
        AttributeValue::Bool(_) => vec![AttributeValue::Bool(true)],
        other => vec![other.clone()],
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Read {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
