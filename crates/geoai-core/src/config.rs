//! Engine tunables.

use crate::matcher::MatchPolicy;
use crate::model::answer::LikelihoodTable;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Validation failures captured with contextual metadata.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Blend applied by the confidence estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub probability: f64,
    pub gap: f64,
    pub count: f64,
    /// Candidate count at which the count signal bottoms out.
    pub count_horizon: usize,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            probability: 0.5,
            gap: 0.3,
            count: 0.2,
            count_horizon: 50,
        }
    }
}

/// Required confidence while at most `up_to_questions` have been asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceTier {
    pub up_to_questions: usize,
    pub required: u8,
}

/// Early guess once only a handful of candidates remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarlyGuessRule {
    pub max_candidates: usize,
    pub min_confidence: u8,
    pub min_questions: usize,
}

impl Default for EarlyGuessRule {
    fn default() -> Self {
        Self {
            max_candidates: 3,
            min_confidence: 85,
            min_questions: 5,
        }
    }
}

/// Every constant the inference engine consults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub likelihood: LikelihoodTable,
    pub match_policy: MatchPolicy,
    /// Lower bound on any weight after a multiplicative update.
    pub weight_floor: f64,
    /// Absolute normalized weight below which a candidate may be pruned.
    pub prune_threshold: f64,
    /// Pruning never leaves fewer than this many candidates.
    pub min_retained: usize,
    /// Fraction of the `min_retained`-th weight that also bounds pruning.
    pub relative_prune_ratio: f64,
    pub max_attribute_asks: usize,
    /// Question counts at which the topic stage advances.
    pub stage_boundaries: Vec<usize>,
    pub stage_bonus: f64,
    pub balance_bonus: f64,
    pub importance_bonus: f64,
    /// Scales the context score built from answers on related attributes.
    pub context_bonus: f64,
    /// Groups of attributes that inform each other. An attribute belongs to at most one group.
    pub attribute_families: Vec<Vec<String>>,
    /// Upper bound of the uniform tie-break jitter. Zero disables it.
    pub jitter: f64,
    pub confidence: ConfidenceWeights,
    pub confidence_ceiling: u8,
    pub confidence_tiers: Vec<ConfidenceTier>,
    pub final_required_confidence: u8,
    pub early_guess: EarlyGuessRule,
    pub max_questions: usize,
    /// Top-candidate share the questions-remaining estimate aims for.
    pub estimate_target_share: f64,
    /// Entropy, in bits, one answer is expected to remove.
    pub estimate_bits_per_question: f64,
}

fn family(attributes: &[&str]) -> Vec<String> {
    attributes.iter().map(|attribute| attribute.to_string()).collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            likelihood: LikelihoodTable::default(),
            match_policy: MatchPolicy::Exact,
            weight_floor: 1e-6,
            prune_threshold: 1e-4,
            min_retained: 3,
            relative_prune_ratio: 0.1,
            max_attribute_asks: 3,
            stage_boundaries: vec![3, 6, 10],
            stage_bonus: 0.05,
            balance_bonus: 0.05,
            importance_bonus: 0.05,
            context_bonus: 0.05,
            attribute_families: vec![
                family(&["continent", "region", "hasCoast", "isIsland", "landlocked", "hasMountains"]),
                family(&["population", "size", "isCapital"]),
                family(&["language", "mainReligion", "famousFor"]),
                family(&["climate", "isNatural"]),
                family(&["government", "country"]),
            ],
            jitter: 0.01,
            confidence: ConfidenceWeights::default(),
            confidence_ceiling: 99,
            confidence_tiers: vec![
                ConfidenceTier {
                    up_to_questions: 10,
                    required: 99,
                },
                ConfidenceTier {
                    up_to_questions: 25,
                    required: 98,
                },
            ],
            final_required_confidence: 95,
            early_guess: EarlyGuessRule::default(),
            max_questions: 50,
            estimate_target_share: 0.9,
            estimate_bits_per_question: 0.3,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `GEOAI_*` environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = parse_env::<usize>("GEOAI_MAX_QUESTIONS") {
            config.max_questions = value.max(1);
        }
        if let Some(value) = parse_env::<f64>("GEOAI_JITTER").filter(|v| v.is_finite()) {
            config.jitter = value.clamp(0.0, 0.1);
        }
        if let Some(value) = parse_env::<usize>("GEOAI_MIN_RETAINED") {
            config.min_retained = value.max(1);
        }
        if let Some(policy) = env::var("GEOAI_MATCH_POLICY")
            .ok()
            .and_then(|raw| MatchPolicy::from_label(&raw))
        {
            config.match_policy = policy;
        }
        config
    }

    /// Checks ranges without touching the environment.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.likelihood.validate()?;

        probability_field("weight_floor", self.weight_floor, false)?;
        probability_field("prune_threshold", self.prune_threshold, true)?;
        probability_field("relative_prune_ratio", self.relative_prune_ratio, true)?;
        probability_field("jitter", self.jitter, true)?;
        for (field, value) in [
            ("stage_bonus", self.stage_bonus),
            ("balance_bonus", self.balance_bonus),
            ("importance_bonus", self.importance_bonus),
            ("context_bonus", self.context_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::invalid(field, "bonus must be a non-negative number"));
            }
        }

        probability_field("estimate_target_share", self.estimate_target_share, false)?;
        if !self.estimate_bits_per_question.is_finite() || self.estimate_bits_per_question <= 0.0 {
            return Err(ValidationError::invalid(
                "estimate_bits_per_question",
                "expected entropy reduction must be positive",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(repeated) = self
            .attribute_families
            .iter()
            .flatten()
            .find(|attribute| !seen.insert(attribute.as_str()))
        {
            return Err(ValidationError::invalid(
                "attribute_families",
                format!("{repeated} appears in more than one family"),
            ));
        }

        if self.min_retained == 0 {
            return Err(ValidationError::invalid(
                "min_retained",
                "at least one candidate must be retained",
            ));
        }
        if self.max_attribute_asks == 0 {
            return Err(ValidationError::invalid(
                "max_attribute_asks",
                "each attribute must be askable at least once",
            ));
        }
        if self.max_questions == 0 {
            return Err(ValidationError::invalid(
                "max_questions",
                "max questions must be greater than zero",
            ));
        }
        if self.stage_boundaries.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ValidationError::invalid(
                "stage_boundaries",
                "boundaries must be strictly increasing",
            ));
        }

        let weights = &self.confidence;
        let blend = weights.probability + weights.gap + weights.count;
        if [weights.probability, weights.gap, weights.count]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
            || (blend - 1.0).abs() > 1e-6
        {
            return Err(ValidationError::invalid(
                "confidence",
                "blend weights must be non-negative and sum to 1.0",
            ));
        }
        if weights.count_horizon == 0 {
            return Err(ValidationError::invalid(
                "confidence.count_horizon",
                "count horizon must be greater than zero",
            ));
        }
        if self.confidence_ceiling == 0 || self.confidence_ceiling > 99 {
            return Err(ValidationError::invalid(
                "confidence_ceiling",
                "ceiling must be within 1..=99",
            ));
        }

        let mut previous: Option<ConfidenceTier> = None;
        for tier in &self.confidence_tiers {
            if let Some(prev) = previous {
                if tier.up_to_questions <= prev.up_to_questions || tier.required > prev.required {
                    return Err(ValidationError::invalid(
                        "confidence_tiers",
                        "tiers must cover increasing question counts with non-increasing thresholds",
                    ));
                }
            }
            previous = Some(*tier);
        }
        if let Some(last) = previous {
            if self.final_required_confidence > last.required {
                return Err(ValidationError::invalid(
                    "final_required_confidence",
                    "final threshold must not exceed the last tier",
                ));
            }
        }

        Ok(())
    }

    /// Topic stage reached after `questions_asked` answers.
    pub fn stage_for(&self, questions_asked: usize) -> u8 {
        let passed = self
            .stage_boundaries
            .iter()
            .take_while(|boundary| questions_asked >= **boundary)
            .count();
        u8::try_from(passed).unwrap_or(u8::MAX)
    }

    /// Other members of the family `attribute` belongs to, empty when it has none.
    pub fn related_attributes(&self, attribute: &str) -> impl Iterator<Item = &str> {
        self.attribute_families
            .iter()
            .find(|family| family.iter().any(|member| member == attribute))
            .into_iter()
            .flatten()
            .map(String::as_str)
            .filter(move |member| *member != attribute)
    }

    /// Confidence needed to guess after `questions_asked` answers.
    pub fn required_confidence(&self, questions_asked: usize) -> u8 {
        self.confidence_tiers
            .iter()
            .find(|tier| questions_asked <= tier.up_to_questions)
            .map(|tier| tier.required)
            .unwrap_or(self.final_required_confidence)
    }
}

fn probability_field(field: &str, value: f64, allow_zero: bool) -> Result<(), ValidationError> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !value.is_finite() || !lower_ok || value >= 1.0 {
        return Err(ValidationError::invalid(field, "value must lie within [0, 1)"));
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}
