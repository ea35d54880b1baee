//! Reduction of a belief state to a bounded confidence score.

use crate::belief::BeliefState;
use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};

/// Confidence in `[0, config.confidence_ceiling]`.
///
/// Blends the top candidate's share, its lead over the runner-up and how few candidates
/// remain. A lone candidate scores the ceiling and an empty belief scores zero.
pub fn confidence(belief: &BeliefState, config: &EngineConfig) -> u8 {
    let ceiling = config.confidence_ceiling;
    match belief.len() {
        0 => return 0,
        1 => return ceiling,
        _ => {}
    }

    let total = belief.total_weight();
    let ranked = belief.ranked();
    let top = ranked[0].weight();
    let second = ranked[1].weight();
    if total <= 0.0 || top <= 0.0 {
        return 0;
    }

    let weights = &config.confidence;
    let prob = 100.0 * top / total;
    let gap = 100.0 * (top - second) / top;
    let horizon = weights.count_horizon.max(1) as f64;
    let count = 100.0 * (1.0 - (belief.len() as f64 / horizon).min(1.0));

    let blended = weights.probability * prob + weights.gap * gap + weights.count * count;
    if !blended.is_finite() {
        return 0;
    }
    blended.round().clamp(0.0, f64::from(ceiling)) as u8
}

/// Coarse bucket used when reporting a confidence to a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryHigh,
    High,
    Moderate,
    Low,
    VeryLow,
}

impl ConfidenceLevel {
    pub const ALL: [ConfidenceLevel; 5] = [
        ConfidenceLevel::VeryHigh,
        ConfidenceLevel::High,
        ConfidenceLevel::Moderate,
        ConfidenceLevel::Low,
        ConfidenceLevel::VeryLow,
    ];

    pub const fn from_confidence(confidence: u8) -> Self {
        match confidence {
            90.. => ConfidenceLevel::VeryHigh,
            75..=89 => ConfidenceLevel::High,
            60..=74 => ConfidenceLevel::Moderate,
            40..=59 => ConfidenceLevel::Low,
            _ => ConfidenceLevel::VeryLow,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "very high",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Moderate => "moderate",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::VeryLow => "very low",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entity;
    use std::sync::Arc;

    fn catalog(n: u32) -> Vec<Arc<Entity>> {
        (0..n)
            .map(|id| Arc::new(Entity::new(id, format!("entity-{id}"))))
            .collect()
    }

    #[test]
    fn single_candidate_hits_ceiling() {
        let belief = BeliefState::uniform(&catalog(1)).unwrap();
        assert_eq!(confidence(&belief, &EngineConfig::default()), 99);

        let config = EngineConfig {
            confidence_ceiling: 95,
            ..EngineConfig::default()
        };
        assert_eq!(confidence(&belief, &config), 95);
    }

    #[test]
    fn uniform_belief_scores_probability_and_count_only() {
        let belief = BeliefState::uniform(&catalog(4)).unwrap();
        // 0.5 * 25 + 0.3 * 0 + 0.2 * (100 * (1 - 4/50)) = 12.5 + 18.4
        assert_eq!(confidence(&belief, &EngineConfig::default()), 31);
    }

    #[test]
    fn dominant_candidate_scores_high() {
        let belief = BeliefState::with_priors(&catalog(3), &[98.0, 1.0, 1.0]).unwrap();
        // 0.5 * 98 + 0.3 * (100 * 97 / 98) + 0.2 * 94
        let expected = (49.0 + 0.3 * (9700.0 / 98.0) + 18.8_f64).round() as u8;
        assert_eq!(confidence(&belief, &EngineConfig::default()), expected);
        assert!(expected > 90);
    }

    #[test]
    fn never_exceeds_ceiling() {
        let belief = BeliefState::with_priors(&catalog(2), &[1.0, 0.0]).unwrap();
        // 50 + 30 + 19.2 rounds to 99
        assert_eq!(confidence(&belief, &EngineConfig::default()), 99);
        let strict = EngineConfig {
            confidence_ceiling: 90,
            ..EngineConfig::default()
        };
        assert_eq!(confidence(&belief, &strict), 90);
    }

    #[test]
    fn levels_bucket_scores() {
        assert_eq!(ConfidenceLevel::from_confidence(99), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_confidence(90), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_confidence(89), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(60), ConfidenceLevel::Moderate);
        assert_eq!(ConfidenceLevel::from_confidence(40), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_confidence(0), ConfidenceLevel::VeryLow);
        assert_eq!(ConfidenceLevel::High.label(), "high");
    }
}
