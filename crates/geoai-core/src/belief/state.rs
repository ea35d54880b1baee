//! Per-game belief distribution and question bookkeeping.

use super::importance::AttributeImportance;
use crate::error::EngineError;
use crate::model::{AnswerGrade, Entity, Question};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// A catalog entity paired with its current weight.
#[derive(Debug, Clone)]
pub struct Candidate {
    entity: Arc<Entity>,
    weight: f64,
}

impl Candidate {
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub(crate) fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question: String,
    pub attribute: String,
    pub grade: AnswerGrade,
}

/// Mutable state owned by exactly one in-progress game.
#[derive(Debug, Clone)]
pub struct BeliefState {
    candidates: Vec<Candidate>,
    asked_questions: HashSet<String>,
    attribute_asks: HashMap<String, usize>,
    history: Vec<AnswerRecord>,
    stage: u8,
    total_entities: usize,
    importance: AttributeImportance,
}

impl BeliefState {
    /// Uniform belief over `entities`.
    pub fn uniform(entities: &[Arc<Entity>]) -> Result<Self, EngineError> {
        let priors = vec![1.0; entities.len()];
        Self::with_priors(entities, &priors)
    }

    /// Belief seeded from caller-supplied non-negative weights, normalized to sum to one.
    pub fn with_priors(entities: &[Arc<Entity>], priors: &[f64]) -> Result<Self, EngineError> {
        if entities.is_empty() {
            return Err(EngineError::EmptyCatalog);
        }
        if priors.len() != entities.len() {
            return Err(EngineError::PriorLengthMismatch {
                expected: entities.len(),
                found: priors.len(),
            });
        }
        if let Some((index, value)) = priors
            .iter()
            .copied()
            .enumerate()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(EngineError::InvalidPrior { index, value });
        }
        let total: f64 = priors.iter().sum();
        if total <= 0.0 {
            return Err(EngineError::ZeroPriorMass);
        }

        let candidates = entities
            .iter()
            .zip(priors)
            .map(|(entity, prior)| Candidate {
                entity: Arc::clone(entity),
                weight: prior / total,
            })
            .collect();

        Ok(Self {
            candidates,
            asked_questions: HashSet::new(),
            attribute_asks: HashMap::new(),
            history: Vec::new(),
            stage: 0,
            total_entities: entities.len(),
            importance: AttributeImportance::from_entities(entities.iter().map(|entity| &**entity)),
        })
    }

    /// Retained candidates, heaviest first once at least one answer has been applied.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Size of the catalog the game started from.
    pub fn total_entities(&self) -> usize {
        self.total_entities
    }

    pub fn total_weight(&self) -> f64 {
        self.candidates.iter().map(Candidate::weight).sum()
    }

    pub fn questions_asked(&self) -> usize {
        self.history.len()
    }

    pub fn stage(&self) -> u8 {
        self.stage
    }

    pub fn is_asked(&self, question: &Question) -> bool {
        self.asked_questions.contains(question.id())
    }

    pub fn attribute_asks(&self, attribute: &str) -> usize {
        self.attribute_asks.get(attribute).copied().unwrap_or(0)
    }

    pub fn importance(&self) -> &AttributeImportance {
        &self.importance
    }

    pub fn answer_history(&self) -> &[AnswerRecord] {
        &self.history
    }

    pub fn answer_counts(&self) -> BTreeMap<AnswerGrade, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.history {
            *counts.entry(record.grade).or_insert(0) += 1;
        }
        counts
    }

    pub fn attribute_usage(&self) -> BTreeMap<String, usize> {
        self.attribute_asks
            .iter()
            .map(|(attribute, count)| (attribute.clone(), *count))
            .collect()
    }

    /// Heaviest candidate; ties resolve to the earliest in the current ordering.
    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.iter().fold(None, |best: Option<&Candidate>, candidate| match best {
            Some(current) if current.weight >= candidate.weight => Some(current),
            _ => Some(candidate),
        })
    }

    /// Candidates sorted by descending weight, stable with respect to the current order.
    pub fn ranked(&self) -> Vec<&Candidate> {
        let mut ranked: Vec<&Candidate> = self.candidates.iter().collect();
        ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        ranked
    }

    /// Up to `n` leading candidates with their share of the total weight.
    pub fn top_candidates(&self, n: usize) -> Vec<(&Entity, f64)> {
        let total = self.total_weight();
        self.ranked()
            .into_iter()
            .take(n)
            .map(|candidate| {
                let share = if total > 0.0 { candidate.weight / total } else { 0.0 };
                (candidate.entity(), share)
            })
            .collect()
    }

    pub fn weight_of(&self, entity_id: u32) -> Option<f64> {
        self.candidates
            .iter()
            .find(|candidate| candidate.entity.id == entity_id)
            .map(Candidate::weight)
    }

    /// Shannon entropy (bits) of the normalized belief.
    pub fn entropy(&self) -> f64 {
        entropy(self.candidates.iter().map(Candidate::weight))
    }

    /// Rough count of answers still needed before the leader holds `target_share` of the
    /// weight, assuming each answer removes `bits_per_question` bits of entropy.
    ///
    /// The goal entropy is that of a belief with `target_share` on the leader and the rest
    /// spread evenly over the other candidates.
    pub fn estimate_questions_remaining(&self, target_share: f64, bits_per_question: f64) -> usize {
        let n = self.candidates.len();
        let current = self.entropy();
        if n < 2 || current <= 0.0 || bits_per_question <= 0.0 {
            return 0;
        }
        let share = target_share.clamp(f64::EPSILON, 1.0);
        let rest = 1.0 - share;
        let mut goal = -share * share.log2();
        if rest > 0.0 {
            goal -= rest * (rest / (n - 1) as f64).log2();
        }
        let needed = ((current - goal) / bits_per_question).ceil();
        if needed.is_finite() && needed > 0.0 { needed as usize } else { 0 }
    }

    pub(crate) fn candidates_mut(&mut self) -> &mut Vec<Candidate> {
        &mut self.candidates
    }

    pub(crate) fn record(&mut self, question: &Question, grade: AnswerGrade, next_stage: u8) {
        self.asked_questions.insert(question.id().to_string());
        *self
            .attribute_asks
            .entry(question.attribute.clone())
            .or_insert(0) += 1;
        self.history.push(AnswerRecord {
            question: question.id().to_string(),
            attribute: question.attribute.clone(),
            grade,
        });
        self.stage = next_stage;
    }
}

/// `-Σ p log2 p` over weights normalized by their own sum; zero for empty or massless input.
pub fn entropy(weights: impl IntoIterator<Item = f64> + Clone) -> f64 {
    let total: f64 = weights.clone().into_iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    weights
        .into_iter()
        .filter(|weight| *weight > 0.0)
        .map(|weight| {
            let p = weight / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(n: u32) -> Vec<Arc<Entity>> {
        (0..n)
            .map(|id| Arc::new(Entity::new(id, format!("entity-{id}"))))
            .collect()
    }

    #[test]
    fn uniform_rejects_empty_catalog() {
        let err = BeliefState::uniform(&[]).expect_err("empty");
        assert_eq!(err, EngineError::EmptyCatalog);
    }

    #[test]
    fn uniform_weights_sum_to_one() {
        let belief = BeliefState::uniform(&catalog(4)).unwrap();
        assert_eq!(belief.len(), 4);
        assert!((belief.total_weight() - 1.0).abs() < 1e-12);
        assert!((belief.entropy() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn priors_are_normalized_and_validated() {
        let entities = catalog(3);
        let belief = BeliefState::with_priors(&entities, &[2.0, 1.0, 1.0]).unwrap();
        assert_eq!(belief.weight_of(0), Some(0.5));

        assert_eq!(
            BeliefState::with_priors(&entities, &[1.0]).unwrap_err(),
            EngineError::PriorLengthMismatch {
                expected: 3,
                found: 1
            }
        );
        assert!(matches!(
            BeliefState::with_priors(&entities, &[1.0, -1.0, 1.0]),
            Err(EngineError::InvalidPrior { index: 1, .. })
        ));
        assert_eq!(
            BeliefState::with_priors(&entities, &[0.0, 0.0, 0.0]).unwrap_err(),
            EngineError::ZeroPriorMass
        );
    }

    #[test]
    fn top_prefers_catalog_order_on_ties() {
        let belief = BeliefState::uniform(&catalog(3)).unwrap();
        assert_eq!(belief.top().map(|c| c.entity().id), Some(0));
    }

    #[test]
    fn top_candidates_reports_shares() {
        let belief = BeliefState::with_priors(&catalog(3), &[1.0, 3.0, 0.0]).unwrap();
        let top = belief.top_candidates(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0.id, 1);
        assert!((top[0].1 - 0.75).abs() < 1e-12);
    }

    #[test]
    fn answer_statistics_group_mixed_grades() {
        let mut belief = BeliefState::uniform(&catalog(3)).unwrap();
        let answers = [
            ("Is it in Asia?", "continent", AnswerGrade::StronglyYes),
            ("Is it in Europe?", "continent", AnswerGrade::No),
            ("Is English spoken?", "language", AnswerGrade::Unknown),
            ("Is it an island?", "isIsland", AnswerGrade::StronglyYes),
            ("Is it in Africa?", "continent", AnswerGrade::StronglyNo),
        ];
        for (index, (text, attribute, grade)) in answers.into_iter().enumerate() {
            belief.record(&Question::new(text, attribute, true), grade, 0);
            assert_eq!(belief.questions_asked(), index + 1);
        }

        let counts = belief.answer_counts();
        assert_eq!(counts.get(&AnswerGrade::StronglyYes), Some(&2));
        assert_eq!(counts.get(&AnswerGrade::No), Some(&1));
        assert_eq!(counts.get(&AnswerGrade::Unknown), Some(&1));
        assert_eq!(counts.get(&AnswerGrade::StronglyNo), Some(&1));
        assert_eq!(counts.get(&AnswerGrade::Yes), None);
        assert_eq!(counts.values().sum::<usize>(), answers.len());

        let usage = belief.attribute_usage();
        let usage: Vec<(&str, usize)> = usage.iter().map(|(a, n)| (a.as_str(), *n)).collect();
        assert_eq!(usage, vec![("continent", 3), ("isIsland", 1), ("language", 1)]);
        assert_eq!(belief.answer_history()[2].grade, AnswerGrade::Unknown);
    }

    #[test]
    fn questions_remaining_shrinks_as_belief_concentrates() {
        let uniform = BeliefState::uniform(&catalog(16)).unwrap();
        // 4 bits now, about 0.86 bits at a 90% leader over 16 candidates
        assert_eq!(uniform.estimate_questions_remaining(0.9, 0.3), 11);

        let settled = BeliefState::with_priors(&catalog(3), &[0.95, 0.025, 0.025]).unwrap();
        assert_eq!(settled.estimate_questions_remaining(0.9, 0.3), 0);

        let single = BeliefState::uniform(&catalog(1)).unwrap();
        assert_eq!(single.estimate_questions_remaining(0.9, 0.3), 0);
    }

    #[test]
    fn entropy_guards_zero_mass() {
        assert_eq!(entropy(Vec::<f64>::new()), 0.0);
        assert_eq!(entropy(vec![0.0, 0.0]), 0.0);
        assert_eq!(entropy(vec![5.0]), 0.0);
    }
}
