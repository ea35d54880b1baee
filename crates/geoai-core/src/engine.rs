//! Stateless engine facade consumed by game orchestrators.
//!
//! An [`Engine`] only holds validated configuration. Everything a game mutates lives in the
//! caller-owned [`BeliefState`], so one engine can serve any number of sequential games
//! without leaking bookkeeping between them.

use crate::belief::{BeliefState, Candidate, apply_answer};
use crate::confidence::{ConfidenceLevel, confidence};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::{AnswerGrade, Entity, Question};
use crate::select::best_scored_question;
use crate::stopping::{StopDecision, decide};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{Level, event};

/// Runner-up candidates reported alongside a guess.
const ALTERNATIVES: usize = 3;

/// Result of recording one answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub confidence: u8,
    pub retained: usize,
    pub pruned: usize,
    /// Bits the answer moved the belief by.
    pub kl_divergence: f64,
    pub top_entity: Option<u32>,
    /// Stop decision against the configured question limit.
    pub decision: StopDecision,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntity {
    pub id: u32,
    pub name: String,
    /// Share of the retained weight.
    pub share: f64,
}

/// Snapshot handed to a front end when the engine guesses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub guess: Option<RankedEntity>,
    pub confidence: u8,
    pub level: ConfidenceLevel,
    pub alternatives: Vec<RankedEntity>,
    pub questions_asked: usize,
    pub total_entities: usize,
    pub remaining_entities: usize,
    pub estimated_questions_remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine configured from defaults plus `GEOAI_*` overrides.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh belief with uniform weights over `entities`.
    pub fn initialize_belief(&self, entities: &[Arc<Entity>]) -> Result<BeliefState, EngineError> {
        BeliefState::uniform(entities)
    }

    /// Fresh belief seeded from catalog-informed priors.
    pub fn initialize_belief_with_priors(
        &self,
        entities: &[Arc<Entity>],
        priors: &[f64],
    ) -> Result<BeliefState, EngineError> {
        BeliefState::with_priors(entities, priors)
    }

    /// Most informative question still worth asking, or `None` once the catalog is exhausted.
    pub fn next_question<'q, R: Rng + ?Sized>(
        &self,
        catalog: &'q [Question],
        belief: &BeliefState,
        rng: &mut R,
    ) -> Option<&'q Question> {
        let scored = best_scored_question(catalog, belief, &self.config, rng);
        if tracing::enabled!(target: "geoai_core::select", Level::DEBUG) {
            match &scored {
                Some(scored) => event!(
                    target: "geoai_core::select",
                    Level::DEBUG,
                    question = %scored.question.text,
                    attribute = %scored.question.attribute,
                    score = scored.score,
                    info_gain = scored.info_gain,
                    match_share = scored.match_share,
                    context = scored.context,
                    stage = belief.stage(),
                    candidates = belief.len()
                ),
                None => event!(
                    target: "geoai_core::select",
                    Level::DEBUG,
                    candidates = belief.len(),
                    asked = belief.questions_asked(),
                    "question catalog exhausted"
                ),
            }
        }
        scored.map(|scored| scored.question)
    }

    /// Applies `grade` for `question` and reports where the game stands afterwards.
    pub fn record_answer(
        &self,
        belief: &mut BeliefState,
        question: &Question,
        grade: AnswerGrade,
    ) -> UpdateOutcome {
        let stats = apply_answer(belief, question, grade, &self.config);
        let confidence = self.confidence(belief);
        let decision = decide(
            belief,
            confidence,
            belief.questions_asked(),
            self.config.max_questions,
            &self.config,
        );
        let top_entity = belief.top().map(|candidate| candidate.entity().id);

        if tracing::enabled!(target: "geoai_core::update", Level::DEBUG) {
            event!(
                target: "geoai_core::update",
                Level::DEBUG,
                question = %question.text,
                grade = grade.label(),
                retained = stats.retained,
                pruned = stats.pruned,
                kl_divergence = stats.kl_divergence,
                top = ?top_entity,
                confidence,
                asked = belief.questions_asked()
            );
        }

        UpdateOutcome {
            confidence,
            retained: stats.retained,
            pruned: stats.pruned,
            kl_divergence: stats.kl_divergence,
            top_entity,
            decision,
        }
    }

    pub fn confidence(&self, belief: &BeliefState) -> u8 {
        confidence(belief, &self.config)
    }

    pub fn should_stop(&self, belief: &BeliefState, questions_asked: usize, max_questions: usize) -> bool {
        self.stop_decision(belief, questions_asked, max_questions).is_guess()
    }

    pub fn stop_decision(
        &self,
        belief: &BeliefState,
        questions_asked: usize,
        max_questions: usize,
    ) -> StopDecision {
        let confidence = self.confidence(belief);
        let decision = decide(belief, confidence, questions_asked, max_questions, &self.config);
        if let StopDecision::Guess(reason) = decision {
            if tracing::enabled!(target: "geoai_core::stop", Level::DEBUG) {
                event!(
                    target: "geoai_core::stop",
                    Level::DEBUG,
                    reason = reason.as_str(),
                    confidence,
                    asked = questions_asked,
                    max_questions,
                    candidates = belief.len()
                );
            }
        }
        decision
    }

    /// Answers still expected before the leader reaches the configured target share.
    pub fn estimate_questions_remaining(&self, belief: &BeliefState) -> usize {
        belief.estimate_questions_remaining(
            self.config.estimate_target_share,
            self.config.estimate_bits_per_question,
        )
    }

    /// Heaviest retained candidate.
    pub fn best_guess<'b>(&self, belief: &'b BeliefState) -> Option<&'b Entity> {
        belief.top().map(Candidate::entity)
    }

    pub fn prediction(&self, belief: &BeliefState) -> Prediction {
        let confidence = self.confidence(belief);
        let mut ranked = belief
            .top_candidates(ALTERNATIVES + 1)
            .into_iter()
            .map(|(entity, share)| RankedEntity {
                id: entity.id,
                name: entity.name.clone(),
                share,
            });
        let guess = ranked.next();
        Prediction {
            guess,
            confidence,
            level: ConfidenceLevel::from_confidence(confidence),
            alternatives: ranked.collect(),
            questions_asked: belief.questions_asked(),
            total_entities: belief.total_entities(),
            remaining_entities: belief.len(),
            estimated_questions_remaining: self.estimate_questions_remaining(belief),
        }
    }
}
