use geoai_core::matcher::{MatchPolicy, matches};
use geoai_core::model::{AnswerGrade, Entity, Question};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::config::PlayerConfig;

/// Answers questions on behalf of a player thinking of `target`.
///
/// Truthful answers are emphatic. `hedge` softens an answer to probably/probably not and
/// `noise` flips it; both are drawn independently per question.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    target: Arc<Entity>,
    policy: MatchPolicy,
    hedge: f64,
    noise: f64,
    rng: StdRng,
}

impl SimulatedPlayer {
    pub fn new(target: Arc<Entity>, config: PlayerConfig, policy: MatchPolicy, seed: u64) -> Self {
        Self {
            target,
            policy,
            hedge: config.hedge.clamp(0.0, 1.0),
            noise: config.noise.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn target(&self) -> &Entity {
        &self.target
    }

    pub fn answer(&mut self, question: &Question) -> AnswerGrade {
        let truthful = matches(
            self.target.attribute(&question.attribute),
            &question.value,
            self.policy,
        );
        let mut grade = if truthful {
            AnswerGrade::StronglyYes
        } else {
            AnswerGrade::StronglyNo
        };
        if self.hedge > 0.0 && self.rng.gen_bool(self.hedge) {
            grade = grade.softened();
        }
        if self.noise > 0.0 && self.rng.gen_bool(self.noise) {
            grade = grade.flipped();
        }
        grade
    }
}
