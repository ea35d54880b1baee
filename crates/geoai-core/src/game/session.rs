use crate::belief::BeliefState;
use crate::engine::{Engine, Prediction, UpdateOutcome};
use crate::error::EngineError;
use crate::model::{AnswerGrade, Entity, Question};
use crate::stopping::StopDecision;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::Arc;

/// One game in progress: the belief, the question bank and the outstanding question.
///
/// Catalogs are shared; everything mutable belongs to this session and is dropped with it.
#[derive(Debug, Clone)]
pub struct Session {
    engine: Engine,
    belief: BeliefState,
    questions: Arc<[Question]>,
    rng: SmallRng,
    seed: u64,
    max_questions: usize,
    pending: Option<Question>,
}

impl Session {
    pub fn new(
        engine: Engine,
        entities: &[Arc<Entity>],
        questions: impl Into<Arc<[Question]>>,
    ) -> Result<Self, EngineError> {
        let seed: u64 = rand::random();
        Self::with_seed(engine, entities, questions, seed)
    }

    pub fn with_seed(
        engine: Engine,
        entities: &[Arc<Entity>],
        questions: impl Into<Arc<[Question]>>,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let belief = engine.initialize_belief(entities)?;
        let max_questions = engine.config().max_questions;
        Ok(Self {
            engine,
            belief,
            questions: questions.into(),
            rng: SmallRng::seed_from_u64(seed),
            seed,
            max_questions,
            pending: None,
        })
    }

    /// Overrides the engine question limit for this game. Zero is raised to one.
    pub fn with_max_questions(mut self, max_questions: usize) -> Self {
        self.max_questions = max_questions.max(1);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn belief(&self) -> &BeliefState {
        &self.belief
    }

    pub fn max_questions(&self) -> usize {
        self.max_questions
    }

    pub fn questions_asked(&self) -> usize {
        self.belief.questions_asked()
    }

    pub fn pending_question(&self) -> Option<&Question> {
        self.pending.as_ref()
    }

    pub fn decision(&self) -> StopDecision {
        self.engine
            .stop_decision(&self.belief, self.belief.questions_asked(), self.max_questions)
    }

    /// Question to put to the player next.
    ///
    /// Repeats the outstanding question until it is answered. Returns `None` once the
    /// stopping policy wants to guess or no useful question is left.
    pub fn next_question(&mut self) -> Option<&Question> {
        if self.pending.is_none() {
            if self.decision().is_guess() {
                return None;
            }
            self.pending = self
                .engine
                .next_question(&self.questions, &self.belief, &mut self.rng)
                .cloned();
        }
        self.pending.as_ref()
    }

    /// Applies `grade` to the outstanding question.
    pub fn answer(&mut self, grade: AnswerGrade) -> Result<UpdateOutcome, EngineError> {
        let question = self.pending.take().ok_or(EngineError::NoPendingQuestion)?;
        let mut outcome = self.engine.record_answer(&mut self.belief, &question, grade);
        outcome.decision = self.decision();
        Ok(outcome)
    }

    pub fn best_guess(&self) -> Option<&Entity> {
        self.engine.best_guess(&self.belief)
    }

    pub fn prediction(&self) -> Prediction {
        self.engine.prediction(&self.belief)
    }
}
