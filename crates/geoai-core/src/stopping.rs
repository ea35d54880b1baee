//! Continue/guess decision after each answer.

use crate::belief::BeliefState;
use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};

/// Why the policy moved to the terminal guess state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    SingleCandidate,
    NoCandidates,
    QuestionLimit,
    ConfidenceReached,
    FewCandidates,
}

impl StopReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopReason::SingleCandidate => "single_candidate",
            StopReason::NoCandidates => "no_candidates",
            StopReason::QuestionLimit => "question_limit",
            StopReason::ConfidenceReached => "confidence_reached",
            StopReason::FewCandidates => "few_candidates",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum StopDecision {
    Continue,
    Guess(StopReason),
}

impl StopDecision {
    pub const fn is_guess(self) -> bool {
        matches!(self, StopDecision::Guess(_))
    }

    pub const fn reason(self) -> Option<StopReason> {
        match self {
            StopDecision::Continue => None,
            StopDecision::Guess(reason) => Some(reason),
        }
    }
}

/// Evaluates the guess triggers in order; the first that holds wins.
///
/// `confidence` is the current score for `belief`, computed by the caller so it is not
/// recomputed once per trigger.
pub fn decide(
    belief: &BeliefState,
    confidence: u8,
    questions_asked: usize,
    max_questions: usize,
    config: &EngineConfig,
) -> StopDecision {
    let remaining = belief.len();
    if remaining == 0 {
        return StopDecision::Guess(StopReason::NoCandidates);
    }
    if remaining == 1 {
        return StopDecision::Guess(StopReason::SingleCandidate);
    }
    if questions_asked >= max_questions {
        return StopDecision::Guess(StopReason::QuestionLimit);
    }
    if confidence >= config.required_confidence(questions_asked) {
        return StopDecision::Guess(StopReason::ConfidenceReached);
    }

    let rule = &config.early_guess;
    if remaining <= rule.max_candidates
        && confidence >= rule.min_confidence
        && questions_asked >= rule.min_questions
    {
        return StopDecision::Guess(StopReason::FewCandidates);
    }

    StopDecision::Continue
}
