//! Question selection by expected information gain.

use crate::belief::{BeliefState, entropy};
use crate::config::EngineConfig;
use crate::matcher::matches;
use crate::model::{AnswerGrade, Question};
use rand::Rng;
use std::collections::HashMap;

/// Key standing in for an absent attribute when checking for remaining variety.
const MISSING_KEY: &str = "null";
/// Context score before any related attribute has been answered.
const NEUTRAL_CONTEXT: f64 = 0.5;
const CERTAIN_ANSWER_LIFT: f64 = 0.2;
const UNKNOWN_ANSWER_DROP: f64 = 0.1;

/// Score breakdown for one candidate question.
#[derive(Debug, Clone, Copy)]
pub struct ScoredQuestion<'q> {
    pub question: &'q Question,
    /// Normalized entropy reduction in `[0, 1]`, before the static weight is applied.
    pub info_gain: f64,
    /// Weight share of candidates that match the question.
    pub match_share: f64,
    /// Context score in `[0, 1]` from answers on the same attribute family.
    pub context: f64,
    pub score: f64,
}

/// Returns the highest scoring unasked, non-redundant question.
pub fn select_best_question<'q, R: Rng + ?Sized>(
    catalog: &'q [Question],
    belief: &BeliefState,
    config: &EngineConfig,
    rng: &mut R,
) -> Option<&'q Question> {
    best_scored_question(catalog, belief, config, rng).map(|scored| scored.question)
}

/// Like [`select_best_question`], keeping the score breakdown. Ties go to the earlier question.
pub fn best_scored_question<'q, R: Rng + ?Sized>(
    catalog: &'q [Question],
    belief: &BeliefState,
    config: &EngineConfig,
    rng: &mut R,
) -> Option<ScoredQuestion<'q>> {
    let mut best: Option<ScoredQuestion<'q>> = None;
    for scored in score_questions(catalog, belief, config, rng) {
        if best.is_none_or(|current| scored.score > current.score) {
            best = Some(scored);
        }
    }
    best
}

/// Scores every eligible question, in catalog order.
///
/// Jitter is drawn once per eligible question in that order, so a seeded `rng` reproduces the
/// same scores for the same belief.
pub fn score_questions<'q, R: Rng + ?Sized>(
    catalog: &'q [Question],
    belief: &BeliefState,
    config: &EngineConfig,
    rng: &mut R,
) -> Vec<ScoredQuestion<'q>> {
    if belief.is_empty() {
        return Vec::new();
    }

    let eligible = eligible_questions(catalog, belief, config);
    let stage = belief.stage();
    let total = belief.total_weight();
    let current_entropy = belief.entropy();

    eligible
        .into_iter()
        .map(|question| {
            let (info_gain, match_share) = information_gain(question, belief, config, total, current_entropy);
            let mut score = info_gain * question.weight;
            if question.stage == stage {
                score += config.stage_bonus;
            }
            score += config.balance_bonus * (1.0 - (2.0 * match_share - 1.0).abs());
            score += config.importance_bonus * belief.importance().get(&question.attribute);
            let context = context_score(belief, config, &question.attribute);
            score += config.context_bonus * context;
            if config.jitter > 0.0 {
                score += rng.gen_range(0.0..config.jitter);
            }
            ScoredQuestion {
                question,
                info_gain,
                match_share,
                context,
                score,
            }
        })
        .collect()
}

/// How settled the attributes related to `attribute` already are.
///
/// Starts at 0.5. Each certain answer (yes or no) on a related attribute adds 0.2 and each
/// "don't know" takes 0.1 away. Clamped to `[0, 1]`.
pub fn context_score(belief: &BeliefState, config: &EngineConfig, attribute: &str) -> f64 {
    let related: Vec<&str> = config.related_attributes(attribute).collect();
    if related.is_empty() {
        return NEUTRAL_CONTEXT;
    }
    belief
        .answer_history()
        .iter()
        .filter(|record| related.contains(&record.attribute.as_str()))
        .fold(NEUTRAL_CONTEXT, |score, record| match record.grade {
            AnswerGrade::StronglyYes | AnswerGrade::StronglyNo => score + CERTAIN_ANSWER_LIFT,
            AnswerGrade::Unknown => score - UNKNOWN_ANSWER_DROP,
            AnswerGrade::Yes | AnswerGrade::No => score,
        })
        .clamp(0.0, 1.0)
}

/// Unasked, non-redundant questions restricted to the reachable topic stages.
///
/// A question is redundant when its attribute no longer varies across the retained candidates,
/// or when under the configured match policy it would match all of them or none.
/// Falls back to every non-redundant question when the stage window is empty.
pub fn eligible_questions<'q>(
    catalog: &'q [Question],
    belief: &BeliefState,
    config: &EngineConfig,
) -> Vec<&'q Question> {
    let mut variety: HashMap<String, bool> = HashMap::new();
    let open: Vec<&Question> = catalog
        .iter()
        .filter(|question| !belief.is_asked(question))
        .filter(|question| belief.attribute_asks(&question.attribute) < config.max_attribute_asks)
        .filter(|question| {
            *variety
                .entry(question.attribute.clone())
                .or_insert_with(|| has_variety(belief, &question.attribute))
        })
        .filter(|question| splits_candidates(question, belief, config))
        .collect();

    let reachable = u16::from(belief.stage()) + 1;
    let staged: Vec<&Question> = open
        .iter()
        .copied()
        .filter(|question| u16::from(question.stage) <= reachable)
        .collect();

    if staged.is_empty() { open } else { staged }
}

/// Whether the retained candidates still disagree on `attribute`.
///
/// Candidates sharing a canonical key answer every question on the attribute alike under
/// either match policy, so this only prefilters. [`splits_candidates`] applies the policy.
fn has_variety(belief: &BeliefState, attribute: &str) -> bool {
    let mut keys = belief.candidates().iter().map(|candidate| {
        candidate
            .entity()
            .attribute(attribute)
            .map(|value| value.canonical_key())
            .unwrap_or_else(|| MISSING_KEY.to_string())
    });
    let Some(first) = keys.next() else {
        return false;
    };
    keys.any(|key| key != first)
}

/// Whether some retained candidate matches `question` and some other does not.
fn splits_candidates(question: &Question, belief: &BeliefState, config: &EngineConfig) -> bool {
    let mut outcomes = belief.candidates().iter().map(|candidate| {
        matches(
            candidate.entity().attribute(&question.attribute),
            &question.value,
            config.match_policy,
        )
    });
    let Some(first) = outcomes.next() else {
        return false;
    };
    outcomes.any(|outcome| outcome != first)
}

fn information_gain(
    question: &Question,
    belief: &BeliefState,
    config: &EngineConfig,
    total: f64,
    current_entropy: f64,
) -> (f64, f64) {
    if total <= 0.0 {
        return (0.0, 0.0);
    }

    let mut matched = Vec::new();
    let mut unmatched = Vec::new();
    for candidate in belief.candidates() {
        let is_match = matches(
            candidate.entity().attribute(&question.attribute),
            &question.value,
            config.match_policy,
        );
        if is_match {
            matched.push(candidate.weight());
        } else {
            unmatched.push(candidate.weight());
        }
    }

    let match_share = matched.iter().sum::<f64>() / total;
    if current_entropy <= 0.0 {
        return (0.0, match_share);
    }

    let expected = match_share * entropy(matched) + (1.0 - match_share) * entropy(unmatched);
    let gain = ((current_entropy - expected) / current_entropy).clamp(0.0, 1.0);
    (gain, match_share)
}
