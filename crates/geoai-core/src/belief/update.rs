//! Multiplicative belief update for a graded answer.

use super::state::{BeliefState, Candidate};
use crate::config::EngineConfig;
use crate::matcher::matches;
use crate::model::{AnswerGrade, Question};

/// Bookkeeping reported by [`apply_answer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateStats {
    pub retained: usize,
    pub pruned: usize,
    /// Bits of information the answer moved the belief by, before pruning.
    pub kl_divergence: f64,
}

/// Scales every candidate by the answer's likelihood, renormalizes, soft-prunes and re-ranks.
///
/// Weights are floored at `config.weight_floor` so no single answer can eliminate a candidate
/// outright; removal only happens through pruning, which always keeps the
/// `config.min_retained` heaviest candidates.
pub fn apply_answer(
    belief: &mut BeliefState,
    question: &Question,
    grade: AnswerGrade,
    config: &EngineConfig,
) -> UpdateStats {
    let factors = config.likelihood.factors(grade);
    let candidates = belief.candidates_mut();
    let priors: Vec<f64> = candidates.iter().map(Candidate::weight).collect();

    for candidate in candidates.iter_mut() {
        let is_match = matches(
            candidate.entity().attribute(&question.attribute),
            &question.value,
            config.match_policy,
        );
        let weight = (candidate.weight() * factors.for_match(is_match)).max(config.weight_floor);
        candidate.set_weight(weight);
    }
    normalize(candidates);
    let kl_divergence = kl_divergence(&priors, candidates);

    sort_descending(candidates);
    let pruned = soft_filter(candidates, config);
    if pruned > 0 {
        normalize(candidates);
    }

    let retained = candidates.len();
    let next_stage = config.stage_for(belief.questions_asked() + 1);
    belief.record(question, grade, next_stage);

    UpdateStats {
        retained,
        pruned,
        kl_divergence,
    }
}

fn normalize(candidates: &mut [Candidate]) {
    let total: f64 = candidates.iter().map(Candidate::weight).sum();
    if total <= 0.0 || !total.is_finite() {
        return;
    }
    for candidate in candidates.iter_mut() {
        candidate.set_weight(candidate.weight() / total);
    }
}

/// `D(posterior || prior)` in bits. `priors` is in the same order as `posterior`.
fn kl_divergence(priors: &[f64], posterior: &[Candidate]) -> f64 {
    let prior_total: f64 = priors.iter().sum();
    if prior_total <= 0.0 || !prior_total.is_finite() {
        return 0.0;
    }
    let divergence: f64 = priors
        .iter()
        .zip(posterior)
        .filter(|(prior, candidate)| **prior > 0.0 && candidate.weight() > 0.0)
        .map(|(prior, candidate)| {
            let after = candidate.weight();
            after * (after / (prior / prior_total)).log2()
        })
        .sum();
    divergence.max(0.0)
}

fn sort_descending(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.weight().total_cmp(&a.weight()));
}

/// Drops candidates below both the absolute and the relative threshold.
///
/// The relative threshold is a fraction of the `min_retained`-th weight. Once that weight has
/// itself fallen under `prune_threshold`, everything after it is under the absolute threshold
/// too and the list is cut to `min_retained`, so tails tied at the weight floor cannot survive
/// on the relative bound alone.
///
/// Expects `candidates` sorted by descending weight.
fn soft_filter(candidates: &mut Vec<Candidate>, config: &EngineConfig) -> usize {
    let keep = config.min_retained.max(1);
    if candidates.len() <= keep {
        return 0;
    }

    let before = candidates.len();
    let kth = candidates[keep - 1].weight();
    if kth < config.prune_threshold {
        candidates.truncate(keep);
    } else {
        let relative = kth * config.relative_prune_ratio;
        candidates.retain(|candidate| {
            candidate.weight() >= config.prune_threshold || candidate.weight() >= relative
        });
    }
    before - candidates.len()
}
