use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use geoai_core::ConfidenceLevel;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::runner::GameOutcome;

/// Two-sided coverage of the reported accuracy interval.
const CONFIDENCE_LEVEL: f64 = 0.95;
/// Confused pairs listed in the summary.
const TOP_CONFUSIONS: usize = 5;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("no games were recorded")]
    NoGames,
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build normal distribution: {0}")]
    Distribution(String),
}

pub struct AnalyticsCollector {
    max_questions: usize,
    games: usize,
    correct: usize,
    questions: Vec<usize>,
    confidences: Vec<u8>,
    levels: BTreeMap<ConfidenceLevel, usize>,
    stop_reasons: BTreeMap<String, usize>,
    confusions: HashMap<(String, String), usize>,
}

impl AnalyticsCollector {
    pub fn new(max_questions: usize) -> Self {
        Self {
            max_questions,
            games: 0,
            correct: 0,
            questions: Vec::new(),
            confidences: Vec::new(),
            levels: BTreeMap::new(),
            stop_reasons: BTreeMap::new(),
            confusions: HashMap::new(),
        }
    }

    pub fn record_game(&mut self, outcome: &GameOutcome) {
        self.games += 1;
        if outcome.correct {
            self.correct += 1;
        } else {
            let guess = outcome.guess.clone().unwrap_or_else(|| "<none>".to_string());
            *self
                .confusions
                .entry((outcome.target.clone(), guess))
                .or_insert(0) += 1;
        }
        self.questions.push(outcome.questions);
        self.confidences.push(outcome.confidence);
        *self
            .levels
            .entry(ConfidenceLevel::from_confidence(outcome.confidence))
            .or_insert(0) += 1;
        *self
            .stop_reasons
            .entry(outcome.stop_reason.clone())
            .or_insert(0) += 1;
    }

    pub fn finalize(self) -> Result<AccuracySummary, AnalyticsError> {
        if self.games == 0 {
            return Err(AnalyticsError::NoGames);
        }

        let accuracy = self.correct as f64 / self.games as f64;
        let ci95 = proportion_interval(accuracy, self.games, CONFIDENCE_LEVEL)?;
        let avg_questions = mean(self.questions.iter().map(|q| *q as f64));
        let avg_confidence = mean(self.confidences.iter().map(|c| f64::from(*c)));
        let max_questions_used = self.questions.iter().copied().max().unwrap_or(0);

        let mut confused: Vec<ConfusedPair> = self
            .confusions
            .into_iter()
            .map(|((target, guess), count)| ConfusedPair {
                target,
                guess,
                count,
            })
            .collect();
        confused.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.target.cmp(&b.target))
                .then_with(|| a.guess.cmp(&b.guess))
        });
        confused.truncate(TOP_CONFUSIONS);

        Ok(AccuracySummary {
            games: self.games,
            correct: self.correct,
            accuracy,
            ci95,
            avg_questions,
            max_questions_used,
            question_limit: self.max_questions,
            avg_confidence,
            levels: ConfidenceLevel::ALL
                .iter()
                .map(|level| (*level, self.levels.get(level).copied().unwrap_or(0)))
                .collect(),
            stop_reasons: self.stop_reasons,
            confused,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfusedPair {
    pub target: String,
    pub guess: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccuracySummary {
    pub games: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub ci95: (f64, f64),
    pub avg_questions: f64,
    pub max_questions_used: usize,
    pub question_limit: usize,
    pub avg_confidence: f64,
    pub levels: Vec<(ConfidenceLevel, usize)>,
    pub stop_reasons: BTreeMap<String, usize>,
    pub confused: Vec<ConfusedPair>,
}

impl AccuracySummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>, run_id: &str) -> Result<(), AnalyticsError> {
        let mut doc = String::new();
        doc.push_str(&format!("# Accuracy Summary: {run_id}\n\n"));
        doc.push_str("| Games | Correct | Accuracy | 95% CI | Avg questions | Max questions | Avg confidence |\n");
        doc.push_str("|-------|---------|----------|--------|---------------|---------------|----------------|\n");
        doc.push_str(&format!(
            "| {games} | {correct} | {acc:.1}% | [{low:.1}%, {high:.1}%] | {avg_q:.2} | {max_q} / {limit} | {conf:.1} |\n\n",
            games = self.games,
            correct = self.correct,
            acc = self.accuracy * 100.0,
            low = self.ci95.0 * 100.0,
            high = self.ci95.1 * 100.0,
            avg_q = self.avg_questions,
            max_q = self.max_questions_used,
            limit = self.question_limit,
            conf = self.avg_confidence,
        ));

        doc.push_str("## Final confidence\n\n| Level | Games |\n|-------|-------|\n");
        for (level, count) in &self.levels {
            doc.push_str(&format!("| {} | {count} |\n", level.label()));
        }

        doc.push_str("\n## Stop reasons\n\n| Reason | Games |\n|--------|-------|\n");
        for (reason, count) in &self.stop_reasons {
            doc.push_str(&format!("| {reason} | {count} |\n"));
        }

        doc.push_str("\n## Most confused\n\n");
        if self.confused.is_empty() {
            doc.push_str("No incorrect guesses.\n");
        } else {
            doc.push_str("| Target | Guess | Count |\n|--------|-------|-------|\n");
            for pair in &self.confused {
                doc.push_str(&format!("| {} | {} | {} |\n", pair.target, pair.guess, pair.count));
            }
        }

        fs::write(path.as_ref(), doc).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Normal-approximation interval for a proportion, clamped to `[0, 1]`.
fn proportion_interval(p: f64, n: usize, level: f64) -> Result<(f64, f64), AnalyticsError> {
    if n == 0 {
        return Ok((0.0, 0.0));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|err| AnalyticsError::Distribution(err.to_string()))?;
    let z = normal.inverse_cdf(0.5 + level / 2.0);
    let margin = z * (p * (1.0 - p) / n as f64).sqrt();
    Ok(((p - margin).max(0.0), (p + margin).min(1.0)))
}
