use crate::config::ValidationError;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Graded user response to a yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerGrade {
    StronglyYes,
    Yes,
    Unknown,
    No,
    StronglyNo,
}

impl AnswerGrade {
    pub const ALL: [AnswerGrade; 5] = [
        AnswerGrade::StronglyYes,
        AnswerGrade::Yes,
        AnswerGrade::Unknown,
        AnswerGrade::No,
        AnswerGrade::StronglyNo,
    ];

    /// Short label used by front ends (`yes`, `probably`, `dontknow`, `probablynot`, `no`).
    pub const fn label(self) -> &'static str {
        match self {
            AnswerGrade::StronglyYes => "yes",
            AnswerGrade::Yes => "probably",
            AnswerGrade::Unknown => "dontknow",
            AnswerGrade::No => "probablynot",
            AnswerGrade::StronglyNo => "no",
        }
    }

    pub const fn is_affirmative(self) -> bool {
        matches!(self, AnswerGrade::StronglyYes | AnswerGrade::Yes)
    }

    pub const fn is_negative(self) -> bool {
        matches!(self, AnswerGrade::No | AnswerGrade::StronglyNo)
    }

    /// Grade with the opposite polarity and the same strength.
    pub const fn flipped(self) -> Self {
        match self {
            AnswerGrade::StronglyYes => AnswerGrade::StronglyNo,
            AnswerGrade::Yes => AnswerGrade::No,
            AnswerGrade::Unknown => AnswerGrade::Unknown,
            AnswerGrade::No => AnswerGrade::Yes,
            AnswerGrade::StronglyNo => AnswerGrade::StronglyYes,
        }
    }

    /// Same polarity with the hedged strength.
    pub const fn softened(self) -> Self {
        match self {
            AnswerGrade::StronglyYes => AnswerGrade::Yes,
            AnswerGrade::StronglyNo => AnswerGrade::No,
            other => other,
        }
    }
}

impl fmt::Display for AnswerGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised answer '{0}'")]
pub struct ParseAnswerError(pub String);

impl FromStr for AnswerGrade {
    type Err = ParseAnswerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' ' | '\''))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "yes" | "stronglyyes" | "definitelyyes" => Ok(AnswerGrade::StronglyYes),
            "probably" | "probablyyes" => Ok(AnswerGrade::Yes),
            "dontknow" | "unknown" | "idk" => Ok(AnswerGrade::Unknown),
            "probablynot" | "probablyno" => Ok(AnswerGrade::No),
            "no" | "stronglyno" | "definitelyno" => Ok(AnswerGrade::StronglyNo),
            _ => Err(ParseAnswerError(raw.to_string())),
        }
    }
}

/// Multipliers applied to an entity's weight depending on whether it matches the question.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodFactors {
    #[serde(rename = "match")]
    pub matched: f64,
    #[serde(rename = "mismatch")]
    pub mismatched: f64,
}

impl LikelihoodFactors {
    pub const fn new(matched: f64, mismatched: f64) -> Self {
        Self {
            matched,
            mismatched,
        }
    }

    pub fn for_match(&self, is_match: bool) -> f64 {
        if is_match {
            self.matched
        } else {
            self.mismatched
        }
    }
}

/// Likelihood factors for every answer grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikelihoodTable {
    pub strongly_yes: LikelihoodFactors,
    pub yes: LikelihoodFactors,
    pub unknown: LikelihoodFactors,
    pub no: LikelihoodFactors,
    pub strongly_no: LikelihoodFactors,
}

impl Default for LikelihoodTable {
    fn default() -> Self {
        Self {
            strongly_yes: LikelihoodFactors::new(2.5, 0.005),
            yes: LikelihoodFactors::new(2.0, 0.01),
            unknown: LikelihoodFactors::new(1.0, 1.0),
            no: LikelihoodFactors::new(0.01, 2.0),
            strongly_no: LikelihoodFactors::new(0.005, 2.5),
        }
    }
}

impl LikelihoodTable {
    pub fn factors(&self, grade: AnswerGrade) -> LikelihoodFactors {
        match grade {
            AnswerGrade::StronglyYes => self.strongly_yes,
            AnswerGrade::Yes => self.yes,
            AnswerGrade::Unknown => self.unknown,
            AnswerGrade::No => self.no,
            AnswerGrade::StronglyNo => self.strongly_no,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for grade in AnswerGrade::ALL {
            let factors = self.factors(grade);
            let field = format!("likelihood.{}", grade.label());
            let positive = |value: f64| value.is_finite() && value > 0.0;
            if !positive(factors.matched) || !positive(factors.mismatched) {
                return Err(ValidationError::invalid(
                    field,
                    "factors must be positive and finite",
                ));
            }
            let ordered = if grade.is_affirmative() {
                factors.matched > factors.mismatched
            } else if grade.is_negative() {
                factors.matched < factors.mismatched
            } else {
                factors.matched == factors.mismatched
            };
            if !ordered {
                return Err(ValidationError::invalid(
                    field,
                    "match/mismatch ordering does not agree with the answer polarity",
                ));
            }
        }
        Ok(())
    }
}
