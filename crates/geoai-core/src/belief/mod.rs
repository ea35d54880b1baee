//! Per-game belief over candidate entities.
//!
//! This module is composed of:
//! - `state`: the weighted candidate list plus asked-question bookkeeping (`BeliefState`).
//! - `update`: the graded-answer multiplicative update with floor, renormalization and pruning.
//! - `importance`: catalog-derived attribute importance consulted by the selector.

mod importance;
mod state;
mod update;

pub use importance::AttributeImportance;
pub use state::{AnswerRecord, BeliefState, Candidate, entropy};
pub use update::{UpdateStats, apply_answer};
