use crate::config::ValidationError;
use thiserror::Error;

/// Errors the engine reports to its caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("cannot start a game with an empty entity catalog")]
    EmptyCatalog,
    #[error("expected {expected} prior weights, found {found}")]
    PriorLengthMismatch { expected: usize, found: usize },
    #[error("prior weight {value} at index {index} must be finite and non-negative")]
    InvalidPrior { index: usize, value: f64 },
    #[error("prior weights sum to zero")]
    ZeroPriorMass,
    #[error("no question is awaiting an answer")]
    NoPendingQuestion,
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
}
