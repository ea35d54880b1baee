#![deny(warnings)]
pub mod belief;
pub mod confidence;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod matcher;
pub mod model;
pub mod select;
pub mod stopping;

pub use belief::{AnswerRecord, BeliefState, Candidate};
pub use confidence::ConfidenceLevel;
pub use config::{EngineConfig, ValidationError};
pub use engine::{Engine, Prediction, RankedEntity, UpdateOutcome};
pub use error::EngineError;
pub use game::Session;
pub use matcher::MatchPolicy;
pub use model::{AnswerGrade, AttributeValue, Entity, Question};
pub use stopping::{StopDecision, StopReason};

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "geoai"
    }

    pub const fn codename() -> &'static str {
        "Twenty Questions"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::AppInfo;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(AppInfo::name(), "geoai");
        assert_eq!(AppInfo::codename(), "Twenty Questions");
        assert!(!AppInfo::version().is_empty());
    }
}
