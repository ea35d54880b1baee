//! Simulated-game harness measuring how often the engine names the right entity.

pub mod analytics;
pub mod config;
pub mod dataset;
pub mod logging;
pub mod player;
pub mod runner;
