use geoai_core::EngineConfig;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

pub use geoai_core::ValidationError;

const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub games: GamesConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.catalog.validate()?;
        self.games.validate()?;
        self.player.validate()?;
        self.engine.validate().map_err(|err| match err {
            ValidationError::InvalidField { field, message } => ValidationError::InvalidField {
                field: format!("engine.{field}"),
                message,
            },
        })?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
        }
    }

    /// Question ceiling per game: the games block wins over the engine default.
    pub fn max_questions(&self) -> usize {
        self.games.max_questions.unwrap_or(self.engine.max_questions)
    }
}

/// Entity and question sources.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CatalogConfig {
    pub entities: PathBuf,
    /// Question bank; generated from entity attributes when absent.
    #[serde(default)]
    pub questions: Option<PathBuf>,
}

impl CatalogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.entities.as_os_str().is_empty() {
            return Err(ValidationError::invalid(
                "catalog.entities",
                "entity catalog path must not be empty",
            ));
        }
        if self
            .questions
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(ValidationError::invalid(
                "catalog.questions",
                "question catalog path must not be empty when set",
            ));
        }
        Ok(())
    }
}

/// Game scheduling block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GamesConfig {
    pub seed: Option<u64>,
    /// Number of games; every entity is played once when absent.
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub max_questions: Option<usize>,
}

impl GamesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == Some(0) {
            return Err(ValidationError::invalid(
                "games.count",
                "number of games must be greater than zero",
            ));
        }
        if self.max_questions == Some(0) {
            return Err(ValidationError::invalid(
                "games.max_questions",
                "max questions must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Simulated answerer behaviour.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
pub struct PlayerConfig {
    /// Probability that a truthful answer is softened to probably/probably not.
    #[serde(default)]
    pub hedge: f64,
    /// Probability that an answer is flipped.
    #[serde(default)]
    pub noise: f64,
}

impl PlayerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [("player.hedge", self.hedge), ("player.noise", self.noise)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::invalid(field, "probability must lie within [0, 1]"));
            }
        }
        Ok(())
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::invalid(label, "path must not be empty"));
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::invalid(label, "resolved path is invalid"));
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// Level for the engine's selector, updater and stopping events. Defaults to `tracing_level`.
    #[serde(default)]
    pub engine_level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            engine_level: None,
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        parse_level(&self.tracing_level)
    }

    pub fn engine_level(&self) -> Option<Level> {
        self.engine_level.as_deref().and_then(parse_level)
    }
}

fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::invalid("run_id", "run_id must not be empty"));
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::invalid(
            "run_id",
            "run_id may only contain alphanumeric characters, '.', '_' or '-'",
        ));
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
}

impl ResolvedOutputs {
    /// Directory holding the summary and, when enabled, `telemetry.jsonl`.
    pub fn summary_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "countries_smoke"
catalog:
  entities: "data/countries.json"
games:
  seed: 123
  count: 8
player:
  hedge: 0.2
engine:
  min_retained: 3
outputs:
  jsonl: "bench/out/{run_id}/games.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.games.count, Some(8));
        assert_eq!(cfg.engine.min_retained, 3);
        assert_eq!(cfg.engine.max_attribute_asks, 3);
        assert_eq!(cfg.max_questions(), 50);
        assert!(cfg.catalog.questions.is_none());
        assert!(cfg.logging.enable_structured);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/countries_smoke/games.jsonl")
        );
        assert_eq!(
            outputs.summary_dir(),
            PathBuf::from("bench/out/countries_smoke")
        );
    }

    #[test]
    fn rejects_noise_out_of_range() {
        let yaml = BASIC_YAML.replace("hedge: 0.2", "noise: 1.5");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "player.noise"
        ));
    }

    #[test]
    fn engine_errors_are_prefixed() {
        let yaml = BASIC_YAML.replace("min_retained: 3", "min_retained: 0");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("engine invalid");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "engine.min_retained"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("countries_smoke", "countries smoke");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn rejects_zero_games() {
        let yaml = BASIC_YAML.replace("count: 8", "count: 0");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/summary.md",
            "bench/out/{run_id}/{run_id}/summary.md",
        );
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.summary_md,
            PathBuf::from("bench/out/countries_smoke/countries_smoke/summary.md")
        );
    }
}
