//! JSON telemetry for bench runs.
//!
//! Engine decisions are emitted under [`ENGINE_TARGETS`] at DEBUG, one event per selected
//! question, applied answer and guess. The harness logs one INFO event per game.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, ResolvedOutputs};

/// Targets used by the engine's selector, updater and stopping events.
pub const ENGINE_TARGETS: [&str; 3] = [
    "geoai_core::select",
    "geoai_core::update",
    "geoai_core::stop",
];

const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// Keeps the background writer alive; dropping it flushes pending telemetry.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    pub telemetry_path: PathBuf,
}

/// Where a run with these outputs writes its telemetry.
pub fn telemetry_path(outputs: &ResolvedOutputs) -> PathBuf {
    outputs.summary_dir().join(TELEMETRY_FILE)
}

/// Filter directives for the configured levels.
///
/// The base level applies everywhere. Each engine target gets `engine_level` when set and the
/// base level otherwise, e.g. `info,geoai_core::select=debug,...`.
pub fn filter_directives(logging: &LoggingConfig) -> String {
    let base = logging.level().unwrap_or(Level::INFO);
    let engine = logging.engine_level().unwrap_or(base);
    let engine = engine.as_str().to_ascii_lowercase();

    let mut directives = vec![base.as_str().to_ascii_lowercase()];
    directives.extend(ENGINE_TARGETS.iter().map(|target| format!("{target}={engine}")));
    directives.join(",")
}

/// Route engine and game events to `telemetry.jsonl` next to the summary.
///
/// `RUST_LOG` takes precedence over [`filter_directives`] when set.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let telemetry_path = telemetry_path(outputs);
    if let Some(dir) = telemetry_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating telemetry directory at {}", dir.display()))?;
    }
    let file = File::create(&telemetry_path)
        .with_context(|| format!("creating telemetry file at {}", telemetry_path.display()))?;

    let (writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(logging)));

    // A subscriber may already be installed when several runs share a process.
    let _ = tracing::subscriber::set_global_default(json_subscriber(filter, writer));

    Ok(Some(LoggingGuard {
        _guard: guard,
        telemetry_path,
    }))
}

fn json_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoai_core::Engine;
    use geoai_core::model::{AnswerGrade, Entity, Question};
    use std::sync::Arc;

    fn logging(base: &str, engine: Option<&str>) -> LoggingConfig {
        LoggingConfig {
            enable_structured: true,
            tracing_level: base.to_string(),
            engine_level: engine.map(str::to_string),
        }
    }

    #[test]
    fn directives_name_engine_targets() {
        assert_eq!(
            filter_directives(&logging("warn", Some("debug"))),
            "warn,geoai_core::select=debug,geoai_core::update=debug,geoai_core::stop=debug"
        );
        assert_eq!(
            filter_directives(&LoggingConfig::default()),
            "info,geoai_core::select=info,geoai_core::update=info,geoai_core::stop=info"
        );
    }

    #[test]
    fn disabled_logging_installs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = ResolvedOutputs {
            jsonl: dir.path().join("games.jsonl"),
            summary_md: dir.path().join("summary.md"),
        };
        let config = LoggingConfig {
            enable_structured: false,
            ..logging("debug", None)
        };
        let guard = init_logging(&config, &outputs).unwrap();
        assert!(guard.is_none());
        assert!(!telemetry_path(&outputs).exists());
    }

    #[test]
    fn engine_events_are_written_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TELEMETRY_FILE);
        let file = File::create(&path).unwrap();
        let (writer, guard) = non_blocking::NonBlockingBuilder::default()
            .lossy(false)
            .finish(file);
        let filter = EnvFilter::new(filter_directives(&logging("warn", Some("debug"))));

        let entities: Vec<Arc<Entity>> = ["asia", "europe"]
            .into_iter()
            .enumerate()
            .map(|(id, continent)| {
                Arc::new(Entity::new(id as u32, format!("e{id}")).with_attribute("continent", continent))
            })
            .collect();
        let engine = Engine::default();
        let question = Question::new("Is it in Asia?", "continent", "asia");

        tracing::subscriber::with_default(json_subscriber(filter, writer), || {
            let mut belief = engine.initialize_belief(&entities).unwrap();
            engine.record_answer(&mut belief, &question, AnswerGrade::StronglyYes);
            tracing::event!(target: "geoai_bench::game", Level::INFO, game = 0_u64);
            tracing::event!(target: "geoai_bench::game", Level::WARN, game = 1_u64);
        });
        drop(guard);

        let rows: Vec<serde_json::Value> = fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(rows.len(), 2, "rows: {rows:?}");
        assert_eq!(rows[0]["target"], "geoai_core::update");
        assert_eq!(rows[0]["level"], "DEBUG");
        assert_eq!(rows[0]["fields"]["question"], "Is it in Asia?");
        assert_eq!(rows[0]["fields"]["grade"], "yes");
        assert_eq!(rows[1]["target"], "geoai_bench::game");
        assert_eq!(rows[1]["fields"]["game"], 1);
    }
}
