use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geoai_core::model::{Entity, Question};
use geoai_core::{ConfidenceLevel, Engine, EngineError, Session};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{BenchmarkConfig, ResolvedOutputs};
use crate::dataset::{self, DatasetError};
use crate::logging;
use crate::player::SimulatedPlayer;

/// Stop label recorded when the selector ran out of questions before the policy guessed.
const EXHAUSTED: &str = "questions_exhausted";

/// Plays a batch of simulated games against one catalog.
pub struct BenchRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    engine: Engine,
    entities: Vec<Arc<Entity>>,
    questions: Arc<[Question]>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub games_played: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
}

/// Result of one simulated game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    pub game_index: usize,
    pub game_seed: u64,
    pub target: String,
    pub guess: Option<String>,
    pub correct: bool,
    pub questions: usize,
    pub confidence: u8,
    pub remaining: usize,
    pub stop_reason: String,
}

#[derive(Debug, Serialize)]
struct GameLogRow<'a> {
    run_id: &'a str,
    game_id: String,
    game_index: usize,
    game_seed: u64,
    target: &'a str,
    guess: Option<&'a str>,
    correct: bool,
    questions: usize,
    confidence: u8,
    level: ConfidenceLevel,
    remaining: usize,
    stop_reason: &'a str,
}

impl BenchRunner {
    /// Build a runner from a validated configuration, loading the catalogs it names.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let entities = dataset::load_entities(&config.catalog.entities)?;
        let questions = match config.catalog.questions.as_ref() {
            Some(path) => dataset::load_questions(path)?,
            None => dataset::generate_questions(&entities),
        };
        Self::from_catalog(config, outputs, entities, questions)
    }

    /// Build a runner over catalogs that are already in memory.
    pub fn from_catalog(
        config: BenchmarkConfig,
        outputs: ResolvedOutputs,
        entities: Vec<Arc<Entity>>,
        questions: Vec<Question>,
    ) -> Result<Self, RunnerError> {
        if entities.is_empty() {
            return Err(RunnerError::Engine(EngineError::EmptyCatalog));
        }
        let engine = Engine::new(config.engine.clone())?;
        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            engine,
            entities,
            questions: questions.into(),
        })
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Number of games a run will play.
    pub fn game_count(&self) -> usize {
        self.config.games.count.unwrap_or(self.entities.len())
    }

    /// Execute every game, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut analytics = AnalyticsCollector::new(self.config.max_questions());
        let mut rows_written = 0usize;

        for game_index in 0..self.game_count() {
            let target = Arc::clone(&self.entities[game_index % self.entities.len()]);
            let game_seed = rng.next_u64();
            let player_seed = rng.next_u64();
            let outcome = self.play_game(game_index, game_seed, player_seed, target)?;
            analytics.record_game(&outcome);
            write_game_row(&mut writer, &self.config.run_id, &outcome)?;
            rows_written += 1;
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md, &self.config.run_id)?;

        let telemetry_path = if self.logging_enabled {
            Some(logging::telemetry_path(&self.outputs))
        } else {
            None
        };

        Ok(RunSummary {
            games_played: summary.games,
            correct: summary.correct,
            accuracy: summary.accuracy,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
        })
    }

    fn play_game(
        &self,
        game_index: usize,
        game_seed: u64,
        player_seed: u64,
        target: Arc<Entity>,
    ) -> Result<GameOutcome, RunnerError> {
        let mut session = Session::with_seed(
            self.engine.clone(),
            &self.entities,
            Arc::clone(&self.questions),
            game_seed,
        )?
        .with_max_questions(self.config.max_questions());
        let mut player = SimulatedPlayer::new(
            Arc::clone(&target),
            self.config.player,
            self.engine.config().match_policy,
            player_seed,
        );

        while let Some(question) = session.next_question() {
            let grade = player.answer(question);
            session.answer(grade)?;
        }

        let prediction = session.prediction();
        let stop_reason = session
            .decision()
            .reason()
            .map(|reason| reason.as_str())
            .unwrap_or(EXHAUSTED);
        let guess = prediction.guess.as_ref();
        let outcome = GameOutcome {
            game_index,
            game_seed,
            target: target.name.clone(),
            guess: guess.map(|entity| entity.name.clone()),
            correct: guess.is_some_and(|entity| entity.id == target.id),
            questions: prediction.questions_asked,
            confidence: prediction.confidence,
            remaining: prediction.remaining_entities,
            stop_reason: stop_reason.to_string(),
        };

        if self.logging_enabled && tracing::enabled!(target: "geoai_bench::game", Level::INFO) {
            event!(
                target: "geoai_bench::game",
                Level::INFO,
                run_id = %self.config.run_id,
                game_index = game_index as u32,
                target = %outcome.target,
                guess = outcome.guess.as_deref().unwrap_or("<none>"),
                correct = outcome.correct,
                questions = outcome.questions as u32,
                confidence = outcome.confidence,
                stop_reason = %outcome.stop_reason
            );
        }

        Ok(outcome)
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_game_row(
    writer: &mut BufWriter<File>,
    run_id: &str,
    outcome: &GameOutcome,
) -> Result<(), RunnerError> {
    let row = GameLogRow {
        run_id,
        game_id: format!("G{:05}", outcome.game_index),
        game_index: outcome.game_index,
        game_seed: outcome.game_seed,
        target: &outcome.target,
        guess: outcome.guess.as_deref(),
        correct: outcome.correct,
        questions: outcome.questions,
        confidence: outcome.confidence,
        level: ConfidenceLevel::from_confidence(outcome.confidence),
        remaining: outcome.remaining,
        stop_reason: &outcome.stop_reason,
    };
    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Dataset(#[from] DatasetError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, GamesConfig, LoggingConfig, OutputsConfig, PlayerConfig};
    use geoai_core::EngineConfig;
    use tempfile::tempdir;

    fn entities() -> Vec<Arc<Entity>> {
        [
            ("Japan", "asia", true, "left"),
            ("India", "asia", false, "left"),
            ("France", "europe", false, "right"),
            ("Iceland", "europe", true, "right"),
            ("Brazil", "americas", false, "right"),
        ]
        .into_iter()
        .enumerate()
        .map(|(id, (name, continent, island, drive))| {
            Arc::new(
                Entity::new(id as u32, name)
                    .with_attribute("continent", continent)
                    .with_attribute("isIsland", island)
                    .with_attribute("driveSide", drive),
            )
        })
        .collect()
    }

    fn config(dir: &Path, count: Option<usize>) -> BenchmarkConfig {
        BenchmarkConfig {
            run_id: "unit".to_string(),
            catalog: CatalogConfig {
                entities: dir.join("unused.json"),
                questions: None,
            },
            games: GamesConfig {
                seed: Some(9),
                count,
                max_questions: Some(12),
            },
            player: PlayerConfig::default(),
            engine: EngineConfig {
                min_retained: 2,
                ..EngineConfig::default()
            },
            outputs: OutputsConfig {
                jsonl: dir.join("games.jsonl").display().to_string(),
                summary_md: dir.join("summary.md").display().to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn plays_every_entity_once_by_default() {
        let dir = tempdir().expect("temp dir");
        let config = config(dir.path(), None);
        let outputs = config.resolved_outputs();
        let entities = entities();
        let questions = dataset::generate_questions(&entities);
        let runner = BenchRunner::from_catalog(config, outputs, entities, questions).unwrap();

        let summary = runner.run().expect("run completes");
        assert_eq!(summary.games_played, 5);
        assert_eq!(summary.rows_written, 5);
        assert_eq!(summary.correct, 5);
        assert!(summary.telemetry_path.is_none());

        let rows = fs::read_to_string(&summary.jsonl_path).unwrap();
        let first: serde_json::Value = serde_json::from_str(rows.lines().next().unwrap()).unwrap();
        assert_eq!(first["game_id"], "G00000");
        assert_eq!(first["target"], "Japan");
        assert_eq!(first["correct"], true);
    }

    #[test]
    fn honours_question_limit() {
        let dir = tempdir().expect("temp dir");
        let mut config = config(dir.path(), Some(3));
        config.games.max_questions = Some(1);
        let outputs = config.resolved_outputs();
        let entities = entities();
        let questions = dataset::generate_questions(&entities);
        let runner = BenchRunner::from_catalog(config, outputs, entities, questions).unwrap();

        let summary = runner.run().expect("run completes");
        assert_eq!(summary.games_played, 3);
        let rows = fs::read_to_string(&summary.jsonl_path).unwrap();
        for line in rows.lines() {
            let row: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(row["questions"], 1);
            assert_eq!(row["stop_reason"], "question_limit");
        }
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let dir = tempdir().expect("temp dir");
        let config = config(dir.path(), None);
        let outputs = config.resolved_outputs();
        assert!(matches!(
            BenchRunner::from_catalog(config, outputs, Vec::new(), Vec::new()),
            Err(RunnerError::Engine(EngineError::EmptyCatalog))
        ));
    }
}
