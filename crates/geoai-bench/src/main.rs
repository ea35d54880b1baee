use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use geoai_bench::config::{BenchmarkConfig, ResolvedOutputs};
use geoai_core::AppInfo;
use geoai_bench::logging::init_logging;
use geoai_bench::runner::BenchRunner;

/// Accuracy harness for the twenty-questions engine.
#[derive(Debug, Parser)]
#[command(
    name = "geoai-bench",
    author,
    version,
    about = "Deterministic simulated-game accuracy harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games to play.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the master RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the question ceiling per game.
    #[arg(long, value_name = "COUNT")]
    max_questions: Option<usize>,

    /// Override the probability that a simulated answer is flipped.
    #[arg(long, value_name = "PROB")]
    noise: Option<f64>,

    /// Exit after validating the configuration and catalog (no games are played).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(games) = cli.games {
        config.games.count = Some(games);
    }

    if let Some(seed) = cli.seed {
        config.games.seed = Some(seed);
    }

    if let Some(max_questions) = cli.max_questions {
        config.games.max_questions = Some(max_questions);
    }

    if let Some(noise) = cli.noise {
        config.player.noise = noise;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let catalog = config.catalog.entities.clone();

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = BenchRunner::new(config, outputs)
        .with_context(|| format!("preparing run '{run_id}' from {}", catalog.display()))?;

    let games = runner.game_count();
    println!(
        "{} {} ({})",
        AppInfo::name(),
        AppInfo::version(),
        AppInfo::codename()
    );
    println!(
        "Loaded configuration '{run_id}' with {} entities and {} questions ({games} game{})",
        runner.entity_count(),
        runner.question_count(),
        if games == 1 { "" } else { "s" }
    );

    if cli.validate_only {
        println!("Validation-only mode: game execution skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Run complete for '{run_id}': {}/{} correct ({:.1}%) → {} rows at {}",
        summary.correct,
        summary.games_played,
        summary.accuracy * 100.0,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
