use std::path::PathBuf;

use clap::Parser;

use memory_bench::config::{BenchmarkConfig, ResolvedOutputs};
use memory_bench::logging::init_logging;
use memory_bench::tournament::TournamentRunner;

/// Tournament benchmarking harness for memory bots.
#[derive(Debug, Parser)]
#[command(
    name = "memory-bench",
    author,
    version,
    about = "Deterministic memory-game tournament harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of boards to deal.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the RNG seed for board generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the number of seat permutations per board (1 or 2).
    #[arg(long, value_name = "COUNT")]
    permutations: Option<usize>,

    /// Exit after validating the configuration (no tournament is run).
    #[arg(long)]
    validate_only: bool,

    /// Log every memory-bot guess regardless of config.
    #[arg(long)]
    verbose_bots: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(games) = cli.games {
        config.games.count = games;
    }

    if let Some(seed) = cli.seed {
        config.games.seed = Some(seed);
    }

    if let Some(permutations) = cli.permutations {
        config.games.permutations = permutations;
    }

    if cli.verbose_bots {
        config.logging.guess_details = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let games = config.games.count;
    let permutations = config.games.permutations;

    let _logging_guard = init_logging(&config.logging, &outputs, &run_id)?;
    let runner = TournamentRunner::new(config, outputs)?;
    let layout = runner.layout();

    println!(
        "Loaded configuration '{run_id}' ({games} games, {permutations} permutations) on a {}x{} board with {} pairs",
        layout.columns(),
        layout.rows(),
        layout.pair_count()
    );

    if cli.validate_only {
        println!("Validation-only mode: tournament execution skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Tournament complete for '{run_id}': {} games × {} permutations → {} rows at {}",
        summary.games_played,
        summary.permutations,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    if let Some(outputs) = summary.telemetry_outputs.as_ref() {
        println!("Telemetry summary (JSON): {}", outputs.json_path.display());
        println!(
            "Telemetry summary (Markdown): {}",
            outputs.markdown_path.display()
        );
        println!(
            "  Reveals: {} events, sources {:?}",
            outputs.summary.reveals.count, outputs.summary.reveals.source_counts
        );
        if outputs.summary.guesses.count > 0 {
            println!(
                "  Bot guesses: {} events, modes {:?}",
                outputs.summary.guesses.count, outputs.summary.guesses.mode_counts
            );
        }
    }

    Ok(())
}
