mod seating;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use memory_bot::bot::{
    BotDifficulty, BotFeatures, Guess, GuessError, GuessSource, OpponentConfig, UnknownBias,
};
use memory_bot::policy::{MemoryPolicy, Policy, PolicyContext, RandomPolicy};
use memory_core::game::match_state::MatchState;
use memory_core::model::board::BoardError;
use memory_core::model::layout::{BoardLayout, LayoutError};
use memory_core::model::player::{Opponent, PlayerSlot, StartingPlayer};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{AgentConfig, AgentKind, BenchmarkConfig, ResolvedOutputs};
use crate::logging::TELEMETRY_FILE;
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};

use seating::SeatOrders;

const AGENT_COUNT: usize = 2;
/// Reveals allowed per dealt tile before a game is declared stuck.
const MAX_REVEALS_PER_TILE: usize = 1_000;

/// Primary entry point for orchestrating tournaments.
pub struct TournamentRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    layout: BoardLayout,
    agents: Vec<AgentBlueprint>,
    seat_orders: SeatOrders,
    logging_enabled: bool,
    bot_features: BotFeatures,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub permutations: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

impl TournamentRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let env_features = BotFeatures::from_env();
        let bot_features =
            env_features.with_verbose(env_features.verbose() || config.logging.guess_details);
        let agents = AgentBlueprint::from_configs(&config.agents, bot_features)?;

        if agents.len() != AGENT_COUNT {
            return Err(RunnerError::SeatCount {
                found: agents.len(),
            });
        }

        let layout = config.board.layout()?;
        let seat_orders = SeatOrders::new(config.games.permutations);

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            layout,
            agents,
            seat_orders,
            bot_features,
        })
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    /// Execute the tournament, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let orders = self.seat_orders.as_slice();
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut analytics = AnalyticsCollector::new(&self.config)?;

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "memory_bench::run",
                Level::INFO,
                run_id = %self.config.run_id,
                games = self.config.games.count as u64,
                permutations = orders.len() as u64,
                columns = self.layout.columns(),
                rows = self.layout.rows(),
                tiles = self.layout.tile_count(),
                verbose_bots = self.bot_features.verbose(),
            );
        }

        for game_index in 0..self.config.games.count {
            let base_seed = rng.next_u64();

            for (perm_index, order) in orders.iter().enumerate() {
                let outcome = self.play_game(game_index, perm_index, base_seed, order)?;
                analytics.record_game(game_index, perm_index, &outcome)?;
                rows_written += write_game_rows(
                    &mut writer,
                    &self.config,
                    game_index,
                    perm_index,
                    base_seed,
                    &outcome,
                )?;
            }
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;

        let telemetry_dir = self.outputs.summary_dir();
        let telemetry_path = if self.logging_enabled {
            Some(telemetry_dir.join(TELEMETRY_FILE))
        } else {
            None
        };

        let telemetry_outputs = if let Some(path) = telemetry_path.as_ref() {
            write_summary_outputs(path, &telemetry_dir)?
        } else {
            None
        };

        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            games_played: self.config.games.count,
            permutations: orders.len(),
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
            telemetry_outputs,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn game_id(game_index: usize, permutation_index: usize) -> String {
    format!("G{game_index:05}_P{permutation_index:02}")
}

fn write_game_rows(
    writer: &mut BufWriter<File>,
    config: &BenchmarkConfig,
    game_index: usize,
    permutation_index: usize,
    base_seed: u64,
    outcome: &GameOutcome,
) -> Result<usize, RunnerError> {
    let game_id = game_id(game_index, permutation_index);

    let mut rows_written = 0usize;
    for seat_result in &outcome.seat_results {
        let row = GameLogRow {
            run_id: config.run_id.clone(),
            game_id: game_id.clone(),
            game_index,
            permutation_index,
            game_seed: base_seed,
            seat: seat_result.slot.to_string(),
            bot: seat_result.agent_name.clone(),
            seating: outcome.seating.clone(),
            pairs: seat_result.pairs,
            mistakes: seat_result.mistakes,
            turns: seat_result.turns,
            won: outcome.winner == Some(seat_result.slot),
            tie: outcome.winner.is_none(),
            memory_guesses: seat_result.memory_guesses,
            speed_ms_decision: seat_result.metrics.avg_ms_per_decision,
            decisions: seat_result.metrics.decisions,
        };

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    Ok(rows_written)
}

impl TournamentRunner {
    fn play_game(
        &self,
        game_index: usize,
        permutation_index: usize,
        base_seed: u64,
        order: &[usize; 2],
    ) -> Result<GameOutcome, RunnerError> {
        let mut state = MatchState::with_seed(
            self.layout,
            Opponent::Computer,
            StartingPlayer::Human,
            base_seed,
        )?;
        let mut seats = build_seat_states(order, &self.agents, &self.layout, base_seed)?;
        let reveal_limit = (self.layout.tile_count() as usize).saturating_mul(MAX_REVEALS_PER_TILE);
        let mut reveals = 0usize;

        while !state.is_over() {
            if reveals >= reveal_limit {
                return Err(RunnerError::game(format!(
                    "{} did not finish after {reveals} reveals",
                    game_id(game_index, permutation_index)
                )));
            }

            let slot = state.current_player();
            let mut first = None;
            for step in [TurnStep::First, TurnStep::Second] {
                let guess = {
                    let seat = &mut seats[slot.index()];
                    let ctx = PolicyContext {
                        board: state.board(),
                        first,
                    };
                    let start = Instant::now();
                    let guess = match step {
                        TurnStep::First => seat.policy.choose_first(&ctx),
                        TurnStep::Second => seat.policy.choose_second(&ctx),
                    }
                    .map_err(|source| RunnerError::Guess {
                        agent: seat.agent_name.clone(),
                        source,
                    })?;
                    let elapsed_ms = seat.metrics.record(start.elapsed());
                    seat.note_guess(guess);

                    if self.logging_enabled && tracing::enabled!(Level::INFO) {
                        event!(
                            target: "memory_bench::reveal",
                            Level::INFO,
                            run_id = %self.config.run_id,
                            game_index = game_index as u64,
                            permutation_index = permutation_index as u64,
                            seat = %slot,
                            agent = %seat.agent_name,
                            step = step.as_str(),
                            column = guess.position.column,
                            row = guess.position.row,
                            source = guess.source.as_str(),
                            elapsed_ms
                        );
                    }
                    guess
                };

                let turn_event = state.reveal(guess.position).map_err(|err| {
                    RunnerError::game(format!(
                        "invalid reveal by '{}' at {}: {err}",
                        seats[slot.index()].agent_name,
                        guess.position
                    ))
                })?;
                reveals += 1;

                let reveal = turn_event.reveal();
                for seat in &mut seats {
                    seat.policy.observe_reveal(reveal.id, reveal.position);
                }
                first = Some(guess.position);
            }
            state.settle()?;
        }

        let seating = seats
            .iter()
            .map(|seat| SeatSnapshot {
                seat: seat.slot.to_string(),
                bot: seat.agent_name.clone(),
            })
            .collect();

        let winner = state.winner();
        let mut seat_results = Vec::with_capacity(AGENT_COUNT);
        for seat in seats {
            seat_results.push(SeatResult {
                pairs: state.scores().found_pairs(seat.slot),
                mistakes: state.scores().mistakes(seat.slot),
                turns: state.turns_taken(seat.slot),
                memory_guesses: seat.memory_guesses,
                metrics: seat.metrics.finalize(),
                agent_name: seat.agent_name,
                slot: seat.slot,
            });
        }

        Ok(GameOutcome {
            seating,
            seat_results,
            winner,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum TurnStep {
    First,
    Second,
}

impl TurnStep {
    fn as_str(self) -> &'static str {
        match self {
            TurnStep::First => "first",
            TurnStep::Second => "second",
        }
    }
}

fn build_seat_states(
    order: &[usize; 2],
    agents: &[AgentBlueprint],
    layout: &BoardLayout,
    base_seed: u64,
) -> Result<Vec<SeatState>, RunnerError> {
    let mut seats = Vec::with_capacity(AGENT_COUNT);
    for (seat_idx, agent_idx) in order.iter().enumerate() {
        let slot = PlayerSlot::from_index(seat_idx).ok_or_else(|| {
            RunnerError::game(format!("invalid seat index generated: {seat_idx}"))
        })?;
        let agent = agents
            .get(*agent_idx)
            .ok_or(RunnerError::InvalidPermutation {
                index: seat_idx,
                agent_index: *agent_idx,
            })?;
        let seed = agent_seed(base_seed, *agent_idx);
        seats.push(SeatState::new(slot, agent, layout, seed));
    }
    Ok(seats)
}

/// Each agent draws from its own stream, independent of the seat it occupies.
fn agent_seed(base_seed: u64, agent_index: usize) -> u64 {
    base_seed ^ (agent_index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

struct SeatState {
    slot: PlayerSlot,
    agent_name: String,
    policy: Box<dyn Policy>,
    metrics: DecisionMetrics,
    memory_guesses: u32,
}

impl SeatState {
    fn new(slot: PlayerSlot, agent: &AgentBlueprint, layout: &BoardLayout, seed: u64) -> Self {
        Self {
            slot,
            agent_name: agent.name.clone(),
            policy: agent.spawn_policy(layout, seed),
            metrics: DecisionMetrics::default(),
            memory_guesses: 0,
        }
    }

    fn note_guess(&mut self, guess: Guess) {
        if matches!(
            guess.source,
            GuessSource::KnownPair | GuessSource::LearnedPair
        ) {
            self.memory_guesses += 1;
        }
    }
}

pub struct GameOutcome {
    pub seating: Vec<SeatSnapshot>,
    pub seat_results: Vec<SeatResult>,
    pub winner: Option<PlayerSlot>,
}

#[derive(Clone, Serialize)]
pub struct SeatSnapshot {
    pub seat: String,
    pub bot: String,
}

pub struct SeatResult {
    pub agent_name: String,
    pub slot: PlayerSlot,
    pub pairs: u32,
    pub mistakes: u32,
    pub turns: u32,
    pub memory_guesses: u32,
    pub metrics: DecisionSummary,
}

#[derive(Default)]
struct DecisionMetrics {
    total: Duration,
    decisions: u32,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration) -> f64 {
        self.total += duration;
        self.decisions += 1;
        duration.as_secs_f64() * 1000.0
    }

    fn finalize(self) -> DecisionSummary {
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms: self.total.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Clone)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
}

#[derive(Serialize)]
struct GameLogRow {
    run_id: String,
    game_id: String,
    game_index: usize,
    permutation_index: usize,
    game_seed: u64,
    seat: String,
    bot: String,
    seating: Vec<SeatSnapshot>,
    pairs: u32,
    mistakes: u32,
    turns: u32,
    won: bool,
    tie: bool,
    memory_guesses: u32,
    speed_ms_decision: f64,
    decisions: u32,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Agent(#[from] AgentError),
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
    #[error("invalid board: {0}")]
    Layout(#[from] LayoutError),
    #[error("board error: {0}")]
    Board(#[from] BoardError),
    #[error("agent '{agent}' could not choose a tile: {source}")]
    Guess {
        agent: String,
        #[source]
        source: GuessError,
    },
    #[error("game execution failed: {message}")]
    Game { message: String },
    #[error("configuration requires exactly 2 agents but found {found}")]
    SeatCount { found: usize },
    #[error("permutation index {index} references invalid agent index {agent_index}")]
    InvalidPermutation { index: usize, agent_index: usize },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl RunnerError {
    fn game(message: String) -> Self {
        RunnerError::Game { message }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid memory parameter for agent '{name}': {message}")]
    InvalidMemoryParam { name: String, message: String },
}

struct AgentBlueprint {
    name: String,
    implementation: AgentImplementation,
}

enum AgentImplementation {
    Memory(MemoryOptions),
    Random,
}

impl AgentBlueprint {
    fn from_configs(
        configs: &[AgentConfig],
        features: BotFeatures,
    ) -> Result<Vec<Self>, AgentError> {
        configs
            .iter()
            .map(|config| Self::from_config(config, features))
            .collect()
    }

    fn from_config(config: &AgentConfig, features: BotFeatures) -> Result<Self, AgentError> {
        let implementation = match config.kind {
            AgentKind::Memory => {
                let options = MemoryOptions::from_params(&config.name, &config.params, features)?;
                AgentImplementation::Memory(options)
            }
            AgentKind::Random => AgentImplementation::Random,
        };

        Ok(Self {
            name: config.name.clone(),
            implementation,
        })
    }

    fn spawn_policy(&self, layout: &BoardLayout, seed: u64) -> Box<dyn Policy> {
        match &self.implementation {
            AgentImplementation::Memory(opts) => {
                let config =
                    OpponentConfig::for_layout(*layout, opts.difficulty).with_features(opts.features);
                Box::new(MemoryPolicy::new(&config, seed))
            }
            AgentImplementation::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

struct MemoryOptions {
    difficulty: BotDifficulty,
    features: BotFeatures,
}

impl MemoryOptions {
    fn from_params(
        name: &str,
        params: &serde_yaml::Value,
        features: BotFeatures,
    ) -> Result<Self, AgentError> {
        let mut options = Self {
            difficulty: BotDifficulty::from_env(),
            features,
        };
        if params.is_null() {
            return Ok(options);
        }

        let mapping = params
            .as_mapping()
            .ok_or_else(|| AgentError::InvalidMemoryParam {
                name: name.to_string(),
                message: "expected mapping for memory params".to_string(),
            })?;

        for (key, value) in mapping {
            match key.as_str() {
                Some("difficulty") => {
                    let level = value.as_i64().ok_or_else(|| AgentError::InvalidMemoryParam {
                        name: name.to_string(),
                        message: "difficulty must be an integer".to_string(),
                    })?;
                    options.difficulty = BotDifficulty::from_level(level);
                }
                Some("unknown_bias") => {
                    let bias = value
                        .as_str()
                        .and_then(UnknownBias::parse)
                        .ok_or_else(|| AgentError::InvalidMemoryParam {
                            name: name.to_string(),
                            message: "unknown_bias must be one of turn, always, never"
                                .to_string(),
                        })?;
                    options.features = options.features.with_unknown_bias(bias);
                }
                _ => {}
            }
        }

        Ok(options)
    }
}
