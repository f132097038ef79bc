use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::{AgentConfig, AgentKind, BenchmarkConfig};
use crate::tournament::{DecisionSummary, GameOutcome};

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline agent '{0}' not present in tournament results")]
    MissingBaseline(String),
    #[error("agent '{0}' defined in results but missing from configuration")]
    UnknownAgent(String),
    #[error("baseline '{0}' missing for game {1}")]
    MissingBaselineGame(String, String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub struct AnalyticsCollector {
    baseline: String,
    agents: HashMap<String, AgentAccumulator>,
    comparisons: HashMap<String, ComparisonAccumulator>,
    agent_order: Vec<String>,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Result<Self, AnalyticsError> {
        let baseline = config
            .metrics
            .baseline
            .clone()
            .ok_or_else(|| AnalyticsError::MissingBaseline("<unset>".into()))?;

        let mut agents = HashMap::new();
        let mut order = Vec::new();
        for agent in &config.agents {
            agents.insert(
                agent.name.clone(),
                AgentAccumulator::new(agent.name.clone(), agent.clone()),
            );
            order.push(agent.name.clone());
        }

        Ok(Self {
            baseline,
            agents,
            comparisons: HashMap::new(),
            agent_order: order,
        })
    }

    pub fn record_game(
        &mut self,
        game_index: usize,
        permutation_index: usize,
        outcome: &GameOutcome,
    ) -> Result<(), AnalyticsError> {
        let game_id = format!("G{game_index:05}_P{permutation_index:02}");

        let baseline_pairs = outcome
            .seat_results
            .iter()
            .find(|seat| seat.agent_name == self.baseline)
            .map(|seat| f64::from(seat.pairs))
            .ok_or_else(|| {
                AnalyticsError::MissingBaselineGame(self.baseline.clone(), game_id.clone())
            })?;

        for seat in &outcome.seat_results {
            let acc = self
                .agents
                .get_mut(&seat.agent_name)
                .ok_or_else(|| AnalyticsError::UnknownAgent(seat.agent_name.clone()))?;

            acc.record_game(GameRecord {
                pairs: f64::from(seat.pairs),
                mistakes: seat.mistakes,
                won: outcome.winner == Some(seat.slot),
                tied: outcome.winner.is_none(),
                memory_guesses: seat.memory_guesses,
                metrics: &seat.metrics,
            });
        }

        for seat in &outcome.seat_results {
            if seat.agent_name == self.baseline {
                continue;
            }
            let diff = f64::from(seat.pairs) - baseline_pairs;
            self.comparisons
                .entry(seat.agent_name.clone())
                .or_insert_with(ComparisonAccumulator::new)
                .record(diff);
        }

        Ok(())
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        let mut reports = Vec::new();
        for name in &self.agent_order {
            if let Some(acc) = self.agents.remove(name) {
                reports.push(acc.into_report());
            }
        }
        if !reports.iter().any(|report| report.name == self.baseline) {
            return Err(AnalyticsError::MissingBaseline(self.baseline));
        }

        let mut comparisons = Vec::new();
        for report in &reports {
            if report.name == self.baseline {
                comparisons.push(ComparisonReport {
                    agent: report.name.clone(),
                    p_value: 1.0,
                    sample_size: report.games,
                });
                continue;
            }
            let (p_value, sample_size) = match self.comparisons.remove(&report.name) {
                Some(comp) => comp.wilcoxon_signed_rank(),
                None => (1.0, 0),
            };
            comparisons.push(ComparisonReport {
                agent: report.name.clone(),
                p_value,
                sample_size,
            });
        }

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            agents: reports,
            comparisons,
        }
        .enrich())
    }
}

struct GameRecord<'a> {
    pairs: f64,
    mistakes: u32,
    won: bool,
    tied: bool,
    memory_guesses: u32,
    metrics: &'a DecisionSummary,
}

struct AgentAccumulator {
    name: String,
    config: AgentConfig,
    total_pairs: f64,
    games: u32,
    wins: u32,
    ties: u32,
    mistakes: u64,
    memory_guesses: u64,
    per_game_pairs: Vec<f64>,
    total_latency_ms: f64,
    total_decisions: u64,
}

impl AgentAccumulator {
    fn new(name: String, config: AgentConfig) -> Self {
        Self {
            name,
            config,
            total_pairs: 0.0,
            games: 0,
            wins: 0,
            ties: 0,
            mistakes: 0,
            memory_guesses: 0,
            per_game_pairs: Vec::new(),
            total_latency_ms: 0.0,
            total_decisions: 0,
        }
    }

    fn record_game(&mut self, record: GameRecord<'_>) {
        self.total_pairs += record.pairs;
        self.games += 1;
        self.per_game_pairs.push(record.pairs);
        if record.won {
            self.wins += 1;
        }
        if record.tied {
            self.ties += 1;
        }
        self.mistakes += u64::from(record.mistakes);
        self.memory_guesses += u64::from(record.memory_guesses);
        self.total_latency_ms += record.metrics.total_ms;
        self.total_decisions += u64::from(record.metrics.decisions);
    }

    fn into_report(self) -> AgentReport {
        let games = f64::from(self.games);
        let avg_pairs = if self.games == 0 {
            0.0
        } else {
            self.total_pairs / games
        };
        let avg_mistakes = if self.games == 0 {
            0.0
        } else {
            self.mistakes as f64 / games
        };

        let (ci_low, ci_high) = confidence_interval(&self.per_game_pairs);

        let (avg_latency, memory_share) = if self.total_decisions == 0 {
            (0.0, 0.0)
        } else {
            let decisions = self.total_decisions as f64;
            (
                self.total_latency_ms / decisions,
                self.memory_guesses as f64 / decisions,
            )
        };

        AgentReport {
            name: self.name,
            kind: self.config.kind,
            params: self.config.params,
            games: self.games as usize,
            avg_pairs,
            ci95: (ci_low, ci_high),
            wins: self.wins as usize,
            ties: self.ties as usize,
            avg_mistakes,
            memory_guess_share: memory_share,
            average_ms_per_decision: avg_latency,
            delta_vs_baseline: 0.0,
        }
    }
}

#[derive(Clone)]
struct ComparisonAccumulator {
    diffs: Vec<f64>,
}

impl ComparisonAccumulator {
    fn new() -> Self {
        Self { diffs: Vec::new() }
    }

    fn record(&mut self, diff: f64) {
        self.diffs.push(diff);
    }

    /// Two-sided p-value of the paired differences (normal approximation with
    /// tie and continuity correction) and the number of non-zero pairs.
    fn wilcoxon_signed_rank(self) -> (f64, usize) {
        let diffs: Vec<f64> = self
            .diffs
            .into_iter()
            .filter(|d| d.abs() > f64::EPSILON)
            .collect();
        let n = diffs.len();
        if n == 0 {
            return (1.0, 0);
        }

        let mut paired: Vec<(f64, f64)> =
            diffs.into_iter().map(|d| (d.abs(), d.signum())).collect();
        paired.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut ranks = Vec::with_capacity(n);
        let mut tie_sizes = Vec::new();
        let mut i = 0;
        while i < paired.len() {
            let mut j = i;
            while j + 1 < paired.len() && (paired[j + 1].0 - paired[i].0).abs() < 1e-12 {
                j += 1;
            }
            let rank = (i + j + 2) as f64 / 2.0;
            for entry in &paired[i..=j] {
                ranks.push((rank, entry.1));
            }
            if j > i {
                tie_sizes.push(j - i + 1);
            }
            i = j + 1;
        }

        let w_plus: f64 = ranks
            .iter()
            .filter(|(_, sign)| *sign > 0.0)
            .map(|(rank, _)| *rank)
            .sum();
        let w_minus: f64 = ranks
            .iter()
            .filter(|(_, sign)| *sign < 0.0)
            .map(|(rank, _)| *rank)
            .sum();

        let w = w_plus.min(w_minus);
        let n_f = n as f64;
        let mean_w = n_f * (n_f + 1.0) / 4.0;

        let tie_adjustment: f64 = tie_sizes
            .into_iter()
            .map(|count| {
                let c = count as f64;
                (c.powi(3) - c) / 48.0
            })
            .sum();
        let variance_w = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_adjustment;
        if variance_w <= 0.0 {
            return (1.0, n);
        }

        let Ok(normal) = Normal::new(0.0, 1.0) else {
            return (1.0, n);
        };
        let z = (((w - mean_w).abs() - 0.5) / variance_w.sqrt()).max(0.0);
        let p = 2.0 * (1.0 - normal.cdf(z));
        (p.clamp(0.0, 1.0), n)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub agents: Vec<AgentReport>,
    pub comparisons: Vec<ComparisonReport>,
}

impl AnalyticsSummary {
    pub fn enrich(mut self) -> Self {
        let baseline_avg = self
            .agents
            .iter()
            .find(|agent| agent.name == self.baseline)
            .map(|agent| agent.avg_pairs)
            .unwrap_or(0.0);

        for agent in &mut self.agents {
            agent.delta_vs_baseline = agent.avg_pairs - baseline_avg;
        }

        self
    }

    pub fn p_value(&self, agent: &str) -> f64 {
        self.comparisons
            .iter()
            .find(|c| c.agent == agent)
            .map(|c| c.p_value)
            .unwrap_or(1.0)
    }

    pub fn render_markdown(&self) -> String {
        let mut rows = String::new();
        rows.push_str("# Tournament Summary\n\n");
        rows.push_str(&format!("Baseline: `{}`\n\n", self.baseline));
        rows.push_str("| Agent | Kind | Games | Avg pairs | Δ vs baseline | 95% CI | Win % | Tie % | Avg mistakes | Memory guesses % | Avg ms/decision | p-value |\n");
        rows.push_str("|-------|------|-------|-----------|---------------|--------|-------|-------|--------------|------------------|-----------------|---------|\n");

        for agent in &self.agents {
            let (win_rate, tie_rate) = if agent.games == 0 {
                (0.0, 0.0)
            } else {
                let games = agent.games as f64;
                (agent.wins as f64 / games, agent.ties as f64 / games)
            };

            rows.push_str(&format!(
                "| {name} | {kind:?} | {games} | {avg:.3} | {delta:+.3} | [{ci_low:.3}, {ci_high:.3}] | {win:.1}% | {tie:.1}% | {mistakes:.2} | {memory:.1}% | {latency:.3} | {pval:.3} |\n",
                name = agent.name,
                kind = agent.kind,
                games = agent.games,
                avg = agent.avg_pairs,
                delta = agent.delta_vs_baseline,
                ci_low = agent.ci95.0,
                ci_high = agent.ci95.1,
                win = win_rate * 100.0,
                tie = tie_rate * 100.0,
                mistakes = agent.avg_mistakes,
                memory = agent.memory_guess_share * 100.0,
                latency = agent.average_ms_per_decision,
                pval = self.p_value(&agent.name),
            ));
        }
        rows
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        fs::write(path.as_ref(), self.render_markdown()).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub kind: AgentKind,
    pub params: serde_yaml::Value,
    pub games: usize,
    pub avg_pairs: f64,
    pub ci95: (f64, f64),
    pub wins: usize,
    pub ties: usize,
    pub avg_mistakes: f64,
    pub memory_guess_share: f64,
    pub average_ms_per_decision: f64,
    #[serde(skip)]
    pub delta_vs_baseline: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub agent: String,
    pub p_value: f64,
    pub sample_size: usize,
}

fn confidence_interval(points: &[f64]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let mean = points.iter().sum::<f64>() / points.len() as f64;
    if points.len() == 1 {
        return (mean, mean);
    }
    let variance = points
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (points.len() as f64 - 1.0);
    let std_error = (variance / points.len() as f64).sqrt();
    let margin = CONFIDENCE_Z * std_error;
    (mean - margin, mean + margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::{SeatResult, SeatSnapshot};
    use memory_core::model::player::PlayerSlot;

    const YAML: &str = r#"
run_id: "analytics"
games: { seed: 1, count: 4 }
board: { pairs: 4 }
agents:
  - { name: "memory", kind: "memory", params: { difficulty: 4 } }
  - { name: "random", kind: "random" }
outputs: { jsonl: "out/games.jsonl", summary_md: "out/summary.md" }
metrics: { baseline: "random" }
"#;

    fn config() -> BenchmarkConfig {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(YAML).expect("parse");
        cfg.validate().expect("valid");
        cfg
    }

    fn seat(name: &str, slot: PlayerSlot, pairs: u32) -> SeatResult {
        SeatResult {
            agent_name: name.to_string(),
            slot,
            pairs,
            mistakes: 4 - pairs,
            turns: 4,
            memory_guesses: pairs,
            metrics: DecisionSummary {
                decisions: 8,
                avg_ms_per_decision: 0.5,
                total_ms: 4.0,
            },
        }
    }

    fn outcome(memory_pairs: u32) -> GameOutcome {
        let random_pairs = 4 - memory_pairs;
        let winner = match memory_pairs.cmp(&random_pairs) {
            std::cmp::Ordering::Greater => Some(PlayerSlot::First),
            std::cmp::Ordering::Less => Some(PlayerSlot::Second),
            std::cmp::Ordering::Equal => None,
        };
        GameOutcome {
            seating: vec![
                SeatSnapshot {
                    seat: "first".into(),
                    bot: "memory".into(),
                },
                SeatSnapshot {
                    seat: "second".into(),
                    bot: "random".into(),
                },
            ],
            seat_results: vec![
                seat("memory", PlayerSlot::First, memory_pairs),
                seat("random", PlayerSlot::Second, random_pairs),
            ],
            winner,
        }
    }

    #[test]
    fn collector_reports_means_and_wins() {
        let mut collector = AnalyticsCollector::new(&config()).unwrap();
        for (index, pairs) in [3, 4, 2, 3].into_iter().enumerate() {
            collector.record_game(index, 0, &outcome(pairs)).unwrap();
        }
        let summary = collector.finalize().unwrap();

        let memory = &summary.agents[0];
        assert_eq!(memory.games, 4);
        assert!((memory.avg_pairs - 3.0).abs() < 1e-9);
        assert_eq!(memory.wins, 3);
        assert_eq!(memory.ties, 1);
        assert!((memory.delta_vs_baseline - 2.0).abs() < 1e-9);
        assert!(memory.ci95.0 < 3.0 && memory.ci95.1 > 3.0);

        let markdown = summary.render_markdown();
        assert!(markdown.contains("| memory | Memory | 4 | 3.000 | +2.000"));
        assert!(markdown.contains("| random | Random | 4 | 1.000 | +0.000"));
    }

    #[test]
    fn wilcoxon_all_positive_is_significant() {
        let mut comp = ComparisonAccumulator::new();
        for diff in [2.0, 3.0, 1.0, 4.0, 2.0, 5.0, 3.0, 2.0, 4.0, 1.0, 3.0, 2.0] {
            comp.record(diff);
        }
        let (p, n) = comp.wilcoxon_signed_rank();
        assert_eq!(n, 12);
        assert!(p < 0.01, "p = {p}");
    }

    #[test]
    fn wilcoxon_balanced_differences_are_not_significant() {
        let mut comp = ComparisonAccumulator::new();
        for diff in [1.0, -1.0, 2.0, -2.0, 0.0, 3.0, -3.0] {
            comp.record(diff);
        }
        let (p, n) = comp.wilcoxon_signed_rank();
        assert_eq!(n, 6);
        assert!(p > 0.9, "p = {p}");
    }

    #[test]
    fn missing_baseline_in_game_is_an_error() {
        let mut collector = AnalyticsCollector::new(&config()).unwrap();
        let mut game = outcome(2);
        game.seat_results.retain(|seat| seat.agent_name != "random");
        assert!(matches!(
            collector.record_game(0, 0, &game),
            Err(AnalyticsError::MissingBaselineGame(..))
        ));
    }

    #[test]
    fn confidence_interval_of_constant_series_is_a_point() {
        assert_eq!(confidence_interval(&[2.0, 2.0, 2.0]), (2.0, 2.0));
        assert_eq!(confidence_interval(&[]), (0.0, 0.0));
    }
}
