mod memory;
mod opponent;
mod random;
mod selector;

pub use memory::{MemoryStore, Observation};
pub use opponent::{
    Guess, GuessError, GuessSource, MemoryOpponent, OpponentConfig, OpponentConfigError,
};
pub use random::{RandomSource, RngSource, ScriptedSource};

use std::sync::OnceLock;

const DEFAULT_LEVEL: u8 = 2;
const MAX_LEVEL: u8 = 4;

/// How reliably the opponent exploits pairs it already knows.
///
/// Level `n` in `1..=4` uses its memory on a turn with probability `n / 4`;
/// any other level falls back to 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BotDifficulty(u8);

impl Default for BotDifficulty {
    fn default() -> Self {
        Self(DEFAULT_LEVEL)
    }
}

impl BotDifficulty {
    pub const EASY: BotDifficulty = BotDifficulty(1);
    pub const NORMAL: BotDifficulty = BotDifficulty(2);
    pub const HARD: BotDifficulty = BotDifficulty(3);
    pub const PERFECT: BotDifficulty = BotDifficulty(4);

    pub fn from_level(level: i64) -> Self {
        match u8::try_from(level) {
            Ok(level @ 1..=MAX_LEVEL) => Self(level),
            _ => Self::default(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Self::EASY,
            "normal" | "default" => Self::NORMAL,
            "hard" => Self::HARD,
            "perfect" => Self::PERFECT,
            other => other
                .parse::<i64>()
                .map(Self::from_level)
                .unwrap_or_default(),
        }
    }

    pub fn from_env() -> Self {
        static CACHED: OnceLock<BotDifficulty> = OnceLock::new();
        *CACHED.get_or_init(|| match std::env::var("MEMORY_BOT_DIFFICULTY") {
            Ok(raw) => BotDifficulty::parse(&raw),
            Err(_) => BotDifficulty::default(),
        })
    }

    pub const fn level(self) -> u8 {
        self.0
    }

    /// Probability that a turn uses known-pair memory.
    pub fn rate(self) -> f64 {
        f64::from(self.0) / f64::from(MAX_LEVEL)
    }
}

/// Whether random guesses are restricted to tiles the opponent has never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownBias {
    /// Follow the turn's memory draw: a turn that uses memory also avoids
    /// re-flipping tiles it already knows.
    #[default]
    PerTurn,
    Always,
    Never,
}

impl UnknownBias {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "turn" | "per_turn" => Some(UnknownBias::PerTurn),
            "always" => Some(UnknownBias::Always),
            "never" => Some(UnknownBias::Never),
            _ => None,
        }
    }

    pub const fn prefer_unknown(self, use_known_pairs: bool) -> bool {
        match self {
            UnknownBias::PerTurn => use_known_pairs,
            UnknownBias::Always => true,
            UnknownBias::Never => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BotFeatures {
    verbose: bool,
    unknown_bias: UnknownBias,
}

impl BotFeatures {
    pub const fn new(verbose: bool, unknown_bias: UnknownBias) -> Self {
        Self {
            verbose,
            unknown_bias,
        }
    }

    pub fn from_env() -> Self {
        Self::from_reader(|key| std::env::var(key).ok())
    }

    pub const fn verbose(self) -> bool {
        self.verbose
    }

    pub const fn unknown_bias(self) -> UnknownBias {
        self.unknown_bias
    }

    pub fn with_verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    pub fn with_unknown_bias(mut self, bias: UnknownBias) -> Self {
        self.unknown_bias = bias;
        self
    }

    fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let verbose = read("MEMORY_BOT_VERBOSE")
            .map(|raw| matches!(raw.trim(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(false);

        let unknown_bias = read("MEMORY_BOT_UNKNOWN_BIAS")
            .and_then(|raw| UnknownBias::parse(&raw))
            .unwrap_or_default();

        Self {
            verbose,
            unknown_bias,
        }
    }
}
