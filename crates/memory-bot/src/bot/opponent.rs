use super::memory::{MemoryStore, Observation};
use super::random::{RandomSource, RngSource};
use super::selector;
use super::{BotDifficulty, BotFeatures};
use memory_core::model::layout::{BoardLayout, LayoutError};
use memory_core::model::position::{Position, TileId};
use rand::rngs::StdRng;
use std::fmt;
use tracing::{Level, event};

const GUESS_TARGET: &str = "memory_bot::guess";
const TURN_TARGET: &str = "memory_bot::turn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpponentConfigError {
    Layout(LayoutError),
}

impl fmt::Display for OpponentConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpponentConfigError::Layout(err) => write!(f, "invalid opponent board: {err}"),
        }
    }
}

impl std::error::Error for OpponentConfigError {}

impl From<LayoutError> for OpponentConfigError {
    fn from(err: LayoutError) -> Self {
        OpponentConfigError::Layout(err)
    }
}

/// Board shape and behaviour of a computer opponent, validated once.
#[derive(Debug, Clone, Copy)]
pub struct OpponentConfig {
    layout: BoardLayout,
    difficulty: BotDifficulty,
    features: BotFeatures,
}

impl OpponentConfig {
    /// `difficulty` outside 1..=4 is treated as 2. Every tile needs a partner,
    /// so `tile_count` must be even.
    pub fn new(
        columns: u32,
        rows: u32,
        tile_count: u32,
        difficulty: i64,
    ) -> Result<Self, OpponentConfigError> {
        if tile_count % 2 != 0 {
            return Err(LayoutError::OddTileCount(tile_count).into());
        }
        let layout = BoardLayout::new(columns, rows, tile_count)?;
        Ok(Self::for_layout(layout, BotDifficulty::from_level(difficulty)))
    }

    pub fn for_layout(layout: BoardLayout, difficulty: BotDifficulty) -> Self {
        Self {
            layout,
            difficulty,
            features: BotFeatures::default(),
        }
    }

    pub fn with_features(mut self, features: BotFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.features = self.features.with_verbose(verbose);
        self
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn difficulty(&self) -> BotDifficulty {
        self.difficulty
    }

    pub fn features(&self) -> BotFeatures {
        self.features
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessError {
    /// Nothing left in play to reveal.
    BoardExhausted,
    /// Second guess requested but the first tile is the only one left.
    NoSecondTile { first: Position },
}

impl fmt::Display for GuessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuessError::BoardExhausted => write!(f, "no tiles are left to reveal"),
            GuessError::NoSecondTile { first } => {
                write!(f, "no tile other than {first} is left to reveal")
            }
        }
    }
}

impl std::error::Error for GuessError {}

/// Why the opponent chose a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuessSource {
    /// Half of a pair that was known before the turn started.
    KnownPair,
    /// Partner of a tile whose pair was learned by this turn's first reveal.
    LearnedPair,
    Random,
}

impl GuessSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            GuessSource::KnownPair => "known_pair",
            GuessSource::LearnedPair => "learned_pair",
            GuessSource::Random => "random",
        }
    }
}

impl fmt::Display for GuessSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guess {
    pub position: Position,
    pub source: GuessSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnMode {
    KnowsPair { partner: Position },
    RandomGuess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TurnPlan {
    mode: TurnMode,
    use_known_pairs: bool,
    first: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnPhase {
    ExpectingFirst,
    ExpectingSecond(TurnPlan),
}

/// A computer player that remembers every reveal it has been told about.
///
/// Drive it by reporting every reveal (either player's) through
/// [`tile_revealed`](Self::tile_revealed) and, on its own turns, calling
/// [`first_guess`](Self::first_guess) then [`second_guess`](Self::second_guess)
/// with the first reveal reported in between.
#[derive(Debug, Clone)]
pub struct MemoryOpponent<S = RngSource<StdRng>> {
    difficulty: BotDifficulty,
    features: BotFeatures,
    store: MemoryStore,
    rng: S,
    phase: TurnPhase,
    turn_first: Option<(TileId, Position)>,
    turns: u64,
}

impl MemoryOpponent<RngSource<StdRng>> {
    pub fn seeded(config: &OpponentConfig, seed: u64) -> Self {
        Self::new(config, RngSource::seeded(seed))
    }
}

impl<S: RandomSource> MemoryOpponent<S> {
    pub fn new(config: &OpponentConfig, rng: S) -> Self {
        let features = config.features();
        Self {
            difficulty: config.difficulty(),
            features,
            store: MemoryStore::new(config.layout()).with_verbose(features.verbose()),
            rng,
            phase: TurnPhase::ExpectingFirst,
            turn_first: None,
            turns: 0,
        }
    }

    pub fn difficulty(&self) -> BotDifficulty {
        self.difficulty
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.store
    }

    pub fn turns_played(&self) -> u64 {
        self.turns
    }

    pub fn awaiting_second_guess(&self) -> bool {
        matches!(self.phase, TurnPhase::ExpectingSecond(_))
    }

    /// Report a tile turned face up, by either player.
    ///
    /// Reveals alternate first/second within a turn. A second reveal that
    /// matches the first takes the pair out of the store; any other reveal is
    /// remembered.
    pub fn tile_revealed(&mut self, id: TileId, position: Position) -> Observation {
        match self.turn_first.take() {
            None => {
                self.turn_first = Some((id, position));
                self.store.observe(id, position)
            }
            Some((first_id, first_position)) if first_id == id && first_position != position => {
                self.store.resolve(id, first_position, position);
                Observation::Resolved
            }
            Some(_) => self.store.observe(id, position),
        }
    }

    pub fn first_guess(&mut self) -> Result<Guess, GuessError> {
        if let TurnPhase::ExpectingSecond(_) = self.phase {
            self.log_out_of_order("first");
            return self.second_guess();
        }
        if self.store.available().is_empty() {
            return Err(GuessError::BoardExhausted);
        }

        let use_known_pairs = selector::draw_use_known_pairs(self.difficulty, &mut self.rng);
        let (position, mode) = match self.store.first_known_pair() {
            Some((_, (first, partner))) if use_known_pairs => {
                (first, TurnMode::KnowsPair { partner })
            }
            _ => {
                let prefer_unknown = self.features.unknown_bias().prefer_unknown(use_known_pairs);
                let position = selector::pick(&self.store, prefer_unknown, &mut self.rng)
                    .ok_or(GuessError::BoardExhausted)?;
                (position, TurnMode::RandomGuess)
            }
        };

        self.turns += 1;
        self.phase = TurnPhase::ExpectingSecond(TurnPlan {
            mode,
            use_known_pairs,
            first: position,
        });

        let guess = Guess {
            position,
            source: match mode {
                TurnMode::KnowsPair { .. } => GuessSource::KnownPair,
                TurnMode::RandomGuess => GuessSource::Random,
            },
        };
        self.log_guess("first", guess, use_known_pairs);
        Ok(guess)
    }

    pub fn second_guess(&mut self) -> Result<Guess, GuessError> {
        let TurnPhase::ExpectingSecond(plan) = self.phase else {
            self.log_out_of_order("second");
            return self.first_guess();
        };
        self.phase = TurnPhase::ExpectingFirst;

        let guess = match plan.mode {
            TurnMode::KnowsPair { partner } => Guess {
                position: partner,
                source: GuessSource::KnownPair,
            },
            TurnMode::RandomGuess => match self.learned_partner() {
                Some(partner) if plan.use_known_pairs => Guess {
                    position: partner,
                    source: GuessSource::LearnedPair,
                },
                _ => {
                    let prefer_unknown = self
                        .features
                        .unknown_bias()
                        .prefer_unknown(plan.use_known_pairs);
                    let Some(position) = selector::pick_distinct(
                        &self.store,
                        prefer_unknown,
                        plan.first,
                        &mut self.rng,
                    ) else {
                        // No second reveal will follow; the next one starts a turn.
                        self.turn_first = None;
                        return Err(GuessError::NoSecondTile { first: plan.first });
                    };
                    Guess {
                        position,
                        source: GuessSource::Random,
                    }
                }
            },
        };
        self.log_guess("second", guess, plan.use_known_pairs);
        Ok(guess)
    }

    /// Stored pair position that is not the tile revealed first this turn.
    fn learned_partner(&self) -> Option<Position> {
        let (id, first) = self.turn_first?;
        let (a, b) = self.store.known_pair(id)?;
        if a == first {
            Some(b)
        } else if b == first {
            Some(a)
        } else {
            None
        }
    }

    fn log_out_of_order(&self, requested: &'static str) {
        event!(
            target: TURN_TARGET,
            Level::WARN,
            requested,
            turn = self.turns,
            message = "guess requested out of order; answering the pending step instead",
        );
    }

    fn log_guess(&self, phase: &'static str, guess: Guess, use_known_pairs: bool) {
        if !self.features.verbose() || !tracing::enabled!(target: GUESS_TARGET, Level::INFO) {
            return;
        }
        event!(
            target: GUESS_TARGET,
            Level::INFO,
            turn = self.turns,
            phase,
            mode = guess.source.as_str(),
            column = guess.position.column,
            row = guess.position.row,
            use_known_pairs,
            difficulty = self.difficulty.level(),
            known_pairs = self.store.known_pair_count(),
            unknown = self.store.unknown().len(),
            available = self.store.available().len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::random::ScriptedSource;

    fn config(difficulty: i64) -> OpponentConfig {
        OpponentConfig::new(2, 2, 4, difficulty).unwrap()
    }

    #[test]
    fn config_rejects_oversized_tile_count() {
        assert!(matches!(
            OpponentConfig::new(2, 2, 5, 2),
            Err(OpponentConfigError::Layout(_))
        ));
    }

    #[test]
    fn config_rejects_odd_tile_count() {
        assert_eq!(
            OpponentConfig::new(3, 1, 3, 2).unwrap_err(),
            OpponentConfigError::Layout(LayoutError::OddTileCount(3))
        );
    }

    #[test]
    fn missing_second_tile_starts_a_fresh_turn() {
        let layout = BoardLayout::new(3, 1, 3).unwrap();
        let config = OpponentConfig::for_layout(layout, BotDifficulty::EASY);
        let mut bot = MemoryOpponent::new(&config, ScriptedSource::constant(0.9));
        bot.tile_revealed(TileId(0), Position::new(0, 0));
        assert_eq!(
            bot.tile_revealed(TileId(0), Position::new(1, 0)),
            Observation::Resolved
        );

        let first = bot.first_guess().unwrap();
        assert_eq!(first.position, Position::new(2, 0));
        bot.tile_revealed(TileId(7), first.position);
        assert_eq!(
            bot.second_guess(),
            Err(GuessError::NoSecondTile {
                first: Position::new(2, 0)
            })
        );
        assert!(!bot.awaiting_second_guess());
        assert_eq!(bot.turn_first, None);
    }

    #[test]
    fn config_clamps_difficulty() {
        assert_eq!(config(9).difficulty(), BotDifficulty::NORMAL);
        assert_eq!(config(3).difficulty(), BotDifficulty::HARD);
    }

    #[test]
    fn known_pair_is_played_in_order() {
        let mut bot = MemoryOpponent::new(&config(4), ScriptedSource::constant(0.5));
        bot.tile_revealed(TileId(1), Position::new(0, 0));
        bot.tile_revealed(TileId(2), Position::new(1, 0));
        bot.tile_revealed(TileId(2), Position::new(0, 1));
        bot.tile_revealed(TileId(1), Position::new(1, 1));

        let first = bot.first_guess().unwrap();
        assert_eq!(first.source, GuessSource::KnownPair);
        bot.tile_revealed(TileId(1), first.position);
        let second = bot.second_guess().unwrap();
        assert_eq!(second.source, GuessSource::KnownPair);
        assert_ne!(first.position, second.position);
        let pair = [first.position, second.position];
        assert!(pair.contains(&Position::new(0, 0)));
        assert!(pair.contains(&Position::new(1, 1)));
    }

    #[test]
    fn learned_pair_is_completed_on_second_guess() {
        let mut bot = MemoryOpponent::new(
            &config(4),
            ScriptedSource::new(vec![0.0], vec![0]),
        );
        // Human turn: sees tile 5 at (1,1), misses with tile 6 at (1,0).
        bot.tile_revealed(TileId(5), Position::new(1, 1));
        bot.tile_revealed(TileId(6), Position::new(1, 0));

        let first = bot.first_guess().unwrap();
        assert_eq!(first.source, GuessSource::Random);
        assert_eq!(first.position, Position::new(0, 0));
        bot.tile_revealed(TileId(5), first.position);

        let second = bot.second_guess().unwrap();
        assert_eq!(second.source, GuessSource::LearnedPair);
        assert_eq!(second.position, Position::new(1, 1));
    }

    #[test]
    fn out_of_order_first_guess_answers_second() {
        let mut bot = MemoryOpponent::new(&config(1), ScriptedSource::new(vec![0.9], vec![0, 1]));
        let first = bot.first_guess().unwrap();
        bot.tile_revealed(TileId(3), first.position);
        let again = bot.first_guess().unwrap();
        assert_ne!(again.position, first.position);
        assert!(!bot.awaiting_second_guess());
    }

    #[test]
    fn out_of_order_second_guess_starts_turn() {
        let mut bot = MemoryOpponent::new(&config(2), ScriptedSource::constant(0.9));
        bot.second_guess().unwrap();
        assert!(bot.awaiting_second_guess());
        assert_eq!(bot.turns_played(), 1);
    }

    #[test]
    fn exhausted_board_is_an_error() {
        let mut bot = MemoryOpponent::new(&config(2), ScriptedSource::default());
        for (id, a, b) in [
            (TileId(0), Position::new(0, 0), Position::new(1, 0)),
            (TileId(1), Position::new(0, 1), Position::new(1, 1)),
        ] {
            bot.tile_revealed(id, a);
            bot.tile_revealed(id, b);
        }
        assert!(bot.memory().available().is_empty());
        assert_eq!(bot.first_guess(), Err(GuessError::BoardExhausted));
    }

    #[test]
    fn matched_second_reveal_resolves_pair() {
        let mut bot = MemoryOpponent::seeded(&config(2), 4);
        bot.tile_revealed(TileId(0), Position::new(0, 1));
        bot.tile_revealed(TileId(0), Position::new(1, 0));
        assert_eq!(bot.memory().available().len(), 2);
        assert_eq!(bot.memory().seen(TileId(0)), None);
        assert!(bot.memory().is_consistent());
    }

    #[test]
    fn mismatched_second_reveal_is_remembered() {
        let mut bot = MemoryOpponent::seeded(&config(2), 4);
        bot.tile_revealed(TileId(0), Position::new(0, 0));
        bot.tile_revealed(TileId(1), Position::new(1, 1));
        assert_eq!(bot.memory().seen(TileId(0)), Some(Position::new(0, 0)));
        assert_eq!(bot.memory().seen(TileId(1)), Some(Position::new(1, 1)));
        assert_eq!(bot.memory().unknown().len(), 2);
    }
}
