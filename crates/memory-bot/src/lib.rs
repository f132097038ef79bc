pub mod bot;
pub mod policy;

pub use bot::{
    BotDifficulty, BotFeatures, Guess, GuessError, GuessSource, MemoryOpponent, MemoryStore,
    Observation, OpponentConfig, OpponentConfigError, RandomSource, RngSource, ScriptedSource,
    UnknownBias,
};
pub use policy::{MemoryPolicy, Policy, PolicyContext, RandomPolicy};
