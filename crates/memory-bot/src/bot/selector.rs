use super::BotDifficulty;
use super::memory::MemoryStore;
use super::random::RandomSource;
use memory_core::model::position::Position;

/// Collisions tolerated before `pick_distinct` stops drawing and takes the
/// first other candidate.
const MAX_REDRAWS: usize = 64;

/// One draw per turn: whether this turn exploits known pairs.
pub(crate) fn draw_use_known_pairs<S: RandomSource + ?Sized>(
    difficulty: BotDifficulty,
    rng: &mut S,
) -> bool {
    rng.unit() < difficulty.rate()
}

/// Uniform pick from the unknown tiles when asked and possible, otherwise from
/// everything still in play.
pub(crate) fn pick<S: RandomSource + ?Sized>(
    store: &MemoryStore,
    prefer_unknown: bool,
    rng: &mut S,
) -> Option<Position> {
    let pool = candidate_pool(store, prefer_unknown);
    if pool.is_empty() {
        return None;
    }
    Some(pool[rng.index(pool.len())])
}

/// Like [`pick`], re-drawn until the result differs from `exclude`.
pub(crate) fn pick_distinct<S: RandomSource + ?Sized>(
    store: &MemoryStore,
    prefer_unknown: bool,
    exclude: Position,
    rng: &mut S,
) -> Option<Position> {
    let prefer_unknown =
        prefer_unknown && store.unknown().iter().any(|position| *position != exclude);
    let pool = candidate_pool(store, prefer_unknown);
    if !pool.iter().any(|position| *position != exclude) {
        return None;
    }

    for _ in 0..MAX_REDRAWS {
        let position = pool[rng.index(pool.len())];
        if position != exclude {
            return Some(position);
        }
    }
    pool.iter().copied().find(|position| *position != exclude)
}

fn candidate_pool(store: &MemoryStore, prefer_unknown: bool) -> &[Position] {
    if prefer_unknown && !store.unknown().is_empty() {
        store.unknown()
    } else {
        store.available()
    }
}
