//! Synthetic results for exercising the ranking views.
//!
//! Every generated participant id starts with [`TEST_PLAYER_PREFIX`] so the
//! whole batch can be purged again without touching real games.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::RecordFilter;
use crate::record::{format_movetext, Outcome, ResultRecord, Side};

pub const TEST_PLAYER_PREFIX: &str = "testplayer";

const OUTCOMES: [Outcome; 7] = [
    Outcome::WhiteWinByCheckmate,
    Outcome::BlackWinByCheckmate,
    Outcome::Resignation { loser: Side::White },
    Outcome::Resignation { loser: Side::Black },
    Outcome::DrawAgreed,
    Outcome::DrawByRule,
    Outcome::Stalemate,
];

pub fn test_player_filter() -> RecordFilter {
    RecordFilter::ParticipantPrefix(TEST_PLAYER_PREFIX.to_string())
}

/// `games` deterministic results between `players` synthetic participants.
/// Fewer than two players yields nothing.
pub fn synthetic_results(players: usize, games: usize, seed: u64, now: u64) -> Vec<ResultRecord> {
    if players < 2 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);

    (0..games)
        .map(|i| {
            let white = rng.gen_range(0..players);
            let mut black = rng.gen_range(0..players - 1);
            if black >= white {
                black += 1;
            }
            let outcome = OUTCOMES[rng.gen_range(0..OUTCOMES.len())];
            let started_at = now.saturating_sub(((games - i) as u64) * 60_000);
            ResultRecord {
                session_name: format!("{}-game-{}", TEST_PLAYER_PREFIX, i + 1),
                white: format!("{}{}", TEST_PLAYER_PREFIX, white + 1),
                black: format!("{}{}", TEST_PLAYER_PREFIX, black + 1),
                started_at,
                ended_at: started_at + 30_000,
                outcome,
                movetext: format_movetext(&[], outcome.tag()),
            }
        })
        .collect()
}
