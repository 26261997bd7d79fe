//! Match play decided by weighted coin flips.

use async_trait::async_trait;
use coach::arena::{Arena, MatchOutcome, Opponent};
use rand::prelude::*;
use rand::rngs::StdRng;
use crate::network::UniformNetwork;

const DRAW_RATE: f64 = 0.1;

pub struct CoinFlipArena {
    rng: StdRng,
}

impl CoinFlipArena {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait]
impl Arena<UniformNetwork> for CoinFlipArena {
    async fn play_match(
        &mut self,
        candidate: &UniformNetwork,
        opponent: Opponent<'_, UniformNetwork>,
        games: usize,
    ) -> anyhow::Result<MatchOutcome> {
        let win_chance = match opponent {
            Opponent::Random => 0.8,
            Opponent::Greedy => 0.6,
            // newer generations get a slight edge
            Opponent::Previous(best) if candidate.generation() > best.generation() => 0.55,
            Opponent::Previous(_) => 0.5,
        };

        let mut outcome = MatchOutcome::default();
        for _ in 0..games {
            if self.rng.gen_bool(DRAW_RATE) {
                outcome.draws += 1;
            } else if self.rng.gen_bool(win_chance) {
                outcome.candidate_wins += 1;
            } else {
                outcome.opponent_wins += 1;
            }
        }
        Ok(outcome)
    }
}
