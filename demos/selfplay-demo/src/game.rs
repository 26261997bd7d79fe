//! A toy placement game: players alternately claim empty cells until the board
//! is full, and the winner is drawn at random. It exists to exercise the
//! evaluation protocol, not to be learned.

use anyhow::bail;
use coach::communication::{SlotId, SlotShape};
use coach::selfplay::{GameRecord, SelfPlay, WorkerContext};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

pub struct ToyAgent {
    rng: StdRng,
}

impl ToyAgent {
    pub fn new(slot: SlotId, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed.wrapping_add(slot.0 as u64)),
        }
    }

    fn play_game(&mut self, ctx: &mut WorkerContext) -> anyhow::Result<()> {
        let shape = ctx.shape();
        let cells = shape.state_len();
        if shape.actions < cells {
            bail!("action space of {} cannot address {} cells", shape.actions, cells);
        }

        let mut board = vec![0.0f32; cells];
        let mut history: Vec<(Vec<f32>, Vec<f32>)> = Vec::with_capacity(cells);

        while board.iter().any(|cell| *cell == 0.0) {
            let evaluation = ctx.evaluate(|boards| fill_batch(boards, &board, shape))?;
            let policy = legal_policy(evaluation.policy(0), &board, shape);
            drop(evaluation);

            let chosen = WeightedIndex::new(&policy[..cells])?.sample(&mut self.rng);
            history.push((board.clone(), policy));
            board[chosen] = 1.0;
            // next player sees the board from their side
            board.iter_mut().for_each(|cell| *cell = -*cell);
        }

        let first_player_won = self.rng.gen_bool(0.5);
        for (ply, (state, policy)) in history.into_iter().enumerate() {
            let mover_won = (ply % 2 == 0) == first_player_won;
            let value = if mover_won { 1.0 } else { -1.0 };
            ctx.emit(GameRecord::new(state, policy, value))?;
        }
        ctx.finish_game();
        Ok(())
    }
}

impl SelfPlay for ToyAgent {
    fn play(&mut self, games: usize, ctx: &mut WorkerContext) -> anyhow::Result<()> {
        for _ in 0..games {
            self.play_game(ctx)?;
        }
        Ok(())
    }
}

/// Every row of the batch holds the current board.
fn fill_batch(boards: &mut [f32], board: &[f32], shape: SlotShape) {
    for row in boards.chunks_mut(shape.state_len()) {
        row.copy_from_slice(board);
    }
}

/// Masks occupied cells and renormalises. Falls back to uniform over empty cells.
fn legal_policy(raw: &[f32], board: &[f32], shape: SlotShape) -> Vec<f32> {
    let mut policy = vec![0.0; shape.actions];
    for (idx, cell) in board.iter().enumerate() {
        if *cell == 0.0 {
            policy[idx] = raw[idx].max(0.0);
        }
    }
    let total: f32 = policy.iter().sum();
    if total > 0.0 {
        policy.iter_mut().for_each(|p| *p /= total);
    } else {
        let empty = board.iter().filter(|cell| **cell == 0.0).count() as f32;
        for (idx, cell) in board.iter().enumerate() {
            if *cell == 0.0 {
                policy[idx] = 1.0 / empty;
            }
        }
    }
    policy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_policy_masks_occupied_cells() {
        let shape = SlotShape::new(1, 1, 4, 5);
        let policy = legal_policy(&[0.2; 5], &[1.0, 0.0, -1.0, 0.0], shape);
        assert_eq!(policy, vec![0.0, 0.5, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_legal_policy_falls_back_to_uniform() {
        let shape = SlotShape::new(1, 1, 3, 3);
        let policy = legal_policy(&[0.0, 0.0, 0.0], &[0.0, 1.0, 0.0], shape);
        assert_eq!(policy, vec![0.5, 0.0, 0.5]);
    }
}
