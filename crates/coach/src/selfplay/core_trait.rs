use super::context::WorkerContext;
use crate::communication::SlotId;

/// The search side of self-play.
///
/// An agent runs on its own blocking thread. It plays exactly `games` games,
/// calling [`WorkerContext::evaluate`] whenever it has a full batch of
/// positions, [`WorkerContext::emit`] for every training example and
/// [`WorkerContext::finish_game`] once per finished game. Completion is
/// reported by the runtime after `play` returns, so it happens exactly once.
///
/// # Example
///
/// ```ignore
/// struct Agent;
///
/// impl SelfPlay for Agent {
///     fn play(&mut self, games: usize, ctx: &mut WorkerContext) -> anyhow::Result<()> {
///         for _ in 0..games {
///             let evaluation = ctx.evaluate(|boards| boards.fill(0.0))?;
///             let record = GameRecord::new(vec![0.0; 9], evaluation.policy(0).to_vec(), 0.0);
///             drop(evaluation);
///             ctx.emit(record)?;
///             ctx.finish_game();
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait SelfPlay: Send + 'static {
    fn play(&mut self, games: usize, ctx: &mut WorkerContext) -> anyhow::Result<()>;
}

impl SelfPlay for Box<dyn SelfPlay> {
    fn play(&mut self, games: usize, ctx: &mut WorkerContext) -> anyhow::Result<()> {
        (**self).play(games, ctx)
    }
}

/// Builds a fresh agent for a slot at the start of every iteration.
pub trait SelfPlayFactory: Send + Sync {
    type Agent: SelfPlay;

    fn create(&self, slot: SlotId) -> Self::Agent;
}

impl<F, A> SelfPlayFactory for F
where
    F: Fn(SlotId) -> A + Send + Sync,
    A: SelfPlay,
{
    type Agent = A;

    fn create(&self, slot: SlotId) -> A {
        self(slot)
    }
}

/// Splits `games` over `workers` so that the shares sum to `games`.
///
/// The first `games % workers` workers play one extra game.
pub fn split_games(games: usize, workers: usize) -> Vec<usize> {
    if workers == 0 {
        return vec![];
    }
    let base = games / workers;
    let extra = games % workers;
    (0..workers)
        .map(|idx| base + usize::from(idx < extra))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_games_sums_to_total() {
        assert_eq!(split_games(4, 2), vec![2, 2]);
        assert_eq!(split_games(10, 4), vec![3, 3, 2, 2]);
        assert_eq!(split_games(1, 3), vec![1, 0, 0]);
        assert_eq!(split_games(5, 0), Vec::<usize>::new());

        for workers in 1..9 {
            for games in 0..40 {
                assert_eq!(split_games(games, workers).iter().sum::<usize>(), games);
            }
        }
    }
}
