//! Head-to-head evaluation of a freshly trained network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a match, counted from the candidate's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub candidate_wins: usize,
    pub opponent_wins: usize,
    pub draws: usize,
}

impl MatchOutcome {
    pub fn new(candidate_wins: usize, opponent_wins: usize, draws: usize) -> Self {
        Self {
            candidate_wins,
            opponent_wins,
            draws,
        }
    }

    pub fn games(&self) -> usize {
        self.candidate_wins + self.opponent_wins + self.draws
    }

    pub fn decisive(&self) -> usize {
        self.candidate_wins + self.opponent_wins
    }

    /// Share of decisive games won by the candidate; `None` when every game was drawn.
    pub fn win_rate(&self) -> Option<f64> {
        match self.decisive() {
            0 => None,
            decisive => Some(self.candidate_wins as f64 / decisive as f64),
        }
    }
}

/// Who the candidate plays against.
#[derive(Debug)]
pub enum Opponent<'a, N> {
    /// The network restored from the best checkpoint.
    Previous(&'a N),
    /// Uniformly random legal moves.
    Random,
    /// One-ply greedy baseline.
    Greedy,
}

impl<N> Opponent<'_, N> {
    pub fn label(&self) -> &'static str {
        match self {
            Opponent::Previous(_) => "best",
            Opponent::Random => "random",
            Opponent::Greedy => "greedy",
        }
    }
}

/// The match-play collaborator.
#[async_trait]
pub trait Arena<N>: Send
where
    N: Send + Sync,
{
    async fn play_match(&mut self, candidate: &N, opponent: Opponent<'_, N>, games: usize) -> anyhow::Result<MatchOutcome>;
}

/// Whether a candidate replaces the best checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionDecision {
    Promote,
    Reject,
    /// Every game was drawn; treated as a rejection.
    NoDecisiveGames,
}

impl PromotionDecision {
    /// Promote iff the win rate against best reaches `threshold`.
    pub fn decide(outcome: &MatchOutcome, threshold: f64) -> Self {
        match outcome.win_rate() {
            None => PromotionDecision::NoDecisiveGames,
            Some(rate) if rate >= threshold => PromotionDecision::Promote,
            Some(_) => PromotionDecision::Reject,
        }
    }

    pub fn is_promoted(&self) -> bool {
        matches!(self, PromotionDecision::Promote)
    }
}

/// Outcomes of the three evaluation matches of an iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationReport {
    pub random: MatchOutcome,
    pub greedy: MatchOutcome,
    pub best: MatchOutcome,
    pub decision: PromotionDecision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_rate_ignores_draws() {
        let outcome = MatchOutcome::new(3, 1, 6);
        assert_eq!(outcome.games(), 10);
        assert_eq!(outcome.decisive(), 4);
        assert_eq!(outcome.win_rate(), Some(0.75));
    }

    #[test]
    fn test_promotes_above_threshold() {
        let outcome = MatchOutcome::new(6, 4, 0);
        assert_eq!(outcome.win_rate(), Some(0.6));
        assert_eq!(PromotionDecision::decide(&outcome, 0.55), PromotionDecision::Promote);
    }

    #[test]
    fn test_all_draws_are_not_promoted() {
        let outcome = MatchOutcome::new(0, 0, 10);
        assert_eq!(outcome.win_rate(), None);
        let decision = PromotionDecision::decide(&outcome, 0.55);
        assert_eq!(decision, PromotionDecision::NoDecisiveGames);
        assert!(!decision.is_promoted());
    }

    #[test]
    fn test_rejects_below_threshold() {
        let outcome = MatchOutcome::new(5, 5, 0);
        assert_eq!(PromotionDecision::decide(&outcome, 0.55), PromotionDecision::Reject);
        // the threshold itself is accepted
        assert!(PromotionDecision::decide(&outcome, 0.5).is_promoted());
    }

    #[test]
    fn test_opponent_labels() {
        let previous = 1u8;
        assert_eq!(Opponent::Previous(&previous).label(), "best");
        assert_eq!(Opponent::<u8>::Random.label(), "random");
        assert_eq!(Opponent::<u8>::Greedy.label(), "greedy");
    }
}
