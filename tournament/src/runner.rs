// ═══════════════════════════════════════════════════════════════════════
// Match Runner — drives a complete headless match with providers
// ═══════════════════════════════════════════════════════════════════════

use crate::error::TournamentError;
use conquest_agents::DecisionProvider;
use conquest_engine::config::MatchConfig;
use conquest_engine::engine::{self, fallback_action};
use conquest_engine::error::MatchError;
use conquest_engine::rules;
use conquest_engine::setup::create_match;
use conquest_engine::trivia::{QuestionBank, QuestionProvider};
use conquest_engine::types::*;
use conquest_engine::visibility::match_view;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Result of a completed match.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub seed: u64,
    pub winner: Option<PlayerId>,
    pub turns_played: u32,
    pub battles: usize,
    pub standings: Vec<PlayerResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerResult {
    pub standing: Standing,
    pub provider: String,
}

impl MatchResult {
    /// Provider name of the winner, if any.
    pub fn winner_provider(&self) -> Option<&str> {
        let winner = self.winner?;
        self.standings.iter()
            .find(|r| r.standing.player == winner)
            .map(|r| r.provider.as_str())
    }
}

/// Run a complete match on a fresh map. Provider `i` plays `PlayerId(i + 1)`.
pub fn run_match(
    providers: &mut [Box<dyn DecisionProvider>],
    config: &MatchConfig,
    seed: u64,
    questions: &mut dyn QuestionProvider,
    max_decisions: usize, // safety limit against runaway matches
) -> Result<MatchResult, TournamentError> {
    let seats: Vec<PlayerSeat> = providers.iter()
        .map(|p| PlayerSeat { name: p.name().to_string(), kind: p.kind() })
        .collect();
    let mut state = create_match(config.clone(), &seats, seed)?;
    drive(&mut state, providers, questions, max_decisions, |_| {})
}

/// Drive an existing match (fresh or resumed) to game over.
/// `after_decision` sees the state after every applied decision.
pub fn drive<F: FnMut(&MatchState)>(
    state: &mut MatchState,
    providers: &mut [Box<dyn DecisionProvider>],
    questions: &mut dyn QuestionProvider,
    max_decisions: usize,
    mut after_decision: F,
) -> Result<MatchResult, TournamentError> {
    let mut decisions = 0usize;

    loop {
        engine::advance(state, questions)?;
        if state.is_over() {
            let result = build_result(state, providers);
            info!(seed = state.seed, winner = ?result.winner, turns = result.turns_played, "match finished");
            return Ok(result);
        }

        let Some(pending) = state.pending.clone() else {
            return Err(TournamentError::Stalled(state.phase));
        };
        let player = pending.player();
        let provider = (player.0 as usize)
            .checked_sub(1)
            .and_then(|i| providers.get_mut(i))
            .ok_or(TournamentError::MissingProvider(player))?;

        let action = provider.decide(&match_view(state, player));
        debug!(%player, provider = provider.name(), ?action, "decision");
        match engine::apply_action(state, action) {
            Ok(()) => {}
            Err(err @ (MatchError::NotACandidate { .. }
                | MatchError::UnexpectedAction(_)
                | MatchError::IllegalAttack { .. }
                | MatchError::IllegalFortify { .. })) => {
                warn!(%player, provider = provider.name(), error = %err, "rejected decision, using fallback");
                engine::apply_action(state, fallback_action(&pending))?;
            }
            Err(err) => return Err(err.into()),
        }

        decisions += 1;
        after_decision(state);
        if decisions > max_decisions {
            return Err(TournamentError::DecisionLimit { limit: max_decisions, turn: state.current_turn });
        }
    }
}

fn build_result(state: &MatchState, providers: &[Box<dyn DecisionProvider>]) -> MatchResult {
    let standings = rules::standings(state)
        .into_iter()
        .map(|standing| {
            let provider = (standing.player.0 as usize)
                .checked_sub(1)
                .and_then(|i| providers.get(i))
                .map_or_else(String::new, |p| p.name().to_string());
            PlayerResult { standing, provider }
        })
        .collect();

    MatchResult {
        seed: state.seed,
        winner: state.winner,
        turns_played: state.current_turn,
        battles: state.history.iter().filter(|h| matches!(h, HistoryEntry::Battle(_))).count(),
        standings,
    }
}

// ── Tournaments ────────────────────────────────────────────────────────

/// Play one match per seed in parallel. `lineup(seed)` builds fresh
/// providers for each match; every match draws from its own copy of the
/// question bank.
pub fn run_tournament<L>(
    lineup: L,
    config: &MatchConfig,
    seeds: &[u64],
    questions: &QuestionBank,
    max_decisions: usize,
) -> Vec<(u64, Result<MatchResult, TournamentError>)>
where
    L: Fn(u64) -> Vec<Box<dyn DecisionProvider>> + Sync,
{
    seeds.par_iter()
        .map(|&seed| {
            let mut providers = lineup(seed);
            let mut bank = questions.clone();
            (seed, run_match(&mut providers, config, seed, &mut bank, max_decisions))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_agents::{Difficulty, HeuristicProvider, RandomProvider, ScriptedProvider};

    fn bank() -> QuestionBank {
        QuestionBank::sample().unwrap()
    }

    #[test]
    fn test_random_match_finishes() {
        let mut providers: Vec<Box<dyn DecisionProvider>> = vec![
            Box::new(RandomProvider::new(1)),
            Box::new(RandomProvider::new(2)),
            Box::new(RandomProvider::new(3)),
        ];
        let result = run_match(&mut providers, &MatchConfig::default(), 42, &mut bank(), 50_000).unwrap();
        assert!(result.winner.is_some());
        assert_eq!(result.standings.len(), 3);
        assert_eq!(result.standings[0].standing.rank, 1);
        assert!(result.winner_provider().is_some());
    }

    #[test]
    fn test_expert_beats_dunce() {
        let mut wins = 0;
        for seed in 0..10 {
            let mut providers: Vec<Box<dyn DecisionProvider>> = vec![
                Box::new(ScriptedProvider::always_right("Expert")),
                Box::new(ScriptedProvider::always_wrong("Dunce")),
            ];
            let result = run_match(&mut providers, &MatchConfig::default(), seed, &mut bank(), 50_000).unwrap();
            if result.winner_provider() == Some("Expert") {
                wins += 1;
            }
        }
        assert_eq!(wins, 10);
    }

    #[test]
    fn test_decision_limit() {
        let mut providers: Vec<Box<dyn DecisionProvider>> = vec![
            Box::new(RandomProvider::new(1)),
            Box::new(RandomProvider::new(2)),
        ];
        let err = run_match(&mut providers, &MatchConfig::default(), 7, &mut bank(), 3).unwrap_err();
        assert!(matches!(err, TournamentError::DecisionLimit { limit: 3, .. }));
    }

    #[test]
    fn test_missing_provider() {
        let mut providers: Vec<Box<dyn DecisionProvider>> = vec![
            Box::new(RandomProvider::new(1)),
            Box::new(RandomProvider::new(2)),
        ];
        let seats = vec![PlayerSeat::ai("A"), PlayerSeat::ai("B"), PlayerSeat::ai("C")];
        let mut state = create_match(MatchConfig::default(), &seats, 3).unwrap();
        let mut questions = bank();
        let err = drive(&mut state, &mut providers, &mut questions, 10_000, |_| {}).unwrap_err();
        assert!(matches!(err, TournamentError::MissingProvider(PlayerId(3))));
    }

    #[test]
    fn test_same_seed_same_result() {
        let lineup = |seed: u64| -> Vec<Box<dyn DecisionProvider>> {
            vec![
                Box::new(HeuristicProvider::new(Difficulty::Hard, seed)),
                Box::new(HeuristicProvider::new(Difficulty::Easy, seed + 1)),
                Box::new(RandomProvider::new(seed + 2)),
            ]
        };
        let seeds = [5, 6, 7, 5];
        let results = run_tournament(lineup, &MatchConfig::default(), &seeds, &bank(), 50_000);
        assert_eq!(results.len(), 4);

        let first = results[0].1.as_ref().unwrap();
        let again = results[3].1.as_ref().unwrap();
        assert_eq!(first.winner, again.winner);
        assert_eq!(first.turns_played, again.turns_played);
        assert_eq!(first.battles, again.battles);
    }
}
