// ═══════════════════════════════════════════════════════════════════════
// Match Engine — phase state machine and action resolution
//
// Every player input is an answer to one question the engine posed in
// `state.pending`, either a region choice or a trivia answer. Nothing
// else mutates the match from outside.
//
// Question rounds: a `QuestionRound` holds the question, its participants
// and the answers collected so far. Each participant is asked in turn;
// once the last one has answered (or timed out) the round is scored and
// dropped. Occupation rounds rank everyone and hand out claims; battle
// rounds feed `combat::resolve_battle`, and a tie opens a second, open
// answer round between the two parties.
//
// Capital attacks: a won hit that leaves the capital standing starts a
// new battle on the same region, still inside the attacker's turn. The
// turn ends when the capital falls or the attacker loses a hit.
//
// Setup → Spawning → Occupying → Turn ⇄ {Battle, CapitalAttack} → GameOver
// ═══════════════════════════════════════════════════════════════════════

use crate::combat::{self, BattleOutcome};
use crate::error::MatchError;
use crate::invariants;
use crate::rules;
use crate::trivia::{fallback_question, Question, QuestionKind, QuestionProvider};
use crate::types::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Answers a provider submits to resolve the pending decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Occupation claim, or the turn's target: an enemy region attacks it,
    /// an owned region fortifies it.
    ChooseRegion { region: RegionId, elapsed_ms: u64 },

    /// Multiple-choice answer (option text).
    AnswerChoice { answer: String, elapsed_ms: u64 },

    /// Open numeric answer.
    AnswerNumber { answer: f64, elapsed_ms: u64 },

    /// The provider ran out of time.
    Timeout,
}

/// Deterministic answer used when a provider times out or keeps
/// submitting illegal choices.
pub fn fallback_action(pending: &PendingDecision) -> Action {
    match pending {
        PendingDecision::ChooseRegion { candidates, .. } => match candidates.first() {
            Some(first) => Action::ChooseRegion { region: *first, elapsed_ms: 0 },
            None => Action::Timeout,
        },
        PendingDecision::AnswerMultipleChoice { .. } | PendingDecision::AnswerOpen { .. } => Action::Timeout,
    }
}

/// The question currently being asked, if any.
pub fn current_question(state: &MatchState) -> Option<&Question> {
    state.question_round.as_ref().map(|r| &r.question)
}

// ── Advance ────────────────────────────────────────────────────────────

/// Advance the match. Processes automatic transitions until a player
/// decision is needed (sets `state.pending`) or the match ends.
pub fn advance(state: &mut MatchState, questions: &mut dyn QuestionProvider) -> Result<(), MatchError> {
    loop {
        if state.pending.is_some() || state.is_over() {
            return Ok(());
        }

        match state.phase {
            Phase::Setup => start_match(state)?,
            Phase::Spawning => spawn_capitals(state)?,
            Phase::Occupying => advance_occupation(state, questions),
            Phase::Turn => advance_turn(state),
            Phase::Battle | Phase::CapitalAttack => advance_battle(state, questions)?,
            Phase::GameOver => return Ok(()),
        }
    }
}

fn start_match(state: &mut MatchState) -> Result<(), MatchError> {
    let players = state.players.len();
    if players < state.config.min_players || players > state.config.max_players {
        return Err(MatchError::InvalidSetup(format!(
            "{} players, need {}-{}", players, state.config.min_players, state.config.max_players
        )));
    }
    if state.regions.len() < players {
        return Err(MatchError::InvalidSetup(format!(
            "{} regions cannot hold {} capitals", state.regions.len(), players
        )));
    }
    state.phase = Phase::Spawning;
    info!(players, regions = state.regions.len(), "match started");
    Ok(())
}

/// Place every capital in random player order.
fn spawn_capitals(state: &mut MatchState) -> Result<(), MatchError> {
    let mut order: Vec<PlayerId> = state.players.keys().copied().collect();
    order.shuffle(&mut state.next_rng());

    for player in order {
        if state.player(player).capital.is_some() {
            continue;
        }
        let candidates = rules::spawn_candidates(state);
        let region = *candidates.choose(&mut state.next_rng())
            .ok_or_else(|| MatchError::InvalidSetup("no region left for a capital".into()))?;
        rules::place_capital(state, player, region)?;
    }

    state.phase = Phase::Occupying;
    info!("capitals placed, occupation begins");
    Ok(())
}

/// Draw a question, substituting the built-in fallback when the provider
/// has nothing usable.
fn draw_question(state: &mut MatchState, questions: &mut dyn QuestionProvider, kind: QuestionKind) -> Question {
    let categories = state.config.included_categories();
    let mut rng = state.next_rng();
    match questions.get_question(&categories, kind, &mut rng) {
        Some(q) if q.kind == kind && q.validate().is_ok() => q,
        Some(q) => {
            warn!(id = q.id, %kind, "unusable question, using fallback");
            fallback_question(kind)
        }
        None => {
            warn!(%kind, "no matching question, using fallback");
            fallback_question(kind)
        }
    }
}

fn ask(state: &mut MatchState, question: Question, purpose: QuestionPurpose, participants: Vec<PlayerId>) {
    debug!(id = question.id, ?purpose, ?participants, "question asked");
    state.question_round = Some(QuestionRound { question, purpose, participants, answers: Vec::new() });
}

/// Set `pending` for the next participant of the open round. Returns false
/// when everyone has answered.
fn request_answer(state: &mut MatchState) -> bool {
    let Some(round) = &state.question_round else { return false };
    let Some(player) = round.next_to_answer() else { return false };
    let budgets = state.config.time_budgets;
    state.pending = Some(match (round.question.kind, round.purpose) {
        (QuestionKind::MultipleChoice, _) => PendingDecision::AnswerMultipleChoice {
            player,
            time_budget_ms: budgets.multiple_choice_ms,
        },
        (QuestionKind::OpenAnswer, purpose) => PendingDecision::AnswerOpen {
            player,
            purpose,
            time_budget_ms: if purpose == QuestionPurpose::Occupation {
                budgets.occupation_ms
            } else {
                budgets.tiebreak_ms
            },
        },
    });
    state.current_player = Some(player);
    true
}

// ── Occupation ─────────────────────────────────────────────────────────

fn advance_occupation(state: &mut MatchState, questions: &mut dyn QuestionProvider) {
    if state.question_round.is_some() {
        if request_answer(state) {
            return;
        }
        if let Some(round) = state.question_round.take() {
            let correct = round.question.numeric_answer().unwrap_or(0.0);
            let ranking = combat::rank_open_answers(correct, &round.answers);
            info!(?ranking, "occupation ranking");

            state.occupation_claims.clear();
            if let Some(&first) = ranking.first() {
                state.occupation_claims.extend([first, first]);
            }
            if let Some(&second) = ranking.get(1) {
                state.occupation_claims.push(second);
            }
            state.occupation_ranking = ranking;
        }
        return;
    }

    if state.unclaimed_regions().is_empty() {
        state.occupation_claims.clear();
        enter_turn_phase(state);
        return;
    }

    if let Some(&player) = state.occupation_claims.first() {
        let candidates = rules::occupation_candidates(state, player);
        state.current_player = Some(player);
        state.pending = Some(PendingDecision::ChooseRegion {
            player,
            candidates,
            purpose: ChoicePurpose::Occupy,
            time_budget_ms: state.config.time_budgets.region_choice_ms,
        });
        return;
    }

    let question = draw_question(state, questions, QuestionKind::OpenAnswer);
    let participants = state.alive_players();
    ask(state, question, QuestionPurpose::Occupation, participants);
}

pub(crate) fn enter_turn_phase(state: &mut MatchState) {
    state.turn_order = rules::turn_order(state);
    state.turn_budget = state.max_turns_per_player.saturating_mul(state.turn_order.len() as u32);
    state.current_turn = 0;
    state.current_player = None;
    state.phase = Phase::Turn;
    info!(order = ?state.turn_order, budget = state.turn_budget, "turn phase begins");
}

// ── Turns ──────────────────────────────────────────────────────────────

fn advance_turn(state: &mut MatchState) {
    if state.turn_order.is_empty() || state.current_turn >= state.turn_budget {
        let winner = rules::leader(state);
        game_over(state, winner);
        return;
    }

    let player = state.turn_order[state.current_turn as usize % state.turn_order.len()];
    state.current_player = Some(player);
    let roll: f64 = state.next_rng().gen();
    state.is_special_round = roll < state.config.special_round_probability;

    if !state.player(player).alive {
        finish_turn(state, player, TurnAction::Eliminated);
        return;
    }

    let actions = rules::available_actions(state, player);
    if actions.is_empty() {
        debug!(%player, "no legal action, turn skipped");
        finish_turn(state, player, TurnAction::NoAction);
        return;
    }

    if state.is_special_round {
        info!(%player, turn = state.current_turn + 1, "special round, gains doubled");
    }
    state.pending = Some(PendingDecision::ChooseRegion {
        player,
        candidates: actions.candidates(),
        purpose: ChoicePurpose::TurnAction { attack: actions.attack, fortify: actions.fortify },
        time_budget_ms: state.config.time_budgets.region_choice_ms,
    });
}

/// Close one turn slot: record it, advance the counter, run capital upkeep
/// and the win check.
fn finish_turn(state: &mut MatchState, player: PlayerId, action: TurnAction) {
    state.history.push(HistoryEntry::Turn(TurnRecord {
        turn: state.current_turn + 1,
        player,
        action,
        special_round: state.is_special_round,
    }));
    state.current_turn += 1;
    if let Some(p) = state.players.get_mut(&player) {
        if p.alive {
            p.turns_played += 1;
        }
    }
    rules::update_capitals(state);
    state.is_special_round = false;
    state.current_player = None;
    state.phase = Phase::Turn;

    if let Some(winner) = rules::check_winner(state) {
        game_over(state, Some(winner));
    } else if state.current_turn >= state.turn_budget {
        let winner = rules::leader(state);
        game_over(state, winner);
    }
}

fn game_over(state: &mut MatchState, winner: Option<PlayerId>) {
    state.phase = Phase::GameOver;
    state.winner = winner;
    state.pending = None;
    state.current_battle = None;
    state.question_round = None;
    state.current_player = None;
    info!(winner = ?winner, turns = state.current_turn, "game over");
}

// ── Battles ────────────────────────────────────────────────────────────

fn start_battle(state: &mut MatchState, attacker: PlayerId, region: RegionId) -> Result<(), MatchError> {
    if !rules::can_attack(state, attacker, region) {
        return Err(MatchError::IllegalAttack { player: attacker, region });
    }
    let target = state.region(region);
    let defender = target.owner.ok_or(MatchError::IllegalAttack { player: attacker, region })?;
    let capital_attack = target.kind == RegionKind::Capital && state.capitals.contains_key(&region);

    state.current_battle = Some(BattleResult::new(attacker, defender, region, capital_attack));
    state.phase = if capital_attack { Phase::CapitalAttack } else { Phase::Battle };
    info!(%attacker, %defender, %region, capital_attack, "battle begins");
    Ok(())
}

fn advance_battle(state: &mut MatchState, questions: &mut dyn QuestionProvider) -> Result<(), MatchError> {
    let Some(battle) = state.current_battle.clone() else {
        // Nothing in flight; fall back to the turn loop.
        state.phase = Phase::Turn;
        return Ok(());
    };

    if state.question_round.is_none() {
        let (kind, purpose) = if battle.needs_tiebreak() {
            (QuestionKind::OpenAnswer, QuestionPurpose::Tiebreak)
        } else {
            (QuestionKind::MultipleChoice, QuestionPurpose::Battle)
        };
        let question = draw_question(state, questions, kind);
        ask(state, question, purpose, vec![battle.attacker, battle.defender]);
    }

    if request_answer(state) {
        return Ok(());
    }

    let Some(round) = state.question_round.take() else { return Ok(()) };
    let resolved = match round.purpose {
        QuestionPurpose::Tiebreak => {
            let correct = round.question.numeric_answer().unwrap_or(0.0);
            let ranking = combat::rank_open_answers(correct, &round.answers);
            debug!(?ranking, "tiebreak ranking");
            combat::resolve_tiebreak(battle, ranking)
        }
        _ => {
            let correct = |p: PlayerId| match round.answer_of(p).map(|a| &a.answer) {
                Some(AnswerValue::Choice(Some(text))) => round.question.is_correct_choice(text),
                _ => false,
            };
            let (a, d) = (correct(battle.attacker), correct(battle.defender));
            debug!(attacker_correct = a, defender_correct = d, "battle answers");
            combat::resolve_battle(battle, a, d)
        }
    };

    if resolved.winner.is_none() {
        // Both right: keep the battle open for the tiebreak round.
        state.current_battle = Some(resolved);
        return Ok(());
    }
    conclude_battle(state, resolved)
}

fn conclude_battle(state: &mut MatchState, battle: BattleResult) -> Result<(), MatchError> {
    let outcome = combat::apply_battle(state, &battle)?;
    state.history.push(HistoryEntry::Battle(battle.clone()));
    state.current_battle = None;

    let press_on = matches!(outcome, BattleOutcome::CapitalDamaged { .. })
        && state.capitals.contains_key(&battle.region)
        && state.players.get(&battle.defender).is_some_and(|p| p.alive);

    if press_on {
        debug!(attacker = %battle.attacker, region = %battle.region, "capital still standing, attacking again");
        state.current_battle = Some(BattleResult::new(battle.attacker, battle.defender, battle.region, true));
        state.phase = Phase::CapitalAttack;
        return Ok(());
    }

    finish_turn(state, battle.attacker, TurnAction::Attack(battle.region));
    Ok(())
}

// ── Apply action ───────────────────────────────────────────────────────

/// Apply a provider's answer to the pending decision. Illegal input is
/// rejected before any mutation and leaves `pending` in place.
pub fn apply_action(state: &mut MatchState, action: Action) -> Result<(), MatchError> {
    if state.is_over() {
        return Err(MatchError::MatchOver(state.phase));
    }
    let pending = state.pending.clone().ok_or(MatchError::NoPendingDecision)?;

    match &pending {
        PendingDecision::ChooseRegion { player, candidates, purpose, time_budget_ms } => {
            let region = match action {
                Action::ChooseRegion { region, elapsed_ms } if elapsed_ms <= *time_budget_ms => region,
                Action::ChooseRegion { .. } | Action::Timeout => {
                    warn!(%player, "region choice timed out, taking first candidate");
                    *candidates.first().ok_or_else(|| {
                        MatchError::UnexpectedAction(format!("timeout with no candidates for {}", player))
                    })?
                }
                other => return Err(MatchError::UnexpectedAction(format!("{:?} for a region choice", other))),
            };
            if !candidates.contains(&region) {
                return Err(MatchError::NotACandidate { region });
            }
            apply_region_choice(state, *player, region, purpose)?;
        }

        PendingDecision::AnswerMultipleChoice { player, time_budget_ms } => {
            let submitted = match action {
                Action::AnswerChoice { answer, elapsed_ms } if elapsed_ms <= *time_budget_ms => {
                    SubmittedAnswer { player: *player, answer: AnswerValue::Choice(Some(answer)), elapsed_ms }
                }
                Action::AnswerChoice { .. } | Action::Timeout => {
                    warn!(%player, "multiple-choice answer timed out");
                    SubmittedAnswer { player: *player, answer: AnswerValue::Choice(None), elapsed_ms: *time_budget_ms }
                }
                other => return Err(MatchError::UnexpectedAction(format!("{:?} for a multiple-choice question", other))),
            };
            record_answer(state, submitted)?;
        }

        PendingDecision::AnswerOpen { player, time_budget_ms, .. } => {
            let submitted = match action {
                Action::AnswerNumber { answer, elapsed_ms } if elapsed_ms <= *time_budget_ms => {
                    let value = Some(answer).filter(|v| v.is_finite());
                    SubmittedAnswer { player: *player, answer: AnswerValue::Number(value), elapsed_ms }
                }
                Action::AnswerNumber { .. } | Action::Timeout => {
                    warn!(%player, "open answer timed out, submitting 0");
                    SubmittedAnswer { player: *player, answer: AnswerValue::Number(Some(0.0)), elapsed_ms: *time_budget_ms }
                }
                other => return Err(MatchError::UnexpectedAction(format!("{:?} for an open question", other))),
            };
            record_answer(state, submitted)?;
        }
    }

    state.pending = None;
    check_state(state)
}

fn apply_region_choice(
    state: &mut MatchState,
    player: PlayerId,
    region: RegionId,
    purpose: &ChoicePurpose,
) -> Result<(), MatchError> {
    match purpose {
        ChoicePurpose::Occupy => {
            rules::claim_region(state, player, region)?;
            if !state.occupation_claims.is_empty() {
                state.occupation_claims.remove(0);
            }
            Ok(())
        }
        ChoicePurpose::TurnAction { fortify, .. } => {
            if fortify.contains(&region) {
                rules::fortify(state, player, region)?;
                finish_turn(state, player, TurnAction::Fortify(region));
                Ok(())
            } else {
                start_battle(state, player, region)
            }
        }
    }
}

fn record_answer(state: &mut MatchState, submitted: SubmittedAnswer) -> Result<(), MatchError> {
    let round = state.question_round.as_mut().ok_or(MatchError::NoPendingDecision)?;
    if round.next_to_answer() != Some(submitted.player) {
        return Err(MatchError::UnexpectedAction(format!("{} is not due to answer", submitted.player)));
    }
    debug!(player = %submitted.player, answer = ?submitted.answer, elapsed_ms = submitted.elapsed_ms, "answer recorded");
    round.answers.push(submitted);
    Ok(())
}

#[cfg(debug_assertions)]
fn check_state(state: &MatchState) -> Result<(), MatchError> {
    let violations = invariants::check(state);
    if violations.is_empty() { Ok(()) } else { Err(MatchError::StateViolation(violations)) }
}

#[cfg(not(debug_assertions))]
fn check_state(_state: &MatchState) -> Result<(), MatchError> {
    Ok(())
}

/// Full diagnostic pass, available in every build.
pub fn validate(state: &MatchState) -> Result<(), MatchError> {
    let violations = invariants::check(state);
    if violations.is_empty() { Ok(()) } else { Err(MatchError::StateViolation(violations)) }
}
