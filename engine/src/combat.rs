// ═══════════════════════════════════════════════════════════════════════
// Combat — battle resolution, open-answer ranking, captures, capital
// damage and elimination
// ═══════════════════════════════════════════════════════════════════════

use crate::error::MatchError;
use crate::rules;
use crate::types::*;
use std::cmp::Ordering;
use tracing::{debug, info};

// ── Resolution ─────────────────────────────────────────────────────────

/// Multiple-choice stage. The attacker carries the burden of proof: an
/// attacker miss is a defender win whatever the defender answered; both
/// correct leaves the winner open for a tiebreak.
pub fn resolve_battle(mut battle: BattleResult, attacker_correct: bool, defender_correct: bool) -> BattleResult {
    battle.attacker_correct = Some(attacker_correct);
    battle.defender_correct = Some(defender_correct);
    if !attacker_correct {
        battle.winner = Some(battle.defender);
        battle.defender_bonus = true;
    } else if !defender_correct {
        battle.winner = Some(battle.attacker);
        battle.region_captured = true;
    } else {
        battle.winner = None;
    }
    battle
}

/// Absolute distance from the correct value. Missing, non-numeric and
/// non-finite answers sit at infinity.
fn closeness(correct: f64, answer: &AnswerValue) -> f64 {
    match answer {
        AnswerValue::Number(Some(v)) if v.is_finite() => (v - correct).abs(),
        _ => f64::INFINITY,
    }
}

/// Closest first, then fastest. Equal on both keys keeps submission order.
pub fn rank_open_answers(correct: f64, answers: &[SubmittedAnswer]) -> Vec<PlayerId> {
    let mut keyed: Vec<(f64, u64, PlayerId)> = answers.iter()
        .map(|a| (closeness(correct, &a.answer), a.elapsed_ms, a.player))
        .collect();
    keyed.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    keyed.into_iter().map(|(_, _, p)| p).collect()
}

/// Settle a tied battle from the tiebreak ranking of its two parties.
pub fn resolve_tiebreak(mut battle: BattleResult, ranking: Vec<PlayerId>) -> BattleResult {
    let winner = ranking.iter()
        .copied()
        .find(|p| *p == battle.attacker || *p == battle.defender)
        .unwrap_or(battle.defender);
    battle.winner = Some(winner);
    if winner == battle.attacker {
        battle.region_captured = true;
    } else {
        battle.defender_bonus = true;
    }
    battle.open_answer_ranking = Some(ranking);
    battle
}

// ── Application ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    /// Tie still waiting for its tiebreak; nothing applied.
    Unresolved,
    Repelled { bonus: u32 },
    Captured { points: u32 },
    CapitalDamaged { hp: u8 },
    CapitalDestroyed { eliminated: PlayerId, score_transferred: u32 },
}

/// Apply a resolved battle to the state.
pub fn apply_battle(state: &mut MatchState, battle: &BattleResult) -> Result<BattleOutcome, MatchError> {
    let Some(winner) = battle.winner else { return Ok(BattleOutcome::Unresolved) };
    if !state.players.contains_key(&battle.attacker) {
        return Err(MatchError::UnknownPlayer(battle.attacker));
    }
    if !state.players.contains_key(&battle.defender) {
        return Err(MatchError::UnknownPlayer(battle.defender));
    }
    if !state.regions.contains_key(&battle.region) {
        return Err(MatchError::UnknownRegion(battle.region));
    }

    if winner == battle.defender {
        if let Some(capital) = state.capitals.get_mut(&battle.region) {
            capital.register_attack();
        }
        let bonus = rules::earned(state, state.config.defense_bonus);
        let defender = state.players.get_mut(&battle.defender).ok_or(MatchError::UnknownPlayer(battle.defender))?;
        defender.score = defender.score.saturating_add(bonus);
        info!(defender = %battle.defender, region = %battle.region, bonus, "attack repelled");
        return Ok(BattleOutcome::Repelled { bonus });
    }

    if battle.capital_attack {
        damage_capital(state, battle.attacker, battle.region)
    } else {
        let points = capture_region(state, battle.attacker, battle.region)?;
        Ok(BattleOutcome::Captured { points })
    }
}

/// Battle capture of a normal region. The attacker earns the region's
/// post-capture value (doubled in a special round); the former owner loses
/// the pre-capture value. Fortification is torn down.
pub fn capture_region(state: &mut MatchState, attacker: PlayerId, region: RegionId) -> Result<u32, MatchError> {
    let r = state.regions.get(&region).ok_or(MatchError::UnknownRegion(region))?;
    let previous_owner = r.owner;
    let lost = r.point_value;
    let value = rules::value_after_battle_capture(state, r);
    let points = rules::earned(state, value);

    let r = state.regions.get_mut(&region).ok_or(MatchError::UnknownRegion(region))?;
    r.owner = Some(attacker);
    r.fortification = Fortification::None;
    r.point_value = value;
    r.has_been_captured = true;

    if let Some(prev) = previous_owner {
        if let Some(p) = state.players.get_mut(&prev) {
            p.regions.remove(&region);
            p.score = p.score.saturating_sub(lost);
        }
    }
    let a = state.players.get_mut(&attacker).ok_or(MatchError::UnknownPlayer(attacker))?;
    a.regions.insert(region);
    a.score = a.score.saturating_add(points);

    info!(%attacker, %region, points, "region captured");
    Ok(points)
}

/// One successful hit on a capital. The hit that reaches 0 HP destroys it
/// and eliminates its owner.
pub fn damage_capital(state: &mut MatchState, attacker: PlayerId, region: RegionId) -> Result<BattleOutcome, MatchError> {
    let capital = state.capitals.get_mut(&region).ok_or(MatchError::IllegalAttack { player: attacker, region })?;
    let owner = capital.owner;
    if !capital.take_damage() {
        let hp = capital.current_hp;
        info!(%attacker, %region, hp, "capital damaged");
        return Ok(BattleOutcome::CapitalDamaged { hp });
    }

    let transferred = eliminate_player(state, owner, attacker)?;

    let points = state.config.capital_points;
    if let Some(r) = state.regions.get_mut(&region) {
        r.kind = RegionKind::Normal;
        r.fortification = Fortification::None;
        r.point_value = points;
        r.has_been_captured = true;
    }
    state.capitals.remove(&region);

    info!(%attacker, eliminated = %owner, %region, transferred, "capital destroyed");
    Ok(BattleOutcome::CapitalDestroyed { eliminated: owner, score_transferred: transferred })
}

/// Mark `eliminated` dead and hand everything to `conqueror`: regions at
/// their current value, the full score, and any capital records. Returns
/// the score transferred.
pub fn eliminate_player(state: &mut MatchState, eliminated: PlayerId, conqueror: PlayerId) -> Result<u32, MatchError> {
    if !state.players.contains_key(&conqueror) {
        return Err(MatchError::UnknownPlayer(conqueror));
    }
    let loser = state.players.get_mut(&eliminated).ok_or(MatchError::UnknownPlayer(eliminated))?;
    loser.alive = false;
    loser.capital = None;
    let regions = std::mem::take(&mut loser.regions);
    let transferred = std::mem::replace(&mut loser.score, 0);

    for rid in &regions {
        if let Some(r) = state.regions.get_mut(rid) {
            r.owner = Some(conqueror);
        }
    }
    for capital in state.capitals.values_mut() {
        if capital.owner == eliminated {
            capital.owner = conqueror;
        }
    }

    let winner = state.players.get_mut(&conqueror).ok_or(MatchError::UnknownPlayer(conqueror))?;
    debug!(%eliminated, %conqueror, regions = regions.len(), "territory transferred");
    winner.regions.extend(regions);
    winner.score = winner.score.saturating_add(transferred);

    state.history.push(HistoryEntry::Elimination { eliminated, conqueror, score_transferred: transferred });
    info!(%eliminated, %conqueror, transferred, "player eliminated");
    Ok(transferred)
}
