// ═══════════════════════════════════════════════════════════════════════
// Rules engine — legality, valuation, placement, fortification,
// capital upkeep, turn order, win check, standings
//
// Pure functions over MatchState. Battle resolution and elimination live
// in combat.rs.
// ═══════════════════════════════════════════════════════════════════════

use crate::error::MatchError;
use crate::types::*;
use tracing::{debug, info};

// ── Legality ───────────────────────────────────────────────────────────

/// Target must belong to someone else, and the attacker must hold a
/// region adjacent to it.
pub fn can_attack(state: &MatchState, attacker: PlayerId, region: RegionId) -> bool {
    let Some(target) = state.regions.get(&region) else { return false };
    match target.owner {
        None => false,
        Some(owner) if owner == attacker => false,
        Some(_) => target.adjacent.iter()
            .any(|adj| state.regions.get(adj).is_some_and(|r| r.owner == Some(attacker))),
    }
}

/// Owned, not yet fortified. A capital-kind region qualifies only while
/// its capital belongs to the player and sits at exactly 1 HP.
pub fn can_fortify(state: &MatchState, player: PlayerId, region: RegionId) -> bool {
    let Some(target) = state.regions.get(&region) else { return false };
    if target.owner != Some(player) || target.is_fortified() {
        return false;
    }
    if target.kind == RegionKind::Capital {
        return state.capitals.get(&region)
            .is_some_and(|c| c.owner == player && c.current_hp == 1);
    }
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableActions {
    pub attack: Vec<RegionId>,
    pub fortify: Vec<RegionId>,
}

impl AvailableActions {
    pub fn is_empty(&self) -> bool {
        self.attack.is_empty() && self.fortify.is_empty()
    }

    /// Attack targets then fortify targets; disjoint by construction.
    pub fn candidates(&self) -> Vec<RegionId> {
        self.attack.iter().chain(self.fortify.iter()).copied().collect()
    }
}

pub fn available_actions(state: &MatchState, player: PlayerId) -> AvailableActions {
    let Some(p) = state.players.get(&player) else { return AvailableActions::default() };
    if !p.alive {
        return AvailableActions::default();
    }

    let mut attack: Vec<RegionId> = Vec::new();
    for rid in &p.regions {
        for adj in &state.region(*rid).adjacent {
            if !attack.contains(adj) && can_attack(state, player, *adj) {
                attack.push(*adj);
            }
        }
    }
    attack.sort();

    let fortify = p.regions.iter()
        .copied()
        .filter(|rid| can_fortify(state, player, *rid))
        .collect();

    AvailableActions { attack, fortify }
}

// ── Valuation ──────────────────────────────────────────────────────────

/// Score delta for this turn: doubled in a special round. Region values
/// themselves are never doubled.
pub fn earned(state: &MatchState, base: u32) -> u32 {
    if state.is_special_round { base.saturating_mul(2) } else { base }
}

/// Value a region takes after a battle capture: the first capture revalues
/// to the captured value, later captures keep whatever it is worth.
pub fn value_after_battle_capture(state: &MatchState, region: &Region) -> u32 {
    if region.has_been_captured {
        region.point_value
    } else {
        state.config.captured_region_points
    }
}

// ── Placement ──────────────────────────────────────────────────────────

/// Regions a spawning capital may take: unclaimed and at least the minimum
/// distance from every capital placed so far. Falls back to every
/// unclaimed region when none qualifies.
pub fn spawn_candidates(state: &MatchState) -> Vec<RegionId> {
    let unclaimed = state.unclaimed_regions();
    let placed: Vec<Position> = state.capitals.keys().map(|rid| state.region(*rid).position).collect();
    let min = state.config.min_capital_distance;

    let spaced: Vec<RegionId> = unclaimed.iter()
        .copied()
        .filter(|rid| {
            let pos = state.region(*rid).position;
            placed.iter().all(|p| p.distance(pos) >= min)
        })
        .collect();

    if spaced.is_empty() { unclaimed } else { spaced }
}

/// Turn an unclaimed region into `player`'s capital. No score change.
pub fn place_capital(state: &mut MatchState, player: PlayerId, region: RegionId) -> Result<(), MatchError> {
    if !state.players.contains_key(&player) {
        return Err(MatchError::UnknownPlayer(player));
    }
    let max_hp = state.config.capital_max_hp;
    let points = state.config.capital_points;
    let r = state.regions.get_mut(&region).ok_or(MatchError::UnknownRegion(region))?;
    if r.owner.is_some() {
        return Err(MatchError::NotACandidate { region });
    }
    r.owner = Some(player);
    r.original_owner = Some(player);
    r.kind = RegionKind::Capital;
    r.point_value = points;

    state.capitals.insert(region, Capital::new(region, player, max_hp));
    let p = state.players.get_mut(&player).ok_or(MatchError::UnknownPlayer(player))?;
    p.regions.insert(region);
    p.capital = Some(region);
    info!(%player, %region, "capital placed");
    Ok(())
}

/// Unclaimed regions adjacent to `player`'s territory, or every unclaimed
/// region when none are adjacent.
pub fn occupation_candidates(state: &MatchState, player: PlayerId) -> Vec<RegionId> {
    let unclaimed = state.unclaimed_regions();
    let Some(p) = state.players.get(&player) else { return unclaimed };
    let adjacent: Vec<RegionId> = unclaimed.iter()
        .copied()
        .filter(|rid| state.region(*rid).adjacent.iter().any(|a| p.regions.contains(a)))
        .collect();
    if adjacent.is_empty() { unclaimed } else { adjacent }
}

/// Claim an unclaimed region during occupation. Returns the points added.
pub fn claim_region(state: &mut MatchState, player: PlayerId, region: RegionId) -> Result<u32, MatchError> {
    if !state.players.contains_key(&player) {
        return Err(MatchError::UnknownPlayer(player));
    }
    let value = state.config.initial_region_points;
    let r = state.regions.get_mut(&region).ok_or(MatchError::UnknownRegion(region))?;
    if r.owner.is_some() {
        return Err(MatchError::NotACandidate { region });
    }
    r.owner = Some(player);
    r.original_owner = Some(player);
    r.point_value = value;

    let p = state.players.get_mut(&player).ok_or(MatchError::UnknownPlayer(player))?;
    p.regions.insert(region);
    p.score = p.score.saturating_add(value);
    debug!(%player, %region, value, "region claimed");
    Ok(value)
}

// ── Fortification ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FortifyOutcome {
    Region,
    /// Damaged capital raised to the given HP (current and max).
    Capital { hp: u8 },
}

/// HP a damaged capital is raised to when fortified.
pub const FORTIFIED_CAPITAL_HP: u8 = 2;

pub fn fortify(state: &mut MatchState, player: PlayerId, region: RegionId) -> Result<FortifyOutcome, MatchError> {
    if !can_fortify(state, player, region) {
        return Err(MatchError::IllegalFortify { player, region });
    }

    if let Some(capital) = state.capitals.get_mut(&region) {
        // The region flag stays untouched; only HP moves.
        capital.current_hp = FORTIFIED_CAPITAL_HP;
        capital.max_hp = FORTIFIED_CAPITAL_HP;
        info!(%player, %region, "capital fortified");
        return Ok(FortifyOutcome::Capital { hp: FORTIFIED_CAPITAL_HP });
    }

    let r = state.regions.get_mut(&region).ok_or(MatchError::UnknownRegion(region))?;
    r.fortification = Fortification::Fortified;
    info!(%player, %region, "region fortified");
    Ok(FortifyOutcome::Region)
}

// ── Capital upkeep ─────────────────────────────────────────────────────

/// Once per completed turn: count the turn on every capital and let those
/// left alone long enough regain 1 HP. Returns the capitals that healed.
pub fn update_capitals(state: &mut MatchState) -> Vec<RegionId> {
    let threshold = state.config.capital_regeneration_turns;
    let mut healed = Vec::new();
    for (rid, capital) in state.capitals.iter_mut() {
        capital.tick();
        if capital.regenerate(threshold) {
            debug!(region = %rid, hp = capital.current_hp, max = capital.max_hp, "capital regenerated");
            healed.push(*rid);
        }
    }
    healed
}

// ── Turn order / win check / standings ─────────────────────────────────

/// Alive players by ascending score, ties by id.
pub fn turn_order(state: &MatchState) -> Vec<PlayerId> {
    let mut alive: Vec<&Player> = state.players.values().filter(|p| p.alive).collect();
    alive.sort_by_key(|p| (p.score, p.id));
    alive.into_iter().map(|p| p.id).collect()
}

/// Highest-scoring alive player. Equal scores go to the lowest id, the
/// first one found.
pub fn leader(state: &MatchState) -> Option<PlayerId> {
    let mut best: Option<&Player> = None;
    for p in state.players.values().filter(|p| p.alive) {
        if best.map_or(true, |b| p.score > b.score) {
            best = Some(p);
        }
    }
    best.map(|p| p.id)
}

/// Evaluated after every completed turn. A lone survivor wins at once;
/// otherwise the leader wins once the turn counter exceeds
/// `max_turns_per_player * alive`.
pub fn check_winner(state: &MatchState) -> Option<PlayerId> {
    let alive = state.alive_players();
    if alive.len() == 1 {
        return alive.first().copied();
    }
    let limit = state.max_turns_per_player.saturating_mul(alive.len() as u32);
    if state.current_turn > limit {
        return leader(state);
    }
    None
}

/// Score descending, then id. Ranks are 1-based and strictly increasing.
pub fn standings(state: &MatchState) -> Vec<Standing> {
    let mut players: Vec<&Player> = state.players.values().collect();
    players.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
    players.into_iter()
        .enumerate()
        .map(|(i, p)| Standing {
            rank: i as u32 + 1,
            player: p.id,
            name: p.name.clone(),
            score: p.score,
            alive: p.alive,
            regions: p.regions.len(),
        })
        .collect()
}
